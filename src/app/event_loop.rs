use std::io::{Write, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event;
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::effects::Services;
use crate::app::{App, Message, Model, update};

/// Longest idle wait between loop iterations.
const IDLE_POLL_MS: u64 = 250;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl App {
    /// Apply one message: pure update, then its side effects.
    pub(super) fn dispatch(model: &mut Model, services: &mut Services, msg: Message) {
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, services, &side_msg);
    }

    /// Feed a finished render back into the model, if one is due.
    pub(super) fn poll_pipeline(model: &mut Model, services: &mut Services, now_ms: u64) -> bool {
        let text = model.buffer.text();
        match services.pipeline.poll(now_ms, &text, &mut services.storage) {
            Some(output) => {
                Self::dispatch(model, services, Message::PreviewReady(output));
                true
            }
            None => false,
        }
    }

    pub(super) fn event_loop(
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        services: &mut Services,
    ) -> Result<()> {
        execute!(stdout(), EnableMouseCapture, EnableBracketedPaste)?;
        set_mouse_motion_tracking(true)?;

        let result = Self::run_loop(terminal, model, services);

        let _ = set_mouse_motion_tracking(false);
        let _ = execute!(stdout(), DisableBracketedPaste, DisableMouseCapture);
        result
    }

    fn run_loop(
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        services: &mut Services,
    ) -> Result<()> {
        let start = Instant::now();
        let mut seen_revision = model.buffer.revision();
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = elapsed_ms(start);
            if model.buffer.revision() != seen_revision {
                seen_revision = model.buffer.revision();
                services.pipeline.edit(now_ms);
            }
            if services.pipeline.time_until_ready(now_ms) == Some(0)
                && Self::poll_pipeline(model, services, now_ms)
            {
                needs_render = true;
            }

            if services.take_file_changed() {
                Self::dispatch(model, services, Message::FileChanged);
                needs_render = true;
            }

            let poll_ms = if needs_render {
                0
            } else {
                services
                    .pipeline
                    .time_until_ready(now_ms)
                    .map_or(IDLE_POLL_MS, |wait| wait.min(IDLE_POLL_MS))
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                if let Some(msg) = Self::handle_event(event::read()?, model) {
                    crate::perf::log_event(
                        "event.message",
                        format!("frame={frame_idx} msg={msg:?}"),
                    );
                    Self::dispatch(model, services, msg);
                    needs_render = true;
                }

                // Coalesce key repeat bursts into a single render.
                let mut drained = 0_u32;
                while event::poll(Duration::from_millis(0))? {
                    if let Some(msg) = Self::handle_event(event::read()?, model) {
                        drained += 1;
                        Self::dispatch(model, services, msg);
                        needs_render = true;
                    }
                }
                if drained > 0 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| Self::view(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }

            if model.should_quit {
                return Ok(());
            }
        }
    }
}

fn set_mouse_motion_tracking(enable: bool) -> std::io::Result<()> {
    // Any-event motion reporting (1003) with SGR encoding (1006) keeps
    // divider drags smooth.
    let mut out = stdout();
    if enable {
        out.write_all(b"\x1b[?1003h\x1b[?1006h")?;
    } else {
        out.write_all(b"\x1b[?1003l\x1b[?1006l")?;
    }
    out.flush()
}
