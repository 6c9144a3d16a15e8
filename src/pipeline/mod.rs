//! Debounced edit-to-preview pipeline.
//!
//! Edits are queued; once the buffer has been idle for the configured delay,
//! [`RenderPipeline::poll`] stores the text, converts it to HTML and swaps
//! the embedded ABC blocks for SVG.

pub mod debounce;

use std::time::Duration;

use crate::html::{self, AbcRenderer, RenderConfig};
use crate::sheet::{self, ParseError, Song};
use crate::storage::Storage;

pub use debounce::{
    DEFAULT_DELAY_MS, Debouncer, EditDebouncer, MAX_DELAY_MS, MIN_DELAY_MS, clamp_delay_ms,
};

/// Converter output before ABC substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub song: Result<Song, ParseError>,
    pub html: String,
}

/// Turns notation text into an HTML fragment.
pub trait Converter {
    fn convert(&self, source: &str) -> Conversion;

    /// Name recorded on multiline ABC blocks and used as the fallback title.
    fn set_source_file(&mut self, _source_file: &str) {}
}

/// The lesheet compiler as a [`Converter`].
#[derive(Debug, Clone, Default)]
pub struct LesheetConverter {
    config: RenderConfig,
    source_file: String,
}

impl LesheetConverter {
    pub fn new(config: RenderConfig, source_file: impl Into<String>) -> Self {
        Self {
            config,
            source_file: source_file.into(),
        }
    }
}

impl Converter for LesheetConverter {
    fn set_source_file(&mut self, source_file: &str) {
        self.source_file = source_file.to_string();
    }

    fn convert(&self, source: &str) -> Conversion {
        let title = if self.source_file.is_empty() {
            "Untitled"
        } else {
            self.source_file.as_str()
        };
        match sheet::parse_named(source, &self.source_file) {
            Ok(song) => {
                let html = html::render_song(self.config, source, &song, title);
                Conversion {
                    song: Ok(song),
                    html,
                }
            }
            Err(err) => Conversion {
                html: html::render_error_page(self.config, &err, title),
                song: Err(err),
            },
        }
    }
}

/// One finished render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    /// Parsed song, or the error that replaced it.
    pub song: Result<Song, ParseError>,
    /// HTML with ABC blocks already replaced.
    pub html: String,
    /// Sequence number, starting at 1.
    pub generation: u64,
}

pub struct RenderPipeline {
    debouncer: EditDebouncer,
    converter: Box<dyn Converter>,
    renderer: Box<dyn AbcRenderer>,
    generation: u64,
}

impl RenderPipeline {
    pub fn new(
        delay: Duration,
        converter: Box<dyn Converter>,
        renderer: Box<dyn AbcRenderer>,
    ) -> Self {
        Self {
            debouncer: EditDebouncer::new(delay),
            converter,
            renderer,
            generation: 0,
        }
    }

    /// Record an edit at `now_ms`, replacing any pending deadline.
    pub fn edit(&mut self, now_ms: u64) {
        self.debouncer.edit(now_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn time_until_ready(&self, now_ms: u64) -> Option<u64> {
        self.debouncer.time_until_ready(now_ms)
    }

    pub fn set_source_file(&mut self, source_file: &str) {
        self.converter.set_source_file(source_file);
    }

    pub const fn renders(&self) -> u64 {
        self.generation
    }

    /// Render `text` if the idle window has elapsed.
    pub fn poll(&mut self, now_ms: u64, text: &str, storage: &mut Storage) -> Option<RenderOutput> {
        if self.debouncer.take_edit_ready(now_ms) {
            Some(self.render_now(text, storage))
        } else {
            None
        }
    }

    /// Store, convert and render immediately, dropping any pending edit.
    pub fn render_now(&mut self, text: &str, storage: &mut Storage) -> RenderOutput {
        let _scope = crate::perf::scope("pipeline.render");
        self.debouncer.cancel(&());
        storage.save_code(text);
        let Conversion { song, html } = self.converter.convert(text);
        let html = html::substitute_abc_scripts(&html, self.renderer.as_ref());
        self.generation += 1;
        crate::perf::log_event(
            "pipeline.render",
            format!(
                "generation={} bytes={} ok={}",
                self.generation,
                html.len(),
                song.is_ok()
            ),
        );
        RenderOutput {
            song,
            html,
            generation: self.generation,
        }
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("debouncer", &self.debouncer)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
