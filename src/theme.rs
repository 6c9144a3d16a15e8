//! Light/dark theme selection and persistence.

use std::time::Duration;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use crate::config::ThemeMode;
use crate::storage::{Storage, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Pick the starting theme and write it back to storage.
///
/// A forced mode wins, then the stored value, then the terminal preference.
pub fn resolve_theme(
    storage: &mut Storage,
    mode: ThemeMode,
    prefers_dark: impl FnOnce() -> bool,
) -> Theme {
    let theme = match mode {
        ThemeMode::Light => Theme::Light,
        ThemeMode::Dark => Theme::Dark,
        ThemeMode::Auto => storage
            .get_item(THEME_KEY)
            .and_then(Theme::parse)
            .unwrap_or_else(|| {
                if prefers_dark() {
                    Theme::Dark
                } else {
                    Theme::Light
                }
            }),
    };
    store_theme(storage, theme);
    theme
}

/// Flip the theme and persist the new value.
pub fn toggle_theme(current: Theme, storage: &mut Storage) -> Theme {
    let next = current.toggled();
    store_theme(storage, next);
    next
}

fn store_theme(storage: &mut Storage, theme: Theme) {
    if let Err(err) = storage.set_item(THEME_KEY, theme.as_str()) {
        tracing::warn!("Failed to store theme: {err}");
    }
}

/// Whether the terminal background looks dark.
///
/// Checks `COLORFGBG` first, then asks the terminal with OSC 11.
pub fn detect_prefers_dark() -> bool {
    if let Some(dark) = std::env::var("COLORFGBG")
        .ok()
        .and_then(|value| prefers_dark_from_colorfgbg(&value))
    {
        return dark;
    }
    let _raw = enable_raw_mode();
    let reply = query_terminal_background();
    let _ = disable_raw_mode();
    reply
        .ok()
        .flatten()
        .is_some_and(|(r, g, b)| prefers_dark_from_rgb(r, g, b))
}

/// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`); ANSI backgrounds 0-6 and 8 are dark.
pub fn prefers_dark_from_colorfgbg(value: &str) -> Option<bool> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    Some(matches!(bg, 0..=6 | 8))
}

pub fn prefers_dark_from_rgb(r: u8, g: u8, b: u8) -> bool {
    let luma = 0.0722f32.mul_add(
        f32::from(b),
        0.2126f32.mul_add(f32::from(r), 0.7152 * f32::from(g)),
    );
    luma < 140.0
}

// The query goes to /dev/tty so the terminal answers even when stdout is
// piped. Other platforms skip it: a blocked reader thread there swallows
// console input.
#[cfg(not(unix))]
fn query_terminal_background() -> std::io::Result<Option<(u8, u8, u8)>> {
    Ok(None)
}

#[cfg(unix)]
fn query_terminal_background() -> std::io::Result<Option<(u8, u8, u8)>> {
    use std::io::{Read, Write};
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();
    let mut tty = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")?;
    let mut reader = tty.try_clone()?;

    // ESC ] 11 ; ? BEL
    tty.write_all(b"\x1b]11;?\x07")?;
    tty.flush()?;

    std::thread::spawn(move || {
        let mut buf = [0u8; 256];
        let mut collected = Vec::new();
        while let Ok(n) = reader.read(&mut buf) {
            if n == 0 {
                continue;
            }
            collected.extend_from_slice(&buf[..n]);
            if collected.contains(&0x07) || collected.windows(2).any(|w| w == b"\x1b\\") {
                let _ = tx.send(collected);
                break;
            }
        }
    });

    Ok(rx
        .recv_timeout(Duration::from_millis(75))
        .ok()
        .and_then(|bytes| parse_osc11_reply(&String::from_utf8_lossy(&bytes))))
}

/// Parse `ESC ] 11 ; rgb:RRRR/GGGG/BBBB` terminated by BEL or ST.
fn parse_osc11_reply(reply: &str) -> Option<(u8, u8, u8)> {
    let start = reply.find("rgb:")?;
    let mut parts = reply[start + 4..].split(['/', '\x07', '\x1b']);
    let r = parse_osc_component(parts.next()?)?;
    let g = parse_osc_component(parts.next()?)?;
    let b = parse_osc_component(parts.next()?)?;
    Some((r, g, b))
}

fn parse_osc_component(s: &str) -> Option<u8> {
    let hex = s.trim();
    match hex.len() {
        2 => u8::from_str_radix(hex, 16).ok(),
        n if n >= 4 => {
            let value = u16::from_str_radix(&hex[..4], 16).ok()?;
            u8::try_from(value >> 8).ok()
        }
        _ => None,
    }
}
