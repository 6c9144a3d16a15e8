//! Colors for the light and dark themes.
//!
//! Light uses indexed colors that stay readable on pale backgrounds; dark
//! sticks to the basic ANSI palette so the terminal's own scheme shows
//! through.

use ratatui::style::{Color, Modifier, Style};

use crate::app::ToastLevel;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub background: Color,
    pub muted: Color,
    pub title: Color,
    pub chord: Color,
    pub annotation: Color,
    pub section: Color,
    pub abc: Color,
    pub error: Color,
    pub bar_line: Color,
    pub gutter: Color,
    pub divider: Color,
    pub divider_active: Color,
    pub bar_bg: Color,
    pub bar_fg: Color,
    pub cursor_bg: Color,
    pub cursor_fg: Color,
}

impl Palette {
    pub const fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                text: Color::Indexed(235),
                background: Color::Indexed(255),
                muted: Color::Indexed(244),
                title: Color::Indexed(24),
                chord: Color::Indexed(18),
                annotation: Color::Indexed(130),
                section: Color::Indexed(22),
                abc: Color::Indexed(90),
                error: Color::Indexed(160),
                bar_line: Color::Indexed(246),
                gutter: Color::Indexed(248),
                divider: Color::Indexed(250),
                divider_active: Color::Indexed(33),
                bar_bg: Color::Indexed(252),
                bar_fg: Color::Indexed(235),
                cursor_bg: Color::Indexed(235),
                cursor_fg: Color::Indexed(255),
            },
            Theme::Dark => Self {
                text: Color::White,
                background: Color::Reset,
                muted: Color::Indexed(245),
                title: Color::Cyan,
                chord: Color::LightYellow,
                annotation: Color::LightMagenta,
                section: Color::Green,
                abc: Color::LightBlue,
                error: Color::LightRed,
                bar_line: Color::Indexed(242),
                gutter: Color::DarkGray,
                divider: Color::DarkGray,
                divider_active: Color::Cyan,
                bar_bg: Color::DarkGray,
                bar_fg: Color::White,
                cursor_bg: Color::White,
                cursor_fg: Color::Black,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub fn bar(&self) -> Style {
        Style::default().fg(self.bar_fg).bg(self.bar_bg)
    }

    pub fn cursor(&self) -> Style {
        Style::default().fg(self.cursor_fg).bg(self.cursor_bg)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    pub fn chord(&self) -> Style {
        Style::default().fg(self.chord).add_modifier(Modifier::BOLD)
    }

    pub fn annotation(&self) -> Style {
        Style::default().fg(self.annotation)
    }

    pub fn bar_note(&self) -> Style {
        Style::default().fg(self.muted).add_modifier(Modifier::ITALIC)
    }

    pub fn section(&self) -> Style {
        Style::default().fg(self.section).add_modifier(Modifier::BOLD)
    }

    pub fn abc(&self) -> Style {
        Style::default().fg(self.abc)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }
}

pub fn toast_style(level: ToastLevel) -> (&'static str, Style) {
    match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    }
}
