use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::app::{Focus, Message, Model, PromptKind};

use super::style::{Palette, toast_style};

/// Clickable toolbar entries, left to right.
fn toolbar_entries() -> [(&'static str, Message); 8] {
    [
        ("Snippets ^N", Message::ToggleSnippetMenu),
        ("Theme ^D", Message::ToggleTheme),
        ("Vim F2", Message::ToggleVimMode),
        ("Editor ^B", Message::ToggleEditorCollapse),
        ("Copy ^Y", Message::CopySheet),
        ("Open ^O", Message::OpenPrompt(PromptKind::Open)),
        ("Save ^S", Message::Save),
        ("Help F1", Message::ToggleHelp),
    ]
}

const TOOLBAR_GAP: u16 = 2;

/// The message for a click at `column` on the toolbar row.
pub fn toolbar_message_at(column: u16) -> Option<Message> {
    let mut x = 0_u16;
    for (label, msg) in toolbar_entries() {
        let width = u16::try_from(label.width()).unwrap_or(u16::MAX);
        if column >= x && column < x.saturating_add(width) {
            return Some(msg);
        }
        x = x.saturating_add(width + TOOLBAR_GAP);
    }
    None
}

pub fn render_toolbar(model: &Model, frame: &mut Frame, area: Rect) {
    let palette = Palette::for_theme(model.theme);
    let mut spans = Vec::new();
    for (label, msg) in toolbar_entries() {
        let active = match msg {
            Message::ToggleSnippetMenu => model.snippet_menu_open,
            Message::ToggleVimMode => model.vim.enabled,
            Message::ToggleEditorCollapse => !model.editor_collapsed,
            Message::ToggleHelp => model.help_visible,
            _ => false,
        };
        let style = if active {
            palette.bar().add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            palette.bar()
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" ".repeat(usize::from(TOOLBAR_GAP))));
    }
    let toolbar = Paragraph::new(Line::from(spans)).style(palette.base());
    frame.render_widget(toolbar, area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let palette = Palette::for_theme(model.theme);
    let dirty_indicator = if model.is_dirty() { " [modified]" } else { "" };
    let cursor = model.buffer.cursor();
    let cursor_info = format!(
        "Ln {}, Col {}",
        cursor.line + 1,
        model.buffer.cursor_display_col() + 1
    );
    let vim_label = match model.vim.label() {
        "" => String::new(),
        label => format!("  {label}"),
    };
    let focus = match model.focus {
        Focus::Editor => "",
        Focus::Preview => "  [preview]",
    };

    let status = format!(
        " {}{}  {}{}{}  {}  renders:{}  F1:help",
        model.file_name(),
        dirty_indicator,
        cursor_info,
        vim_label,
        focus,
        model.theme.as_str(),
        model.render_generation,
    );

    let status_bar = Paragraph::new(status).style(palette.bar());
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = toast_style(level);
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolbar_click_maps_to_entry() {
        assert!(matches!(toolbar_message_at(0), Some(Message::ToggleSnippetMenu)));
        // "Snippets ^N" is 13 wide, then a gap column.
        assert!(toolbar_message_at(13).is_none());
        assert!(matches!(toolbar_message_at(14), Some(Message::ToggleTheme)));
    }

    #[test]
    fn test_toolbar_click_past_last_entry_is_none() {
        assert!(toolbar_message_at(500).is_none());
    }
}
