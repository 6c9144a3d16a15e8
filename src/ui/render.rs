use ratatui::prelude::*;
use ratatui::widgets::{Clear, Paragraph};

use crate::app::{Focus, Model};

use super::layout::PaneLayout;
use super::style::Palette;
use super::{overlays, preview, status};

/// Render the complete UI.
pub fn render(model: &Model, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(model.theme);
    let PaneLayout {
        toolbar,
        editor,
        divider,
        preview,
        toast,
        status: status_area,
    } = model.layout();

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new("").style(palette.base()), area);

    status::render_toolbar(model, frame, toolbar);
    if let Some(editor) = editor {
        render_editor(model, frame, editor, &palette);
    }
    if let Some(divider) = divider {
        render_divider(model, frame, divider, &palette);
    }
    render_preview(model, frame, preview, &palette);
    if let Some(toast) = toast {
        status::render_toast_bar(model, frame, toast);
    }
    status::render_status_bar(model, frame, status_area);

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    } else if model.prompt.is_some() {
        overlays::render_prompt(model, frame, area);
    } else if model.snippet_menu_open {
        overlays::render_snippet_menu(model, frame, area);
    }
}

/// Columns the editor gutter takes: line numbers plus one space.
pub const fn editor_gutter_width(total_lines: usize) -> u16 {
    line_number_width(total_lines) + 1
}

/// Horizontal scroll that keeps the cursor inside `text_width` columns.
pub fn editor_hscroll(model: &Model, text_width: u16) -> u16 {
    let col = model.buffer.cursor_display_col();
    let visible = usize::from(text_width.max(1));
    u16::try_from(col.saturating_sub(visible - 1)).unwrap_or(u16::MAX)
}

fn render_editor(model: &Model, frame: &mut Frame, area: Rect, palette: &Palette) {
    let buf = &model.buffer;
    let total_lines = buf.line_count();
    let gutter_width = editor_gutter_width(total_lines);
    let gutter_area = Rect {
        width: gutter_width.min(area.width),
        ..area
    };
    let text_area = Rect {
        x: area.x + gutter_area.width,
        width: area.width.saturating_sub(gutter_area.width),
        ..area
    };

    let visible_height = usize::from(area.height);
    let start = model.editor_scroll;
    let end = (start + visible_height).min(total_lines);
    let cursor = buf.cursor();
    let show_cursor = model.focus == Focus::Editor && model.prompt.is_none();

    let mut numbers: Vec<Line> = Vec::with_capacity(end.saturating_sub(start));
    let mut content: Vec<Line> = Vec::with_capacity(end.saturating_sub(start));
    for line_idx in start..end {
        let line_text = buf.line_at(line_idx).unwrap_or_default();
        numbers.push(Line::styled(
            format!(
                "{:>width$} ",
                line_idx + 1,
                width = usize::from(gutter_width - 1)
            ),
            Style::default().fg(palette.gutter),
        ));

        if show_cursor && line_idx == cursor.line {
            let col = cursor.col.min(line_text.len());
            let (before, rest) = line_text.split_at(col);
            let mut rest_chars = rest.chars();
            let cursor_char = rest_chars.next().map_or_else(|| " ".to_string(), String::from);
            let after = rest_chars.as_str();

            let mut spans = Vec::with_capacity(3);
            if !before.is_empty() {
                spans.push(Span::raw(before.to_string()));
            }
            spans.push(Span::styled(cursor_char, palette.cursor()));
            if !after.is_empty() {
                spans.push(Span::raw(after.to_string()));
            }
            content.push(Line::from(spans));
        } else {
            content.push(Line::raw(line_text));
        }
    }

    let hscroll = editor_hscroll(model, text_area.width);
    frame.render_widget(Paragraph::new(numbers).style(palette.base()), gutter_area);
    frame.render_widget(
        Paragraph::new(content)
            .style(palette.base())
            .scroll((0, hscroll)),
        text_area,
    );
}

fn render_divider(model: &Model, frame: &mut Frame, area: Rect, palette: &Palette) {
    let color = if model.resize_drag.is_some() || model.focus == Focus::Preview {
        palette.divider_active
    } else {
        palette.divider
    };
    let lines: Vec<Line> = (0..area.height).map(|_| Line::raw("│")).collect();
    frame.render_widget(
        Paragraph::new(lines).style(palette.base().fg(color)),
        area,
    );
}

fn render_preview(model: &Model, frame: &mut Frame, area: Rect, palette: &Palette) {
    let lines = preview::preview_lines(model.preview.as_ref(), palette, area.width);
    let max_scroll = lines.len().saturating_sub(usize::from(area.height));
    let scroll = u16::try_from(model.preview_scroll.min(max_scroll)).unwrap_or(u16::MAX);
    frame.render_widget(
        Paragraph::new(lines).style(palette.base()).scroll((scroll, 0)),
        area,
    );
}

/// Calculate the width needed for line numbers.
pub const fn line_number_width(total_lines: usize) -> u16 {
    if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1_000 {
        3
    } else if total_lines < 10_000 {
        4
    } else if total_lines < 100_000 {
        5
    } else {
        6
    }
}
