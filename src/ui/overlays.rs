use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::actions::Snippet;
use crate::app::Model;

use super::style::Palette;

fn popup_block(title: &str, palette: &Palette) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .padding(Padding::horizontal(1))
        .style(palette.bar())
}

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let palette = Palette::for_theme(model.theme);
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(4).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = palette.section().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(palette.muted);

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::styled("Sheet", section_style));
    lines.push(Line::raw("  Ctrl-S              Save (asks for a name first time)"));
    lines.push(Line::raw("  Ctrl-O              Open a sheet"));
    lines.push(Line::raw("  Ctrl-Y              Copy sheet to clipboard"));
    lines.push(Line::raw("  Ctrl-N              Insert snippet"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("View", section_style));
    lines.push(Line::raw("  Ctrl-D              Toggle light/dark theme"));
    lines.push(Line::raw("  Ctrl-B              Collapse/expand editor"));
    lines.push(Line::raw("  Tab                 Switch editor/preview focus"));
    lines.push(Line::raw("  drag divider        Resize panes"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Editing", section_style));
    lines.push(Line::raw("  F2                  Toggle vim mode"));
    lines.push(Line::raw("  Ctrl-Left/Right     Word left/right"));
    lines.push(Line::raw("  Ctrl-Home/End       Start/end of sheet"));
    lines.push(Line::raw("  vim: hjkl w b 0 ^ $ x dd gg G i a A I o O"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Other", section_style));
    lines.push(Line::raw("  F1                  Toggle help"));
    lines.push(Line::raw("  Ctrl-Q              Quit"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Config", section_style));
    lines.push(Line::raw(format!("  Global: {global_cfg}")));
    lines.push(Line::raw(format!("  Local override: {local_cfg}")));

    let block = popup_block("Help", &palette)
        .title_bottom(Line::styled(" Press any key to close ", dim_style));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

pub fn render_snippet_menu(model: &Model, frame: &mut Frame, area: Rect) {
    let palette = Palette::for_theme(model.theme);
    let mut lines: Vec<Line> = Snippet::ALL
        .iter()
        .enumerate()
        .map(|(idx, snippet)| {
            Line::from(vec![
                Span::styled(
                    format!("{}: ", idx + 1),
                    palette.annotation().add_modifier(Modifier::BOLD),
                ),
                Span::raw(snippet.label()),
            ])
        })
        .collect();
    lines.push(Line::styled(
        "any other key cancels",
        Style::default().fg(palette.muted),
    ));

    let width = lines.iter().map(Line::width).max().unwrap_or(0);
    let popup_width = u16::try_from(width).unwrap_or(u16::MAX).saturating_add(4);
    let popup_height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    // Drop down from the toolbar's first entry.
    let popup = Rect::new(
        area.x,
        area.y + 1,
        popup_width.min(area.width),
        popup_height.min(area.height.saturating_sub(1)),
    );
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(popup_block("Snippets", &palette)),
        popup,
    );
}

pub fn render_prompt(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(prompt) = &model.prompt else {
        return;
    };
    let palette = Palette::for_theme(model.theme);
    let popup_width = area.width.saturating_sub(8).clamp(20, 72);
    let popup = centered_popup_rect(popup_width, 4, area);
    let lines = vec![
        Line::from(vec![
            Span::raw(prompt.input.clone()),
            Span::styled(" ", palette.cursor()),
        ]),
        Line::styled("Enter to confirm, Esc to cancel", Style::default().fg(palette.muted)),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(popup_block(prompt.kind.title(), &palette)),
        popup,
    );
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
