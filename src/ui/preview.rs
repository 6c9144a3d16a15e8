//! Terminal rendering of a parsed song for the preview pane.
//!
//! Bars are laid out on a grid: every bar cell in the song gets the width of
//! the widest one, so bar lines stack vertically the way they do on a printed
//! chart.

use std::borrow::Cow;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::sheet::{Bar, ParseError, Section, Song, format_chord_plain};
use crate::ui::style::Palette;

/// Columns reserved for each bar-line marker (`|`, `||:`, `:||:`).
const MARKER_WIDTH: usize = 5;
const LEFT_PADDING: &str = " ";

fn annotation_mark(value: &str) -> Cow<'_, str> {
    match value {
        "push" => Cow::Borrowed(">"),
        "hold" => Cow::Borrowed("_"),
        "fermata" => Cow::Borrowed("⌒"),
        "diamond" => Cow::Borrowed("◇"),
        "diamond-fermata" => Cow::Borrowed("◇⌒"),
        other => Cow::Owned(format!("({other})")),
    }
}

/// A bar's content, before markers and padding.
fn bar_spans(bar: &Bar, palette: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    if !bar.bar_note.is_empty() {
        spans.push(Span::styled(format!("\"{}\"", bar.bar_note), palette.bar_note()));
    }
    for chord in &bar.chords {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        if let Some(annotation) = &chord.annotation {
            spans.push(Span::styled(
                annotation_mark(&annotation.value).into_owned(),
                palette.annotation(),
            ));
        }
        if !chord.value.is_empty() {
            spans.push(Span::styled(format_chord_plain(&chord.value), palette.chord()));
        }
    }
    if !bar.backtick.value.is_empty() {
        if !spans.is_empty() {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled("♪", palette.abc()));
    }
    spans
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.width()).sum()
}

const fn end_marker(bar: &Bar) -> &'static str {
    if bar.repeat_end {
        ":||"
    } else if bar.double_bar_end {
        "||"
    } else {
        "|"
    }
}

/// Marker printed between `prev` and `next` on one row.
fn marker_between(prev: Option<&Bar>, next: Option<&Bar>) -> &'static str {
    let opens_repeat = next.is_some_and(|bar| bar.repeat_start);
    match (prev.map(end_marker), opens_repeat) {
        (Some(":||"), true) => ":||:",
        (_, true) => "||:",
        (Some(end), false) => end,
        (None, false) => "|",
    }
}

fn marker_span(marker: &'static str, palette: &Palette) -> Span<'static> {
    Span::styled(
        format!("{marker:^MARKER_WIDTH$}"),
        Style::default().fg(palette.bar_line),
    )
}

fn header_lines(song: &Song, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(title) = song.title().filter(|t| !t.is_empty()) {
        lines.push(Line::from(vec![
            Span::raw(LEFT_PADDING),
            Span::styled(title.to_string(), palette.title()),
        ]));
    }
    if let Some(subtitle) = song.front_matter.get("subtitle").filter(|s| !s.is_empty()) {
        lines.push(Line::from(vec![
            Span::raw(LEFT_PADDING),
            Span::styled(subtitle.to_string(), palette.bar_note()),
        ]));
    }
    let mut meta = vec![Span::raw(LEFT_PADDING)];
    if let Some(key) = song.front_matter.get("key").filter(|k| !k.is_empty()) {
        meta.push(Span::styled("Key: ", Style::default().fg(palette.muted)));
        meta.push(Span::styled(format_chord_plain(key), palette.chord()));
    }
    if let Some(tempo) = song.front_matter.get("tempo").filter(|t| !t.is_empty()) {
        if meta.len() > 1 {
            meta.push(Span::raw("   "));
        }
        meta.push(Span::styled("Tempo: ", Style::default().fg(palette.muted)));
        meta.push(Span::styled(tempo.to_string(), Style::default().fg(palette.text)));
    }
    if meta.len() > 1 {
        lines.push(Line::from(meta));
    }
    if !lines.is_empty() {
        lines.push(Line::raw(""));
    }
    lines
}

struct Grid {
    cell_width: usize,
    per_row: usize,
}

impl Grid {
    fn for_song(song: &Song, palette: &Palette, width: u16) -> Self {
        let usable = usize::from(width).saturating_sub(LEFT_PADDING.len() + MARKER_WIDTH);
        let widest = song
            .bars()
            .map(|bar| spans_width(&bar_spans(bar, palette)))
            .max()
            .unwrap_or(1)
            .max(1);
        let cell_width = widest.min(usable.saturating_sub(MARKER_WIDTH).max(1));
        let per_row = (usable / (cell_width + MARKER_WIDTH)).max(1);
        Self {
            cell_width,
            per_row,
        }
    }
}

fn bar_row(bars: &[Bar], grid: &Grid, palette: &Palette) -> Line<'static> {
    let mut spans = vec![Span::raw(LEFT_PADDING)];
    let mut prev: Option<&Bar> = None;
    for bar in bars {
        spans.push(marker_span(marker_between(prev, Some(bar)), palette));
        let content = bar_spans(bar, palette);
        let pad = grid.cell_width.saturating_sub(spans_width(&content));
        spans.extend(content);
        if pad > 0 {
            spans.push(Span::raw(" ".repeat(pad)));
        }
        prev = Some(bar);
    }
    spans.push(marker_span(marker_between(prev, None), palette));
    Line::from(spans)
}

fn section_lines(
    section: &Section,
    first: bool,
    grid: &Grid,
    palette: &Palette,
    width: u16,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if section.page_break && !first {
        lines.push(Line::styled(
            "─".repeat(usize::from(width)),
            Style::default().fg(palette.muted),
        ));
    }
    if !section.name.is_empty() {
        lines.push(Line::from(vec![
            Span::raw(LEFT_PADDING),
            Span::styled(section.name.clone(), palette.section()),
        ]));
    }
    for line in &section.lines {
        if line.is_multiline() {
            for abc in line.multiline_backtick.value.lines() {
                lines.push(Line::from(vec![
                    Span::raw(LEFT_PADDING),
                    Span::styled(format!("│ {abc}"), palette.abc()),
                ]));
            }
            continue;
        }
        for row in line.bars.chunks(grid.per_row) {
            lines.push(bar_row(row, grid, palette));
        }
    }
    lines.push(Line::raw(""));
    lines
}

/// Lines for a song at the given pane width.
pub fn song_lines(song: &Song, palette: &Palette, width: u16) -> Vec<Line<'static>> {
    let grid = Grid::for_song(song, palette, width);
    let mut lines = header_lines(song, palette);
    let mut first = true;
    for section in song.sections.iter().filter(|s| !s.is_empty()) {
        lines.extend(section_lines(section, first, &grid, palette, width));
        first = false;
    }
    lines
}

pub fn error_lines(err: &ParseError, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(" Parse error", palette.error())];
    lines.extend(err.to_string().lines().map(|line| {
        Line::styled(format!(" {line}"), Style::default().fg(palette.error))
    }));
    lines
}

/// Preview content for the latest render, if any.
pub fn preview_lines(
    preview: Option<&Result<Song, ParseError>>,
    palette: &Palette,
    width: u16,
) -> Vec<Line<'static>> {
    match preview {
        None => vec![Line::styled(" Rendering…", Style::default().fg(palette.muted))],
        Some(Ok(song)) => song_lines(song, palette, width),
        Some(Err(err)) => error_lines(err, palette),
    }
}
