//! HTML output for parsed songs.
//!
//! The renderer writes plain strings rather than going through a template
//! engine. ABC snippets are emitted as `<script type="text/vnd.abc">` blocks
//! that [`abc::substitute_abc_scripts`] later swaps for SVG.

pub mod abc;

use std::fmt::Write;

use crate::sheet::{Bar, Line, Section, Song, format_chord};

pub use abc::{
    AbcError, AbcRenderer, CommandRenderer, PlaceholderRenderer, renderer_for,
    substitute_abc_scripts,
};

/// Seconds between reloads of a page written by `watch`.
pub const LIVE_RELOAD_SECONDS: u32 = 2;

const STYLE: &str = include_str!("style.css");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Reload the page periodically so `watch` output stays current.
    pub live_reload: bool,
    /// Emit a complete document instead of a fragment.
    pub whole_page: bool,
    /// Embed the source text in a read-only editor block.
    pub with_editor: bool,
}

impl RenderConfig {
    pub const fn fragment() -> Self {
        Self {
            live_reload: false,
            whole_page: false,
            with_editor: false,
        }
    }

    pub const fn page() -> Self {
        Self {
            live_reload: false,
            whole_page: true,
            with_editor: false,
        }
    }
}

/// A link on the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLink {
    pub name: String,
    pub href: String,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a song as an HTML fragment or page.
pub fn render_song(config: RenderConfig, source: &str, song: &Song, title: &str) -> String {
    let _scope = crate::perf::scope("html.render_song");
    let mut body = String::new();
    body.push_str("<div class=\"song\">\n");
    render_header(&mut body, song);
    for section in song.sections.iter().filter(|s| !s.is_empty()) {
        render_section(&mut body, section);
    }
    body.push_str("</div>\n");
    if config.with_editor {
        let _ = writeln!(
            body,
            "<pre id=\"editor-text\" class=\"editor-text\">{}</pre>",
            escape_html(source)
        );
    }
    if config.whole_page {
        wrap_page(config, song.title().unwrap_or(title), &body)
    } else {
        body
    }
}

/// Escaped error block shown in place of a song.
pub fn render_error(err: &dyn std::error::Error) -> String {
    format!("<pre class=\"error\">{}</pre>\n", escape_html(&err.to_string()))
}

/// Error block wrapped like a song, for files written to disk.
pub fn render_error_page(config: RenderConfig, err: &dyn std::error::Error, title: &str) -> String {
    let body = render_error(err);
    if config.whole_page {
        wrap_page(config, title, &body)
    } else {
        body
    }
}

/// Page listing rendered songs.
pub fn render_index(links: &[IndexLink]) -> String {
    let mut body = String::from("<ul class=\"song-list\">\n");
    for link in links {
        let _ = writeln!(
            body,
            "  <li><a href=\"{}\">{}</a></li>",
            escape_html(&link.href),
            escape_html(&link.name)
        );
    }
    body.push_str("</ul>\n");
    wrap_page(RenderConfig::page(), "Songs", &body)
}

fn wrap_page(config: RenderConfig, title: &str, body: &str) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    if config.live_reload {
        let _ = writeln!(
            page,
            "<meta http-equiv=\"refresh\" content=\"{LIVE_RELOAD_SECONDS}\">"
        );
    }
    let _ = writeln!(page, "<title>{}</title>", escape_html(title));
    let _ = writeln!(page, "<style>\n{STYLE}</style>");
    page.push_str("</head>\n<body>\n<main id=\"root\">\n");
    page.push_str(body);
    page.push_str("</main>\n</body>\n</html>\n");
    page
}

fn render_header(out: &mut String, song: &Song) {
    let fm = &song.front_matter;
    if fm.is_empty() {
        return;
    }
    out.push_str("<header class=\"song-header\">\n");
    if let Some(title) = fm.get("title") {
        let _ = writeln!(out, "<h1 class=\"title\">{}</h1>", escape_html(title));
    }
    if let Some(subtitle) = fm.get("subtitle") {
        let _ = writeln!(out, "<h2 class=\"subtitle\">{}</h2>", escape_html(subtitle));
    }
    let key = fm.get("key").filter(|k| !k.is_empty());
    let tempo = fm.get("tempo").filter(|t| !t.is_empty());
    if key.is_some() || tempo.is_some() {
        out.push_str("<div class=\"meta\">");
        if let Some(key) = key {
            let _ = write!(out, "<span class=\"key\">Key: {}</span>", format_chord(key));
        }
        if let Some(tempo) = tempo {
            let _ = write!(out, "<span class=\"tempo\">{}</span>", escape_html(tempo));
        }
        out.push_str("</div>\n");
    }
    out.push_str("</header>\n");
}

fn render_section(out: &mut String, section: &Section) {
    let class = if section.page_break {
        "section break"
    } else {
        "section"
    };
    let _ = writeln!(out, "<section class=\"{class}\">");
    if !section.name.is_empty() {
        let _ = writeln!(
            out,
            "<h3 class=\"section-name\">{}</h3>",
            escape_html(&section.name)
        );
    }
    for line in &section.lines {
        render_line(out, line);
    }
    out.push_str("</section>\n");
}

fn render_line(out: &mut String, line: &Line) {
    if line.is_multiline() {
        let block = &line.multiline_backtick;
        let _ = writeln!(
            out,
            "<div class=\"multiline-abc\" data-backtick=\"{}\">{}\n{}{}</script></div>",
            block.id,
            abc::ABC_SCRIPT_OPEN,
            abc::full_width_preamble(),
            block.value
        );
        return;
    }
    out.push_str("<div class=\"bars\">\n");
    for bar in &line.bars {
        render_bar(out, bar);
    }
    out.push_str("</div>\n");
}

fn render_bar(out: &mut String, bar: &Bar) {
    let mut class = String::from("bar");
    if bar.repeat_start {
        class.push_str(" repeat-start");
    }
    if bar.repeat_end {
        class.push_str(" repeat-end");
    }
    if bar.double_bar_end {
        class.push_str(" double-end");
    }
    let _ = write!(out, "<div class=\"{class}\" data-bar=\"{}\">", bar.number());
    if !bar.bar_note.is_empty() {
        let _ = write!(
            out,
            "<span class=\"bar-note\">{}</span>",
            escape_html(&bar.bar_note)
        );
    }
    for chord in &bar.chords {
        out.push_str("<span class=\"chord\">");
        if let Some(annotation) = &chord.annotation {
            let name = escape_html(&annotation.value);
            let _ = write!(
                out,
                "<span class=\"annotation annotation-{name}\">{name}</span>"
            );
        }
        out.push_str(&chord.pretty());
        out.push_str("</span>");
    }
    if !bar.backtick.value.is_empty() {
        let _ = write!(
            out,
            "<span class=\"backtick\" data-backtick=\"{}\">{}\n{}{}\n</script></span>",
            bar.backtick.id,
            abc::ABC_SCRIPT_OPEN,
            abc::inline_preamble(&bar.backtick.default_length),
            bar.backtick.value
        );
    }
    out.push_str("</div>\n");
}
