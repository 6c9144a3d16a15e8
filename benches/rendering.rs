//! Benchmarks for HTML and preview rendering.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lesheets::html::{RenderConfig, render_song};
use lesheets::sheet::parse;
use lesheets::theme::Theme;
use lesheets::ui::preview::song_lines;
use lesheets::ui::style::Palette;

fn sheet() -> String {
    let mut sheet = String::from("---\ntitle: Bench\nkey: C\n---\n# Verse\n");
    for _ in 0..32 {
        sheet.push_str("| C | Am7 | Dmin7 | G7 |\n");
    }
    sheet
}

fn bench_render_html(c: &mut Criterion) {
    let source = sheet();
    let song = parse(&source).unwrap();
    c.bench_function("render_html_page", |b| {
        b.iter(|| render_song(RenderConfig::page(), black_box(&source), &song, "Bench"))
    });
}

fn bench_preview_lines(c: &mut Criterion) {
    let song = parse(&sheet()).unwrap();
    let palette = Palette::for_theme(Theme::Dark);
    c.bench_function("preview_lines", |b| {
        b.iter(|| song_lines(black_box(&song), &palette, black_box(80)))
    });
}

criterion_group!(benches, bench_render_html, bench_preview_lines);
criterion_main!(benches);
