//! Batch commands: `html`, `json`, `fmt` and `watch`.
//!
//! Each command writes its report to the given writer so the binary can pass
//! stdout and tests can pass a buffer.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::files::{html_output_path, index_href, sheet_stem};
use crate::html::{self, AbcRenderer, IndexLink, RenderConfig, substitute_abc_scripts};
use crate::sheet::{self, Lexer, TokenKind};
use crate::watcher::{SheetWatcher, wait_for_file};

/// How long `watch` waits for a file that vanished mid-save.
const WAIT_FOR_FILE_TIMEOUT: Duration = Duration::from_secs(3);
const WAIT_FOR_FILE_INTERVAL: Duration = Duration::from_millis(200);
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    pub out_dir: PathBuf,
    pub print_tokens: bool,
    pub print_song: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("output"),
            print_tokens: false,
            print_song: false,
        }
    }
}

fn read_source(input: &Path) -> Result<String> {
    fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
}

/// Render one sheet to `<out_dir>/<name>.html`.
///
/// A parse error is written into the page and then returned.
///
/// # Errors
/// Fails if the sheet cannot be read or parsed, or the page cannot be written.
pub fn render_file(
    input: &Path,
    out_dir: &Path,
    config: RenderConfig,
    renderer: &dyn AbcRenderer,
) -> Result<PathBuf> {
    let _scope = crate::perf::scope(format!("render {}", input.display()));
    let output = html_output_path(input, out_dir);
    let source = read_source(input)?;
    let title = sheet_stem(input).display().to_string();
    match sheet::parse_named(&source, &input.display().to_string()) {
        Ok(song) => {
            let page = html::render_song(config, &source, &song, &title);
            write_page(&output, &substitute_abc_scripts(&page, renderer))?;
            Ok(output)
        }
        Err(err) => {
            write_page(&output, &html::render_error_page(config, &err, &title))?;
            Err(err).with_context(|| format!("Failed to parse {}", input.display()))
        }
    }
}

/// Write `index.html` linking every input's page.
///
/// # Errors
/// Fails if the index cannot be written.
pub fn write_index(files: &[PathBuf], out_dir: &Path) -> Result<PathBuf> {
    let links: Vec<IndexLink> = files
        .iter()
        .map(|file| IndexLink {
            name: sheet_stem(file).display().to_string(),
            href: index_href(file, out_dir),
        })
        .collect();
    let path = out_dir.join("index.html");
    write_page(&path, &html::render_index(&links))?;
    Ok(path)
}

fn print_tokens(source: &str, out: &mut impl Write) -> Result<()> {
    let mut lexer = Lexer::new(source);
    loop {
        match lexer.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => return Ok(()),
            Ok(token) => writeln!(out, "Token{}: {}", token.kind, token.value)?,
            Err(err) => {
                tracing::warn!("stopped printing tokens: {err}");
                return Ok(());
            }
        }
    }
}

/// Render every file to HTML and write the index page.
///
/// Files that fail to render are reported and skipped; the returned count
/// says how many failed.
///
/// # Errors
/// Fails if output cannot be written.
pub fn html_command(
    files: &[PathBuf],
    options: &HtmlOptions,
    renderer: &dyn AbcRenderer,
    out: &mut impl Write,
) -> Result<usize> {
    let mut failures = 0;
    for input in files {
        if options.print_tokens || options.print_song {
            match read_source(input) {
                Ok(source) => {
                    if options.print_tokens {
                        print_tokens(&source, out)?;
                    }
                    if options.print_song {
                        match sheet::parse_named(&source, &input.display().to_string()) {
                            Ok(song) => write!(out, "{}", song.outline())?,
                            Err(err) => writeln!(out, "{err}")?,
                        }
                    }
                }
                Err(err) => tracing::warn!("{err:#}"),
            }
        }
        match render_file(input, &options.out_dir, RenderConfig::page(), renderer) {
            Ok(output) => {
                writeln!(out, "Rendering {} to {}", input.display(), output.display())?;
            }
            Err(err) => {
                failures += 1;
                tracing::error!("Error rendering file {}: {err:#}", input.display());
            }
        }
    }
    write_index(files, &options.out_dir)?;
    Ok(failures)
}

/// Print each song's document model as JSON.
///
/// # Errors
/// Fails on the first file that cannot be read or parsed.
pub fn json_command(files: &[PathBuf], out: &mut impl Write) -> Result<()> {
    for input in files {
        let source = read_source(input)?;
        let song = sheet::parse_named(&source, &input.display().to_string())
            .with_context(|| format!("Failed to parse {}", input.display()))?;
        writeln!(out, "{}", song.to_json()?)?;
    }
    Ok(())
}

/// Print each song back as canonical lesheet source.
///
/// # Errors
/// Fails on the first file that cannot be read or parsed.
pub fn fmt_command(files: &[PathBuf], out: &mut impl Write) -> Result<()> {
    for input in files {
        let source = read_source(input)?;
        let song = sheet::parse(&source)
            .with_context(|| format!("Failed to parse {}", input.display()))?;
        write!(out, "{}", sheet::print_song(&song))?;
    }
    Ok(())
}

/// Render every file, then re-render each one whenever it changes.
///
/// Pages reload themselves in the browser. Runs until the process is
/// interrupted.
///
/// # Errors
/// Fails if no files are given or the watcher cannot be started.
pub fn watch_command(
    files: &[PathBuf],
    out_dir: &Path,
    debounce: Duration,
    renderer: &dyn AbcRenderer,
    out: &mut impl Write,
) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("must specify at least one file to watch");
    }
    if let Some(dir) = files.iter().find(|f| f.is_dir()) {
        anyhow::bail!("{} is a directory, not a file", dir.display());
    }
    let config = RenderConfig {
        live_reload: true,
        ..RenderConfig::page()
    };
    let render = |input: &Path, out: &mut dyn Write| -> Result<()> {
        match render_file(input, out_dir, config, renderer) {
            Ok(output) => {
                writeln!(out, "Rendering {} to {}", input.display(), output.display())?;
            }
            Err(err) => tracing::error!("Error rendering: {err:#}"),
        }
        Ok(())
    };

    for input in files {
        render(input, out)?;
    }
    write_index(files, out_dir)?;

    let mut watcher = SheetWatcher::new(files, debounce).context("Failed to start file watcher")?;
    let originals: HashMap<PathBuf, PathBuf> = watcher
        .targets()
        .map(Path::to_path_buf)
        .zip(files.iter().cloned())
        .collect();
    writeln!(out, "ready; press ^C to exit")?;
    out.flush()?;

    loop {
        for changed in watcher.take_changed() {
            let input = originals.get(&changed).unwrap_or(&changed);
            if !wait_for_file(input, WAIT_FOR_FILE_TIMEOUT, WAIT_FOR_FILE_INTERVAL) {
                tracing::warn!("timed out waiting for file: {}", input.display());
                continue;
            }
            crate::perf::log_event("watch.changed", input.display().to_string());
            render(input, out)?;
            out.flush()?;
        }
        std::thread::sleep(WATCH_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::html::PlaceholderRenderer;

    const SONG: &str = "---\ntitle: Blue\nkey: Bb\n---\n| Bb7 | Eb7 | `F2 G2` |\n";

    fn write_sheet(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_render_file_substitutes_abc_blocks() {
        let dir = tempdir().unwrap();
        let input = write_sheet(dir.path(), "blue.lesheet", SONG);
        let out_dir = dir.path().join("out");

        let output =
            render_file(&input, &out_dir, RenderConfig::page(), &PlaceholderRenderer).unwrap();

        assert_eq!(output, out_dir.join("blue.html"));
        let page = fs::read_to_string(output).unwrap();
        assert!(page.contains("<title>Blue</title>"));
        assert!(page.contains("<pre class=\"abc\">"));
        assert!(!page.contains("text/vnd.abc"));
    }

    #[test]
    fn test_render_file_writes_parse_errors_into_the_page() {
        let dir = tempdir().unwrap();
        let input = write_sheet(dir.path(), "broken.nns", "| \"unclosed |\n");
        let out_dir = dir.path().join("out");

        let err = render_file(&input, &out_dir, RenderConfig::page(), &PlaceholderRenderer)
            .unwrap_err();

        assert!(format!("{err:#}").contains("Failed to parse"));
        let page = fs::read_to_string(out_dir.join("broken.html")).unwrap();
        assert!(page.contains("<pre class=\"error\">"));
    }

    #[test]
    fn test_html_command_prints_tokens_and_writes_index() {
        let dir = tempdir().unwrap();
        let input = write_sheet(dir.path(), "blue.lesheet", "| C |\n");
        let options = HtmlOptions {
            out_dir: dir.path().join("out"),
            print_tokens: true,
            print_song: true,
        };
        let mut out = Vec::new();

        let failures = html_command(&[input], &options, &PlaceholderRenderer, &mut out).unwrap();

        assert_eq!(failures, 0);
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("TokenBar: |"));
        assert!(report.contains("TokenChord: C"));
        assert!(report.contains("Frontmatter:"));
        assert!(report.contains("Rendering "));
        let index = fs::read_to_string(options.out_dir.join("index.html")).unwrap();
        assert!(index.contains("href=\"blue.html\""));
    }

    #[test]
    fn test_html_command_counts_failures_and_keeps_going() {
        let dir = tempdir().unwrap();
        let broken = write_sheet(dir.path(), "broken.lesheet", "| `open |\n");
        let good = write_sheet(dir.path(), "good.lesheet", "| C |\n");
        let options = HtmlOptions {
            out_dir: dir.path().join("out"),
            ..HtmlOptions::default()
        };

        let failures =
            html_command(&[broken, good], &options, &PlaceholderRenderer, &mut Vec::new()).unwrap();

        assert_eq!(failures, 1);
        assert!(options.out_dir.join("good.html").exists());
        assert!(options.out_dir.join("broken.html").exists());
    }

    #[test]
    fn test_json_command_prints_pretty_chords() {
        let dir = tempdir().unwrap();
        let input = write_sheet(dir.path(), "blue.lesheet", SONG);
        let mut out = Vec::new();

        json_command(&[input], &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["front_matter"]["title"], "Blue");
        let chord = &json["sections"][0]["lines"][0]["bars"][0]["chords"][0];
        assert_eq!(chord["value"], "Bb7");
        assert_eq!(chord["pretty"], "B♭⁷");
    }

    #[test]
    fn test_fmt_command_output_parses_to_the_same_song() {
        let dir = tempdir().unwrap();
        let input = write_sheet(dir.path(), "blue.lesheet", SONG);
        let mut out = Vec::new();

        fmt_command(&[input], &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(sheet::parse(&printed).unwrap(), sheet::parse(SONG).unwrap());
    }

    #[test]
    fn test_watch_command_rejects_empty_file_list() {
        let dir = tempdir().unwrap();
        let err = watch_command(
            &[],
            dir.path(),
            Duration::from_millis(150),
            &PlaceholderRenderer,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("at least one file"));
    }
}
