//! Opening and saving sheet files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Suggested name when a buffer has never been saved.
pub const DEFAULT_FILE_NAME: &str = "Song.lesheet";
/// Extensions accepted by the open prompt.
pub const SHEET_EXTENSIONS: [&str; 3] = ["lesheet", "nns", "txt"];

pub fn is_sheet_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Read a sheet file.
///
/// # Errors
/// Fails for other extensions, unreadable files and non-UTF-8 content.
pub fn open_sheet(path: &Path) -> Result<String> {
    if !is_sheet_file(path) {
        anyhow::bail!(
            "{} is not a sheet file (expected .{})",
            path.display(),
            SHEET_EXTENSIONS.join(", .")
        );
    }
    fs::read_to_string(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Write a sheet file, creating parent directories.
///
/// # Errors
/// Fails if the directory or file cannot be written.
pub fn save_sheet(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to save {}", path.display()))
}

/// Initial text for the save prompt.
pub fn suggested_save_name(current: Option<&Path>) -> String {
    current.map_or_else(
        || DEFAULT_FILE_NAME.to_string(),
        |path| path.display().to_string(),
    )
}

/// Path chosen at a prompt. A blank answer means the prompt was cancelled.
pub fn resolve_prompt_path(answer: &str) -> Option<PathBuf> {
    let answer = answer.trim();
    (!answer.is_empty()).then(|| PathBuf::from(answer))
}

/// Display name without a sheet extension, e.g. `songs/blue` for `songs/blue.nns`.
pub fn sheet_stem(input: &Path) -> PathBuf {
    let strip = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "nns" || ext == "lesheet");
    if strip {
        input.with_extension("")
    } else {
        input.to_path_buf()
    }
}

/// Where `html` writes the page for `input`.
///
/// Relative inputs keep their directories under `out_dir`; absolute inputs
/// land directly in it.
pub fn html_output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = sheet_stem(input);
    let relative = if stem.is_absolute() {
        stem.file_name().map_or_else(PathBuf::new, PathBuf::from)
    } else {
        stem
    };
    let mut name = relative.into_os_string();
    name.push(".html");
    out_dir.join(name)
}

/// Link target for `input` on the index page, relative to `out_dir`.
pub fn index_href(input: &Path, out_dir: &Path) -> String {
    let page = html_output_path(input, out_dir);
    page.strip_prefix(out_dir)
        .unwrap_or(&page)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
