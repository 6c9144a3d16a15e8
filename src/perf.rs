//! Lightweight performance instrumentation.
//!
//! Timing scopes report through `tracing` under the `lesheets::perf` target
//! when `--perf` is on. The render debug log is a separate plain-text file
//! for tracing the edit/render pipeline step by step.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOGGER: LazyLock<Mutex<DebugLogger>> =
    LazyLock::new(|| Mutex::new(DebugLogger::new()));

#[derive(Debug)]
pub struct Scope {
    name: Cow<'static, str>,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(target: "lesheets::perf", scope = %self.name, elapsed_ms, "perf");
        log_event(&self.name, format!("{elapsed_ms:.2} ms"));
    }
}

#[derive(Debug)]
struct DebugLogger {
    enabled: bool,
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl DebugLogger {
    fn new() -> Self {
        Self {
            enabled: false,
            start: Instant::now(),
            writer: None,
        }
    }
}

// A panic while holding the lock leaves the logger usable.
fn logger() -> MutexGuard<'static, DebugLogger> {
    DEBUG_LOGGER
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn scope(name: impl Into<Cow<'static, str>>) -> Scope {
    Scope {
        name: name.into(),
        start: Instant::now(),
    }
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Start writing the render debug log to `path`, or stop with `None`.
///
/// # Errors
/// Fails if the log file cannot be created.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut logger = logger();
    if let Some(path) = path {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "lesheets render debug log start")?;
        writer.flush()?;
        logger.enabled = true;
        logger.start = Instant::now();
        logger.writer = Some(writer);
    } else {
        logger.enabled = false;
        logger.writer = None;
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    logger().enabled
}

pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut logger = logger();
    if !logger.enabled {
        return;
    }
    let elapsed_ms = logger.start.elapsed().as_secs_f64() * 1000.0;
    if let Some(writer) = logger.writer.as_mut() {
        let _ = writeln!(
            writer,
            "[{elapsed_ms:>10.3} ms] {name}: {}",
            detail.as_ref()
        );
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_set_enabled_toggles_runtime_flag() {
        set_enabled(true);
        assert!(is_enabled());

        set_enabled(false);
        assert!(!is_enabled());
    }

    #[test]
    fn test_debug_log_records_events_and_owned_scope_names() {
        let temp_file = NamedTempFile::new().unwrap();
        set_debug_log_path(Some(temp_file.path())).unwrap();
        assert!(is_debug_log_enabled());
        log_event("pipeline.edit", "revision=3");
        set_enabled(true);
        drop(scope(format!("render {}", "Song.lesheet")));
        set_enabled(false);
        set_debug_log_path(None).unwrap();
        assert!(!is_debug_log_enabled());

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("lesheets render debug log start"));
        assert!(content.contains("pipeline.edit: revision=3"));
        assert!(content.contains("render Song.lesheet:"));
    }
}
