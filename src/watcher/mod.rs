//! File watching for `lesheets watch` and the editor's external-change reload.
//!
//! Uses notify for cross-platform file system events. Each watched file gets
//! its own debounce key, so a burst of writes to one sheet never holds back
//! another.
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::pipeline::Debouncer;

#[derive(Debug, Clone)]
struct Target {
    path: PathBuf,
    name: Option<OsString>,
    root: PathBuf,
}

impl Target {
    fn new(path: &Path) -> Self {
        // Event paths from the OS are canonical, so match against that form.
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let name = path.file_name().map(std::ffi::OsStr::to_os_string);
        let root = watch_root_for(&path);
        Self { path, name, root }
    }

    fn matches(&self, event_path: &Path) -> bool {
        event_path == self.root
            || event_path == self.path
            || (event_path.parent() == Some(self.root.as_path())
                && self
                    .name
                    .as_ref()
                    .is_some_and(|name| event_path.file_name() == Some(name.as_os_str())))
    }
}

/// Watches a set of sheet files and reports each one once its writes settle.
pub struct SheetWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    targets: Vec<Target>,
    debouncer: Debouncer<PathBuf>,
    started: Instant,
}

impl std::fmt::Debug for SheetWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetWatcher")
            .field("targets", &self.targets)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl SheetWatcher {
    /// Watch every path in `paths`. Parent directories are watched
    /// non-recursively, once each.
    ///
    /// # Errors
    /// Returns an error if the watcher cannot be created or a directory cannot be watched.
    pub fn new<P: AsRef<Path>>(paths: &[P], debounce: Duration) -> notify::Result<Self> {
        let targets: Vec<Target> = paths.iter().map(|p| Target::new(p.as_ref())).collect();
        let roots: BTreeSet<&PathBuf> = targets.iter().map(|t| &t.root).collect();

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        for root in roots {
            watcher.watch(root, RecursiveMode::NonRecursive)?;
        }

        Ok(Self {
            _watcher: watcher,
            rx,
            targets,
            debouncer: Debouncer::new(debounce),
            started: Instant::now(),
        })
    }

    /// Canonical paths of the watched files, in the order given.
    pub fn targets(&self) -> impl Iterator<Item = &Path> {
        self.targets.iter().map(|t| t.path.as_path())
    }

    /// Drain pending events and return the files whose debounce has elapsed.
    pub fn take_changed(&mut self) -> Vec<PathBuf> {
        let now_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.take_changed_at(now_ms)
    }

    fn take_changed_at(&mut self, now_ms: u64) -> Vec<PathBuf> {
        let mut total_events = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            total_events += 1;
            match event {
                Ok(ev) => self.note_event(&ev, now_ms),
                Err(err) => {
                    tracing::warn!(error = %err, "file watcher error");
                    crate::perf::log_event("watcher.error", format!("{err}"));
                }
            }
        }
        if total_events > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!("total={total_events} pending={}", self.debouncer.is_pending()),
            );
        }
        self.debouncer.take_ready(now_ms)
    }

    fn note_event(&mut self, event: &Event, now_ms: u64) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        let hits: Vec<PathBuf> = self
            .targets
            .iter()
            .filter(|target| event.paths.iter().any(|p| target.matches(p)))
            .map(|target| target.path.clone())
            .collect();
        if hits.is_empty() {
            crate::perf::log_event(
                "watcher.irrelevant",
                format!("kind={:?} paths={:?}", event.kind, event.paths),
            );
        }
        for path in hits {
            self.debouncer.queue(path, now_ms);
        }
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Poll until `path` exists or `timeout` passes. Editors that save by
/// rename leave a short gap where the file is missing.
pub fn wait_for_file(path: &Path, timeout: Duration, interval: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if path.exists() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, ModifyKind};
    use tempfile::tempdir;

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event {
            kind,
            paths: vec![path],
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_directory_level_event_marks_every_file_in_that_directory() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let a = canonical_dir.join("a.lesheet");
        let b = canonical_dir.join("b.lesheet");
        std::fs::write(&a, "| C |").expect("write");
        std::fs::write(&b, "| G |").expect("write");
        let mut watcher = SheetWatcher::new(&[&a, &b], Duration::from_millis(10)).expect("watcher");

        watcher.note_event(&event(EventKind::Any, canonical_dir), 0);

        let mut ready = watcher.debouncer.take_ready(100);
        ready.sort();
        assert_eq!(ready, vec![a, b]);
    }

    #[test]
    fn test_each_file_is_debounced_independently() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let a = canonical_dir.join("a.lesheet");
        let b = canonical_dir.join("b.lesheet");
        std::fs::write(&a, "| C |").expect("write");
        std::fs::write(&b, "| G |").expect("write");
        let mut watcher =
            SheetWatcher::new(&[&a, &b], Duration::from_millis(100)).expect("watcher");
        let modify = EventKind::Modify(ModifyKind::Any);

        watcher.note_event(&event(modify, a.clone()), 0);
        watcher.note_event(&event(modify, b.clone()), 80);
        assert_eq!(watcher.debouncer.take_ready(120), vec![a]);
        assert_eq!(watcher.debouncer.take_ready(180), vec![b]);
    }

    #[test]
    fn test_access_and_unrelated_events_are_ignored() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let a = canonical_dir.join("a.lesheet");
        std::fs::write(&a, "| C |").expect("write");
        let mut watcher = SheetWatcher::new(&[&a], Duration::from_millis(10)).expect("watcher");

        watcher.note_event(&event(EventKind::Access(AccessKind::Any), a), 0);
        watcher.note_event(
            &event(EventKind::Modify(ModifyKind::Any), canonical_dir.join("notes.txt")),
            0,
        );
        assert!(!watcher.debouncer.is_pending());
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("Song.lesheet"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_wait_for_file_reports_missing_file() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("gone.lesheet");
        assert!(!wait_for_file(&missing, Duration::from_millis(30), Duration::from_millis(10)));
        std::fs::write(&missing, "").expect("write");
        assert!(wait_for_file(&missing, Duration::from_millis(30), Duration::from_millis(10)));
    }

    #[test]
    fn test_real_file_modification_detected() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("watched.lesheet");
        std::fs::write(&path, "| C |").expect("write");

        let mut watcher = SheetWatcher::new(&[&path], Duration::from_millis(50)).expect("watcher");

        // Give the backend time to register the watch
        std::thread::sleep(Duration::from_millis(500));

        std::fs::write(&path, "| C | G |").expect("write");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline {
            if watcher.take_changed().contains(&path) {
                detected = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        assert!(detected, "watcher should detect real file modification within 5 seconds");
    }
}
