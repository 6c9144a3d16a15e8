//! Persistent key/value store for editor state.
//!
//! A flat JSON object on disk. Every write rewrites the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

/// Notation text, stored JSON-encoded.
pub const CODE_KEY: &str = "code";
/// `"true"` or `"false"`.
pub const VIM_MODE_KEY: &str = "vimmode";
/// `"light"` or `"dark"`.
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access storage file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Storage {
    path: Option<PathBuf>,
    items: BTreeMap<String, String>,
}

impl Storage {
    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// `<data dir>/lesheets/storage.json`, or a file in the working directory
    /// when the platform has no data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir().map_or_else(
            || PathBuf::from(".lesheets-storage.json"),
            |dir| dir.join("lesheets").join("storage.json"),
        )
    }

    /// Open the store at `path`. A missing file yields an empty store.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            items,
        })
    }

    /// Open the store, starting empty if the file is unreadable.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(storage) => storage,
            Err(err) => {
                tracing::warn!("Starting with empty storage: {err}");
                Self {
                    path: Some(path),
                    items: BTreeMap::new(),
                }
            }
        }
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// # Errors
    /// Returns [`StorageError`] if the store cannot be written back to disk.
    pub fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        self.persist()
    }

    /// # Errors
    /// Returns [`StorageError`] if the store cannot be written back to disk.
    pub fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        if self.items.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Store notation text under [`CODE_KEY`].
    ///
    /// Encoding and disk failures are logged, not returned.
    pub fn save_code(&mut self, text: &str) {
        let encoded = serde_json::to_string(text).unwrap_or_else(|err| {
            tracing::warn!("Failed to encode buffer for storage: {err}");
            String::new()
        });
        if let Err(err) = self.set_item(CODE_KEY, &encoded) {
            tracing::warn!("Failed to store buffer: {err}");
        }
    }

    /// The stored notation text, or an empty string if missing or undecodable.
    pub fn load_code(&self) -> String {
        self.get_item(CODE_KEY)
            .and_then(|encoded| serde_json::from_str::<String>(encoded).ok())
            .unwrap_or_default()
    }

    pub fn vim_mode(&self) -> bool {
        self.get_item(VIM_MODE_KEY) == Some("true")
    }

    /// # Errors
    /// Returns [`StorageError`] if the store cannot be written back to disk.
    pub fn set_vim_mode(&mut self, enabled: bool) -> Result<(), StorageError> {
        self.set_item(VIM_MODE_KEY, if enabled { "true" } else { "false" })
    }

    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_error = |source| StorageError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(&self.items)?;
        fs::write(path, json).map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("nope.json")).unwrap();
        assert_eq!(storage.get_item(CODE_KEY), None);
        assert_eq!(storage.load_code(), "");
    }

    #[test]
    fn test_items_persist_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let mut storage = Storage::open(&path).unwrap();
        storage.save_code("A | B\n");
        storage.set_vim_mode(true).unwrap();
        storage.set_item(THEME_KEY, "dark").unwrap();

        let reopened = Storage::open(&path).unwrap();
        assert_eq!(reopened.load_code(), "A | B\n");
        assert!(reopened.vim_mode());
        assert_eq!(reopened.get_item(THEME_KEY), Some("dark"));
    }

    #[test]
    fn test_code_is_stored_json_encoded() {
        let mut storage = Storage::in_memory();
        storage.save_code("line \"one\"\n");
        assert_eq!(storage.get_item(CODE_KEY), Some("\"line \\\"one\\\"\\n\""));
    }

    #[test]
    fn test_undecodable_code_loads_empty() {
        let mut storage = Storage::in_memory();
        storage.set_item(CODE_KEY, "not json").unwrap();
        assert_eq!(storage.load_code(), "");
    }

    #[test]
    fn test_corrupt_file_is_an_error_but_open_or_empty_recovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(Storage::open(&path), Err(StorageError::Json(_))));

        let mut storage = Storage::open_or_empty(&path);
        assert_eq!(storage.get_item(CODE_KEY), None);

        // The recovered store still writes back to the same file.
        storage.set_item(THEME_KEY, "dark").unwrap();
        let reopened = Storage::open(&path).unwrap();
        assert_eq!(reopened.get_item(THEME_KEY), Some("dark"));
    }

    #[test]
    fn test_vim_mode_defaults_off() {
        let mut storage = Storage::in_memory();
        assert!(!storage.vim_mode());
        storage.set_vim_mode(true).unwrap();
        assert_eq!(storage.get_item(VIM_MODE_KEY), Some("true"));
        storage.set_vim_mode(false).unwrap();
        assert!(!storage.vim_mode());
    }

    #[test]
    fn test_remove_item() {
        let mut storage = Storage::in_memory();
        storage.set_item(THEME_KEY, "light").unwrap();
        storage.remove_item(THEME_KEY).unwrap();
        assert_eq!(storage.get_item(THEME_KEY), None);
    }

    proptest! {
        #[test]
        fn prop_code_round_trips(text in any::<String>()) {
            let mut storage = Storage::in_memory();
            storage.save_code(&text);
            prop_assert_eq!(storage.load_code(), text);
        }

        #[test]
        fn prop_code_round_trips_through_disk(text in "[ -~\n\tä♭♯]{0,64}") {
            let dir = tempdir().unwrap();
            let path = dir.path().join("storage.json");
            let mut storage = Storage::open(&path).unwrap();
            storage.save_code(&text);
            prop_assert_eq!(Storage::open(&path).unwrap().load_code(), text);
        }
    }
}
