//! Persistence collaborator
//!
//! Stores serialized outlines by key. Implementations only move text; they
//! never look at nodes or statuses.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Key/value storage for serialized outlines
pub trait OutlineStore: Send + Sync {
    /// Store `text` under `key`, replacing any previous value
    ///
    /// # Errors
    /// Backend-specific I/O failures.
    fn save(&self, key: &str, text: &str) -> io::Result<()>;

    /// Text stored under `key`
    ///
    /// # Errors
    /// `NotFound` when nothing is stored under `key`.
    fn load(&self, key: &str) -> io::Result<String>;

    /// All stored keys, sorted
    ///
    /// # Errors
    /// Backend-specific I/O failures.
    fn keys(&self) -> io::Result<Vec<String>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutlineStore for MemoryStore {
    fn save(&self, key: &str, text: &str) -> io::Result<()> {
        self.entries.write().insert(key.to_string(), text.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> io::Result<String> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no outline '{key}'")))
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

/// Directory of `<key>.md` files
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// File extension of stored outlines
    pub const EXTENSION: &'static str = "md";

    /// Store rooted at `root`, created if missing
    ///
    /// # Errors
    /// Directory creation failures.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid outline key '{key}'"),
            ));
        }
        Ok(self.root.join(format!("{key}.{}", Self::EXTENSION)))
    }
}

impl OutlineStore for DirectoryStore {
    fn save(&self, key: &str, text: &str) -> io::Result<()> {
        let path = self.path_for(key)?;
        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("md.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)
    }

    fn load(&self, key: &str) -> io::Result<String> {
        fs::read_to_string(self.path_for(key)?)
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(Self::EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip() {
        let store = MemoryStore::new();
        store.save("b", "- two\n").unwrap();
        store.save("a", "- one\n").unwrap();
        assert_eq!(store.load("a").unwrap(), "- one\n");
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
        assert_eq!(store.load("c").unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn directory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path().join("outlines")).unwrap();
        store.save("plan", "- [ ] x\n").unwrap();
        assert_eq!(store.load("plan").unwrap(), "- [ ] x\n");
        assert_eq!(store.keys().unwrap(), vec!["plan"]);
    }

    #[test]
    fn directory_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        for key in ["../escape", "a/b", "", ".hidden"] {
            assert_eq!(
                store.save(key, "").unwrap_err().kind(),
                io::ErrorKind::InvalidInput,
                "{key}"
            );
        }
    }
}
