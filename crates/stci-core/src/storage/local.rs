//! Filesystem storage backend.

use super::StorageBackend;
use crate::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    fn io_err(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl StorageBackend for LocalStorage {
    fn read(&self, path: &str) -> Result<Option<String>, StorageError> {
        let full = self.full_path(path);
        match fs::read_to_string(&full) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_err(&full, e)),
        }
    }

    fn write(&self, path: &str, content: &str) -> Result<(), StorageError> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_err(parent, e))?;
        }

        // Write-then-rename keeps the replacement atomic: readers see either
        // the previous file or the complete new one.
        let tmp = full.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| Self::io_err(&tmp, e))?;
        fs::rename(&tmp, &full).map_err(|e| Self::io_err(&full, e))?;
        debug!(path = %full.display(), bytes = content.len(), "wrote object");
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.full_path(path).exists())
    }

    fn list(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let root = self.full_path(prefix);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(sfx) = suffix {
                if !entry.file_name().to_string_lossy().ends_with(sfx) {
                    continue;
                }
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.base_dir) {
                paths.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_absent_returns_none() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.read("observations/2026-01-01.jsonl").unwrap().is_none());
    }

    #[test]
    fn test_write_read_roundtrip_and_exists() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("indices/2026-01-01.json", "{\"a\":1}").unwrap();
        assert!(storage.exists("indices/2026-01-01.json").unwrap());
        assert_eq!(
            storage.read("indices/2026-01-01.json").unwrap().unwrap(),
            "{\"a\":1}"
        );
    }

    #[test]
    fn test_write_replaces_whole_object() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("indices/2026-01-01.json", "first version, long").unwrap();
        storage.write("indices/2026-01-01.json", "second").unwrap();
        assert_eq!(storage.read("indices/2026-01-01.json").unwrap().unwrap(), "second");
    }

    #[test]
    fn test_list_sorted_with_suffix_filter() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write("indices/2026-01-02.json", "{}").unwrap();
        storage.write("indices/2026-01-01.json", "{}").unwrap();
        storage.write("indices/notes.txt", "x").unwrap();

        let listed = storage.list("indices", Some(".json")).unwrap();
        assert_eq!(
            listed,
            vec!["indices/2026-01-01.json", "indices/2026-01-02.json"]
        );
    }

    #[test]
    fn test_latest_dated_file() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        storage.write("indices/2026-01-01.json", "{}").unwrap();
        storage.write("indices/2026-01-03.json", "{}").unwrap();
        storage.write("indices/2026-01-02.json", "{}").unwrap();

        let latest = crate::storage::latest_dated_file(&storage, "indices", ".json").unwrap();
        assert_eq!(latest.as_deref(), Some("indices/2026-01-03.json"));
    }
}
