//! SQLite document-store backend.
//!
//! One `documents` table keyed by logical path; `INSERT OR REPLACE` gives
//! the whole-document replacement the storage contract requires.

use super::StorageBackend;
use crate::error::StorageError;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                content TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                content TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StorageBackend for SqliteStorage {
    fn read(&self, path: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let content = conn
            .query_row(
                "SELECT content FROM documents WHERE path = ?1",
                [path],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(content)
    }

    fn write(&self, path: &str, content: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO documents (path, content) VALUES (?1, ?2)",
            [path, content],
        )?;
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE path = ?1",
            [path],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock().expect("storage mutex poisoned");
        // Scope to the directory-like prefix, as the filesystem backend does:
        // "indices" must not match sibling keys like "indices-archive/…".
        let escaped = prefix
            .trim_end_matches('/')
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("{escaped}/%");
        let mut stmt = conn
            .prepare("SELECT path FROM documents WHERE path LIKE ?1 ESCAPE '\\' ORDER BY path")?;
        let rows = stmt.query_map([pattern.as_str()], |row| row.get::<_, String>(0))?;

        let mut paths = Vec::new();
        for row in rows {
            let path = row?;
            if let Some(sfx) = suffix {
                if !path.ends_with(sfx) {
                    continue;
                }
            }
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_replace() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert!(storage.read("indices/2026-01-01.json").unwrap().is_none());

        storage.write("indices/2026-01-01.json", "first").unwrap();
        storage.write("indices/2026-01-01.json", "second").unwrap();
        assert_eq!(storage.read("indices/2026-01-01.json").unwrap().unwrap(), "second");
        assert!(storage.exists("indices/2026-01-01.json").unwrap());
    }

    #[test]
    fn test_list_honors_prefix_suffix_and_order() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("indices/2026-01-02.json", "{}").unwrap();
        storage.write("indices/2026-01-01.json", "{}").unwrap();
        storage.write("observations/2026-01-01.jsonl", "").unwrap();

        let listed = storage.list("indices/", Some(".json")).unwrap();
        assert_eq!(
            listed,
            vec!["indices/2026-01-01.json", "indices/2026-01-02.json"]
        );
    }

    #[test]
    fn test_list_excludes_sibling_prefixes() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("indices/2026-01-01.json", "{}").unwrap();
        storage.write("indices-archive/2025-12-31.json", "{}").unwrap();

        let listed = storage.list("indices", Some(".json")).unwrap();
        assert_eq!(listed, vec!["indices/2026-01-01.json"]);
    }

    #[test]
    fn test_same_contract_as_filesystem_latest() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("indices/2026-01-01.json", "{}").unwrap();
        storage.write("indices/2026-01-05.json", "{}").unwrap();
        let latest = crate::storage::latest_dated_file(&storage, "indices/", ".json").unwrap();
        assert_eq!(latest.as_deref(), Some("indices/2026-01-05.json"));
    }
}
