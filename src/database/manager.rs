//! Database connection cache
//!
//! Owns at most one live SQLite handle per canonical file path. Handles
//! are opened lazily, configured with the PRAGMA settings from the
//! process configuration, and evicted explicitly on close or at
//! shutdown. Callers address databases by root-relative paths; the cache
//! key is always the normalized absolute path.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::DatabasePragmas;
use crate::database::schema::{build_create_table, is_valid_identifier, ColumnSpec};
use crate::errors::{Error, Result};

/// Size and record count of one workspace database
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub size: u64,
    pub records: u64,
}

/// Cache of open database connections keyed by canonical path
pub struct DatabaseManager {
    root: PathBuf,
    pragmas: DatabasePragmas,
    cache: HashMap<PathBuf, Connection>,
}

impl DatabaseManager {
    /// Create a manager rooted at the data directory
    pub fn new(root: impl Into<PathBuf>, pragmas: DatabasePragmas) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            root,
            pragmas,
            cache: HashMap::new(),
        }
    }

    /// Normalized absolute path used as the cache key
    fn canonical_path(&self, rel: &str) -> PathBuf {
        let joined = self.root.join(rel);
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        normalized
    }

    /// Open a database, or return the cached handle for its path
    ///
    /// Ensures the parent directory exists and applies the configured
    /// PRAGMAs before the handle enters the cache; on any failure the
    /// cache is left unmodified.
    pub fn open(&mut self, rel: &str) -> Result<&Connection> {
        let path = self.canonical_path(rel);
        let pragmas = self.pragmas.clone();
        match self.cache.entry(path) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                if let Some(parent) = entry.key().parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        Error::storage(format!(
                            "Failed to create directory '{}': {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }

                info!("Opening database: {}", entry.key().display());
                let conn = Connection::open(entry.key()).map_err(|e| {
                    Error::storage(format!(
                        "Failed to open database at '{}': {}",
                        entry.key().display(),
                        e
                    ))
                })?;
                configure(&conn, &pragmas)?;

                Ok(entry.insert(conn))
            }
        }
    }

    /// Return the cached handle for a path; never opens implicitly
    pub fn get(&self, rel: &str) -> Result<&Connection> {
        let path = self.canonical_path(rel);
        self.cache
            .get(&path)
            .ok_or_else(|| Error::not_found("database", path.display().to_string()))
    }

    /// Whether a handle for this path is currently cached
    pub fn is_open(&self, rel: &str) -> bool {
        self.cache.contains_key(&self.canonical_path(rel))
    }

    /// Close and evict the handle for a path; no-op if absent
    pub fn close(&mut self, rel: &str) {
        let path = self.canonical_path(rel);
        if let Some(conn) = self.cache.remove(&path) {
            match conn.close() {
                Ok(()) => info!("Database closed: {}", path.display()),
                Err((_, e)) => warn!("Error closing database '{}': {}", path.display(), e),
            }
        }
    }

    /// Close and evict every cached handle; used at process shutdown
    ///
    /// Individual close failures are logged and do not abort the sweep.
    pub fn close_all(&mut self) {
        for (path, conn) in self.cache.drain() {
            match conn.close() {
                Ok(()) => info!("Database closed: {}", path.display()),
                Err((_, e)) => warn!("Error closing database '{}': {}", path.display(), e),
            }
        }
    }

    /// Number of cached handles
    pub fn open_count(&self) -> usize {
        self.cache.len()
    }

    /// Open the database and create a table from column specifications
    pub fn create_table(&mut self, rel: &str, table: &str, columns: &[ColumnSpec]) -> Result<()> {
        let ddl = build_create_table(table, columns)?;
        let conn = self.open(rel)?;
        info!("Creating table '{}' in {}", table, rel);
        conn.execute(&ddl, [])
            .map_err(|e| Error::storage(format!("Failed to create table '{}': {}", table, e)))?;
        Ok(())
    }

    /// File size and record count for a table
    pub fn stats(&mut self, rel: &str, table: &str) -> Result<DatabaseStats> {
        if !is_valid_identifier(table) {
            return Err(Error::schema(format!("Invalid table name '{}'", table)));
        }
        let path = self.canonical_path(rel);
        let size = fs::metadata(&path)
            .map_err(|e| {
                Error::storage(format!("Failed to stat database '{}': {}", path.display(), e))
            })?
            .len();

        let conn = self.open(rel)?;
        let records: u64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM `{}`", table), [], |row| {
                row.get(0)
            })
            .map_err(|e| Error::storage(format!("Failed to count rows in '{}': {}", table, e)))?;

        Ok(DatabaseStats { size, records })
    }

    /// Dump every row of a table as JSON objects keyed by column name
    ///
    /// Blob columns are exported as null.
    pub fn export_rows(&mut self, rel: &str, table: &str) -> Result<Vec<Map<String, Value>>> {
        if !is_valid_identifier(table) {
            return Err(Error::schema(format!("Invalid table name '{}'", table)));
        }
        let conn = self.open(rel)?;

        let mut stmt = conn
            .prepare(&format!("SELECT * FROM `{}`", table))
            .map_err(|e| Error::storage(format!("Failed to read table '{}': {}", table, e)))?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| Error::storage(format!("Failed to read table '{}': {}", table, e)))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| Error::storage(format!("Failed to read table '{}': {}", table, e)))?
        {
            let mut obj = Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = match row.get_ref(i).map_err(|e| {
                    Error::storage(format!("Failed to read column '{}': {}", name, e))
                })? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(v) => Value::from(v),
                    ValueRef::Real(v) => Value::from(v),
                    ValueRef::Text(v) => Value::from(String::from_utf8_lossy(v).into_owned()),
                    ValueRef::Blob(_) => Value::Null,
                };
                obj.insert(name.clone(), value);
            }
            out.push(obj);
        }
        Ok(out)
    }

    /// Run `VACUUM` on a database
    pub fn vacuum(&mut self, rel: &str) -> Result<()> {
        let conn = self.open(rel)?;
        conn.execute("VACUUM", [])
            .map_err(|e| Error::storage(format!("Failed to vacuum database '{}': {}", rel, e)))?;
        info!("Database vacuumed: {}", rel);
        Ok(())
    }
}

/// Apply durability/performance PRAGMAs to a fresh connection
fn configure(conn: &Connection, pragmas: &DatabasePragmas) -> Result<()> {
    // journal_mode returns the resulting mode as a row
    let _: String = conn
        .query_row(
            &format!("PRAGMA journal_mode={}", pragmas.journal_mode),
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::storage(format!("Failed to set journal mode: {}", e)))?;

    conn.execute(&format!("PRAGMA synchronous={}", pragmas.synchronous), [])
        .map_err(|e| Error::storage(format!("Failed to set synchronous mode: {}", e)))?;

    conn.execute(&format!("PRAGMA cache_size={}", pragmas.cache_size), [])
        .map_err(|e| Error::storage(format!("Failed to set cache size: {}", e)))?;

    conn.execute(&format!("PRAGMA temp_store={}", pragmas.temp_store), [])
        .map_err(|e| Error::storage(format!("Failed to set temp store: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{ColumnType, DefaultValue};

    fn test_manager() -> (tempfile::TempDir, DatabaseManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatabaseManager::new(dir.path(), DatabasePragmas::default());
        (dir, manager)
    }

    fn title_column() -> ColumnSpec {
        ColumnSpec {
            key: "title".to_string(),
            label: "Title".to_string(),
            column_type: ColumnType::Text,
            required: false,
            default: None,
        }
    }

    #[test]
    fn test_open_returns_cached_handle() {
        let (_dir, mut manager) = test_manager();

        let first = manager.open("ws/database.db").unwrap() as *const Connection as usize;
        let second = manager.open("ws/database.db").unwrap() as *const Connection as usize;

        assert_eq!(first, second);
        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn test_canonical_path_deduplicates() {
        let (_dir, mut manager) = test_manager();

        manager.open("ws/database.db").unwrap();
        manager.open("./ws/database.db").unwrap();

        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let (dir, mut manager) = test_manager();
        manager.open("nested/deep/database.db").unwrap();
        assert!(dir.path().join("nested").join("deep").is_dir());
    }

    #[test]
    fn test_get_without_open_fails() {
        let (_dir, manager) = test_manager();
        let err = manager.get("ws/database.db").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_close_then_get_fails() {
        let (_dir, mut manager) = test_manager();
        manager.open("ws/database.db").unwrap();
        assert!(manager.is_open("ws/database.db"));

        manager.close("ws/database.db");
        assert!(!manager.is_open("ws/database.db"));
        assert_eq!(manager.get("ws/database.db").unwrap_err().code(), "NOT_FOUND");
    }

    #[test]
    fn test_close_absent_is_noop() {
        let (_dir, mut manager) = test_manager();
        manager.close("never/opened.db");
    }

    #[test]
    fn test_close_all() {
        let (_dir, mut manager) = test_manager();
        manager.open("a/database.db").unwrap();
        manager.open("b/database.db").unwrap();
        assert_eq!(manager.open_count(), 2);

        manager.close_all();
        assert_eq!(manager.open_count(), 0);
    }

    #[test]
    fn test_create_table() {
        let (_dir, mut manager) = test_manager();
        manager
            .create_table("ws/database.db", "books", &[title_column()])
            .unwrap();

        let conn = manager.get("ws/database.db").unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='books'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_create_table_empty_columns_leaves_cache_usable() {
        let (_dir, mut manager) = test_manager();
        let err = manager.create_table("ws/database.db", "books", &[]).unwrap_err();
        assert_eq!(err.code(), "SCHEMA_ERROR");
        // DDL validation fails before any open happens
        assert_eq!(manager.open_count(), 0);
    }

    #[test]
    fn test_stats_and_export() {
        let (_dir, mut manager) = test_manager();
        let columns = vec![
            title_column(),
            ColumnSpec {
                key: "year".to_string(),
                label: "Year".to_string(),
                column_type: ColumnType::Integer,
                required: false,
                default: Some(DefaultValue::Integer(1984)),
            },
        ];
        manager.create_table("ws/database.db", "books", &columns).unwrap();

        {
            let conn = manager.get("ws/database.db").unwrap();
            conn.execute(
                "INSERT INTO books (title, year) VALUES ('Dune', 1965), ('Neuromancer', 1984)",
                [],
            )
            .unwrap();
        }

        let stats = manager.stats("ws/database.db", "books").unwrap();
        assert_eq!(stats.records, 2);
        assert!(stats.size > 0);

        let rows = manager.export_rows("ws/database.db", "books").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Dune");
        assert_eq!(rows[1]["year"], 1984);
    }

    #[test]
    fn test_vacuum() {
        let (_dir, mut manager) = test_manager();
        manager
            .create_table("ws/database.db", "books", &[title_column()])
            .unwrap();
        manager.vacuum("ws/database.db").unwrap();
    }
}
