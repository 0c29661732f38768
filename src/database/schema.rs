//! Column schema translation
//!
//! Pure translation from user-authored column specifications into SQLite
//! table DDL, plus `PRAGMA table_info` introspection for the UI boundary.
//! The validated column `key` is always the SQL column name; the `label`
//! is free-form display text and may contain characters illegal in an
//! identifier.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Maximum length of a column key or table name
pub const MAX_IDENTIFIER_LEN: usize = 50;

/// Storage type of a user-defined column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean,
}

impl ColumnType {
    /// SQL type name; total match so new variants force a review here
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

/// Scalar default value for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl DefaultValue {
    /// Render as a SQL literal: strings quoted, numbers and booleans bare
    fn to_sql_literal(&self) -> String {
        match self {
            DefaultValue::Boolean(true) => "TRUE".to_string(),
            DefaultValue::Boolean(false) => "FALSE".to_string(),
            DefaultValue::Integer(v) => v.to_string(),
            DefaultValue::Real(v) => v.to_string(),
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

/// User-authored description of one table column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    /// Identifier used as the SQL column name
    pub key: String,

    /// Display label shown in the UI
    pub label: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl ColumnSpec {
    /// Check that the key is a valid identifier and the label is non-empty
    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(&self.key) {
            return Err(Error::schema(format!(
                "Invalid column key '{}': must match ^[a-zA-Z_][a-zA-Z0-9_]*$ and be at most {} characters",
                self.key, MAX_IDENTIFIER_LEN
            )));
        }
        if self.label.trim().is_empty() {
            return Err(Error::schema(format!(
                "Column '{}' has an empty label",
                self.key
            )));
        }
        Ok(())
    }
}

/// `true` for `^[a-zA-Z_][a-zA-Z0-9_]*$` identifiers of at most 50 chars
pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build an idempotent `CREATE TABLE` statement from column specifications
///
/// Fails if the column list is empty or any identifier is malformed.
/// Pure and deterministic for a given input.
pub fn build_create_table(table: &str, columns: &[ColumnSpec]) -> Result<String> {
    if !is_valid_identifier(table) {
        return Err(Error::schema(format!("Invalid table name '{}'", table)));
    }
    if columns.is_empty() {
        return Err(Error::schema(format!(
            "Cannot create table '{}': no columns provided",
            table
        )));
    }

    let mut defs = Vec::with_capacity(columns.len());
    for col in columns {
        col.validate()?;
        let mut def = format!("`{}` {}", col.key, col.column_type.as_sql());
        if col.required {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &col.default {
            def.push_str(&format!(" DEFAULT {}", default.to_sql_literal()));
        }
        defs.push(def);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n    {}\n)",
        table,
        defs.join(",\n    ")
    ))
}

/// Simplified column description returned to the UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub notnull: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
}

/// Read a table's column definitions via `PRAGMA table_info`
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<TableColumnInfo>> {
    if !is_valid_identifier(table) {
        return Err(Error::schema(format!("Invalid table name '{}'", table)));
    }

    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(`{}`)", table))
        .map_err(|e| Error::storage(format!("Failed to read table info for '{}': {}", table, e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(TableColumnInfo {
                name: row.get(1)?,
                column_type: row.get(2)?,
                notnull: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? != 0,
            })
        })
        .map_err(|e| Error::storage(format!("Failed to read table info for '{}': {}", table, e)))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::storage(format!("Failed to read table info for '{}': {}", table, e)))
}

/// Built-in table schema used when a workspace is created without one
pub fn default_table_schema() -> Vec<ColumnSpec> {
    fn col(key: &str, label: &str, column_type: ColumnType) -> ColumnSpec {
        ColumnSpec {
            key: key.to_string(),
            label: label.to_string(),
            column_type,
            required: false,
            default: None,
        }
    }

    vec![
        col("title", "Title", ColumnType::Text),
        col("total_volumes", "Volumes", ColumnType::Integer),
        col("current_volume", "Volume no.", ColumnType::Integer),
        col("author", "Author", ColumnType::Text),
        col("content", "Contents", ColumnType::Text),
        col("annotation", "Annotation", ColumnType::Text),
        col("genre", "Genre", ColumnType::Text),
        col("year", "Year", ColumnType::Integer),
        col("tags", "Tags", ColumnType::Text),
    ]
}
