//! Database module
//!
//! This module provides the physical-database half of the orchestration
//! layer, organized into:
//!
//! - **manager**: the connection cache, holding at most one live SQLite handle
//!   per canonical file path, opened lazily and configured from the
//!   process configuration
//! - **schema**: pure translation from user-authored column
//!   specifications into table DDL, plus `PRAGMA table_info`
//!   introspection for the UI boundary
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── manager     # DatabaseManager: open/get/close/close_all + stats/export
//! └── schema      # ColumnSpec -> CREATE TABLE translation, introspection
//! ```
//!
//! Each workspace owns exactly one database file
//! (`<root>/workspaces/<id>/database.db`) with a single table whose shape
//! comes from the workspace's column schema.

pub mod manager;
pub mod schema;

pub use manager::{DatabaseManager, DatabaseStats};
pub use schema::{
    build_create_table, default_table_schema, is_valid_identifier, table_columns, ColumnSpec,
    ColumnType, DefaultValue, TableColumnInfo, MAX_IDENTIFIER_LEN,
};
