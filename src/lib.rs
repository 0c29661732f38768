#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Bookshelf - workspace and database orchestration
//!
//! Bookshelf is the storage core of a desktop book-library manager. It
//! tracks a set of independent, file-backed workspaces, each owning one
//! SQLite database and one settings document, and coordinates the
//! multi-step, rollback-safe sequence of directory/database/registry
//! mutations that workspace creation and deletion require.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - **[`workspace`]**: workspace lifecycle
//!   - `service`: the orchestrator consumed by external callers
//!   - `registry`: the persisted record list and active pointer
//!   - `settings`: per-workspace settings documents with caching
//!   - `types`: records, settings, validation
//!
//! - **[`database`]**: the physical databases
//!   - `manager`: connection cache, one handle per canonical path
//!   - `schema`: column specifications to `CREATE TABLE` translation
//!
//! - **[`config`]**: configuration management
//! - **[`errors`]**: the typed error taxonomy
//! - **[`api`]**: the response envelope for the dispatch boundary
//! - **[`fsutil`]**: the filesystem helpers the orchestrator consumes
//!
//! # On-disk layout
//!
//! ```text
//! <root>/workspaces/<workspace-id>/database.db    # one database per workspace
//! <root>/workspaces/<workspace-id>/settings.json  # settings document
//! <root>/global.json                              # registry document
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bookshelf::{BookshelfConfig, WorkspaceService};
//!
//! let config = BookshelfConfig::new(&None)?;
//! let mut service = WorkspaceService::new(config)?;
//!
//! // Create a workspace with the built-in default schema
//! let record = service.create("Library", None)?;
//!
//! // The first workspace becomes active
//! assert_eq!(service.get_active()?.map(|w| w.id), Some(record.id));
//!
//! // Adjust display preferences with a deep-merged patch
//! service.update_settings(record.id, &serde_json::json!({
//!     "table": { "pageSize": 50 }
//! }))?;
//!
//! // Release database handles at shutdown
//! service.close_all();
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod fsutil;
pub mod workspace;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{BookshelfConfig, DatabasePragmas, DEFAULT_MAX_WORKSPACES, DEFAULT_TABLE_NAME};

// =============================================================================
// Errors
// =============================================================================

pub use errors::{Error, Result};

// =============================================================================
// Database Module - commonly used types
// =============================================================================

pub use database::{
    build_create_table, default_table_schema, table_columns, ColumnSpec, ColumnType,
    DatabaseManager, DatabaseStats, DefaultValue, TableColumnInfo,
};

// =============================================================================
// Workspace Module - commonly used types
// =============================================================================

pub use workspace::{
    ExportBundle, ExportData, SettingsStore, TableSettings, Tag, Theme, WorkspacePaths,
    WorkspaceRecord, WorkspaceRegistry, WorkspaceService, WorkspaceSettings, WorkspaceStats,
    WorkspaceUpdate,
};

// =============================================================================
// API envelope
// =============================================================================

pub use api::{ApiError, ApiResponse};
