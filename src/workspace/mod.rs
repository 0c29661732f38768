//! Workspace module
//!
//! Everything that makes a workspace a workspace:
//!
//! - **types**: records, the settings document, and their validation
//! - **registry**: the persisted list of workspaces and the active pointer
//! - **settings**: per-workspace settings storage with an in-memory cache
//! - **service**: the orchestrator composing the above with the
//!   database layer, including rollback-safe creation
//!
//! # Architecture
//!
//! ```text
//! workspace/
//! ├── types       # WorkspaceRecord, WorkspaceSettings, validation
//! ├── registry    # WorkspaceRegistry over <root>/global.json
//! ├── settings    # SettingsStore over <root>/workspaces/<id>/settings.json
//! └── service     # WorkspaceService: create/delete/activate/stats/export
//! ```

pub mod registry;
pub mod service;
pub mod settings;
pub mod types;

pub use registry::{RegistryDocument, WorkspaceRegistry};
pub use service::{
    ExportBundle, ExportData, WorkspaceFileStats, WorkspaceService, WorkspaceStats,
};
pub use settings::SettingsStore;
pub use types::{
    validate_workspace_name, ExportFormat, ExportSettings, RowHeight, TableSettings, Tag, Theme,
    WorkspacePaths, WorkspaceRecord, WorkspaceSettings, WorkspaceUpdate, MAX_WORKSPACE_NAME_LEN,
};
