//! Workspace orchestration
//!
//! The coordination point consumed by external callers: composes the
//! registry, the connection cache and the settings store to implement
//! create/list/activate/update/delete. This is the only component with
//! multi-step rollback logic: creation pushes a compensation onto an
//! undo stack as each step succeeds and unwinds it in reverse on
//! failure, so a failed create never leaves partial state on disk or in
//! the registry.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{BookshelfConfig, DEFAULT_TABLE_NAME};
use crate::database::manager::{DatabaseManager, DatabaseStats};
use crate::database::schema::{default_table_schema, table_columns, ColumnSpec, TableColumnInfo};
use crate::errors::{Error, Result};
use crate::fsutil;
use crate::workspace::registry::WorkspaceRegistry;
use crate::workspace::settings::SettingsStore;
use crate::workspace::types::{
    validate_workspace_name, WorkspacePaths, WorkspaceRecord, WorkspaceSettings, WorkspaceUpdate,
};

/// File-level statistics for one workspace directory
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFileStats {
    pub size: u64,
    pub files_count: u64,
    pub has_database: bool,
    pub has_settings: bool,
}

/// Aggregate statistics for one workspace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    pub workspace: WorkspaceRecord,
    pub files: WorkspaceFileStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseStats>,
}

/// Row dump included in an export bundle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub rows: Vec<Map<String, Value>>,
    pub exported_at: DateTime<Utc>,
    pub total_records: usize,
}

/// Full export of one workspace: record, settings, and table rows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub workspace: WorkspaceRecord,
    pub settings: WorkspaceSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExportData>,
}

/// Compensation for one completed creation step, unwound in reverse
enum Undo {
    RemoveRegistryEntry(Uuid),
    CloseDatabase(String),
    EvictSettings(Uuid),
    RemoveDirectory(PathBuf),
}

/// Top-level workspace orchestrator
pub struct WorkspaceService {
    config: BookshelfConfig,
    registry: WorkspaceRegistry,
    databases: DatabaseManager,
    settings: SettingsStore,
}

impl WorkspaceService {
    /// Build the service and its sub-components from a configuration
    pub fn new(config: BookshelfConfig) -> Result<Self> {
        config.ensure_layout()?;
        let registry = WorkspaceRegistry::open(config.global_store_path())?;
        let databases = DatabaseManager::new(config.root_dir.clone(), config.pragmas.clone());
        let settings = SettingsStore::new(config.workspaces_dir());
        Ok(Self {
            config,
            registry,
            databases,
            settings,
        })
    }

    /// Create a workspace: directory, settings document, database table,
    /// registry entry, or none of them
    ///
    /// The effective table schema is `columns` when given, otherwise the
    /// built-in default. The first workspace ever created becomes active.
    pub fn create(
        &mut self,
        name: &str,
        columns: Option<Vec<ColumnSpec>>,
    ) -> Result<WorkspaceRecord> {
        let name = validate_workspace_name(name)?;
        info!("Creating workspace: {}", name);

        if self.registry.find_by_name(&name, None).is_some() {
            return Err(Error::conflict(format!(
                "Workspace with name \"{}\" already exists",
                name
            )));
        }
        if self.registry.len() >= self.config.max_workspaces {
            return Err(Error::validation(format!(
                "Cannot create more than {} workspaces",
                self.config.max_workspaces
            )));
        }

        let activate = self.registry.is_empty();
        let record = WorkspaceRecord {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut undo: Vec<Undo> = Vec::new();
        if let Err(e) = self.create_steps(&record, columns, activate, &mut undo) {
            error!("Failed to create workspace {}: {}", record.id, e);
            self.unwind(undo);
            return Err(e);
        }

        info!("Workspace created: {}", record.id);
        Ok(record)
    }

    fn create_steps(
        &mut self,
        record: &WorkspaceRecord,
        columns: Option<Vec<ColumnSpec>>,
        activate: bool,
        undo: &mut Vec<Undo>,
    ) -> Result<()> {
        let dir = self.config.workspace_dir(record.id);
        fsutil::ensure_dir(&dir)?;
        undo.push(Undo::RemoveDirectory(dir));

        // Effective schema: the caller's columns or the built-in default
        let schema = columns.unwrap_or_else(default_table_schema);

        let mut settings = WorkspaceSettings::default();
        settings.table.schema = schema.clone();
        self.settings.save(record.id, &settings)?;
        undo.push(Undo::EvictSettings(record.id));

        let rel = self.config.rel_database_path(record.id);
        // Pushed before the attempt: a DDL failure can leave the
        // connection open, and closing an unopened path is a no-op
        undo.push(Undo::CloseDatabase(rel.clone()));
        self.databases
            .create_table(&rel, DEFAULT_TABLE_NAME, &schema)?;

        self.registry.add(record.clone())?;
        undo.push(Undo::RemoveRegistryEntry(record.id));

        if activate {
            self.registry.set_active_id(Some(record.id))?;
            info!("Set first workspace as active: {}", record.id);
        }
        Ok(())
    }

    /// Run compensations in reverse; failures are logged, never raised,
    /// and never mask the original error
    fn unwind(&mut self, undo: Vec<Undo>) {
        for step in undo.into_iter().rev() {
            match step {
                Undo::RemoveRegistryEntry(id) => {
                    if let Err(e) = self.registry.remove(id) {
                        warn!("Rollback: failed to remove registry entry {}: {}", id, e);
                    }
                }
                Undo::CloseDatabase(rel) => self.databases.close(&rel),
                Undo::EvictSettings(id) => self.settings.clear_cache(Some(id)),
                Undo::RemoveDirectory(dir) => {
                    if let Err(e) = fsutil::remove_path(&dir) {
                        warn!(
                            "Rollback: failed to remove directory '{}': {}",
                            dir.display(),
                            e
                        );
                    }
                }
            }
        }
        info!("Workspace creation rolled back");
    }

    /// Delete a workspace and everything it owns
    ///
    /// At least one workspace must always exist. Deletion steps are
    /// best-effort, since a workspace being gone is the desired
    /// end-state; filesystem and close failures are logged individually
    /// rather than aborting. When the deleted workspace was active, the first
    /// remaining record in registry order is promoted.
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        info!("Deleting workspace: {}", id);
        self.ensure_exists(id)?;

        if self.registry.len() == 1 {
            return Err(Error::validation("Cannot delete the last workspace"));
        }

        let was_active = self.registry.active_id() == Some(id);

        let rel = self.config.rel_database_path(id);
        self.databases.close(&rel);

        let dir = self.config.workspace_dir(id);
        if let Err(e) = fsutil::remove_path(&dir) {
            warn!(
                "Failed to remove workspace directory '{}': {}",
                dir.display(),
                e
            );
        }

        self.registry.remove(id)?;
        self.settings.clear_cache(Some(id));

        if was_active {
            if let Some(next) = self.registry.list().first().map(|w| w.id) {
                self.registry.set_active_id(Some(next))?;
                info!("New active workspace: {}", next);
            }
        }

        info!("Workspace deleted: {}", id);
        Ok(())
    }

    /// All workspace records, insertion order preserved
    pub fn list(&self) -> Vec<WorkspaceRecord> {
        self.registry.list().to_vec()
    }

    /// Look up a workspace by id
    pub fn get_by_id(&self, id: Uuid) -> Result<WorkspaceRecord> {
        self.registry
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("workspace", id.to_string()))
    }

    /// The active workspace, if any
    ///
    /// A dangling active pointer (possible after hand-editing the
    /// registry document) is cleared rather than reported.
    pub fn get_active(&mut self) -> Result<Option<WorkspaceRecord>> {
        let Some(active_id) = self.registry.active_id() else {
            return Ok(None);
        };
        match self.registry.get(active_id) {
            Some(record) => Ok(Some(record.clone())),
            None => {
                warn!(
                    "Active workspace {} no longer exists, clearing pointer",
                    active_id
                );
                self.registry.set_active_id(None)?;
                Ok(None)
            }
        }
    }

    /// Set or clear the active workspace
    pub fn set_active(&mut self, id: Option<Uuid>) -> Result<()> {
        self.registry.set_active_id(id)?;
        match id {
            Some(id) => info!("Active workspace set: {}", id),
            None => info!("Active workspace cleared"),
        }
        Ok(())
    }

    /// Rename a workspace
    pub fn update(&mut self, id: Uuid, update: &WorkspaceUpdate) -> Result<WorkspaceRecord> {
        self.registry.update(id, update)
    }

    /// Read a workspace's settings document
    pub fn get_settings(&mut self, id: Uuid) -> Result<WorkspaceSettings> {
        self.ensure_exists(id)?;
        self.settings.get(id)
    }

    /// Deep-merge a patch into a workspace's settings document
    pub fn update_settings(&mut self, id: Uuid, patch: &Value) -> Result<WorkspaceSettings> {
        self.ensure_exists(id)?;
        self.settings.update(id, patch)
    }

    /// Filesystem locations of a workspace
    pub fn paths(&self, id: Uuid) -> Result<WorkspacePaths> {
        self.ensure_exists(id)?;
        Ok(self.config.workspace_paths(id))
    }

    /// File and database statistics for a workspace
    ///
    /// Database statistics are omitted (not an error) when they cannot
    /// be gathered.
    pub fn get_stats(&mut self, id: Uuid) -> Result<WorkspaceStats> {
        let workspace = self.get_by_id(id)?;
        let paths = self.config.workspace_paths(id);

        let dir = fsutil::dir_stats(&paths.workspace)?;
        let files = WorkspaceFileStats {
            size: dir.size,
            files_count: dir.files_count,
            has_database: paths.database.exists(),
            has_settings: paths.settings.exists(),
        };

        let database = if files.has_database {
            match self
                .databases
                .stats(&paths.rel_database_path, DEFAULT_TABLE_NAME)
            {
                Ok(stats) => Some(stats),
                Err(e) => {
                    warn!("Failed to get database stats for {}: {}", id, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(WorkspaceStats {
            workspace,
            files,
            database,
        })
    }

    /// Export a workspace: record, settings, and a row dump of its table
    pub fn export(&mut self, id: Uuid) -> Result<ExportBundle> {
        let workspace = self.get_by_id(id)?;
        let settings = self.settings.get(id)?;

        let data = if self.config.database_path(id).exists() {
            let rel = self.config.rel_database_path(id);
            match self.databases.export_rows(&rel, DEFAULT_TABLE_NAME) {
                Ok(rows) => Some(ExportData {
                    total_records: rows.len(),
                    exported_at: Utc::now(),
                    rows,
                }),
                Err(e) => {
                    warn!("Failed to export database for {}: {}", id, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(ExportBundle {
            workspace,
            settings,
            data,
        })
    }

    /// Column definitions of a table in a workspace's database
    pub fn get_columns(&mut self, id: Uuid, table: &str) -> Result<Vec<TableColumnInfo>> {
        self.ensure_exists(id)?;
        let rel = self.config.rel_database_path(id);
        let conn = self.databases.open(&rel)?;
        table_columns(conn, table)
    }

    /// Run `VACUUM` on a workspace's database
    pub fn vacuum(&mut self, id: Uuid) -> Result<()> {
        self.ensure_exists(id)?;
        let rel = self.config.rel_database_path(id);
        self.databases.vacuum(&rel)
    }

    /// Close every open database; used at process shutdown
    pub fn close_all(&mut self) {
        self.databases.close_all();
    }

    fn ensure_exists(&self, id: Uuid) -> Result<()> {
        if self.registry.contains(id) {
            Ok(())
        } else {
            Err(Error::not_found("workspace", id.to_string()))
        }
    }
}
