//! Workspace registry
//!
//! The single source of truth for the list of workspace records and the
//! currently active workspace id, persisted as one JSON document at
//! `<root>/global.json`. Every mutation validates against the in-memory
//! document, writes the whole updated document to disk, and only then
//! commits it in memory; a failed step never leaves the persisted
//! document half-written.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::workspace::types::{validate_workspace_name, WorkspaceRecord, WorkspaceUpdate};

/// Persisted registry document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    #[serde(default)]
    pub active_workspace_id: Option<Uuid>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceRecord>,
}

/// Registry of workspace records and the active pointer
#[derive(Debug)]
pub struct WorkspaceRegistry {
    path: PathBuf,
    doc: RegistryDocument,
}

impl WorkspaceRegistry {
    /// Load the registry document, or start empty if the file is missing
    pub fn open(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::storage(format!(
                    "Failed to read registry document '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                Error::storage(format!(
                    "Failed to parse registry document '{}': {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            debug!("No registry document at '{}', starting empty", path.display());
            RegistryDocument::default()
        };
        Ok(Self { path, doc })
    }

    /// All records, insertion order preserved
    pub fn list(&self) -> &[WorkspaceRecord] {
        &self.doc.workspaces
    }

    /// Look up a record by id
    pub fn get(&self, id: Uuid) -> Option<&WorkspaceRecord> {
        self.doc.workspaces.iter().find(|w| w.id == id)
    }

    /// Whether a record with this id exists
    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.doc.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.workspaces.is_empty()
    }

    /// Case-insensitive name lookup, optionally excluding one id
    pub fn find_by_name(&self, name: &str, exclude: Option<Uuid>) -> Option<&WorkspaceRecord> {
        let lowered = name.to_lowercase();
        self.doc
            .workspaces
            .iter()
            .find(|w| Some(w.id) != exclude && w.name.to_lowercase() == lowered)
    }

    /// Add a record; duplicate ids and case-insensitive duplicate names conflict
    pub fn add(&mut self, record: WorkspaceRecord) -> Result<()> {
        if self.contains(record.id) {
            return Err(Error::conflict(format!(
                "Workspace with id {} already exists",
                record.id
            )));
        }
        if self.find_by_name(&record.name, None).is_some() {
            return Err(Error::conflict(format!(
                "Workspace with name \"{}\" already exists",
                record.name
            )));
        }

        let mut doc = self.doc.clone();
        doc.workspaces.push(record.clone());
        self.persist(doc)?;

        info!("Workspace added: {} ({})", record.id, record.name);
        Ok(())
    }

    /// Apply a rename patch; bumps `updatedAt`
    pub fn update(&mut self, id: Uuid, update: &WorkspaceUpdate) -> Result<WorkspaceRecord> {
        if !self.contains(id) {
            return Err(Error::not_found("workspace", id.to_string()));
        }

        let new_name = match &update.name {
            Some(name) => {
                let name = validate_workspace_name(name)?;
                if self.find_by_name(&name, Some(id)).is_some() {
                    return Err(Error::conflict(format!(
                        "Workspace with name \"{}\" already exists",
                        name
                    )));
                }
                Some(name)
            }
            None => None,
        };

        let mut doc = self.doc.clone();
        let record = doc
            .workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::not_found("workspace", id.to_string()))?;
        if let Some(name) = new_name {
            record.name = name;
        }
        record.updated_at = Some(Utc::now());
        let updated = record.clone();
        self.persist(doc)?;

        info!("Workspace updated: {}", id);
        Ok(updated)
    }

    /// Remove a record; clears the active pointer if it referenced `id`
    ///
    /// No replacement is promoted here; selecting a new active workspace
    /// is a policy decision owned by the orchestrator.
    pub fn remove(&mut self, id: Uuid) -> Result<WorkspaceRecord> {
        let position = self
            .doc
            .workspaces
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| Error::not_found("workspace", id.to_string()))?;

        let mut doc = self.doc.clone();
        let removed = doc.workspaces.remove(position);
        if doc.active_workspace_id == Some(id) {
            doc.active_workspace_id = None;
        }
        self.persist(doc)?;

        info!("Workspace removed: {} ({})", removed.id, removed.name);
        Ok(removed)
    }

    /// Currently active workspace id, if any
    pub fn active_id(&self) -> Option<Uuid> {
        self.doc.active_workspace_id
    }

    /// Set or clear the active pointer; a non-null id must be known
    pub fn set_active_id(&mut self, id: Option<Uuid>) -> Result<()> {
        if let Some(id) = id {
            if !self.contains(id) {
                return Err(Error::not_found("workspace", id.to_string()));
            }
        }

        let mut doc = self.doc.clone();
        doc.active_workspace_id = id;
        self.persist(doc)
    }

    /// Write the document to disk, then commit it in memory
    fn persist(&mut self, doc: RegistryDocument) -> Result<()> {
        let content = serde_json::to_string_pretty(&doc)
            .map_err(|e| Error::storage(format!("Failed to serialize registry document: {}", e)))?;
        fs::write(&self.path, content).map_err(|e| {
            Error::storage(format!(
                "Failed to write registry document '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        self.doc = doc;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> (tempfile::TempDir, WorkspaceRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = WorkspaceRegistry::open(dir.path().join("global.json")).unwrap();
        (dir, registry)
    }

    fn record(name: &str) -> WorkspaceRecord {
        WorkspaceRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_add_and_list_preserves_order() {
        let (_dir, mut registry) = test_registry();
        let a = record("Alpha");
        let b = record("Beta");
        registry.add(a.clone()).unwrap();
        registry.add(b.clone()).unwrap();

        let names: Vec<&str> = registry.list().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_add_duplicate_name_case_insensitive() {
        let (_dir, mut registry) = test_registry();
        registry.add(record("Library")).unwrap();

        let err = registry.add(record("LIBRARY")).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_duplicate_id() {
        let (_dir, mut registry) = test_registry();
        let a = record("Alpha");
        registry.add(a.clone()).unwrap();

        let mut b = record("Beta");
        b.id = a.id;
        let err = registry.add(b).unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn test_update_renames_and_bumps_timestamp() {
        let (_dir, mut registry) = test_registry();
        let a = record("Alpha");
        registry.add(a.clone()).unwrap();

        let updated = registry
            .update(
                a.id,
                &WorkspaceUpdate {
                    name: Some("Gamma".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Gamma");
        assert!(updated.updated_at.is_some());
    }

    #[test]
    fn test_update_rejects_name_collision_but_allows_self() {
        let (_dir, mut registry) = test_registry();
        let a = record("Alpha");
        let b = record("Beta");
        registry.add(a.clone()).unwrap();
        registry.add(b.clone()).unwrap();

        let err = registry
            .update(
                b.id,
                &WorkspaceUpdate {
                    name: Some("alpha".to_string()),
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        // Renaming to its own name (different case) is allowed
        registry
            .update(
                a.id,
                &WorkspaceUpdate {
                    name: Some("ALPHA".to_string()),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, mut registry) = test_registry();
        let err = registry
            .update(Uuid::new_v4(), &WorkspaceUpdate::default())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_remove_clears_active_pointer() {
        let (_dir, mut registry) = test_registry();
        let a = record("Alpha");
        registry.add(a.clone()).unwrap();
        registry.set_active_id(Some(a.id)).unwrap();

        registry.remove(a.id).unwrap();
        assert_eq!(registry.active_id(), None);
    }

    #[test]
    fn test_remove_keeps_unrelated_active_pointer() {
        let (_dir, mut registry) = test_registry();
        let a = record("Alpha");
        let b = record("Beta");
        registry.add(a.clone()).unwrap();
        registry.add(b.clone()).unwrap();
        registry.set_active_id(Some(a.id)).unwrap();

        registry.remove(b.id).unwrap();
        assert_eq!(registry.active_id(), Some(a.id));
    }

    #[test]
    fn test_set_active_unknown_id() {
        let (_dir, mut registry) = test_registry();
        let err = registry.set_active_id(Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(registry.active_id(), None);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("global.json");
        let a = record("Alpha");

        {
            let mut registry = WorkspaceRegistry::open(path.clone()).unwrap();
            registry.add(a.clone()).unwrap();
            registry.set_active_id(Some(a.id)).unwrap();
        }

        let registry = WorkspaceRegistry::open(path).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.active_id(), Some(a.id));
        assert_eq!(registry.get(a.id).map(|w| w.name.as_str()), Some("Alpha"));
    }

    #[test]
    fn test_corrupt_document_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("global.json");
        fs::write(&path, "{not json").unwrap();

        let err = WorkspaceRegistry::open(path).unwrap_err();
        assert_eq!(err.code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_failed_validation_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("global.json");
        let mut registry = WorkspaceRegistry::open(path.clone()).unwrap();
        registry.add(record("Alpha")).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(registry.add(record("ALPHA")).is_err());
        let after = fs::read_to_string(&path).unwrap();
        assert_eq!(before, after);
    }
}
