//! Per-workspace settings persistence
//!
//! Whole-document JSON storage at `<root>/workspaces/<id>/settings.json`
//! with an in-memory cache per workspace id. Reads self-heal drifted
//! documents back to defaults (the file is user-editable and must never
//! brick a workspace), while writes validate before touching disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::fsutil;
use crate::workspace::types::WorkspaceSettings;

/// Settings storage with an in-memory cache layer
pub struct SettingsStore {
    workspaces_dir: PathBuf,
    cache: HashMap<Uuid, WorkspaceSettings>,
}

impl SettingsStore {
    pub fn new(workspaces_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspaces_dir: workspaces_dir.into(),
            cache: HashMap::new(),
        }
    }

    fn settings_path(&self, id: Uuid) -> PathBuf {
        self.workspaces_dir.join(id.to_string()).join("settings.json")
    }

    /// Load a workspace's settings document
    ///
    /// Missing file: defaults, without writing anything. Invalid file:
    /// overwritten with defaults (auto-heal) rather than failing; this
    /// corrects drift from externally-edited files. Only I/O failures
    /// propagate.
    pub fn get(&mut self, id: Uuid) -> Result<WorkspaceSettings> {
        if let Some(settings) = self.cache.get(&id) {
            return Ok(settings.clone());
        }

        let path = self.settings_path(id);
        let settings = if path.exists() {
            match load_document(&path) {
                Ok(settings) => settings,
                Err(e @ Error::Storage(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        "Settings for workspace {} are invalid ({}), resetting to defaults",
                        id, e
                    );
                    let defaults = WorkspaceSettings::default();
                    write_document(&path, &defaults)?;
                    defaults
                }
            }
        } else {
            debug!("No settings file for workspace {}, using defaults", id);
            WorkspaceSettings::default()
        };

        self.cache.insert(id, settings.clone());
        Ok(settings)
    }

    /// Persist a full settings document, validating first
    pub fn save(&mut self, id: Uuid, settings: &WorkspaceSettings) -> Result<()> {
        settings.validate()?;
        write_document(&self.settings_path(id), settings)?;
        self.cache.insert(id, settings.clone());
        Ok(())
    }

    /// Deep-merge a JSON patch into the current document
    ///
    /// Nested objects merge key-by-key; arrays and scalars replace
    /// wholesale. The merged result is re-validated before persisting;
    /// on failure the on-disk document is left unchanged.
    pub fn update(&mut self, id: Uuid, patch: &Value) -> Result<WorkspaceSettings> {
        let current = self.get(id)?;

        let mut merged_value = serde_json::to_value(&current)
            .map_err(|e| Error::storage(format!("Failed to serialize settings: {}", e)))?;
        deep_merge(&mut merged_value, patch);

        let merged: WorkspaceSettings = serde_json::from_value(merged_value)
            .map_err(|e| Error::validation(format!("Settings patch rejected: {}", e)))?;
        merged.validate()?;

        write_document(&self.settings_path(id), &merged)?;
        self.cache.insert(id, merged.clone());

        info!("Settings updated for workspace: {}", id);
        Ok(merged)
    }

    /// Evict one workspace's cached settings, or all of them
    pub fn clear_cache(&mut self, id: Option<Uuid>) {
        match id {
            Some(id) => {
                self.cache.remove(&id);
                debug!("Settings cache cleared for workspace: {}", id);
            }
            None => {
                self.cache.clear();
                debug!("Settings cache cleared for all workspaces");
            }
        }
    }
}

fn load_document(path: &Path) -> Result<WorkspaceSettings> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::storage(format!(
            "Failed to read settings file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let settings: WorkspaceSettings = serde_json::from_str(&content)
        .map_err(|e| Error::validation(format!("Settings document is malformed: {}", e)))?;
    settings.validate()?;
    Ok(settings)
}

fn write_document(path: &Path, settings: &WorkspaceSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fsutil::ensure_dir(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| Error::storage(format!("Failed to serialize settings: {}", e)))?;
    fs::write(path, content).map_err(|e| {
        Error::storage(format!(
            "Failed to write settings file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Merge `patch` into `target`: objects key-by-key, everything else replaces
pub fn deep_merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(target_map), Value::Object(patch_map)) = (&mut *target, patch) {
        for (key, patch_value) in patch_map {
            match target_map.get_mut(key) {
                Some(existing) if existing.is_object() && patch_value.is_object() => {
                    deep_merge(existing, patch_value);
                }
                _ => {
                    target_map.insert(key.clone(), patch_value.clone());
                }
            }
        }
    } else {
        *target = patch.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_get_missing_returns_defaults_without_writing() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();

        let settings = store.get(id).unwrap();
        assert_eq!(settings, WorkspaceSettings::default());
        assert!(!store.settings_path(id).exists());
    }

    #[test]
    fn test_save_then_get_round_trip() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();

        let mut settings = WorkspaceSettings::default();
        settings.table.page_size = 42;
        store.save(id, &settings).unwrap();

        store.clear_cache(None);
        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.table.page_size, 42);
    }

    #[test]
    fn test_auto_heal_malformed_document() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        let path = store.settings_path(id);
        fsutil::ensure_dir(path.parent().unwrap()).unwrap();
        fs::write(&path, "{definitely not json").unwrap();

        let settings = store.get(id).unwrap();
        assert_eq!(settings, WorkspaceSettings::default());

        // The broken file was overwritten with defaults
        let healed: WorkspaceSettings =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(healed, WorkspaceSettings::default());
    }

    #[test]
    fn test_auto_heal_out_of_range_document() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        let path = store.settings_path(id);
        fsutil::ensure_dir(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"table":{"pageSize":9999}}"#).unwrap();

        let settings = store.get(id).unwrap();
        assert_eq!(settings.table.page_size, 20);
    }

    #[test]
    fn test_update_deep_merges_nested_objects() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        store.save(id, &WorkspaceSettings::default()).unwrap();

        let updated = store
            .update(id, &json!({"table": {"pageSize": 50}}))
            .unwrap();

        // The sibling fields of `table` survive the merge
        assert_eq!(updated.table.page_size, 50);
        assert_eq!(updated.table.schema_version, 1);
        assert_eq!(updated.theme, WorkspaceSettings::default().theme);
    }

    #[test]
    fn test_update_replaces_arrays_wholesale() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        store.save(id, &WorkspaceSettings::default()).unwrap();

        let updated = store
            .update(id, &json!({"genres": ["Horror"]}))
            .unwrap();
        assert_eq!(updated.genres, vec!["Horror".to_string()]);
    }

    #[test]
    fn test_update_validation_failure_leaves_disk_unchanged() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        store.save(id, &WorkspaceSettings::default()).unwrap();
        let before = fs::read_to_string(store.settings_path(id)).unwrap();

        let err = store
            .update(id, &json!({"table": {"pageSize": 0}}))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let after = fs::read_to_string(store.settings_path(id)).unwrap();
        assert_eq!(before, after);

        // The cache still serves the old document
        assert_eq!(store.get(id).unwrap().table.page_size, 20);
    }

    #[test]
    fn test_update_empty_patch_is_idempotent() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        store.save(id, &WorkspaceSettings::default()).unwrap();
        let before = fs::read_to_string(store.settings_path(id)).unwrap();

        store.update(id, &json!({})).unwrap();
        let after = fs::read_to_string(store.settings_path(id)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_clear_cache_forces_reload() {
        let (_dir, mut store) = test_store();
        let id = Uuid::new_v4();
        store.save(id, &WorkspaceSettings::default()).unwrap();

        // Mutate the file behind the cache's back
        let path = store.settings_path(id);
        let mut on_disk: WorkspaceSettings =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        on_disk.table.page_size = 77;
        fs::write(&path, serde_json::to_string_pretty(&on_disk).unwrap()).unwrap();

        // Cached copy still wins until eviction
        assert_eq!(store.get(id).unwrap().table.page_size, 20);
        store.clear_cache(Some(id));
        assert_eq!(store.get(id).unwrap().table.page_size, 77);
    }

    #[test]
    fn test_deep_merge_scalars_and_nested() {
        let mut target = json!({"a": {"b": 1, "c": 2}, "d": [1, 2], "e": "x"});
        deep_merge(
            &mut target,
            &json!({"a": {"b": 10}, "d": [3], "f": true}),
        );
        assert_eq!(
            target,
            json!({"a": {"b": 10, "c": 2}, "d": [3], "e": "x", "f": true})
        );
    }
}
