//! Filesystem helpers consumed by the orchestration layer
//!
//! Only the operations the orchestrator directly invokes live here:
//! directory creation, file-or-directory removal, and recursive
//! size/count statistics for a workspace directory.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::errors::{Error, Result};

/// Recursive size and file count of a directory tree
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirStats {
    pub size: u64,
    pub files_count: u64,
}

/// Create a directory and all missing parents
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::storage(format!("Failed to create directory '{}': {}", path.display(), e)))
}

/// Remove a file or directory tree; a missing path is a no-op
pub fn remove_path(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!("remove_path: '{}' does not exist, nothing to do", path.display());
        return Ok(());
    }
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| Error::storage(format!("Failed to remove '{}': {}", path.display(), e)))
}

/// Recursive size and file count for a directory; missing directories count as empty
pub fn dir_stats(path: &Path) -> Result<DirStats> {
    let mut stats = DirStats::default();
    if path.exists() {
        collect(path, &mut stats)?;
    }
    Ok(stats)
}

fn collect(dir: &Path, stats: &mut DirStats) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::storage(format!("Failed to read directory '{}': {}", dir.display(), e)))?;
    for entry in entries {
        let entry = entry
            .map_err(|e| Error::storage(format!("Failed to read entry in '{}': {}", dir.display(), e)))?;
        let metadata = entry.metadata().map_err(|e| {
            Error::storage(format!("Failed to stat '{}': {}", entry.path().display(), e))
        })?;
        if metadata.is_dir() {
            collect(&entry.path(), stats)?;
        } else {
            stats.size += metadata.len();
            stats.files_count += 1;
        }
    }
    Ok(())
}
