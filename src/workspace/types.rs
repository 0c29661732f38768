//! Workspace records and the per-workspace settings document
//!
//! The settings document is read and written as a whole; serde gives the
//! structural validation, [`WorkspaceSettings::validate`] the range and
//! format checks serde cannot express.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::schema::ColumnSpec;
use crate::errors::{Error, Result};

/// Maximum length of a workspace name, in characters
pub const MAX_WORKSPACE_NAME_LEN: usize = 100;

/// Lower and upper bounds for the table page size
pub const PAGE_SIZE_RANGE: (u32, u32) = (1, 100);

/// One workspace as tracked by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Rename patch applied through the registry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
}

/// Filesystem locations of one workspace
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePaths {
    pub workspace: PathBuf,
    pub database: PathBuf,
    pub settings: PathBuf,
    /// Root-relative database path used as the connection-cache key input
    pub rel_database_path: String,
}

/// Trim and validate a workspace name
pub fn validate_workspace_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Workspace name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_WORKSPACE_NAME_LEN {
        return Err(Error::validation(format!(
            "Workspace name cannot exceed {} characters",
            MAX_WORKSPACE_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

// =============================================================================
// Settings document
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowHeight {
    Compact,
    #[default]
    Default,
    Comfortable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// User-defined tag with a display color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

/// Table display preferences, including the column schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub row_height: RowHeight,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Column schema the user sees and edits
    #[serde(default)]
    pub schema: Vec<ColumnSpec>,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            row_height: RowHeight::default(),
            schema_version: default_schema_version(),
            schema: Vec::new(),
        }
    }
}

/// Export preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "default_true")]
    pub include_settings: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            include_settings: true,
        }
    }
}

/// Per-workspace settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub table: TableSettings,
    #[serde(default = "default_genres")]
    pub genres: Vec<String>,
    #[serde(default = "default_tags")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub export: ExportSettings,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            accent_color: default_accent_color(),
            language: default_language(),
            table: TableSettings::default(),
            genres: default_genres(),
            tags: default_tags(),
            export: ExportSettings::default(),
        }
    }
}

impl WorkspaceSettings {
    /// Range and format checks serde cannot express
    ///
    /// Returns a validation error carrying field-level details.
    pub fn validate(&self) -> Result<()> {
        let mut details: Vec<Value> = Vec::new();

        let (min, max) = PAGE_SIZE_RANGE;
        if self.table.page_size < min || self.table.page_size > max {
            details.push(json!({
                "field": "table.pageSize",
                "message": format!("must be between {} and {}", min, max),
            }));
        }
        if self.table.schema_version < 1 {
            details.push(json!({
                "field": "table.schemaVersion",
                "message": "must be at least 1",
            }));
        }
        for (i, col) in self.table.schema.iter().enumerate() {
            if let Err(e) = col.validate() {
                details.push(json!({
                    "field": format!("table.schema[{}]", i),
                    "message": e.to_string(),
                }));
            }
        }
        for (i, tag) in self.tags.iter().enumerate() {
            if tag.name.trim().is_empty() {
                details.push(json!({
                    "field": format!("tags[{}].name", i),
                    "message": "tag name cannot be empty",
                }));
            }
            if !is_hex_color(&tag.color) {
                details.push(json!({
                    "field": format!("tags[{}].color", i),
                    "message": "must be a #RGB or #RRGGBB hex color",
                }));
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(Error::validation_with_details(
                "Settings validation failed",
                Value::Array(details),
            ))
        }
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_schema_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_accent_color() -> String {
    "zinc".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_genres() -> Vec<String> {
    ["Fiction", "Non-fiction", "Poetry"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tags() -> Vec<Tag> {
    [
        ("Favorites", "#FFD700"),
        ("Owned", "#50C878"),
        ("Wishlist", "#6495ED"),
        ("Read", "#49C143"),
    ]
    .iter()
    .map(|(name, color)| Tag {
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

/// `true` for `#RGB` or `#RRGGBB` hex colors
fn is_hex_color(s: &str) -> bool {
    match s.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}
