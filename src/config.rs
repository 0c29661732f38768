use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::Config;
use uuid::Uuid;

use crate::errors::{Error, Result};
use crate::fsutil;
use crate::workspace::types::WorkspacePaths;

/// Name of the physical table holding a workspace's records
pub const DEFAULT_TABLE_NAME: &str = "books";

/// Default ceiling on the number of workspaces
pub const DEFAULT_MAX_WORKSPACES: usize = 10;

/// SQLite durability/performance settings applied on every open
///
/// All values are passed through as PRAGMA arguments, so anything the
/// engine accepts is valid here.
#[derive(Debug, Clone)]
pub struct DatabasePragmas {
    pub journal_mode: String,
    pub synchronous: String,
    pub cache_size: String,
    pub temp_store: String,
}

impl Default for DatabasePragmas {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
            cache_size: "10000".to_string(),
            temp_store: "MEMORY".to_string(),
        }
    }
}

/// Process-wide configuration
pub struct BookshelfConfig {
    /// Directory that holds all bookshelf data (workspaces, registry)
    pub root_dir: PathBuf,

    /// SQLite pragma settings applied to every opened database
    pub pragmas: DatabasePragmas,

    /// Ceiling on the number of workspaces
    pub max_workspaces: usize,
}

const EMPTY_CONFIG: &str = r#"### bookshelf configuration file

### directory that holds all bookshelf data
# root_dir = "~/.bookshelf"

### SQLite pragma settings applied to every opened database
# journal_mode = "WAL"
# synchronous = "NORMAL"
# cache_size = "10000"
# temp_store = "MEMORY"

### ceiling on the number of workspaces
# max_workspaces = "10"
"#;

impl Default for BookshelfConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            root_dir: home_dir.join(".bookshelf"),
            pragmas: DatabasePragmas::default(),
            max_workspaces: DEFAULT_MAX_WORKSPACES,
        }
    }
}

impl BookshelfConfig {
    /// Create and initialize a configuration
    ///
    /// Reads `<path>` if given, otherwise `~/.bookshelf/bookshelf.toml`;
    /// either way a commented template file is written on first run.
    /// Environment variables with the `BOOKSHELF` prefix override file
    /// values (e.g. `BOOKSHELF_ROOT_DIR=/tmp/shelf`).
    pub fn new(path: &Option<String>) -> Result<BookshelfConfig> {
        let mut builder = Config::builder();

        let home_dir =
            dirs::home_dir().ok_or_else(|| Error::storage("Could not find home directory"))?;
        let bookshelf_dir = home_dir.join(".bookshelf");

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| Error::storage("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| Error::storage(format!("Unable to create config file: {}", e)))?;
                }
            }
            None => {
                fsutil::ensure_dir(&bookshelf_dir)?;
                let p = bookshelf_dir.join("bookshelf.toml");
                if p.exists() {
                    let path_str = p
                        .to_str()
                        .ok_or_else(|| Error::storage("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(&p, EMPTY_CONFIG).map_err(|e| {
                        Error::storage(format!(
                            "Unable to create config file {}: {}",
                            p.display(),
                            e
                        ))
                    })?;
                }
            }
        }

        // Settings from the environment (with a prefix of BOOKSHELF)
        builder = builder.add_source(config::Environment::with_prefix("BOOKSHELF"));

        let settings = builder
            .build()
            .map_err(|e| Error::storage(format!("Failed to build configuration: {}", e)))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| Error::storage(format!("Failed to deserialize configuration: {}", e)))?;

        let root_dir = match values.get("root_dir") {
            Some(p) => PathBuf::from(p),
            None => bookshelf_dir,
        };

        let defaults = DatabasePragmas::default();
        let pragmas = DatabasePragmas {
            journal_mode: values
                .get("journal_mode")
                .cloned()
                .unwrap_or(defaults.journal_mode),
            synchronous: values
                .get("synchronous")
                .cloned()
                .unwrap_or(defaults.synchronous),
            cache_size: values
                .get("cache_size")
                .cloned()
                .unwrap_or(defaults.cache_size),
            temp_store: values
                .get("temp_store")
                .cloned()
                .unwrap_or(defaults.temp_store),
        };

        let max_workspaces = values
            .get("max_workspaces")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_WORKSPACES);

        Ok(BookshelfConfig {
            root_dir,
            pragmas,
            max_workspaces,
        })
    }

    /// Build a configuration rooted at an explicit directory
    ///
    /// Used by tests and by embedders that manage their own data location.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }

    /// Directory that holds all workspace directories
    pub fn workspaces_dir(&self) -> PathBuf {
        self.root_dir.join("workspaces")
    }

    /// Path to the registry document
    pub fn global_store_path(&self) -> PathBuf {
        self.root_dir.join("global.json")
    }

    /// Directory of a single workspace
    pub fn workspace_dir(&self, id: Uuid) -> PathBuf {
        self.workspaces_dir().join(id.to_string())
    }

    /// Path to a workspace's database file
    pub fn database_path(&self, id: Uuid) -> PathBuf {
        self.workspace_dir(id).join("database.db")
    }

    /// Path to a workspace's settings document
    pub fn settings_path(&self, id: Uuid) -> PathBuf {
        self.workspace_dir(id).join("settings.json")
    }

    /// Root-relative database path, used as the connection-cache key input
    pub fn rel_database_path(&self, id: Uuid) -> String {
        format!("workspaces/{}/database.db", id)
    }

    /// All paths for one workspace
    pub fn workspace_paths(&self, id: Uuid) -> WorkspacePaths {
        WorkspacePaths {
            workspace: self.workspace_dir(id),
            database: self.database_path(id),
            settings: self.settings_path(id),
            rel_database_path: self.rel_database_path(id),
        }
    }

    /// Create the root and workspaces directories if missing
    pub fn ensure_layout(&self) -> Result<()> {
        fsutil::ensure_dir(&self.root_dir)?;
        fsutil::ensure_dir(&self.workspaces_dir())
    }
}
