//! Configuration for the tree engine and the SQLite store.
//!
//! Every field has a default, so an empty (or missing) TOML file yields a working setup:
//!
//! ```toml
//! database = "tree.db"
//!
//! [tree]
//! scoping = true
//!
//! [sqlite]
//! table = "tree_nodes"
//! left_column = "lft"
//! right_column = "rgt"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options that change the engine's arithmetic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Whether the store holds several trees told apart by `scope`. When disabled every
    /// scope predicate and scope assignment is skipped.
    pub scoping: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self { scoping: true }
    }
}

impl TreeOptions {
    /// Options for a store holding exactly one tree.
    pub fn unscoped() -> Self {
        Self { scoping: false }
    }
}

/// Table and column names used by [`crate::store::SqliteStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// Table holding the node rows.
    pub table: String,
    /// Integer primary key column.
    pub id_column: String,
    /// Text payload column.
    pub name_column: String,
    /// Left boundary column.
    pub left_column: String,
    /// Right boundary column.
    pub right_column: String,
    /// Depth column.
    pub level_column: String,
    /// Tree identifier column.
    pub scope_column: String,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            table: "tree_nodes".into(),
            id_column: "id".into(),
            name_column: "name".into(),
            left_column: "lft".into(),
            right_column: "rgt".into(),
            level_column: "level".into(),
            scope_column: "scope".into(),
        }
    }
}

impl SqliteOptions {
    /// Rejects names that cannot be spliced into SQL verbatim.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("table", &self.table),
            ("id_column", &self.id_column),
            ("name_column", &self.name_column),
            ("left_column", &self.left_column),
            ("right_column", &self.right_column),
            ("level_column", &self.level_column),
            ("scope_column", &self.scope_column),
        ];
        for (field, value) in fields {
            let valid = !value.is_empty()
                && !value.starts_with(|c: char| c.is_ascii_digit())
                && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(ConfigError::InvalidIdentifier {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    /// SQLite database file opened by [`crate::NestedSet::from_config`].
    pub database: Option<PathBuf>,
    /// Engine options.
    pub tree: TreeOptions,
    /// SQLite table layout.
    pub sqlite: SqliteOptions,
}

impl ArborConfig {
    /// Loads `explicit`, or the default config file when it exists, or the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit.or_else(default_config_path) {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Reads and validates one TOML file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.sqlite.validate()?;
        Ok(config)
    }
}

/// Location of the per-user config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("arbor").join("config.toml"))
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// A table or column name is not a plain SQL identifier.
    #[error("{field} '{value}' is not a valid SQL identifier")]
    InvalidIdentifier {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}
