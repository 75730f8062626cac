//! Configuration for the contents service
//!
//! Layered with the `config` crate: serde defaults, then an optional TOML
//! file, then `NBCONTENTS__*` environment overrides.

pub mod loader;
pub mod sources;

pub use loader::ConfigLoader;

use crate::checkpoint;
use crate::error::{ContentsError, Result};
use crate::logging::LoggingConfig;
use crate::notebook;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentsConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub checkpoints: CheckpointConfig,
    #[serde(default)]
    pub notebook: NotebookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Filesystem,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory exposed as the logical root
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    #[serde(default)]
    pub backend: StorageBackend,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            backend: StorageBackend::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    File,
    Memory,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,
    /// `sequential` or `ulid`
    #[serde(default = "default_id_strategy")]
    pub id_strategy: String,
}

fn default_id_strategy() -> String {
    "ulid".to_string()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            id_strategy: default_id_strategy(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookConfig {
    /// Major format for new notebooks and validation
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Directory overriding the bundled `nbformat.v<N>.schema.json` files
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,
}

fn default_format_version() -> u32 {
    notebook::CURRENT_FORMAT
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            schema_dir: None,
        }
    }
}

impl ContentsConfig {
    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(ContentsError::Config(
                "storage.root_dir must not be empty".to_string(),
            ));
        }
        if !notebook::is_supported(self.notebook.format_version) {
            return Err(ContentsError::Config(format!(
                "Unsupported notebook.format_version {} (supported: {:?})",
                self.notebook.format_version,
                notebook::SUPPORTED_FORMATS
            )));
        }
        checkpoint::id_generator(&self.checkpoints.id_strategy)?;
        self.logging.validate()?;
        Ok(())
    }
}
