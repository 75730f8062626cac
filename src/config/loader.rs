//! ConfigLoader: composes sources and deserializes to ContentsConfig.

use super::sources;
use super::ContentsConfig;
use crate::error::Result;
use config::Config;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "nbcontents.toml";

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a working directory.
    /// Precedence: defaults (lowest) -> `<dir>/nbcontents.toml` -> environment (highest).
    pub fn load(dir: &Path) -> Result<ContentsConfig> {
        let file = dir.join(CONFIG_FILE_NAME);
        debug!("Loading configuration (optional file {})", file.display());
        Self::build(&file, false)
    }

    /// Load configuration from a specific file with environment overlay.
    /// The file must exist.
    pub fn load_from_file(path: &Path) -> Result<ContentsConfig> {
        debug!("Loading configuration from {}", path.display());
        Self::build(path, true)
    }

    /// Defaults plus environment only.
    pub fn load_environment() -> Result<ContentsConfig> {
        let builder = sources::add_environment(Config::builder())?;
        let config: ContentsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn build(file: &Path, required: bool) -> Result<ContentsConfig> {
        let builder = sources::add_file(Config::builder(), file, required)?;
        let builder = sources::add_environment(builder)?;
        let config: ContentsConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckpointBackend, StorageBackend};
    use crate::error::ErrorKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.notebook.format_version, 4);
    }

    #[test]
    fn file_values_override_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"
[storage]
root_dir = "/srv/notebooks"
backend = "memory"

[checkpoints]
backend = "none"
id_strategy = "sequential"

[notebook]
format_version = 3
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.storage.root_dir, PathBuf::from("/srv/notebooks"));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.checkpoints.backend, CheckpointBackend::None);
        assert_eq!(config.checkpoints.id_strategy, "sequential");
        assert_eq!(config.notebook.format_version, 3);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[notebook]\nformat_version = 9\n").unwrap();
        assert_eq!(
            ConfigLoader::load_from_file(&path).unwrap_err().kind(),
            ErrorKind::Config
        );

        std::fs::write(&path, "[storage]\nbackend = \"s3\"\n").unwrap();
        assert_eq!(
            ConfigLoader::load_from_file(&path).unwrap_err().kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn explicit_file_must_exist() {
        let temp = TempDir::new().unwrap();
        assert!(ConfigLoader::load_from_file(&temp.path().join("absent.toml")).is_err());
    }
}
