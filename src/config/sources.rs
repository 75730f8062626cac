//! Configuration sources: TOML file and NBCONTENTS_* environment overlay

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::Path;

pub const ENV_PREFIX: &str = "NBCONTENTS";

/// Add a TOML file source. Missing optional files are skipped.
pub fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = path
        .to_str()
        .ok_or_else(|| ConfigError::Message(format!("Config path is not UTF-8: {:?}", path)))?;
    Ok(builder.add_source(
        File::new(path, FileFormat::Toml).required(required),
    ))
}

/// Add environment variable overlay to builder.
/// Uses the NBCONTENTS prefix and __ as separator for nested keys.
pub fn add_environment(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    ))
}
