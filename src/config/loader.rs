// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Default session file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Stampede.toml";

/// Read and deserialize a session file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    parse_str(&contents)
}

/// Deserialize a session file from a string.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Read, deserialize and validate a session file.
///
/// Dependency names are not resolved here; a name that points nowhere is
/// reported by the graph builder.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let config = ConfigFile::try_from(raw)?;
    debug!(
        path = %path.display(),
        targets = config.target.len(),
        roots = config.session.roots.len(),
        "loaded session file"
    );
    Ok(config)
}
