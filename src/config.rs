use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::default_store_path;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Store file; the platform default when unset
    pub database: Option<PathBuf>,
    /// Create unknown shader types without asking
    pub confirm_all_types: bool,
}

impl ResourcesConfig {
    /// Store path: an explicit override wins over the config file, then the platform default.
    pub fn database_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(default_store_path)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("resources.toml")
}

/// Load the config file; a missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Option<ResourcesConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ResourcesConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}
