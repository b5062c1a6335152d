use std::path::Path;

use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// File name of the optional per-repository configuration, inside the git dir.
pub const CONFIG_FILE: &str = "grit.toml";

/// Tunables for a loose object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// zlib level, 0 (store) through 9 (best). Default: 6.
    pub compression_level: u32,
    /// fsync staged objects before the publishing rename. Default: false.
    pub fsync_on_publish: bool,
    /// Name prefix for staging files in `objects/pack/`.
    pub staging_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            fsync_on_publish: false,
            staging_prefix: "tmp_obj_".to_string(),
        }
    }
}

impl StoreConfig {
    /// Parse TOML and validate. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<git_dir>/grit.toml`, or the defaults if it does not exist.
    pub fn load_or_default(git_dir: &Path) -> StoreResult<Self> {
        let path = git_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reject values the store cannot honour.
    pub fn validate(&self) -> StoreResult<()> {
        if self.compression_level > 9 {
            return Err(StoreError::Config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.staging_prefix.contains(['/', '\\']) {
            return Err(StoreError::Config(format!(
                "staging_prefix must not contain a path separator: {:?}",
                self.staging_prefix
            )));
        }
        Ok(())
    }

    /// The zlib compression level.
    pub fn compression(&self) -> Compression {
        Compression::new(self.compression_level.min(9))
    }
}
