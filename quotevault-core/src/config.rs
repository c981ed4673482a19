//! Store configuration.
//!
//! Loaded from a small TOML file; every field has a default so an empty file
//! (or no file at all) is valid.
//!
//! ```toml
//! root = "/var/lib/quotevault"
//! data_extension = "dat"
//! meta_extension = "meta"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the shard directories.
    pub root: PathBuf,
    /// Extension of bar data files.
    pub data_extension: String,
    /// Extension of committed-range sidecars.
    pub meta_extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            data_extension: "dat".to_string(),
            meta_extension: "meta".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Extensions must be non-empty, distinct and free of separators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, ext) in [
            ("data_extension", &self.data_extension),
            ("meta_extension", &self.meta_extension),
        ] {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(ConfigError::Invalid(format!("{name} '{ext}' is not a bare extension")));
            }
        }
        if self.data_extension == self.meta_extension {
            return Err(ConfigError::Invalid(
                "data_extension and meta_extension must differ".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = StoreConfig::from_toml("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.data_extension, "dat");
    }

    #[test]
    fn toml_roundtrip() {
        let config = StoreConfig::with_root("/srv/bars");
        let text = config.to_toml().unwrap();
        assert_eq!(StoreConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = StoreConfig::from_toml("root = \"/tmp/q\"\n").unwrap();
        assert_eq!(config.root, PathBuf::from("/tmp/q"));
        assert_eq!(config.meta_extension, "meta");
    }

    #[test]
    fn rejects_clashing_extensions() {
        let err = StoreConfig::from_toml("data_extension = \"meta\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(StoreConfig::from_toml("meta_extension = \"a.b\"\n").is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = StoreConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
