//! Configuration for the marshaling core
//!
//! This module provides the TOML-backed [`CoreConfig`]:
//! - Default access and import modes for entities
//! - The default field type for untyped and permissive fields
//! - Converter settings (dump depth/indent, flat-array cycle handling)
//!
//! Per-type [`TypeSettings`](crate::schema::TypeSettings) override the
//! entity-related values.
//!
//! # Example
//!
//! ```ignore
//! use typedprop_core::CoreConfig;
//!
//! let config = CoreConfig::from_toml_str(r#"
//!     access = "permissive"
//!
//!     [dump]
//!     max_depth = 3
//! "#)?;
//! assert_eq!(config.dump.max_depth, 3);
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::{AccessMode, ImportMode};

pub use loader::{default_config_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write a config or descriptor file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Dump converter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Composites nested deeper than this render as a placeholder
    pub max_depth: usize,

    /// Indentation unit per nesting level
    pub indent: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            indent: "  ".to_string(),
        }
    }
}

/// Flat-array converter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatConfig {
    /// Emit null for a revisited object instead of failing
    pub graceful: bool,
}

impl Default for FlatConfig {
    fn default() -> Self {
        Self { graceful: true }
    }
}

/// Core configuration.
///
/// Loaded from `typedprop.toml` in the working directory, or from the file
/// named by `TYPEDPROP_CONFIG`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Access mode for types that do not set their own
    pub access: AccessMode,

    /// Bulk-import mode for types that do not set their own
    pub import_mode: ImportMode,

    /// Type given to fields with an empty raw type and to permissive writes
    pub default_type: String,

    /// Element type given to permissive writes, if any
    pub default_element_type: Option<String>,

    pub dump: DumpConfig,

    pub flat: FlatConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            access: AccessMode::Strict,
            import_mode: ImportMode::FailFast,
            default_type: "mixed".to_string(),
            default_element_type: None,
            dump: DumpConfig::default(),
            flat: FlatConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parse a config document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from file, creating default if missing.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded core config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default core config at {:?}", path);
            Ok(default)
        }
    }

    /// Load config from [`default_config_path`].
    pub fn load_default() -> ConfigResult<Self> {
        Self::load(default_config_path()?)
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Reload config from file.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path.as_ref())?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded core config from {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_config_default() {
        let config = CoreConfig::default();
        assert_eq!(config.version, 1);
        assert!(!config.debug);
        assert_eq!(config.access, AccessMode::Strict);
        assert_eq!(config.default_type, "mixed");
        assert_eq!(config.dump.max_depth, 5);
        assert!(config.flat.graceful);
    }

    #[test]
    fn test_core_config_partial_document() {
        let config = CoreConfig::from_toml_str(
            r#"
            access = "permissive"
            import_mode = "skip_invalid"

            [dump]
            max_depth = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.access, AccessMode::Permissive);
        assert_eq!(config.import_mode, ImportMode::SkipInvalid);
        assert_eq!(config.dump.max_depth, 2);
        assert_eq!(config.dump.indent, "  ");
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_core_config_serialize() {
        let config = CoreConfig {
            version: 2,
            debug: true,
            ..Default::default()
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("version = 2"));
        assert!(toml_str.contains("debug = true"));
        assert!(toml_str.contains("access = \"strict\""));
        assert_eq!(CoreConfig::from_toml_str(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_core_config_bad_toml() {
        assert!(matches!(
            CoreConfig::from_toml_str("access = ["),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_creates_default() {
        let dir = std::env::temp_dir().join(format!("typedprop-config-{}", std::process::id()));
        let path = dir.join("typedprop.toml");
        let _ = std::fs::remove_file(&path);

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert!(path.exists());

        let mut reloaded = CoreConfig {
            debug: true,
            ..Default::default()
        };
        reloaded.reload(&path).unwrap();
        assert!(!reloaded.debug);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
