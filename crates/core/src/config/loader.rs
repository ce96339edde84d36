//! Config path resolution
//!
//! The core config lives in the working directory unless an environment
//! variable points elsewhere.

use std::path::PathBuf;

use super::ConfigResult;

/// Environment variable overriding the config location
pub const CONFIG_ENV_VAR: &str = "TYPEDPROP_CONFIG";

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "typedprop.toml";

/// Returns the core config path.
///
/// Path: `$TYPEDPROP_CONFIG` if set and non-empty, else `./typedprop.toml`
pub fn default_config_path() -> ConfigResult<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(std::env::current_dir()?.join(CONFIG_FILE_NAME)),
    }
}
