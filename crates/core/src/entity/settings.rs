//! Per-type entity behavior

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::error::Error;
use crate::schema::TypeSettings;

/// How writes to undeclared fields are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Writing an undeclared name fails with `UnknownProperty`
    #[default]
    Strict,
    /// Writing an undeclared name declares it with the default field type
    Permissive,
}

/// How bulk import reacts to a field that fails to marshal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Abort on the first failure; fields already applied stay applied
    #[default]
    FailFast,
    /// Log and skip failing fields
    SkipInvalid,
}

bitflags! {
    /// Flags that control entity behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        /// Undeclared writes declare the field instead of failing
        const PERMISSIVE = 0x01;
        /// Bulk import skips fields that fail to marshal
        const SKIP_INVALID = 0x02;
    }
}

/// Settings of one concrete type, resolved against the core config
///
/// Cached per type alongside its definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySettings {
    pub access: AccessMode,
    pub import_mode: ImportMode,
    pub default_type: String,
    pub default_element_type: Option<String>,
}

impl EntitySettings {
    /// Apply per-type overrides on top of the config
    pub fn resolve(overrides: &TypeSettings, config: &CoreConfig) -> Self {
        Self {
            access: overrides.access.unwrap_or(config.access),
            import_mode: overrides.import_mode.unwrap_or(config.import_mode),
            default_type: overrides
                .default_type
                .clone()
                .unwrap_or_else(|| config.default_type.clone()),
            default_element_type: overrides
                .default_element_type
                .clone()
                .or_else(|| config.default_element_type.clone()),
        }
    }

    pub fn flags(&self) -> EntityFlags {
        let mut flags = EntityFlags::empty();
        flags.set(EntityFlags::PERMISSIVE, self.access == AccessMode::Permissive);
        flags.set(EntityFlags::SKIP_INVALID, self.import_mode == ImportMode::SkipInvalid);
        flags
    }

    /// Raw type given to a field declared by a permissive write
    pub fn permissive_raw_type(&self) -> String {
        match &self.default_element_type {
            Some(element) => format!("{}[]", element),
            None => self.default_type.clone(),
        }
    }
}

impl Default for EntitySettings {
    fn default() -> Self {
        Self::resolve(&TypeSettings::default(), &CoreConfig::default())
    }
}

/// Outcome of a bulk import
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Fields stored
    pub applied: usize,
    /// Failures skipped in [`ImportMode::SkipInvalid`]
    pub skipped: Vec<Error>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
