//! TOML sidecar descriptors
//!
//! A sidecar declares types outside the code that uses them:
//!
//! ```toml
//! [types.Person]
//! extends = "Base"
//! access = "permissive"
//!
//! [types.Person.properties]
//! name = "string"
//! friends = "Person[]"
//!
//! [types.Person.defaults]
//! friends = []
//!
//! [types.Point]
//! family = "record"
//! ```

use indexmap::IndexMap;
use serde::Deserialize;

use super::descriptor::{Family, TypeDescriptor, TypeSettings};
use crate::config::ConfigError;
use crate::value::Value;

#[derive(Debug, Deserialize)]
struct SidecarFile {
    #[serde(default)]
    types: IndexMap<String, SidecarType>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SidecarType {
    extends: Option<String>,
    family: Family,
    properties: IndexMap<String, String>,
    defaults: IndexMap<String, serde_json::Value>,
    #[serde(flatten)]
    settings: TypeSettings,
}

/// Parse a sidecar document into descriptors, in declaration order
pub(crate) fn parse(content: &str) -> Result<Vec<TypeDescriptor>, ConfigError> {
    let file: SidecarFile = toml::from_str(content)?;

    Ok(file
        .types
        .into_iter()
        .map(|(name, entry)| {
            let mut descriptor = match entry.family {
                Family::Entity => TypeDescriptor::entity(name),
                Family::Record => TypeDescriptor::record(name),
            }
            .with_settings(entry.settings);

            if let Some(parent) = entry.extends {
                descriptor = descriptor.extends(parent);
            }
            for (field, raw_type) in entry.properties {
                descriptor = descriptor.property(field, raw_type);
            }
            for (field, json) in entry.defaults {
                descriptor = descriptor.default_value(field, Value::from(json));
            }
            descriptor
        })
        .collect())
}
