//! Name → definition mapping for one concrete type

use indexmap::IndexMap;

use super::definition::PropertyDefinition;
use crate::error::{Error, Result};
use crate::value::Value;

/// All property definitions of one concrete type, in discovery order
///
/// Built once per type, then shared read-only through an `Arc`. New
/// definitions are stamped from a prototype so the raw type syntax can be
/// swapped without touching the collection.
#[derive(Debug, Clone, Default)]
pub struct PropertyDefinitionCollection {
    prototype: PropertyDefinition,
    definitions: IndexMap<String, PropertyDefinition>,
}

impl PropertyDefinitionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty collection whose definitions are built from `prototype`
    pub fn with_prototype(prototype: PropertyDefinition) -> Self {
        Self {
            prototype,
            definitions: IndexMap::new(),
        }
    }

    /// Build from an ordered name → raw type source
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut collection = Self::new();
        collection.extend(pairs);
        collection
    }

    /// Add or replace a definition
    ///
    /// Replacing keeps the original position.
    pub fn add(&mut self, name: impl Into<String>, raw_type: &str) -> &PropertyDefinition {
        let definition = self.stamp(name, raw_type);
        let index = self
            .definitions
            .insert_full(definition.name().to_string(), definition)
            .0;
        &self.definitions[index]
    }

    /// Build a definition from the prototype without storing it
    pub fn stamp(&self, name: impl Into<String>, raw_type: &str) -> PropertyDefinition {
        self.prototype.clone().set_name(name).set_raw_type(raw_type)
    }

    /// Add every pair from a typed ordered source
    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        for (name, raw_type) in pairs {
            self.add(name, raw_type.as_ref());
        }
    }

    /// Add every pair from a dynamic name → raw type map
    ///
    /// Fails with `InvalidInput` if `source` is not a map whose values are
    /// all strings. Nothing is added on failure.
    pub fn import(&mut self, source: &Value) -> Result<()> {
        let Value::Map(entries) = source else {
            return Err(Error::InvalidInput {
                owner: "PropertyDefinitionCollection".to_string(),
                reason: format!("expected a name => type map, got {}", source.type_label()),
            });
        };

        let mut pairs = Vec::with_capacity(entries.len());
        for (name, raw_type) in entries {
            let Some(raw_type) = raw_type.as_str() else {
                return Err(Error::InvalidInput {
                    owner: "PropertyDefinitionCollection".to_string(),
                    reason: format!(
                        "type of '{}' must be a string, got {}",
                        name,
                        raw_type.type_label()
                    ),
                });
            };
            pairs.push((name.clone(), raw_type));
        }

        self.extend(pairs);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDefinition> {
        self.definitions.get(name)
    }

    /// Field names in discovery order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Name → raw type mapping, the inverse of [`import`](Self::import)
    pub fn export(&self) -> IndexMap<String, String> {
        self.definitions
            .iter()
            .map(|(name, def)| (name.clone(), def.raw_type().to_string()))
            .collect()
    }
}

impl PartialEq for PropertyDefinitionCollection {
    fn eq(&self, other: &Self) -> bool {
        self.definitions == other.definitions
    }
}
