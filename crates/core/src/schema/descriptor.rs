//! Type descriptors returned by metadata providers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::{AccessMode, ImportMode};
use crate::value::Value;

/// Which construction path a declared composite type takes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Typed entity: built through instantiation, every field marshaled
    #[default]
    Entity,
    /// Plain record: built by flat property-by-property copy
    Record,
}

/// Per-type overrides of the global entity settings
///
/// Unset fields fall back to [`CoreConfig`](crate::config::CoreConfig).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeSettings {
    pub access: Option<AccessMode>,
    pub import_mode: Option<ImportMode>,
    /// Type given to fields with an empty raw type and to permissive writes
    pub default_type: Option<String>,
    /// Element type given to permissive writes (makes them collections)
    pub default_element_type: Option<String>,
}

/// Everything the core needs to know about one concrete type
#[derive(Debug, Clone, Default)]
pub struct TypeDescriptor {
    name: String,
    parent: Option<String>,
    family: Family,
    properties: Vec<(String, String)>,
    defaults: IndexMap<String, Value>,
    settings: TypeSettings,
}

impl TypeDescriptor {
    /// Descriptor for a typed entity
    pub fn entity(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Descriptor for a flat-copied record type
    pub fn record(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: Family::Record,
            ..Default::default()
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare a property (redeclaring replaces the raw type in place)
    pub fn property(mut self, name: impl Into<String>, raw_type: impl Into<String>) -> Self {
        let name = name.into();
        let raw_type = raw_type.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = raw_type,
            None => self.properties.push((name, raw_type)),
        }
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Default given as a JSON literal
    pub fn default_json(self, name: impl Into<String>, json: &str) -> serde_json::Result<Self> {
        let value = Value::from_json_str(json)?;
        Ok(self.default_value(name, value))
    }

    pub fn access(mut self, access: AccessMode) -> Self {
        self.settings.access = Some(access);
        self
    }

    pub fn permissive(self) -> Self {
        self.access(AccessMode::Permissive)
    }

    pub fn import_mode(mut self, mode: ImportMode) -> Self {
        self.settings.import_mode = Some(mode);
        self
    }

    pub fn default_type(mut self, raw_type: impl Into<String>) -> Self {
        self.settings.default_type = Some(raw_type.into());
        self
    }

    pub fn default_element_type(mut self, raw_type: impl Into<String>) -> Self {
        self.settings.default_element_type = Some(raw_type.into());
        self
    }

    pub fn with_settings(mut self, settings: TypeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Ordered name → raw type list
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn defaults(&self) -> &IndexMap<String, Value> {
        &self.defaults
    }

    pub fn settings(&self) -> &TypeSettings {
        &self.settings
    }

    /// Fold an ancestor's declarations underneath this descriptor's own
    ///
    /// Ancestor properties come first; redeclared names keep the ancestor's
    /// position but take this descriptor's raw type. Own defaults and settings
    /// win over inherited ones.
    pub fn inherit_from(mut self, ancestor: &TypeDescriptor) -> Self {
        let mut properties = ancestor.properties.clone();
        for (name, raw_type) in self.properties.drain(..) {
            match properties.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = raw_type,
                None => properties.push((name, raw_type)),
            }
        }
        self.properties = properties;

        let mut defaults = ancestor.defaults.clone();
        defaults.extend(std::mem::take(&mut self.defaults));
        self.defaults = defaults;

        let own = &mut self.settings;
        let inherited = &ancestor.settings;
        own.access = own.access.or(inherited.access);
        own.import_mode = own.import_mode.or(inherited.import_mode);
        if own.default_type.is_none() {
            own.default_type = inherited.default_type.clone();
        }
        if own.default_element_type.is_none() {
            own.default_element_type = inherited.default_element_type.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let d = TypeDescriptor::entity("Person")
            .extends("Base")
            .property("name", "string")
            .property("age", "int")
            .property("name", "mixed")
            .default_value("age", 0)
            .permissive();

        assert_eq!(d.name(), "Person");
        assert_eq!(d.parent(), Some("Base"));
        assert_eq!(d.family(), Family::Entity);
        assert_eq!(
            d.properties(),
            &[
                ("name".to_string(), "mixed".to_string()),
                ("age".to_string(), "int".to_string())
            ]
        );
        assert_eq!(d.defaults()["age"], Value::Int(0));
        assert_eq!(d.settings().access, Some(AccessMode::Permissive));
    }

    #[test]
    fn test_default_json() {
        let d = TypeDescriptor::entity("T")
            .default_json("tags", r#"["a", "b"]"#)
            .unwrap();
        assert_eq!(
            d.defaults()["tags"],
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert!(TypeDescriptor::entity("T").default_json("x", "{oops").is_err());
    }

    #[test]
    fn test_inherit_from() {
        let base = TypeDescriptor::entity("Base")
            .property("id", "int")
            .property("label", "string")
            .default_value("id", 0)
            .default_type("string");
        let child = TypeDescriptor::entity("Child")
            .extends("Base")
            .property("extra", "bool")
            .property("label", "int")
            .default_value("id", 7)
            .inherit_from(&base);

        let names: Vec<&str> = child.properties().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "label", "extra"]);
        assert_eq!(child.properties()[1].1, "int");
        assert_eq!(child.defaults()["id"], Value::Int(7));
        assert_eq!(child.settings().default_type.as_deref(), Some("string"));
    }
}
