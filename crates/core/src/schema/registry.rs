//! Default metadata provider backed by registered descriptors

use std::path::Path;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::descriptor::TypeDescriptor;
use super::sidecar;
use super::{MetadataProvider, Schema};
use crate::error::Result;

/// Longest parent chain followed before giving up (guards against loops)
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Registry of type descriptors keyed by type identifier
///
/// Descriptors are registered during setup, from builders, `#[derive(Schema)]`
/// types, or TOML sidecar files. [`describe`](MetadataProvider::describe)
/// resolves inheritance, so callers always see the full field set.
///
/// Registering a type after its metadata has been cached does not refresh the
/// cache; field sets are expected to be static.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: DashMap<String, TypeDescriptor>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a descriptor
    pub fn register(&self, descriptor: TypeDescriptor) {
        debug!(
            "Registered type {} ({} properties)",
            descriptor.name(),
            descriptor.properties().len()
        );
        self.types.insert(descriptor.name().to_string(), descriptor);
    }

    /// Register the descriptor generated by `#[derive(Schema)]`
    pub fn register_schema<S: Schema>(&self) {
        self.register(S::descriptor());
    }

    /// Register every type declared in a TOML sidecar document
    ///
    /// # Returns
    /// The number of types registered.
    pub fn load_sidecar_str(&self, content: &str) -> Result<usize> {
        let descriptors = sidecar::parse(content)?;
        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor);
        }
        Ok(count)
    }

    /// Register every type declared in a TOML sidecar file
    pub fn load_sidecar_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(crate::config::ConfigError::from)?;
        let count = self.load_sidecar_str(&content)?;
        debug!("Loaded {} types from {:?}", count, path.as_ref());
        Ok(count)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered type identifiers (unordered)
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|entry| entry.key().clone()).collect()
    }

    fn parent_of(&self, type_id: &str) -> Option<String> {
        self.types
            .get(type_id)
            .and_then(|d| d.parent().map(str::to_string))
    }
}

impl MetadataProvider for SchemaRegistry {
    fn describe(&self, type_id: &str) -> Option<TypeDescriptor> {
        let own = self.types.get(type_id)?.clone();

        // Collect ancestors nearest-first
        let mut chain = Vec::new();
        let mut next = own.parent().map(str::to_string);
        while let Some(name) = next {
            if chain.len() >= MAX_INHERITANCE_DEPTH || name == type_id {
                warn!("Inheritance loop or excessive depth at {}", type_id);
                break;
            }
            match self.types.get(&name) {
                Some(ancestor) => {
                    next = ancestor.parent().map(str::to_string);
                    chain.push(ancestor.clone());
                }
                None => {
                    debug!("Parent {} of {} is not registered", name, type_id);
                    break;
                }
            }
        }

        // Fold from the root down so nearer declarations win
        let mut resolved: Option<TypeDescriptor> = None;
        for ancestor in chain.into_iter().rev() {
            resolved = Some(match resolved {
                Some(base) => ancestor.inherit_from(&base),
                None => ancestor,
            });
        }
        Some(match resolved {
            Some(base) => own.inherit_from(&base),
            None => own,
        })
    }

    fn is_subtype(&self, type_id: &str, ancestor: &str) -> bool {
        let mut next = self.parent_of(type_id);
        let mut hops = 0;
        while let Some(name) = next {
            if name == ancestor {
                return true;
            }
            hops += 1;
            if hops >= MAX_INHERITANCE_DEPTH {
                return false;
            }
            next = self.parent_of(&name);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Family;

    fn registry() -> SchemaRegistry {
        let r = SchemaRegistry::new();
        r.register(TypeDescriptor::entity("Base").property("id", "int"));
        r.register(
            TypeDescriptor::entity("Person")
                .extends("Base")
                .property("name", "string"),
        );
        r.register(
            TypeDescriptor::entity("Employee")
                .extends("Person")
                .property("salary", "float"),
        );
        r.register(TypeDescriptor::record("Point"));
        r
    }

    #[test]
    fn test_describe_resolves_inheritance() {
        let r = registry();
        let d = r.describe("Employee").unwrap();
        let names: Vec<&str> = d.properties().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "salary"]);
        assert!(r.describe("Nope").is_none());
    }

    #[test]
    fn test_is_subtype() {
        let r = registry();
        assert!(r.is_subtype("Employee", "Person"));
        assert!(r.is_subtype("Employee", "Base"));
        assert!(!r.is_subtype("Base", "Person"));
        assert!(!r.is_subtype("Point", "Base"));
    }

    #[test]
    fn test_inheritance_loop_terminates() {
        let r = SchemaRegistry::new();
        r.register(TypeDescriptor::entity("A").extends("B").property("a", "int"));
        r.register(TypeDescriptor::entity("B").extends("A").property("b", "int"));
        assert!(r.describe("A").is_some());
        assert!(!r.is_subtype("A", "C"));
    }

    #[test]
    fn test_record_family() {
        let r = registry();
        assert_eq!(r.describe("Point").unwrap().family(), Family::Record);
        assert_eq!(r.len(), 4);
        assert!(r.contains("Point"));
    }
}
