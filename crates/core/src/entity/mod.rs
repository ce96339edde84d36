//! Entities - Typed data holders
//!
//! An [`Entity`] holds one value per declared field. Every write goes through
//! the shared [`Marshal`], so stored values always satisfy their declared
//! types. Entities live behind an [`ObjectRef`]; the accessor interface is
//! [`PropertyAccess`].
//!
//! # Lifecycle
//!
//! ```text
//! instantiate(type)
//!   │
//!   ├─ cache hit? ──no──▶ provider.describe(type)
//!   │                        ├─ settings    ─▶ cache (Settings)
//!   │                        ├─ definitions ─▶ cache (Definitions)
//!   │                        └─ marshaled defaults ─▶ cache (Defaults)
//!   ▼
//! values = deep copy of defaults (null for fields without one)
//!   │
//!   ▼
//! import(input) ── every field through Marshal
//! ```
//!
//! # Example
//!
//! ```ignore
//! use typedprop_core::{Marshal, PropertyAccess, SchemaRegistry, TypeDescriptor};
//!
//! let registry = SchemaRegistry::new();
//! registry.register(TypeDescriptor::entity("Person").property("age", "int"));
//! let marshal = Marshal::new(Arc::new(registry));
//!
//! let person = marshal.instantiate("Person", None)?;
//! person.set("age", "12")?;
//! assert_eq!(person.get("age")?, Value::Int(12));
//! ```

mod access;
mod settings;

pub use access::PropertyAccess;
pub use settings::{AccessMode, EntityFlags, EntitySettings, ImportMode, ImportReport};

use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::cache::{CachePayload, Purpose};
use crate::error::{Error, Result};
use crate::marshal::{Marshal, Owner};
use crate::schema::{
    Family, PropertyDefinition, PropertyDefinitionCollection, TypeDescriptor, TypeSyntax,
};
use crate::value::{Object, ObjectRef, Value};

thread_local! {
    /// Types whose defaults are being marshaled on this thread
    static RESOLVING_DEFAULTS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// A typed data holder
#[derive(Debug)]
pub struct Entity {
    type_name: String,
    values: IndexMap<String, Value>,
    definitions: Arc<PropertyDefinitionCollection>,
    marshal: Arc<Marshal>,
    settings: Arc<EntitySettings>,
    flags: EntityFlags,
}

impl Entity {
    /// Build a new entity of `type_name` and import `input` into it
    ///
    /// Metadata is discovered through the marshal's provider on the first
    /// instantiation of a type and served from its cache afterwards.
    ///
    /// # Arguments
    /// * `type_name` - Registered entity type
    /// * `input` - Optional map, list or object to import
    /// * `marshal` - Marshal every field write goes through
    ///
    /// # Returns
    /// The new entity's handle, `UnknownType` if the type has no metadata, or
    /// the first import failure.
    #[tracing::instrument(skip(input, marshal))]
    pub fn instantiate(
        type_name: &str,
        input: Option<Value>,
        marshal: &Arc<Marshal>,
    ) -> Result<ObjectRef> {
        let metadata = TypeMetadata::load(type_name, marshal)?;

        let values = metadata
            .definitions
            .keys()
            .map(|name| {
                let value = metadata
                    .defaults
                    .get(name)
                    .map(Value::deep_clone)
                    .unwrap_or_default();
                (name.to_string(), value)
            })
            .collect();

        let entity = Entity {
            type_name: type_name.to_string(),
            values,
            definitions: metadata.definitions,
            marshal: Arc::clone(marshal),
            flags: metadata.settings.flags(),
            settings: metadata.settings,
        };
        let handle = ObjectRef::new(Object::Entity(entity));

        if let Some(input) = input {
            handle.import(input)?;
        }
        Ok(handle)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Current values in declaration order
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn definitions(&self) -> &Arc<PropertyDefinitionCollection> {
        &self.definitions
    }

    pub fn marshal(&self) -> &Arc<Marshal> {
        &self.marshal
    }

    pub fn settings(&self) -> &EntitySettings {
        &self.settings
    }

    pub fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// Copy with every reachable object duplicated
    ///
    /// Definitions, settings and marshal stay shared.
    pub fn deep_clone(&self) -> Entity {
        Entity {
            type_name: self.type_name.clone(),
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_clone()))
                .collect(),
            definitions: Arc::clone(&self.definitions),
            marshal: Arc::clone(&self.marshal),
            settings: Arc::clone(&self.settings),
            flags: self.flags,
        }
    }

    /// Definition for `name`, stamped with the permissive raw type if undeclared
    ///
    /// Nothing is declared here; [`Entity::store`] declares a permissive field
    /// once its value has been marshaled. Such declarations are local to this
    /// instance: the shared collection is copied on first write.
    pub(crate) fn resolve_definition(&self, name: &str) -> Result<PropertyDefinition> {
        if let Some(definition) = self.definitions.get(name) {
            return Ok(definition.clone());
        }
        if !self.flags.contains(EntityFlags::PERMISSIVE) {
            return Err(Error::unknown_property(&self.type_name, name));
        }

        Ok(self
            .definitions
            .stamp(name, &self.settings.permissive_raw_type()))
    }

    /// Store a marshaled value, declaring `definition` first if it is new
    pub(crate) fn store(&mut self, definition: &PropertyDefinition, value: Value) {
        let name = definition.name();
        if !self.definitions.has(name) {
            debug!(
                "Declaring {}.{} as {}",
                self.type_name,
                name,
                definition.raw_type()
            );
            Arc::make_mut(&mut self.definitions).add(name, definition.raw_type());
        }
        self.values.insert(name.to_string(), value);
    }
}

/// Cached metadata of one entity type
struct TypeMetadata {
    definitions: Arc<PropertyDefinitionCollection>,
    defaults: Arc<IndexMap<String, Value>>,
    settings: Arc<EntitySettings>,
}

impl TypeMetadata {
    /// Serve from cache, discovering and caching whatever is missing
    fn load(type_name: &str, marshal: &Arc<Marshal>) -> Result<Self> {
        let cache = marshal.cache();
        if let (Some(definitions), Some(defaults), Some(settings)) = (
            cache.definitions(type_name),
            cache.defaults(type_name),
            cache.settings(type_name),
        ) {
            return Ok(Self {
                definitions,
                defaults,
                settings,
            });
        }

        let descriptor = marshal
            .provider()
            .describe(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        if descriptor.family() == Family::Record {
            return Err(Error::InvalidInput {
                owner: type_name.to_string(),
                reason: "record types are built by flat copy, not instantiated".to_string(),
            });
        }
        debug!(
            "Discovered {} ({} properties, {} defaults)",
            type_name,
            descriptor.properties().len(),
            descriptor.defaults().len()
        );

        let settings = match cache.settings(type_name) {
            Some(settings) => settings,
            None => {
                let settings = Arc::new(EntitySettings::resolve(
                    descriptor.settings(),
                    marshal.config(),
                ));
                cache.set(
                    type_name,
                    CachePayload::Settings(Arc::clone(&settings)),
                    Purpose::Settings,
                );
                settings
            }
        };

        let definitions = match cache.definitions(type_name) {
            Some(definitions) => definitions,
            None => {
                let definitions = Arc::new(build_definitions(&descriptor, &settings));
                cache.set(
                    type_name,
                    CachePayload::Definitions(Arc::clone(&definitions)),
                    Purpose::Definitions,
                );
                definitions
            }
        };

        let defaults = match cache.defaults(type_name) {
            Some(defaults) => defaults,
            None => {
                let defaults = Arc::new(marshal_defaults(
                    type_name,
                    &descriptor,
                    &definitions,
                    marshal,
                )?);
                cache.set(
                    type_name,
                    CachePayload::Defaults(Arc::clone(&defaults)),
                    Purpose::Defaults,
                );
                defaults
            }
        };

        Ok(Self {
            definitions,
            defaults,
            settings,
        })
    }
}

fn build_definitions(
    descriptor: &TypeDescriptor,
    settings: &EntitySettings,
) -> PropertyDefinitionCollection {
    let prototype = PropertyDefinition::with_syntax(TypeSyntax::shared());
    let mut definitions = PropertyDefinitionCollection::with_prototype(prototype);
    for (name, raw_type) in descriptor.properties() {
        let raw_type = match raw_type.trim() {
            "" => settings.default_type.as_str(),
            raw => raw,
        };
        definitions.add(name.as_str(), raw_type);
    }
    definitions
}

/// Marshal a type's declared defaults once, for caching
///
/// Null defaults are stored as-is. A type whose defaults (transitively)
/// construct another instance of itself fails with `CircularReference`.
fn marshal_defaults(
    type_name: &str,
    descriptor: &TypeDescriptor,
    definitions: &PropertyDefinitionCollection,
    marshal: &Arc<Marshal>,
) -> Result<IndexMap<String, Value>> {
    let reentered = RESOLVING_DEFAULTS.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.iter().any(|t| t == type_name) {
            true
        } else {
            stack.push(type_name.to_string());
            false
        }
    });
    if reentered {
        return Err(Error::CircularReference {
            owner: type_name.to_string(),
            field: "<defaults>".to_string(),
        });
    }

    let owner = Owner::detached(type_name);
    let result = descriptor
        .defaults()
        .iter()
        .filter_map(|(name, value)| match definitions.get(name) {
            Some(_) if value.is_null() => Some(Ok((name.clone(), Value::Null))),
            Some(definition) => Some(
                marshal
                    .marshal(&owner, definition, value.clone())
                    .map(|v| (name.clone(), v)),
            ),
            None => {
                warn!("Ignoring default for undeclared field {}.{}", type_name, name);
                None
            }
        })
        .collect::<Result<IndexMap<_, _>>>();

    RESOLVING_DEFAULTS.with(|stack| {
        stack.borrow_mut().pop();
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RuntimeCache;
    use crate::schema::SchemaRegistry;

    fn marshal_with(registry: SchemaRegistry) -> Arc<Marshal> {
        Marshal::with_cache(Arc::new(registry), Arc::new(RuntimeCache::new()))
    }

    #[test]
    fn test_unknown_type() {
        let m = marshal_with(SchemaRegistry::new());
        assert!(matches!(
            Entity::instantiate("Ghost", None, &m),
            Err(Error::UnknownType(name)) if name == "Ghost"
        ));
    }

    #[test]
    fn test_records_are_not_instantiated() {
        let registry = SchemaRegistry::new();
        registry.register(TypeDescriptor::record("Point"));
        let m = marshal_with(registry);
        assert!(matches!(
            Entity::instantiate("Point", None, &m),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_defaults_and_unset_fields() {
        let registry = SchemaRegistry::new();
        registry.register(
            TypeDescriptor::entity("Counter")
                .property("count", "int")
                .property("label", "string")
                .default_value("count", "3"),
        );
        let m = marshal_with(registry);
        let counter = Entity::instantiate("Counter", None, &m).unwrap();
        assert_eq!(
            counter.fields(),
            vec![
                ("count".to_string(), Value::Int(3)),
                ("label".to_string(), Value::Null),
            ]
        );
    }

    #[test]
    fn test_metadata_is_cached_once() {
        let registry = SchemaRegistry::new();
        registry.register(TypeDescriptor::entity("T").property("a", "int"));
        let m = marshal_with(registry);

        let first = Entity::instantiate("T", None, &m).unwrap();
        let second = Entity::instantiate("T", None, &m).unwrap();
        assert_eq!(m.cache().len(), 3);

        let a = Arc::clone(first.read().as_entity().unwrap().definitions());
        let b = Arc::clone(second.read().as_entity().unwrap().definitions());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_raw_type_uses_default_type() {
        let registry = SchemaRegistry::new();
        registry.register(
            TypeDescriptor::entity("Loose")
                .property("anything", "")
                .default_type("string"),
        );
        let m = marshal_with(registry);
        let loose = Entity::instantiate("Loose", None, &m).unwrap();
        let guard = loose.read();
        let definition = guard.as_entity().unwrap().definitions().get("anything").unwrap().clone();
        assert_eq!(definition.base_type(), "string");
    }

    #[test]
    fn test_object_defaults_are_not_shared() {
        let registry = SchemaRegistry::new();
        registry.register(TypeDescriptor::record("Point"));
        registry.register(
            TypeDescriptor::entity("Shape")
                .property("origin", "Point")
                .default_json("origin", r#"{"x": 0}"#)
                .unwrap(),
        );
        let m = marshal_with(registry);
        let a = Entity::instantiate("Shape", None, &m).unwrap();
        let b = Entity::instantiate("Shape", None, &m).unwrap();

        let origin_a = a.get("origin").unwrap();
        let origin_b = b.get("origin").unwrap();
        assert_eq!(origin_a.as_object().unwrap().type_name(), "Point");
        assert_ne!(origin_a, origin_b);
    }

    #[test]
    fn test_self_constructing_defaults_fail() {
        let registry = SchemaRegistry::new();
        registry.register(
            TypeDescriptor::entity("Node")
                .property("next", "Node")
                .default_json("next", "{}")
                .unwrap(),
        );
        let m = marshal_with(registry);
        assert!(matches!(
            Entity::instantiate("Node", None, &m),
            Err(Error::CircularReference { .. })
        ));
    }
}
