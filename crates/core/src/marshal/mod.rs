//! Marshal - Value coercion against declared types
//!
//! Every write into an entity field passes through [`Marshal::marshal`],
//! which either returns a value satisfying the field's declared type or
//! fails.
//!
//! # Pipeline
//!
//! ```text
//!   raw value
//!       │
//!       ▼
//! ┌───────────────────────┐   same identity as owner
//! │ self-reference guard  │──────────────────────────▶ CircularReference
//! └──────────┬────────────┘
//!            ▼
//! ┌───────────────────────┐   int/float/bool/string/null target,
//! │ scalar cast           │   accepted only if loss-free
//! └──────────┬────────────┘
//!            ▼
//! ┌───────────────────────┐   T[] / array<T>: every element against
//! │ collection recursion  │   a synthetic `name[key]` definition
//! └──────────┬────────────┘
//!            ▼
//! ┌───────────────────────┐   map (or empty list) for a registered
//! │ implicit construction │   composite: instantiate or flat-copy
//! └──────────┬────────────┘
//!            ▼
//! ┌───────────────────────┐   kind check, or instance-of through
//! │ predicate check       │   registered parents ──▶ TypeMismatch
//! └──────────┬────────────┘
//!            ▼
//!      coerced value
//! ```
//!
//! Unknown-field resolution happens before the pipeline, in the accessor
//! layer, because it depends on the owning entity's access mode.

pub mod cast;
pub mod declared;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::cache::{Purpose, RuntimeCache};
use crate::config::CoreConfig;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::schema::{Family, MetadataProvider, PropertyDefinition};
use crate::value::{ObjectId, ObjectRef, Value};

pub use cast::cast_scalar;
pub use declared::{DeclaredType, ScalarKind};

/// The object a value is being marshaled into
#[derive(Debug, Clone, Copy)]
pub struct Owner<'a> {
    type_name: &'a str,
    id: Option<ObjectId>,
}

impl<'a> Owner<'a> {
    /// Owner without an instance yet (defaults, standalone coercion)
    pub fn detached(type_name: &'a str) -> Self {
        Self { type_name, id: None }
    }

    /// Owner backed by a live object
    pub fn of(type_name: &'a str, id: ObjectId) -> Self {
        Self {
            type_name,
            id: Some(id),
        }
    }

    pub fn type_name(&self) -> &str {
        self.type_name
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }
}

/// Coerces raw values into declared types
///
/// Shared (`Arc`) by every entity built through it. Holds the metadata
/// provider used for implicit construction and subtype checks, the cache
/// entity metadata is memoized in, and the core config.
pub struct Marshal {
    provider: Arc<dyn MetadataProvider>,
    cache: Arc<RuntimeCache>,
    config: CoreConfig,
}

impl Marshal {
    /// Marshal backed by the process-wide cache and the default config
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Arc<Self> {
        Self::with_cache(provider, RuntimeCache::global())
    }

    /// Marshal backed by an injected cache
    pub fn with_cache(provider: Arc<dyn MetadataProvider>, cache: Arc<RuntimeCache>) -> Arc<Self> {
        Self::with_config(provider, cache, CoreConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn MetadataProvider>,
        cache: Arc<RuntimeCache>,
        config: CoreConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            cache,
            config,
        })
    }

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<RuntimeCache> {
        &self.cache
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Whether `type_name` is `ancestor` or one of its registered subtypes
    pub fn is_subtype(&self, type_name: &str, ancestor: &str) -> bool {
        type_name == ancestor || self.provider.is_subtype(type_name, ancestor)
    }

    /// Build a new entity of `type_name`, importing `input` if given
    pub fn instantiate(
        self: &Arc<Self>,
        type_name: &str,
        input: Option<Value>,
    ) -> Result<ObjectRef> {
        Entity::instantiate(type_name, input, self)
    }

    /// Coerce `value` for the field described by `definition`
    ///
    /// # Arguments
    /// * `owner` - Object being populated; its identity drives the
    ///   self-reference guard and its type name goes into errors
    /// * `definition` - Declared type of the target field
    /// * `value` - Raw value
    ///
    /// # Returns
    /// A value satisfying the declared type, or `CircularReference` /
    /// `TypeMismatch` (possibly from a nested instantiation).
    pub fn marshal(
        self: &Arc<Self>,
        owner: &Owner<'_>,
        definition: &PropertyDefinition,
        value: Value,
    ) -> Result<Value> {
        Self::check_self_reference(owner, definition.name(), &value)?;
        self.coerce(owner, definition, value)
    }

    /// Reject assigning an object into itself
    pub fn check_self_reference(owner: &Owner<'_>, field: &str, value: &Value) -> Result<()> {
        match (owner.id, value) {
            (Some(id), Value::Object(object)) if object.id() == id => Err(Error::CircularReference {
                owner: owner.type_name.to_string(),
                field: field.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Whether `value` already satisfies `declared`
    pub fn satisfies(&self, declared: &DeclaredType<'_>, value: &Value) -> bool {
        match declared {
            DeclaredType::Any => true,
            DeclaredType::Scalar(kind) => matches!(
                (kind, value),
                (ScalarKind::Int, Value::Int(_))
                    | (ScalarKind::Float, Value::Float(_))
                    | (ScalarKind::Bool, Value::Bool(_))
                    | (ScalarKind::String, Value::String(_))
                    | (ScalarKind::Null, Value::Null)
            ),
            DeclaredType::Array => value.is_array(),
            DeclaredType::Object => matches!(value, Value::Object(_)),
            DeclaredType::Composite(name) => match value {
                Value::Object(object) => self.is_subtype(&object.type_name(), name),
                _ => false,
            },
        }
    }

    fn coerce(
        self: &Arc<Self>,
        owner: &Owner<'_>,
        definition: &PropertyDefinition,
        value: Value,
    ) -> Result<Value> {
        let declared = DeclaredType::parse(definition.base_type());
        let mut value = value;

        if let (Some(kind), true) = (declared.scalar_kind(), value.is_scalar()) {
            if let Some(cast) = cast_scalar(&value, kind) {
                value = cast;
            }
        }

        if definition.is_collection() {
            value = self.coerce_elements(owner, definition, value)?;
        }

        if let DeclaredType::Composite(type_name) = declared {
            if !self.satisfies(&declared, &value) {
                if let Some(constructed) = self.construct(type_name, &value)? {
                    value = constructed;
                }
            }
        }

        if !self.satisfies(&declared, &value) {
            let expected = if definition.is_collection() {
                definition.raw_type().to_string()
            } else {
                declared.label()
            };
            return Err(Error::type_mismatch(
                owner.type_name,
                definition.name(),
                expected,
                value,
            ));
        }

        Ok(value)
    }

    /// Coerce every element of a list or map, keeping keys and order
    fn coerce_elements(
        self: &Arc<Self>,
        owner: &Owner<'_>,
        definition: &PropertyDefinition,
        value: Value,
    ) -> Result<Value> {
        let element = |key: &str, item: Value| -> Result<Value> {
            match definition.element_definition(key) {
                Some(element_definition) => self.coerce(owner, &element_definition, item),
                None => Ok(item),
            }
        };

        match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| element(&i.to_string(), item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, item)| element(&key, item).map(|v| (key, v)))
                .collect::<Result<IndexMap<_, _>>>()
                .map(Value::Map),
            other => Ok(other),
        }
    }

    /// Build a `type_name` instance from loosely shaped input
    ///
    /// Returns `None` when the input is not map-like or the type is not
    /// registered, leaving the value for the predicate check to reject.
    fn construct(self: &Arc<Self>, type_name: &str, value: &Value) -> Result<Option<Value>> {
        let fields = match value {
            Value::Map(entries) => entries.clone(),
            Value::List(items) if items.is_empty() => IndexMap::new(),
            _ => return Ok(None),
        };

        // Cached definitions mean the type was already instantiated as an entity
        let family = if self.cache.has(type_name, Purpose::Definitions) {
            Some(Family::Entity)
        } else {
            self.provider.describe(type_name).map(|d| d.family())
        };

        match family {
            Some(Family::Entity) => {
                debug!("Implicitly instantiating {}", type_name);
                let object = Entity::instantiate(type_name, Some(Value::Map(fields)), self)?;
                Ok(Some(Value::Object(object)))
            }
            Some(Family::Record) => {
                trace!("Flat-copying {} fields into {}", fields.len(), type_name);
                Ok(Some(Value::Object(ObjectRef::record(type_name, fields))))
            }
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Marshal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshal")
            .field("cache_entries", &self.cache.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
