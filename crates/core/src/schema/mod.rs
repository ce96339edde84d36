//! Schema System - Per-type property metadata
//!
//! This module describes what fields a type declares and how their raw type
//! strings are parsed. It never discovers metadata itself: that is the job of
//! a [`MetadataProvider`], queried once per concrete type and memoized in the
//! [`RuntimeCache`](crate::cache::RuntimeCache).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                MetadataProvider (external)                  │
//! │   SchemaRegistry: builders / #[derive(Schema)] / sidecars   │
//! │   describe(type_id) -> TypeDescriptor                       │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │ first instance of a type only
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PropertyDefinitionCollection (one per type, Arc-shared)    │
//! │   name -> PropertyDefinition { raw, base, element? }        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use typedprop_core::schema::{SchemaRegistry, TypeDescriptor};
//!
//! let registry = SchemaRegistry::new();
//! registry.register(
//!     TypeDescriptor::entity("Person")
//!         .property("name", "string")
//!         .property("friends", "Person[]"),
//! );
//! ```

pub mod collection;
pub mod definition;
pub mod descriptor;
pub mod registry;
mod sidecar;

pub use collection::PropertyDefinitionCollection;
pub use definition::{PropertyDefinition, TypeSyntax, COLLECTION_MARKER};
pub use descriptor::{Family, TypeDescriptor, TypeSettings};
pub use registry::SchemaRegistry;

use crate::entity::PropertyAccess;
use crate::error::{Error, Result};
use crate::value::{FromValue, ObjectRef};

/// Source of per-type metadata
///
/// Implementations must return the type's full field set (inherited fields
/// included) in declaration order.
pub trait MetadataProvider: Send + Sync {
    /// Describe a concrete type, or `None` if it is unknown
    fn describe(&self, type_id: &str) -> Option<TypeDescriptor>;

    /// Whether `type_id` is a (transitive) subtype of `ancestor`
    fn is_subtype(&self, type_id: &str, ancestor: &str) -> bool {
        let mut next = self
            .describe(type_id)
            .and_then(|d| d.parent().map(str::to_string));
        let mut hops = 0;
        while let Some(name) = next {
            if name == ancestor {
                return true;
            }
            hops += 1;
            if hops >= 64 {
                return false;
            }
            next = self
                .describe(&name)
                .and_then(|d| d.parent().map(str::to_string));
        }
        false
    }
}

/// Trait for types that declare their own metadata
///
/// Implemented by the `#[derive(Schema)]` macro.
pub trait Schema {
    /// Type identifier used for registration and cache lookups
    const TYPE_NAME: &'static str;

    /// Descriptor to register with a [`SchemaRegistry`]
    fn descriptor() -> TypeDescriptor;
}

/// Trait for typed wrappers around an entity handle
///
/// Implemented by the `#[derive(Schema)]` macro for structs with a `handle`
/// field.
pub trait SchemaObject: Sized {
    /// The wrapped handle
    fn handle(&self) -> &ObjectRef;

    /// Type identifier of the wrapper
    fn type_name(&self) -> &'static str;

    /// Wrap a handle if it is an instance of this type
    fn from_handle(handle: ObjectRef) -> Option<Self>;
}

/// Read a field through the accessor interface and extract it as `T`
///
/// Used by generated getters. Fails with `TypeMismatch` if the stored value
/// is not a `T`.
pub fn read_field<T: FromValue>(handle: &ObjectRef, owner: &str, field: &str) -> Result<T> {
    let value = handle.get(field)?;
    T::from_value(value).map_err(|value| Error::type_mismatch(owner, field, T::EXPECTED, value))
}
