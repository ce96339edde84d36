//! typedprop - Core marshaling layer
//!
//! Typed-property data holders ("entities") whose fields are declared with
//! raw type strings, validated and coerced on every write, and rendered into
//! flat or annotated-text representations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  describe   ┌──────────────┐  memoize   ┌──────────────┐
//! │ Metadata     │────────────▶│ Entity       │───────────▶│ RuntimeCache │
//! │ Provider     │  (once)     │ instantiate  │            │ (type, kind) │
//! └──────────────┘             └──────┬───────┘            └──────────────┘
//!                                     │ every write
//!                                     ▼
//!                              ┌──────────────┐
//!                              │   Marshal    │ cast / recurse / construct
//!                              └──────┬───────┘
//!                                     ▼
//!                              ┌──────────────┐
//!                              │  Converters  │ FlatArray / Dump
//!                              └──────────────┘
//! ```
//!
//! # Re-exports
//!
//! The most used types are re-exported at the crate root, along with the
//! [`Schema`] derive macro.

// Allow the crate to refer to itself as `typedprop_core` for proc macro compatibility
extern crate self as typedprop_core;

pub mod cache;
pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod marshal;
pub mod schema;
pub mod value;

// Re-export commonly used items
pub use cache::{CachePayload, Purpose, RuntimeCache};
pub use config::{ConfigError, ConfigResult, CoreConfig, DumpConfig, FlatConfig};
pub use convert::{ConverterStrategy, Dump, FlatArray};
pub use entity::{
    AccessMode, Entity, EntityFlags, EntitySettings, ImportMode, ImportReport, PropertyAccess,
};
pub use error::{Error, Result};
pub use marshal::{Marshal, Owner};
pub use schema::{
    read_field, Family, MetadataProvider, PropertyDefinition, PropertyDefinitionCollection,
    Schema, SchemaObject, SchemaRegistry, TypeDescriptor, TypeSettings,
};
pub use value::{FromValue, Object, ObjectId, ObjectRef, Record, Value};

// Re-export macros
pub use typedprop_macros::Schema;
