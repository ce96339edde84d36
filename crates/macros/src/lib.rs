//! typedprop Proc Macros
//!
//! This crate provides `#[derive(Schema)]`, which turns a marker struct into a
//! typed wrapper around an entity handle and describes the type's metadata.
//!
//! # Example
//!
//! ```ignore
//! use std::marker::PhantomData;
//! use typedprop_core::{ObjectRef, Schema};
//!
//! #[derive(Schema)]
//! #[schema(type_name = "Person")]
//! pub struct Person {
//!     handle: ObjectRef,
//!
//!     name: PhantomData<String>,
//!
//!     #[schema(default = "0")]
//!     age: PhantomData<i64>,
//!
//!     #[schema(ty = "Person[]")]
//!     friends: PhantomData<Vec<Person>>,
//! }
//!
//! // Generated methods allow typed access:
//! // - Person::create(&marshal, input) -> Result<Person>
//! // - person.age() -> Result<i64>
//! // - person.set_age("12") - marshaled against `int`
//! // - Person::descriptor() -> TypeDescriptor
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[schema(type_name = "Name")]` - Type identifier (default: the struct name).
//! - `#[schema(extends = "Parent")]` - Parent type; its fields are inherited.
//! - `#[schema(record)]` - Build by flat copy instead of entity instantiation.
//! - `#[schema(permissive)]` - Undeclared writes declare the field.
//! - `#[schema(skip_invalid)]` - Bulk import skips failing fields.
//! - `#[schema(default_type = "mixed")]` - Type for untyped/permissive fields.
//!
//! ## Field Attributes
//!
//! - `#[schema(field = "name")]` - Declared property name (default: the field name).
//! - `#[schema(ty = "int[]")]` - Raw type (default: inferred from the marker type).
//! - `#[schema(default = "json")]` - Default value as a JSON literal.
//! - `#[schema(readonly)]` - Don't generate a setter.

mod parse;
mod schema;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for typed entity wrappers
///
/// The struct must have a `handle: ObjectRef` field; every other field is a
/// `PhantomData<T>` marker declaring one property of type `T`.
///
/// # Generated Code
///
/// - `TYPE_NAME` and one `{NAME}_FIELD` constant per property
/// - A getter (`fn age(&self) -> Result<i64>`) per property
/// - A setter (`fn set_age(&self, value) -> Result<()>`) unless `readonly`
/// - `fn create(marshal, input) -> Result<Self>` for entity types
/// - `Schema`, `SchemaObject` and `FromValue` implementations
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    schema::derive_schema(input).into()
}
