//! Attribute parsing for the Schema derive macro

use darling::{FromDeriveInput, FromField};
use syn::{DeriveInput, Ident, Type, Visibility};

/// Parsed #[schema(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(schema), supports(struct_named))]
pub struct SchemaArgs {
    /// Struct identifier
    pub ident: Ident,

    /// Struct visibility
    pub vis: Visibility,

    /// Struct fields
    pub data: darling::ast::Data<(), SchemaFieldArgs>,

    /// Registered type identifier (defaults to the struct name)
    #[darling(default)]
    pub type_name: Option<String>,

    /// Parent type identifier
    #[darling(default)]
    pub extends: Option<String>,

    /// Build through flat copy instead of entity instantiation
    #[darling(default)]
    pub record: bool,

    /// Undeclared writes declare the field instead of failing
    #[darling(default)]
    pub permissive: bool,

    /// Bulk import skips failing fields
    #[darling(default)]
    pub skip_invalid: bool,

    /// Type for untyped and permissive fields
    #[darling(default)]
    pub default_type: Option<String>,
}

impl SchemaArgs {
    pub fn type_name(&self) -> String {
        self.type_name
            .clone()
            .unwrap_or_else(|| self.ident.to_string())
    }
}

/// Parsed #[schema(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(schema))]
pub struct SchemaFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Field visibility
    pub vis: Visibility,

    /// Declared property name (defaults to the field name)
    #[darling(default, rename = "field")]
    pub field_name: Option<String>,

    /// Raw type string; inferred from the marker type if absent
    #[darling(default, rename = "ty")]
    pub raw_type: Option<String>,

    /// Default value as a JSON literal
    #[darling(default, rename = "default")]
    pub default_json: Option<String>,

    /// Whether this field is read-only (no setter generated)
    #[darling(default)]
    pub readonly: bool,
}

impl SchemaFieldArgs {
    /// Check if this is the wrapped handle field
    pub fn is_handle_field(&self) -> bool {
        self.ident.as_ref().map(|i| i == "handle").unwrap_or(false)
    }

    /// Field identifier with a leading underscore stripped
    pub fn clean_name(&self) -> String {
        let name = self
            .ident
            .as_ref()
            .map(|i| i.to_string())
            .unwrap_or_default();
        name.strip_prefix('_').unwrap_or(&name).to_string()
    }

    /// Declared property name
    pub fn property_name(&self) -> String {
        self.field_name.clone().unwrap_or_else(|| self.clean_name())
    }
}

/// Parse a DeriveInput into SchemaArgs
pub fn parse_schema(input: &DeriveInput) -> darling::Result<SchemaArgs> {
    SchemaArgs::from_derive_input(input)
}
