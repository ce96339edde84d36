//! Schema derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{GenericArgument, PathArguments, Type};

use crate::parse::{parse_schema, SchemaArgs, SchemaFieldArgs};

/// Extract the inner type from `PhantomData<T>` if present, otherwise return the type as-is
fn extract_inner_type(ty: &Type) -> &Type {
    match generic_of(ty, "PhantomData") {
        Some(inner) => inner,
        None => ty,
    }
}

/// Check if a type is PhantomData
fn is_phantom_data(ty: &Type) -> bool {
    last_ident(ty).is_some_and(|ident| ident == "PhantomData")
}

fn last_ident(ty: &Type) -> Option<&syn::Ident> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|s| &s.ident),
        _ => None,
    }
}

/// First type argument of `ty` if its last path segment is `wrapper`
fn generic_of<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}

/// Raw type string for a Rust marker type
///
/// Integers map to `int`, floats to `float`, `String` to `string`, `Value`
/// to `mixed`, `ObjectRef` to `object`, `String`-keyed maps to `array`. `Option<T>` is `T`,
/// `Vec<T>` is `T[]`, and any other named type is a composite of that name.
fn infer_raw_type(ty: &Type) -> String {
    if let Some(inner) = generic_of(ty, "Option") {
        return infer_raw_type(inner);
    }
    if let Some(inner) = generic_of(ty, "Vec") {
        return format!("{}[]", infer_raw_type(inner));
    }

    let Some(ident) = last_ident(ty) else {
        return "mixed".to_string();
    };
    match ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => "int".to_string(),
        "f32" | "f64" => "float".to_string(),
        "bool" => "bool".to_string(),
        "String" => "string".to_string(),
        "Value" => "mixed".to_string(),
        "ObjectRef" => "object".to_string(),
        "IndexMap" | "HashMap" | "BTreeMap" => "array".to_string(),
        other => other.to_string(),
    }
}

/// Expression building the `Value` of a JSON default
///
/// Integers that fit `i64` stay integers; other numbers become floats.
fn value_tokens(json: &serde_json::Value) -> TokenStream {
    let value = quote! { ::typedprop_core::value::Value };
    match json {
        serde_json::Value::Null => quote! { #value::Null },
        serde_json::Value::Bool(b) => quote! { #value::Bool(#b) },
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => quote! { #value::Int(#i) },
            None => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                quote! { #value::Float(#f) }
            }
        },
        serde_json::Value::String(text) => {
            quote! { #value::String(::std::string::String::from(#text)) }
        }
        serde_json::Value::Array(items) => {
            let items = items.iter().map(value_tokens);
            quote! { #value::List(::std::vec![#(#items),*]) }
        }
        serde_json::Value::Object(entries) => {
            let keys = entries.keys();
            let values = entries.values().map(value_tokens);
            quote! {
                [#((#keys, #values)),*]
                    .into_iter()
                    .collect::<#value>()
            }
        }
    }
}

/// First borrowed type inside a marker; getters return owned values
fn borrowed_part(ty: &Type) -> Option<&Type> {
    if matches!(ty, Type::Reference(_)) {
        return Some(ty);
    }
    generic_of(ty, "Option")
        .or_else(|| generic_of(ty, "Vec"))
        .and_then(borrowed_part)
}

/// Generate the Schema implementation
pub fn derive_schema(input: syn::DeriveInput) -> TokenStream {
    match parse_schema(&input) {
        Ok(args) => generate_impl(args),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: SchemaArgs) -> TokenStream {
    let struct_name = &args.ident;
    let type_name = args.type_name();

    // Get fields
    let fields = match &args.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return syn::Error::new_spanned(&args.ident, "Schema can only be derived for structs")
                .to_compile_error()
        }
    };

    if !fields.iter().any(|f| f.is_handle_field()) {
        return syn::Error::new_spanned(
            &args.ident,
            "Schema requires a `handle: ObjectRef` field",
        )
        .to_compile_error();
    }
    if let Some(field) = fields
        .iter()
        .find(|f| !f.is_handle_field() && !is_phantom_data(&f.ty))
    {
        return syn::Error::new_spanned(&field.ty, "Schema fields must be PhantomData markers")
            .to_compile_error();
    }

    if let Some(borrowed) = fields
        .iter()
        .filter(|f| !f.is_handle_field())
        .find_map(|f| borrowed_part(extract_inner_type(&f.ty)))
    {
        return syn::Error::new_spanned(borrowed, "Schema markers must be owned types")
            .to_compile_error();
    }

    let schema_fields: Vec<&SchemaFieldArgs> =
        fields.iter().filter(|f| !f.is_handle_field()).collect();

    // Generate constants
    let constants = generate_constants(&type_name, &schema_fields);

    // Generate getter/setter methods
    let accessors: Vec<_> = schema_fields
        .iter()
        .map(|f| generate_accessors(f))
        .collect();

    // Generate constructor
    let constructor = generate_constructor(&args, &schema_fields);

    let schema_impl = generate_schema_impl(&args, &type_name, &schema_fields);
    let schema_object_impl = generate_schema_object_impl(struct_name, &schema_fields);

    quote! {
        impl #struct_name {
            #constants
            #constructor
            #(#accessors)*
        }

        #schema_impl

        #schema_object_impl
    }
}

fn generate_constants(type_name: &str, fields: &[&SchemaFieldArgs]) -> TokenStream {
    let field_constants = fields.iter().map(|f| {
        let property = f.property_name();
        let const_name = format_ident!("{}_FIELD", f.clean_name().to_uppercase());
        let field_doc = format!("Declared property name for `{}`", f.clean_name());

        quote! {
            #[doc = #field_doc]
            pub const #const_name: &'static str = #property;
        }
    });

    quote! {
        /// Registered type identifier
        pub const TYPE_NAME: &'static str = #type_name;

        #(#field_constants)*
    }
}

fn generate_accessors(field: &SchemaFieldArgs) -> TokenStream {
    // Extract inner type from PhantomData<T>
    let field_ty = extract_inner_type(&field.ty);
    let clean_name = field.clean_name();
    let getter_name = format_ident!("{}", clean_name);
    let setter_name = format_ident!("set_{}", clean_name);
    let const_field_name = format_ident!("{}_FIELD", clean_name.to_uppercase());

    let getter_doc = format!("Get the value of `{}`", field.property_name());
    let setter_doc = format!("Marshal and set the value of `{}`", field.property_name());

    let getter = quote! {
        #[doc = #getter_doc]
        pub fn #getter_name(&self) -> ::typedprop_core::error::Result<#field_ty> {
            ::typedprop_core::schema::read_field(
                &self.handle,
                Self::TYPE_NAME,
                Self::#const_field_name,
            )
        }
    };

    // Generate setter (unless readonly)
    let setter = if field.readonly {
        quote! {}
    } else {
        quote! {
            #[doc = #setter_doc]
            pub fn #setter_name(
                &self,
                value: impl ::std::convert::Into<::typedprop_core::value::Value>,
            ) -> ::typedprop_core::error::Result<()> {
                ::typedprop_core::entity::PropertyAccess::set(
                    &self.handle,
                    Self::#const_field_name,
                    value,
                )
            }
        }
    };

    quote! {
        #getter
        #setter
    }
}

/// Field initializers that rebuild the wrapper around `handle`
fn wrapper_fields(fields: &[&SchemaFieldArgs]) -> Vec<TokenStream> {
    fields
        .iter()
        .filter_map(|f| {
            let ident = f.ident.as_ref()?;
            Some(quote! { #ident: ::std::marker::PhantomData })
        })
        .collect()
}

fn generate_constructor(args: &SchemaArgs, fields: &[&SchemaFieldArgs]) -> TokenStream {
    // Records are built by flat copy, never instantiated directly
    if args.record {
        return quote! {};
    }
    let field_inits = wrapper_fields(fields);

    quote! {
        /// Instantiate a new entity of this type and import `input` into it
        pub fn create(
            marshal: &::std::sync::Arc<::typedprop_core::marshal::Marshal>,
            input: ::std::option::Option<::typedprop_core::value::Value>,
        ) -> ::typedprop_core::error::Result<Self> {
            let handle = marshal.instantiate(Self::TYPE_NAME, input)?;
            Ok(Self {
                handle,
                #(#field_inits),*
            })
        }
    }
}

fn generate_schema_impl(
    args: &SchemaArgs,
    type_name: &str,
    fields: &[&SchemaFieldArgs],
) -> TokenStream {
    let struct_name = &args.ident;

    let base = if args.record {
        quote! { ::typedprop_core::schema::TypeDescriptor::record(#type_name) }
    } else {
        quote! { ::typedprop_core::schema::TypeDescriptor::entity(#type_name) }
    };

    let extends = args.extends.as_ref().map(|parent| {
        quote! { let descriptor = descriptor.extends(#parent); }
    });
    let permissive = args.permissive.then(|| {
        quote! { let descriptor = descriptor.permissive(); }
    });
    let skip_invalid = args.skip_invalid.then(|| {
        quote! {
            let descriptor =
                descriptor.import_mode(::typedprop_core::entity::ImportMode::SkipInvalid);
        }
    });
    let default_type = args.default_type.as_ref().map(|raw| {
        quote! { let descriptor = descriptor.default_type(#raw); }
    });

    let properties = fields.iter().map(|f| {
        let property = f.property_name();
        let raw_type = f
            .raw_type
            .clone()
            .unwrap_or_else(|| infer_raw_type(extract_inner_type(&f.ty)));
        let default = f.default_json.as_ref().map(|json| {
            let value = match serde_json::from_str::<serde_json::Value>(json) {
                Ok(parsed) => value_tokens(&parsed),
                Err(e) => {
                    let message = format!("invalid JSON default for `{}`: {}", property, e);
                    return syn::Error::new_spanned(&f.ty, message).to_compile_error();
                }
            };
            quote! {
                let descriptor = descriptor.default_value(#property, #value);
            }
        });

        quote! {
            let descriptor = descriptor.property(#property, #raw_type);
            #default
        }
    });

    quote! {
        impl ::typedprop_core::schema::Schema for #struct_name {
            const TYPE_NAME: &'static str = #type_name;

            fn descriptor() -> ::typedprop_core::schema::TypeDescriptor {
                let descriptor = #base;
                #extends
                #permissive
                #skip_invalid
                #default_type
                #(#properties)*
                descriptor
            }
        }
    }
}

fn generate_schema_object_impl(
    struct_name: &syn::Ident,
    fields: &[&SchemaFieldArgs],
) -> TokenStream {
    let field_inits = wrapper_fields(fields);

    quote! {
        impl ::typedprop_core::schema::SchemaObject for #struct_name {
            fn handle(&self) -> &::typedprop_core::value::ObjectRef {
                &self.handle
            }

            fn type_name(&self) -> &'static str {
                Self::TYPE_NAME
            }

            fn from_handle(
                handle: ::typedprop_core::value::ObjectRef,
            ) -> ::std::option::Option<Self> {
                if handle.is_instance_of(Self::TYPE_NAME) {
                    Some(Self {
                        handle,
                        #(#field_inits),*
                    })
                } else {
                    None
                }
            }
        }

        impl ::typedprop_core::value::FromValue for #struct_name {
            const EXPECTED: &'static str = Self::TYPE_NAME;

            fn from_value(
                value: ::typedprop_core::value::Value,
            ) -> ::std::result::Result<Self, ::typedprop_core::value::Value> {
                match value {
                    ::typedprop_core::value::Value::Object(handle)
                        if handle.is_instance_of(Self::TYPE_NAME) =>
                    {
                        Ok(Self {
                            handle,
                            #(#field_inits),*
                        })
                    }
                    other => Err(other),
                }
            }
        }
    }
}
