//! Classification of declared base types

/// Scalar cast targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    String,
    /// The "clear"/unset cast
    Null,
}

impl ScalarKind {
    pub fn label(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Null => "null",
        }
    }
}

/// What a definition's base type constrains a value to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType<'a> {
    /// `mixed`, `any`, or an empty base type: unconstrained
    Any,
    Scalar(ScalarKind),
    /// List or map
    Array,
    /// Any object
    Object,
    /// A named composite type (entity or record)
    Composite(&'a str),
}

impl<'a> DeclaredType<'a> {
    /// Classify a base type; keywords are case-insensitive
    pub fn parse(base: &'a str) -> Self {
        match base.to_ascii_lowercase().as_str() {
            "" | "mixed" | "any" => DeclaredType::Any,
            "int" | "integer" => DeclaredType::Scalar(ScalarKind::Int),
            "float" | "double" => DeclaredType::Scalar(ScalarKind::Float),
            "bool" | "boolean" => DeclaredType::Scalar(ScalarKind::Bool),
            "string" => DeclaredType::Scalar(ScalarKind::String),
            "null" | "unset" => DeclaredType::Scalar(ScalarKind::Null),
            "array" | "list" | "iterable" => DeclaredType::Array,
            "object" => DeclaredType::Object,
            _ => DeclaredType::Composite(base),
        }
    }

    /// Cast rule for this type, if it has one
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            DeclaredType::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Label used in `TypeMismatch` errors
    pub fn label(&self) -> String {
        match self {
            DeclaredType::Any => "mixed".to_string(),
            DeclaredType::Scalar(kind) => kind.label().to_string(),
            DeclaredType::Array => "array".to_string(),
            DeclaredType::Object => "object".to_string(),
            DeclaredType::Composite(name) => name.to_string(),
        }
    }
}
