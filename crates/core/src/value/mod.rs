//! Dynamic value model
//!
//! Every entity field holds a [`Value`]. Lists and maps are plain data: they
//! are copied on assignment and cannot form cycles. Objects are shared,
//! identity-bearing handles ([`ObjectRef`]); cycles in a graph can only pass
//! through them.

mod json;
mod object;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use indexmap::IndexMap;

pub use object::{Object, ObjectId, ObjectRef, Record};

/// A dynamically typed field value
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered sequence with implicit integer keys
    List(Vec<Value>),
    /// Ordered associative structure
    Map(IndexMap<String, Value>),
    /// Shared composite with identity
    Object(ObjectRef),
}

impl Value {
    /// Type label used in diagnostics and dumps
    ///
    /// Scalars and containers use their kind name, objects their runtime
    /// type name.
    pub fn type_label(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::String(_) => "string".to_string(),
            Value::List(_) | Value::Map(_) => "array".to_string(),
            Value::Object(object) => object.type_name(),
        }
    }

    /// Whether this is a scalar (null, bool, int, float, string)
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is a list or a map
    pub fn is_array(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Number of direct children for containers and objects
    pub fn child_count(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Map(entries) => entries.len(),
            Value::Object(object) => object.field_count(),
            _ => 0,
        }
    }

    /// Key/value pairs of a list or map, in order
    ///
    /// List keys are their decimal indexes. Returns `None` for anything that
    /// is not an array.
    pub fn array_entries(&self) -> Option<Vec<(String, Value)>> {
        match self {
            Value::List(items) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v.clone()))
                    .collect(),
            ),
            Value::Map(entries) => Some(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Copy this value, duplicating every reachable object
    ///
    /// Used to hand each entity instance its own copy of cached defaults.
    /// Must only be called on acyclic values.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::deep_clone).collect()),
            Value::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect(),
            ),
            Value::Object(object) => Value::Object(object.deep_clone()),
            other => other.clone(),
        }
    }

    /// Whether any object is reachable from this value
    pub fn contains_object(&self) -> bool {
        match self {
            Value::Object(_) => true,
            Value::List(items) => items.iter().any(Value::contains_object),
            Value::Map(entries) => entries.values().any(Value::contains_object),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", key, item)?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

// ============================================================================
// Conversions into Value
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Conversions out of Value
// ============================================================================

/// Typed extraction used by generated accessors
///
/// On failure the original value is handed back so the caller can build a
/// `TypeMismatch` that carries it.
pub trait FromValue: Sized {
    /// Type label reported when extraction fails
    const EXPECTED: &'static str;

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "mixed";

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other),
        }
    }
}

/// Narrower integers read an `Int` that fits their range
macro_rules! impl_from_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const EXPECTED: &'static str = "int";

                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| Value::Int(i)),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i128, isize, u8, u16, u32, u64, u128, usize);

impl FromValue for f32 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(f) if f.abs() <= f32::MAX as f64 => Ok(f as f32),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for ObjectRef {
    const EXPECTED: &'static str = "object";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_value(value: Value) -> Result<Self, Value> {
        let items: Vec<Value> = match value {
            Value::List(items) => items,
            Value::Map(entries) => entries.into_values().collect(),
            other => return Err(other),
        };

        let converted: Option<Vec<T>> = items
            .iter()
            .cloned()
            .map(|item| T::from_value(item).ok())
            .collect();
        converted.ok_or_else(|| Value::List(items))
    }
}

/// Maps read a `Map` whose every value converts
macro_rules! impl_from_value_map {
    ($($map:ident),* $(,)?) => {
        $(
            impl<T: FromValue> FromValue for $map<String, T> {
                const EXPECTED: &'static str = "array";

                fn from_value(value: Value) -> Result<Self, Value> {
                    let Value::Map(entries) = value else {
                        return Err(value);
                    };
                    let converted: Option<$map<String, T>> = entries
                        .iter()
                        .map(|(key, item)| {
                            Some((key.clone(), T::from_value(item.clone()).ok()?))
                        })
                        .collect();
                    converted.ok_or(Value::Map(entries))
                }
            }
        )*
    };
}

impl_from_value_map!(IndexMap, HashMap, BTreeMap);
