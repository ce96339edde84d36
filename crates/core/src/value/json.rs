//! Conversion between [`Value`] and `serde_json::Value`
//!
//! JSON is the interchange format for defaults, cache snapshots and CLI
//! input/output. Objects have no JSON form; anything containing one is
//! reported as not representable.

use serde_json::Number;

use super::Value;

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Parse a JSON literal into a value
    pub fn from_json_str(json: &str) -> Result<Value, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(json).map(Value::from)
    }

    /// JSON form of this value
    ///
    /// Returns `None` if an object or a non-finite float is reachable.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Value::Number(Number::from_f64(*f)?),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| v.to_json().map(|j| (k.clone(), j)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
            Value::Object(_) => return None,
        })
    }
}
