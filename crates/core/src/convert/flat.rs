//! Flat associative rendering

use indexmap::IndexMap;

use super::{ConverterStrategy, Visitation};
use crate::config::FlatConfig;
use crate::error::{Error, Result};
use crate::value::Value;

/// Mirrors a graph as plain data: objects become maps of their fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatArray {
    graceful: bool,
}

impl FlatArray {
    /// Converter emitting null for revisited objects
    pub fn graceful() -> Self {
        Self { graceful: true }
    }

    /// Converter failing with `CircularReference` on a cycle
    pub fn strict() -> Self {
        Self { graceful: false }
    }

    pub fn from_config(config: &FlatConfig) -> Self {
        Self {
            graceful: config.graceful,
        }
    }

    pub fn is_graceful(&self) -> bool {
        self.graceful
    }

    fn flatten(
        &self,
        value: &Value,
        owner: &str,
        field: &str,
        visiting: &mut Visitation,
    ) -> Result<Value> {
        match value {
            Value::Object(object) => {
                let id = object.id();
                let type_name = object.type_name();
                if visiting.contains(id) {
                    if self.graceful {
                        return Ok(Value::Null);
                    }
                    return Err(Error::CircularReference {
                        owner: owner.to_string(),
                        field: field.to_string(),
                    });
                }

                visiting.push(id);
                let fields = object.fields();
                let flattened = fields
                    .iter()
                    .map(|(key, child)| {
                        self.flatten(child, &type_name, key, visiting)
                            .map(|v| (key.clone(), v))
                    })
                    .collect::<Result<IndexMap<_, _>>>();
                visiting.pop();
                flattened.map(Value::Map)
            }
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.flatten(item, owner, &format!("{}[{}]", field, i), visiting))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, item)| {
                    self.flatten(item, owner, &format!("{}[{}]", field, key), visiting)
                        .map(|v| (key.clone(), v))
                })
                .collect::<Result<IndexMap<_, _>>>()
                .map(Value::Map),
            scalar => Ok(scalar.clone()),
        }
    }
}

impl Default for FlatArray {
    fn default() -> Self {
        Self::graceful()
    }
}

impl ConverterStrategy for FlatArray {
    type Output = Value;

    fn convert(&self, root: &Value) -> Result<Value> {
        let owner = root.type_label();
        self.flatten(root, &owner, "", &mut Visitation::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PropertyAccess;
    use crate::value::ObjectRef;

    fn point(x: i64) -> ObjectRef {
        ObjectRef::record("Point", [("x".to_string(), Value::from(x))].into_iter().collect())
    }

    #[test]
    fn test_mirrors_shape() {
        let root = Value::List(vec![
            Value::Object(point(1)),
            Value::from("s"),
            [("k", Value::from(2))].into_iter().collect(),
        ]);
        let flat = FlatArray::default().convert(&root).unwrap();
        let expected = Value::List(vec![
            [("x", Value::from(1))].into_iter().collect(),
            Value::from("s"),
            [("k", Value::from(2))].into_iter().collect(),
        ]);
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_shared_object_renders_twice() {
        let shared = point(3);
        let root = Value::List(vec![Value::Object(shared.clone()), Value::Object(shared)]);
        let flat = FlatArray::strict().convert(&root).unwrap();
        let p: Value = [("x", Value::from(3))].into_iter().collect();
        assert_eq!(flat, Value::List(vec![p.clone(), p]));
    }

    #[test]
    fn test_cycle_graceful_and_strict() {
        let node = point(1);
        node.set("next", node.clone()).unwrap();
        let root = Value::Object(node);

        let flat = FlatArray::graceful().convert(&root).unwrap();
        let expected: Value = [("x", Value::from(1)), ("next", Value::Null)]
            .into_iter()
            .collect();
        assert_eq!(flat, expected);

        let err = FlatArray::strict().convert(&root).unwrap_err();
        assert!(matches!(
            err,
            Error::CircularReference { owner, field } if owner == "Point" && field == "next"
        ));

        // Break the cycle so the test does not leak
        root.as_object().unwrap().set("next", Value::Null).unwrap();
    }
}
