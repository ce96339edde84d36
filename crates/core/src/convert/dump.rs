//! Annotated text tree rendering

use super::{ConverterStrategy, Visitation};
use crate::config::DumpConfig;
use crate::error::Result;
use crate::value::Value;

/// Depth-limited, cycle-safe text tree
///
/// Composite nodes render as a header `Type (n)` followed by one line per
/// child, `key: rendering`, indented one level deeper. Scalars render as
/// literals (text quoted; `true`, `false`, `null` bare).
///
/// ```text
/// Person (2)
///   name: "Ada"
///   friend: Person (2)
///     name: "Grace"
///     friend: *RECURSION* Person
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump {
    max_depth: usize,
    indent: String,
}

impl Dump {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Default::default()
        }
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn from_config(config: &DumpConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            indent: config.indent.clone(),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Convert and join into a single newline-separated string
    pub fn render(&self, root: &Value) -> Result<String> {
        Ok(self.convert(root)?.join("\n"))
    }

    fn dump(
        &self,
        value: &Value,
        key: Option<&str>,
        depth: usize,
        visiting: &mut Visitation,
        lines: &mut Vec<String>,
    ) {
        let mut prefix = self.indent.repeat(depth);
        if let Some(key) = key {
            prefix.push_str(key);
            prefix.push_str(": ");
        }

        let (label, children, id) = match value {
            Value::Object(object) => (object.type_name(), object.fields(), Some(object.id())),
            Value::List(_) | Value::Map(_) => (
                value.type_label(),
                value.array_entries().unwrap_or_default(),
                None,
            ),
            scalar => {
                lines.push(format!("{}{}", prefix, scalar));
                return;
            }
        };

        if id.is_some_and(|id| visiting.contains(id)) {
            lines.push(format!("{}*RECURSION* {}", prefix, label));
            return;
        }
        if depth > self.max_depth {
            lines.push(format!("{}{} ({}) *MAX DEPTH*", prefix, label, children.len()));
            return;
        }

        lines.push(format!("{}{} ({})", prefix, label, children.len()));
        if let Some(id) = id {
            visiting.push(id);
        }
        for (child_key, child) in &children {
            self.dump(child, Some(child_key), depth + 1, visiting, lines);
        }
        if id.is_some() {
            visiting.pop();
        }
    }
}

impl Default for Dump {
    fn default() -> Self {
        Self::from_config(&DumpConfig::default())
    }
}

impl ConverterStrategy for Dump {
    type Output = Vec<String>;

    fn convert(&self, root: &Value) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        self.dump(root, None, 0, &mut Visitation::default(), &mut lines);
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PropertyAccess;
    use crate::value::ObjectRef;

    #[test]
    fn test_scalars() {
        let root: Value = [
            ("s", Value::from("hi")),
            ("b", Value::Bool(true)),
            ("n", Value::Null),
            ("i", Value::from(3)),
            ("f", Value::from(1.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            Dump::default().convert(&root).unwrap(),
            vec![
                "array (5)",
                "  s: \"hi\"",
                "  b: true",
                "  n: null",
                "  i: 3",
                "  f: 1.0",
            ]
        );
    }

    #[test]
    fn test_self_reference_single_placeholder() {
        let node = ObjectRef::record("Node", Default::default());
        node.set("name", "a").unwrap();
        node.set("self", node.clone()).unwrap();

        let lines = Dump::default().convert(&Value::Object(node.clone())).unwrap();
        assert_eq!(
            lines,
            vec!["Node (2)", "  name: \"a\"", "  self: *RECURSION* Node"]
        );
        assert_eq!(lines.iter().filter(|l| l.contains("*RECURSION*")).count(), 1);

        node.set("self", Value::Null).unwrap();
    }

    #[test]
    fn test_depth_limit() {
        let nested = Value::List(vec![Value::List(vec![Value::List(vec![Value::from(1)])])]);
        let lines = Dump::new(1).with_indent("\t").convert(&nested).unwrap();
        assert_eq!(
            lines,
            vec!["array (1)", "\t0: array (1)", "\t\t0: array (1) *MAX DEPTH*"]
        );
    }

    #[test]
    fn test_render_joins_lines() {
        let out = Dump::default().render(&Value::from(7)).unwrap();
        assert_eq!(out, "7");
    }
}
