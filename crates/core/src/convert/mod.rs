//! Converters - Cycle-safe renderings of object graphs
//!
//! A [`ConverterStrategy`] walks a value depth-first and produces an external
//! representation. Object identity is tracked on a per-call visitation stack:
//! an object already on the stack is a cycle, an object seen on a sibling
//! branch (shared but acyclic) is simply rendered again.
//!
//! | Strategy      | Output         | On cycle                      | Depth limit |
//! |---------------|----------------|-------------------------------|-------------|
//! | [`FlatArray`] | `Value` tree   | null, or `CircularReference`  | none        |
//! | [`Dump`]      | `Vec<String>`  | `*RECURSION*` placeholder     | configurable|

mod dump;
mod flat;

pub use dump::Dump;
pub use flat::FlatArray;

use crate::error::Result;
use crate::value::{ObjectId, Value};

/// A recursive graph-to-representation conversion
pub trait ConverterStrategy {
    type Output;

    /// Convert the graph rooted at `root`
    fn convert(&self, root: &Value) -> Result<Self::Output>;
}

/// Objects on the current traversal path
#[derive(Debug, Default)]
struct Visitation {
    stack: Vec<ObjectId>,
}

impl Visitation {
    fn contains(&self, id: ObjectId) -> bool {
        self.stack.contains(&id)
    }

    fn push(&mut self, id: ObjectId) {
        self.stack.push(id);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }
}
