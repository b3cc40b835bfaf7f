//! Property paths, comparison operators and operands.

use std::fmt;

use smallvec::SmallVec;

use crate::mapping::{sanitize, Mapped};
use crate::model::{NodeId, Value};

/// A chain of property names walked from the query root: `child.name`
/// walks the `child` relation, then the `name` relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: SmallVec<[String; 4]>,
}

impl PropertyPath {
    pub fn new(first: &str) -> Self {
        let mut segments = SmallVec::new();
        segments.push(sanitize(first));
        Self { segments }
    }

    /// Split a dotted path. Empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').filter(|s| !s.is_empty()).map(sanitize).collect(),
        }
    }

    pub fn then(mut self, segment: &str) -> Self {
        self.segments.push(sanitize(segment));
        self
    }

    /// Relation names, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for PropertyPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Operator applied to the terminal node of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

impl Comparison {
    /// True for the string-pattern operators compiled to a regex match.
    pub fn is_pattern(self) -> bool {
        matches!(self, Comparison::Contains | Comparison::StartsWith | Comparison::EndsWith)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Compared against the terminal value node's payload.
    Scalar(Value),
    /// Compared against the terminal entity node's identity.
    Entity(NodeId),
}

impl Operand {
    /// Operand referring to a persisted object; `None` if it has no
    /// identity yet.
    pub fn entity_of(object: &dyn Mapped) -> Option<Self> {
        object.identity().map(Operand::Entity)
    }
}

macro_rules! scalar_operand {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Operand {
            fn from(value: $ty) -> Self {
                Operand::Scalar(Value::from(value))
            }
        }
    )*};
}

scalar_operand!(Value, bool, i32, i64, f64, String, &str, chrono::NaiveDate, chrono::DateTime<chrono::Utc>);

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self {
        Operand::Entity(id)
    }
}
