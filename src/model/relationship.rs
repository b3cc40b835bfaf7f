//! Relationship (edge) in the property graph.

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap, Value};

/// Opaque relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relationship property carrying a ranking hint.
pub const WEIGHT_KEY: &str = "weight";
/// Relationship property carrying the start of the validity interval.
pub const START_KEY: &str = "start";
/// Relationship property carrying the end of the validity interval.
pub const END_KEY: &str = "end";

/// A directed relationship. The type is the sanitized property name of
/// the owning entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub src: NodeId,
    pub dst: NodeId,
    pub rel_type: String,
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(id: RelId, src: NodeId, dst: NodeId, rel_type: impl Into<String>) -> Self {
        Self {
            id,
            src,
            dst,
            rel_type: rel_type.into(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn weight(&self) -> Option<i64> {
        self.properties.get(WEIGHT_KEY).and_then(Value::as_int)
    }

    pub fn start(&self) -> Option<i64> {
        self.properties.get(START_KEY).and_then(Value::as_int)
    }

    pub fn end(&self) -> Option<i64> {
        self.properties.get(END_KEY).and_then(Value::as_int)
    }
}
