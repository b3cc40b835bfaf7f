//! Dynamically shaped entities.
//!
//! A `DynamicEntity` is a name → [`Field`] map. Field names are stored
//! sanitized, so `"Date Of Birth"` and `"Date_Of_Birth"` address the same
//! field.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{EntityNode, NodeId, Value};
use super::{sanitize, shared, Shared};

/// One dynamic property value.
#[derive(Clone)]
pub enum Field {
    Scalar(Value),
    EntityRef(Shared<DynamicEntity>),
    Collection(Vec<Field>),
    /// A scalar or reference whose relationship carries a weight.
    Weighted(Box<Field>, i64),
}

impl Field {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Field::Scalar(value.into())
    }

    pub fn entity(entity: DynamicEntity) -> Self {
        Field::EntityRef(shared(entity))
    }

    /// Attach `weight` to a single value. Re-weighting replaces the old
    /// weight.
    pub fn weighted(field: impl Into<Field>, weight: i64) -> Self {
        match field.into() {
            Field::Weighted(inner, _) => Field::Weighted(inner, weight),
            other => Field::Weighted(Box::new(other), weight),
        }
    }

    pub fn weight(&self) -> Option<i64> {
        match self {
            Field::Weighted(_, w) => Some(*w),
            _ => None,
        }
    }

    /// The value without its weight.
    pub fn unweighted(&self) -> &Field {
        match self {
            Field::Weighted(inner, _) => inner,
            other => other,
        }
    }

    /// Append `item`, promoting a single value to a collection first.
    /// Promotion happens once; insertion order is kept.
    pub fn push(&mut self, item: Field) {
        match self {
            Field::Collection(items) => items.push(item),
            single => {
                let first = std::mem::replace(single, Field::Collection(Vec::with_capacity(2)));
                if let Field::Collection(items) = single {
                    items.push(first);
                    items.push(item);
                }
            }
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self.unweighted() {
            Field::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Shared<DynamicEntity>> {
        match self.unweighted() {
            Field::EntityRef(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Field]> {
        match self {
            Field::Collection(items) => Some(items),
            _ => None,
        }
    }

    /// Number of values held: 1 for a single value.
    pub fn len(&self) -> usize {
        match self {
            Field::Collection(items) => items.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Scalar(value)
    }
}

impl From<Shared<DynamicEntity>> for Field {
    fn from(entity: Shared<DynamicEntity>) -> Self {
        Field::EntityRef(entity)
    }
}

impl From<Vec<Field>> for Field {
    fn from(items: Vec<Field>) -> Self {
        Field::Collection(items)
    }
}

impl PartialEq for Field {
    /// Scalars compare by value, references by identity (or by object
    /// when neither side is persisted).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Scalar(a), Field::Scalar(b)) => a == b,
            (Field::EntityRef(a), Field::EntityRef(b)) => {
                Arc::ptr_eq(a, b) || matches!((a.read().node.id, b.read().node.id), (Some(x), Some(y)) if x == y)
            }
            (Field::Collection(a), Field::Collection(b)) => a == b,
            (Field::Weighted(a, x), Field::Weighted(b, y)) => x == y && a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Scalar(v) => write!(f, "Scalar({v})"),
            // Identity only: references may form cycles.
            Field::EntityRef(e) => match e.try_read() {
                Some(entity) => write!(f, "EntityRef({:?})", entity.node.id),
                None => f.write_str("EntityRef(<locked>)"),
            },
            Field::Collection(items) => f.debug_list().entries(items).finish(),
            Field::Weighted(inner, weight) => write!(f, "{inner:?}@{weight}"),
        }
    }
}

/// Entity whose properties are only known at run time.
#[derive(Debug, Clone, Default)]
pub struct DynamicEntity {
    pub node: EntityNode,
    fields: BTreeMap<String, Field>,
}

impl DynamicEntity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity-only entity, as produced for one-hop references.
    pub fn identified(id: NodeId, label: Option<String>) -> Self {
        Self { node: EntityNode { id: Some(id), label }, fields: BTreeMap::new() }
    }

    pub fn with(mut self, name: &str, field: impl Into<Field>) -> Self {
        self.set(name, field);
        self
    }

    pub fn id(&self) -> Option<NodeId> {
        self.node.id
    }

    pub fn set(&mut self, name: &str, field: impl Into<Field>) -> Option<Field> {
        self.fields.insert(sanitize(name), field.into())
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(&sanitize(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(&sanitize(name))
    }

    /// Add a value under `name`, promoting to a collection when the name
    /// is already set.
    pub fn accumulate(&mut self, name: &str, field: Field) {
        match self.fields.get_mut(&sanitize(name)) {
            Some(existing) => existing.push(field),
            None => {
                self.fields.insert(sanitize(name), field);
            }
        }
    }

    /// Fields in relation-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_shared(self) -> Shared<DynamicEntity> {
        Arc::new(RwLock::new(self))
    }
}
