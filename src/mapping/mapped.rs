//! The erased object contract the persistence engine walks.
//!
//! Typed entities and dynamic entities both surface here as
//! `dyn Mapped`: an identity slot plus a snapshot of their properties
//! keyed by relation name.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{NodeId, Value};
use crate::Result;
use super::dynamic::DynamicEntity;
use super::shape::Entity;

/// Address of an in-memory object. Two handles to the same shared
/// object yield the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    pub fn of<T: ?Sized>(object: &T) -> Self {
        ObjectKey(object as *const T as *const () as usize)
    }
}

/// What one relationship of a property points at.
#[derive(Clone)]
pub enum Target {
    Value(Value),
    Entity(Arc<dyn Mapped>),
}

impl Target {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Target::Value(v) => Some(v),
            Target::Entity(_) => None,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Value(v) => write!(f, "Value({v})"),
            Target::Entity(e) => write!(f, "Entity({}#{:?})", e.shape_name(), e.identity()),
        }
    }
}

/// One relationship a property asks for. `weight: None` leaves any stored
/// weight alone.
#[derive(Debug, Clone)]
pub struct Edge {
    pub target: Target,
    pub weight: Option<i64>,
}

impl Edge {
    pub fn new(target: Target, weight: Option<i64>) -> Self {
        Self { target, weight }
    }
}

/// Current value of one property, already classified.
#[derive(Clone)]
pub enum PropertyValue {
    /// `None`, an empty collection, or a NULL scalar.
    Absent,
    Scalar(Value),
    Scalars(Vec<Value>),
    Entity(Arc<dyn Mapped>),
    Entities(Vec<Arc<dyn Mapped>>),
    /// Relationships that carry their own weight.
    Weighted(Vec<Edge>),
}

impl PropertyValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, PropertyValue::Absent)
    }

    /// One edge per relationship this property should have, in order.
    pub fn into_edges(self) -> Vec<Edge> {
        match self {
            PropertyValue::Absent => Vec::new(),
            PropertyValue::Scalar(v) => vec![Edge::new(Target::Value(v), None)],
            PropertyValue::Scalars(vs) => vs.into_iter().map(|v| Edge::new(Target::Value(v), None)).collect(),
            PropertyValue::Entity(e) => vec![Edge::new(Target::Entity(e), None)],
            PropertyValue::Entities(es) => es.into_iter().map(|e| Edge::new(Target::Entity(e), None)).collect(),
            PropertyValue::Weighted(edges) => edges,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Absent => f.write_str("Absent"),
            PropertyValue::Scalar(v) => write!(f, "Scalar({v})"),
            PropertyValue::Scalars(vs) => f.debug_tuple("Scalars").field(vs).finish(),
            PropertyValue::Entity(e) => write!(f, "Entity({}#{:?})", e.shape_name(), e.identity()),
            PropertyValue::Entities(es) => {
                let ids: Vec<_> = es.iter().map(|e| e.identity()).collect();
                f.debug_tuple("Entities").field(&ids).finish()
            }
            PropertyValue::Weighted(edges) => f.debug_tuple("Weighted").field(edges).finish(),
        }
    }
}

/// An object the persistence engine can create, diff and delete.
pub trait Mapped: Send + Sync {
    /// Shape name used in logs and `NotPersisted` errors.
    fn shape_name(&self) -> &str;

    fn identity(&self) -> Option<NodeId>;

    /// Assign (or clear) the identity after a successful write.
    fn bind_identity(&self, id: Option<NodeId>, label: &str);

    /// Snapshot of every mapped property as `(relation name, value)`.
    fn properties(&self) -> Result<Vec<(String, PropertyValue)>>;

    fn object_key(&self) -> ObjectKey;
}

impl<T: Entity> Mapped for RwLock<T> {
    fn shape_name(&self) -> &str {
        T::shape().name()
    }

    fn identity(&self) -> Option<NodeId> {
        self.read().entity_node().id
    }

    fn bind_identity(&self, id: Option<NodeId>, label: &str) {
        let mut entity = self.write();
        let node = entity.entity_node_mut();
        node.id = id;
        node.label = id.map(|_| label.to_string());
    }

    fn properties(&self) -> Result<Vec<(String, PropertyValue)>> {
        let entity = self.read();
        Ok(T::shape()
            .properties()
            .iter()
            .map(|p| (p.relation().to_string(), p.read(&entity)))
            .collect())
    }

    fn object_key(&self) -> ObjectKey {
        ObjectKey::of(self)
    }
}

impl Mapped for RwLock<DynamicEntity> {
    fn shape_name(&self) -> &str {
        "DynamicEntity"
    }

    fn identity(&self) -> Option<NodeId> {
        self.read().node.id
    }

    fn bind_identity(&self, id: Option<NodeId>, label: &str) {
        let mut entity = self.write();
        entity.node.id = id;
        entity.node.label = id.map(|_| label.to_string());
    }

    fn properties(&self) -> Result<Vec<(String, PropertyValue)>> {
        let entity = self.read();
        entity
            .fields()
            .map(|(name, field)| Ok((name.to_string(), super::classify::property_value(name, field)?)))
            .collect()
    }

    fn object_key(&self) -> ObjectKey {
        ObjectKey::of(self)
    }
}

impl<M: Mapped + ?Sized> Mapped for Arc<M> {
    fn shape_name(&self) -> &str {
        (**self).shape_name()
    }

    fn identity(&self) -> Option<NodeId> {
        (**self).identity()
    }

    fn bind_identity(&self, id: Option<NodeId>, label: &str) {
        (**self).bind_identity(id, label)
    }

    fn properties(&self) -> Result<Vec<(String, PropertyValue)>> {
        (**self).properties()
    }

    fn object_key(&self) -> ObjectKey {
        (**self).object_key()
    }
}
