//! Create planning.
//!
//! Walks an object graph without touching the store and decides which
//! entity nodes to create and which relationships to link. Every object
//! is visited once, keyed by address; a reference to an object already
//! in the plan (a back-edge or a shared child) points at its plan slot,
//! so cycles terminate and the edge is linked once every node exists.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::mapping::{Mapped, ObjectKey, Target};
use crate::model::{NodeId, Value};
use crate::Result;

/// An object scheduled for creation.
pub(crate) enum Handle<'a> {
    Root(&'a dyn Mapped),
    Child(Arc<dyn Mapped>),
}

impl Handle<'_> {
    pub(crate) fn object(&self) -> &dyn Mapped {
        match self {
            Handle::Root(object) => *object,
            Handle::Child(object) => object.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EdgeTarget {
    Value(Value),
    /// Entity persisted before this call.
    Existing(NodeId),
    /// Entity created by this plan, by slot.
    Planned(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlannedEdge {
    pub(crate) relation: String,
    pub(crate) target: EdgeTarget,
    pub(crate) weight: Option<i64>,
}

pub(crate) struct PlannedEntity<'a> {
    pub(crate) handle: Handle<'a>,
    pub(crate) edges: Vec<PlannedEdge>,
}

/// Entities in pre-order; slot 0 is the root.
#[derive(Default)]
pub(crate) struct CreatePlan<'a> {
    pub(crate) entities: Vec<PlannedEntity<'a>>,
    visited: HashMap<ObjectKey, usize>,
}

impl<'a> CreatePlan<'a> {
    /// Plan `root` as a new node, whether or not it already has an identity.
    pub(crate) fn build(root: Handle<'a>) -> Result<Self> {
        let mut plan = Self::default();
        plan.visit(root)?;
        Ok(plan)
    }

    /// Slot for an entity referenced from outside a plan walk, or the
    /// existing identity when it is already persisted.
    pub(crate) fn target_for(&mut self, object: Arc<dyn Mapped>) -> Result<EdgeTarget> {
        if let Some(slot) = self.visited.get(&object.object_key()) {
            return Ok(EdgeTarget::Planned(*slot));
        }
        if let Some(id) = object.identity() {
            return Ok(EdgeTarget::Existing(id));
        }
        self.visit(Handle::Child(object)).map(EdgeTarget::Planned)
    }

    fn visit(&mut self, handle: Handle<'a>) -> Result<usize> {
        let slot = self.entities.len();
        self.visited.insert(handle.object().object_key(), slot);
        let properties = handle.object().properties()?;
        self.entities.push(PlannedEntity { handle, edges: Vec::new() });

        let mut edges = Vec::new();
        for (relation, value) in properties {
            for edge in value.into_edges() {
                let target = match edge.target {
                    Target::Value(v) => EdgeTarget::Value(v),
                    Target::Entity(child) => self.target_for(child)?,
                };
                edges.push(PlannedEdge { relation: relation.clone(), target, weight: edge.weight });
            }
        }
        self.entities[slot].edges = edges;
        Ok(slot)
    }

    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{DynamicEntity, Field, shared};

    #[test]
    fn test_cycle_plans_each_object_once() {
        let a = shared(DynamicEntity::new().with("Name", Value::from("A")));
        let b = shared(DynamicEntity::new().with("Name", Value::from("B")));
        a.write().set("Partner", Field::EntityRef(b.clone()));
        b.write().set("Partner", Field::EntityRef(a.clone()));

        let plan = CreatePlan::build(Handle::Root(&a)).unwrap();
        assert_eq!(plan.len(), 2);

        let partner_of = |slot: usize| {
            plan.entities[slot].edges.iter()
                .find(|e| e.relation == "Partner")
                .map(|e| e.target.clone())
        };
        assert_eq!(partner_of(0), Some(EdgeTarget::Planned(1)));
        assert_eq!(partner_of(1), Some(EdgeTarget::Planned(0)));
    }

    #[test]
    fn test_identified_references_are_reused() {
        let known = shared(DynamicEntity::identified(NodeId(42), None).with("Name", Value::from("K")));
        let root = shared(DynamicEntity::new().with("Friends", Field::Collection(vec![
            Field::EntityRef(known.clone()),
            Field::EntityRef(known),
        ])));

        let plan = CreatePlan::build(Handle::Root(&root)).unwrap();
        assert_eq!(plan.len(), 1);
        let targets: Vec<_> = plan.entities[0].edges.iter().map(|e| e.target.clone()).collect();
        assert_eq!(targets, vec![EdgeTarget::Existing(NodeId(42)), EdgeTarget::Existing(NodeId(42))]);
    }

    #[test]
    fn test_root_is_planned_even_when_identified() {
        let root = shared(DynamicEntity::identified(NodeId(1), None).with("Tags", Field::Collection(vec![
            Field::scalar("x"),
            Field::scalar("y"),
        ])));
        let plan = CreatePlan::build(Handle::Root(&root)).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.entities[0].edges.len(), 2);
    }

    #[test]
    fn test_edges_keep_weights() {
        let friend = shared(DynamicEntity::new());
        let root = shared(DynamicEntity::new()
            .with("Tags", Field::Collection(vec![Field::weighted(Field::scalar("x"), 4), Field::scalar("y")]))
            .with("Friend", Field::weighted(Field::EntityRef(friend), 2)));

        let plan = CreatePlan::build(Handle::Root(&root)).unwrap();
        let weights: Vec<_> = plan.entities[0].edges.iter().map(|e| (e.relation.as_str(), e.weight)).collect();
        assert_eq!(weights, vec![("Friend", Some(2)), ("Tags", Some(4)), ("Tags", None)]);
        assert_eq!(plan.len(), 2);
    }
}
