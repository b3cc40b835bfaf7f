//! # Result Hydrator
//!
//! Turns the flat `(entity, rel, value)` rows of a traversal back into
//! entities:
//!
//! 1. **Extract**: each row becomes a [`Tuple`]
//! 2. **Group**: tuples collapse into one [`PropertySet`] per entity
//!    identity, in arrival order
//! 3. **Materialize**: a property set becomes a [`DynamicEntity`] or a
//!    typed [`Entity`]
//!
//! Related entities are materialized one hop deep: they carry only their
//! identity. `EntityManager::populate` loads the rest on demand.

use hashbrown::HashMap;

use crate::config::MappingConfig;
use crate::mapping::{DynamicEntity, Entity, Field, ScalarType, Shared, shared};
use crate::model::*;
use crate::storage::ResultRow;
use crate::Result;

/// Column names of the trailing traversal.
pub const ENTITY_COLUMN: &str = "entity";
pub const REL_COLUMN: &str = "rel";
pub const VALUE_COLUMN: &str = "value";

// ============================================================================
// Tuples
// ============================================================================

/// One extracted row. `rel` and `value` are absent for an entity with no
/// outgoing relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    pub entity: Node,
    pub rel: Option<Relationship>,
    pub value: Option<Node>,
}

impl Tuple {
    pub fn from_row(row: &ResultRow) -> Result<Self> {
        Ok(Self {
            entity: row.get(ENTITY_COLUMN)?,
            rel: row.get_opt(REL_COLUMN)?,
            value: row.get_opt(VALUE_COLUMN)?,
        })
    }
}

// ============================================================================
// Property sets
// ============================================================================

/// What a relationship points at.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationTarget {
    /// A value node and its payload.
    Value {
        node: NodeId,
        value: Value,
        type_tag: Option<String>,
    },
    /// Another entity node.
    Entity { node: Node },
}

/// One stored relationship of an entity, resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationResult {
    pub relationship: RelId,
    pub weight: Option<i64>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub target: RelationTarget,
}

impl RelationResult {
    fn resolve(rel: &Relationship, target: &Node, config: &MappingConfig) -> Self {
        let target = if target.has_label(&config.value_label) {
            let type_tag = target.get(&config.type_key).and_then(Value::as_str).map(str::to_string);
            let raw = target.get(&config.value_key).cloned().unwrap_or(Value::Null);
            RelationTarget::Value { node: target.id, value: tagged(raw, type_tag.as_deref()), type_tag }
        } else {
            RelationTarget::Entity { node: target.clone() }
        };
        Self {
            relationship: rel.id,
            weight: rel.weight(),
            start: rel.start(),
            end: rel.end(),
            target,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.target {
            RelationTarget::Value { value, .. } => Some(value),
            RelationTarget::Entity { .. } => None,
        }
    }

    pub fn entity_id(&self) -> Option<NodeId> {
        match &self.target {
            RelationTarget::Entity { node } => Some(node.id),
            RelationTarget::Value { .. } => None,
        }
    }

    pub fn target_id(&self) -> NodeId {
        match &self.target {
            RelationTarget::Value { node, .. } => *node,
            RelationTarget::Entity { node } => node.id,
        }
    }
}

/// Read a payload as the type its tag names. A payload that already has
/// that type, carries no known tag, or cannot be converted is kept as is
/// and left for the field conversion to reject.
fn tagged(raw: Value, tag: Option<&str>) -> Value {
    match tag.and_then(ScalarType::from_tag) {
        Some(ty) if ScalarType::of(&raw) != Some(ty) => ty.coerce(&raw).unwrap_or(raw),
        _ => raw,
    }
}

/// Stored view of one entity: relation name → relations in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySet {
    pub node: Node,
    pub properties: Vec<(String, Vec<RelationResult>)>,
}

impl PropertySet {
    pub fn new(node: Node) -> Self {
        Self { node, properties: Vec::new() }
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Relations stored under `name`; empty when there are none.
    pub fn relations(&self, name: &str) -> &[RelationResult] {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r.as_slice())
            .unwrap_or(&[])
    }

    pub fn relation_count(&self) -> usize {
        self.properties.iter().map(|(_, r)| r.len()).sum()
    }

    fn push(&mut self, name: &str, relation: RelationResult) {
        match self.properties.iter_mut().find(|(n, _)| n == name) {
            Some((_, relations)) => {
                if !relations.iter().any(|r| r.relationship == relation.relationship) {
                    relations.push(relation);
                }
            }
            None => self.properties.push((name.to_string(), vec![relation])),
        }
    }
}

/// Group rows by entity identity, keeping first-seen order for entities
/// and arrival order for each entity's relations.
pub fn group(rows: &[ResultRow], config: &MappingConfig) -> Result<Vec<PropertySet>> {
    let mut sets: Vec<PropertySet> = Vec::new();
    let mut index: HashMap<NodeId, usize> = HashMap::new();

    for row in rows {
        let tuple = Tuple::from_row(row)?;
        let slot = *index.entry(tuple.entity.id).or_insert_with(|| {
            sets.push(PropertySet::new(tuple.entity.clone()));
            sets.len() - 1
        });
        if let (Some(rel), Some(target)) = (&tuple.rel, &tuple.value) {
            sets[slot].push(&rel.rel_type, RelationResult::resolve(rel, target, config));
        }
    }

    Ok(sets)
}

// ============================================================================
// Materialization
// ============================================================================

/// Build a dynamic entity. Value targets become scalars; entity targets
/// become identity-only references. A relationship weight is kept as a
/// [`Field::Weighted`].
pub fn dynamic(set: &PropertySet) -> Shared<DynamicEntity> {
    let mut entity = DynamicEntity::identified(set.id(), set.node.labels.first().cloned());
    for (name, relations) in &set.properties {
        for relation in relations {
            let field = match &relation.target {
                RelationTarget::Value { value, .. } => Field::Scalar(value.clone()),
                RelationTarget::Entity { node } => Field::EntityRef(shared(DynamicEntity::identified(
                    node.id,
                    node.labels.first().cloned(),
                ))),
            };
            let field = match relation.weight {
                Some(weight) => Field::weighted(field, weight),
                None => field,
            };
            entity.accumulate(name, field);
        }
    }
    shared(entity)
}

/// Build a typed entity. Relation names without a matching property are
/// ignored.
pub fn typed<T: Entity>(set: &PropertySet) -> Result<T> {
    let mut entity = T::default();
    *entity.entity_node_mut() = EntityNode {
        id: Some(set.id()),
        label: set.node.labels.first().cloned(),
    };
    for property in T::shape().properties() {
        property.write(&mut entity, set.relations(property.relation()))?;
    }
    Ok(entity)
}
