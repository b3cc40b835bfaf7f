//! Write statements issued by the persistence engine.

use crate::config::MappingConfig;
use crate::cypher::*;
use crate::mapping::ScalarType;
use crate::model::{NodeId, RelId, Value, WEIGHT_KEY};

pub(crate) const ENTITY: &str = "entity";
pub(crate) const TARGET: &str = "target";
pub(crate) const REL: &str = "rel";
pub(crate) const VALUE: &str = "value";

fn id_param(id: NodeId) -> Value {
    Value::Int(id.0 as i64)
}

fn match_by_id(alias: &str, label: Option<&str>, param: &str) -> Clause {
    let mut node = NodePattern::new(alias);
    if let Some(label) = label {
        node = node.label(label);
    }
    Clause::Match {
        optional: false,
        path: PathPattern::node(node),
        predicate: Some(Predicate::compare(Expr::id(alias), CompareOp::Eq, Expr::param(param))),
    }
}

/// `CREATE (entity:Entity {createdDate: $pCreated}) RETURN entity`
pub(crate) fn create_entity(config: &MappingConfig, created_ms: Option<i64>) -> Statement {
    let mut node = NodePattern::new(ENTITY).label(config.entity_label.as_str());
    let mut statement = Statement::new();
    if let (Some(key), Some(ms)) = (&config.created_key, created_ms) {
        node = node.property(key.as_str(), Expr::param("pCreated"));
        statement = statement.param("pCreated", ms);
    }
    statement
        .clause(Clause::Create(CreatePattern::Node(node)))
        .clause(Clause::Return { items: vec![ReturnItem::var(ENTITY)], order_by: vec![] })
}

/// `MERGE (value:Value {name: $pValue}) ON CREATE SET value.type = $pType RETURN value`
pub(crate) fn merge_value(config: &MappingConfig, value: &Value) -> Statement {
    let mut on_create = Vec::new();
    let mut statement = Statement::new().param("pValue", value.clone());
    if let Some(ty) = ScalarType::of(value) {
        on_create.push((config.type_key.clone(), Expr::param("pType")));
        statement = statement.param("pType", ty.tag());
    }
    statement
        .clause(Clause::Merge {
            node: NodePattern::new(VALUE)
                .label(config.value_label.as_str())
                .property(config.value_key.as_str(), Expr::param("pValue")),
            on_create,
        })
        .clause(Clause::Return { items: vec![ReturnItem::var(VALUE)], order_by: vec![] })
}

/// `MATCH (entity) WHERE id(entity) = $pSource MATCH (target) WHERE id(target) = $pTarget
///  CREATE (entity)-[rel:Relation {weight: $pWeight}]->(target) RETURN rel`
pub(crate) fn create_relationship(source: NodeId, relation: &str, target: NodeId, weight: Option<i64>) -> Statement {
    let mut rel = RelPattern::new().alias(REL).rel_type(relation);
    let mut statement = Statement::new()
        .param("pSource", id_param(source))
        .param("pTarget", id_param(target));
    if let Some(weight) = weight {
        rel = rel.property(WEIGHT_KEY, Expr::param("pWeight"));
        statement = statement.param("pWeight", weight);
    }
    statement
        .clause(match_by_id(ENTITY, None, "pSource"))
        .clause(match_by_id(TARGET, None, "pTarget"))
        .clause(Clause::Create(CreatePattern::Relationship { src: ENTITY.into(), rel, dst: TARGET.into() }))
        .clause(Clause::Return { items: vec![ReturnItem::var(REL)], order_by: vec![] })
}

/// `MATCH (entity)-[rel]->(target) WHERE id(entity) = $pSource AND id(rel) = $pRel`
fn match_relationship(source: NodeId, relationship: RelId) -> Statement {
    Statement::new()
        .param("pSource", id_param(source))
        .param("pRel", Value::Int(relationship.0 as i64))
        .clause(Clause::Match {
            optional: false,
            path: PathPattern::node(NodePattern::new(ENTITY))
                .hop(RelPattern::new().alias(REL), NodePattern::new(TARGET)),
            predicate: Some(Predicate::And(vec![
                Predicate::compare(Expr::id(ENTITY), CompareOp::Eq, Expr::param("pSource")),
                Predicate::compare(Expr::id(REL), CompareOp::Eq, Expr::param("pRel")),
            ])),
        })
}

/// Delete one relationship of `source` by relationship id, leaving other
/// relationships of the same type alone.
pub(crate) fn delete_relationship(source: NodeId, relationship: RelId) -> Statement {
    match_relationship(source, relationship).clause(Clause::Delete { aliases: vec![REL.into()], detach: false })
}

/// Overwrite the weight of one relationship of `source`.
pub(crate) fn set_relationship_weight(source: NodeId, relationship: RelId, weight: i64) -> Statement {
    match_relationship(source, relationship)
        .param("pWeight", weight)
        .clause(Clause::Set { items: vec![SetItem::new(REL, WEIGHT_KEY, Expr::param("pWeight"))] })
}

/// `MATCH (entity:Entity) WHERE id(entity) = $pId DETACH DELETE entity`
pub(crate) fn delete_entity(config: &MappingConfig, id: NodeId) -> Statement {
    Statement::new()
        .param("pId", id_param(id))
        .clause(match_by_id(ENTITY, Some(config.entity_label.as_str()), "pId"))
        .clause(Clause::Delete { aliases: vec![ENTITY.into()], detach: true })
}

/// Uniqueness constraint backing value-node deduplication.
pub(crate) fn value_constraint(config: &MappingConfig) -> Statement {
    Statement::new().clause(Clause::CreateConstraint {
        label: config.value_label.clone(),
        property: config.value_key.clone(),
    })
}
