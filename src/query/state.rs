//! Translator state.
//!
//! `QueryState` holds everything a query accumulates: match clauses,
//! parameters, and the clause counter. Its text is a pure function of the
//! calls made on it, so the same call sequence always renders the same
//! pattern.

use std::sync::Arc;

use crate::config::MappingConfig;
use crate::cypher::*;
use crate::hydrate::{ENTITY_COLUMN, REL_COLUMN, VALUE_COLUMN};
use crate::model::{NodeId, PropertyMap, Value, WEIGHT_KEY};
use crate::{Error, Result};
use super::path::{Comparison, Operand, PropertyPath};

/// Parameter used by identity lookups.
pub const ID_PARAM: &str = "pId";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    config: Arc<MappingConfig>,
    clauses: Vec<Clause>,
    params: PropertyMap,
    counter: u32,
    ordered_by_weight: bool,
}

impl QueryState {
    pub fn new(config: Arc<MappingConfig>) -> Self {
        Self {
            config,
            clauses: Vec::new(),
            params: PropertyMap::new(),
            counter: 0,
            ordered_by_weight: false,
        }
    }

    /// Clauses added so far. Never decreases, not even on `by_id`.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn parameters(&self) -> &PropertyMap {
        &self.params
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    fn next_clause(&mut self) -> u32 {
        let c = self.counter;
        self.counter += 1;
        c
    }

    /// Add `entity.<path> <cmp> operand`.
    ///
    /// Each segment walks one relationship to a fresh node `n{c}_{d}`
    /// through `r{c}_{d}`; the operand is bound to `p{c}`.
    pub fn filter(&mut self, path: &PropertyPath, cmp: Comparison, operand: Operand) -> Result<()> {
        let Some(last) = path.segments().last() else {
            return Err(invalid(path, "empty property path"));
        };
        let (op, param) = match (&operand, cmp) {
            (Operand::Entity(_), Comparison::Eq) => (CompareOp::Eq, operand_value(&operand)),
            (Operand::Entity(_), _) => {
                return Err(invalid(path, &format!("{cmp:?} cannot compare entity references")));
            }
            (Operand::Scalar(value), c) if c.is_pattern() => {
                let Some(text) = value.as_str() else {
                    return Err(invalid(path, &format!("{cmp:?} needs a string operand")));
                };
                let escaped = regex::escape(text);
                let pattern = match c {
                    Comparison::Contains => format!(".*{escaped}.*"),
                    Comparison::StartsWith => format!("{escaped}.*"),
                    _ => format!(".*{escaped}"),
                };
                (CompareOp::Regex, Value::String(pattern))
            }
            (Operand::Scalar(value), c) => (scalar_op(c), value.clone()),
        };

        let c = self.next_clause();
        let depth = path.depth();
        let terminal_is_entity = matches!(operand, Operand::Entity(_));
        let mut pattern = PathPattern::node(self.root());
        for (i, segment) in path.segments().iter().enumerate() {
            let d = i + 1;
            let label = if d == depth && !terminal_is_entity {
                &self.config.value_label
            } else {
                &self.config.entity_label
            };
            pattern = pattern.hop(
                RelPattern::new().alias(format!("r{c}_{d}")).rel_type(segment.as_str()),
                NodePattern::new(format!("n{c}_{d}")).label(label.as_str()),
            );
        }

        let terminal = format!("n{c}_{depth}");
        let left = if terminal_is_entity {
            Expr::id(terminal)
        } else {
            Expr::property(terminal, self.config.value_key.as_str())
        };
        let param_name = format!("p{c}");
        tracing::debug!(clause = c, relation = %last, "query.filter");

        self.clauses.push(Clause::Match {
            optional: false,
            path: pattern,
            predicate: Some(Predicate::compare(left, op, Expr::param(param_name.as_str()))),
        });
        self.params.insert(param_name, param);
        Ok(())
    }

    /// Keep entities that reach `path` through a final relationship weighing
    /// at least `weight`. An unweighted relationship passes.
    ///
    /// The walk is named like a filter's (`n{c}_{d}`, `r{c}_{d}`, `p{c}`);
    /// the terminal node may be a value or an entity.
    pub fn min_weight(&mut self, path: &PropertyPath, weight: i64) -> Result<()> {
        if path.is_empty() {
            return Err(invalid(path, "empty property path"));
        }
        let c = self.next_clause();
        let depth = path.depth();
        let mut pattern = PathPattern::node(self.root());
        for (i, segment) in path.segments().iter().enumerate() {
            let d = i + 1;
            let mut node = NodePattern::new(format!("n{c}_{d}"));
            if d < depth {
                node = node.label(self.config.entity_label.as_str());
            }
            pattern = pattern.hop(RelPattern::new().alias(format!("r{c}_{d}")).rel_type(segment.as_str()), node);
        }

        let rel_weight = Expr::property(format!("r{c}_{depth}"), WEIGHT_KEY);
        let param_name = format!("p{c}");
        self.clauses.push(Clause::Match {
            optional: false,
            path: pattern,
            predicate: Some(Predicate::Or(vec![
                Predicate::compare(rel_weight.clone(), CompareOp::Gte, Expr::param(param_name.as_str())),
                Predicate::IsNull(rel_weight),
            ])),
        });
        self.params.insert(param_name, Value::Int(weight));
        Ok(())
    }

    /// Entities with any value node whose payload contains `term`,
    /// case-insensitively.
    pub fn search(&mut self, term: &str) {
        let c = self.next_clause();
        let node = format!("n{c}_1");
        let param_name = format!("p{c}");
        self.clauses.push(Clause::Match {
            optional: false,
            path: PathPattern::node(self.root()).hop(
                RelPattern::new().alias(format!("r{c}_1")),
                NodePattern::new(node.as_str()).label(self.config.value_label.as_str()),
            ),
            predicate: Some(Predicate::compare(
                Expr::property(node, self.config.value_key.as_str()),
                CompareOp::Regex,
                Expr::param(param_name.as_str()),
            )),
        });
        self.params.insert(param_name, Value::String(format!("(?i).*{}.*", regex::escape(term))));
    }

    /// Replace everything accumulated so far with an identity lookup.
    pub fn by_id(&mut self, id: NodeId) {
        self.clauses.clear();
        self.params.clear();
        self.next_clause();
        self.clauses.push(Clause::Match {
            optional: false,
            path: PathPattern::node(self.root()),
            predicate: Some(Predicate::compare(Expr::id(ENTITY_COLUMN), CompareOp::Eq, Expr::param(ID_PARAM))),
        });
        self.params.insert(ID_PARAM.to_string(), Value::Int(id.0 as i64));
    }

    /// Order each entity's relations by descending `weight`.
    pub fn order_by_weight(&mut self) {
        self.ordered_by_weight = true;
    }

    fn root(&self) -> NodePattern {
        NodePattern::new(ENTITY_COLUMN).label(self.config.entity_label.as_str())
    }

    /// The full statement: accumulated clauses (or a match on every
    /// entity when there are none) plus the trailing relation traversal.
    pub fn statement(&self) -> Statement {
        let mut statement = Statement { clauses: self.clauses.clone(), params: self.params.clone() };
        if statement.clauses.is_empty() {
            statement.clauses.push(Clause::Match {
                optional: false,
                path: PathPattern::node(self.root()),
                predicate: None,
            });
        }

        let order_by = if self.ordered_by_weight {
            vec![OrderItem { expr: Expr::property(REL_COLUMN, WEIGHT_KEY), descending: true }]
        } else {
            Vec::new()
        };

        statement
            .clause(Clause::With { distinct: true, items: vec![ENTITY_COLUMN.to_string()] })
            .clause(Clause::Match {
                optional: true,
                path: PathPattern::node(NodePattern::new(ENTITY_COLUMN))
                    .hop(RelPattern::new().alias(REL_COLUMN), NodePattern::new(VALUE_COLUMN)),
                predicate: None,
            })
            .clause(Clause::Return {
                items: vec![
                    ReturnItem::var(ENTITY_COLUMN),
                    ReturnItem::var(REL_COLUMN),
                    ReturnItem::var(VALUE_COLUMN),
                ],
                order_by,
            })
    }

    pub fn text(&self) -> String {
        self.statement().text()
    }
}

fn scalar_op(cmp: Comparison) -> CompareOp {
    match cmp {
        Comparison::Eq => CompareOp::Eq,
        Comparison::Lt => CompareOp::Lt,
        Comparison::Lte => CompareOp::Lte,
        Comparison::Gt => CompareOp::Gt,
        Comparison::Gte => CompareOp::Gte,
        Comparison::Contains | Comparison::StartsWith | Comparison::EndsWith => CompareOp::Regex,
    }
}

fn operand_value(operand: &Operand) -> Value {
    match operand {
        Operand::Scalar(value) => value.clone(),
        Operand::Entity(id) => Value::Int(id.0 as i64),
    }
}

fn invalid(path: &PropertyPath, message: &str) -> Error {
    Error::Mapping { property: path.to_string(), message: message.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn state() -> QueryState {
        QueryState::new(Arc::new(MappingConfig::default()))
    }

    const TRAILER: &str =
        "WITH DISTINCT entity OPTIONAL MATCH (entity)-[rel]->(value) RETURN entity, rel, value";

    #[test]
    fn test_empty_query_matches_all_entities() {
        assert_eq!(state().text(), format!("MATCH (entity:Entity) {TRAILER}"));
    }

    #[test]
    fn test_chained_path_and_operators() {
        let mut s = state();
        s.filter(&"Child.Name".into(), Comparison::Eq, "Ada".into()).unwrap();
        s.filter(&"Age".into(), Comparison::Gt, 30i64.into()).unwrap();
        s.filter(&"Age".into(), Comparison::Gte, 31i64.into()).unwrap();

        assert_eq!(
            s.text(),
            format!(
                "MATCH (entity:Entity)-[r0_1:Child]->(n0_1:Entity)-[r0_2:Name]->(n0_2:Value) WHERE n0_2.name = $p0 \
                 MATCH (entity:Entity)-[r1_1:Age]->(n1_1:Value) WHERE n1_1.name > $p1 \
                 MATCH (entity:Entity)-[r2_1:Age]->(n2_1:Value) WHERE n2_1.name >= $p2 {TRAILER}"
            )
        );
        assert_eq!(s.parameters().get("p0"), Some(&Value::from("Ada")));
        assert_eq!(s.parameters().get("p1"), Some(&Value::Int(30)));
        assert_eq!(s.counter(), 3);
    }

    #[test]
    fn test_entity_operand_compares_identity() {
        let mut s = state();
        s.filter(&"Partner".into(), Comparison::Eq, Operand::Entity(NodeId(9))).unwrap();
        assert!(s.text().starts_with(
            "MATCH (entity:Entity)-[r0_1:Partner]->(n0_1:Entity) WHERE id(n0_1) = $p0"
        ));
        assert_eq!(s.parameters().get("p0"), Some(&Value::Int(9)));

        assert!(s.filter(&"Partner".into(), Comparison::Lt, Operand::Entity(NodeId(9))).is_err());
    }

    #[test]
    fn test_pattern_operators_escape_operand() {
        let mut s = state();
        s.filter(&"Name".into(), Comparison::Contains, "a.b".into()).unwrap();
        s.filter(&"Name".into(), Comparison::StartsWith, "Ad".into()).unwrap();
        s.filter(&"Name".into(), Comparison::EndsWith, "da".into()).unwrap();
        assert_eq!(s.parameters().get("p0"), Some(&Value::from(".*a\\.b.*")));
        assert_eq!(s.parameters().get("p1"), Some(&Value::from("Ad.*")));
        assert_eq!(s.parameters().get("p2"), Some(&Value::from(".*da")));
        assert!(s.text().contains("WHERE n0_1.name =~ $p0"));

        assert!(s.filter(&"Name".into(), Comparison::Contains, 3i64.into()).is_err());
        assert!(s.filter(&"".into(), Comparison::Eq, 3i64.into()).is_err());
    }

    #[test]
    fn test_by_id_resets_but_counter_continues() {
        let mut s = state();
        s.filter(&"Name".into(), Comparison::Eq, "Ada".into()).unwrap();
        s.by_id(NodeId(4));
        s.filter(&"Age".into(), Comparison::Lt, 40i64.into()).unwrap();

        assert_eq!(
            s.text(),
            format!(
                "MATCH (entity:Entity) WHERE id(entity) = $pId \
                 MATCH (entity:Entity)-[r2_1:Age]->(n2_1:Value) WHERE n2_1.name < $p2 {TRAILER}"
            )
        );
        assert!(s.parameters().get("p0").is_none());
        assert_eq!(s.parameters().get(ID_PARAM), Some(&Value::Int(4)));
    }

    #[test]
    fn test_search_and_weight_ordering() {
        let mut s = state();
        s.search("an+");
        s.order_by_weight();
        assert_eq!(
            s.text(),
            "MATCH (entity:Entity)-[r0_1]->(n0_1:Value) WHERE n0_1.name =~ $p0 \
             WITH DISTINCT entity OPTIONAL MATCH (entity)-[rel]->(value) \
             RETURN entity, rel, value ORDER BY rel.weight DESC"
        );
        assert_eq!(s.parameters().get("p0"), Some(&Value::from("(?i).*an\\+.*")));
    }

    #[test]
    fn test_min_weight_clause() {
        let mut s = state();
        s.filter(&"Name".into(), Comparison::Eq, "Ada".into()).unwrap();
        s.min_weight(&"Friends.Hobby".into(), 3).unwrap();
        assert_eq!(
            s.text(),
            format!(
                "MATCH (entity:Entity)-[r0_1:Name]->(n0_1:Value) WHERE n0_1.name = $p0 \
                 MATCH (entity:Entity)-[r1_1:Friends]->(n1_1:Entity)-[r1_2:Hobby]->(n1_2) \
                 WHERE (r1_2.weight >= $p1 OR r1_2.weight IS NULL) {TRAILER}"
            )
        );
        assert_eq!(s.parameters().get("p1"), Some(&Value::Int(3)));
        assert!(s.min_weight(&"".into(), 1).is_err());
    }

    proptest! {
        #[test]
        fn parameter_names_are_unique_and_reproducible(ops in proptest::collection::vec(0u8..4, 1..12)) {
            let build = || {
                let mut s = state();
                for (i, op) in ops.iter().enumerate() {
                    match op {
                        0 => s.filter(&"Name".into(), Comparison::Eq, Operand::from(i as i64)).unwrap(),
                        1 => s.filter(&"Child.Age".into(), Comparison::Lte, Operand::from(i as i64)).unwrap(),
                        2 => s.search("x"),
                        _ => s.by_id(NodeId(i as u64)),
                    }
                }
                s
            };
            let first = build();
            let second = build();
            prop_assert_eq!(first.text(), second.text());
            prop_assert_eq!(first.counter() as usize, ops.len());

            let last_reset = ops.iter().rposition(|op| *op == 3);
            let start = last_reset.map(|i| i + 1).unwrap_or(0);
            for c in start..ops.len() {
                let name = format!("p{c}");
                prop_assert!(first.parameters().contains_key(&name));
                let placeholder = format!("${name} ");
                prop_assert_eq!(first.text().matches(placeholder.as_str()).count(), 1);
            }
        }
    }
}
