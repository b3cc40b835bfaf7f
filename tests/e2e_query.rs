//! End-to-end tests for the query translator against `MemoryStore`.

mod common;

use common::{Person, date};
use graph_ogm::cypher::{Clause, CreatePattern, Expr, NodePattern, RelPattern, ReturnItem, Statement};
use graph_ogm::storage::MemorySession;
use graph_ogm::{
    Comparison, DynamicEntity, Field, GraphStore, MappingConfig, MemoryStore, Node, NodeId, Ogm,
    QueryBuilder, Session, Shared, TxMode, Value, shared,
};

struct People {
    ogm: Ogm<MemoryStore>,
    store: MemoryStore,
    alice: NodeId,
    bob: NodeId,
    charlie: NodeId,
}

/// Alice (25) and Bob (30) are partners with one child, Charlie (35).
async fn people() -> People {
    let store = MemoryStore::new();
    let ogm = Ogm::connect(store.clone(), MappingConfig::default()).await.unwrap();

    let alice = Person::new("Alice", 25);
    let bob = Person::new("Bob", 30);
    let charlie = Person::new("Charlie", 35);
    alice.write().partner = Some(bob.clone());
    bob.write().partner = Some(alice.clone());
    alice.write().children = vec![charlie.clone()];
    bob.write().children = vec![charlie.clone()];
    ogm.manager().create(&alice).await.unwrap();

    let id = |p: &Shared<Person>| p.read().node.id.unwrap();
    People { alice: id(&alice), bob: id(&bob), charlie: id(&charlie), ogm, store }
}

fn names(found: &[Shared<Person>]) -> Vec<String> {
    let mut names: Vec<String> = found.iter().map(|p| p.read().name.clone()).collect();
    names.sort();
    names
}

/// Sorted names of the people matched by `build`.
async fn names_where(
    ogm: &Ogm<MemoryStore>,
    build: impl FnOnce(QueryBuilder<MemorySession>) -> QueryBuilder<MemorySession>,
) -> Vec<String> {
    let query = build(ogm.query().await.unwrap());
    names(&query.execute_as::<Person>().await.unwrap())
}

// ============================================================================
// 1. Comparison operators
// ============================================================================

#[tokio::test]
async fn test_scalar_comparisons() {
    let p = people().await;
    let ogm = &p.ogm;

    assert_eq!(names_where(ogm, |q| q.eq("Name", "Alice")).await, vec!["Alice"]);
    assert_eq!(names_where(ogm, |q| q.gt("Age", 30i64)).await, vec!["Charlie"]);
    assert_eq!(names_where(ogm, |q| q.gte("Age", 30i64)).await, vec!["Bob", "Charlie"]);
    assert_eq!(names_where(ogm, |q| q.lt("Age", 30i64)).await, vec!["Alice"]);
    assert_eq!(names_where(ogm, |q| q.lte("Age", 30i64)).await, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn test_string_pattern_operators() {
    let p = people().await;
    let ogm = &p.ogm;

    assert_eq!(names_where(ogm, |q| q.contains("Name", "li")).await, vec!["Alice", "Charlie"]);
    assert_eq!(names_where(ogm, |q| q.starts_with("Name", "Bo")).await, vec!["Bob"]);
    assert_eq!(names_where(ogm, |q| q.ends_with("Name", "e")).await, vec!["Alice", "Charlie"]);
    // Pattern operators are case-sensitive and treat their operand literally
    assert!(names_where(ogm, |q| q.contains("Name", "LI")).await.is_empty());
    assert!(names_where(ogm, |q| q.contains("Name", ".*")).await.is_empty());
}

#[tokio::test]
async fn test_filters_are_conjunctive() {
    let p = people().await;
    let found = p.ogm.query().await.unwrap()
        .contains("Name", "li")
        .lt("Age", 30i64)
        .execute_as::<Person>()
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["Alice"]);
}

// ============================================================================
// 2. Paths and references
// ============================================================================

#[tokio::test]
async fn test_chained_path_filters_through_references() {
    let p = people().await;
    let parents = p.ogm.query().await.unwrap()
        .eq("Children.Name", "Charlie")
        .execute_as::<Person>()
        .await
        .unwrap();
    assert_eq!(names(&parents), vec!["Alice", "Bob"]);

    let older_partner = p.ogm.query().await.unwrap()
        .gt("Partner.Age", 28i64)
        .execute_as::<Person>()
        .await
        .unwrap();
    assert_eq!(names(&older_partner), vec!["Alice"]);
}

#[tokio::test]
async fn test_refers_to_matches_by_identity() {
    let p = people().await;
    let found = p.ogm.query().await.unwrap()
        .refers_to("Partner", p.bob)
        .execute_as::<Person>()
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].read().node.id, Some(p.alice));
}

#[tokio::test]
async fn test_entity_operand_rejects_ordering() {
    let p = people().await;
    let result = p.ogm.query().await.unwrap()
        .filter("Partner", Comparison::Gt, p.bob)
        .execute()
        .await;
    assert!(matches!(result, Err(graph_ogm::Error::Mapping { .. })));
    assert_eq!(p.store.open_sessions(), 0);
}

#[tokio::test]
async fn test_search_is_case_insensitive_over_all_values() {
    let p = people().await;
    let found = p.ogm.query().await.unwrap().search("ALI").execute_as::<Person>().await.unwrap();
    assert_eq!(names(&found), vec!["Alice"]);

    let none = p.ogm.query().await.unwrap().search("zed").execute().await.unwrap();
    assert!(none.is_empty());
}

// ============================================================================
// 3. Hydration
// ============================================================================

#[tokio::test]
async fn test_references_are_hydrated_one_hop_deep() {
    let p = people().await;
    let found = p.ogm.query().await.unwrap().by_id(p.alice).execute_as::<Person>().await.unwrap();
    let alice = found[0].read();

    assert_eq!(alice.name, "Alice");
    let partner = alice.partner.clone().unwrap();
    assert_eq!(partner.read().node.id, Some(p.bob));
    assert_eq!(partner.read().name, "");
    assert!(partner.read().partner.is_none());
    assert_eq!(alice.children.len(), 1);
    assert_eq!(alice.children[0].read().node.id, Some(p.charlie));

    assert!(p.ogm.manager().populate(&partner).await.unwrap());
    assert_eq!(partner.read().name, "Bob");
    assert_eq!(partner.read().partner.as_ref().and_then(|a| a.read().node.id), Some(p.alice));
}

#[tokio::test]
async fn test_dynamic_results_preserve_field_shapes() {
    let p = people().await;
    let found = p.ogm.query().await.unwrap().by_id(p.bob).execute().await.unwrap();
    let bob = found[0].read();

    assert_eq!(bob.get("Name"), Some(&Field::scalar("Bob")));
    assert_eq!(bob.get("Age"), Some(&Field::scalar(30i64)));
    let child = bob.get("Children").and_then(Field::as_entity).unwrap();
    assert_eq!(child.read().id(), Some(p.charlie));
}

/// An entity whose value nodes were written by another client: the
/// payloads carry the right type tag but not the right runtime type.
async fn foreign_person(store: &MemoryStore) -> NodeId {
    let value = |alias: &str, payload: Value, tag: &str| {
        Clause::Create(CreatePattern::Node(
            NodePattern::new(alias)
                .label("Value")
                .property("name", Expr::Literal(payload))
                .property("type", Expr::Literal(Value::from(tag))),
        ))
    };
    let link = |relation: &str, dst: &str| {
        Clause::Create(CreatePattern::Relationship {
            src: "entity".into(),
            rel: RelPattern::new().rel_type(relation),
            dst: dst.into(),
        })
    };
    let statement = Statement::new()
        .clause(Clause::Create(CreatePattern::Node(NodePattern::new("entity").label("Entity"))))
        .clause(value("name", Value::from("Eve"), "string"))
        .clause(value("born", Value::from("1990-01-01"), "date"))
        .clause(value("age", Value::Float(42.0), "int"))
        .clause(link("Name", "name"))
        .clause(link("Date_Of_Birth", "born"))
        .clause(link("Age", "age"))
        .clause(Clause::Return { items: vec![ReturnItem::var("entity")], order_by: vec![] });

    let mut session = store.session(TxMode::ReadWrite).await.unwrap();
    let rows = session.run_query(&statement).await.unwrap();
    rows[0].get::<Node>("entity").unwrap().id
}

#[tokio::test]
async fn test_payloads_are_read_by_type_tag() {
    let store = MemoryStore::new();
    let ogm = Ogm::connect(store.clone(), MappingConfig::default()).await.unwrap();
    let id = foreign_person(&store).await;

    let eve = ogm.manager().load::<Person>(id).await.unwrap().unwrap();
    assert_eq!(eve.read().name, "Eve");
    assert_eq!(eve.read().born, Some(date(1990, 1, 1)));
    assert_eq!(eve.read().age, 42);

    let dynamic = ogm.manager().load_dynamic(id).await.unwrap().unwrap();
    assert_eq!(dynamic.read().get("Date_Of_Birth"), Some(&Field::scalar(date(1990, 1, 1))));
    assert_eq!(dynamic.read().get("Age"), Some(&Field::scalar(42i64)));
}

#[tokio::test]
async fn test_by_id_of_missing_entity_is_empty() {
    let p = people().await;
    let found = p.ogm.query().await.unwrap().by_id(NodeId(9_999)).execute().await.unwrap();
    assert!(found.is_empty());
}

// ============================================================================
// 4. Ordering by weight
// ============================================================================

/// One entity with two weighted `Tags` relations, created in the order
/// light then heavy.
async fn weighted_entity(ogm: &Ogm<MemoryStore>) -> NodeId {
    let entity = shared(DynamicEntity::new().with(
        "Tags",
        Field::Collection(vec![
            Field::weighted(Field::scalar("light"), 1),
            Field::weighted(Field::scalar("heavy"), 5),
        ]),
    ));
    ogm.manager().create(&entity).await.unwrap()
}

#[tokio::test]
async fn test_relations_ordered_by_weight() {
    let ogm = Ogm::open_memory().await.unwrap();
    let id = weighted_entity(&ogm).await;

    let tags = |entity: &Shared<DynamicEntity>| entity.read().get("Tags").cloned();
    let light = Field::weighted(Field::scalar("light"), 1);
    let heavy = Field::weighted(Field::scalar("heavy"), 5);

    let unordered = ogm.query().await.unwrap().by_id(id).execute().await.unwrap();
    assert_eq!(tags(&unordered[0]), Some(Field::Collection(vec![light.clone(), heavy.clone()])));

    let ordered = ogm.query().await.unwrap().by_id(id).ordered_by_weight().execute().await.unwrap();
    assert_eq!(tags(&ordered[0]), Some(Field::Collection(vec![heavy, light])));

    let sets = ogm.query().await.unwrap().by_id(id).ordered_by_weight().property_sets().await.unwrap();
    let weights: Vec<_> = sets[0].relations("Tags").iter().map(|r| r.weight).collect();
    assert_eq!(weights, vec![Some(5), Some(1)]);
}

#[tokio::test]
async fn test_min_weight_on_dynamic_entities() {
    let ogm = Ogm::open_memory().await.unwrap();
    let id = weighted_entity(&ogm).await;
    ogm.manager()
        .create(&shared(DynamicEntity::new().with("Tags", Field::weighted(Field::scalar("light"), 1))))
        .await
        .unwrap();

    let heavy = ogm.query().await.unwrap().min_weight("Tags", 3).execute().await.unwrap();
    assert_eq!(heavy.len(), 1);
    assert_eq!(heavy[0].read().id(), Some(id));
}

// ============================================================================
// 5. Pattern text
// ============================================================================

#[tokio::test]
async fn test_text_and_parameters_before_execution() {
    let ogm = Ogm::open_memory().await.unwrap();
    let builder = ogm.query().await.unwrap().eq("Date Of Birth", "1990-01-01").contains("Name", "a.b");

    assert_eq!(
        builder.text(),
        "MATCH (entity:Entity)-[r0_1:Date_Of_Birth]->(n0_1:Value) WHERE n0_1.name = $p0 \
         MATCH (entity:Entity)-[r1_1:Name]->(n1_1:Value) WHERE n1_1.name =~ $p1 \
         WITH DISTINCT entity OPTIONAL MATCH (entity)-[rel]->(value) RETURN entity, rel, value"
    );
    assert_eq!(builder.parameters().get("p0"), Some(&Value::from("1990-01-01")));
    assert_eq!(builder.parameters().get("p1"), Some(&Value::from(r".*a\.b.*")));
    builder.dispose();
}
