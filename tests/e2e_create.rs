//! End-to-end tests for creating entities.
//!
//! Each test persists an object graph through `EntityManager::create` and
//! inspects the resulting nodes and relationships in `MemoryStore`.

mod common;

use common::{Person, date};
use graph_ogm::{
    DynamicEntity, Field, MappingConfig, MemoryStore, Ogm, Value, shared,
};

async fn ogm() -> (Ogm<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    let ogm = Ogm::connect(store.clone(), MappingConfig::default()).await.unwrap();
    (ogm, store)
}

// ============================================================================
// 1. Round-trip of scalar properties
// ============================================================================

#[tokio::test]
async fn test_scalar_round_trip() {
    let (ogm, _store) = ogm().await;

    let kevin = Person::new("Kevin", 41);
    kevin.write().nicknames = vec!["Kev".into(), "K".into()];
    kevin.write().born = Some(date(1983, 4, 2));

    let id = ogm.manager().create(&kevin).await.unwrap();
    assert_eq!(kevin.read().node.id, Some(id));
    assert_eq!(kevin.read().node.label.as_deref(), Some("Entity"));

    let found = ogm.query().await.unwrap().by_id(id).execute_as::<Person>().await.unwrap();
    assert_eq!(found.len(), 1);

    let loaded = found[0].read();
    assert_eq!(loaded.node.id, Some(id));
    assert_eq!(loaded.name, "Kevin");
    assert_eq!(loaded.age, 41);
    assert_eq!(loaded.nicknames, vec!["Kev".to_string(), "K".to_string()]);
    assert_eq!(loaded.born, Some(date(1983, 4, 2)));
    assert!(loaded.partner.is_none());
}

#[tokio::test]
async fn test_entity_nodes_carry_created_timestamp() {
    let (ogm, store) = ogm().await;
    let id = ogm.manager().create(&Person::new("Ada", 36)).await.unwrap();

    let node = store.node(id).unwrap();
    assert!(node.has_label("Entity"));
    assert!(matches!(node.get("createdDate"), Some(Value::Int(ms)) if *ms > 0));
}

// ============================================================================
// 2. Value-node deduplication
// ============================================================================

#[tokio::test]
async fn test_shared_scalar_uses_one_value_node() {
    let (ogm, store) = ogm().await;
    let manager = ogm.manager();

    let a = shared(DynamicEntity::new().with("Color", Value::from("blue")).with("Name", Value::from("a")));
    let b = shared(DynamicEntity::new().with("Color", Value::from("blue")).with("Name", Value::from("b")));
    manager.create(&a).await.unwrap();
    manager.create(&b).await.unwrap();

    let blue = store.nodes_by_property("Value", "name", &Value::from("blue"));
    assert_eq!(blue.len(), 1);
    assert_eq!(blue[0].get("type"), Some(&Value::from("string")));
    assert_eq!(store.relationships_by_type("Color").len(), 2);
    assert!(store.relationships_by_type("Color").iter().all(|r| r.dst == blue[0].id));
}

#[tokio::test]
async fn test_same_value_within_one_entity_is_merged_once() {
    let (ogm, store) = ogm().await;
    let entity = shared(
        DynamicEntity::new()
            .with("First", Value::from("x"))
            .with("Second", Value::from("x")),
    );
    let (_, stats) = ogm.manager().create_with_stats(&entity).await.unwrap();

    assert_eq!(stats.value_nodes_merged, 1);
    assert_eq!(stats.relationships_created, 2);
    assert_eq!(store.nodes_with_label("Value").len(), 1);
}

#[tokio::test]
async fn test_equal_text_of_different_types_stays_distinct() {
    let (ogm, store) = ogm().await;
    let entity = shared(
        DynamicEntity::new()
            .with("Text", Value::from("1"))
            .with("Number", Value::Int(1)),
    );
    ogm.manager().create(&entity).await.unwrap();
    assert_eq!(store.nodes_with_label("Value").len(), 2);
}

// ============================================================================
// 3. Collections
// ============================================================================

#[tokio::test]
async fn test_two_element_collection_round_trips_in_order() {
    let (ogm, _store) = ogm().await;
    let entity = shared(DynamicEntity::new().with(
        "Tags",
        Field::Collection(vec![Field::scalar("x"), Field::scalar("y")]),
    ));
    let id = ogm.manager().create(&entity).await.unwrap();

    let found = ogm.query().await.unwrap().by_id(id).execute().await.unwrap();
    let tags = found[0].read().get("Tags").cloned();
    assert_eq!(tags, Some(Field::Collection(vec![Field::scalar("x"), Field::scalar("y")])));
}

#[tokio::test]
async fn test_heterogeneous_collection_fails_before_writing() {
    let (ogm, store) = ogm().await;
    let entity = shared(DynamicEntity::new().with(
        "Mixed",
        Field::Collection(vec![Field::scalar("x"), Field::entity(DynamicEntity::new())]),
    ));

    let err = ogm.manager().create(&entity).await.unwrap_err();
    assert!(matches!(err, graph_ogm::Error::Mapping { ref property, .. } if property == "Mixed"));
    assert_eq!(store.node_count(), 0);
    assert_eq!(entity.read().id(), None);
}

// ============================================================================
// 4. Cycles and shared references
// ============================================================================

#[tokio::test]
async fn test_mutual_partners_persist_without_looping() {
    let (ogm, store) = ogm().await;

    let kevin = Person::new("Kevin", 41);
    let claire = Person::new("Claire", 39);
    kevin.write().partner = Some(claire.clone());
    claire.write().partner = Some(kevin.clone());

    let kevin_id = ogm.manager().create(&kevin).await.unwrap();
    let claire_id = claire.read().node.id.unwrap();
    assert_ne!(kevin_id, claire_id);

    // Both sides resolve to the other's identity
    let partner_of_kevin = kevin.read().partner.clone().unwrap();
    assert_eq!(partner_of_kevin.read().node.id, Some(claire_id));
    let partner_of_claire = claire.read().partner.clone().unwrap();
    assert_eq!(partner_of_claire.read().node.id, Some(kevin_id));

    let partners = store.relationships_by_type("Partner");
    assert_eq!(partners.len(), 2);
    assert!(partners.iter().any(|r| r.src == kevin_id && r.dst == claire_id));
    assert!(partners.iter().any(|r| r.src == claire_id && r.dst == kevin_id));
}

#[tokio::test]
async fn test_family_with_shared_children() {
    let (ogm, store) = ogm().await;

    let kevin = Person::new("Kevin", 41);
    let claire = Person::new("Claire", 39);
    let lea = Person::new("Lea", 8);
    let tom = Person::new("Tom", 5);
    kevin.write().partner = Some(claire.clone());
    claire.write().partner = Some(kevin.clone());
    kevin.write().children = vec![lea.clone(), tom.clone()];
    claire.write().children = vec![lea.clone(), tom.clone()];

    let (_, stats) = ogm.manager().create_with_stats(&kevin).await.unwrap();

    assert_eq!(stats.entity_nodes_created, 4);
    assert_eq!(store.nodes_with_label("Entity").len(), 4);
    assert_eq!(store.relationships_by_type("Children").len(), 4);
    let lea_id = lea.read().node.id.unwrap();
    assert_eq!(
        store.relationships_by_type("Children").iter().filter(|r| r.dst == lea_id).count(),
        2
    );
}

#[tokio::test]
async fn test_already_persisted_reference_is_linked_not_recreated() {
    let (ogm, store) = ogm().await;
    let manager = ogm.manager();

    let claire = Person::new("Claire", 39);
    let claire_id = manager.create(&claire).await.unwrap();
    let nodes_before = store.node_count();

    let kevin = Person::new("Kevin", 41);
    kevin.write().partner = Some(claire.clone());
    let (kevin_id, stats) = manager.create_with_stats(&kevin).await.unwrap();

    assert_eq!(stats.entity_nodes_created, 1);
    assert_eq!(claire.read().node.id, Some(claire_id));
    let partners = store.relationships_from(kevin_id);
    assert!(partners.iter().any(|r| r.rel_type == "Partner" && r.dst == claire_id));
    // Kevin's entity node plus his new value nodes (Kevin, 41)
    assert_eq!(store.node_count(), nodes_before + 3);
}

#[tokio::test]
async fn test_create_is_not_idempotent_on_root() {
    let (ogm, _store) = ogm().await;
    let manager = ogm.manager();
    let ada = Person::new("Ada", 36);

    let first = manager.create(&ada).await.unwrap();
    let second = manager.create(&ada).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(ada.read().node.id, Some(second));
}

// ============================================================================
// 5. Relationship names
// ============================================================================

#[tokio::test]
async fn test_property_names_are_sanitized_into_relationship_types() {
    let (ogm, store) = ogm().await;
    let entity = shared(DynamicEntity::new().with("Date Of Birth°", Value::from("1990-01-01")));
    ogm.manager().create(&entity).await.unwrap();

    assert_eq!(store.relationships_by_type("Date_Of_Birth").len(), 1);

    let kevin = Person::new("Kevin", 41);
    kevin.write().born = Some(date(1983, 4, 2));
    ogm.manager().create(&kevin).await.unwrap();
    assert_eq!(store.relationships_by_type("Date_Of_Birth").len(), 2);
}

#[tokio::test]
async fn test_absent_properties_create_nothing() {
    let (ogm, store) = ogm().await;
    let (_, stats) = ogm.manager().create_with_stats(&shared(DynamicEntity::new())).await.unwrap();

    assert_eq!(stats.entity_nodes_created, 1);
    assert_eq!(stats.relationships_created, 0);
    assert_eq!(store.node_count(), 1);
    assert_eq!(store.open_sessions(), 0);

    let found = ogm.query().await.unwrap().execute().await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].read().is_empty());
}
