//! Runtime classification of dynamic fields.
//!
//! Typed shapes classify their properties once, at registration. Dynamic
//! fields are classified here, on every write: a scalar, a homogeneous
//! collection, or a single entity reference. Anything else is a mapping
//! error naming the property.

use std::sync::Arc;

use crate::model::Value;
use crate::{Error, Result};
use super::dynamic::Field;
use super::mapped::{Edge, Mapped, PropertyValue, Target};
use super::scalar::ScalarType;

/// Shape of one dynamic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Scalar(ScalarType),
    Collection(ElementKind),
    Reference,
    /// NULL scalar or empty collection.
    Absent,
}

/// Element type of a homogeneous collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Scalar(ScalarType),
    Entity,
}

/// Classify `field`, failing on heterogeneous or nested collections and
/// on values that cannot be stored in a value node.
pub fn classify(name: &str, field: &Field) -> Result<Classification> {
    match field {
        Field::Scalar(Value::Null) => Ok(Classification::Absent),
        Field::Scalar(value) => scalar_type(name, value).map(Classification::Scalar),
        Field::EntityRef(_) => Ok(Classification::Reference),
        Field::Weighted(inner, _) => match inner.as_ref() {
            Field::Scalar(_) | Field::EntityRef(_) => classify(name, inner),
            _ => Err(mapping(name, "a weight applies to a single value or reference".into())),
        },
        Field::Collection(items) => {
            let Some(first) = items.first() else {
                return Ok(Classification::Absent);
            };
            let kind = element_kind(name, first)?;
            for item in &items[1..] {
                let other = element_kind(name, item)?;
                if other != kind {
                    return Err(mapping(name, format!(
                        "heterogeneous collection: {kind:?} and {other:?}"
                    )));
                }
            }
            Ok(Classification::Collection(kind))
        }
    }
}

/// Convert a dynamic field into the value the persistence engine walks.
pub fn property_value(name: &str, field: &Field) -> Result<PropertyValue> {
    let classification = classify(name, field)?;
    if classification != Classification::Absent && carries_weight(field) {
        let items = match field {
            Field::Collection(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        return Ok(PropertyValue::Weighted(items.iter().filter_map(edge).collect()));
    }
    Ok(match (classification, field) {
        (Classification::Absent, _) => PropertyValue::Absent,
        (Classification::Scalar(_), Field::Scalar(value)) => PropertyValue::Scalar(value.clone()),
        (Classification::Reference, Field::EntityRef(entity)) => {
            PropertyValue::Entity(Arc::clone(entity) as Arc<dyn Mapped>)
        }
        (Classification::Collection(ElementKind::Scalar(_)), Field::Collection(items)) => {
            PropertyValue::Scalars(items.iter().filter_map(|f| f.as_scalar().cloned()).collect())
        }
        (Classification::Collection(ElementKind::Entity), Field::Collection(items)) => {
            PropertyValue::Entities(
                items
                    .iter()
                    .filter_map(|f| f.as_entity().map(|e| Arc::clone(e) as Arc<dyn Mapped>))
                    .collect(),
            )
        }
        (classification, _) => {
            return Err(mapping(name, format!("inconsistent classification {classification:?}")));
        }
    })
}

fn element_kind(name: &str, item: &Field) -> Result<ElementKind> {
    match item {
        Field::Scalar(value) => scalar_type(name, value).map(ElementKind::Scalar),
        Field::EntityRef(_) => Ok(ElementKind::Entity),
        Field::Collection(_) => Err(mapping(name, "nested collections are not mappable".into())),
        Field::Weighted(inner, _) => match inner.as_ref() {
            Field::Scalar(_) | Field::EntityRef(_) => element_kind(name, inner),
            _ => Err(mapping(name, "a weight applies to a single value or reference".into())),
        },
    }
}

fn carries_weight(field: &Field) -> bool {
    match field {
        Field::Weighted(..) => true,
        Field::Collection(items) => items.iter().any(|item| item.weight().is_some()),
        _ => false,
    }
}

fn edge(item: &Field) -> Option<Edge> {
    let target = match item.unweighted() {
        Field::Scalar(Value::Null) => return None,
        Field::Scalar(value) => Target::Value(value.clone()),
        Field::EntityRef(entity) => Target::Entity(Arc::clone(entity) as Arc<dyn Mapped>),
        _ => return None,
    };
    Some(Edge::new(target, item.weight()))
}

fn scalar_type(name: &str, value: &Value) -> Result<ScalarType> {
    ScalarType::of(value)
        .ok_or_else(|| mapping(name, format!("{} is not a storable scalar", value.type_name())))
}

fn mapping(name: &str, message: String) -> Error {
    Error::Mapping { property: name.to_string(), message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DynamicEntity;

    #[test]
    fn test_classify_shapes() {
        assert_eq!(classify("Name", &Field::scalar("Ada")).unwrap(), Classification::Scalar(ScalarType::String));
        assert_eq!(classify("Name", &Field::Scalar(Value::Null)).unwrap(), Classification::Absent);
        assert_eq!(classify("Partner", &Field::entity(DynamicEntity::new())).unwrap(), Classification::Reference);
        assert_eq!(
            classify("Tags", &Field::Collection(vec![Field::scalar("a"), Field::scalar("b")])).unwrap(),
            Classification::Collection(ElementKind::Scalar(ScalarType::String))
        );
        assert_eq!(classify("Tags", &Field::Collection(vec![])).unwrap(), Classification::Absent);
    }

    #[test]
    fn test_heterogeneous_collection_names_property() {
        let field = Field::Collection(vec![Field::scalar("a"), Field::entity(DynamicEntity::new())]);
        match classify("Mixed", &field) {
            Err(Error::Mapping { property, .. }) => assert_eq!(property, "Mixed"),
            other => panic!("expected mapping error, got {other:?}"),
        }

        let numbers = Field::Collection(vec![Field::scalar(1i64), Field::scalar("one")]);
        assert!(classify("Numbers", &numbers).is_err());
    }

    #[test]
    fn test_unstorable_scalar() {
        assert!(classify("Blob", &Field::Scalar(Value::Bytes(vec![1, 2]))).is_err());
        assert!(property_value("Map", &Field::Scalar(Value::List(vec![]))).is_err());
    }

    #[test]
    fn test_weighted_fields() {
        let single = Field::weighted(Field::scalar("gold"), 3);
        assert_eq!(classify("Rank", &single).unwrap(), Classification::Scalar(ScalarType::String));

        let mixed = Field::Collection(vec![single.clone(), Field::scalar("silver")]);
        let edges = property_value("Rank", &mixed).unwrap().into_edges();
        let weights: Vec<_> = edges.iter().map(|e| e.weight).collect();
        assert_eq!(weights, vec![Some(3), None]);
        assert_eq!(edges[1].target.as_value(), Some(&Value::from("silver")));

        let bad = Field::weighted(Field::Collection(vec![Field::scalar("a")]), 1);
        assert!(classify("Rank", &bad).is_err());
    }
}
