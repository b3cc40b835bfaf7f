//! Typed shape descriptors.
//!
//! A shape lists each mapped property of a Rust type once: its name, its
//! classification, and plain accessor functions. It is built on first use
//! and cached in a `OnceLock` by the implementing type:
//!
//! ```rust
//! use std::sync::OnceLock;
//! use graph_ogm::{Entity, EntityNode, Shape, Shared};
//!
//! #[derive(Default)]
//! struct Person {
//!     node: EntityNode,
//!     name: String,
//!     nicknames: Vec<String>,
//!     partner: Option<Shared<Person>>,
//! }
//!
//! impl Entity for Person {
//!     fn shape() -> &'static Shape<Self> {
//!         static SHAPE: OnceLock<Shape<Person>> = OnceLock::new();
//!         SHAPE.get_or_init(|| {
//!             Shape::<Person>::builder("Person")
//!                 .scalar("Name", |p| &p.name, |p| &mut p.name)
//!                 .scalars("Nicknames", |p| &p.nicknames, |p| &mut p.nicknames)
//!                 .reference("Partner", |p| &p.partner, |p| &mut p.partner)
//!                 .build()
//!         })
//!     }
//!
//!     fn entity_node(&self) -> &EntityNode { &self.node }
//!     fn entity_node_mut(&mut self) -> &mut EntityNode { &mut self.node }
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::hydrate::{RelationResult, RelationTarget};
use crate::model::EntityNode;
use crate::{Error, Result};
use super::mapped::{Edge, Mapped, PropertyValue, Target};
use super::scalar::{ScalarField, ScalarType};
use super::{sanitize, Shared};

/// A Rust type persisted as an entity node.
pub trait Entity: Default + Send + Sync + 'static {
    fn shape() -> &'static Shape<Self>;

    fn entity_node(&self) -> &EntityNode;

    fn entity_node_mut(&mut self) -> &mut EntityNode;
}

/// Classification of one declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    ScalarList(ScalarType),
    /// Single entity reference; carries the target's Rust type name.
    Reference(&'static str),
    ReferenceList(&'static str),
}

impl PropertyKind {
    pub fn is_collection(self) -> bool {
        matches!(self, PropertyKind::ScalarList(_) | PropertyKind::ReferenceList(_))
    }
}

/// A collection item together with the weight of the relationship that
/// stores it. `weight: None` writes no weight and leaves a stored one
/// unchanged on update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Weighted<V> {
    pub value: V,
    pub weight: Option<i64>,
}

impl<V> Weighted<V> {
    pub fn new(value: V, weight: i64) -> Self {
        Self { value, weight: Some(weight) }
    }

    pub fn unweighted(value: V) -> Self {
        Self { value, weight: None }
    }
}

/// The descriptor of a shape: its name and ordered properties.
pub struct Shape<T> {
    name: &'static str,
    properties: Vec<Property<T>>,
}

impl<T: Entity> Shape<T> {
    pub fn builder(name: &'static str) -> ShapeBuilder<T> {
        ShapeBuilder { name, properties: Vec::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn properties(&self) -> &[Property<T>] {
        &self.properties
    }

    /// Look up a property by declared or relation name.
    pub fn property(&self, name: &str) -> Option<&Property<T>> {
        let relation = sanitize(name);
        self.properties.iter().find(|p| p.relation == relation)
    }
}

/// One mapped property of `T`.
pub struct Property<T> {
    name: &'static str,
    relation: String,
    kind: PropertyKind,
    access: Box<dyn Accessor<T>>,
}

impl<T> Property<T> {
    /// Name as declared.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sanitized relationship type this property is stored under.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn read(&self, owner: &T) -> PropertyValue {
        self.access.read(owner)
    }

    /// Assign the property from its stored relations.
    pub fn write(&self, owner: &mut T, relations: &[RelationResult]) -> Result<()> {
        self.access.write(owner, relations).map_err(|message| Error::Mapping {
            property: self.name.to_string(),
            message,
        })
    }
}

pub struct ShapeBuilder<T> {
    name: &'static str,
    properties: Vec<Property<T>>,
}

impl<T: Entity> ShapeBuilder<T> {
    fn push(mut self, name: &'static str, kind: PropertyKind, access: Box<dyn Accessor<T>>) -> Self {
        self.properties.push(Property { name, relation: sanitize(name), kind, access });
        self
    }

    pub fn scalar<F: ScalarField>(
        self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> Self {
        let access = Box::new(ScalarAccess { get, get_mut });
        self.push(name, PropertyKind::Scalar(F::SCALAR_TYPE), access)
    }

    pub fn scalars<F: ScalarField>(
        self,
        name: &'static str,
        get: fn(&T) -> &Vec<F>,
        get_mut: fn(&mut T) -> &mut Vec<F>,
    ) -> Self {
        let access = Box::new(ScalarListAccess { get, get_mut });
        self.push(name, PropertyKind::ScalarList(F::SCALAR_TYPE), access)
    }

    pub fn reference<U: Entity>(
        self,
        name: &'static str,
        get: fn(&T) -> &Option<Shared<U>>,
        get_mut: fn(&mut T) -> &mut Option<Shared<U>>,
    ) -> Self {
        let access = Box::new(ReferenceAccess { get, get_mut });
        self.push(name, PropertyKind::Reference(std::any::type_name::<U>()), access)
    }

    pub fn references<U: Entity>(
        self,
        name: &'static str,
        get: fn(&T) -> &Vec<Shared<U>>,
        get_mut: fn(&mut T) -> &mut Vec<Shared<U>>,
    ) -> Self {
        let access = Box::new(ReferenceListAccess { get, get_mut, _target: PhantomData });
        self.push(name, PropertyKind::ReferenceList(std::any::type_name::<U>()), access)
    }

    /// Scalar collection whose relationships carry a weight each.
    pub fn weighted_scalars<F: ScalarField>(
        self,
        name: &'static str,
        get: fn(&T) -> &Vec<Weighted<F>>,
        get_mut: fn(&mut T) -> &mut Vec<Weighted<F>>,
    ) -> Self {
        let access = Box::new(WeightedScalarListAccess { get, get_mut });
        self.push(name, PropertyKind::ScalarList(F::SCALAR_TYPE), access)
    }

    /// Reference collection whose relationships carry a weight each.
    pub fn weighted_references<U: Entity>(
        self,
        name: &'static str,
        get: fn(&T) -> &Vec<Weighted<Shared<U>>>,
        get_mut: fn(&mut T) -> &mut Vec<Weighted<Shared<U>>>,
    ) -> Self {
        let access = Box::new(WeightedReferenceListAccess { get, get_mut, _target: PhantomData });
        self.push(name, PropertyKind::ReferenceList(std::any::type_name::<U>()), access)
    }

    pub fn build(self) -> Shape<T> {
        Shape { name: self.name, properties: self.properties }
    }
}

// ============================================================================
// Accessors
// ============================================================================

trait Accessor<T>: Send + Sync {
    fn read(&self, owner: &T) -> PropertyValue;

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String>;
}

struct ScalarAccess<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T: Entity, F: ScalarField> Accessor<T> for ScalarAccess<T, F> {
    fn read(&self, owner: &T) -> PropertyValue {
        match (self.get)(owner).to_value() {
            Some(value) => PropertyValue::Scalar(value),
            None => PropertyValue::Absent,
        }
    }

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String> {
        match relations {
            [] => Ok(()),
            [single] => {
                *(self.get_mut)(owner) = F::from_value(stored_value(single)?)?;
                Ok(())
            }
            many => Err(format!("scalar property has {} stored relations", many.len())),
        }
    }
}

struct ScalarListAccess<T, F> {
    get: fn(&T) -> &Vec<F>,
    get_mut: fn(&mut T) -> &mut Vec<F>,
}

impl<T: Entity, F: ScalarField> Accessor<T> for ScalarListAccess<T, F> {
    fn read(&self, owner: &T) -> PropertyValue {
        let values: Vec<_> = (self.get)(owner).iter().filter_map(ScalarField::to_value).collect();
        if values.is_empty() { PropertyValue::Absent } else { PropertyValue::Scalars(values) }
    }

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String> {
        let items = relations
            .iter()
            .map(|r| F::from_value(stored_value(r)?))
            .collect::<std::result::Result<Vec<F>, String>>()?;
        *(self.get_mut)(owner) = items;
        Ok(())
    }
}

struct ReferenceAccess<T, U> {
    get: fn(&T) -> &Option<Shared<U>>,
    get_mut: fn(&mut T) -> &mut Option<Shared<U>>,
}

impl<T: Entity, U: Entity> Accessor<T> for ReferenceAccess<T, U> {
    fn read(&self, owner: &T) -> PropertyValue {
        match (self.get)(owner) {
            Some(target) => PropertyValue::Entity(erase(target)),
            None => PropertyValue::Absent,
        }
    }

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String> {
        match relations {
            [] => Ok(()),
            [single] => {
                *(self.get_mut)(owner) = Some(stub::<U>(single)?);
                Ok(())
            }
            many => Err(format!("reference property has {} stored relations", many.len())),
        }
    }
}

struct ReferenceListAccess<T, U> {
    get: fn(&T) -> &Vec<Shared<U>>,
    get_mut: fn(&mut T) -> &mut Vec<Shared<U>>,
    _target: PhantomData<fn() -> U>,
}

impl<T: Entity, U: Entity> Accessor<T> for ReferenceListAccess<T, U> {
    fn read(&self, owner: &T) -> PropertyValue {
        let targets = (self.get)(owner);
        if targets.is_empty() {
            PropertyValue::Absent
        } else {
            PropertyValue::Entities(targets.iter().map(erase).collect())
        }
    }

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String> {
        let items = relations.iter().map(stub::<U>).collect::<std::result::Result<Vec<_>, String>>()?;
        *(self.get_mut)(owner) = items;
        Ok(())
    }
}

struct WeightedScalarListAccess<T, F> {
    get: fn(&T) -> &Vec<Weighted<F>>,
    get_mut: fn(&mut T) -> &mut Vec<Weighted<F>>,
}

impl<T: Entity, F: ScalarField> Accessor<T> for WeightedScalarListAccess<T, F> {
    fn read(&self, owner: &T) -> PropertyValue {
        let edges: Vec<_> = (self.get)(owner)
            .iter()
            .filter_map(|item| item.value.to_value().map(|v| Edge::new(Target::Value(v), item.weight)))
            .collect();
        if edges.is_empty() { PropertyValue::Absent } else { PropertyValue::Weighted(edges) }
    }

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String> {
        let items = relations
            .iter()
            .map(|r| Ok(Weighted { value: F::from_value(stored_value(r)?)?, weight: r.weight }))
            .collect::<std::result::Result<Vec<_>, String>>()?;
        *(self.get_mut)(owner) = items;
        Ok(())
    }
}

struct WeightedReferenceListAccess<T, U> {
    get: fn(&T) -> &Vec<Weighted<Shared<U>>>,
    get_mut: fn(&mut T) -> &mut Vec<Weighted<Shared<U>>>,
    _target: PhantomData<fn() -> U>,
}

impl<T: Entity, U: Entity> Accessor<T> for WeightedReferenceListAccess<T, U> {
    fn read(&self, owner: &T) -> PropertyValue {
        let targets = (self.get)(owner);
        if targets.is_empty() {
            return PropertyValue::Absent;
        }
        PropertyValue::Weighted(
            targets
                .iter()
                .map(|item| Edge::new(Target::Entity(erase(&item.value)), item.weight))
                .collect(),
        )
    }

    fn write(&self, owner: &mut T, relations: &[RelationResult]) -> std::result::Result<(), String> {
        let items = relations
            .iter()
            .map(|r| Ok(Weighted { value: stub::<U>(r)?, weight: r.weight }))
            .collect::<std::result::Result<Vec<_>, String>>()?;
        *(self.get_mut)(owner) = items;
        Ok(())
    }
}

fn erase<U: Entity>(target: &Shared<U>) -> Arc<dyn Mapped> {
    let erased: Arc<dyn Mapped> = target.clone();
    erased
}

fn stored_value(relation: &RelationResult) -> std::result::Result<&crate::model::Value, String> {
    match &relation.target {
        RelationTarget::Value { value, .. } => Ok(value),
        RelationTarget::Entity { node } => Err(format!("expected a value node, found entity {}", node.id)),
    }
}

/// Identity-only instance of `U` for a one-hop reference.
fn stub<U: Entity>(relation: &RelationResult) -> std::result::Result<Shared<U>, String> {
    match &relation.target {
        RelationTarget::Entity { node } => {
            let mut target = U::default();
            *target.entity_node_mut() = EntityNode {
                id: Some(node.id),
                label: node.labels.first().cloned(),
            };
            Ok(Arc::new(RwLock::new(target)))
        }
        RelationTarget::Value { value, .. } => Err(format!("expected an entity node, found value {value}")),
    }
}
