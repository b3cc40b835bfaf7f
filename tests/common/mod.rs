//! Shapes shared by the integration tests.

#![allow(dead_code)]

use std::sync::OnceLock;

use chrono::NaiveDate;
use graph_ogm::{Entity, EntityNode, Shape, Shared, Weighted, shared};

/// A person, as in the family example: partner back-references and shared
/// children make the object graph cyclic.
#[derive(Default)]
pub struct Person {
    pub node: EntityNode,
    pub name: String,
    pub age: i32,
    pub nicknames: Vec<String>,
    pub born: Option<NaiveDate>,
    pub partner: Option<Shared<Person>>,
    pub children: Vec<Shared<Person>>,
}

impl Person {
    pub fn new(name: &str, age: i32) -> Shared<Person> {
        shared(Person { name: name.to_string(), age, ..Person::default() })
    }
}

impl Entity for Person {
    fn shape() -> &'static Shape<Self> {
        static SHAPE: OnceLock<Shape<Person>> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::<Person>::builder("Person")
                .scalar("Name", |p| &p.name, |p| &mut p.name)
                .scalar("Age", |p| &p.age, |p| &mut p.age)
                .scalars("Nicknames", |p| &p.nicknames, |p| &mut p.nicknames)
                .scalar("Date Of Birth", |p| &p.born, |p| &mut p.born)
                .reference("Partner", |p| &p.partner, |p| &mut p.partner)
                .references("Children", |p| &p.children, |p| &mut p.children)
                .build()
        })
    }

    fn entity_node(&self) -> &EntityNode {
        &self.node
    }

    fn entity_node_mut(&mut self) -> &mut EntityNode {
        &mut self.node
    }
}

/// Reads the `Count` relation into a 32-bit field.
#[derive(Default)]
pub struct Counter {
    pub node: EntityNode,
    pub count: i32,
}

impl Entity for Counter {
    fn shape() -> &'static Shape<Self> {
        static SHAPE: OnceLock<Shape<Counter>> = OnceLock::new();
        SHAPE.get_or_init(|| Shape::<Counter>::builder("Counter").scalar("Count", |c| &c.count, |c| &mut c.count).build())
    }

    fn entity_node(&self) -> &EntityNode {
        &self.node
    }

    fn entity_node_mut(&mut self) -> &mut EntityNode {
        &mut self.node
    }
}

/// A profile whose skills and endorsements are ranked by the weight of
/// their relationships.
#[derive(Default)]
pub struct Profile {
    pub node: EntityNode,
    pub name: String,
    pub skills: Vec<Weighted<String>>,
    pub endorsed_by: Vec<Weighted<Shared<Profile>>>,
}

impl Profile {
    pub fn new(name: &str, skills: &[(&str, Option<i64>)]) -> Shared<Profile> {
        let skills = skills
            .iter()
            .map(|(skill, weight)| Weighted { value: skill.to_string(), weight: *weight })
            .collect();
        shared(Profile { name: name.to_string(), skills, ..Profile::default() })
    }
}

impl Entity for Profile {
    fn shape() -> &'static Shape<Self> {
        static SHAPE: OnceLock<Shape<Profile>> = OnceLock::new();
        SHAPE.get_or_init(|| {
            Shape::<Profile>::builder("Profile")
                .scalar("Name", |p| &p.name, |p| &mut p.name)
                .weighted_scalars("Skills", |p| &p.skills, |p| &mut p.skills)
                .weighted_references("Endorsed By", |p| &p.endorsed_by, |p| &mut p.endorsed_by)
                .build()
        })
    }

    fn entity_node(&self) -> &EntityNode {
        &self.node
    }

    fn entity_node_mut(&mut self) -> &mut EntityNode {
        &mut self.node
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
