//! # Property Graph Model
//!
//! Clean DTOs that describe what the store hands back and what the
//! mapping layer hands to it. These types cross every boundary:
//! store ↔ hydrator ↔ persistence engine ↔ user.
//!
//! This module is pure data and does no I/O.

pub mod node;
pub mod relationship;
pub mod value;

pub use node::{EntityNode, Node, NodeId};
pub use relationship::{RelId, Relationship, END_KEY, START_KEY, WEIGHT_KEY};
pub use value::Value;

/// Properties of a node or relationship, and statement parameters.
pub type PropertyMap = std::collections::HashMap<String, Value>;
