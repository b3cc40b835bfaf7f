//! Traversal patterns: the statement AST and its Cypher rendering.

pub mod ast;
pub mod render;

pub use ast::{
    Clause, CompareOp, CreatePattern, Expr, Hop, NodePattern, OrderItem, PathPattern,
    Predicate, RelPattern, ReturnItem, SetItem, Statement,
};
pub use render::{is_identifier, quote_identifier, render};
