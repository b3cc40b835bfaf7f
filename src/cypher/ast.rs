//! Traversal-pattern AST.
//!
//! These types describe the statements the mapping layer sends to the
//! store. They are pure data. `render` turns them into Cypher text; stores that
//! evaluate patterns natively consume the AST directly.

use crate::model::{PropertyMap, Value};

/// A complete statement: ordered clauses plus named parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub clauses: Vec<Clause>,
    pub params: PropertyMap,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Cypher text of this statement.
    pub fn text(&self) -> String {
        super::render::render(self)
    }
}

/// One clause of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `MATCH path WHERE predicate` / `OPTIONAL MATCH ...`
    Match {
        optional: bool,
        path: PathPattern,
        predicate: Option<Predicate>,
    },
    /// `WITH [DISTINCT] a, b`
    With { distinct: bool, items: Vec<String> },
    /// `CREATE (...)` or `CREATE (a)-[...]->(b)`
    Create(CreatePattern),
    /// `MERGE (n:Label {k: v}) ON CREATE SET n.k = v`
    Merge {
        node: NodePattern,
        on_create: Vec<(String, Expr)>,
    },
    /// `[DETACH] DELETE a, b`
    Delete { aliases: Vec<String>, detach: bool },
    /// `SET a.k = expr, b.k = expr`
    Set { items: Vec<SetItem> },
    /// `RETURN items ORDER BY keys`
    Return {
        items: Vec<ReturnItem>,
        order_by: Vec<OrderItem>,
    },
    /// `CREATE CONSTRAINT IF NOT EXISTS FOR (n:Label) REQUIRE n.prop IS UNIQUE`
    CreateConstraint { label: String, property: String },
}

/// A linear path: start node followed by outgoing hops.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub hops: Vec<Hop>,
}

impl PathPattern {
    pub fn node(start: NodePattern) -> Self {
        Self { start, hops: Vec::new() }
    }

    pub fn hop(mut self, rel: RelPattern, node: NodePattern) -> Self {
        self.hops.push(Hop { rel, node });
        self
    }

    /// Every alias this path binds, in order of appearance.
    pub fn aliases(&self) -> Vec<&str> {
        let mut out = vec![self.start.alias.as_str()];
        for hop in &self.hops {
            if let Some(alias) = &hop.rel.alias {
                out.push(alias);
            }
            out.push(&hop.node.alias);
        }
        out
    }
}

/// `-[rel]->(node)`
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub rel: RelPattern,
    pub node: NodePattern,
}

/// Node pattern: `(alias:Label {prop: expr})`
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    pub alias: String,
    pub labels: Vec<String>,
    pub properties: Vec<(String, Expr)>,
}

impl NodePattern {
    pub fn new(alias: impl Into<String>) -> Self {
        Self { alias: alias.into(), labels: Vec::new(), properties: Vec::new() }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, expr: Expr) -> Self {
        self.properties.push((key.into(), expr));
        self
    }
}

/// Outgoing relationship pattern: `-[alias:TYPE {prop: expr}]->`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelPattern {
    pub alias: Option<String>,
    pub rel_type: Option<String>,
    pub properties: Vec<(String, Expr)>,
}

impl RelPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn rel_type(mut self, rel_type: impl Into<String>) -> Self {
        self.rel_type = Some(rel_type.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, expr: Expr) -> Self {
        self.properties.push((key.into(), expr));
        self
    }
}

/// `alias.key = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct SetItem {
    pub alias: String,
    pub key: String,
    pub expr: Expr,
}

impl SetItem {
    pub fn new(alias: impl Into<String>, key: impl Into<String>, expr: Expr) -> Self {
        Self { alias: alias.into(), key: key.into(), expr }
    }
}

/// What a `CREATE` clause creates.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePattern {
    Node(NodePattern),
    Relationship { src: String, rel: RelPattern, dst: String },
}

/// Expressions usable in predicates, properties and projections.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `$name`
    Param(String),
    /// Inline literal.
    Literal(Value),
    /// `alias.key`
    Property { alias: String, key: String },
    /// `id(alias)`
    Id(String),
    /// A bound variable.
    Variable(String),
}

impl Expr {
    pub fn param(name: impl Into<String>) -> Self {
        Expr::Param(name.into())
    }

    pub fn property(alias: impl Into<String>, key: impl Into<String>) -> Self {
        Expr::Property { alias: alias.into(), key: key.into() }
    }

    pub fn id(alias: impl Into<String>) -> Self {
        Expr::Id(alias.into())
    }

    pub fn var(alias: impl Into<String>) -> Self {
        Expr::Variable(alias.into())
    }
}

/// Comparison operators. Each ordering operator has its own comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// `=~`, whole-string regular expression match.
    Regex,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Regex => "=~",
        }
    }
}

/// Boolean filter attached to a `MATCH`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare { left: Expr, op: CompareOp, right: Expr },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// `expr IS NULL`
    IsNull(Expr),
}

impl Predicate {
    pub fn compare(left: Expr, op: CompareOp, right: Expr) -> Self {
        Predicate::Compare { left, op, right }
    }
}

/// `expr AS alias`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: Expr,
    pub alias: String,
}

impl ReturnItem {
    /// Return a bound variable under its own name.
    pub fn var(alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self { expr: Expr::Variable(alias.clone()), alias }
    }
}

/// `ORDER BY expr [DESC]`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}
