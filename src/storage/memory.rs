//! In-memory reference store.
//!
//! Implements `GraphStore` by interpreting the pattern AST directly
//! against a graph held behind one `RwLock`. Every statement runs under
//! the write lock, so a single statement (including `MERGE`) is atomic.
//!
//! ## Limitations
//!
//! - **Snapshot batches**: `begin_batch()` clones the whole graph and
//!   `rollback_batch()` restores that clone. Writes made by *other*
//!   sessions while a batch is open are lost on rollback. Safe for
//!   single-writer use only.
//! - **Full scans**: unbound start nodes scan every node; there are no
//!   property indexes.
//! - **Outgoing hops only**: path patterns follow relationships from
//!   source to target, which is all the mapping layer generates.
//!
//! Use this store for:
//! - Testing the translator, hydrator and persistence engine end to end
//! - Embedding the mapper in applications that don't need persistence

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use tracing::{debug, warn};

use crate::cypher::*;
use crate::model::*;
use crate::tx::TxMode;
use super::{GraphStore, ResultRow, Session, StoreError, StoreResult};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory property graph store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    graph: RwLock<GraphState>,
    reachable: AtomicBool,
    open_sessions: AtomicUsize,
    statements: AtomicU64,
    /// Statement number (1-based, across all sessions) that fails; 0 = none.
    fail_at: AtomicU64,
    latency: Mutex<Option<Duration>>,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    nodes: BTreeMap<NodeId, Node>,
    relationships: BTreeMap<RelId, Relationship>,
    /// node_id → relationship IDs touching it, in creation order
    adjacency: HashMap<NodeId, Vec<RelId>>,
    /// (label, property) pairs that must be unique
    constraints: Vec<(String, String)>,
    next_node_id: u64,
    next_rel_id: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                graph: RwLock::new(GraphState {
                    next_node_id: 1,
                    next_rel_id: 1,
                    ..GraphState::default()
                }),
                reachable: AtomicBool::new(true),
                open_sessions: AtomicUsize::new(0),
                statements: AtomicU64::new(0),
                fail_at: AtomicU64::new(0),
                latency: Mutex::new(None),
            }),
        }
    }

    // ========================================================================
    // Test hooks
    // ========================================================================

    /// Simulate a store that refuses new sessions.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make the `n`-th statement executed from now (1-based) fail with
    /// `StoreError::Execution`.
    pub fn fail_after(&self, n: u64) {
        let now = self.inner.statements.load(Ordering::SeqCst);
        self.inner.fail_at.store(now + n.max(1), Ordering::SeqCst);
    }

    /// Delay every statement by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.lock() = latency;
    }

    /// Sessions acquired and not yet dropped.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }

    /// Statements executed since the store was created.
    pub fn statements_executed(&self) -> u64 {
        self.inner.statements.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn node_count(&self) -> usize {
        self.inner.graph.read().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.inner.graph.read().relationships.len()
    }

    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.graph.read().nodes.get(&id).cloned()
    }

    pub fn nodes_with_label(&self, label: &str) -> Vec<Node> {
        self.inner.graph.read().nodes.values()
            .filter(|n| n.has_label(label))
            .cloned()
            .collect()
    }

    pub fn nodes_by_property(&self, label: &str, key: &str, value: &Value) -> Vec<Node> {
        self.inner.graph.read().nodes.values()
            .filter(|n| n.has_label(label) && n.get(key) == Some(value))
            .cloned()
            .collect()
    }

    pub fn relationships_by_type(&self, rel_type: &str) -> Vec<Relationship> {
        self.inner.graph.read().relationships.values()
            .filter(|r| r.rel_type == rel_type)
            .cloned()
            .collect()
    }

    /// Outgoing relationships of `node`, in creation order.
    pub fn relationships_from(&self, node: NodeId) -> Vec<Relationship> {
        let graph = self.inner.graph.read();
        graph.outgoing(node).into_iter()
            .filter_map(|id| graph.relationships.get(&id).cloned())
            .collect()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    type Session = MemorySession;

    async fn session(&self, mode: TxMode) -> StoreResult<MemorySession> {
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unreachable".into()));
        }
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession { inner: Arc::clone(&self.inner), mode, snapshot: None })
    }
}

// ============================================================================
// MemorySession
// ============================================================================

/// Session on a [`MemoryStore`]. Dropping it releases the session and
/// rolls back an open batch.
pub struct MemorySession {
    inner: Arc<MemoryInner>,
    mode: TxMode,
    snapshot: Option<GraphState>,
}

impl MemorySession {
    pub fn mode(&self) -> TxMode {
        self.mode
    }

    pub fn in_batch(&self) -> bool {
        self.snapshot.is_some()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            warn!("memory session dropped with an open batch; rolling back");
            *self.inner.graph.write() = snapshot;
        }
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn run_query(&mut self, statement: &Statement) -> StoreResult<Vec<ResultRow>> {
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let count = self.inner.statements.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_at = self.inner.fail_at.load(Ordering::SeqCst);
        if fail_at != 0 && count == fail_at {
            self.inner.fail_at.store(0, Ordering::SeqCst);
            return Err(StoreError::Execution(format!("injected failure at statement {count}")));
        }

        if self.mode == TxMode::ReadOnly && statement.clauses.iter().any(is_write_clause) {
            return Err(StoreError::Execution("write clause in read-only session".into()));
        }

        debug!(statement = %statement.text(), "memory.run_query");
        let mut graph = self.inner.graph.write();
        Executor { graph: &mut graph, params: &statement.params }.run(&statement.clauses)
    }

    async fn begin_batch(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::Execution("batch already open".into()));
        }
        self.snapshot = Some(self.inner.graph.read().clone());
        Ok(())
    }

    async fn commit_batch(&mut self) -> StoreResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Execution("no open batch".into()))
    }

    async fn rollback_batch(&mut self) -> StoreResult<()> {
        let snapshot = self.snapshot
            .take()
            .ok_or_else(|| StoreError::Execution("no open batch".into()))?;
        *self.inner.graph.write() = snapshot;
        Ok(())
    }
}

fn is_write_clause(clause: &Clause) -> bool {
    matches!(
        clause,
        Clause::Create(_)
            | Clause::Merge { .. }
            | Clause::Delete { .. }
            | Clause::Set { .. }
            | Clause::CreateConstraint { .. }
    )
}

// ============================================================================
// Graph state primitives
// ============================================================================

impl GraphState {
    fn outgoing(&self, node: NodeId) -> Vec<RelId> {
        self.adjacency.get(&node)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.relationships.get(id).is_some_and(|r| r.src == node))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn check_unique(&self, candidate: &Node) -> StoreResult<()> {
        for (label, key) in &self.constraints {
            if !candidate.has_label(label) {
                continue;
            }
            let Some(value) = candidate.get(key) else { continue };
            let clash = self.nodes.values().any(|n| {
                n.id != candidate.id && n.has_label(label) && n.get(key).is_some_and(|v| v == value)
            });
            if clash {
                return Err(StoreError::Constraint(format!(
                    "node with label {label} already has {key} = {value}"
                )));
            }
        }
        Ok(())
    }

    fn create_node(&mut self, labels: Vec<String>, properties: PropertyMap) -> StoreResult<NodeId> {
        let id = NodeId(self.next_node_id);
        let node = Node { id, labels, properties };
        self.check_unique(&node)?;
        self.next_node_id += 1;
        self.nodes.insert(id, node);
        self.adjacency.insert(id, Vec::new());
        Ok(id)
    }

    fn create_relationship(
        &mut self,
        src: NodeId,
        dst: NodeId,
        rel_type: &str,
        properties: PropertyMap,
    ) -> StoreResult<RelId> {
        if !self.nodes.contains_key(&src) {
            return Err(StoreError::NotFound(format!("source node {src}")));
        }
        if !self.nodes.contains_key(&dst) {
            return Err(StoreError::NotFound(format!("target node {dst}")));
        }
        let id = RelId(self.next_rel_id);
        self.next_rel_id += 1;
        self.relationships.insert(id, Relationship { id, src, dst, rel_type: rel_type.to_string(), properties });

        // Update adjacency for both endpoints
        self.adjacency.entry(src).or_default().push(id);
        if src != dst {
            self.adjacency.entry(dst).or_default().push(id);
        }
        Ok(id)
    }

    /// Setting NULL removes the property.
    fn set_node_property(&mut self, id: NodeId, key: &str, value: Value) -> StoreResult<()> {
        let Some(mut node) = self.nodes.get(&id).cloned() else { return Ok(()) };
        if value.is_null() {
            node.properties.remove(key);
        } else {
            node.properties.insert(key.to_string(), value);
        }
        self.check_unique(&node)?;
        self.nodes.insert(id, node);
        Ok(())
    }

    fn set_rel_property(&mut self, id: RelId, key: &str, value: Value) {
        if let Some(rel) = self.relationships.get_mut(&id) {
            if value.is_null() {
                rel.properties.remove(key);
            } else {
                rel.properties.insert(key.to_string(), value);
            }
        }
    }

    fn delete_relationship(&mut self, id: RelId) -> bool {
        let Some(rel) = self.relationships.remove(&id) else { return false };
        for end in [rel.src, rel.dst] {
            if let Some(ids) = self.adjacency.get_mut(&end) {
                ids.retain(|rid| *rid != id);
            }
        }
        true
    }

    fn delete_node(&mut self, id: NodeId, detach: bool) -> StoreResult<bool> {
        let attached = self.adjacency.get(&id).cloned().unwrap_or_default();
        if !attached.is_empty() {
            if !detach {
                return Err(StoreError::Constraint(format!(
                    "cannot delete node {id} with {} relationships",
                    attached.len()
                )));
            }
            for rel in attached {
                self.delete_relationship(rel);
            }
        }
        self.adjacency.remove(&id);
        Ok(self.nodes.remove(&id).is_some())
    }
}

// ============================================================================
// Pattern interpreter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Binding {
    Node(NodeId),
    Rel(RelId),
    Null,
}

type Row = HashMap<String, Binding>;

struct Executor<'a> {
    graph: &'a mut GraphState,
    params: &'a PropertyMap,
}

impl Executor<'_> {
    fn run(&mut self, clauses: &[Clause]) -> StoreResult<Vec<ResultRow>> {
        let mut rows: Vec<Row> = vec![Row::new()];
        let mut output = Vec::new();

        for clause in clauses {
            match clause {
                Clause::Match { optional, path, predicate } => {
                    let mut next = Vec::new();
                    for row in &rows {
                        let mut matched = Vec::new();
                        for candidate in self.match_path(row, path)? {
                            let keep = match predicate {
                                Some(p) => self.eval_predicate(&candidate, p)?,
                                None => true,
                            };
                            if keep {
                                matched.push(candidate);
                            }
                        }
                        if matched.is_empty() && *optional {
                            let mut padded = row.clone();
                            for alias in path.aliases() {
                                padded.entry(alias.to_string()).or_insert(Binding::Null);
                            }
                            matched.push(padded);
                        }
                        next.extend(matched);
                    }
                    rows = next;
                }
                Clause::With { distinct, items } => {
                    let mut projected: Vec<Row> = Vec::with_capacity(rows.len());
                    for row in &rows {
                        let mut out = Row::new();
                        for item in items {
                            let binding = row.get(item).copied()
                                .ok_or_else(|| StoreError::Execution(format!("unbound variable {item}")))?;
                            out.insert(item.clone(), binding);
                        }
                        if !*distinct || !projected.contains(&out) {
                            projected.push(out);
                        }
                    }
                    rows = projected;
                }
                Clause::Create(CreatePattern::Node(node)) => {
                    for row in rows.iter_mut() {
                        let properties = self.eval_properties(row, &node.properties)?;
                        let id = self.graph.create_node(node.labels.clone(), properties)?;
                        row.insert(node.alias.clone(), Binding::Node(id));
                    }
                }
                Clause::Create(CreatePattern::Relationship { src, rel, dst }) => {
                    let rel_type = rel.rel_type.as_deref()
                        .ok_or_else(|| StoreError::Execution("relationship type required".into()))?;
                    for row in rows.iter_mut() {
                        let from = bound_node(row, src)?;
                        let to = bound_node(row, dst)?;
                        let properties = self.eval_properties(row, &rel.properties)?;
                        let id = self.graph.create_relationship(from, to, rel_type, properties)?;
                        if let Some(alias) = &rel.alias {
                            row.insert(alias.clone(), Binding::Rel(id));
                        }
                    }
                }
                Clause::Merge { node, on_create } => {
                    for row in rows.iter_mut() {
                        let wanted = self.eval_properties(row, &node.properties)?;
                        let existing = self.graph.nodes.values()
                            .find(|n| {
                                node.labels.iter().all(|l| n.has_label(l))
                                    && wanted.iter().all(|(k, v)| n.get(k).is_some_and(|nv| nv == v))
                            })
                            .map(|n| n.id);
                        let id = match existing {
                            Some(id) => id,
                            None => {
                                let mut properties = wanted;
                                for (key, expr) in on_create {
                                    properties.insert(key.clone(), self.eval_expr(row, expr)?);
                                }
                                self.graph.create_node(node.labels.clone(), properties)?
                            }
                        };
                        row.insert(node.alias.clone(), Binding::Node(id));
                    }
                }
                Clause::Delete { aliases, detach } => {
                    for row in &rows {
                        for alias in aliases {
                            match row.get(alias) {
                                Some(Binding::Node(id)) => {
                                    self.graph.delete_node(*id, *detach)?;
                                }
                                Some(Binding::Rel(id)) => {
                                    self.graph.delete_relationship(*id);
                                }
                                Some(Binding::Null) => {}
                                None => {
                                    return Err(StoreError::Execution(format!("unbound variable {alias}")));
                                }
                            }
                        }
                    }
                }
                Clause::Set { items } => {
                    for row in &rows {
                        for item in items {
                            let value = self.eval_expr(row, &item.expr)?;
                            match row.get(&item.alias) {
                                Some(Binding::Node(id)) => self.graph.set_node_property(*id, &item.key, value)?,
                                Some(Binding::Rel(id)) => self.graph.set_rel_property(*id, &item.key, value),
                                Some(Binding::Null) => {}
                                None => {
                                    return Err(StoreError::Execution(format!("unbound variable {}", item.alias)));
                                }
                            }
                        }
                    }
                }
                Clause::Return { items, order_by } => {
                    let mut keyed = Vec::with_capacity(rows.len());
                    for row in &rows {
                        let mut result = ResultRow::new();
                        for item in items {
                            result.values.insert(item.alias.clone(), self.eval_expr(row, &item.expr)?);
                        }
                        let keys = order_by.iter()
                            .map(|o| self.eval_expr(row, &o.expr))
                            .collect::<StoreResult<Vec<_>>>()?;
                        keyed.push((keys, result));
                    }
                    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, order_by));
                    output = keyed.into_iter().map(|(_, r)| r).collect();
                }
                Clause::CreateConstraint { label, property } => {
                    let entry = (label.clone(), property.clone());
                    if !self.graph.constraints.contains(&entry) {
                        self.graph.constraints.push(entry);
                        let nodes: Vec<Node> = self.graph.nodes.values().cloned().collect();
                        if let Err(e) = nodes.iter().try_for_each(|n| self.graph.check_unique(n)) {
                            self.graph.constraints.pop();
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(output)
    }

    fn match_path(&self, row: &Row, path: &PathPattern) -> StoreResult<Vec<Row>> {
        let mut partials: Vec<(Row, NodeId)> = Vec::new();
        match row.get(&path.start.alias) {
            Some(Binding::Node(id)) => {
                if self.node_matches(row, *id, &path.start)? {
                    partials.push((row.clone(), *id));
                }
            }
            Some(_) => {}
            None => {
                for id in self.graph.nodes.keys() {
                    if self.node_matches(row, *id, &path.start)? {
                        let mut extended = row.clone();
                        extended.insert(path.start.alias.clone(), Binding::Node(*id));
                        partials.push((extended, *id));
                    }
                }
            }
        }

        for hop in &path.hops {
            let mut next = Vec::new();
            for (partial, from) in partials {
                for rel_id in self.graph.outgoing(from) {
                    let Some(rel) = self.graph.relationships.get(&rel_id) else { continue };
                    if hop.rel.rel_type.as_deref().is_some_and(|t| t != rel.rel_type) {
                        continue;
                    }
                    if !self.properties_match(&partial, &rel.properties, &hop.rel.properties)? {
                        continue;
                    }
                    if let Some(alias) = &hop.rel.alias {
                        if partial.get(alias).is_some_and(|b| *b != Binding::Rel(rel_id)) {
                            continue;
                        }
                    }
                    match partial.get(&hop.node.alias) {
                        Some(b) if *b != Binding::Node(rel.dst) => continue,
                        _ => {}
                    }
                    if !self.node_matches(&partial, rel.dst, &hop.node)? {
                        continue;
                    }
                    let mut extended = partial.clone();
                    if let Some(alias) = &hop.rel.alias {
                        extended.insert(alias.clone(), Binding::Rel(rel_id));
                    }
                    extended.insert(hop.node.alias.clone(), Binding::Node(rel.dst));
                    next.push((extended, rel.dst));
                }
            }
            partials = next;
        }

        Ok(partials.into_iter().map(|(r, _)| r).collect())
    }

    fn node_matches(&self, row: &Row, id: NodeId, pattern: &NodePattern) -> StoreResult<bool> {
        let Some(node) = self.graph.nodes.get(&id) else { return Ok(false) };
        if !pattern.labels.iter().all(|l| node.has_label(l)) {
            return Ok(false);
        }
        self.properties_match(row, &node.properties, &pattern.properties)
    }

    fn properties_match(
        &self,
        row: &Row,
        actual: &PropertyMap,
        wanted: &[(String, Expr)],
    ) -> StoreResult<bool> {
        for (key, expr) in wanted {
            let expected = self.eval_expr(row, expr)?;
            if !actual.get(key).is_some_and(|v| v.cypher_eq(&expected)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn eval_properties(&self, row: &Row, properties: &[(String, Expr)]) -> StoreResult<PropertyMap> {
        let mut out = PropertyMap::new();
        for (key, expr) in properties {
            let value = self.eval_expr(row, expr)?;
            if !value.is_null() {
                out.insert(key.clone(), value);
            }
        }
        Ok(out)
    }

    fn eval_expr(&self, row: &Row, expr: &Expr) -> StoreResult<Value> {
        let lookup = |alias: &str| {
            row.get(alias).copied()
                .ok_or_else(|| StoreError::Execution(format!("unbound variable {alias}")))
        };
        Ok(match expr {
            Expr::Param(name) => self.params.get(name).cloned()
                .ok_or_else(|| StoreError::Execution(format!("missing parameter ${name}")))?,
            Expr::Literal(value) => value.clone(),
            Expr::Property { alias, key } => match lookup(alias)? {
                Binding::Node(id) => self.graph.nodes.get(&id)
                    .and_then(|n| n.get(key).cloned())
                    .unwrap_or(Value::Null),
                Binding::Rel(id) => self.graph.relationships.get(&id)
                    .and_then(|r| r.properties.get(key).cloned())
                    .unwrap_or(Value::Null),
                Binding::Null => Value::Null,
            },
            Expr::Id(alias) => match lookup(alias)? {
                Binding::Node(id) => Value::Int(id.0 as i64),
                Binding::Rel(id) => Value::Int(id.0 as i64),
                Binding::Null => Value::Null,
            },
            Expr::Variable(alias) => match lookup(alias)? {
                Binding::Node(id) => self.graph.nodes.get(&id).cloned().map(Value::from).unwrap_or(Value::Null),
                Binding::Rel(id) => self.graph.relationships.get(&id).cloned().map(Value::from).unwrap_or(Value::Null),
                Binding::Null => Value::Null,
            },
        })
    }

    fn eval_predicate(&self, row: &Row, predicate: &Predicate) -> StoreResult<bool> {
        match predicate {
            Predicate::And(parts) => {
                for part in parts {
                    if !self.eval_predicate(row, part)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(parts) => {
                for part in parts {
                    if self.eval_predicate(row, part)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::IsNull(expr) => Ok(self.eval_expr(row, expr)?.is_null()),
            Predicate::Compare { left, op, right } => {
                let l = self.eval_expr(row, left)?;
                let r = self.eval_expr(row, right)?;
                Ok(match op {
                    CompareOp::Eq => l.cypher_eq(&r),
                    CompareOp::Lt => l.compare(&r) == Some(CmpOrdering::Less),
                    CompareOp::Lte => matches!(l.compare(&r), Some(CmpOrdering::Less | CmpOrdering::Equal)),
                    CompareOp::Gt => l.compare(&r) == Some(CmpOrdering::Greater),
                    CompareOp::Gte => matches!(l.compare(&r), Some(CmpOrdering::Greater | CmpOrdering::Equal)),
                    CompareOp::Regex => match (l.as_str(), r.as_str()) {
                        (Some(text), Some(pattern)) => {
                            let re = Regex::new(&format!("^(?:{pattern})$"))
                                .map_err(|e| StoreError::Execution(format!("invalid regex: {e}")))?;
                            re.is_match(text)
                        }
                        _ => false,
                    },
                })
            }
        }
    }
}

fn bound_node(row: &Row, alias: &str) -> StoreResult<NodeId> {
    match row.get(alias) {
        Some(Binding::Node(id)) => Ok(*id),
        _ => Err(StoreError::Execution(format!("{alias} is not bound to a node"))),
    }
}

/// Stable ordering with NULLs last in either direction.
fn compare_keys(a: &[Value], b: &[Value], order_by: &[OrderItem]) -> CmpOrdering {
    for ((x, y), item) in a.iter().zip(b).zip(order_by) {
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => CmpOrdering::Equal,
            (true, false) => return CmpOrdering::Greater,
            (false, true) => return CmpOrdering::Less,
            (false, false) => {
                let ord = x.compare(y).unwrap_or(CmpOrdering::Equal);
                if item.descending { ord.reverse() } else { ord }
            }
        };
        if ord != CmpOrdering::Equal {
            return ord;
        }
    }
    CmpOrdering::Equal
}

// ============================================================================
// Tests
// ============================================================================
