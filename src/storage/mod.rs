//! # Store Collaborator Contract
//!
//! The mapping engine reaches the graph store only through this module:
//! open a session, run a statement that yields rows, run a statement that
//! yields nothing, and optionally group statements into one store-level
//! batch. Connection management, transaction semantics and query
//! execution belong to the implementor.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store that interprets the pattern AST |

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::cypher::Statement;
use crate::model::*;
use crate::tx::TxMode;
use crate::{Error, Result};

pub use memory::{MemorySession, MemoryStore};

// ============================================================================
// Store errors
// ============================================================================

/// Failure reported by a store. The engine wraps these in
/// [`Error::Store`] together with the operation and target identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Result rows
// ============================================================================

/// A single row returned by [`Session::run_query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    pub values: HashMap<String, Value>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a typed value from the row.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let val = self.values.get(key)
            .ok_or_else(|| Error::TypeError {
                expected: format!("column '{key}'"),
                got: "missing column".into(),
            })?;
        T::from_value(val)
    }

    /// Get a typed value, treating a missing column or NULL as `None`.
    pub fn get_opt<T: FromValue>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(val) => T::from_value(val).map(Some),
        }
    }
}

/// Convert from a row cell to a concrete type.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for Node {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Node(n) => Ok(*n.clone()),
            _ => Err(Error::TypeError {
                expected: "Node".into(),
                got: val.type_name().into(),
            }),
        }
    }
}

impl FromValue for Relationship {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::Relationship(r) => Ok(*r.clone()),
            _ => Err(Error::TypeError {
                expected: "Relationship".into(),
                got: val.type_name().into(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.clone()),
            _ => Err(Error::TypeError {
                expected: "String".into(),
                got: val.type_name().into(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_int().ok_or_else(|| Error::TypeError {
            expected: "Integer".into(),
            got: val.type_name().into(),
        })
    }
}

// ============================================================================
// GraphStore / Session traits
// ============================================================================

/// A long-lived handle to a graph store (driver, connection pool, or an
/// embedded graph) from which sessions are acquired.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    /// The session type for this store. Dropping a session releases it.
    type Session: Session;

    /// Acquire a session. Failure to reach the store is
    /// `StoreError::Unavailable`.
    async fn session(&self, mode: TxMode) -> StoreResult<Self::Session>;
}

/// A scoped unit of work against the store.
///
/// Implementors release the underlying connection in `Drop`, and roll back
/// any open batch there as well, so every exit path frees the session.
#[async_trait]
pub trait Session: Send {
    /// Run a statement and collect its rows.
    async fn run_query(&mut self, statement: &Statement) -> StoreResult<Vec<ResultRow>>;

    /// Run a statement for its side effects only.
    async fn run(&mut self, statement: &Statement) -> StoreResult<()> {
        self.run_query(statement).await.map(|_| ())
    }

    /// Start grouping subsequent statements into one store transaction.
    async fn begin_batch(&mut self) -> StoreResult<()>;

    /// Make the current batch durable.
    async fn commit_batch(&mut self) -> StoreResult<()>;

    /// Discard every write made since `begin_batch`.
    async fn rollback_batch(&mut self) -> StoreResult<()>;
}
