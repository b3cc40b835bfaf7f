//! # graph-ogm: Object-Graph Mapping for Property Graphs
//!
//! Persist plain Rust records into a property graph where every scalar
//! property becomes a deduplicated *value node* linked to its *entity
//! node* by a relationship named after the property, and every reference
//! becomes a relationship between entity nodes.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore` / `Session` are the only contract with the store
//! 2. **Clean DTOs**: `Node`, `Relationship`, `Value` cross all boundaries
//! 3. **Patterns are data**: the translator builds an AST; rendering to text is a pure function
//! 4. **Explicit shapes**: typed entities register their properties once, no reflection
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_ogm::{DynamicEntity, Field, Ogm, Value, shared};
//!
//! # async fn example() -> graph_ogm::Result<()> {
//! let ogm = Ogm::open_memory().await?;
//!
//! let ada = shared(DynamicEntity::new()
//!     .with("Name", Value::from("Ada"))
//!     .with("Date Of Birth", Value::from("1815-12-10")));
//! let id = ogm.manager().create(&ada).await?;
//!
//! let found = ogm.query().await?.eq("Name", "Ada").execute().await?;
//! assert_eq!(found[0].read().id(), Some(id));
//! assert_eq!(found[0].read().get("Name"), Some(&Field::scalar("Ada")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Stores
//!
//! | Store | Description |
//! |-------|-------------|
//! | `MemoryStore` | In-memory graph for testing/embedding |
//! | your own | Implement `GraphStore` over a driver |

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod cypher;
pub mod hydrate;
pub mod mapping;
pub mod model;
pub mod persist;
pub mod query;
pub mod storage;
pub mod tx;

use std::sync::Arc;

use tracing::info;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{EntityNode, Node, NodeId, PropertyMap, RelId, Relationship, Value};

// ============================================================================
// Re-exports: Mapping
// ============================================================================

pub use config::MappingConfig;
pub use mapping::{
    DynamicEntity, Entity, Field, Mapped, PropertyKind, ScalarField, ScalarType, Shape, Shared,
    Weighted, sanitize, shared,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use hydrate::{PropertySet, RelationResult, RelationTarget};
pub use persist::{EntityManager, WriteStats};
pub use query::{Comparison, Operand, PropertyPath, QueryBuilder, QueryState};

// ============================================================================
// Re-exports: Storage & transactions
// ============================================================================

pub use storage::{GraphStore, MemoryStore, ResultRow, Session, StoreError};
pub use tx::{CancelSignal, OpContext, Operation, TxMode};

// ============================================================================
// Top-level Ogm handle
// ============================================================================

/// The primary entry point. Wraps a store and a configuration shared by
/// the translator, hydrator and persistence engine.
pub struct Ogm<S: GraphStore> {
    store: Arc<S>,
    config: Arc<MappingConfig>,
}

impl<S: GraphStore> Clone for Ogm<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), config: Arc::clone(&self.config) }
    }
}

impl<S: GraphStore> Ogm<S> {
    /// Validate `config` and check that `store` hands out sessions.
    pub async fn connect(store: S, config: MappingConfig) -> Result<Self> {
        config.validate()?;
        let session = store
            .session(TxMode::ReadOnly)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        drop(session);
        info!(entity_label = %config.entity_label, value_label = %config.value_label, "ogm connected");
        Ok(Self { store: Arc::new(store), config: Arc::new(config) })
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Access the underlying store (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a query; the builder holds one read session until it is
    /// executed or disposed.
    pub async fn query(&self) -> Result<QueryBuilder<S::Session>> {
        self.query_with(OpContext::new()).await
    }

    pub async fn query_with(&self, ctx: OpContext) -> Result<QueryBuilder<S::Session>> {
        let session = ctx.call(Operation::OpenSession, None, self.store.session(TxMode::ReadOnly)).await?;
        Ok(QueryBuilder::new(session, Arc::clone(&self.config)).with_context(ctx))
    }

    pub fn manager(&self) -> EntityManager<S> {
        EntityManager::new(Arc::clone(&self.store), Arc::clone(&self.config))
    }

    /// Create the uniqueness constraint that backs value-node
    /// deduplication. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        let ctx = OpContext::new();
        let mut session = ctx.call(Operation::OpenSession, None, self.store.session(TxMode::ReadWrite)).await?;
        let statement = persist::statements::value_constraint(&self.config);
        ctx.call(Operation::EnsureSchema, None, session.run(&statement)).await
    }
}

/// In-memory graph for testing and embedding.
impl Ogm<MemoryStore> {
    pub async fn open_memory() -> Result<Self> {
        Self::connect(MemoryStore::new(), MappingConfig::default()).await
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Mapping error on property '{property}': {message}")]
    Mapping { property: String, message: String },

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("{0} has no identity; persist it first")]
    NotPersisted(String),

    #[error("Store error during {operation}{}: {source}", target_suffix(.target))]
    Store {
        operation: Operation,
        target: Option<NodeId>,
        source: StoreError,
    },

    #[error("Timed out during {operation}")]
    Timeout { operation: Operation },

    #[error("Cancelled before {operation}")]
    Cancelled { operation: Operation },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a store failure with the operation and target it belongs to.
    pub fn store(operation: Operation, target: Option<NodeId>, source: StoreError) -> Self {
        Error::Store { operation, target, source }
    }
}

fn target_suffix(target: &Option<NodeId>) -> String {
    target.map(|id| format!(" on node {id}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
