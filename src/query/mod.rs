//! # Query Expression Translator
//!
//! Fluent builder that compiles property-path comparisons into traversal
//! patterns and runs them:
//!
//! ```rust
//! use graph_ogm::{Ogm, Comparison};
//!
//! # async fn example() -> graph_ogm::Result<()> {
//! let ogm = Ogm::open_memory().await?;
//! let people = ogm.query().await?
//!     .filter("Child.Name", Comparison::Eq, "Claire")
//!     .gt("Age", 30i64)
//!     .execute()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! The builder owns one read session for its whole life. Terminal methods
//! consume it, and [`QueryBuilder::dispose`] releases it without running
//! anything.

pub mod path;
pub mod state;

use std::sync::Arc;

use tracing::debug;

use crate::config::MappingConfig;
use crate::hydrate::{self, PropertySet};
use crate::mapping::{DynamicEntity, Entity, Shared, shared};
use crate::model::{NodeId, PropertyMap, Value};
use crate::storage::Session;
use crate::tx::{OpContext, Operation};
use crate::{Error, Result};

pub use path::{Comparison, Operand, PropertyPath};
pub use state::{QueryState, ID_PARAM};

pub struct QueryBuilder<S: Session> {
    session: S,
    config: Arc<MappingConfig>,
    state: QueryState,
    ctx: OpContext,
    /// First error raised while chaining; reported by the terminal call.
    error: Option<Error>,
}

impl<S: Session> QueryBuilder<S> {
    pub fn new(session: S, config: Arc<MappingConfig>) -> Self {
        Self {
            session,
            state: QueryState::new(Arc::clone(&config)),
            config,
            ctx: OpContext::new(),
            error: None,
        }
    }

    /// Run the query under a deadline and/or cancellation signal.
    pub fn with_context(mut self, ctx: OpContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn filter(
        mut self,
        path: impl Into<PropertyPath>,
        cmp: Comparison,
        operand: impl Into<Operand>,
    ) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.state.filter(&path.into(), cmp, operand.into()) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn eq(self, path: impl Into<PropertyPath>, operand: impl Into<Operand>) -> Self {
        self.filter(path, Comparison::Eq, operand)
    }

    pub fn lt(self, path: impl Into<PropertyPath>, operand: impl Into<Operand>) -> Self {
        self.filter(path, Comparison::Lt, operand)
    }

    pub fn lte(self, path: impl Into<PropertyPath>, operand: impl Into<Operand>) -> Self {
        self.filter(path, Comparison::Lte, operand)
    }

    pub fn gt(self, path: impl Into<PropertyPath>, operand: impl Into<Operand>) -> Self {
        self.filter(path, Comparison::Gt, operand)
    }

    pub fn gte(self, path: impl Into<PropertyPath>, operand: impl Into<Operand>) -> Self {
        self.filter(path, Comparison::Gte, operand)
    }

    pub fn contains(self, path: impl Into<PropertyPath>, text: &str) -> Self {
        self.filter(path, Comparison::Contains, text)
    }

    pub fn starts_with(self, path: impl Into<PropertyPath>, text: &str) -> Self {
        self.filter(path, Comparison::StartsWith, text)
    }

    pub fn ends_with(self, path: impl Into<PropertyPath>, text: &str) -> Self {
        self.filter(path, Comparison::EndsWith, text)
    }

    /// Entities whose `path` leads to the entity with identity `id`.
    pub fn refers_to(self, path: impl Into<PropertyPath>, id: NodeId) -> Self {
        self.filter(path, Comparison::Eq, Operand::Entity(id))
    }

    /// Entities whose relationship at the end of `path` weighs at least
    /// `weight`; unweighted relationships pass.
    pub fn min_weight(mut self, path: impl Into<PropertyPath>, weight: i64) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.state.min_weight(&path.into(), weight) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Free-text match over every value of the entity.
    pub fn search(mut self, term: &str) -> Self {
        self.state.search(term);
        self
    }

    /// Match a single entity by identity, discarding earlier clauses.
    pub fn by_id(mut self, id: NodeId) -> Self {
        self.state.by_id(id);
        self
    }

    pub fn ordered_by_weight(mut self) -> Self {
        self.state.order_by_weight();
        self
    }

    /// Pattern text that `execute` would send.
    pub fn text(&self) -> String {
        self.state.text()
    }

    pub fn parameters(&self) -> &PropertyMap {
        self.state.parameters()
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Run the query and group the rows, without materializing.
    pub async fn property_sets(mut self) -> Result<Vec<PropertySet>> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let statement = self.state.statement();
        debug!(query = %statement.text(), params = statement.params.len(), "query.execute");
        let rows = self.ctx
            .call(Operation::Query, None, self.session.run_query(&statement))
            .await?;
        hydrate::group(&rows, &self.config)
    }

    /// Run the query and build dynamic entities.
    pub async fn execute(self) -> Result<Vec<Shared<DynamicEntity>>> {
        let sets = self.property_sets().await?;
        Ok(sets.iter().map(hydrate::dynamic).collect())
    }

    /// Run the query and build instances of `T`.
    pub async fn execute_as<T: Entity>(self) -> Result<Vec<Shared<T>>> {
        let sets = self.property_sets().await?;
        sets.iter().map(|set| hydrate::typed::<T>(set).map(shared)).collect()
    }

    /// Scalar aggregation pushed to the store. Not supported.
    pub async fn execute_scalar(self) -> Result<Value> {
        Err(Error::Unsupported("scalar calculation pushdown"))
    }

    /// Release the session without running the query.
    pub fn dispose(self) {
        drop(self);
    }
}
