//! One write operation's session, batch and bookkeeping.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::config::MappingConfig;
use crate::cypher::Statement;
use crate::mapping::Mapped;
use crate::model::*;
use crate::storage::{GraphStore, ResultRow, Session, StoreError};
use crate::tx::{OpContext, Operation, TxMode};
use crate::{Error, Result};
use super::plan::{CreatePlan, EdgeTarget, Handle};
use super::statements::{self, ENTITY, REL, VALUE};
use super::WriteStats;

/// Owns the session of one logical write. With `batch_writes` every
/// statement joins one store transaction that `finish` commits or rolls
/// back; dropping the scope early releases the session (and the store
/// rolls back the open batch).
pub(crate) struct WriteScope<'c, S: Session> {
    session: S,
    ctx: &'c OpContext,
    pub(crate) config: Arc<MappingConfig>,
    batched: bool,
    pub(crate) stats: WriteStats,
    /// Value nodes merged in this scope, by dedup key.
    values: HashMap<String, NodeId>,
}

impl<'c, S: Session> WriteScope<'c, S> {
    pub(crate) async fn open<G>(store: &G, ctx: &'c OpContext, config: Arc<MappingConfig>) -> Result<Self>
    where
        G: GraphStore<Session = S>,
    {
        let mut session = ctx.call(Operation::OpenSession, None, store.session(TxMode::ReadWrite)).await?;
        let batched = config.batch_writes;
        if batched {
            ctx.call(Operation::BeginBatch, None, session.begin_batch()).await?;
        }
        Ok(Self {
            session,
            ctx,
            config,
            batched,
            stats: WriteStats::default(),
            values: HashMap::new(),
        })
    }

    pub(crate) async fn run(
        &mut self,
        operation: Operation,
        target: Option<NodeId>,
        statement: &Statement,
    ) -> Result<Vec<ResultRow>> {
        self.ctx.call(operation, target, self.session.run_query(statement)).await
    }

    /// Commit on success, roll back on failure, and release the session.
    pub(crate) async fn finish<T>(mut self, outcome: Result<T>) -> Result<(T, WriteStats)> {
        let stats = self.stats;
        if !self.batched {
            return outcome.map(|value| (value, stats));
        }
        match outcome {
            Ok(value) => {
                self.ctx.call(Operation::CommitBatch, None, self.session.commit_batch()).await?;
                Ok((value, stats))
            }
            Err(e) => {
                // Rollback bypasses the context: a cancelled or expired
                // operation still has to undo its writes.
                if let Err(rollback) = self.session.rollback_batch().await {
                    warn!(error = %rollback, "rollback after failed write also failed");
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Primitive writes
    // ========================================================================

    pub(crate) async fn create_entity_node(&mut self) -> Result<NodeId> {
        let created = self.config.created_key.as_ref().map(|_| chrono::Utc::now().timestamp_millis());
        let statement = statements::create_entity(&self.config, created);
        let rows = self.run(Operation::CreateEntity, None, &statement).await?;
        let node: Node = first_row(&rows, Operation::CreateEntity, None)?.get(ENTITY)?;
        self.stats.entity_nodes_created += 1;
        Ok(node.id)
    }

    /// Get-or-create the value node for `value`. A uniqueness conflict
    /// from a concurrent writer is retried once.
    pub(crate) async fn merge_value(&mut self, relation: &str, value: &Value) -> Result<NodeId> {
        let key = value.dedup_key().ok_or_else(|| Error::Mapping {
            property: relation.to_string(),
            message: format!("{} cannot be stored in a value node", value.type_name()),
        })?;
        if let Some(id) = self.values.get(&key) {
            return Ok(*id);
        }

        let statement = statements::merge_value(&self.config, value);
        let rows = match self.run(Operation::MergeValue, None, &statement).await {
            Err(Error::Store { source: StoreError::Constraint(reason), .. }) => {
                debug!(%reason, value = %value, "value merge conflicted, retrying");
                self.run(Operation::MergeValue, None, &statement).await?
            }
            other => other?,
        };
        let node: Node = first_row(&rows, Operation::MergeValue, None)?.get(VALUE)?;
        self.stats.value_nodes_merged += 1;
        self.values.insert(key, node.id);
        Ok(node.id)
    }

    pub(crate) async fn link(
        &mut self,
        source: NodeId,
        relation: &str,
        target: NodeId,
        weight: Option<i64>,
    ) -> Result<()> {
        let statement = statements::create_relationship(source, relation, target, weight);
        let rows = self.run(Operation::CreateRelationship, Some(source), &statement).await?;
        first_row(&rows, Operation::CreateRelationship, Some(source))?.get::<Relationship>(REL)?;
        self.stats.relationships_created += 1;
        Ok(())
    }

    pub(crate) async fn reweight(&mut self, source: NodeId, relationship: RelId, weight: i64) -> Result<()> {
        let statement = statements::set_relationship_weight(source, relationship, weight);
        self.run(Operation::UpdateRelationship, Some(source), &statement).await?;
        self.stats.relationships_reweighted += 1;
        Ok(())
    }

    pub(crate) async fn unlink(&mut self, source: NodeId, relationship: RelId) -> Result<()> {
        let statement = statements::delete_relationship(source, relationship);
        self.run(Operation::DeleteRelationship, Some(source), &statement).await?;
        self.stats.relationships_deleted += 1;
        Ok(())
    }

    // ========================================================================
    // Plans
    // ========================================================================

    /// Create every planned entity node, then every planned relationship.
    /// Returns the identity assigned to each plan slot.
    pub(crate) async fn write_plan(&mut self, plan: &CreatePlan<'_>) -> Result<Vec<NodeId>> {
        let mut ids = Vec::with_capacity(plan.len());
        for _ in &plan.entities {
            ids.push(self.create_entity_node().await?);
        }
        for (entity, source) in plan.entities.iter().zip(&ids) {
            for edge in &entity.edges {
                let target = match &edge.target {
                    EdgeTarget::Value(value) => self.merge_value(&edge.relation, value).await?,
                    EdgeTarget::Existing(id) => *id,
                    EdgeTarget::Planned(slot) => ids[*slot],
                };
                self.link(*source, &edge.relation, target, edge.weight).await?;
            }
        }
        Ok(ids)
    }

    /// Create an unidentified entity referenced during update, binding
    /// its identity (and those of anything new it references) at once.
    pub(crate) async fn create_referenced(
        &mut self,
        object: Arc<dyn Mapped>,
        bound: &mut Vec<Arc<dyn Mapped>>,
    ) -> Result<NodeId> {
        let plan = CreatePlan::build(Handle::Child(object))?;
        let ids = self.write_plan(&plan).await?;
        for (entity, id) in plan.entities.iter().zip(&ids) {
            if let Handle::Child(object) = &entity.handle {
                object.bind_identity(Some(*id), &self.config.entity_label);
                bound.push(Arc::clone(object));
            }
        }
        ids.first().copied().ok_or_else(|| Error::store(
            Operation::CreateEntity,
            None,
            StoreError::Execution("empty create plan".into()),
        ))
    }
}

fn first_row(rows: &[ResultRow], operation: Operation, target: Option<NodeId>) -> Result<&ResultRow> {
    rows.first().ok_or_else(|| {
        Error::store(operation, target, StoreError::NotFound("statement matched nothing".into()))
    })
}
