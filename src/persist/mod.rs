//! # Graph Persistence Engine
//!
//! `EntityManager` synchronizes in-memory objects with the store:
//!
//! - **create**: plan the whole reachable object graph (cycle-safe), then
//!   create entity nodes, merge value nodes and link relationships
//! - **update**: diff the stored relations of an identified object
//!   against its current properties and apply only the difference
//! - **delete**: detach-delete the entity node and clear its identity
//! - **load** / **populate**: read entities back by identity
//!
//! Every operation uses one session, and with `batch_writes` one store
//! transaction.

pub(crate) mod plan;
mod scope;
pub(crate) mod statements;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::MappingConfig;
use crate::hydrate::{self, PropertySet, RelationResult};
use crate::mapping::{DynamicEntity, Edge, Entity, Mapped, PropertyValue, Shared, Target, shared};
use crate::model::*;
use crate::query::QueryState;
use crate::storage::{GraphStore, Session};
use crate::tx::{OpContext, Operation, TxMode};
use crate::{Error, Result};
use plan::{CreatePlan, Handle};
use scope::WriteScope;

/// What one write operation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStats {
    /// For updates: whether the stored entity was found.
    pub matched: bool,
    pub entity_nodes_created: usize,
    pub value_nodes_merged: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    /// For updates: kept relationships whose weight changed.
    pub relationships_reweighted: usize,
}

pub struct EntityManager<S: GraphStore> {
    store: Arc<S>,
    config: Arc<MappingConfig>,
    ctx: OpContext,
}

impl<S: GraphStore> Clone for EntityManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            ctx: self.ctx.clone(),
        }
    }
}

impl<S: GraphStore> EntityManager<S> {
    pub fn new(store: Arc<S>, config: Arc<MappingConfig>) -> Self {
        Self { store, config, ctx: OpContext::new() }
    }

    /// Apply a deadline and/or cancellation signal to every store call.
    pub fn with_context(mut self, ctx: OpContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Persist `root` and everything it reaches, returning the root's new
    /// identity. The root always gets a new node; already identified
    /// references are linked, not recreated.
    pub async fn create<M: Mapped>(&self, root: &M) -> Result<NodeId> {
        self.create_with_stats(root).await.map(|(id, _)| id)
    }

    #[instrument(skip_all, fields(shape = root.shape_name()))]
    pub async fn create_with_stats<M: Mapped>(&self, root: &M) -> Result<(NodeId, WriteStats)> {
        let plan = CreatePlan::build(Handle::Root(root))?;

        let mut scope = WriteScope::open(&*self.store, &self.ctx, Arc::clone(&self.config)).await?;
        let outcome = scope.write_plan(&plan).await;
        let (ids, stats) = scope.finish(outcome).await?;

        for (entity, id) in plan.entities.iter().zip(&ids) {
            entity.handle.object().bind_identity(Some(*id), &self.config.entity_label);
        }
        let root_id = ids.first().copied().ok_or_else(|| {
            Error::store(Operation::CreateEntity, None, crate::storage::StoreError::Execution("nothing created".into()))
        })?;

        info!(
            id = %root_id,
            entities = stats.entity_nodes_created,
            values = stats.value_nodes_merged,
            relationships = stats.relationships_created,
            "entity created"
        );
        Ok((root_id, stats))
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Bring the stored relations of `object` in line with its current
    /// properties. A stored entity that no longer exists makes this a
    /// no-op (`matched == false`).
    #[instrument(skip_all, fields(shape = object.shape_name(), id = ?object.identity()))]
    pub async fn update<M: Mapped>(&self, object: &M) -> Result<WriteStats> {
        let id = object
            .identity()
            .ok_or_else(|| Error::NotPersisted(object.shape_name().to_string()))?;

        let mut scope = WriteScope::open(&*self.store, &self.ctx, Arc::clone(&self.config)).await?;
        let mut bound = Vec::new();
        let outcome = sync(&mut scope, object, id, &mut bound).await;
        match scope.finish(outcome).await {
            Ok(((), stats)) => {
                info!(
                    matched = stats.matched,
                    created = stats.relationships_created,
                    deleted = stats.relationships_deleted,
                    reweighted = stats.relationships_reweighted,
                    "entity updated"
                );
                Ok(stats)
            }
            Err(e) => {
                for object in bound {
                    object.bind_identity(None, &self.config.entity_label);
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Detach-delete the entity node of `object` and clear its identity.
    /// Value nodes it pointed at are kept.
    #[instrument(skip_all, fields(shape = object.shape_name(), id = ?object.identity()))]
    pub async fn delete<M: Mapped>(&self, object: &M) -> Result<()> {
        let id = object
            .identity()
            .ok_or_else(|| Error::NotPersisted(object.shape_name().to_string()))?;

        let mut scope = WriteScope::open(&*self.store, &self.ctx, Arc::clone(&self.config)).await?;
        let statement = statements::delete_entity(&self.config, id);
        let outcome = scope.run(Operation::DeleteEntity, Some(id), &statement).await.map(|_| ());
        scope.finish(outcome).await?;

        object.bind_identity(None, &self.config.entity_label);
        info!(id = %id, "entity deleted");
        Ok(())
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Stored property set of one entity, if it exists.
    pub async fn load_property_set(&self, id: NodeId) -> Result<Option<PropertySet>> {
        let mut session = self
            .ctx
            .call(Operation::OpenSession, Some(id), self.store.session(TxMode::ReadOnly))
            .await?;
        let rows = self
            .ctx
            .call(Operation::LoadEntity, Some(id), session.run_query(&load_statement(&self.config, id)))
            .await?;
        Ok(hydrate::group(&rows, &self.config)?.into_iter().next())
    }

    pub async fn load<T: Entity>(&self, id: NodeId) -> Result<Option<Shared<T>>> {
        self.load_property_set(id)
            .await?
            .map(|set| hydrate::typed::<T>(&set).map(shared))
            .transpose()
    }

    pub async fn load_dynamic(&self, id: NodeId) -> Result<Option<Shared<DynamicEntity>>> {
        Ok(self.load_property_set(id).await?.as_ref().map(hydrate::dynamic))
    }

    /// Re-read `target` from the store in place, e.g. to fill in an
    /// identity-only reference produced by hydration. Returns `false` when
    /// the entity no longer exists.
    pub async fn populate<T: Entity>(&self, target: &Shared<T>) -> Result<bool> {
        let id = target
            .read()
            .entity_node()
            .id
            .ok_or_else(|| Error::NotPersisted(T::shape().name().to_string()))?;
        match self.load_property_set(id).await? {
            Some(set) => {
                let fresh = hydrate::typed::<T>(&set)?;
                *target.write() = fresh;
                Ok(true)
            }
            None => {
                warn!(id = %id, "populate: entity not found");
                Ok(false)
            }
        }
    }

    /// Re-bind every identity reachable from `object` against the store.
    /// Not supported.
    pub async fn refresh_bindings<M: Mapped>(&self, _object: &M) -> Result<()> {
        Err(Error::Unsupported("transitive re-binding of an object graph"))
    }
}

fn load_statement(config: &Arc<MappingConfig>, id: NodeId) -> crate::cypher::Statement {
    let mut state = QueryState::new(Arc::clone(config));
    state.by_id(id);
    state.statement()
}

// ============================================================================
// Update diff
// ============================================================================

/// Relations to delete (by relationship id), kept relations whose weight
/// changed, and edges to link.
pub(crate) struct RelationDiff {
    pub(crate) removed: Vec<RelId>,
    pub(crate) reweighted: Vec<(RelId, i64)>,
    pub(crate) added: Vec<Edge>,
}

/// Multiset difference between stored relations and the current value:
/// every desired edge consumes at most one matching stored relation.
/// Scalars match by value, entities by identity; unidentified entities
/// never match and are always added. Among matches, one that already has
/// the desired weight is preferred; otherwise the kept relation is
/// reweighted. An edge without a weight keeps whatever is stored.
pub(crate) fn diff_relations(stored: &[RelationResult], current: PropertyValue) -> RelationDiff {
    let mut unmatched: Vec<&RelationResult> = stored.iter().collect();
    let mut reweighted = Vec::new();
    let mut added = Vec::new();
    for edge in current.into_edges() {
        let same_target = |r: &&RelationResult| match &edge.target {
            Target::Value(v) => r.value() == Some(v),
            Target::Entity(e) => e.identity().is_some() && r.entity_id() == e.identity(),
        };
        let found = unmatched
            .iter()
            .position(|r| same_target(r) && (edge.weight.is_none() || r.weight == edge.weight))
            .or_else(|| unmatched.iter().position(same_target));
        match found {
            Some(pos) => {
                let kept = unmatched.remove(pos);
                if let Some(weight) = edge.weight.filter(|w| kept.weight != Some(*w)) {
                    reweighted.push((kept.relationship, weight));
                }
            }
            None => added.push(edge),
        }
    }

    RelationDiff {
        removed: unmatched.into_iter().map(|r| r.relationship).collect(),
        reweighted,
        added,
    }
}

async fn sync<S: Session>(
    scope: &mut WriteScope<'_, S>,
    object: &dyn Mapped,
    id: NodeId,
    bound: &mut Vec<Arc<dyn Mapped>>,
) -> Result<()> {
    let statement = load_statement(&scope.config, id);
    let rows = scope.run(Operation::LoadEntity, Some(id), &statement).await?;
    let Some(stored) = hydrate::group(&rows, &scope.config)?.into_iter().next() else {
        return Ok(());
    };
    scope.stats.matched = true;

    for (relation, current) in object.properties()? {
        let diff = diff_relations(stored.relations(&relation), current);
        for relationship in diff.removed {
            scope.unlink(id, relationship).await?;
        }
        for (relationship, weight) in diff.reweighted {
            scope.reweight(id, relationship, weight).await?;
        }
        for edge in diff.added {
            let target = match edge.target {
                Target::Value(value) => scope.merge_value(&relation, &value).await?,
                Target::Entity(entity) => match entity.identity() {
                    Some(existing) => existing,
                    None => scope.create_referenced(entity, bound).await?,
                },
            };
            scope.link(id, &relation, target, edge.weight).await?;
        }
    }
    Ok(())
}
