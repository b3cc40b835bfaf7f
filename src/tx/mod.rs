//! Session modes, operation kinds, and the per-call context that carries a
//! deadline and a cancellation signal into every store call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::model::NodeId;
use crate::storage::StoreError;
use crate::{Error, Result};

/// Access mode requested when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// The kind of store call an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    OpenSession,
    Query,
    LoadEntity,
    CreateEntity,
    MergeValue,
    CreateRelationship,
    UpdateRelationship,
    DeleteRelationship,
    DeleteEntity,
    EnsureSchema,
    BeginBatch,
    CommitBatch,
    RollbackBatch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::OpenSession => "open session",
            Operation::Query => "query",
            Operation::LoadEntity => "load entity",
            Operation::CreateEntity => "create entity",
            Operation::MergeValue => "merge value node",
            Operation::CreateRelationship => "create relationship",
            Operation::UpdateRelationship => "update relationship",
            Operation::DeleteRelationship => "delete relationship",
            Operation::DeleteEntity => "delete entity",
            Operation::EnsureSchema => "ensure schema",
            Operation::BeginBatch => "begin batch",
            Operation::CommitBatch => "commit batch",
            Operation::RollbackBatch => "rollback batch",
        };
        f.write_str(name)
    }
}

/// Cooperative cancellation flag shared between a caller and in-flight
/// operations. Checked before every store call.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deadline and cancellation threaded through one logical operation.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: Option<CancelSignal>,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every store call that has not completed `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }

    /// Run one store call under this context, wrapping its error with the
    /// operation kind and target identity.
    pub(crate) async fn call<T, F>(
        &self,
        operation: Operation,
        target: Option<NodeId>,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StoreError>>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }
        let outcome = match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| Error::Timeout { operation })?,
            None => fut.await,
        };
        outcome.map_err(|source| Error::store(operation, target, source))
    }
}
