//! Snapshot manager that mutates the live context and restores a checkpoint
//! on rollback.

use async_trait::async_trait;
use tracing::{debug, error};

use shrink_core::CancellationToken;

use crate::error::{BoxError, FaultDisplay, SnapshotError};
use crate::manager::{execute, SnapshotManager, TransactionAction, TransactionId};

/// A context that can record and restore its own state.
///
/// A checkpoint only has to capture what a transaction may change, which is
/// usually far smaller than the context itself.
pub trait Checkpointable: Send + Sync {
    type Checkpoint: Send;

    fn checkpoint(&self) -> Result<Self::Checkpoint, BoxError>;

    fn restore(&mut self, checkpoint: Self::Checkpoint);
}

/// Restores the checkpoint when dropped unless the transaction committed.
///
/// Dropping covers every exit: aborts, faults, cancellation, and the
/// transaction future itself being dropped mid-flight.
struct RestoreOnDrop<'a, C: Checkpointable> {
    context: &'a mut C,
    checkpoint: Option<C::Checkpoint>,
}

impl<C: Checkpointable> RestoreOnDrop<'_, C> {
    fn commit(mut self) {
        self.checkpoint = None;
    }
}

impl<C: Checkpointable> Drop for RestoreOnDrop<'_, C> {
    fn drop(&mut self) {
        if let Some(checkpoint) = self.checkpoint.take() {
            self.context.restore(checkpoint);
        }
    }
}

/// Runs transactions in place, guarded by a checkpoint.
pub struct CheckpointSnapshotManager<C> {
    context: C,
    cancellation: Option<CancellationToken>,
    commits: usize,
    rollbacks: usize,
}

impl<C: Checkpointable> CheckpointSnapshotManager<C> {
    pub fn new(context: C) -> Self {
        Self {
            context,
            cancellation: None,
            commits: 0,
            rollbacks: 0,
        }
    }

    /// Abort in-flight transactions when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }
}

#[async_trait]
impl<C: Checkpointable> SnapshotManager for CheckpointSnapshotManager<C> {
    type Context = C;

    fn context(&self) -> &C {
        &self.context
    }

    fn into_context(self) -> C {
        self.context
    }

    async fn transaction<A>(&mut self, action: A) -> Result<A::Output, SnapshotError<A::Abort>>
    where
        A: TransactionAction<C>,
    {
        let id = TransactionId::new();
        let checkpoint = match self.context.checkpoint() {
            Ok(checkpoint) => checkpoint,
            Err(cause) => {
                error!(transaction = %id, error = %cause, "Failed to checkpoint context");
                return Err(SnapshotError::TransactionCreationFailed(cause.to_string()));
            }
        };

        let guard = RestoreOnDrop {
            context: &mut self.context,
            checkpoint: Some(checkpoint),
        };
        let result = execute(action, &mut *guard.context, self.cancellation.as_ref()).await;

        match &result {
            Ok(_) => {
                guard.commit();
                self.commits += 1;
                debug!(transaction = %id, "Transaction committed");
            }
            Err(err) => {
                drop(guard);
                self.rollbacks += 1;
                if err.is_fault() {
                    error!(transaction = %id, error = %FaultDisplay(err), "Transaction rolled back");
                } else {
                    debug!(transaction = %id, "Transaction aborted");
                }
            }
        }
        result
    }
}
