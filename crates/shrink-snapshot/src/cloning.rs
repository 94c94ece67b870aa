//! Snapshot manager that runs every transaction on a full copy of the context.

use async_trait::async_trait;
use tracing::{debug, error};

use shrink_core::CancellationToken;

use crate::error::{FaultDisplay, SnapshotError};
use crate::manager::{execute, SnapshotManager, TransactionAction, TransactionId};

/// Clones the context for every transaction and swaps the clone in on commit.
///
/// Simple and always correct; the cost is one full clone per trial, so
/// large contexts should prefer [`CheckpointSnapshotManager`](crate::CheckpointSnapshotManager).
pub struct CloningSnapshotManager<C> {
    context: C,
    cancellation: Option<CancellationToken>,
    commits: usize,
    rollbacks: usize,
}

impl<C: Clone + Send + Sync> CloningSnapshotManager<C> {
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

    /// Number of committed transactions.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of rolled back transactions.
    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }
}

#[async_trait]
impl<C: Clone + Send + Sync> SnapshotManager for CloningSnapshotManager<C> {
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
        let mut working = self.context.clone();

        let result = execute(action, &mut working, self.cancellation.as_ref()).await;
        match &result {
            Ok(_) => {
                self.context = working;
                self.commits += 1;
                debug!(transaction = %id, "Transaction committed");
            }
            Err(err) => {
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
