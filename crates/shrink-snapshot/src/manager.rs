//! The transaction contract shared by all snapshot managers.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shrink_core::CancellationToken;

use crate::error::{SnapshotError, TrialError};

/// Unique identifier of one transaction, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    /// Create a new random transaction ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The body of a transaction: mutates the working context and decides
/// whether the mutation should be kept.
#[async_trait]
pub trait TransactionAction<C: Send>: Send {
    /// Value returned on commit.
    type Output: Send;

    /// Reason returned when the action declines to commit.
    type Abort: Send;

    async fn run(self, context: &mut C) -> Result<Self::Output, TrialError<Self::Abort>>;
}

/// Owns the live context and runs transactions against it.
///
/// A transaction either commits all of its mutations or none of them: on
/// abort, fault, panic or cancellation the context is exactly what it was
/// before. Transactions take `&mut self`, so two of them can never overlap.
#[async_trait]
pub trait SnapshotManager: Send {
    type Context: Send + Sync;

    /// The committed context.
    fn context(&self) -> &Self::Context;

    /// Give up ownership of the committed context.
    fn into_context(self) -> Self::Context
    where
        Self: Sized;

    /// Run `action` atomically.
    async fn transaction<A>(&mut self, action: A) -> Result<A::Output, SnapshotError<A::Abort>>
    where
        A: TransactionAction<Self::Context>;
}

/// Run `action` on `context`, turning panics into faults and racing the
/// optional cancellation token. Rolling back is left to the caller.
pub(crate) async fn execute<C, A>(
    action: A,
    context: &mut C,
    cancellation: Option<&CancellationToken>,
) -> Result<A::Output, SnapshotError<A::Abort>>
where
    C: Send,
    A: TransactionAction<C>,
{
    let run = AssertUnwindSafe(action.run(context)).catch_unwind();
    let outcome = match cancellation {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(SnapshotError::Cancelled),
                outcome = run => outcome,
            }
        }
        None => run.await,
    };

    match outcome {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(TrialError::Abort(reason))) => Err(SnapshotError::Aborted(reason)),
        Ok(Err(TrialError::Fault(cause))) => Err(SnapshotError::TransactionFailed(cause)),
        Err(payload) => Err(SnapshotError::TransactionFailed(
            format!("panic: {}", panic_message(payload.as_ref())).into(),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
