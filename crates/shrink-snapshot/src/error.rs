//! Error types for transactions and oracles.

use std::fmt;

use thiserror::Error;

/// Boxed error raised by collaborators (lenses, checkpoints, oracles).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a transaction did not commit. The context is always rolled back first.
#[derive(Debug, Error)]
pub enum SnapshotError<R> {
    /// The action declined to commit.
    #[error("Transaction aborted: {0}")]
    Aborted(R),

    /// The action faulted or panicked while mutating or testing.
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[source] BoxError),

    /// The working copy could not be created.
    #[error("Transaction could not be created: {0}")]
    TransactionCreationFailed(String),

    /// The run was cancelled while the transaction was in flight.
    #[error("Transaction cancelled")]
    Cancelled,
}

impl<R> SnapshotError<R> {
    /// Returns the abort reason if the action declined to commit.
    pub fn abort_reason(&self) -> Option<&R> {
        match self {
            SnapshotError::Aborted(reason) => Some(reason),
            _ => None,
        }
    }

    /// Returns true for failures that were not decided by the action itself.
    pub fn is_fault(&self) -> bool {
        !matches!(self, SnapshotError::Aborted(_))
    }
}

/// Formats the non-abort variants without requiring `Display` on the abort reason.
pub(crate) struct FaultDisplay<'a, R>(pub(crate) &'a SnapshotError<R>);

impl<R> fmt::Display for FaultDisplay<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            SnapshotError::Aborted(_) => write!(f, "aborted"),
            SnapshotError::TransactionFailed(cause) => write!(f, "failed: {}", cause),
            SnapshotError::TransactionCreationFailed(reason) => {
                write!(f, "could not be created: {}", reason)
            }
            SnapshotError::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How a transaction action ends without committing.
#[derive(Debug)]
pub enum TrialError<R> {
    /// Roll back and report `reason`.
    Abort(R),

    /// Roll back because something broke.
    Fault(BoxError),
}

impl<R> TrialError<R> {
    /// Wrap any error as a fault.
    pub fn fault(error: impl Into<BoxError>) -> Self {
        TrialError::Fault(error.into())
    }
}

/// Outcome of running the failure oracle when no failure signature was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The build succeeded: the failure is gone.
    #[error("The build succeeded")]
    NoFailure,

    /// The oracle could not decide.
    #[error("Oracle error: {0}")]
    Oracle(String),
}
