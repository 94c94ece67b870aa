//! Collaborators of the same-failure tester: the failure oracle, the
//! signature comparator and the lens that applies deletions.

use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use shrink_core::DdItem;

use crate::error::{BoxError, CheckError};

/// Runs the failing check on a context and reports the failure it produced.
#[async_trait]
pub trait BuildExceptionProvider<C: Send + Sync>: Send + Sync {
    /// What identifies a failure, e.g. an exit code and the first error line.
    type Signature: Clone + Debug + Send + Sync;

    /// Returns the failure signature, [`CheckError::NoFailure`] if the check
    /// passes, or [`CheckError::Oracle`] if it could not be run.
    async fn check_compilation(&self, context: &C) -> Result<Self::Signature, CheckError>;
}

/// Decides whether two failure signatures describe the same failure.
pub trait ExceptionComparator<S>: Send + Sync {
    fn are_equal(&self, initial: &S, current: &S) -> bool;
}

/// Signatures are the same failure when they compare equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualityComparator;

impl<S: PartialEq> ExceptionComparator<S> for EqualityComparator {
    fn are_equal(&self, initial: &S, current: &S) -> bool {
        initial == current
    }
}

impl<S, F> ExceptionComparator<S> for F
where
    F: Fn(&S, &S) -> bool + Send + Sync,
{
    fn are_equal(&self, initial: &S, current: &S) -> bool {
        self(initial, current)
    }
}

/// Applies the deletion of `items` to a working context.
#[async_trait]
pub trait ItemLens<C: Send + Sync, T: DdItem>: Send + Sync {
    async fn focus_on(&self, items: &[T], context: &mut C) -> Result<(), BoxError>;
}

/// A lens split into a read-only preparation step and a cheap apply step,
/// so that preparations can run concurrently.
#[async_trait]
pub trait ConcurrentLens<C: Send + Sync, T: DdItem>: Send + Sync {
    type Edit: Send;

    async fn prepare(&self, item: &T, context: &C) -> Result<Self::Edit, BoxError>;

    fn apply(&self, edit: Self::Edit, context: &mut C) -> Result<(), BoxError>;
}

/// Runs a [`ConcurrentLens`] with at most `max_concurrency` preparations in
/// flight, then applies the edits in item order.
#[derive(Debug, Clone)]
pub struct ConcurrentFocus<L> {
    lens: L,
    max_concurrency: usize,
}

impl<L> ConcurrentFocus<L> {
    pub fn new(lens: L, max_concurrency: usize) -> Self {
        Self {
            lens,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

#[async_trait]
impl<C, T, L> ItemLens<C, T> for ConcurrentFocus<L>
where
    C: Send + Sync,
    T: DdItem,
    L: ConcurrentLens<C, T>,
{
    async fn focus_on(&self, items: &[T], context: &mut C) -> Result<(), BoxError> {
        let edits: Vec<L::Edit> = {
            let view: &C = context;
            let prepares: Vec<_> = items
                .iter()
                .map(|item| self.lens.prepare(item, view))
                .collect();
            stream::iter(prepares)
                .buffered(self.max_concurrency)
                .try_collect()
                .await?
        };
        for edit in edits {
            self.lens.apply(edit, context)?;
        }
        Ok(())
    }
}
