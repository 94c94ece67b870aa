//! The property tester contract.

use async_trait::async_trait;

use crate::error::PropertyTesterError;
use crate::item::DdItem;

/// Outcome of one trial: `Ok(())` means the failure still reproduces and the
/// deleted items may go.
pub type PropertyTestResult = Result<(), PropertyTesterError>;

/// Decides whether a retained/deleted partition still exhibits the failure.
///
/// `env` is the reduction environment threaded explicitly through every call.
/// In a full run it is the snapshot manager owning the live context; pure
/// algorithm tests use `()`.
///
/// Implementations receive `retained` and `deleted` as disjoint subsets that
/// together cover the items of the current level, each in level order.
///
/// # Example
///
/// ```rust,ignore
/// use shrink_core::{PredicateTester, PropertyTester};
///
/// let mut tester = PredicateTester::new(|retained: &[char], _deleted: &[char]| {
///     if retained.contains(&'b') { Ok(()) } else { Err(PropertyTesterError::NoProperty) }
/// });
/// assert!(tester.test(&mut (), &['b'], &['a']).await.is_ok());
/// ```
#[async_trait]
pub trait PropertyTester<E: Send, T: DdItem>: Send {
    /// Run one trial.
    ///
    /// # Arguments
    ///
    /// * `env` - The reduction environment.
    /// * `retained` - Items that stay in the artifact.
    /// * `deleted` - Items removed from the artifact for this trial.
    async fn test(&mut self, env: &mut E, retained: &[T], deleted: &[T]) -> PropertyTestResult;

    /// Called by the hierarchical driver when a level has nothing to minimize.
    async fn on_empty_level(&mut self, _env: &mut E) {}
}

#[async_trait]
impl<E, T, P> PropertyTester<E, T> for &mut P
where
    E: Send,
    T: DdItem,
    P: PropertyTester<E, T> + ?Sized,
{
    async fn test(&mut self, env: &mut E, retained: &[T], deleted: &[T]) -> PropertyTestResult {
        (**self).test(env, retained, deleted).await
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        (**self).on_empty_level(env).await
    }
}

#[async_trait]
impl<E, T, P> PropertyTester<E, T> for Box<P>
where
    E: Send,
    T: DdItem,
    P: PropertyTester<E, T> + ?Sized,
{
    async fn test(&mut self, env: &mut E, retained: &[T], deleted: &[T]) -> PropertyTestResult {
        (**self).test(env, retained, deleted).await
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        (**self).on_empty_level(env).await
    }
}

/// A tester backed by a synchronous closure over `(retained, deleted)`.
///
/// Ignores the environment, which makes it usable with any `E`.
pub struct PredicateTester<F> {
    predicate: F,
}

impl<F> PredicateTester<F> {
    /// Create a new closure-based tester.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<E, T, F> PropertyTester<E, T> for PredicateTester<F>
where
    E: Send,
    T: DdItem,
    F: FnMut(&[T], &[T]) -> PropertyTestResult + Send,
{
    async fn test(&mut self, _env: &mut E, retained: &[T], deleted: &[T]) -> PropertyTestResult {
        (self.predicate)(retained, deleted)
    }
}
