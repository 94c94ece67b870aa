//! Wrappers that add behavior around any [`DdAlgorithm`].

use async_trait::async_trait;
use tracing::{debug, info, warn};

use shrink_core::{
    CancellationToken, DdItem, MinimizerError, PropertyTestResult, PropertyTester,
    PropertyTesterError,
};

use crate::result::DdAlgorithmResult;
use crate::traits::{check_cancelled, DdAlgorithm};

/// Tracing target for per-run statistics lines.
pub const STATISTICS_TARGET: &str = "shrink::statistics";

/// Tests deleting the last remaining item after the wrapped algorithm finishes.
///
/// Base algorithms never empty a list on their own. When exactly one item
/// survives, this wrapper runs one more trial with nothing retained.
pub struct ZeroTesting<A> {
    inner: A,
}

impl<A: DdAlgorithm> ZeroTesting<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A: DdAlgorithm> DdAlgorithm for ZeroTesting<A> {
    async fn minimize<E, T>(
        &self,
        env: &mut E,
        items: Vec<T>,
        tester: &mut dyn PropertyTester<E, T>,
    ) -> Result<DdAlgorithmResult<T>, MinimizerError>
    where
        E: Send,
        T: DdItem,
    {
        let all = items.clone();
        let mut result = self.inner.minimize(env, items, tester).await?;
        if result.retained.len() != 1 {
            return Ok(result);
        }

        let mut stats = result.stats.clone();
        check_cancelled(self.cancellation())?;
        let outcome = tester.test(env, &[], &all).await;
        check_cancelled(self.cancellation())?;
        match outcome {
            Ok(()) => {
                debug!(item = ?result.retained[0], "Deleted the last remaining item");
                stats.record_successful_removal();
                Ok(DdAlgorithmResult::new(Vec::new(), all, stats))
            }
            Err(reason) => {
                stats.record_failed_removal();
                if reason == PropertyTesterError::UnknownProperty {
                    stats.unknown_results += 1;
                }
                result.stats = stats;
                Ok(result)
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn cancellation(&self) -> Option<&CancellationToken> {
        self.inner.cancellation()
    }
}

/// Logs start size, end size and reduction ratio of every run.
pub struct LoggingAlgorithm<A> {
    inner: A,
}

impl<A: DdAlgorithm> LoggingAlgorithm<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: DdAlgorithm> DdAlgorithm for LoggingAlgorithm<A> {
    async fn minimize<E, T>(
        &self,
        env: &mut E,
        items: Vec<T>,
        tester: &mut dyn PropertyTester<E, T>,
    ) -> Result<DdAlgorithmResult<T>, MinimizerError>
    where
        E: Send,
        T: DdItem,
    {
        let start_size = items.len();
        info!(target: STATISTICS_TARGET, algorithm = self.name(), size = start_size, "Start");

        let result = self.inner.minimize(env, items, tester).await?;

        let end_size = result.retained.len();
        let ratio = if end_size > 0 {
            start_size as f64 / end_size as f64
        } else {
            f64::INFINITY
        };
        info!(target: STATISTICS_TARGET, algorithm = self.name(), size = end_size, "End");
        info!(target: STATISTICS_TARGET, algorithm = self.name(), ratio, "Ratio");
        info!(target: STATISTICS_TARGET, algorithm = self.name(), "{}", result.stats);

        Ok(result)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn cancellation(&self) -> Option<&CancellationToken> {
        self.inner.cancellation()
    }
}

/// Logs every trial and its outcome.
pub struct LoggingTester<P> {
    inner: P,
    trials: usize,
}

impl<P> LoggingTester<P> {
    pub fn new(inner: P) -> Self {
        Self { inner, trials: 0 }
    }

    /// Number of trials seen so far.
    pub fn trials(&self) -> usize {
        self.trials
    }
}

#[async_trait]
impl<E, T, P> PropertyTester<E, T> for LoggingTester<P>
where
    E: Send,
    T: DdItem,
    P: PropertyTester<E, T>,
{
    async fn test(&mut self, env: &mut E, retained: &[T], deleted: &[T]) -> PropertyTestResult {
        self.trials += 1;
        let trial = self.trials;
        debug!(trial, retained = retained.len(), deleted = deleted.len(), "Testing configuration");

        let result = self.inner.test(env, retained, deleted).await;
        match result {
            Ok(()) => debug!(trial, "Property holds"),
            Err(PropertyTesterError::NoProperty) => debug!(trial, "Property lost"),
            Err(PropertyTesterError::UnknownProperty) => warn!(trial, "Property undecided"),
        }
        result
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        debug!("Empty level");
        self.inner.on_empty_level(env).await
    }
}

/// Builder-style wrapping for algorithms.
pub trait DdAlgorithmExt: DdAlgorithm + Sized {
    /// Add a final trial deleting the last remaining item.
    fn with_zero_testing(self) -> ZeroTesting<Self> {
        ZeroTesting::new(self)
    }

    /// Log statistics of every run.
    fn with_log(self) -> LoggingAlgorithm<Self> {
        LoggingAlgorithm::new(self)
    }
}

impl<A: DdAlgorithm + Sized> DdAlgorithmExt for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddmin::DdMin;
    use shrink_core::PredicateTester;

    #[tokio::test]
    async fn test_zero_testing_deletes_last_item() {
        let mut tester = PredicateTester::new(|_: &[u32], _: &[u32]| Ok(()));
        let algorithm = DdMin::with_defaults().with_zero_testing();

        let result = algorithm
            .minimize(&mut (), vec![1, 2, 3], &mut tester)
            .await
            .unwrap();

        assert!(result.retained.is_empty());
        assert_eq!(result.deleted, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_testing_reports_cancelled_last_trial() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let mut tester = PredicateTester::new(move |_: &[u32], _: &[u32]| {
            canceller.cancel();
            Err(PropertyTesterError::UnknownProperty)
        });
        let algorithm = DdMin::with_defaults()
            .with_cancellation(token)
            .with_zero_testing();

        let err = algorithm
            .minimize(&mut (), vec![7], &mut tester)
            .await
            .unwrap_err();
        assert!(matches!(err, MinimizerError::Cancelled));
    }

    #[tokio::test]
    async fn test_zero_testing_keeps_needed_item() {
        let mut tester = PredicateTester::new(|retained: &[u32], _: &[u32]| {
            if retained.contains(&2) {
                Ok(())
            } else {
                Err(PropertyTesterError::NoProperty)
            }
        });
        let algorithm = DdMin::with_defaults().with_zero_testing();

        let result = algorithm
            .minimize(&mut (), vec![1, 2, 3], &mut tester)
            .await
            .unwrap();

        assert_eq!(result.retained, vec![2]);
        assert_eq!(result.deleted, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_zero_testing_on_single_input() {
        let mut tester = PredicateTester::new(|_: &[u32], _: &[u32]| Ok(()));
        let result = DdMin::with_defaults()
            .with_zero_testing()
            .minimize(&mut (), vec![9], &mut tester)
            .await
            .unwrap();
        assert!(result.retained.is_empty());
    }

    #[tokio::test]
    async fn test_logging_algorithm_is_transparent() {
        let mut tester = PredicateTester::new(|retained: &[u32], _: &[u32]| {
            if retained.contains(&5) {
                Ok(())
            } else {
                Err(PropertyTesterError::NoProperty)
            }
        });
        let algorithm = DdMin::with_defaults().with_log();
        assert_eq!(algorithm.name(), "ddmin");

        let result = algorithm
            .minimize(&mut (), (0..8).collect(), &mut tester)
            .await
            .unwrap();
        assert_eq!(result.retained, vec![5]);
    }

    #[tokio::test]
    async fn test_logging_tester_counts_trials() {
        let inner = PredicateTester::new(|retained: &[u32], _: &[u32]| {
            if retained.is_empty() {
                Err(PropertyTesterError::UnknownProperty)
            } else {
                Ok(())
            }
        });
        let mut tester = LoggingTester::new(inner);

        assert!(tester.test(&mut (), &[1], &[2]).await.is_ok());
        assert_eq!(
            tester.test(&mut (), &[], &[1, 2]).await,
            Err(PropertyTesterError::UnknownProperty)
        );
        assert_eq!(tester.trials(), 2);
    }
}
