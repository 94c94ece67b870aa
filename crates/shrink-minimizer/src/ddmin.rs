//! Delta Debugging implementation.
//!
//! Implements the classic DDMIN algorithm from "Simplifying and Isolating
//! Failure-Inducing Input" by Zeller & Hildebrandt (2002).
//!
//! The algorithm works by systematically removing chunks of the items and
//! verifying that the failure is still exhibited. The result is 1-minimal:
//! no single remaining item can be removed while the property still holds.

use std::ops::Range;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, trace};

use shrink_core::{CancellationToken, DdItem, MinimizerError, PropertyTester};

use crate::result::{DdAlgorithmResult, MinimizationStats};
use crate::traits::{DdAlgorithm, MinimizerConfig};
use crate::trial::{keep_mask, partition, run_trial};

/// Delta debugging using the classic DDMIN algorithm.
///
/// The algorithm operates in two phases:
/// 1. **Reduce to subset**: keep only one chunk and delete the rest.
/// 2. **Reduce to complement**: delete one chunk and keep the rest.
///
/// The algorithm doubles granularity (number of chunks) when no trial
/// succeeds and resets to 2 chunks after every successful deletion.
pub struct DdMin {
    config: MinimizerConfig,
    cancellation: Option<CancellationToken>,
}

impl DdMin {
    /// Create a new delta debugging minimizer with the given configuration.
    pub fn new(config: MinimizerConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Create a minimizer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MinimizerConfig::default())
    }

    /// Stop between trials once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    /// Split `len` positions into `n` contiguous chunks whose sizes differ by at most one.
    fn split_into_chunks(len: usize, n: usize) -> Vec<Range<usize>> {
        if n == 0 || len == 0 {
            return vec![];
        }

        let n = n.min(len);
        (0..n).map(|i| (i * len / n)..((i + 1) * len / n)).collect()
    }

    /// Run the DDMIN loop. Returns the surviving indices into `items`, ascending.
    async fn ddmin<E, T>(
        &self,
        env: &mut E,
        items: &[T],
        tester: &mut dyn PropertyTester<E, T>,
        stats: &mut MinimizationStats,
    ) -> Result<Vec<usize>, MinimizerError>
    where
        E: Send,
        T: DdItem,
    {
        let mut current: Vec<usize> = (0..items.len()).collect();
        let mut n = 2;
        let mut iteration = 0;
        let mut consecutive_failures = 0;

        while current.len() >= 2 {
            iteration += 1;
            if iteration > self.config.max_iterations {
                stats.record_early_termination("max iterations reached");
                return Err(MinimizerError::MaxIterationsReached(self.config.max_iterations));
            }

            trace!(
                iteration,
                current_size = current.len(),
                granularity = n,
                "DDMIN iteration"
            );

            let chunks = Self::split_into_chunks(current.len(), n);
            let mut reduced = None;

            // Try reducing to subsets (individual chunks)
            for (i, chunk) in chunks.iter().enumerate() {
                if chunk.len() < self.config.min_size {
                    continue;
                }
                let candidate = current[chunk.clone()].to_vec();
                let keep = keep_mask(items.len(), candidate.iter().copied());
                let token = self.cancellation.as_ref();
                if run_trial(env, tester, items, &keep, stats, token).await? {
                    debug!(chunk_index = i, chunk_size = chunk.len(), "Reduced to subset");
                    reduced = Some(candidate);
                    break;
                }
            }

            // Try reducing to complements (removing individual chunks); with
            // two chunks these are the subset trials again.
            if reduced.is_none() && chunks.len() > 2 {
                for (i, chunk) in chunks.iter().enumerate() {
                    if current.len() - chunk.len() < self.config.min_size {
                        continue;
                    }
                    let candidate: Vec<usize> = current[..chunk.start]
                        .iter()
                        .chain(&current[chunk.end..])
                        .copied()
                        .collect();
                    let keep = keep_mask(items.len(), candidate.iter().copied());
                    let token = self.cancellation.as_ref();
                    if run_trial(env, tester, items, &keep, stats, token).await? {
                        debug!(chunk_index = i, removed = chunk.len(), "Reduced to complement");
                        reduced = Some(candidate);
                        break;
                    }
                }
            }

            match reduced {
                Some(next) => {
                    current = next;
                    n = 2;
                    consecutive_failures = 0;
                }
                None => {
                    if n >= current.len() {
                        debug!(
                            final_size = current.len(),
                            "Minimization complete - maximum granularity reached"
                        );
                        break;
                    }
                    n = (2 * n).min(current.len());
                    stats.record_granularity_increase(n);
                    consecutive_failures += 1;

                    if self.config.early_termination
                        && consecutive_failures >= self.config.early_termination_threshold
                    {
                        stats.record_early_termination("no progress");
                        debug!(
                            consecutive_failures,
                            threshold = self.config.early_termination_threshold,
                            "Early termination due to lack of progress"
                        );
                        break;
                    }
                }
            }
        }

        Ok(current)
    }
}

#[async_trait]
impl DdAlgorithm for DdMin {
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
        self.config.validate()?;
        let start = Instant::now();
        let original_size = items.len();

        info!(original_size, minimizer = self.name(), "Starting delta debugging minimization");

        let mut stats = MinimizationStats::new();
        let survivors = self.ddmin(env, &items, tester, &mut stats).await?;

        let keep = keep_mask(items.len(), survivors);
        let (retained, deleted) = partition(&items, &keep);

        let duration = start.elapsed();
        stats.duration = Some(duration);

        info!(
            original_size,
            minimized_size = retained.len(),
            checks = stats.checks_performed,
            duration = ?duration,
            "Minimization complete"
        );

        Ok(DdAlgorithmResult::new(retained, deleted, stats))
    }

    fn name(&self) -> &str {
        "ddmin"
    }

    fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    fn description(&self) -> &str {
        "Delta debugging using the classic DDMIN algorithm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrink_core::{PredicateTester, PropertyTestResult, PropertyTesterError};

    fn require(needed: &'static [char]) -> impl FnMut(&[char], &[char]) -> PropertyTestResult {
        move |retained: &[char], _deleted: &[char]| {
            if needed.iter().all(|item| retained.contains(item)) {
                Ok(())
            } else {
                Err(PropertyTesterError::NoProperty)
            }
        }
    }

    #[test]
    fn test_split_into_chunks() {
        let chunks = DdMin::split_into_chunks(10, 2);
        assert_eq!(chunks, vec![0..5, 5..10]);

        let chunks = DdMin::split_into_chunks(10, 3);
        assert_eq!(chunks, vec![0..3, 3..6, 6..10]);

        let chunks = DdMin::split_into_chunks(10, 10);
        assert_eq!(chunks.len(), 10);
        assert!(chunks.iter().all(|chunk| chunk.len() == 1));

        assert_eq!(DdMin::split_into_chunks(3, 8).len(), 3);
        assert!(DdMin::split_into_chunks(0, 2).is_empty());
    }

    #[test]
    fn test_minimizer_creation() {
        let minimizer = DdMin::with_defaults();
        assert_eq!(minimizer.name(), "ddmin");

        let config = MinimizerConfig::new().with_max_iterations(500);
        let minimizer = DdMin::new(config);
        assert_eq!(minimizer.config().max_iterations, 500);
    }

    #[tokio::test]
    async fn test_keeps_required_pair() {
        let mut tester = PredicateTester::new(require(&['b', 'c']));
        let result = DdMin::with_defaults()
            .minimize(&mut (), vec!['a', 'b', 'c', 'd'], &mut tester)
            .await
            .unwrap();

        assert_eq!(result.retained, vec!['b', 'c']);
        assert_eq!(result.deleted, vec!['a', 'd']);
    }

    #[tokio::test]
    async fn test_trivial_inputs_are_not_tested() {
        let mut calls = 0;
        let mut tester = PredicateTester::new(|_: &[char], _: &[char]| {
            calls += 1;
            Ok(())
        });
        let ddmin = DdMin::with_defaults();

        let result = ddmin.minimize(&mut (), vec!['a'], &mut tester).await.unwrap();
        assert_eq!(result.retained, vec!['a']);

        let result = ddmin.minimize(&mut (), Vec::new(), &mut tester).await.unwrap();
        assert!(result.retained.is_empty());
        drop(tester);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_unknown_results_keep_items() {
        let mut tester = PredicateTester::new(|_: &[u32], _: &[u32]| {
            Err(PropertyTesterError::UnknownProperty)
        });
        let result = DdMin::with_defaults()
            .minimize(&mut (), (0..6).collect(), &mut tester)
            .await
            .unwrap();

        assert_eq!(result.retained, (0..6).collect::<Vec<_>>());
        assert!(result.deleted.is_empty());
        assert!(result.stats.unknown_results > 0);
        assert_eq!(result.stats.unknown_results, result.stats.failed_removals);
    }

    #[tokio::test]
    async fn test_max_iterations_reached() {
        let mut tester = PredicateTester::new(|_: &[u32], _: &[u32]| {
            Err(PropertyTesterError::NoProperty)
        });
        let ddmin = DdMin::new(MinimizerConfig::new().with_max_iterations(1));
        let err = ddmin
            .minimize(&mut (), (0..8).collect(), &mut tester)
            .await
            .unwrap_err();
        assert!(matches!(err, MinimizerError::MaxIterationsReached(1)));
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_trial() {
        let token = CancellationToken::new();
        token.cancel();
        let mut tester = PredicateTester::new(|_: &[u32], _: &[u32]| Ok(()));
        let ddmin = DdMin::with_defaults().with_cancellation(token);

        let err = ddmin
            .minimize(&mut (), (0..4).collect(), &mut tester)
            .await
            .unwrap_err();
        assert!(matches!(err, MinimizerError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellation_during_trial_discards_its_verdict() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let mut tester = PredicateTester::new(move |_: &[u32], _: &[u32]| {
            canceller.cancel();
            Err(PropertyTesterError::UnknownProperty)
        });
        let ddmin = DdMin::with_defaults().with_cancellation(token);

        let err = ddmin
            .minimize(&mut (), (0..4).collect(), &mut tester)
            .await
            .unwrap_err();
        assert!(matches!(err, MinimizerError::Cancelled));
    }

    #[tokio::test]
    async fn test_early_termination() {
        let mut tester = PredicateTester::new(|_: &[u32], _: &[u32]| {
            Err(PropertyTesterError::NoProperty)
        });
        let ddmin = DdMin::new(
            MinimizerConfig::new()
                .with_early_termination(true)
                .with_early_termination_threshold(1),
        );
        let result = ddmin
            .minimize(&mut (), (0..16).collect(), &mut tester)
            .await
            .unwrap();

        assert!(result.stats.early_terminated);
        assert_eq!(result.retained.len(), 16);
    }
}
