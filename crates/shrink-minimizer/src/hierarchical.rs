//! Hierarchical delta debugging.
//!
//! The driver minimizes an input level by level, coarse to fine:
//! 1. Ask the generator for the first level
//! 2. Minimize the level with the base algorithm
//! 3. Hand the result back to the generator, which derives the next level
//!    from the survivors (or from the deleted items)
//! 4. Repeat until the generator has nothing left to refine
//!
//! Deleting a whole block at a coarse level removes all of its children in a
//! single trial, so this is usually much cheaper than flat ddmin over the
//! finest items.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use shrink_core::{
    DdItem, HierarchyBuildError, Level, MinimizationError, MinimizerError, PropertyTester,
};

use crate::result::{DdAlgorithmResult, HierarchicalReport};
use crate::traits::DdAlgorithm;

/// Produces the levels of a hierarchy and owns the tester used on them.
#[async_trait]
pub trait HierarchicalGenerator<E: Send, T: DdItem>: Send {
    /// Build the coarsest level.
    async fn first_level(&mut self, env: &mut E) -> Result<Level<T>, HierarchyBuildError>;

    /// Derive the next level from the outcome of the previous one.
    ///
    /// Returns `None` when there is nothing finer to minimize.
    async fn next_level(&mut self, env: &mut E, result: &DdAlgorithmResult<T>) -> Option<Level<T>>;

    /// The tester used for the current level.
    fn tester(&mut self) -> &mut dyn PropertyTester<E, T>;
}

/// Configuration of the hierarchical driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalConfig {
    /// Maximum number of levels before the run is aborted.
    pub max_levels: usize,

    /// Abort when the generator hands back the level it was just given
    /// although nothing was deleted from it.
    pub detect_stalls: bool,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            max_levels: 10_000,
            detect_stalls: true,
        }
    }
}

impl HierarchicalConfig {
    /// Create a new hierarchical configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of levels.
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Enable or disable stall detection.
    pub fn with_stall_detection(mut self, enabled: bool) -> Self {
        self.detect_stalls = enabled;
        self
    }
}

/// Runs a base algorithm over every level of a hierarchy.
pub struct HierarchicalDd<A> {
    algorithm: A,
    config: HierarchicalConfig,
}

impl<A: DdAlgorithm> HierarchicalDd<A> {
    /// Create a driver with default configuration.
    pub fn new(algorithm: A) -> Self {
        Self::with_config(algorithm, HierarchicalConfig::default())
    }

    pub fn with_config(algorithm: A, config: HierarchicalConfig) -> Self {
        Self { algorithm, config }
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn config(&self) -> &HierarchicalConfig {
        &self.config
    }

    /// Minimize every level produced by `generator`.
    ///
    /// Deletions are committed level by level through the generator's
    /// tester, so when an error is returned the environment still holds the
    /// state reached after the last successful trial.
    pub async fn minimize<E, T, G>(
        &self,
        env: &mut E,
        generator: &mut G,
    ) -> Result<HierarchicalReport, MinimizationError>
    where
        E: Send,
        T: DdItem,
        G: HierarchicalGenerator<E, T> + ?Sized,
    {
        let start = Instant::now();
        let mut report = HierarchicalReport::default();

        let mut level = generator.first_level(env).await?;
        info!(
            algorithm = self.algorithm.name(),
            first_level = level.len(),
            "Starting hierarchical minimization"
        );

        let mut index = 0;
        loop {
            index += 1;
            if index > self.config.max_levels {
                warn!(max_levels = self.config.max_levels, "Level limit exceeded");
                return Err(MinimizationError::LevelLimitExceeded(self.config.max_levels));
            }

            let result = if level.is_empty() {
                debug!(level = index, "Level is empty, skipping");
                generator.tester().on_empty_level(env).await;
                DdAlgorithmResult::empty()
            } else {
                debug!(level = index, size = level.len(), "Minimizing level");
                self.algorithm
                    .minimize(env, level.items().to_vec(), generator.tester())
                    .await?
            };

            if self.algorithm.cancellation().is_some_and(|token| token.is_cancelled()) {
                warn!(level = index, "Cancelled, stopping after the current level");
                return Err(MinimizerError::Cancelled.into());
            }

            report.record_level(
                level.len(),
                result.retained.len(),
                result.deleted.len(),
                &result.stats,
            );
            info!(
                level = index,
                size = level.len(),
                retained = result.retained.len(),
                deleted = result.deleted.len(),
                "Level complete"
            );

            match generator.next_level(env, &result).await {
                None => break,
                Some(next) => {
                    if self.config.detect_stalls && result.deleted.is_empty() && next == level {
                        warn!(level = index, "Generator repeated a level without progress");
                        return Err(MinimizationError::StalledHierarchy { level: index });
                    }
                    level = next;
                }
            }
        }

        let duration = start.elapsed();
        report.duration = Some(duration);

        info!(
            levels = report.level_count(),
            deleted = report.total_deleted(),
            checks = report.stats.checks_performed,
            duration = ?duration,
            "Hierarchical minimization complete"
        );

        Ok(report)
    }
}

/// Which side of a level result the next level is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Refinement {
    /// Refine the children of the items that survived.
    #[default]
    Retained,
    /// Refine the children of the items that were deleted.
    Deleted,
}

/// Builds levels by descending a tree through a child function.
///
/// Level `k + 1` holds the children of the level `k` items selected by the
/// configured [`Refinement`].
pub struct TreeHierarchyGenerator<T, F, P> {
    roots: Vec<T>,
    children: F,
    refinement: Refinement,
    tester: P,
}

impl<T, F, P> TreeHierarchyGenerator<T, F, P>
where
    T: DdItem,
    F: FnMut(&T) -> Vec<T> + Send,
{
    pub fn new(roots: Vec<T>, children: F, tester: P) -> Self {
        Self {
            roots,
            children,
            refinement: Refinement::default(),
            tester,
        }
    }

    /// Choose which side of each result is refined.
    pub fn with_refinement(mut self, refinement: Refinement) -> Self {
        self.refinement = refinement;
        self
    }

    pub fn tester_ref(&self) -> &P {
        &self.tester
    }

    pub fn into_tester(self) -> P {
        self.tester
    }
}

#[async_trait]
impl<E, T, F, P> HierarchicalGenerator<E, T> for TreeHierarchyGenerator<T, F, P>
where
    E: Send,
    T: DdItem,
    F: FnMut(&T) -> Vec<T> + Send,
    P: PropertyTester<E, T>,
{
    async fn first_level(&mut self, _env: &mut E) -> Result<Level<T>, HierarchyBuildError> {
        if self.roots.is_empty() {
            return Err(HierarchyBuildError::NoItems);
        }
        Ok(Level::new(self.roots.iter().cloned()))
    }

    async fn next_level(&mut self, _env: &mut E, result: &DdAlgorithmResult<T>) -> Option<Level<T>> {
        let source = match self.refinement {
            Refinement::Retained => &result.retained,
            Refinement::Deleted => &result.deleted,
        };
        let children = &mut self.children;
        let next: Level<T> = source.iter().flat_map(|item| children(item)).collect();
        if next.is_empty() {
            None
        } else {
            Some(next)
        }
    }

    fn tester(&mut self) -> &mut dyn PropertyTester<E, T> {
        &mut self.tester
    }
}
