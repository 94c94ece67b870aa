//! Core traits and configuration for base minimization algorithms.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shrink_core::{CancellationToken, DdItem, MinimizerError, PropertyTester};

use crate::result::DdAlgorithmResult;

/// Configuration for minimization behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerConfig {
    /// Maximum number of iterations of the outer loop before giving up.
    pub max_iterations: usize,

    /// Stop after a number of consecutive rounds that removed nothing.
    ///
    /// Off by default: stopping early forfeits 1-minimality.
    pub early_termination: bool,

    /// Number of consecutive unproductive rounds before early termination.
    pub early_termination_threshold: usize,

    /// Minimum number of items a candidate configuration may keep.
    pub min_size: usize,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            early_termination: false,
            early_termination_threshold: 10,
            min_size: 1,
        }
    }
}

impl MinimizerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enable or disable early termination.
    pub fn with_early_termination(mut self, enabled: bool) -> Self {
        self.early_termination = enabled;
        self
    }

    /// Set the early termination threshold.
    pub fn with_early_termination_threshold(mut self, threshold: usize) -> Self {
        self.early_termination_threshold = threshold;
        self
    }

    /// Set the minimum size for minimization.
    pub fn with_min_size(mut self, min: usize) -> Self {
        self.min_size = min;
        self
    }

    /// Check that the configuration can drive an algorithm.
    pub fn validate(&self) -> Result<(), MinimizerError> {
        if self.max_iterations == 0 {
            return Err(MinimizerError::InvalidConfig(
                "max_iterations must be positive".into(),
            ));
        }
        if self.early_termination && self.early_termination_threshold == 0 {
            return Err(MinimizerError::InvalidConfig(
                "early_termination_threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A base delta debugging algorithm over one flat, ordered list of items.
///
/// Every call to the tester receives `(retained, deleted)` as disjoint
/// subsets covering the whole input, each in input order. `deleted` includes
/// the deletions already committed earlier in the same run, so the tester can
/// rebuild the configuration from scratch if it needs to.
///
/// A trial that returns `NoProperty` or `UnknownProperty` keeps its items.
///
/// # Example
///
/// ```rust,ignore
/// use shrink_minimizer::{DdAlgorithm, DdMin, MinimizerConfig};
/// use shrink_core::PredicateTester;
///
/// let ddmin = DdMin::new(MinimizerConfig::default());
/// let mut tester = PredicateTester::new(|retained: &[u32], _: &[u32]| {
///     if retained.contains(&7) { Ok(()) } else { Err(PropertyTesterError::NoProperty) }
/// });
/// let result = ddmin.minimize(&mut (), (0..16).collect(), &mut tester).await?;
/// assert_eq!(result.retained, vec![7]);
/// ```
#[async_trait]
pub trait DdAlgorithm: Send + Sync {
    /// Minimize `items` while the tester keeps reporting that the property holds.
    ///
    /// # Errors
    ///
    /// * `MinimizerError::MaxIterationsReached` - Iteration limit exceeded.
    /// * `MinimizerError::Cancelled` - The run was cancelled before or during a trial.
    async fn minimize<E, T>(
        &self,
        env: &mut E,
        items: Vec<T>,
        tester: &mut dyn PropertyTester<E, T>,
    ) -> Result<DdAlgorithmResult<T>, MinimizerError>
    where
        E: Send,
        T: DdItem;

    /// Get the name of this algorithm for logging purposes.
    fn name(&self) -> &str;

    /// Get a description of the minimization strategy.
    fn description(&self) -> &str {
        "No description available"
    }

    /// The token this algorithm stops on, if any.
    fn cancellation(&self) -> Option<&CancellationToken> {
        None
    }
}

#[async_trait]
impl<A: DdAlgorithm + ?Sized> DdAlgorithm for &A {
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
        (**self).minimize(env, items, tester).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn description(&self) -> &str {
        (**self).description()
    }

    fn cancellation(&self) -> Option<&CancellationToken> {
        (**self).cancellation()
    }
}

/// Returns `Err(Cancelled)` once the token has fired.
pub(crate) fn check_cancelled(token: Option<&CancellationToken>) -> Result<(), MinimizerError> {
    match token {
        Some(token) if token.is_cancelled() => Err(MinimizerError::Cancelled),
        _ => Ok(()),
    }
}
