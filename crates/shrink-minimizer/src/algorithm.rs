//! Runtime selection between the base algorithms.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shrink_core::{CancellationToken, DdItem, MinimizerError, PropertyTester};

use crate::ddmin::DdMin;
use crate::probabilistic::{ProbabilisticConfig, ProbabilisticDd};
use crate::result::DdAlgorithmResult;
use crate::traits::{DdAlgorithm, MinimizerConfig};

/// Names of the available base algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    /// Classic ddmin, 1-minimal.
    #[default]
    Ddmin,
    /// Probabilistic delta debugging.
    Probabilistic,
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmKind::Ddmin => write!(f, "ddmin"),
            AlgorithmKind::Probabilistic => write!(f, "probabilistic"),
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = MinimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ddmin" => Ok(AlgorithmKind::Ddmin),
            "probabilistic" | "probdd" => Ok(AlgorithmKind::Probabilistic),
            other => Err(MinimizerError::InvalidConfig(format!(
                "unknown algorithm: {}",
                other
            ))),
        }
    }
}

/// A base algorithm chosen at runtime.
pub enum Algorithm {
    DdMin(DdMin),
    Probabilistic(ProbabilisticDd),
}

impl Algorithm {
    /// Build the algorithm named by `kind`. `seed` only affects the probabilistic variant.
    pub fn from_kind(kind: AlgorithmKind, config: MinimizerConfig, seed: u64) -> Self {
        match kind {
            AlgorithmKind::Ddmin => Algorithm::DdMin(DdMin::new(config)),
            AlgorithmKind::Probabilistic => Algorithm::Probabilistic(ProbabilisticDd::new(
                ProbabilisticConfig::new().with_base(config).with_seed(seed),
            )),
        }
    }

    /// Stop between trials once `token` is cancelled.
    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        match self {
            Algorithm::DdMin(inner) => Algorithm::DdMin(inner.with_cancellation(token)),
            Algorithm::Probabilistic(inner) => {
                Algorithm::Probabilistic(inner.with_cancellation(token))
            }
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Algorithm::DdMin(_) => AlgorithmKind::Ddmin,
            Algorithm::Probabilistic(_) => AlgorithmKind::Probabilistic,
        }
    }
}

#[async_trait]
impl DdAlgorithm for Algorithm {
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
        match self {
            Algorithm::DdMin(inner) => inner.minimize(env, items, tester).await,
            Algorithm::Probabilistic(inner) => inner.minimize(env, items, tester).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Algorithm::DdMin(inner) => inner.name(),
            Algorithm::Probabilistic(inner) => inner.name(),
        }
    }

    fn cancellation(&self) -> Option<&CancellationToken> {
        match self {
            Algorithm::DdMin(inner) => inner.cancellation(),
            Algorithm::Probabilistic(inner) => inner.cancellation(),
        }
    }

    fn description(&self) -> &str {
        match self {
            Algorithm::DdMin(inner) => inner.description(),
            Algorithm::Probabilistic(inner) => inner.description(),
        }
    }
}
