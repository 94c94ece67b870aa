//! Error types shared by the reduction crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a property test did not hold.
///
/// Both variants mean "keep the items"; they are kept apart so that
/// statistics and logs can tell a genuine loss of the failure from an
/// oracle that could not decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum PropertyTesterError {
    /// Deleting the items made the failure disappear or change.
    #[error("property does not hold")]
    NoProperty,

    /// The oracle could not decide whether the failure reproduces.
    #[error("property could not be decided")]
    UnknownProperty,
}

/// Errors raised while building a level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyBuildError {
    /// The generator found nothing to minimize.
    #[error("No items found to build the first level")]
    NoItems,

    /// The dependency graph has no vertex without outgoing dependencies.
    #[error("Dependency graph has no sinks")]
    NoSinks,

    /// A generator-specific failure.
    #[error("Hierarchy generator failed: {0}")]
    Generator(String),
}

/// Errors that can occur inside a base minimization algorithm.
#[derive(Debug, Error)]
pub enum MinimizerError {
    /// Maximum iterations reached without convergence.
    #[error("Maximum iterations ({0}) reached without convergence")]
    MaxIterationsReached(usize),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The minimizer was cancelled.
    #[error("Minimization was cancelled")]
    Cancelled,
}

/// Top-level error of a reduction run.
///
/// When a run stops with one of these, the caller still owns the last
/// committed context.
#[derive(Debug, Error)]
pub enum MinimizationError {
    /// The working copy of the project could not be created.
    #[error("Failed to clone the project: {0}")]
    CloningFailed(String),

    /// The hierarchy could not be built.
    #[error("Failed to build the hierarchy: {0}")]
    HierarchyFailed(#[from] HierarchyBuildError),

    /// The property checker could not be set up (e.g. the project does not fail).
    #[error("Property checker failed: {0}")]
    PropertyCheckerFailed(String),

    /// Item extraction or dependency analysis failed.
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// The base algorithm failed.
    #[error("Minimizer failed: {0}")]
    Minimizer(#[from] MinimizerError),

    /// The hierarchy kept producing levels past the configured guard.
    #[error("Hierarchy exceeded the limit of {0} levels")]
    LevelLimitExceeded(usize),

    /// The generator returned the level it was just given without any deletion.
    #[error("Hierarchy generator repeated level {level} without deleting anything")]
    StalledHierarchy {
        /// One-based index of the repeated level.
        level: usize,
    },
}

impl MinimizationError {
    /// Returns true if the run stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MinimizationError::Minimizer(MinimizerError::Cancelled))
    }

    /// Returns true if the run was stopped by one of the hierarchy guards.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            MinimizationError::LevelLimitExceeded(_) | MinimizationError::StalledHierarchy { .. }
        )
    }
}

/// Result type alias for base algorithm operations.
pub type Result<T> = std::result::Result<T, MinimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_error_converts() {
        let err: MinimizationError = HierarchyBuildError::NoItems.into();
        assert!(matches!(
            err,
            MinimizationError::HierarchyFailed(HierarchyBuildError::NoItems)
        ));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancellation_is_detected() {
        let err: MinimizationError = MinimizerError::Cancelled.into();
        assert!(err.is_cancelled());
        assert!(!err.is_guard());
        assert!(MinimizationError::LevelLimitExceeded(3).is_guard());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MinimizerError::MaxIterationsReached(10).to_string(),
            "Maximum iterations (10) reached without convergence"
        );
        assert_eq!(
            MinimizationError::StalledHierarchy { level: 2 }.to_string(),
            "Hierarchy generator repeated level 2 without deleting anything"
        );
    }
}
