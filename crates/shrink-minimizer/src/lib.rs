//! # shrink-minimizer
//!
//! Delta debugging algorithms for shrinking a failing input while it still
//! exhibits the failure.
//!
//! The crate provides base algorithms that work on one flat list of items,
//! a hierarchical driver that applies them level by level, and a graph mode
//! that respects dependencies between items.
//!
//! ## Algorithms
//!
//! - **DdMin**: Classic DDMIN algorithm, 1-minimal result
//! - **ProbabilisticDd**: Probabilistic delta debugging, fewer trials on large inputs
//! - **HierarchicalDd**: Runs a base algorithm over the levels of a hierarchy
//! - **GraphDd**: Deletes layers of a condensed dependency graph
//!
//! ## Example
//!
//! ```rust,ignore
//! use shrink_minimizer::{DdAlgorithm, DdAlgorithmExt, DdMin, MinimizerConfig};
//! use shrink_core::{PredicateTester, PropertyTesterError};
//!
//! let mut tester = PredicateTester::new(|retained: &[char], _deleted: &[char]| {
//!     if retained.contains(&'b') && retained.contains(&'c') {
//!         Ok(())
//!     } else {
//!         Err(PropertyTesterError::NoProperty)
//!     }
//! });
//!
//! let algorithm = DdMin::new(MinimizerConfig::default()).with_zero_testing().with_log();
//! let result = algorithm.minimize(&mut (), vec!['a', 'b', 'c', 'd'], &mut tester).await?;
//!
//! assert_eq!(result.retained, vec!['b', 'c']);
//! println!("{:.1}% reduction", result.reduction_percentage());
//! ```
//!
//! ## Choosing an Algorithm
//!
//! - Use **DdMin** when a 1-minimal result matters more than the number of
//!   trials.
//!
//! - Use **ProbabilisticDd** when trials are expensive and the input is large;
//!   runs are deterministic for a fixed seed.
//!
//! - Wrap either in **HierarchicalDd** with a generator when the input has a
//!   tree structure, or use **GraphDd** when items depend on each other.
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use shrink_minimizer::{HierarchicalConfig, MinimizerConfig};
//!
//! let config = MinimizerConfig::new()
//!     .with_max_iterations(500)      // Limit iterations
//!     .with_early_termination(true)  // Stop when no progress
//!     .with_min_size(1);             // Minimum configuration size
//!
//! let hierarchy = HierarchicalConfig::new().with_max_levels(64);
//! ```

pub mod adapters;
pub mod algorithm;
pub mod cache;
pub mod ddmin;
pub mod graph;
pub mod hierarchical;
pub mod probabilistic;
pub mod result;
pub mod traits;

mod trial;

// Re-export main types for convenient access
pub use adapters::{DdAlgorithmExt, LoggingAlgorithm, LoggingTester, ZeroTesting, STATISTICS_TARGET};
pub use algorithm::{Algorithm, AlgorithmKind};
pub use cache::{CachingTester, TrieCache};
pub use ddmin::DdMin;
pub use graph::{
    condense, ComponentId, CondensedGraph, DependencyGraph, GraphDd, GraphDdResult,
    GraphPropertyTester,
};
pub use hierarchical::{
    HierarchicalConfig, HierarchicalDd, HierarchicalGenerator, Refinement, TreeHierarchyGenerator,
};
pub use probabilistic::{ProbabilisticConfig, ProbabilisticDd};
pub use result::{DdAlgorithmResult, HierarchicalReport, LevelReport, MinimizationStats};
pub use traits::{DdAlgorithm, MinimizerConfig};
