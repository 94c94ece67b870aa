//! # shrink-core
//!
//! Shared data model for hierarchical delta debugging.
//!
//! Everything the algorithms, the snapshot managers and the command-line
//! reducer agree on lives here:
//!
//! - [`DdItem`] and [`Level`]: what gets deleted and in which order
//! - [`Cut`]: the graph-mode split into retained and deleted vertices
//! - [`PropertyTester`]: the oracle asked "does the failure still reproduce?"
//! - the error taxonomy, from [`PropertyTesterError`] up to [`MinimizationError`]
//! - [`CancellationToken`]: cooperative cancellation of a whole run, shared
//!   by the algorithms (polled between trials) and the transactions (awaited
//!   so an in-flight check can be abandoned and rolled back)

pub mod cut;
pub mod error;
pub mod item;
pub mod tester;

pub use cut::Cut;
pub use error::{
    HierarchyBuildError, MinimizationError, MinimizerError, PropertyTesterError, Result,
};
pub use item::{DdItem, Level};
pub use tester::{PredicateTester, PropertyTestResult, PropertyTester};
pub use tokio_util::sync::CancellationToken;
