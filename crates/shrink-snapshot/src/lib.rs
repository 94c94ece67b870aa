//! # shrink-snapshot
//!
//! Transactions over the artifact being reduced, and the property tester
//! that runs each trial inside one.
//!
//! ## Managers
//!
//! - **CloningSnapshotManager**: works on a full clone, swaps it in on commit
//! - **CheckpointSnapshotManager**: works in place, restores a checkpoint on rollback
//!
//! Both guarantee that an aborted, faulted, panicked or cancelled transaction
//! leaves the committed context exactly as it was.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shrink_minimizer::{DdMin, HierarchicalDd, TreeHierarchyGenerator};
//! use shrink_snapshot::{minimize_project, CloningSnapshotManager, EqualityComparator, SameFailurePropertyTester};
//!
//! let manager = CloningSnapshotManager::new(document);
//! let tester = SameFailurePropertyTester::create(
//!     manager.context(),
//!     Arc::new(oracle),
//!     Arc::new(EqualityComparator),
//!     Arc::new(lens),
//! )
//! .await?;
//!
//! let mut generator = TreeHierarchyGenerator::new(roots, children, tester);
//! let outcome = minimize_project(manager, &HierarchicalDd::new(DdMin::with_defaults()), &mut generator).await;
//! save(&outcome.context)?;
//! ```

pub mod checkpoint;
pub mod cloning;
pub mod error;
pub mod listener;
pub mod manager;
pub mod oracle;
pub mod session;
pub mod tester;

pub use checkpoint::{CheckpointSnapshotManager, Checkpointable};
pub use cloning::CloningSnapshotManager;
pub use error::{BoxError, CheckError, SnapshotError, TrialError};
pub use listener::{LoggingListener, PropertyCheckingListener};
pub use manager::{SnapshotManager, TransactionAction, TransactionId};
pub use oracle::{
    BuildExceptionProvider, ConcurrentFocus, ConcurrentLens, EqualityComparator,
    ExceptionComparator, ItemLens,
};
pub use session::{minimize_project, MinimizationOutcome};
pub use tester::SameFailurePropertyTester;
