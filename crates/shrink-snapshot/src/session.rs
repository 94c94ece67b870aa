//! A full reduction run against a snapshot manager.

use tracing::warn;

use shrink_core::{DdItem, MinimizationError};
use shrink_minimizer::{DdAlgorithm, HierarchicalDd, HierarchicalGenerator, HierarchicalReport};

use crate::manager::SnapshotManager;

/// The context after a run, together with how the run ended.
///
/// The context is the last committed state in both cases, so a run that
/// stopped early still hands back everything it managed to delete.
#[derive(Debug)]
pub struct MinimizationOutcome<C> {
    pub context: C,
    pub result: Result<HierarchicalReport, MinimizationError>,
}

impl<C> MinimizationOutcome<C> {
    pub fn is_complete(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drive `generator` through `driver` with `manager` as the environment and
/// return the committed context.
pub async fn minimize_project<M, A, T, G>(
    mut manager: M,
    driver: &HierarchicalDd<A>,
    generator: &mut G,
) -> MinimizationOutcome<M::Context>
where
    M: SnapshotManager,
    A: DdAlgorithm,
    T: DdItem,
    G: HierarchicalGenerator<M, T> + ?Sized,
{
    let result = driver.minimize(&mut manager, generator).await;
    if let Err(err) = &result {
        warn!(error = %err, "Reduction stopped early, keeping last committed state");
    }
    MinimizationOutcome {
        context: manager.into_context(),
        result,
    }
}
