//! Helpers shared by the base algorithms for running a single trial.

use tracing::trace;

use shrink_core::{CancellationToken, DdItem, MinimizerError, PropertyTester, PropertyTesterError};

use crate::result::MinimizationStats;
use crate::traits::check_cancelled;

/// Build a keep-mask of length `len` with `true` at every index in `kept`.
pub(crate) fn keep_mask(len: usize, kept: impl IntoIterator<Item = usize>) -> Vec<bool> {
    let mut mask = vec![false; len];
    for index in kept {
        mask[index] = true;
    }
    mask
}

/// Split `items` into `(retained, deleted)` according to `keep`, preserving order.
pub(crate) fn partition<T: Clone>(items: &[T], keep: &[bool]) -> (Vec<T>, Vec<T>) {
    let mut retained = Vec::new();
    let mut deleted = Vec::new();
    for (item, &kept) in items.iter().zip(keep) {
        if kept {
            retained.push(item.clone());
        } else {
            deleted.push(item.clone());
        }
    }
    (retained, deleted)
}

/// Ask the tester whether the configuration described by `keep` still fails.
///
/// Returns true only when the property holds; the outcome is recorded in `stats`.
/// The token is checked on both sides of the trial, so a verdict produced
/// while the run was being cancelled is never taken at face value.
pub(crate) async fn run_trial<E, T>(
    env: &mut E,
    tester: &mut dyn PropertyTester<E, T>,
    items: &[T],
    keep: &[bool],
    stats: &mut MinimizationStats,
    cancellation: Option<&CancellationToken>,
) -> Result<bool, MinimizerError>
where
    E: Send,
    T: DdItem,
{
    check_cancelled(cancellation)?;
    let (retained, deleted) = partition(items, keep);
    let outcome = tester.test(env, &retained, &deleted).await;
    check_cancelled(cancellation)?;

    match outcome {
        Ok(()) => {
            stats.record_successful_removal();
            Ok(true)
        }
        Err(PropertyTesterError::NoProperty) => {
            stats.record_failed_removal();
            Ok(false)
        }
        Err(PropertyTesterError::UnknownProperty) => {
            trace!(
                retained = retained.len(),
                deleted = deleted.len(),
                "Oracle undecided, keeping items"
            );
            stats.record_unknown_result();
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_preserves_order() {
        let items = ['a', 'b', 'c', 'd'];
        let keep = keep_mask(items.len(), [3, 1]);
        let (retained, deleted) = partition(&items, &keep);
        assert_eq!(retained, vec!['b', 'd']);
        assert_eq!(deleted, vec!['a', 'c']);
    }
}
