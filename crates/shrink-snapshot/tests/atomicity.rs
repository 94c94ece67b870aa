//! Property-based tests for transaction atomicity
//!
//! Whatever a transaction does before it ends, only a commit may change the
//! context, and a commit applies the whole mutation.

use std::future::Future;

use async_trait::async_trait;
use proptest::prelude::*;
use shrink_snapshot::{
    BoxError, CheckpointSnapshotManager, Checkpointable, CloningSnapshotManager, SnapshotError,
    SnapshotManager, TransactionAction, TrialError,
};

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Commit,
    Abort,
    Fault,
    Panic,
}

fn ending_strategy() -> impl Strategy<Value = Ending> {
    prop_oneof![
        Just(Ending::Commit),
        Just(Ending::Abort),
        Just(Ending::Fault),
        Just(Ending::Panic),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Items(Vec<u32>);

impl Checkpointable for Items {
    type Checkpoint = Vec<u32>;

    fn checkpoint(&self) -> Result<Vec<u32>, BoxError> {
        Ok(self.0.clone())
    }

    fn restore(&mut self, checkpoint: Vec<u32>) {
        self.0 = checkpoint;
    }
}

/// Removes the listed values one by one, then ends as told.
struct Trial {
    remove: Vec<u32>,
    ending: Ending,
}

#[async_trait]
impl TransactionAction<Items> for Trial {
    type Output = usize;
    type Abort = ();

    async fn run(self, context: &mut Items) -> Result<usize, TrialError<()>> {
        for value in &self.remove {
            context.0.retain(|x| x != value);
            tokio::task::yield_now().await;
        }
        match self.ending {
            Ending::Commit => Ok(context.0.len()),
            Ending::Abort => Err(TrialError::Abort(())),
            Ending::Fault => Err(TrialError::fault("fault")),
            Ending::Panic => panic!("trial panicked"),
        }
    }
}

async fn replay<M: SnapshotManager<Context = Items>>(
    mut manager: M,
    trials: &[(Vec<u32>, Ending)],
) -> Result<(), TestCaseError> {
    let mut model = manager.context().0.clone();
    for (remove, ending) in trials {
        let result = manager
            .transaction(Trial {
                remove: remove.clone(),
                ending: *ending,
            })
            .await;
        match ending {
            Ending::Commit => {
                model.retain(|x| !remove.contains(x));
                prop_assert_eq!(result.ok(), Some(model.len()));
            }
            Ending::Abort => prop_assert!(matches!(result, Err(SnapshotError::Aborted(())))),
            Ending::Fault | Ending::Panic => {
                prop_assert!(matches!(result, Err(SnapshotError::TransactionFailed(_))))
            }
        }
        prop_assert_eq!(&manager.context().0, &model);
    }
    Ok(())
}

fn trials_strategy() -> impl Strategy<Value = (Vec<u32>, Vec<(Vec<u32>, Ending)>)> {
    let items = prop::collection::vec(0u32..32, 0..24);
    let trials = prop::collection::vec(
        (prop::collection::vec(0u32..32, 0..6), ending_strategy()),
        0..16,
    );
    (items, trials)
}

// ============================================================================
// Atomicity
// ============================================================================

proptest! {
    #[test]
    fn cloning_transactions_are_atomic((items, trials) in trials_strategy()) {
        block_on(replay(CloningSnapshotManager::new(Items(items)), &trials))?;
    }

    #[test]
    fn checkpoint_transactions_are_atomic((items, trials) in trials_strategy()) {
        block_on(replay(CheckpointSnapshotManager::new(Items(items)), &trials))?;
    }
}
