//! Rollback guarantees and full runs through the snapshot managers.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shrink_core::{CancellationToken, MinimizationError, PropertyTester, PropertyTesterError};
use shrink_minimizer::{DdAlgorithmExt, DdMin, HierarchicalConfig, HierarchicalDd, TreeHierarchyGenerator};
use shrink_snapshot::{
    minimize_project, BoxError, BuildExceptionProvider, CheckError, CheckpointSnapshotManager,
    Checkpointable, CloningSnapshotManager, EqualityComparator, ItemLens,
    SameFailurePropertyTester, SnapshotError, SnapshotManager, TransactionAction, TrialError,
};

/// A document of numbered lines; line `n` belongs to block `n / 10`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Lines(BTreeSet<u32>);

impl Lines {
    fn blocks(blocks: u32, lines_per_block: u32) -> Self {
        Lines(
            (0..blocks)
                .flat_map(|block| (0..lines_per_block).map(move |line| block * 10 + line))
                .collect(),
        )
    }
}

impl Checkpointable for Lines {
    type Checkpoint = BTreeSet<u32>;

    fn checkpoint(&self) -> Result<BTreeSet<u32>, BoxError> {
        Ok(self.0.clone())
    }

    fn restore(&mut self, checkpoint: BTreeSet<u32>) {
        self.0 = checkpoint;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Unit {
    Block(u32),
    Line(u32),
}

fn children(unit: &Unit) -> Vec<Unit> {
    match unit {
        Unit::Block(block) => (0..4).map(|line| Unit::Line(block * 10 + line)).collect(),
        Unit::Line(_) => Vec::new(),
    }
}

/// Deletes blocks and lines; deleting line 77 fails halfway through.
struct LinesLens;

#[async_trait]
impl ItemLens<Lines, Unit> for LinesLens {
    async fn focus_on(&self, items: &[Unit], context: &mut Lines) -> Result<(), BoxError> {
        for item in items {
            match item {
                Unit::Block(block) => context.0.retain(|line| line / 10 != *block),
                Unit::Line(77) => return Err("line 77 is locked".into()),
                Unit::Line(line) => {
                    context.0.remove(line);
                }
            }
        }
        Ok(())
    }
}

/// Fails while lines 32 and 50 are both present.
struct NeedsTwoLines;

#[async_trait]
impl BuildExceptionProvider<Lines> for NeedsTwoLines {
    type Signature = String;

    async fn check_compilation(&self, context: &Lines) -> Result<String, CheckError> {
        if context.0.contains(&99) {
            panic!("oracle crashed");
        }
        if context.0.contains(&32) && context.0.contains(&50) {
            Ok("error: 32 conflicts with 50".to_string())
        } else {
            Err(CheckError::NoFailure)
        }
    }
}

async fn same_failure(context: &Lines) -> SameFailurePropertyTester<Lines, Unit, String> {
    SameFailurePropertyTester::create(
        context,
        Arc::new(NeedsTwoLines),
        Arc::new(EqualityComparator),
        Arc::new(LinesLens),
    )
    .await
    .unwrap()
}

/// Fails on the first check; on the second it cancels the run and hangs
/// like a command interrupted by Ctrl-C.
struct InterruptedOnSecondCheck {
    calls: AtomicUsize,
    token: CancellationToken,
}

#[async_trait]
impl BuildExceptionProvider<Lines> for InterruptedOnSecondCheck {
    type Signature = String;

    async fn check_compilation(&self, _context: &Lines) -> Result<String, CheckError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            self.token.cancel();
            futures::future::pending::<()>().await;
        }
        Ok("error: boom".to_string())
    }
}

/// Removes a line and then fails.
struct RemoveThenFail(u32);

#[async_trait]
impl TransactionAction<Lines> for RemoveThenFail {
    type Output = ();
    type Abort = ();

    async fn run(self, context: &mut Lines) -> Result<(), TrialError<()>> {
        context.0.remove(&self.0);
        Err(TrialError::fault(format!("failed after removing {}", self.0)))
    }
}

/// Removes a line and then never finishes.
struct RemoveThenHang(u32);

#[async_trait]
impl TransactionAction<Lines> for RemoveThenHang {
    type Output = ();
    type Abort = ();

    async fn run(self, context: &mut Lines) -> Result<(), TrialError<()>> {
        context.0.remove(&self.0);
        futures::future::pending::<()>().await;
        Ok(())
    }
}

async fn fault_leaves_context_unchanged<M: SnapshotManager<Context = Lines>>(mut manager: M) {
    let before = manager.context().clone();

    let first = manager.transaction(RemoveThenFail(3)).await.unwrap_err();
    assert!(matches!(&first, SnapshotError::TransactionFailed(cause) if cause.to_string() == "failed after removing 3"));
    assert_eq!(manager.context(), &before);

    // The same transaction again sees the same state and fails the same way.
    let second = manager.transaction(RemoveThenFail(3)).await.unwrap_err();
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
    assert_eq!(manager.context(), &before);
}

#[tokio::test]
async fn fault_mid_mutation_rolls_back() {
    fault_leaves_context_unchanged(CloningSnapshotManager::new(Lines::blocks(2, 4))).await;
    fault_leaves_context_unchanged(CheckpointSnapshotManager::new(Lines::blocks(2, 4))).await;
}

#[tokio::test]
async fn faulted_trials_are_unknown_and_repeatable() {
    let mut context = Lines::blocks(8, 4);
    context.0.insert(77);
    let mut manager = CloningSnapshotManager::new(context.clone());
    let mut tester = same_failure(manager.context()).await;

    let retained = [Unit::Line(32), Unit::Line(50)];
    let deleted = [Unit::Line(1), Unit::Line(77)];
    for _ in 0..2 {
        let verdict = tester.test(&mut manager, &retained, &deleted).await;
        assert_eq!(verdict, Err(PropertyTesterError::UnknownProperty));
        assert_eq!(manager.context(), &context);
    }
    assert_eq!(tester.faults(), 2);
    assert_eq!(manager.commits(), 0);
}

#[tokio::test]
async fn oracle_panic_rolls_back() {
    let mut context = Lines::blocks(6, 4);
    context.0.insert(99);
    let mut manager = CheckpointSnapshotManager::new(context.clone());
    let mut tester = same_failure(&Lines::blocks(6, 4)).await;

    let verdict = tester
        .test(&mut manager, &[Unit::Block(3), Unit::Block(5)], &[Unit::Block(0)])
        .await;
    assert_eq!(verdict, Err(PropertyTesterError::UnknownProperty));
    assert_eq!(manager.context(), &context);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_transaction() {
    let token = CancellationToken::new();
    let mut manager = CheckpointSnapshotManager::new(Lines::blocks(1, 4)).with_cancellation(token.clone());

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = manager.transaction(RemoveThenHang(2)).await.unwrap_err();
    assert!(matches!(err, SnapshotError::Cancelled));
    assert_eq!(manager.context(), &Lines::blocks(1, 4));
    assert_eq!(manager.rollbacks(), 1);
}

#[tokio::test]
async fn reduces_blocks_then_lines() {
    let manager = CloningSnapshotManager::new(Lines::blocks(8, 4));
    let tester = same_failure(manager.context()).await;
    let roots: Vec<Unit> = (0..8).map(Unit::Block).collect();
    let mut generator = TreeHierarchyGenerator::new(roots, children, tester);

    let driver = HierarchicalDd::new(DdMin::with_defaults().with_zero_testing());
    let outcome = minimize_project(manager, &driver, &mut generator).await;

    let report = outcome.result.unwrap();
    assert_eq!(report.level_count(), 2);
    assert_eq!(outcome.context.0, BTreeSet::from([32, 50]));
}

#[tokio::test]
async fn stopped_run_keeps_committed_deletions() {
    let manager = CheckpointSnapshotManager::new(Lines::blocks(8, 4));
    let tester = same_failure(manager.context()).await;
    let roots: Vec<Unit> = (0..8).map(Unit::Block).collect();
    let mut generator = TreeHierarchyGenerator::new(roots, children, tester);

    let driver = HierarchicalDd::with_config(
        DdMin::with_defaults(),
        HierarchicalConfig::new().with_max_levels(1),
    );
    let outcome = minimize_project(manager, &driver, &mut generator).await;

    assert!(matches!(outcome.result, Err(MinimizationError::LevelLimitExceeded(1))));
    assert!(!outcome.is_complete());
    // Blocks 3 and 5 survive the first level in full.
    assert_eq!(outcome.context.0, BTreeSet::from([30, 31, 32, 33, 50, 51, 52, 53]));
}

#[tokio::test]
async fn cancelled_last_trial_is_not_a_complete_run() {
    let token = CancellationToken::new();
    let manager = CloningSnapshotManager::new(Lines::blocks(1, 4)).with_cancellation(token.clone());
    let oracle = InterruptedOnSecondCheck {
        calls: AtomicUsize::new(0),
        token: token.clone(),
    };
    let tester: SameFailurePropertyTester<Lines, Unit, String> = SameFailurePropertyTester::create(
        manager.context(),
        Arc::new(oracle),
        Arc::new(EqualityComparator),
        Arc::new(LinesLens),
    )
    .await
    .unwrap();

    // A single block: the only trial is the zero test, and it gets interrupted.
    let mut generator = TreeHierarchyGenerator::new(vec![Unit::Block(0)], children, tester);
    let driver = HierarchicalDd::new(
        DdMin::with_defaults()
            .with_cancellation(token.clone())
            .with_zero_testing(),
    );
    let outcome = minimize_project(manager, &driver, &mut generator).await;

    assert!(token.is_cancelled());
    assert!(matches!(&outcome.result, Err(err) if err.is_cancelled()));
    assert!(!outcome.is_complete());
    assert_eq!(outcome.context, Lines::blocks(1, 4));
    assert_eq!(generator.tester_ref().faults(), 0);
}
