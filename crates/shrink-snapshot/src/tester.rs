//! Property tester that keeps a deletion only if the failure is unchanged.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use shrink_core::{DdItem, MinimizationError, PropertyTestResult, PropertyTester, PropertyTesterError};

use crate::error::{CheckError, FaultDisplay, SnapshotError, TrialError};
use crate::listener::PropertyCheckingListener;
use crate::manager::{SnapshotManager, TransactionAction};
use crate::oracle::{BuildExceptionProvider, ExceptionComparator, ItemLens};

type Listeners<C, T, S> = Vec<Arc<dyn PropertyCheckingListener<C, T, S>>>;

/// Tests a deletion inside a transaction: apply it through the lens, run the
/// oracle, and compare the failure with the one recorded at creation.
///
/// | Outcome                         | Result            |
/// |---------------------------------|-------------------|
/// | same failure                    | commit            |
/// | check passes                    | `NoProperty`      |
/// | different failure               | `NoProperty`      |
/// | oracle error                    | `UnknownProperty` |
/// | lens fault or panic             | `UnknownProperty` |
/// | cancellation                    | `UnknownProperty` |
///
/// Anything but a commit leaves the committed context untouched. A cancelled
/// trial has no verdict of its own: algorithms sharing the token see it fired
/// after the trial and stop with `MinimizerError::Cancelled`.
pub struct SameFailurePropertyTester<C, T, S>
where
    C: Send + Sync,
    T: DdItem,
{
    oracle: Arc<dyn BuildExceptionProvider<C, Signature = S>>,
    comparator: Arc<dyn ExceptionComparator<S>>,
    lens: Arc<dyn ItemLens<C, T>>,
    initial: S,
    listeners: Listeners<C, T, S>,
    faults: usize,
    _items: PhantomData<fn() -> T>,
}

impl<C, T, S> SameFailurePropertyTester<C, T, S>
where
    C: Send + Sync,
    T: DdItem,
    S: Clone + Debug + Send + Sync,
{
    /// Run the oracle on `context` and record its failure as the one to keep.
    ///
    /// Fails with [`MinimizationError::PropertyCheckerFailed`] if the context
    /// does not fail or the oracle cannot run.
    pub async fn create(
        context: &C,
        oracle: Arc<dyn BuildExceptionProvider<C, Signature = S>>,
        comparator: Arc<dyn ExceptionComparator<S>>,
        lens: Arc<dyn ItemLens<C, T>>,
    ) -> Result<Self, MinimizationError> {
        let initial = match oracle.check_compilation(context).await {
            Ok(signature) => signature,
            Err(CheckError::NoFailure) => {
                return Err(MinimizationError::PropertyCheckerFailed(
                    "the input does not fail".into(),
                ))
            }
            Err(CheckError::Oracle(message)) => {
                return Err(MinimizationError::PropertyCheckerFailed(message))
            }
        };
        info!(signature = ?initial, "Recorded initial failure");

        Ok(Self {
            oracle,
            comparator,
            lens,
            initial,
            listeners: Vec::new(),
            faults: 0,
            _items: PhantomData,
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn PropertyCheckingListener<C, T, S>>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// The failure every trial has to reproduce.
    pub fn initial_failure(&self) -> &S {
        &self.initial
    }

    /// Trials that ended in a fault rather than a verdict.
    pub fn faults(&self) -> usize {
        self.faults
    }

    fn notify(&self, hook: impl Fn(&dyn PropertyCheckingListener<C, T, S>)) {
        for listener in &self.listeners {
            hook(listener.as_ref());
        }
    }
}

/// One trial, run as a transaction.
struct FocusAndCheck<'a, C, T, S>
where
    C: Send + Sync,
    T: DdItem,
{
    tester: &'a SameFailurePropertyTester<C, T, S>,
    deleted: &'a [T],
}

#[async_trait]
impl<'a, C, T, S> TransactionAction<C> for FocusAndCheck<'a, C, T, S>
where
    C: Send + Sync,
    T: DdItem,
    S: Clone + Debug + Send + Sync,
{
    type Output = ();
    type Abort = PropertyTesterError;

    async fn run(self, context: &mut C) -> Result<(), TrialError<PropertyTesterError>> {
        let tester = self.tester;

        tester.notify(|l| l.before_focus(context, self.deleted));
        tester
            .lens
            .focus_on(self.deleted, context)
            .await
            .map_err(TrialError::Fault)?;
        tester.notify(|l| l.on_successful_focus(context));

        let current = match tester.oracle.check_compilation(context).await {
            Ok(signature) => signature,
            Err(CheckError::NoFailure) => {
                tester.notify(|l| l.on_successful_compilation(context));
                return Err(TrialError::Abort(PropertyTesterError::NoProperty));
            }
            Err(CheckError::Oracle(message)) => {
                debug!(error = %message, "Oracle could not decide");
                return Err(TrialError::Abort(PropertyTesterError::UnknownProperty));
            }
        };
        tester.notify(|l| l.on_failed_compilation(context, &current));

        let equal = tester.comparator.are_equal(&tester.initial, &current);
        tester.notify(|l| l.on_compared_exceptions(context, &tester.initial, &current, equal));
        if equal {
            Ok(())
        } else {
            Err(TrialError::Abort(PropertyTesterError::NoProperty))
        }
    }
}

#[async_trait]
impl<M, C, T, S> PropertyTester<M, T> for SameFailurePropertyTester<C, T, S>
where
    M: SnapshotManager<Context = C>,
    C: Send + Sync,
    T: DdItem,
    S: Clone + Debug + Send + Sync,
{
    async fn test(&mut self, env: &mut M, _retained: &[T], deleted: &[T]) -> PropertyTestResult {
        let trial = FocusAndCheck {
            tester: &*self,
            deleted,
        };
        match env.transaction(trial).await {
            Ok(()) => Ok(()),
            Err(SnapshotError::Aborted(reason)) => Err(reason),
            Err(SnapshotError::Cancelled) => {
                debug!(deleted = deleted.len(), "Trial cancelled");
                Err(PropertyTesterError::UnknownProperty)
            }
            Err(err) => {
                self.faults += 1;
                warn!(deleted = deleted.len(), error = %FaultDisplay(&err), "Trial did not complete");
                Err(PropertyTesterError::UnknownProperty)
            }
        }
    }

    async fn on_empty_level(&mut self, env: &mut M) {
        let context = env.context();
        self.notify(|l| l.on_empty_level(context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloning::CloningSnapshotManager;
    use crate::error::BoxError;
    use crate::oracle::EqualityComparator;
    use std::sync::Mutex;

    /// Fails while 3 is present; the message also depends on 5.
    struct SumOracle;

    #[async_trait]
    impl BuildExceptionProvider<Vec<u32>> for SumOracle {
        type Signature = &'static str;

        async fn check_compilation(&self, context: &Vec<u32>) -> Result<&'static str, CheckError> {
            if context.contains(&99) {
                return Err(CheckError::Oracle("flaky".into()));
            }
            match (context.contains(&3), context.contains(&5)) {
                (true, true) => Ok("three and five"),
                (true, false) => Ok("three"),
                _ => Err(CheckError::NoFailure),
            }
        }
    }

    struct RemoveLens;

    #[async_trait]
    impl ItemLens<Vec<u32>, u32> for RemoveLens {
        async fn focus_on(&self, items: &[u32], context: &mut Vec<u32>) -> Result<(), BoxError> {
            if items.contains(&42) {
                context.clear();
                return Err("cannot delete 42".into());
            }
            context.retain(|x| !items.contains(x));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl PropertyCheckingListener<Vec<u32>, u32, &'static str> for Recorder {
        fn on_empty_level(&self, _context: &Vec<u32>) {
            self.0.lock().unwrap().push("empty".into());
        }

        fn before_focus(&self, _context: &Vec<u32>, deleted: &[u32]) {
            self.0.lock().unwrap().push(format!("focus {:?}", deleted));
        }

        fn on_successful_compilation(&self, _context: &Vec<u32>) {
            self.0.lock().unwrap().push("passed".into());
        }

        fn on_compared_exceptions(
            &self,
            _context: &Vec<u32>,
            _initial: &&'static str,
            current: &&'static str,
            equal: bool,
        ) {
            self.0.lock().unwrap().push(format!("{} {}", current, equal));
        }
    }

    async fn tester(context: &Vec<u32>) -> SameFailurePropertyTester<Vec<u32>, u32, &'static str> {
        SameFailurePropertyTester::create(
            context,
            Arc::new(SumOracle),
            Arc::new(EqualityComparator),
            Arc::new(RemoveLens),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_same_failure_commits() {
        let mut manager = CloningSnapshotManager::new(vec![1, 3, 4]);
        let mut tester = tester(manager.context()).await;
        assert_eq!(tester.initial_failure(), &"three");

        assert_eq!(tester.test(&mut manager, &[3, 4], &[1]).await, Ok(()));
        assert_eq!(manager.context(), &vec![3, 4]);
    }

    #[tokio::test]
    async fn test_passing_check_is_no_property() {
        let mut manager = CloningSnapshotManager::new(vec![1, 3]);
        let mut tester = tester(manager.context()).await;
        assert_eq!(
            tester.test(&mut manager, &[1], &[3]).await,
            Err(PropertyTesterError::NoProperty)
        );
        assert_eq!(manager.context(), &vec![1, 3]);
    }

    #[tokio::test]
    async fn test_different_failure_is_no_property() {
        let mut manager = CloningSnapshotManager::new(vec![3, 5, 7]);
        let mut tester = tester(manager.context()).await;
        assert_eq!(
            tester.test(&mut manager, &[3, 7], &[5]).await,
            Err(PropertyTesterError::NoProperty)
        );
        assert_eq!(manager.context(), &vec![3, 5, 7]);
    }

    #[tokio::test]
    async fn test_oracle_error_is_unknown_property() {
        let mut manager = CloningSnapshotManager::new(vec![3, 99, 7]);
        let mut tester = tester(&vec![3]).await;
        assert_eq!(
            tester.test(&mut manager, &[3, 99], &[7]).await,
            Err(PropertyTesterError::UnknownProperty)
        );
        assert_eq!(tester.faults(), 0);
    }

    #[tokio::test]
    async fn test_lens_fault_rolls_back() {
        let mut manager = CloningSnapshotManager::new(vec![3, 42]);
        let mut tester = tester(manager.context()).await;
        assert_eq!(
            tester.test(&mut manager, &[3], &[42]).await,
            Err(PropertyTesterError::UnknownProperty)
        );
        assert_eq!(manager.context(), &vec![3, 42]);
        assert_eq!(tester.faults(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_a_failure() {
        let err = SameFailurePropertyTester::<Vec<u32>, u32, &'static str>::create(
            &vec![1, 2],
            Arc::new(SumOracle),
            Arc::new(EqualityComparator),
            Arc::new(RemoveLens),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, MinimizationError::PropertyCheckerFailed(_)));
    }

    #[tokio::test]
    async fn test_listener_sees_each_step() {
        let recorder = Arc::new(Recorder::default());
        let mut manager = CloningSnapshotManager::new(vec![1, 3, 5]);
        let mut tester = tester(&vec![3]).await.with_listener(recorder.clone());

        tester.test(&mut manager, &[3, 5], &[1]).await.unwrap_err();
        tester.test(&mut manager, &[1, 5], &[3]).await.unwrap_err();
        tester.on_empty_level(&mut manager).await;

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "focus [1]".to_string(),
                "three and five false".to_string(),
                "focus [3]".to_string(),
                "passed".to_string(),
                "empty".to_string(),
            ]
        );
    }
}
