//! Observation hooks for the same-failure tester.

use std::fmt::Debug;

use tracing::{debug, trace};

/// Hooks called at each step of a trial. All hooks default to doing nothing.
///
/// Hooks run inside the transaction and see the working context, not the
/// committed one.
pub trait PropertyCheckingListener<C, T, S>: Send + Sync {
    fn on_empty_level(&self, _context: &C) {}

    fn before_focus(&self, _context: &C, _deleted: &[T]) {}

    fn on_successful_focus(&self, _context: &C) {}

    /// The check passed, so the failure is gone.
    fn on_successful_compilation(&self, _context: &C) {}

    fn on_failed_compilation(&self, _context: &C, _signature: &S) {}

    fn on_compared_exceptions(&self, _context: &C, _initial: &S, _current: &S, _equal: bool) {}
}

/// Logs every hook at `debug`/`trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl<C, T: Debug, S: Debug> PropertyCheckingListener<C, T, S> for LoggingListener {
    fn on_empty_level(&self, _context: &C) {
        debug!("Empty level");
    }

    fn before_focus(&self, _context: &C, deleted: &[T]) {
        trace!(count = deleted.len(), ?deleted, "Focusing");
    }

    fn on_successful_focus(&self, _context: &C) {
        trace!("Focus applied");
    }

    fn on_successful_compilation(&self, _context: &C) {
        debug!("Check passed, failure is gone");
    }

    fn on_failed_compilation(&self, _context: &C, signature: &S) {
        trace!(?signature, "Check failed");
    }

    fn on_compared_exceptions(&self, _context: &C, initial: &S, current: &S, equal: bool) {
        if equal {
            trace!(?current, "Same failure");
        } else {
            debug!(?initial, ?current, "Different failure");
        }
    }
}
