//! Bipartitions of graph vertices.

use serde::{Deserialize, Serialize};

/// A split of graph vertices into the ones that stay and the ones that go.
///
/// In graph mode a vertex may stand for a whole group of items, so a cut is
/// expanded back into items before it reaches a flat tester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cut<V> {
    pub retained: Vec<V>,
    pub deleted: Vec<V>,
}

impl<V> Cut<V> {
    pub fn new(retained: Vec<V>, deleted: Vec<V>) -> Self {
        Self { retained, deleted }
    }

    /// Total number of vertices on both sides.
    pub fn len(&self) -> usize {
        self.retained.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty() && self.deleted.is_empty()
    }
}

impl<V> Default for Cut<V> {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}
