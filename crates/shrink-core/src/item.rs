//! Items and levels.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A unit of the artifact that the reducer may delete.
///
/// Ordering must be deterministic: it decides the order of items inside a
/// level and therefore which minimal subset is found. Blanket-implemented for
/// every type that satisfies the bounds.
pub trait DdItem: Clone + Ord + fmt::Debug + Send + Sync + 'static {}

impl<T> DdItem for T where T: Clone + Ord + fmt::Debug + Send + Sync + 'static {}

/// An ordered, duplicate-free sequence of items minimized in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level<T> {
    items: Vec<T>,
}

impl<T: DdItem> Level<T> {
    /// Create a level, dropping repeated items but keeping first occurrences in order.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let mut seen = BTreeSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();
        Self { items }
    }

    /// An empty level.
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: DdItem> FromIterator<T> for Level<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}
