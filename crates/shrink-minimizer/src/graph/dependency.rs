//! Dependency graphs between items.
//!
//! Items live in an arena and are referred to by their insertion index. An
//! edge `from -> to` means `from` depends on `to`: deleting `to` forces the
//! deletion of `from`.

use std::collections::{BTreeMap, BTreeSet};

use shrink_core::DdItem;

use super::union_find::UnionFind;

/// An immutable arena graph over items.
#[derive(Debug, Clone)]
pub struct DependencyGraph<T> {
    items: Vec<T>,
    index: BTreeMap<T, usize>,
    successors: Vec<Vec<usize>>,
}

impl<T: DdItem> DependencyGraph<T> {
    pub fn builder() -> DependencyGraphBuilder<T> {
        DependencyGraphBuilder::new()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in arena order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn item(&self, vertex: usize) -> &T {
        &self.items[vertex]
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.index.get(item).copied()
    }

    /// Vertices `vertex` depends on, ascending and without duplicates.
    pub fn successors(&self, vertex: usize) -> &[usize] {
        &self.successors[vertex]
    }

    pub(crate) fn adjacency(&self) -> &[Vec<usize>] {
        &self.successors
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }
}

/// Collects items, dependencies and equivalences before freezing them into a
/// [`DependencyGraph`].
#[derive(Debug, Clone)]
pub struct DependencyGraphBuilder<T> {
    items: Vec<T>,
    index: BTreeMap<T, usize>,
    successors: Vec<BTreeSet<usize>>,
    equivalences: Vec<(usize, usize)>,
}

impl<T: DdItem> Default for DependencyGraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DdItem> DependencyGraphBuilder<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: BTreeMap::new(),
            successors: Vec::new(),
            equivalences: Vec::new(),
        }
    }

    /// Add `item` if it is not known yet and return its arena index.
    pub fn add_item(&mut self, item: T) -> usize {
        if let Some(&vertex) = self.index.get(&item) {
            return vertex;
        }
        let vertex = self.items.len();
        self.index.insert(item.clone(), vertex);
        self.items.push(item);
        self.successors.push(BTreeSet::new());
        vertex
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: T, to: T) -> &mut Self {
        let from = self.add_item(from);
        let to = self.add_item(to);
        self.successors[from].insert(to);
        self
    }

    /// Record that `a` and `b` may only be deleted together.
    pub fn add_equivalence(&mut self, a: T, b: T) -> &mut Self {
        let a = self.add_item(a);
        let b = self.add_item(b);
        self.equivalences.push((a, b));
        self
    }

    /// Freeze the graph. Each equivalence group is linked into a cycle so
    /// that condensation turns it into a single vertex.
    pub fn build(mut self) -> DependencyGraph<T> {
        let mut sets = UnionFind::new(self.items.len());
        for &(a, b) in &self.equivalences {
            sets.union(a, b);
        }
        for group in sets.groups() {
            for (position, &vertex) in group.iter().enumerate() {
                let next = group[(position + 1) % group.len()];
                self.successors[vertex].insert(next);
            }
        }

        DependencyGraph {
            items: self.items,
            index: self.index,
            successors: self
                .successors
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
        }
    }
}

impl<T: DdItem> FromIterator<(T, T)> for DependencyGraph<T> {
    /// Build a graph from `(from, to)` dependency pairs.
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        let mut builder = DependencyGraphBuilder::new();
        for (from, to) in iter {
            builder.add_dependency(from, to);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_are_interned() {
        let mut builder = DependencyGraph::builder();
        assert_eq!(builder.add_item("a"), 0);
        assert_eq!(builder.add_item("b"), 1);
        assert_eq!(builder.add_item("a"), 0);
        builder.add_dependency("c", "a").add_dependency("c", "a");

        let graph = builder.build();
        assert_eq!(graph.items(), &["a", "b", "c"]);
        assert_eq!(graph.index_of(&"c"), Some(2));
        assert_eq!(graph.successors(2), &[0]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_equivalences_become_cycles() {
        let mut builder = DependencyGraph::builder();
        builder
            .add_equivalence("base", "override")
            .add_equivalence("override", "other")
            .add_item("alone");

        let graph = builder.build();
        assert_eq!(graph.successors(0), &[1]);
        assert_eq!(graph.successors(1), &[2]);
        assert_eq!(graph.successors(2), &[0]);
        assert!(graph.successors(3).is_empty());
    }

    #[test]
    fn test_from_pairs() {
        let graph: DependencyGraph<u32> = vec![(1, 2), (2, 3)].into_iter().collect();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.successors(0), &[1]);
    }
}
