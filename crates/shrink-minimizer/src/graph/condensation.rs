//! Strongly connected component condensation.
//!
//! Items on a dependency cycle can only be deleted together, so every SCC
//! of the dependency graph becomes one vertex of an acyclic condensed graph.
//! Components are found with an iterative version of Tarjan's algorithm and
//! numbered in topological order: every condensed edge goes from a lower to
//! a higher [`ComponentId`].

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use shrink_core::{Cut, DdItem};

use super::dependency::DependencyGraph;

/// Index of a vertex of the condensed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scc#{}", self.0)
    }
}

/// One strongly connected component.
#[derive(Debug, Clone)]
pub struct Component<T> {
    /// Member items in arena order.
    pub items: Vec<T>,

    /// Arena indices of the members, ascending.
    pub vertices: Vec<usize>,

    /// Dependencies between members, self-loops included.
    pub internal_edges: Vec<(T, T)>,
}

impl<T> Component<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True for a component made of more than one item or of an item that depends on itself.
    pub fn is_cyclic(&self) -> bool {
        self.items.len() > 1 || !self.internal_edges.is_empty()
    }
}

/// Acyclic graph of strongly connected components.
#[derive(Debug, Clone)]
pub struct CondensedGraph<T> {
    components: Vec<Component<T>>,
    successors: Vec<Vec<ComponentId>>,
    predecessors: Vec<Vec<ComponentId>>,
    component_of: Vec<ComponentId>,
}

impl<T: DdItem> CondensedGraph<T> {
    /// Condense `graph`.
    pub fn from_graph(graph: &DependencyGraph<T>) -> Self {
        let adjacency = graph.adjacency();
        let mut sccs = TarjanState::new(adjacency.len()).run(adjacency);
        // Tarjan emits a component only after everything it reaches.
        sccs.reverse();

        let mut component_of = vec![ComponentId(0); graph.len()];
        for (id, members) in sccs.iter().enumerate() {
            for &vertex in members {
                component_of[vertex] = ComponentId(id);
            }
        }

        let mut successors = vec![BTreeSet::new(); sccs.len()];
        let mut predecessors = vec![BTreeSet::new(); sccs.len()];
        let mut internal_edges = vec![Vec::new(); sccs.len()];
        for (from, targets) in adjacency.iter().enumerate() {
            let from_component = component_of[from];
            for &to in targets {
                let to_component = component_of[to];
                if from_component == to_component {
                    internal_edges[from_component.0]
                        .push((graph.item(from).clone(), graph.item(to).clone()));
                } else {
                    successors[from_component.0].insert(to_component);
                    predecessors[to_component.0].insert(from_component);
                }
            }
        }

        let components: Vec<Component<T>> = sccs
            .into_iter()
            .zip(internal_edges)
            .map(|(vertices, internal_edges)| Component {
                items: vertices.iter().map(|&v| graph.item(v).clone()).collect(),
                vertices,
                internal_edges,
            })
            .collect();

        debug!(
            vertices = graph.len(),
            components = components.len(),
            cyclic = components.iter().filter(|c| c.is_cyclic()).count(),
            "Condensed dependency graph"
        );

        Self {
            components,
            successors: successors.into_iter().map(|s| s.into_iter().collect()).collect(),
            predecessors: predecessors.into_iter().map(|s| s.into_iter().collect()).collect(),
            component_of,
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component ids in topological order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = ComponentId> {
        (0..self.components.len()).map(ComponentId)
    }

    pub fn component(&self, id: ComponentId) -> &Component<T> {
        &self.components[id.0]
    }

    pub fn components(&self) -> &[Component<T>] {
        &self.components
    }

    /// Components `id` depends on.
    pub fn successors(&self, id: ComponentId) -> &[ComponentId] {
        &self.successors[id.0]
    }

    /// Components depending on `id`.
    pub fn predecessors(&self, id: ComponentId) -> &[ComponentId] {
        &self.predecessors[id.0]
    }

    pub fn out_degree(&self, id: ComponentId) -> usize {
        self.successors[id.0].len()
    }

    /// Components that depend on nothing.
    pub fn sinks(&self) -> Vec<ComponentId> {
        self.ids().filter(|&id| self.out_degree(id) == 0).collect()
    }

    /// Component containing the arena vertex `vertex`.
    pub fn component_of_vertex(&self, vertex: usize) -> ComponentId {
        self.component_of[vertex]
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// Kahn's check: true when every component can be ordered.
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: VecDeque<usize> = (0..self.len()).filter(|&c| in_degree[c] == 0).collect();
        let mut visited = 0;
        while let Some(component) = ready.pop_front() {
            visited += 1;
            for next in &self.successors[component] {
                in_degree[next.0] -= 1;
                if in_degree[next.0] == 0 {
                    ready.push_back(next.0);
                }
            }
        }
        visited == self.len()
    }

    /// Length of the longest dependency chain from each component down to a sink.
    pub fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0; self.len()];
        for component in (0..self.len()).rev() {
            depths[component] = self.successors[component]
                .iter()
                .map(|next| depths[next.0] + 1)
                .max()
                .unwrap_or(0);
        }
        depths
    }

    /// Items of `ids`, in arena order.
    pub fn expand(&self, ids: &[ComponentId]) -> Vec<T> {
        let mut vertices: Vec<usize> = ids
            .iter()
            .flat_map(|id| self.components[id.0].vertices.iter().copied())
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
            .into_iter()
            .map(|vertex| {
                let component = &self.components[self.component_of[vertex].0];
                let position = component.vertices.partition_point(|&v| v < vertex);
                component.items[position].clone()
            })
            .collect()
    }

    /// Expand both sides of a cut into items.
    pub fn expand_cut(&self, cut: &Cut<ComponentId>) -> Cut<T> {
        Cut::new(self.expand(&cut.retained), self.expand(&cut.deleted))
    }
}

/// Collapse every strongly connected component of `graph` into one vertex.
pub fn condense<T: DdItem>(graph: &DependencyGraph<T>) -> CondensedGraph<T> {
    CondensedGraph::from_graph(graph)
}

/// Bookkeeping of an iterative Tarjan run.
struct TarjanState {
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl TarjanState {
    fn new(len: usize) -> Self {
        Self {
            index: vec![None; len],
            lowlink: vec![0; len],
            on_stack: vec![false; len],
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        }
    }

    /// Components in reverse topological order, members ascending.
    fn run(mut self, adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
        for root in 0..adjacency.len() {
            if self.index[root].is_none() {
                self.visit(root, adjacency);
            }
        }
        self.components
    }

    fn open(&mut self, vertex: usize) {
        self.index[vertex] = Some(self.next_index);
        self.lowlink[vertex] = self.next_index;
        self.next_index += 1;
        self.stack.push(vertex);
        self.on_stack[vertex] = true;
    }

    fn visit(&mut self, root: usize, adjacency: &[Vec<usize>]) {
        // Explicit call stack of (vertex, next edge to follow).
        let mut frames = vec![(root, 0usize)];
        self.open(root);

        while let Some(frame) = frames.last_mut() {
            let (vertex, edge) = *frame;
            if let Some(&next) = adjacency[vertex].get(edge) {
                frame.1 += 1;
                match self.index[next] {
                    None => {
                        self.open(next);
                        frames.push((next, 0));
                    }
                    Some(next_index) if self.on_stack[next] => {
                        self.lowlink[vertex] = self.lowlink[vertex].min(next_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                self.lowlink[parent] = self.lowlink[parent].min(self.lowlink[vertex]);
            }

            if Some(self.lowlink[vertex]) == self.index[vertex] {
                let mut members = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack[member] = false;
                    members.push(member);
                    if member == vertex {
                        break;
                    }
                }
                members.sort_unstable();
                self.components.push(members);
            }
        }
    }
}
