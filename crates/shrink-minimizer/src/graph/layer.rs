//! Layer-by-layer hierarchy over a condensed dependency graph.
//!
//! The first layer holds the sinks. A vertex joins a later layer once every
//! vertex it depends on has been kept in an earlier one. Deleting a vertex
//! also deletes everything that transitively depends on it, so a layer is
//! tested as the cut "layer deletions plus their dependents".

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use shrink_core::{Cut, DdItem, HierarchyBuildError, Level, PropertyTestResult, PropertyTester};

use super::condensation::{ComponentId, CondensedGraph};
use super::cut::GraphPropertyTester;
use crate::hierarchical::HierarchicalGenerator;
use crate::result::DdAlgorithmResult;

/// Turns a layer split into a cut of the whole graph.
pub struct LayerTester<T, G> {
    graph: Arc<CondensedGraph<T>>,
    alive: Vec<bool>,
    inner: G,
}

impl<T: DdItem, G> LayerTester<T, G> {
    pub fn new(graph: Arc<CondensedGraph<T>>, inner: G) -> Self {
        let alive = vec![true; graph.len()];
        Self { graph, alive, inner }
    }

    pub fn is_alive(&self, id: ComponentId) -> bool {
        self.alive[id.0]
    }

    /// `deleted` plus every live component that transitively depends on it.
    pub fn dependents_closure(&self, deleted: &[ComponentId]) -> Vec<bool> {
        let mut closure = vec![false; self.graph.len()];
        let mut pending: Vec<ComponentId> = Vec::new();
        for &id in deleted {
            if self.alive[id.0] && !closure[id.0] {
                closure[id.0] = true;
                pending.push(id);
            }
        }
        while let Some(id) = pending.pop() {
            for &dependent in self.graph.predecessors(id) {
                if self.alive[dependent.0] && !closure[dependent.0] {
                    closure[dependent.0] = true;
                    pending.push(dependent);
                }
            }
        }
        closure
    }

    /// Cut of every component given that `closure` is deleted on top of the dead ones.
    fn cut(&self, closure: &[bool]) -> Cut<ComponentId> {
        let (deleted, retained): (Vec<ComponentId>, Vec<ComponentId>) = self
            .graph
            .ids()
            .partition(|id| !self.alive[id.0] || closure[id.0]);
        Cut::new(retained, deleted)
    }

    /// Make the deletion of `deleted` and its dependents permanent.
    fn kill(&mut self, deleted: &[ComponentId]) -> usize {
        let closure = self.dependents_closure(deleted);
        let mut killed = 0;
        for (alive, dead) in self.alive.iter_mut().zip(closure) {
            if dead {
                *alive = false;
                killed += 1;
            }
        }
        killed
    }

    /// Components still alive, in topological order.
    pub fn alive_components(&self) -> Vec<ComponentId> {
        self.graph.ids().filter(|id| self.alive[id.0]).collect()
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<E, T, G> PropertyTester<E, ComponentId> for LayerTester<T, G>
where
    E: Send,
    T: DdItem,
    G: GraphPropertyTester<E, ComponentId>,
{
    async fn test(
        &mut self,
        env: &mut E,
        _retained: &[ComponentId],
        deleted: &[ComponentId],
    ) -> PropertyTestResult {
        let closure = self.dependents_closure(deleted);
        let cut = self.cut(&closure);
        self.inner.test(env, &cut).await
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        self.inner.on_empty_level(env).await
    }
}

/// Produces the layers of a condensed graph for the hierarchical driver.
pub struct GraphLayerGenerator<T, G> {
    graph: Arc<CondensedGraph<T>>,
    tester: LayerTester<T, G>,
    /// Per component, how many of its dependencies have been kept so far.
    inactive_count: Vec<usize>,
    depths: Vec<usize>,
    max_depth: usize,
}

impl<T: DdItem, G> GraphLayerGenerator<T, G> {
    pub fn new(graph: Arc<CondensedGraph<T>>, inner: G) -> Self {
        let depths = graph.depths();
        let max_depth = depths.iter().copied().max().unwrap_or(0);
        Self {
            tester: LayerTester::new(graph.clone(), inner),
            inactive_count: vec![0; graph.len()],
            depths,
            max_depth,
            graph,
        }
    }

    pub fn layer_tester(&self) -> &LayerTester<T, G> {
        &self.tester
    }

    pub fn into_layer_tester(self) -> LayerTester<T, G> {
        self.tester
    }

    fn log_progress(&self, layer: &[ComponentId]) {
        let depth = layer.iter().map(|id| self.depths[id.0]).max().unwrap_or(0);
        info!(
            layer = layer.len(),
            depth,
            max_depth = self.max_depth,
            "Graph layer"
        );
    }
}

#[async_trait]
impl<E, T, G> HierarchicalGenerator<E, ComponentId> for GraphLayerGenerator<T, G>
where
    E: Send,
    T: DdItem,
    G: GraphPropertyTester<E, ComponentId>,
{
    async fn first_level(&mut self, _env: &mut E) -> Result<Level<ComponentId>, HierarchyBuildError> {
        if self.graph.is_empty() {
            return Err(HierarchyBuildError::NoItems);
        }
        let sinks: Vec<ComponentId> = self
            .graph
            .sinks()
            .into_iter()
            .filter(|id| self.tester.is_alive(*id))
            .collect();
        if sinks.is_empty() {
            return Err(HierarchyBuildError::NoSinks);
        }
        self.log_progress(&sinks);
        Ok(Level::new(sinks))
    }

    async fn next_level(
        &mut self,
        _env: &mut E,
        result: &DdAlgorithmResult<ComponentId>,
    ) -> Option<Level<ComponentId>> {
        let killed = self.tester.kill(&result.deleted);
        debug!(
            deleted = result.deleted.len(),
            killed,
            "Removed deleted components and their dependents"
        );

        let mut candidates = Vec::new();
        for &kept in &result.retained {
            for &dependent in self.graph.predecessors(kept) {
                if self.tester.is_alive(dependent) {
                    self.inactive_count[dependent.0] += 1;
                    candidates.push(dependent);
                }
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let next: Vec<ComponentId> = candidates
            .into_iter()
            .filter(|&id| self.inactive_count[id.0] == self.graph.out_degree(id))
            .collect();
        if next.is_empty() {
            return None;
        }
        self.log_progress(&next);
        Some(Level::new(next))
    }

    fn tester(&mut self) -> &mut dyn PropertyTester<E, ComponentId> {
        &mut self.tester
    }
}
