//! Testers over cuts of a graph.

use std::sync::Arc;

use async_trait::async_trait;

use shrink_core::{Cut, DdItem, PropertyTestResult, PropertyTester};

use super::condensation::{ComponentId, CondensedGraph};

/// Decides whether a cut of graph vertices still exhibits the failure.
#[async_trait]
pub trait GraphPropertyTester<E: Send, V: DdItem>: Send {
    async fn test(&mut self, env: &mut E, cut: &Cut<V>) -> PropertyTestResult;

    /// Called when a layer of the graph has nothing to minimize.
    async fn on_empty_level(&mut self, _env: &mut E) {}
}

/// Feeds a flat retained/deleted split to a [`GraphPropertyTester`] as a cut.
///
/// Lets a base algorithm run directly over graph vertices when no
/// dependency closure is wanted.
pub struct FlatGraphTester<G> {
    inner: G,
}

impl<G> FlatGraphTester<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

#[async_trait]
impl<E, V, G> PropertyTester<E, V> for FlatGraphTester<G>
where
    E: Send,
    V: DdItem,
    G: GraphPropertyTester<E, V>,
{
    async fn test(&mut self, env: &mut E, retained: &[V], deleted: &[V]) -> PropertyTestResult {
        let cut = Cut::new(retained.to_vec(), deleted.to_vec());
        self.inner.test(env, &cut).await
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        self.inner.on_empty_level(env).await
    }
}

/// Expands cuts of condensed components into items for a flat tester.
pub struct CondensedTester<T, P> {
    graph: Arc<CondensedGraph<T>>,
    inner: P,
}

impl<T: DdItem, P> CondensedTester<T, P> {
    pub fn new(graph: Arc<CondensedGraph<T>>, inner: P) -> Self {
        Self { graph, inner }
    }

    pub fn graph(&self) -> &CondensedGraph<T> {
        &self.graph
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<E, T, P> GraphPropertyTester<E, ComponentId> for CondensedTester<T, P>
where
    E: Send,
    T: DdItem,
    P: PropertyTester<E, T>,
{
    async fn test(&mut self, env: &mut E, cut: &Cut<ComponentId>) -> PropertyTestResult {
        let expanded = self.graph.expand_cut(cut);
        self.inner.test(env, &expanded.retained, &expanded.deleted).await
    }

    async fn on_empty_level(&mut self, env: &mut E) {
        self.inner.on_empty_level(env).await
    }
}
