//! Delta debugging over dependency graphs.

use std::sync::Arc;

use tracing::info;

use shrink_core::{DdItem, MinimizationError, PropertyTester};

use super::condensation::{ComponentId, CondensedGraph};
use super::cut::{CondensedTester, FlatGraphTester, GraphPropertyTester};
use super::dependency::DependencyGraph;
use super::layer::GraphLayerGenerator;
use crate::adapters::{DdAlgorithmExt, ZeroTesting};
use crate::hierarchical::{HierarchicalConfig, HierarchicalDd};
use crate::result::HierarchicalReport;
use crate::traits::DdAlgorithm;

/// Items that survived a graph run, and the ones that were deleted.
#[derive(Debug, Clone)]
pub struct GraphDdResult<T> {
    /// Surviving items in arena order.
    pub retained: Vec<T>,

    /// Deleted items in arena order.
    pub deleted: Vec<T>,

    pub report: HierarchicalReport,
}

/// Minimizes the items of a dependency graph without ever keeping an item
/// whose dependencies were deleted.
///
/// The graph is condensed first so that cycles are deleted as a unit. Layers
/// run with zero testing so that a layer may lose its last component.
pub struct GraphDd<A> {
    driver: HierarchicalDd<ZeroTesting<A>>,
}

impl<A: DdAlgorithm> GraphDd<A> {
    pub fn new(algorithm: A) -> Self {
        Self::with_config(algorithm, HierarchicalConfig::default())
    }

    pub fn with_config(algorithm: A, config: HierarchicalConfig) -> Self {
        Self {
            driver: HierarchicalDd::with_config(algorithm.with_zero_testing(), config),
        }
    }

    /// Minimize `graph` against a flat item tester.
    pub async fn minimize<E, T, P>(
        &self,
        env: &mut E,
        graph: &DependencyGraph<T>,
        tester: P,
    ) -> Result<GraphDdResult<T>, MinimizationError>
    where
        E: Send,
        T: DdItem,
        P: PropertyTester<E, T>,
    {
        if graph.is_empty() {
            return Ok(GraphDdResult {
                retained: Vec::new(),
                deleted: Vec::new(),
                report: HierarchicalReport::default(),
            });
        }

        let condensed = Arc::new(CondensedGraph::from_graph(graph));
        let tester = CondensedTester::new(condensed.clone(), tester);
        let (survivors, report) = self.minimize_condensed(env, condensed.clone(), tester).await?;

        let dead: Vec<ComponentId> = condensed
            .ids()
            .filter(|id| !survivors.contains(id))
            .collect();

        let result = GraphDdResult {
            retained: condensed.expand(&survivors),
            deleted: condensed.expand(&dead),
            report,
        };
        info!(
            items = graph.len(),
            components = condensed.len(),
            retained = result.retained.len(),
            "Graph minimization complete"
        );
        Ok(result)
    }

    /// Minimize an already condensed graph against a cut tester.
    ///
    /// Returns the surviving components in topological order together with
    /// the run report.
    pub async fn minimize_condensed<E, T, G>(
        &self,
        env: &mut E,
        graph: Arc<CondensedGraph<T>>,
        tester: G,
    ) -> Result<(Vec<ComponentId>, HierarchicalReport), MinimizationError>
    where
        E: Send,
        T: DdItem,
        G: GraphPropertyTester<E, ComponentId>,
    {
        let mut generator = GraphLayerGenerator::new(graph, tester);
        let report = self.driver.minimize(env, &mut generator).await?;
        Ok((generator.layer_tester().alive_components(), report))
    }

    /// Minimize the condensed components as one flat level, ignoring
    /// dependency order. Useful when edges only express grouping.
    pub async fn minimize_flat<E, T, P>(
        &self,
        env: &mut E,
        graph: &DependencyGraph<T>,
        tester: P,
    ) -> Result<GraphDdResult<T>, MinimizationError>
    where
        E: Send,
        T: DdItem,
        P: PropertyTester<E, T>,
    {
        let condensed = Arc::new(CondensedGraph::from_graph(graph));
        let mut tester = FlatGraphTester::new(CondensedTester::new(condensed.clone(), tester));
        let ids: Vec<ComponentId> = condensed.ids().collect();

        let result = self.driver.algorithm().minimize(env, ids, &mut tester).await?;
        let mut report = HierarchicalReport::default();
        report.record_level(
            condensed.len(),
            result.retained.len(),
            result.deleted.len(),
            &result.stats,
        );

        Ok(GraphDdResult {
            retained: condensed.expand(&result.retained),
            deleted: condensed.expand(&result.deleted),
            report,
        })
    }
}
