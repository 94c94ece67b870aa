//! Delta debugging over dependency graphs.
//!
//! Items are put into a [`DependencyGraph`], cycles are collapsed by
//! [`condense`], and [`GraphDd`] deletes whole layers of the resulting DAG
//! through the hierarchical driver.

pub mod condensation;
pub mod cut;
pub mod dd;
pub mod dependency;
pub mod layer;
pub mod union_find;

pub use condensation::{condense, Component, ComponentId, CondensedGraph};
pub use cut::{CondensedTester, FlatGraphTester, GraphPropertyTester};
pub use dd::{GraphDd, GraphDdResult};
pub use dependency::{DependencyGraph, DependencyGraphBuilder};
pub use layer::{GraphLayerGenerator, LayerTester};
pub use union_find::UnionFind;
