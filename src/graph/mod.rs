//! Dependency graphs: a small generic directed graph with Tarjan's SCC
//! algorithm, and the frozen binding network one resolution pass exports.

mod directed;
mod export;
mod network;

pub use directed::DirectedGraph;
pub use export::Exporter;
pub use network::{
    BindingGraph, BindingNode, ComponentNode, DependencyEdge, Edge, EdgeId, MissingBinding, Node,
    NodeClass, NodeId, TopLevelBindingGraph,
};
