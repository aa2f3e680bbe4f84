use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::Serialize;

use super::DirectedGraph;
use crate::descriptor::{
    ComponentDescriptor, ComponentId, ComponentRequirement, ComponentTree, FactoryMethod,
    SubcomponentDeclaration,
};
use crate::model::{Binding, ComponentPath, DependencyRequest, ElementRef, Key, ModuleRef, Scope};

pub type NodeId = NodeIndex<u32>;
pub type EdgeId = EdgeIndex<u32>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentNode {
    pub id: ComponentId,
    pub path: ComponentPath,
    pub is_subcomponent: bool,
    pub is_production: bool,
    pub scopes: BTreeSet<Scope>,
    pub entry_points: Vec<DependencyRequest>,
}

/// A binding placed in the component that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BindingNode {
    pub owner: ComponentId,
    pub path: ComponentPath,
    pub binding: Binding,
}

/// A key that nothing binds, requested from `component`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissingBinding {
    pub component: ComponentId,
    pub path: ComponentPath,
    pub key: Key,
    /// Components of the same tree, outside this one's lineage, that do
    /// bind the key.
    pub bound_elsewhere: Vec<ComponentPath>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeClass {
    Component,
    Binding,
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Node {
    Component(ComponentNode),
    Binding(BindingNode),
    Missing(MissingBinding),
}

impl Node {
    pub fn class(&self) -> NodeClass {
        match self {
            Node::Component(_) => NodeClass::Component,
            Node::Binding(_) => NodeClass::Binding,
            Node::Missing(_) => NodeClass::Missing,
        }
    }

    /// The component the node lives in.
    pub fn component(&self) -> ComponentId {
        match self {
            Node::Component(c) => c.id,
            Node::Binding(b) => b.owner,
            Node::Missing(m) => m.component,
        }
    }

    pub fn path(&self) -> &ComponentPath {
        match self {
            Node::Component(c) => &c.path,
            Node::Binding(b) => &b.path,
            Node::Missing(m) => &m.path,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Node::Component(_) => None,
            Node::Binding(b) => Some(&b.binding.key),
            Node::Missing(m) => Some(&m.key),
        }
    }

    pub fn as_binding(&self) -> Option<&BindingNode> {
        match self {
            Node::Binding(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentNode> {
        match self {
            Node::Component(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Component(c) => write!(f, "component {}", c.path),
            Node::Binding(b) => write!(f, "{} in {}", b.binding, b.path),
            Node::Missing(m) => write!(f, "missing {} in {}", m.key, m.path),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub request: DependencyRequest,
    /// Set for edges from a component node to what one of its entry points
    /// requests.
    pub entry_point: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Edge {
    Dependency(DependencyEdge),
    /// From a parent component to a child it creates through a factory
    /// method.
    ChildFactoryMethod { element: ElementRef },
    /// From a subcomponent creator binding to the child it creates.
    SubcomponentCreator {
        declarations: BTreeSet<SubcomponentDeclaration>,
    },
}

impl Edge {
    pub fn as_dependency(&self) -> Option<&DependencyEdge> {
        match self {
            Edge::Dependency(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Dependency(d) if d.entry_point => write!(f, "entry point {}", d.request),
            Edge::Dependency(d) => write!(f, "{}", d.request),
            Edge::ChildFactoryMethod { element } => write!(f, "factory method {}", element),
            Edge::SubcomponentCreator { .. } => write!(f, "creates"),
        }
    }
}

/// The frozen binding network of one root component and every component
/// resolved beneath it.
#[derive(Debug)]
pub struct TopLevelBindingGraph {
    pub(super) network: StableDiGraph<Node, Edge>,
    pub(super) tree: ComponentTree,
    pub(super) full_binding_graph: bool,
    pub(super) component_nodes: BTreeMap<ComponentId, NodeId>,
    pub(super) nodes_by_class: BTreeMap<NodeClass, Vec<NodeId>>,
    pub(super) bindings_by_component: BTreeMap<ComponentId, Vec<NodeId>>,
    /// Modules installed by the ancestors of each component, by component
    /// index.
    pub(super) inherited_modules: Vec<BTreeSet<ModuleRef>>,
    pub(super) sccs: Vec<Vec<NodeId>>,
    /// Indices into `sccs` of the cycles touching each component.
    pub(super) sccs_by_component: BTreeMap<ComponentId, Vec<usize>>,
    pub(super) fingerprint: u64,
}

impl TopLevelBindingGraph {
    pub fn network(&self) -> &StableDiGraph<Node, Edge> {
        &self.network
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn is_full_binding_graph(&self) -> bool {
        self.full_binding_graph
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.network[id]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.network[id]
    }

    pub fn node_count(&self) -> usize {
        self.network.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.network.edge_count()
    }

    /// Node ids in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.network.node_indices()
    }

    pub fn nodes_by_class(&self, class: NodeClass) -> &[NodeId] {
        self.nodes_by_class
            .get(&class)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Binding nodes owned by `component`, in insertion order.
    pub fn bindings_owned_by(&self, component: ComponentId) -> &[NodeId] {
        self.bindings_by_component
            .get(&component)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn component_node(&self, component: ComponentId) -> Option<NodeId> {
        self.component_nodes.get(&component).copied()
    }

    /// Every dependency edge as `(edge, source, target)`, in insertion order.
    pub fn dependency_edges(
        &self,
    ) -> impl Iterator<Item = (EdgeId, NodeId, NodeId, &DependencyEdge)> + '_ {
        self.network.edge_references().filter_map(|e| {
            e.weight()
                .as_dependency()
                .map(|d| (e.id(), e.source(), e.target(), d))
        })
    }

    /// Dependency edges leaving `node`, in insertion order.
    pub fn outgoing_dependencies(
        &self,
        node: NodeId,
    ) -> Vec<(NodeId, &DependencyEdge)> {
        let mut edges = self
            .network
            .edges_directed(node, Direction::Outgoing)
            .filter_map(|e| e.weight().as_dependency().map(|d| (e.id(), e.target(), d)))
            .collect::<Vec<_>>();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, t, d)| (t, d)).collect()
    }

    /// Nodes with a dependency edge into `node`.
    pub fn dependents(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.network
            .edges_directed(node, Direction::Incoming)
            .filter(|e| e.weight().as_dependency().is_some())
            .map(|e| e.source())
            .collect()
    }

    /// The dependency sub-network with only the edges `keep` accepts.
    pub fn dependency_graph<F>(&self, mut keep: F) -> DirectedGraph<NodeId>
    where
        F: FnMut(NodeId, NodeId, &DependencyEdge) -> bool,
    {
        let mut graph = DirectedGraph::new();
        for id in self.network.node_indices() {
            graph.add_node(id);
        }
        for (_, from, to, d) in self.dependency_edges() {
            if keep(from, to, d) {
                graph.add_edge(from, to);
            }
        }
        graph
    }

    /// Strongly connected components of the dependency sub-network that
    /// contain a cycle, in reverse topological order.
    pub fn strongly_connected_components(&self) -> &[Vec<NodeId>] {
        &self.sccs
    }

    /// A hash of the sorted node and edge renderings. Equal declaration sets
    /// produce equal fingerprints whatever their order.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn root(&self) -> BindingGraph<'_> {
        BindingGraph {
            graph: self,
            component: self.tree.root().id,
        }
    }

    /// The view of one resolved component.
    pub fn binding_graph(&self, component: ComponentId) -> Option<BindingGraph<'_>> {
        self.component_nodes.get(&component).map(|_| BindingGraph {
            graph: self,
            component,
        })
    }

    /// Views of every resolved component, parents first.
    pub fn binding_graphs(&self) -> impl Iterator<Item = BindingGraph<'_>> + '_ {
        self.component_nodes.keys().map(move |c| BindingGraph {
            graph: self,
            component: *c,
        })
    }
}

/// A view of the top-level network from one component.
#[derive(Clone, Copy, Debug)]
pub struct BindingGraph<'g> {
    graph: &'g TopLevelBindingGraph,
    component: ComponentId,
}

impl<'g> BindingGraph<'g> {
    pub fn top_level(&self) -> &'g TopLevelBindingGraph {
        self.graph
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn descriptor(&self) -> &'g ComponentDescriptor {
        self.graph.tree.get(self.component)
    }

    pub fn path(&self) -> &'g ComponentPath {
        &self.descriptor().path
    }

    pub fn component_node(&self) -> Option<NodeId> {
        self.graph.component_node(self.component)
    }

    pub fn owned_modules(&self) -> &'g BTreeSet<ModuleRef> {
        &self.descriptor().owned_modules
    }

    pub fn inherited_modules(&self) -> &'g BTreeSet<ModuleRef> {
        &self.graph.inherited_modules[self.component.index()]
    }

    /// What the generated container must be given or construct: modules
    /// needing an instance, component dependencies, bound instances.
    pub fn component_requirements(&self) -> &'g [ComponentRequirement] {
        &self.descriptor().requirements
    }

    /// The parent's factory method creating this component, if any.
    pub fn factory_method(&self) -> Option<&'g FactoryMethod> {
        let parent = self.descriptor().parent?;
        self.graph.tree.get(parent).factory_method_for(self.component)
    }

    /// The modules passed as factory method arguments.
    pub fn factory_method_parameters(&self) -> &'g [ModuleRef] {
        self.factory_method()
            .map(|m| m.parameters.as_slice())
            .unwrap_or(&[])
    }

    pub fn bindings(&self) -> impl Iterator<Item = &'g BindingNode> + 'g {
        let graph = self.graph;
        graph
            .bindings_owned_by(self.component)
            .iter()
            .filter_map(move |id| graph.node(*id).as_binding())
    }

    /// Cyclic components with at least one node in this component.
    pub fn strongly_connected_components(&self) -> Vec<&'g [NodeId]> {
        let graph = self.graph;
        graph
            .sccs_by_component
            .get(&self.component)
            .map_or(vec![], |ids| ids.iter().map(|i| graph.sccs[*i].as_slice()).collect())
    }

    /// Views of the resolved children of this component.
    pub fn subgraphs(&self) -> Vec<BindingGraph<'g>> {
        let graph = self.graph;
        self.descriptor()
            .children()
            .into_iter()
            .filter_map(|c| graph.binding_graph(c))
            .collect()
    }
}
