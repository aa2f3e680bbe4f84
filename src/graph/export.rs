use std::collections::{BTreeMap, BTreeSet, VecDeque};

use fnv::FnvHashMap;
use itertools::Itertools;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use xxhash_rust::xxh3::xxh3_64;

use super::network::{
    BindingNode, ComponentNode, DependencyEdge, Edge, MissingBinding, Node, NodeId,
    TopLevelBindingGraph,
};
use crate::descriptor::{ComponentId, ComponentTree};
use crate::index::DeclarationIndex;
use crate::model::{Binding, BindingKind, DependencyRequest, Key};
use crate::resolve::Resolution;

/// Freezes one resolution pass into a [`TopLevelBindingGraph`].
///
/// Every resolved component becomes a component node. Entry points seed
/// dependency edges, and the bindings they reach are added breadth first,
/// each one placed in the component that owns it. Requests that resolved to
/// nothing end at a [`MissingBinding`] node in the requesting component.
pub struct Exporter<'a> {
    tree: &'a ComponentTree,
    index: &'a DeclarationIndex,
    resolution: &'a Resolution,
    full_binding_graph: bool,
    network: StableDiGraph<Node, Edge>,
    component_nodes: BTreeMap<ComponentId, NodeId>,
    binding_nodes: FnvHashMap<(ComponentId, Binding), NodeId>,
    missing_nodes: FnvHashMap<(ComponentId, Key), NodeId>,
    queue: VecDeque<NodeId>,
}

impl<'a> Exporter<'a> {
    pub fn new(
        tree: &'a ComponentTree,
        index: &'a DeclarationIndex,
        resolution: &'a Resolution,
    ) -> Exporter<'a> {
        Exporter {
            tree,
            index,
            resolution,
            full_binding_graph: false,
            network: StableDiGraph::new(),
            component_nodes: BTreeMap::new(),
            binding_nodes: FnvHashMap::default(),
            missing_nodes: FnvHashMap::default(),
            queue: VecDeque::new(),
        }
    }

    /// Also place every binding resolved in each component, not only those
    /// reachable from entry points.
    pub fn full_binding_graph(mut self, full: bool) -> Exporter<'a> {
        self.full_binding_graph = full;
        self
    }

    pub fn export(mut self) -> TopLevelBindingGraph {
        let tree = self.tree;
        let resolution = self.resolution;

        for &c in resolution.components.iter() {
            let desc = tree.get(c);
            let node = self.network.add_node(Node::Component(ComponentNode {
                id: c,
                path: desc.path.clone(),
                is_subcomponent: desc.is_subcomponent,
                is_production: desc.is_production,
                scopes: desc.scopes.clone(),
                entry_points: desc.entry_points.iter().map(|e| e.request.clone()).collect(),
            }));
            self.component_nodes.insert(c, node);
        }

        for &c in resolution.components.iter() {
            let parent = unless!(tree.parent(c), else { continue });
            let method = unless!(tree.get(parent).factory_method_for(c), else { continue });
            if let (Some(&from), Some(&to)) =
                (self.component_nodes.get(&parent), self.component_nodes.get(&c))
            {
                self.network.add_edge(
                    from,
                    to,
                    Edge::ChildFactoryMethod {
                        element: method.element.clone(),
                    },
                );
            }
        }

        for &c in resolution.components.iter() {
            let from = unless!(self.component_nodes.get(&c).copied(), else { continue });
            for ep in tree.get(c).entry_points.iter() {
                self.add_dependency(from, c, &ep.request, true);
            }

            if self.full_binding_graph {
                for rb in resolution.contribution[c.index()].values() {
                    for (owner, b) in rb.bindings() {
                        self.binding_node(owner, b);
                    }
                }
            }
        }

        while let Some(node) = self.queue.pop_front() {
            self.add_binding_edges(node);
        }

        freeze(self.network, tree.clone(), self.full_binding_graph, self.component_nodes)
    }

    fn add_binding_edges(&mut self, node: NodeId) {
        let BindingNode { owner, binding, .. } = match &self.network[node] {
            Node::Binding(b) => b.clone(),
            _ => return,
        };

        for dep in binding.dependencies.iter() {
            self.add_dependency(node, owner, dep, false);
        }

        if let BindingKind::SubcomponentCreator { child } = &binding.kind {
            let child = unless!(self.tree.child_named(owner, child));
            let to = unless!(self.component_nodes.get(&child).copied());
            let declarations = self
                .resolution
                .resolved(owner, &binding.key)
                .map(|rb| rb.subcomponent_declarations.clone())
                .unwrap_or_default();
            self.network
                .add_edge(node, to, Edge::SubcomponentCreator { declarations });
        }
    }

    /// Adds edges from `from` to whatever `request` resolved to in
    /// `component`.
    fn add_dependency(
        &mut self,
        from: NodeId,
        component: ComponentId,
        request: &DependencyRequest,
        entry_point: bool,
    ) {
        let resolution = self.resolution;
        let targets = match resolution.for_request(component, request) {
            Some(rb) if !rb.is_empty() => rb
                .bindings()
                .map(|(owner, b)| self.binding_node(owner, b))
                .collect::<Vec<_>>(),
            _ => vec![self.missing_node(component, &request.key)],
        };

        for to in targets {
            self.network.add_edge(
                from,
                to,
                Edge::Dependency(DependencyEdge {
                    request: request.clone(),
                    entry_point,
                }),
            );
        }
    }

    fn binding_node(&mut self, owner: ComponentId, binding: &Binding) -> NodeId {
        let slot = (owner, binding.clone());
        if let Some(id) = self.binding_nodes.get(&slot) {
            return *id;
        }

        let id = self.network.add_node(Node::Binding(BindingNode {
            owner,
            path: self.tree.path(owner).clone(),
            binding: binding.clone(),
        }));
        self.binding_nodes.insert(slot, id);
        self.queue.push_back(id);
        id
    }

    fn missing_node(&mut self, component: ComponentId, key: &Key) -> NodeId {
        let slot = (component, key.clone());
        if let Some(id) = self.missing_nodes.get(&slot) {
            return *id;
        }

        let lineage = self.tree.lineage(component);
        let bound_elsewhere = self
            .index
            .components_binding(key)
            .into_iter()
            .filter(|c| !lineage.contains(c))
            .map(|c| self.tree.path(c).clone())
            .collect();
        let id = self.network.add_node(Node::Missing(MissingBinding {
            component,
            path: self.tree.path(component).clone(),
            key: key.clone(),
            bound_elsewhere,
        }));
        self.missing_nodes.insert(slot, id);
        id
    }
}

/// Computes the indices consumers rely on, once.
fn freeze(
    network: StableDiGraph<Node, Edge>,
    tree: ComponentTree,
    full_binding_graph: bool,
    component_nodes: BTreeMap<ComponentId, NodeId>,
) -> TopLevelBindingGraph {
    let mut nodes_by_class = BTreeMap::new();
    let mut bindings_by_component = BTreeMap::new();
    for id in network.node_indices() {
        let node = &network[id];
        nodes_by_class
            .entry(node.class())
            .or_insert_with(Vec::new)
            .push(id);
        if let Node::Binding(b) = node {
            bindings_by_component
                .entry(b.owner)
                .or_insert_with(Vec::new)
                .push(id);
        }
    }

    let lines = network
        .node_indices()
        .map(|id| network[id].to_string())
        .chain(network.edge_references().map(|e| {
            format!(
                "{} -> {}: {}",
                network[e.source()],
                network[e.target()],
                e.weight()
            )
        }))
        .sorted()
        .join("\n");
    let fingerprint = xxh3_64(lines.as_bytes());

    let inherited_modules = tree.iter().map(|c| tree.inherited_modules(c.id)).collect();
    let mut graph = TopLevelBindingGraph {
        network,
        tree,
        full_binding_graph,
        component_nodes,
        nodes_by_class,
        bindings_by_component,
        inherited_modules,
        sccs: vec![],
        sccs_by_component: BTreeMap::new(),
        fingerprint,
    };

    let deps = graph.dependency_graph(|_, _, _| true);
    graph.sccs = deps
        .compute_sccs()
        .into_iter()
        .filter(|scc| scc.len() > 1 || deps.has_edge(&scc[0], &scc[0]))
        .collect();
    for (i, scc) in graph.sccs.iter().enumerate() {
        let components = scc
            .iter()
            .map(|n| graph.network[*n].component())
            .collect::<BTreeSet<_>>();
        for c in components {
            graph
                .sccs_by_component
                .entry(c)
                .or_insert_with(Vec::new)
                .push(i);
        }
    }

    log::debug!(
        "[export] {}: {} nodes, {} edges, {} cyclic components, fingerprint {:016x}",
        graph.tree.root().path,
        graph.node_count(),
        graph.edge_count(),
        graph.sccs.len(),
        graph.fingerprint
    );
    graph
}
