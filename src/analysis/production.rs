use std::collections::BTreeSet;

use super::{binding_node, is_pass_through, requested_at};
use crate::errors::{Defect, DefectKind};
use crate::graph::{Node, NodeId, TopLevelBindingGraph};

/// True for production bindings and for delegates or optionals that forward
/// to one.
fn is_production(graph: &TopLevelBindingGraph, id: NodeId, seen: &mut BTreeSet<NodeId>) -> bool {
    if !seen.insert(id) {
        return false;
    }

    let node = unless!(binding_node(graph, id), else { return false });
    if node.binding.is_production() {
        return true;
    }
    is_pass_through(&node.binding.kind)
        && graph
            .outgoing_dependencies(id)
            .into_iter()
            .any(|(to, _)| is_production(graph, to, seen))
}

/// Provision bindings, and entry points that cannot wait for a result, that
/// depend on production bindings.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    for (_, from, to, edge) in graph.dependency_edges() {
        if !is_production(graph, to, &mut BTreeSet::new()) {
            continue;
        }

        let allowed = match graph.node(from) {
            Node::Component(_) => edge.request.kind.can_use_production(),
            Node::Binding(_) => is_production(graph, from, &mut BTreeSet::new()),
            Node::Missing(_) => true,
        };
        if allowed {
            continue;
        }

        let target = graph.node(to);
        let chain = format!(
            "{} is a provision, which cannot depend on a production.\n    {}",
            graph.node(from),
            requested_at(graph, from, &edge.request)
        );
        defects.push(
            Defect::new(DefectKind::ProvisionDependsOnProduction, chain)
                .with_keys(target.key().cloned())
                .with_component(graph.node(from).path().clone()),
        );
    }
}
