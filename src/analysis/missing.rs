use itertools::Itertools;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::requested_at;
use crate::errors::{Defect, DefectKind};
use crate::graph::{Node, NodeClass, TopLevelBindingGraph};
use crate::model::TypeRef;

/// Requests that resolved to nothing. Not reported for full binding graphs,
/// where keys are resolved whether or not anything needs them.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    if graph.is_full_binding_graph() {
        return;
    }

    for id in graph.nodes_by_class(NodeClass::Missing) {
        let missing = match graph.node(*id) {
            Node::Missing(m) => m,
            _ => continue,
        };

        let how = match (&missing.key.qualifier, &missing.key.ty) {
            (None, TypeRef::Declared { .. }) => {
                "cannot be provided without an @Inject constructor or a binding declaration"
            }
            _ => "cannot be provided without a binding declaration",
        };
        let mut chain = format!("{} {}.", missing.key, how);

        let requests = graph
            .network()
            .edges_directed(*id, Direction::Incoming)
            .filter_map(|e| e.weight().as_dependency().map(|d| (e.source(), d)))
            .map(|(source, d)| requested_at(graph, source, &d.request))
            .sorted()
            .dedup()
            .collect::<Vec<_>>();
        for r in requests {
            push_line!(chain, 1, "{}", r);
        }

        if !missing.bound_elsewhere.is_empty() {
            push_line!(
                chain,
                1,
                "Note: {} is provided in {}, which is not an ancestor of {}",
                missing.key,
                missing.bound_elsewhere.iter().join(", "),
                missing.path
            );
        }

        defects.push(
            Defect::new(DefectKind::Missing, chain)
                .with_key(missing.key.clone())
                .with_component(missing.path.clone()),
        );
    }
}
