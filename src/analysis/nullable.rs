use super::{binding_node, requested_at};
use crate::errors::{Defect, DefectKind, Severity};
use crate::graph::TopLevelBindingGraph;
use crate::model::RequestKind;

/// Nullable bindings requested directly by requests that do not accept null.
pub(super) fn check(graph: &TopLevelBindingGraph, severity: Severity, defects: &mut Vec<Defect>) {
    for (_, from, to, edge) in graph.dependency_edges() {
        let target = unless!(binding_node(graph, to), else { continue });
        if !target.binding.nullable || edge.request.nullable || edge.request.kind != RequestKind::Instance {
            continue;
        }

        let chain = format!(
            "{} is not nullable, but is being provided by {}\n    {}",
            edge.request.key,
            target.binding.display_name(),
            requested_at(graph, from, &edge.request)
        );
        defects.push(
            Defect::new(DefectKind::NullableMismatch, chain)
                .with_severity(severity)
                .with_key(edge.request.key.clone())
                .with_component(graph.node(from).path().clone()),
        );
    }
}
