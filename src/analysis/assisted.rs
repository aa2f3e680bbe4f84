use super::{binding_node, requested_at};
use crate::errors::{Defect, DefectKind};
use crate::graph::TopLevelBindingGraph;
use crate::model::BindingKind;

/// Assisted-injection types may only be requested by their assisted factory.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    for (_, from, to, edge) in graph.dependency_edges() {
        let target = unless!(binding_node(graph, to), else { continue });
        if target.binding.kind != BindingKind::AssistedInjection {
            continue;
        }

        let by_factory = binding_node(graph, from).map_or(false, |b| {
            matches!(b.binding.kind, BindingKind::AssistedFactory { .. })
        });
        if by_factory {
            continue;
        }

        let chain = format!(
            "{} is assisted-injected and cannot be requested directly; request its @AssistedFactory instead\n    {}",
            target.binding.key,
            requested_at(graph, from, &edge.request)
        );
        defects.push(
            Defect::new(DefectKind::AssistedInjectionRequest, chain)
                .with_key(target.binding.key.clone())
                .with_component(graph.node(from).path().clone()),
        );
    }
}
