use std::collections::{BTreeMap, BTreeSet};

use super::binding_node;
use crate::errors::{Defect, DefectKind};
use crate::graph::{NodeId, TopLevelBindingGraph};
use crate::model::DependencyRequest;

/// A request satisfied by more than one binding.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    let mut targets: BTreeMap<(NodeId, &DependencyRequest), BTreeSet<NodeId>> = BTreeMap::new();
    for (_, from, to, edge) in graph.dependency_edges() {
        targets
            .entry((from, &edge.request))
            .or_insert_with(BTreeSet::new)
            .insert(to);
    }

    let mut seen = BTreeSet::new();
    for ((_, request), nodes) in targets {
        if nodes.len() < 2 || !seen.insert(nodes.clone()) {
            continue;
        }

        let bindings = nodes
            .iter()
            .filter_map(|n| binding_node(graph, *n))
            .collect::<Vec<_>>();
        let mut chain = format!("{} is bound multiple times:", request.key);
        for b in bindings.iter() {
            push_line!(chain, 1, "{} [{}]", b.binding.display_name(), b.path);
        }

        let mut defect = Defect::new(DefectKind::Duplicate, chain).with_key(request.key.clone());
        for b in bindings {
            defect = defect.with_component(b.path.clone());
        }
        defects.push(defect);
    }
}
