use std::collections::BTreeSet;

use crate::errors::{Defect, DefectKind};
use crate::graph::{DependencyEdge, NodeId, TopLevelBindingGraph};
use crate::model::{FrameworkType, RequestKind};

/// A request that does not need its dependency while constructing the
/// requester.
fn breaks_cycle(graph: &TopLevelBindingGraph, to: NodeId, edge: &DependencyEdge) -> bool {
    // contributions are always constructed with their collection
    if graph.node(to).key().map_or(false, |k| k.is_contribution()) {
        return false;
    }

    let request = &edge.request;
    request.is_deferred()
        || (request.kind == RequestKind::Instance
            && request.key.ty.map_value_framework() == Some(FrameworkType::Provider))
}

/// Reports every cycle that no deferred request breaks. Each remaining
/// strongly connected component is reported once, along its shortest cycle
/// through its earliest node.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    let deps = graph.dependency_graph(|_, to, edge| !edge.entry_point && !breaks_cycle(graph, to, edge));

    for scc in deps.compute_sccs() {
        let members = scc.iter().copied().collect::<BTreeSet<_>>();
        let start = unless!(members.iter().next().copied(), else { continue });
        if members.len() == 1 && !deps.has_edge(&start, &start) {
            continue;
        }

        let cycle = unless!(deps.shortest_cycle(&start, &members), else { continue });
        let keys = cycle
            .iter()
            .filter_map(|n| graph.node(*n).key().cloned())
            .collect::<Vec<_>>();
        let mut rendered = keys.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        if let Some(first) = rendered.first().cloned() {
            rendered.push(first);
        }

        let mut chain = format!("Found a dependency cycle: {}", rendered.join(" -> "));
        for (i, n) in cycle.iter().enumerate() {
            let next = cycle[(i + 1) % cycle.len()];
            let requests = graph
                .outgoing_dependencies(*n)
                .into_iter()
                .filter(|(to, _)| *to == next)
                .map(|(_, d)| d.request.to_string())
                .collect::<Vec<_>>();
            push_line!(
                chain,
                1,
                "{} requests {}",
                graph.node(*n),
                requests.join(", ")
            );
        }

        let mut defect = Defect::new(DefectKind::Cycle, chain).with_keys(keys);
        for n in cycle.iter() {
            defect = defect.with_component(graph.node(*n).path().clone());
        }
        log::debug!("[analysis] {}", defect.summary());
        defects.push(defect);
    }
}
