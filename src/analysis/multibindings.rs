use std::collections::{BTreeMap, BTreeSet};

use super::binding_node;
use crate::errors::{Defect, DefectKind};
use crate::graph::{BindingNode, NodeClass, NodeId, TopLevelBindingGraph};
use crate::model::{BindingKind, ContributionType, Key};

/// Map contributions sharing a map key or mixing map-key annotations, and
/// set contributions that alias the same binding.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    for id in graph.nodes_by_class(NodeClass::Binding) {
        let node = unless!(binding_node(graph, *id), else { continue });
        match node.binding.kind {
            BindingKind::MultiboundMap { .. } => check_map(graph, node, contributions(graph, *id), defects),
            BindingKind::MultiboundSet { .. } => check_set(node, contributions(graph, *id), defects),
            _ => {}
        }
    }
}

fn contributions(graph: &TopLevelBindingGraph, id: NodeId) -> Vec<&BindingNode> {
    graph
        .outgoing_dependencies(id)
        .into_iter()
        .filter_map(|(to, _)| binding_node(graph, to))
        .collect()
}

fn check_map(
    graph: &TopLevelBindingGraph,
    map: &BindingNode,
    contributions: Vec<&BindingNode>,
    defects: &mut Vec<Defect>,
) {
    let mut by_key = BTreeMap::new();
    let mut annotations = BTreeMap::new();
    for c in contributions {
        let map_key = unless!(c.binding.map_key.as_ref(), else { continue });
        by_key
            .entry(map_key)
            .or_insert_with(Vec::new)
            .push(c);
        annotations
            .entry(&map_key.annotation)
            .or_insert_with(Vec::new)
            .push(c);
    }

    for (map_key, entries) in by_key.iter().filter(|(_, e)| e.len() > 1) {
        let mut chain = format!("The same map key is bound more than once for {}", map.binding.key);
        push_line!(chain, 1, "{}:", map_key);
        for e in entries {
            push_line!(chain, 2, "{} [{}]", e.binding.display_name(), e.path);
        }
        defects.push(defect(DefectKind::MultibindingKeyCollision, chain, map, entries));
    }

    if annotations.len() > 1 {
        let mut chain = format!(
            "{} uses more than one map key annotation type",
            map.binding.key
        );
        for (annotation, entries) in annotations.iter() {
            push_line!(chain, 1, "@{}:", annotation);
            for e in entries {
                push_line!(chain, 2, "{}", e.binding.display_name());
            }
        }
        let all = annotations.values().flatten().copied().collect::<Vec<_>>();
        defects.push(defect(DefectKind::InconsistentMapKeys, chain, map, &all));
    }

    log::trace!(
        "[analysis] {} in {}: {} map keys",
        map.binding.key,
        graph.tree().get(map.owner).path,
        by_key.len()
    );
}

fn check_set(set: &BindingNode, contributions: Vec<&BindingNode>, defects: &mut Vec<Defect>) {
    let mut by_target: BTreeMap<&Key, Vec<&BindingNode>> = BTreeMap::new();
    for c in contributions {
        if c.binding.contribution_type != ContributionType::SetElement {
            continue;
        }
        if let Some(target) = c.binding.delegate_target() {
            by_target.entry(target).or_insert_with(Vec::new).push(c);
        }
    }

    for (target, entries) in by_target.iter().filter(|(_, e)| e.len() > 1) {
        let mut chain = format!(
            "{} has more than one contribution bound to {}:",
            set.binding.key, target
        );
        for e in entries.iter() {
            push_line!(chain, 1, "{} [{}]", e.binding.display_name(), e.path);
        }
        defects.push(defect(DefectKind::DuplicateSetContribution, chain, set, entries));
    }
}

fn defect(kind: DefectKind, chain: String, multibinding: &BindingNode, entries: &[&BindingNode]) -> Defect {
    let paths = entries
        .iter()
        .map(|e| e.path.clone())
        .collect::<BTreeSet<_>>();
    paths.into_iter().fold(
        Defect::new(kind, chain)
            .with_key(multibinding.binding.key.clone())
            .with_component(multibinding.path.clone()),
        |d, p| d.with_component(p),
    )
}
