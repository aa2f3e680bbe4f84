use itertools::Itertools;

use crate::errors::{Defect, DefectKind};
use crate::graph::{NodeClass, TopLevelBindingGraph};

/// Scoped bindings owned by a component that does not declare their scope.
/// Production components implicitly declare the production scope.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    for id in graph.nodes_by_class(NodeClass::Binding) {
        let node = unless!(graph.node(*id).as_binding(), else { continue });
        let scope = unless!(node.binding.strict_scope(), else { continue });
        let owner = graph.tree().get(node.owner);
        if owner.scopes.contains(scope) || (scope.is_production_scope() && owner.is_production) {
            continue;
        }

        let declared = if owner.scopes.is_empty() {
            str!("(unscoped)")
        } else {
            format!("(scoped with {})", owner.scopes.iter().join(" "))
        };
        let chain = format!(
            "{} {} may not reference bindings with different scopes:\n    {} {}",
            owner.path, declared, scope, node.binding
        );
        defects.push(
            Defect::new(DefectKind::ScopeMismatch, chain)
                .with_key(node.binding.key.clone())
                .with_component(owner.path.clone()),
        );
    }
}
