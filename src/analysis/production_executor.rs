use super::binding_node;
use crate::errors::{Defect, DefectKind};
use crate::graph::{Node, NodeClass, TopLevelBindingGraph};
use crate::model::{Key, Qualifier, TypeRef};

fn executor_key(qualifier: &str) -> Key {
    Key::qualified(TypeRef::declared("Executor"), Qualifier::new(qualifier))
}

/// Only graphs with a production component or production binding run on an
/// executor at all.
fn uses_producers(graph: &TopLevelBindingGraph) -> bool {
    graph.tree().iter().any(|c| c.is_production)
        || graph
            .nodes_by_class(NodeClass::Binding)
            .iter()
            .filter_map(|id| binding_node(graph, *id))
            .any(|n| n.binding.is_production())
}

/// Bindings requesting `@Production Executor`. Only the binding of
/// `@ProductionImplementation Executor` may.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    if !uses_producers(graph) {
        return;
    }

    let executor = executor_key("Production");
    let implementation = executor_key("ProductionImplementation");
    for (_, from, to, _) in graph.dependency_edges() {
        if graph.node(to).key() != Some(&executor) {
            continue;
        }

        let node = match graph.node(from) {
            Node::Binding(b) if b.binding.key != implementation => b,
            _ => continue,
        };
        defects.push(
            Defect::new(
                DefectKind::DependsOnProductionExecutor,
                format!(
                    "{} may not depend on the production executor\n    {}",
                    node.binding.key,
                    graph.node(from)
                ),
            )
            .with_key(node.binding.key.clone())
            .with_component(node.path.clone()),
        );
    }
}
