use std::collections::BTreeSet;

use crate::descriptor::RequirementKind;
use crate::errors::{Defect, DefectKind};
use crate::graph::TopLevelBindingGraph;
use crate::model::TypeRef;

/// Children created by factory methods must be handed every module they
/// need an instance of but cannot construct.
pub(super) fn check(graph: &TopLevelBindingGraph, defects: &mut Vec<Defect>) {
    for view in graph.binding_graphs() {
        let method = unless!(view.factory_method(), else { continue });
        let parameters = view.factory_method_parameters();

        let used = view
            .bindings()
            .filter(|b| b.binding.requires_module_instance)
            .filter_map(|b| b.binding.module.as_ref())
            .collect::<BTreeSet<_>>();

        let missing = view
            .component_requirements()
            .iter()
            .filter(|r| r.kind == RequirementKind::Module && r.requires_passed_instance)
            .filter_map(|r| match &r.ty {
                TypeRef::Declared { name, .. } => {
                    used.iter().find(|m| m.as_str() == name.as_str()).copied()
                }
                _ => None,
            })
            .filter(|m| view.owned_modules().contains(*m) && !parameters.contains(*m))
            .collect::<Vec<_>>();

        for module in missing {
            let chain = format!(
                "{} requires {}, which cannot be constructed, but it is not a parameter of {}",
                view.path(),
                module,
                method.element
            );
            defects.push(
                Defect::new(DefectKind::MissingFactoryMethodModule, chain)
                    .with_component(view.path().clone()),
            );
        }
    }
}
