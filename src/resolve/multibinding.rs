use std::collections::BTreeSet;

use super::Resolver;
use crate::descriptor::{ComponentId, MultibindingDeclaration};
use crate::model::{
    Binding, BindingKind, DependencyRequest, FrameworkType, Key, RequestKind, TypeRef,
};

/// Contributions to one collection key as seen from one component.
#[derive(Debug, Default)]
pub(super) struct Contributions {
    pub keys: BTreeSet<Key>,
    pub declarations: BTreeSet<MultibindingDeclaration>,
    pub production: bool,
}

impl<'a> Resolver<'a> {
    /// The synthesized set or map binding for `key` as seen from
    /// `component`, or `None` if nothing contributes to or declares it.
    ///
    /// Contributions accumulate across the component and all of its
    /// ancestors. Requests for `Map<K, Provider<V>>`, `Map<K, Producer<V>>`
    /// and `Set<Produced<T>>` collect the contributions made to `Map<K, V>`
    /// and `Set<T>`.
    pub fn aggregate(&self, component: ComponentId, key: &Key) -> Option<Binding> {
        self.multibinding_for(component, key).map(|(b, _)| b)
    }

    pub(super) fn multibinding_for(
        &self,
        component: ComponentId,
        key: &Key,
    ) -> Option<(Binding, BTreeSet<MultibindingDeclaration>)> {
        if !key.ty.is_multibinding_type() || key.is_contribution() {
            return None;
        }

        let contributions = self.contributions(component, key);
        if contributions.keys.is_empty() && contributions.declarations.is_empty() {
            return None;
        }

        log::trace!(
            "[resolve] {}: {} contribution(s), {} declaration(s)",
            key,
            contributions.keys.len(),
            contributions.declarations.len()
        );
        Some((
            synthesize(key, &contributions),
            contributions.declarations,
        ))
    }

    fn contributions(&self, component: ComponentId, key: &Key) -> Contributions {
        let mut out = Contributions::default();
        for k in key.matching_keys() {
            let visible = self.index.declarations(component, &k);
            for (_, b) in visible.contributions {
                out.production |= b.is_production();
                out.keys.insert(b.key.clone());
            }
            for (_, d) in visible.delegate_contributions {
                out.keys.insert(d.key.clone());
            }
            out.declarations
                .extend(visible.multibindings.into_iter().map(|(_, m)| m.clone()));
        }
        out
    }
}

fn synthesize(key: &Key, contributions: &Contributions) -> Binding {
    let request_kind = match (&key.ty, key.ty.map_value_framework()) {
        (_, Some(FrameworkType::Provider)) => RequestKind::Provider,
        (_, Some(FrameworkType::Producer)) => RequestKind::Producer,
        (TypeRef::Set(elem), _) => match elem.as_ref() {
            TypeRef::Framework(FrameworkType::Produced, _) => RequestKind::Produced,
            _ => RequestKind::Instance,
        },
        _ => RequestKind::Instance,
    };
    let production = contributions.production
        || matches!(
            request_kind,
            RequestKind::Producer | RequestKind::Produced
        );

    let kind = if key.ty.is_map() {
        BindingKind::MultiboundMap { production }
    } else {
        BindingKind::MultiboundSet { production }
    };
    let dependencies = contributions
        .keys
        .iter()
        .map(|k| DependencyRequest::new(k.clone(), request_kind))
        .collect();
    Binding::new(key.clone(), kind).with_dependencies(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Declarations, DescriptorBuilder};
    use crate::index::DeclarationIndex;
    use crate::resolve::InjectRegistry;

    const DECLS: &str = r#"{
        "modules": [
            {"name": "RootModule",
             "bindings": [
                {"element": "RootModule.a", "key": "Map<String, Handler>", "contribution": "map_entry",
                 "map_key": {"annotation": "StringKey", "value": "a"}}
             ],
             "multibindings": [{"element": "RootModule.plugins", "key": "Set<Plugin>"}]},
            {"name": "ChildModule",
             "bindings": [
                {"element": "ChildModule.b", "key": "Map<String, Handler>", "contribution": "map_entry",
                 "map_key": {"annotation": "StringKey", "value": "b"}}
             ]}
        ],
        "components": [
            {"name": "Root", "modules": ["RootModule"],
             "factory_methods": [{"element": "Root.child", "child": "Child"}]},
            {"name": "Child", "subcomponent": true, "modules": ["ChildModule"]}
        ]
    }"#;

    fn with_resolver<F: FnOnce(&mut Resolver)>(f: F) {
        let decls: Declarations = serde_json::from_str(DECLS).unwrap();
        let desc = DescriptorBuilder::new(&decls).build().unwrap();
        let tree = &desc.trees[0];
        let index = DeclarationIndex::new(tree, &desc.modules);
        let registry = InjectRegistry::new(&decls);
        let mut resolver = Resolver::new(tree, &index, &registry);
        f(&mut resolver)
    }

    #[test]
    fn contributions_accumulate_down_the_tree() {
        with_resolver(|r| {
            let key = Key::parse("Map<String, Handler>").unwrap();
            let root = r.aggregate(ComponentId(0), &key).unwrap();
            assert_eq!(root.dependencies.len(), 1);

            let child = r.aggregate(ComponentId(1), &key).unwrap();
            assert_eq!(child.kind, BindingKind::MultiboundMap { production: false });
            let elements = child
                .dependencies
                .iter()
                .map(|d| d.key.contribution.as_ref().unwrap().element.to_string())
                .collect::<Vec<_>>();
            assert_eq!(elements, vec!["ChildModule.b", "RootModule.a"]);
        })
    }

    #[test]
    fn framework_valued_maps_request_contributions_lazily() {
        with_resolver(|r| {
            let key = Key::parse("Map<String, Provider<Handler>>").unwrap();
            let b = r.aggregate(ComponentId(1), &key).unwrap();
            assert_eq!(b.key, key);
            assert_eq!(b.dependencies.len(), 2);
            assert!(b.dependencies.iter().all(|d| d.kind == RequestKind::Provider));
        })
    }

    #[test]
    fn declared_but_empty_sets_still_aggregate() {
        with_resolver(|r| {
            let b = r
                .aggregate(ComponentId(0), &Key::parse("Set<Plugin>").unwrap())
                .unwrap();
            assert!(b.dependencies.is_empty());
            assert!(r
                .aggregate(ComponentId(0), &Key::parse("Set<Other>").unwrap())
                .is_none());
        })
    }
}
