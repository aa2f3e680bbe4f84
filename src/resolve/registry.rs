use std::collections::BTreeMap;

use crate::descriptor::Declarations;
use crate::model::{
    Binding, BindingKind, DependencyRequest, FrameworkType, Key, RequestKind, TypeRef,
};

/// Bindings that come from the types themselves rather than from modules:
/// injectable constructors, assisted factories and members injection.
///
/// One registry is handed to each root resolution pass.
#[derive(Clone, Debug, Default)]
pub struct InjectRegistry {
    provisions: BTreeMap<Key, Binding>,
    members: BTreeMap<Key, Binding>,
}

impl InjectRegistry {
    pub fn new(decls: &Declarations) -> InjectRegistry {
        let mut registry = InjectRegistry::default();
        for inj in decls.injectables.iter() {
            let kind = if inj.assisted {
                BindingKind::AssistedInjection
            } else {
                BindingKind::Injection
            };
            let binding = Binding::new(Key::of(inj.ty.clone()), kind)
                .with_dependencies(inj.dependencies.clone())
                .with_scope(inj.scope.clone());
            registry.add_provision(binding);
        }

        for f in decls.assisted_factories.iter() {
            let target = DependencyRequest::new(Key::of(f.target.clone()), RequestKind::Provider);
            let binding = Binding::new(
                Key::of(f.ty.clone()),
                BindingKind::AssistedFactory {
                    target: f.target.clone(),
                },
            )
            .with_dependencies(vec![target]);
            registry.add_provision(binding);
        }

        for m in decls.members_injections.iter() {
            let binding = Binding::new(Key::of(m.ty.clone()), BindingKind::MembersInjection)
                .with_dependencies(m.sites.clone());
            registry.members.insert(binding.key.clone(), binding);
        }

        log::debug!(
            "[registry] {} injectable types, {} members-injected types",
            registry.provisions.len(),
            registry.members.len()
        );
        registry
    }

    pub fn add_provision(&mut self, binding: Binding) {
        self.provisions.insert(binding.key.clone(), binding);
    }

    /// The implicit binding for `key`, if its type provides one. Qualified
    /// keys never have implicit bindings.
    pub fn provision_binding(&self, key: &Key) -> Option<Binding> {
        if key.qualifier.is_some() || key.is_contribution() {
            return None;
        }

        if let TypeRef::Framework(FrameworkType::MembersInjector, inner) = &key.ty {
            let target = self.members_injection_binding(&Key::of(inner.as_ref().clone()))?;
            return Some(
                Binding::new(key.clone(), BindingKind::MembersInjector)
                    .with_dependencies(target.dependencies),
            );
        }

        self.provisions.get(key).cloned()
    }

    /// Members injection of a declared type without injectable members is
    /// legal and injects nothing.
    pub fn members_injection_binding(&self, key: &Key) -> Option<Binding> {
        if key.qualifier.is_some() {
            return None;
        }

        match self.members.get(key) {
            Some(b) => Some(b.clone()),
            None => match &key.ty {
                TypeRef::Declared { .. } => {
                    Some(Binding::new(key.clone(), BindingKind::MembersInjection))
                }
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InjectRegistry {
        let decls: Declarations = serde_json::from_str(
            r#"{
                "injectables": [
                    {"type": "Engine", "dependencies": ["Fuel"], "scope": "Singleton"},
                    {"type": "Car", "dependencies": ["Engine"], "assisted": true}
                ],
                "assisted_factories": [{"type": "CarFactory", "target": "Car"}],
                "members_injections": [{"type": "Activity", "sites": ["Engine"]}]
            }"#,
        )
        .unwrap();
        InjectRegistry::new(&decls)
    }

    #[test]
    fn injectable_types_have_provision_bindings() {
        let r = registry();
        let b = r.provision_binding(&Key::parse("Engine").unwrap()).unwrap();
        assert_eq!(b.kind, BindingKind::Injection);
        assert_eq!(b.dependencies.len(), 1);
        assert!(r.provision_binding(&Key::parse("@Named Engine").unwrap()).is_none());
        assert!(r.provision_binding(&Key::parse("Fuel").unwrap()).is_none());
    }

    #[test]
    fn assisted_factories_request_their_target_lazily() {
        let r = registry();
        let b = r.provision_binding(&Key::parse("CarFactory").unwrap()).unwrap();
        assert_eq!(
            b.kind,
            BindingKind::AssistedFactory {
                target: TypeRef::declared("Car")
            }
        );
        assert_eq!(b.dependencies[0].kind, RequestKind::Provider);
    }

    #[test]
    fn members_injectors_depend_on_injection_sites() {
        let r = registry();
        let b = r
            .provision_binding(&Key::parse("MembersInjector<Activity>").unwrap())
            .unwrap();
        assert_eq!(b.kind, BindingKind::MembersInjector);
        assert_eq!(b.dependencies[0].key.to_string(), "Engine");

        let empty = r
            .members_injection_binding(&Key::parse("Fragment").unwrap())
            .unwrap();
        assert!(empty.dependencies.is_empty());
    }
}
