use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::decl::{BindingDecl, MethodKind, ModuleDecl};
use crate::errors::{BindError, BindErrorKind, BindResult};
use crate::model::{
    Binding, BindingKind, ComponentRef, ContributionId, ContributionType, DependencyRequest,
    ElementRef, Key, MapKey, ModuleRef, Scope,
};

/// Declares that a multibinding exists even if nothing contributes to it.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MultibindingDeclaration {
    pub key: Key,
    pub element: ElementRef,
    pub module: ModuleRef,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DelegateDeclaration {
    /// Carries a contribution id when the alias contributes to a
    /// multibinding.
    pub key: Key,
    pub delegate: DependencyRequest,
    pub element: ElementRef,
    pub module: ModuleRef,
    pub scope: Option<Scope>,
    pub contribution_type: ContributionType,
    pub map_key: Option<MapKey>,
}

/// A module-declared child component; `key` is the child's creator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubcomponentDeclaration {
    pub key: Key,
    pub child: ComponentRef,
    pub module: ModuleRef,
}

/// `key` is the unwrapped key; the declaration makes `Optional<key>`
/// resolvable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OptionalBindingDeclaration {
    pub key: Key,
    pub element: ElementRef,
    pub module: ModuleRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub name: ModuleRef,
    pub includes: BTreeSet<ModuleRef>,
    pub bindings: BTreeSet<Binding>,
    pub multibindings: BTreeSet<MultibindingDeclaration>,
    pub delegates: BTreeSet<DelegateDeclaration>,
    pub subcomponents: BTreeSet<SubcomponentDeclaration>,
    pub optionals: BTreeSet<OptionalBindingDeclaration>,
    pub instantiable: bool,
}

impl ModuleDescriptor {
    /// Converts a module declaration. `creators` maps each component to the
    /// key of its creator, if it has one.
    pub fn from_decl(
        decl: &ModuleDecl,
        creators: &BTreeMap<ComponentRef, Option<Key>>,
    ) -> Result<ModuleDescriptor, Vec<BindError>> {
        let module = &decl.name;
        let mut errors = vec![];
        let mut desc = ModuleDescriptor {
            name: module.clone(),
            includes: decl.includes.iter().cloned().collect(),
            bindings: BTreeSet::new(),
            multibindings: BTreeSet::new(),
            delegates: BTreeSet::new(),
            subcomponents: BTreeSet::new(),
            optionals: BTreeSet::new(),
            instantiable: decl.instantiable,
        };

        for b in decl.bindings.iter() {
            match module_binding(module, b) {
                Ok(binding) => {
                    desc.bindings.insert(binding);
                }
                Err(e) => errors.push(e),
            }
        }

        for m in decl.multibindings.iter() {
            if !m.key.ty.is_multibinding_type() {
                errors.push(BindError::new(
                    BindErrorKind::Manifest,
                    format!(
                        "{}: multibinding declarations must be of Set or Map type, found {}",
                        m.element, m.key
                    ),
                ));
                continue;
            }
            desc.multibindings.insert(MultibindingDeclaration {
                key: m.key.clone(),
                element: m.element.clone(),
                module: module.clone(),
            });
        }

        for d in decl.delegates.iter() {
            let key = match contribution_key(module, &d.element, &d.key, d.contribution) {
                Ok(key) => key,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            desc.delegates.insert(DelegateDeclaration {
                key,
                delegate: d.delegate.clone(),
                element: d.element.clone(),
                module: module.clone(),
                scope: d.scope.clone(),
                contribution_type: d.contribution,
                map_key: d.map_key.clone(),
            });
        }

        for o in decl.optionals.iter() {
            desc.optionals.insert(OptionalBindingDeclaration {
                key: o.key.clone(),
                element: o.element.clone(),
                module: module.clone(),
            });
        }

        for child in decl.subcomponents.iter() {
            match creators.get(child) {
                Some(Some(key)) => {
                    desc.subcomponents.insert(SubcomponentDeclaration {
                        key: key.clone(),
                        child: child.clone(),
                        module: module.clone(),
                    });
                }
                Some(None) => errors.push(BindError::new(
                    BindErrorKind::Creator,
                    format!(
                        "{} declares subcomponent {}, which has no creator",
                        module, child
                    ),
                )),
                None => errors.push(BindError::new(
                    BindErrorKind::UnknownComponent,
                    format!("{} declares unknown subcomponent {}", module, child),
                )),
            }
        }

        if errors.is_empty() {
            Ok(desc)
        } else {
            Err(errors)
        }
    }

    /// True if any binding of this module is an instance method.
    pub fn requires_instance(&self) -> bool {
        self.bindings.iter().any(|b| b.requires_module_instance)
    }
}

/// Contributions get a key distinct from every other contribution to the
/// same collection.
fn contribution_key(
    module: &ModuleRef,
    element: &ElementRef,
    key: &Key,
    contribution: ContributionType,
) -> BindResult<Key> {
    let ok = match contribution {
        ContributionType::Unique => return Ok(key.clone()),
        ContributionType::SetElement | ContributionType::SetValues => key.ty.is_set(),
        ContributionType::MapEntry => key.ty.is_map(),
    };

    if !ok {
        return Err(BindError::new(
            BindErrorKind::Manifest,
            format!(
                "{}: a {} contribution must be keyed by its collection type, found {}",
                element, contribution, key
            ),
        ));
    }

    Ok(key.with_contribution(ContributionId {
        module: module.clone(),
        element: element.clone(),
    }))
}

fn module_binding(module: &ModuleRef, decl: &BindingDecl) -> BindResult<Binding> {
    if decl.contribution == ContributionType::MapEntry && decl.map_key.is_none() {
        return Err(BindError::new(
            BindErrorKind::Manifest,
            format!("{}: map contributions need a map key", decl.element),
        ));
    }

    let key = contribution_key(module, &decl.element, &decl.key, decl.contribution)?;
    let kind = match decl.kind {
        MethodKind::Provision => BindingKind::Provision,
        MethodKind::Production => BindingKind::Production,
    };

    Ok(Binding {
        key,
        kind,
        contribution_type: decl.contribution,
        dependencies: decl.dependencies.clone(),
        scope: decl.scope.clone(),
        element: Some(decl.element.clone()),
        module: Some(module.clone()),
        nullable: decl.nullable,
        map_key: decl.map_key.clone(),
        requires_module_instance: !decl.is_static,
    })
}

