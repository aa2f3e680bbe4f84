use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::decl::{ComponentDecl, Declarations};
use super::{
    ComponentDescriptor, ComponentId, ComponentRequirement, ComponentTree, CreatorDescriptor,
    Descriptors, EntryPoint, FactoryMethod, ModuleDescriptor,
};
use crate::errors::{BindError, BindErrorKind};
use crate::model::{
    Binding, BindingKind, ComponentPath, ComponentRef, DependencyRequest, ElementRef, Key,
    ModuleRef, TypeRef,
};

/// Assembles component trees from a declaration set.
///
/// Declaration order never matters: modules, components, entry points and
/// children are all visited in sorted order.
pub struct DescriptorBuilder<'a> {
    decls: &'a Declarations,
    components: BTreeMap<ComponentRef, &'a ComponentDecl>,
    modules: BTreeMap<ModuleRef, ModuleDescriptor>,
    errors: Vec<BindError>,
}

impl<'a> DescriptorBuilder<'a> {
    pub fn new(decls: &'a Declarations) -> DescriptorBuilder<'a> {
        DescriptorBuilder {
            decls,
            components: BTreeMap::new(),
            modules: BTreeMap::new(),
            errors: vec![],
        }
    }

    pub fn build(mut self) -> Result<Descriptors, Vec<BindError>> {
        self.index_components();
        self.convert_modules();
        self.check_module_refs();
        if !self.errors.is_empty() {
            return Err(self.finish_errors());
        }

        let roots = self
            .components
            .values()
            .filter(|c| !c.subcomponent)
            .copied()
            .collect::<Vec<_>>();

        let mut trees = vec![];
        for root in roots {
            log::debug!("[descriptor] building tree for root {}", root.name);
            let mut arena = vec![];
            self.add_component(&mut arena, root, None, &BTreeSet::new());
            if !arena.is_empty() {
                trees.push(ComponentTree::new(arena));
            }
        }

        if !self.errors.is_empty() {
            return Err(self.finish_errors());
        }

        Ok(Descriptors {
            modules: self.modules,
            trees,
        })
    }

    fn finish_errors(&mut self) -> Vec<BindError> {
        let mut errors = std::mem::take(&mut self.errors);
        errors.sort_by(|a, b| (a.kind, &a.msg).cmp(&(b.kind, &b.msg)));
        errors.dedup();
        errors
    }

    fn index_components(&mut self) {
        for c in self.decls.components.iter() {
            if self.components.insert(c.name.clone(), c).is_some() {
                self.errors.push(BindError::new(
                    BindErrorKind::Manifest,
                    format!("component {} is declared more than once", c.name),
                ));
            }
        }
    }

    fn creator_key(decl: &ComponentDecl) -> Option<Key> {
        decl.creator.as_ref().map(|c| Key::of(c.ty.clone()))
    }

    fn convert_modules(&mut self) {
        let creators = self
            .components
            .iter()
            .map(|(name, c)| (name.clone(), Self::creator_key(c)))
            .collect::<BTreeMap<_, _>>();

        for m in self.decls.modules.iter() {
            if self.modules.contains_key(&m.name) {
                self.errors.push(BindError::new(
                    BindErrorKind::Manifest,
                    format!("module {} is declared more than once", m.name),
                ));
                continue;
            }

            match ModuleDescriptor::from_decl(m, &creators) {
                Ok(desc) => {
                    self.modules.insert(m.name.clone(), desc);
                }
                Err(errs) => self.errors.extend(errs),
            }
        }
    }

    fn check_module_refs(&mut self) {
        let mut unknown = vec![];
        for m in self.decls.modules.iter() {
            for inc in m.includes.iter() {
                unknown.push((inc, format!("module {}", m.name)));
            }
        }

        for c in self.components.values() {
            for m in c.modules.iter() {
                unknown.push((m, format!("component {}", c.name)));
            }
            for fm in c.factory_methods.iter() {
                for m in fm.parameters.iter() {
                    unknown.push((m, format!("factory method {}", fm.element)));
                }
            }
        }

        for (module, site) in unknown {
            // modules that failed conversion were already reported
            let declared = self.decls.modules.iter().any(|m| &m.name == module);
            if !declared {
                self.errors.push(BindError::new(
                    BindErrorKind::UnknownModule,
                    format!("{} refers to unknown module {}", site, module),
                ));
            }
        }
    }

    /// `roots` plus every module they include, transitively. Include cycles
    /// are flattened.
    fn transitive_modules(&self, roots: &[ModuleRef]) -> BTreeSet<ModuleRef> {
        let mut seen = BTreeSet::new();
        let mut stack = roots.to_vec();
        while let Some(m) = stack.pop() {
            if !seen.insert(m.clone()) {
                continue;
            }

            if let Some(desc) = self.modules.get(&m) {
                stack.extend(desc.includes.iter().cloned());
            }
        }
        seen
    }

    fn add_component(
        &mut self,
        arena: &mut Vec<ComponentDescriptor>,
        decl: &'a ComponentDecl,
        parent: Option<ComponentId>,
        inherited: &BTreeSet<ModuleRef>,
    ) -> Option<ComponentId> {
        let path = match parent {
            Some(p) => {
                let parent_path = &arena[p.index()].path;
                if parent_path.components().contains(&decl.name) {
                    self.errors.push(BindError::new(
                        BindErrorKind::Hierarchy,
                        format!(
                            "{} is its own ancestor: {} → {}",
                            decl.name, parent_path, decl.name
                        ),
                    ));
                    return None;
                }
                parent_path.child_path(decl.name.clone())
            }
            None => ComponentPath::root(decl.name.clone()),
        };

        let modules = self.transitive_modules(&decl.modules);
        let owned = modules
            .difference(inherited)
            .cloned()
            .collect::<BTreeSet<_>>();

        let id = ComponentId(arena.len() as u32);
        log::trace!("[descriptor] {} is {} in its tree", path, id);

        let mut entry_points = decl
            .entry_points
            .iter()
            .map(|e| EntryPoint {
                element: e.element.clone(),
                request: e.request.clone().with_element(e.element.clone()),
            })
            .collect::<Vec<_>>();

        let mut builder_children = vec![];
        for be in decl.builder_entry_points.iter() {
            let creator = self
                .components
                .get(&be.child)
                .and_then(|c| Self::creator_key(c));
            match creator {
                Some(key) => {
                    entry_points.push(EntryPoint {
                        element: be.element.clone(),
                        request: DependencyRequest::instance(key.clone())
                            .with_element(be.element.clone()),
                    });
                    builder_children.push((be.element.clone(), be.child.clone(), key));
                }
                None if self.components.contains_key(&be.child) => {
                    self.errors.push(BindError::new(
                        BindErrorKind::Creator,
                        format!(
                            "{} returns the creator of {}, which has no creator",
                            be.element, be.child
                        ),
                    ));
                }
                None => self.errors.push(BindError::new(
                    BindErrorKind::UnknownComponent,
                    format!("{} refers to unknown component {}", be.element, be.child),
                )),
            }
        }
        entry_points.sort_by(|a, b| a.element.cmp(&b.element));

        let dependencies = decl
            .dependencies
            .iter()
            .map(|d| ComponentRequirement::dependency(d.ty.clone()))
            .collect::<Vec<_>>();

        let creator = decl.creator.as_ref().map(|c| CreatorDescriptor {
            ty: c.ty.clone(),
            bound_instances: c
                .bound_instances
                .iter()
                .map(|b| ComponentRequirement::bound_instance(b.key.clone(), b.nullable))
                .collect(),
        });

        let mut requirements = owned
            .iter()
            .filter_map(|m| self.modules.get(m))
            .filter(|d| d.requires_instance())
            .map(|d| ComponentRequirement::module(&d.name, d.instantiable))
            .collect::<Vec<_>>();
        requirements.extend(dependencies.iter().cloned());
        if let Some(c) = &creator {
            requirements.extend(c.bound_instances.iter().cloned());
        }

        let component_bindings = self.component_bindings(decl, &builder_children);

        arena.push(ComponentDescriptor {
            id,
            name: decl.name.clone(),
            path,
            parent,
            is_subcomponent: decl.subcomponent,
            is_production: decl.production,
            scopes: decl.scopes.iter().cloned().collect(),
            modules,
            owned_modules: owned.clone(),
            dependencies,
            entry_points,
            children_by_factory_method: BTreeMap::new(),
            children_by_builder_entry_point: BTreeMap::new(),
            children_from_modules: BTreeSet::new(),
            creator,
            component_bindings,
            requirements,
        });

        let mut child_inherited = inherited.clone();
        child_inherited.extend(owned.iter().cloned());
        let mut memo = BTreeMap::new();

        let mut factory_methods = decl.factory_methods.iter().collect::<Vec<_>>();
        factory_methods.sort_by(|a, b| a.element.cmp(&b.element));
        for fm in factory_methods {
            let site = &fm.element;
            if let Some(child) =
                self.add_child(arena, id, &fm.child, &child_inherited, &mut memo, site)
            {
                let method = FactoryMethod {
                    element: fm.element.clone(),
                    child,
                    parameters: fm.parameters.clone(),
                };
                arena[id.index()]
                    .children_by_factory_method
                    .insert(fm.element.clone(), method);
            }
        }

        builder_children.sort();
        for (element, child_name, _) in builder_children {
            if let Some(child) =
                self.add_child(arena, id, &child_name, &child_inherited, &mut memo, &element)
            {
                arena[id.index()]
                    .children_by_builder_entry_point
                    .insert(element, child);
            }
        }

        let module_children = owned
            .iter()
            .filter_map(|m| self.modules.get(m))
            .flat_map(|m| m.subcomponents.iter().map(|s| (s.child.clone(), s.module.clone())))
            .collect::<BTreeSet<_>>();
        for (child_name, module) in module_children {
            if let Some(child) =
                self.add_child(arena, id, &child_name, &child_inherited, &mut memo, &module)
            {
                arena[id.index()].children_from_modules.insert(child);
            }
        }

        Some(id)
    }

    fn add_child(
        &mut self,
        arena: &mut Vec<ComponentDescriptor>,
        parent: ComponentId,
        name: &ComponentRef,
        inherited: &BTreeSet<ModuleRef>,
        memo: &mut BTreeMap<ComponentRef, ComponentId>,
        site: &dyn fmt::Display,
    ) -> Option<ComponentId> {
        if let Some(id) = memo.get(name) {
            return Some(*id);
        }

        let decl = match self.components.get(name) {
            Some(d) => *d,
            None => {
                self.errors.push(BindError::new(
                    BindErrorKind::UnknownComponent,
                    format!("{} refers to unknown component {}", site, name),
                ));
                return None;
            }
        };

        if !decl.subcomponent {
            self.errors.push(BindError::new(
                BindErrorKind::Hierarchy,
                format!(
                    "{} is not a subcomponent but is installed as a child of {} by {}",
                    name, arena[parent.index()].path, site
                ),
            ));
            return None;
        }

        let id = self.add_component(arena, decl, Some(parent), inherited)?;
        memo.insert(name.clone(), id);
        Some(id)
    }

    fn component_bindings(
        &self,
        decl: &ComponentDecl,
        builder_children: &[(ElementRef, ComponentRef, Key)],
    ) -> Vec<Binding> {
        let mut bindings = vec![Binding::new(
            Key::of(TypeRef::declared(decl.name.as_str())),
            BindingKind::Component,
        )
        .with_element(ElementRef::new(decl.name.as_str()))];

        for dep in decl.dependencies.iter() {
            bindings.push(
                Binding::new(Key::of(dep.ty.clone()), BindingKind::ComponentDependency)
                    .with_element(ElementRef::new(dep.ty.to_string())),
            );

            let kind = if dep.production {
                BindingKind::ComponentProduction
            } else {
                BindingKind::ComponentProvision
            };
            for m in dep.methods.iter() {
                let mut b = Binding::new(m.key.clone(), kind.clone()).with_element(m.element.clone());
                b.nullable = m.nullable;
                bindings.push(b);
            }
        }

        if let Some(creator) = &decl.creator {
            for bi in creator.bound_instances.iter() {
                let mut b = Binding::new(bi.key.clone(), BindingKind::BoundInstance)
                    .with_element(bi.element.clone());
                b.nullable = bi.nullable;
                bindings.push(b);
            }
        }

        for (element, child, key) in builder_children {
            bindings.push(
                Binding::new(
                    key.clone(),
                    BindingKind::SubcomponentCreator {
                        child: child.clone(),
                    },
                )
                .with_element(element.clone()),
            );
        }

        bindings.sort();
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RequirementKind;

    fn decls(json: &str) -> Declarations {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn owned_modules_exclude_inherited_ones() {
        let d = decls(
            r#"{
                "modules": [
                    {"name": "Base"},
                    {"name": "App", "includes": ["Base"]},
                    {"name": "Session", "includes": ["Base"]}
                ],
                "components": [
                    {"name": "AppComponent", "modules": ["App"],
                     "factory_methods": [{"element": "AppComponent.session", "child": "SessionComponent"}]},
                    {"name": "SessionComponent", "subcomponent": true, "modules": ["Session"]}
                ]
            }"#,
        );

        let desc = DescriptorBuilder::new(&d).build().unwrap();
        assert_eq!(desc.trees.len(), 1);
        let tree = &desc.trees[0];
        assert_eq!(tree.len(), 2);

        let child = tree.get(ComponentId(1));
        assert_eq!(child.parent, Some(ComponentId(0)));
        assert_eq!(child.path.to_string(), "AppComponent → SessionComponent");
        assert_eq!(
            child.owned_modules.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            vec!["Session"]
        );
        assert!(tree.inherited_modules(ComponentId(1)).contains(&ModuleRef::new("Base")));
        assert_eq!(tree.lineage(ComponentId(1)), vec![ComponentId(1), ComponentId(0)]);
    }

    #[test]
    fn include_cycles_are_flattened() {
        let d = decls(
            r#"{
                "modules": [
                    {"name": "A", "includes": ["B"]},
                    {"name": "B", "includes": ["A"]}
                ],
                "components": [{"name": "C", "modules": ["A"]}]
            }"#,
        );
        let desc = DescriptorBuilder::new(&d).build().unwrap();
        assert_eq!(desc.trees[0].root().modules.len(), 2);
    }

    #[test]
    fn subcomponent_that_is_its_own_ancestor_is_an_error() {
        let d = decls(
            r#"{
                "components": [
                    {"name": "Root",
                     "factory_methods": [{"element": "Root.a", "child": "A"}]},
                    {"name": "A", "subcomponent": true,
                     "factory_methods": [{"element": "A.b", "child": "B"}]},
                    {"name": "B", "subcomponent": true,
                     "factory_methods": [{"element": "B.a", "child": "A"}]}
                ]
            }"#,
        );
        let errors = DescriptorBuilder::new(&d).build().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, BindErrorKind::Hierarchy);
    }

    #[test]
    fn unknown_references_are_reported_together() {
        let d = decls(
            r#"{
                "modules": [{"name": "M", "includes": ["Nope"], "subcomponents": ["Ghost"]}],
                "components": [{"name": "C", "modules": ["M", "Missing"]}]
            }"#,
        );
        let errors = DescriptorBuilder::new(&d).build().unwrap_err();
        let kinds = errors.iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                BindErrorKind::UnknownModule,
                BindErrorKind::UnknownModule,
                BindErrorKind::UnknownComponent
            ]
        );
    }

    #[test]
    fn module_subcomponents_need_a_creator() {
        let d = decls(
            r#"{
                "modules": [{"name": "M", "subcomponents": ["Child"]}],
                "components": [
                    {"name": "C", "modules": ["M"]},
                    {"name": "Child", "subcomponent": true}
                ]
            }"#,
        );
        let errors = DescriptorBuilder::new(&d).build().unwrap_err();
        assert_eq!(errors[0].kind, BindErrorKind::Creator);
    }

    #[test]
    fn requirements_list_modules_then_dependencies_then_bound_instances() {
        let d = decls(
            r#"{
                "modules": [
                    {"name": "Instance", "bindings": [{"element": "Instance.a", "key": "A"}]},
                    {"name": "Static", "bindings": [{"element": "Static.b", "key": "B", "static": true}]}
                ],
                "components": [{
                    "name": "C",
                    "modules": ["Static", "Instance"],
                    "dependencies": [{"type": "Backend", "methods": [{"element": "Backend.db", "key": "Db"}]}],
                    "creator": {"type": "C.Builder", "bound_instances": [{"element": "C.Builder.name", "key": "@Named String"}]}
                }]
            }"#,
        );
        let desc = DescriptorBuilder::new(&d).build().unwrap();
        let root = desc.trees[0].root();
        let kinds = root.requirements.iter().map(|r| r.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                RequirementKind::Module,
                RequirementKind::Dependency,
                RequirementKind::BoundInstance
            ]
        );
        assert_eq!(root.requirements[0].to_string(), "module Instance");

        let kinds = root
            .component_bindings
            .iter()
            .map(|b| b.kind.clone())
            .collect::<Vec<_>>();
        assert!(kinds.contains(&BindingKind::Component));
        assert!(kinds.contains(&BindingKind::ComponentDependency));
        assert!(kinds.contains(&BindingKind::ComponentProvision));
        assert!(kinds.contains(&BindingKind::BoundInstance));
    }

    #[test]
    fn builder_entry_points_become_entry_points() {
        let d = decls(
            r#"{
                "components": [
                    {"name": "C",
                     "builder_entry_points": [{"element": "C.child", "child": "Child"}]},
                    {"name": "Child", "subcomponent": true, "creator": {"type": "Child.Builder"}}
                ]
            }"#,
        );
        let desc = DescriptorBuilder::new(&d).build().unwrap();
        let root = desc.trees[0].root();
        assert_eq!(root.entry_points.len(), 1);
        assert_eq!(root.entry_points[0].request.key.to_string(), "Child.Builder");
        assert_eq!(root.children_by_builder_entry_point.len(), 1);
    }
}
