//! Component descriptors: the read-only component trees the resolver works
//! over, assembled once from a [`Declarations`] set.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

mod builder;
pub mod decl;
mod module;

pub use builder::DescriptorBuilder;
pub use decl::Declarations;
pub use module::{
    DelegateDeclaration, ModuleDescriptor, MultibindingDeclaration, OptionalBindingDeclaration,
    SubcomponentDeclaration,
};

use crate::model::{
    Binding, ComponentPath, ComponentRef, DependencyRequest, ElementRef, Key, ModuleRef, Scope,
    TypeRef,
};

/// Index of a component within its [`ComponentTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RequirementKind {
    Module,
    Dependency,
    BoundInstance,
}

/// Something the generated container must be given or must construct.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ComponentRequirement {
    pub kind: RequirementKind,
    pub ty: TypeRef,
    /// Set for bound instances.
    pub key: Option<Key>,
    pub nullable: bool,
    /// The container cannot construct the requirement itself.
    pub requires_passed_instance: bool,
}

impl ComponentRequirement {
    pub fn module(module: &ModuleRef, instantiable: bool) -> ComponentRequirement {
        ComponentRequirement {
            kind: RequirementKind::Module,
            ty: TypeRef::declared(module.as_str()),
            key: None,
            nullable: false,
            requires_passed_instance: !instantiable,
        }
    }

    pub fn dependency(ty: TypeRef) -> ComponentRequirement {
        ComponentRequirement {
            kind: RequirementKind::Dependency,
            ty,
            key: None,
            nullable: false,
            requires_passed_instance: true,
        }
    }

    pub fn bound_instance(key: Key, nullable: bool) -> ComponentRequirement {
        ComponentRequirement {
            kind: RequirementKind::BoundInstance,
            ty: key.ty.clone(),
            key: Some(key),
            nullable,
            requires_passed_instance: true,
        }
    }
}

impl fmt::Display for ComponentRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RequirementKind::Module => write!(f, "module {}", self.ty),
            RequirementKind::Dependency => write!(f, "dependency {}", self.ty),
            RequirementKind::BoundInstance => match &self.key {
                Some(key) => write!(f, "bound instance {}", key),
                None => write!(f, "bound instance {}", self.ty),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub element: ElementRef,
    pub request: DependencyRequest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FactoryMethod {
    pub element: ElementRef,
    pub child: ComponentId,
    pub parameters: Vec<ModuleRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CreatorDescriptor {
    pub ty: TypeRef,
    pub bound_instances: Vec<ComponentRequirement>,
}

/// One component (or subcomponent) at one position in a component tree.
#[derive(Clone, Debug, Serialize)]
pub struct ComponentDescriptor {
    pub id: ComponentId,
    pub name: ComponentRef,
    pub path: ComponentPath,
    pub parent: Option<ComponentId>,
    pub is_subcomponent: bool,
    pub is_production: bool,
    pub scopes: BTreeSet<Scope>,
    /// Declared modules and everything they include.
    pub modules: BTreeSet<ModuleRef>,
    /// `modules` minus the modules owned by any ancestor.
    pub owned_modules: BTreeSet<ModuleRef>,
    pub dependencies: Vec<ComponentRequirement>,
    pub entry_points: Vec<EntryPoint>,
    pub children_by_factory_method: BTreeMap<ElementRef, FactoryMethod>,
    pub children_by_builder_entry_point: BTreeMap<ElementRef, ComponentId>,
    pub children_from_modules: BTreeSet<ComponentId>,
    pub creator: Option<CreatorDescriptor>,
    /// Bindings contributed by the component itself: its own type, its
    /// dependencies and their provision methods, bound instances and the
    /// creators returned by builder entry points.
    pub component_bindings: Vec<Binding>,
    pub requirements: Vec<ComponentRequirement>,
}

impl ComponentDescriptor {
    pub fn children(&self) -> BTreeSet<ComponentId> {
        self.children_by_factory_method
            .values()
            .map(|m| m.child)
            .chain(self.children_by_builder_entry_point.values().copied())
            .chain(self.children_from_modules.iter().copied())
            .collect()
    }

    /// The factory method creating `child`, if it is created by one.
    pub fn factory_method_for(&self, child: ComponentId) -> Option<&FactoryMethod> {
        self.children_by_factory_method
            .values()
            .find(|m| m.child == child)
    }
}

/// All components reachable from one root component, stored in an arena and
/// addressed by [`ComponentId`]. The root is always `ComponentId(0)` and
/// parents always precede their children.
#[derive(Clone, Debug, Serialize)]
pub struct ComponentTree {
    components: Vec<ComponentDescriptor>,
}

impl ComponentTree {
    pub(crate) fn new(components: Vec<ComponentDescriptor>) -> ComponentTree {
        ComponentTree { components }
    }

    pub fn root(&self) -> &ComponentDescriptor {
        &self.components[0]
    }

    pub fn get(&self, id: ComponentId) -> &ComponentDescriptor {
        &self.components[id.index()]
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.iter()
    }

    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.get(id).parent
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn lineage(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut ids = vec![id];
        let mut curr = id;
        while let Some(parent) = self.parent(curr) {
            ids.push(parent);
            curr = parent;
        }
        ids
    }

    pub fn path(&self, id: ComponentId) -> &ComponentPath {
        &self.get(id).path
    }

    pub fn find_by_path(&self, path: &ComponentPath) -> Option<ComponentId> {
        self.components.iter().find(|c| &c.path == path).map(|c| c.id)
    }

    pub fn child_named(&self, id: ComponentId, name: &ComponentRef) -> Option<ComponentId> {
        self.get(id)
            .children()
            .into_iter()
            .find(|c| &self.get(*c).name == name)
    }

    /// Modules owned by strict ancestors of `id`.
    pub fn inherited_modules(&self, id: ComponentId) -> BTreeSet<ModuleRef> {
        self.lineage(id)
            .into_iter()
            .skip(1)
            .flat_map(|a| self.get(a).owned_modules.iter().cloned())
            .collect()
    }
}

/// The output of the descriptor builder: every module plus one tree per
/// root component.
#[derive(Clone, Debug, Serialize)]
pub struct Descriptors {
    pub modules: BTreeMap<ModuleRef, ModuleDescriptor>,
    pub trees: Vec<ComponentTree>,
}
