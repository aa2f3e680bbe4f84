use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::{
    ComponentId, MultibindingDeclaration, OptionalBindingDeclaration, SubcomponentDeclaration,
};
use crate::model::{Binding, Key};

/// The result of resolving one key in one component: every binding that
/// satisfies the key, grouped by the component that owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBindings {
    pub key: Key,
    pub contribution_bindings: BTreeMap<ComponentId, BTreeSet<Binding>>,
    pub members_injection_bindings: BTreeMap<ComponentId, Binding>,
    pub multibinding_declarations: BTreeSet<MultibindingDeclaration>,
    pub subcomponent_declarations: BTreeSet<SubcomponentDeclaration>,
    pub optional_declarations: BTreeSet<OptionalBindingDeclaration>,
}

impl ResolvedBindings {
    pub fn no_bindings(key: Key) -> ResolvedBindings {
        ResolvedBindings {
            key,
            contribution_bindings: BTreeMap::new(),
            members_injection_bindings: BTreeMap::new(),
            multibinding_declarations: BTreeSet::new(),
            subcomponent_declarations: BTreeSet::new(),
            optional_declarations: BTreeSet::new(),
        }
    }

    pub fn for_members_injection(
        key: Key,
        owner: ComponentId,
        binding: Binding,
    ) -> ResolvedBindings {
        let mut rb = ResolvedBindings::no_bindings(key);
        rb.members_injection_bindings.insert(owner, binding);
        rb
    }

    pub fn add(&mut self, owner: ComponentId, binding: Binding) {
        self.contribution_bindings
            .entry(owner)
            .or_insert_with(BTreeSet::new)
            .insert(binding);
    }

    /// True if nothing satisfies the key.
    pub fn is_empty(&self) -> bool {
        self.contribution_bindings.is_empty() && self.members_injection_bindings.is_empty()
    }

    /// All bindings with their owners, contribution bindings first.
    pub fn bindings(&self) -> impl Iterator<Item = (ComponentId, &Binding)> {
        self.contribution_bindings
            .iter()
            .flat_map(|(c, bs)| bs.iter().map(move |b| (*c, b)))
            .chain(
                self.members_injection_bindings
                    .iter()
                    .map(|(c, b)| (*c, b)),
            )
    }

    pub fn binding_count(&self) -> usize {
        self.bindings().count()
    }

    /// The chosen binding. When several bindings conflict the smallest one
    /// is chosen so the choice is stable.
    pub fn binding(&self) -> Option<&Binding> {
        self.bindings().map(|(_, b)| b).min()
    }

    pub fn bindings_owned_by(&self, component: ComponentId) -> Vec<&Binding> {
        self.bindings()
            .filter(|(c, _)| *c == component)
            .map(|(_, b)| b)
            .collect()
    }

    pub fn owner_of(&self, binding: &Binding) -> Option<ComponentId> {
        self.bindings().find(|(_, b)| *b == binding).map(|(c, _)| c)
    }

    pub fn owning_components(&self) -> BTreeSet<ComponentId> {
        self.bindings().map(|(c, _)| c).collect()
    }
}
