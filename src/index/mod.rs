//! Key-indexed declarations for every component of one tree.
//!
//! Each component gets one level holding the declarations of its owned
//! modules and of the component itself. A component sees its own level and
//! the levels of all its ancestors.

use std::collections::{BTreeMap, BTreeSet};

use fnv::FnvHashMap;

use crate::descriptor::{
    ComponentId, ComponentTree, DelegateDeclaration, ModuleDescriptor, MultibindingDeclaration,
    OptionalBindingDeclaration, SubcomponentDeclaration,
};
use crate::model::{Binding, Key, ModuleRef, TypeRef};

type ByKey<T> = FnvHashMap<Key, BTreeSet<T>>;

fn insert<T: Ord>(map: &mut ByKey<T>, key: Key, value: T) {
    map.entry(key).or_insert_with(BTreeSet::new).insert(value);
}

fn lookup<'a, T>(map: &'a ByKey<T>, key: &Key) -> impl Iterator<Item = &'a T> {
    map.get(key).into_iter().flat_map(|s| s.iter())
}

#[derive(Debug, Default)]
struct Level {
    /// Unique bindings and individual contributions, by full key.
    bindings: ByKey<Binding>,
    /// Contributions by the collection key they contribute to.
    contributions: ByKey<Binding>,
    multibindings: ByKey<MultibindingDeclaration>,
    delegates: ByKey<DelegateDeclaration>,
    delegate_contributions: ByKey<DelegateDeclaration>,
    subcomponents: ByKey<SubcomponentDeclaration>,
    /// Optional declarations by unwrapped key.
    optionals: ByKey<OptionalBindingDeclaration>,
}

impl Level {
    fn add_binding(&mut self, b: &Binding) {
        if b.key.is_contribution() {
            insert(&mut self.contributions, b.key.base(), b.clone());
        }
        insert(&mut self.bindings, b.key.clone(), b.clone());
    }

    fn add_module(&mut self, module: &ModuleDescriptor) {
        for b in module.bindings.iter() {
            self.add_binding(b);
        }
        for m in module.multibindings.iter() {
            insert(&mut self.multibindings, m.key.clone(), m.clone());
        }
        for d in module.delegates.iter() {
            if d.key.is_contribution() {
                insert(&mut self.delegate_contributions, d.key.base(), d.clone());
            }
            insert(&mut self.delegates, d.key.clone(), d.clone());
        }
        for s in module.subcomponents.iter() {
            insert(&mut self.subcomponents, s.key.clone(), s.clone());
        }
        for o in module.optionals.iter() {
            insert(&mut self.optionals, o.key.clone(), o.clone());
        }
    }

    /// Every key a request could name to reach a declaration of this level.
    fn requestable_keys(&self) -> BTreeSet<Key> {
        let mut keys = BTreeSet::new();
        keys.extend(self.bindings.keys().filter(|k| !k.is_contribution()).cloned());
        keys.extend(self.contributions.keys().cloned());
        keys.extend(self.multibindings.keys().cloned());
        keys.extend(self.delegates.keys().filter(|k| !k.is_contribution()).cloned());
        keys.extend(self.delegate_contributions.keys().cloned());
        keys.extend(self.subcomponents.keys().cloned());
        keys.extend(
            self.optionals
                .keys()
                .map(|k| k.with_type(TypeRef::optional(k.ty.clone()))),
        );
        keys
    }
}

/// Declarations for one key as seen from one component, each tagged with the
/// component whose level declares it. Lists run from the component itself
/// towards the root.
#[derive(Debug)]
pub struct VisibleDeclarations<'a> {
    pub bindings: Vec<(ComponentId, &'a Binding)>,
    pub contributions: Vec<(ComponentId, &'a Binding)>,
    pub multibindings: Vec<(ComponentId, &'a MultibindingDeclaration)>,
    pub delegates: Vec<(ComponentId, &'a DelegateDeclaration)>,
    pub delegate_contributions: Vec<(ComponentId, &'a DelegateDeclaration)>,
    pub subcomponents: Vec<(ComponentId, &'a SubcomponentDeclaration)>,
    pub optionals: Vec<(ComponentId, &'a OptionalBindingDeclaration)>,
}

impl<'a> VisibleDeclarations<'a> {
    fn new() -> Self {
        VisibleDeclarations {
            bindings: vec![],
            contributions: vec![],
            multibindings: vec![],
            delegates: vec![],
            delegate_contributions: vec![],
            subcomponents: vec![],
            optionals: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
            && self.contributions.is_empty()
            && self.multibindings.is_empty()
            && self.delegates.is_empty()
            && self.delegate_contributions.is_empty()
            && self.subcomponents.is_empty()
            && self.optionals.is_empty()
    }

    pub fn has_multibinding_declarations(&self) -> bool {
        !self.contributions.is_empty()
            || !self.multibindings.is_empty()
            || !self.delegate_contributions.is_empty()
    }

    /// The unique bindings and delegate declarations of the nearest level
    /// that has any. Farther levels are shadowed.
    pub fn nearest_unique(
        &self,
    ) -> Option<(ComponentId, Vec<&'a Binding>, Vec<&'a DelegateDeclaration>)> {
        // ancestors always have smaller ids than their descendants
        let level = self
            .bindings
            .first()
            .map(|(c, _)| *c)
            .into_iter()
            .chain(self.delegates.first().map(|(c, _)| *c))
            .max()?;

        Some((
            level,
            only_at(&self.bindings, level),
            only_at(&self.delegates, level),
        ))
    }
}

fn only_at<T>(items: &[(ComponentId, T)], level: ComponentId) -> Vec<T>
where
    T: Copy,
{
    items
        .iter()
        .filter(|(c, _)| *c == level)
        .map(|(_, t)| *t)
        .collect()
}

/// Declaration index for one component tree.
#[derive(Debug)]
pub struct DeclarationIndex {
    levels: Vec<Level>,
    lineages: Vec<Vec<ComponentId>>,
}

impl DeclarationIndex {
    pub fn new(tree: &ComponentTree, modules: &BTreeMap<ModuleRef, ModuleDescriptor>) -> Self {
        let mut levels = vec![];
        let mut lineages = vec![];
        for c in tree.iter() {
            let mut level = Level::default();
            for m in c.owned_modules.iter() {
                if let Some(module) = modules.get(m) {
                    level.add_module(module);
                }
            }
            for b in c.component_bindings.iter() {
                level.add_binding(b);
            }
            log::trace!(
                "[index] {}: {} binding keys from {} owned modules",
                c.path,
                level.bindings.len(),
                c.owned_modules.len()
            );
            levels.push(level);
            lineages.push(tree.lineage(c.id));
        }

        DeclarationIndex { levels, lineages }
    }

    /// Everything visible from `component` that is declared for `key`.
    pub fn declarations(&self, component: ComponentId, key: &Key) -> VisibleDeclarations<'_> {
        let mut visible = VisibleDeclarations::new();
        for &c in self.lineages[component.index()].iter() {
            let level = &self.levels[c.index()];
            collect(&mut visible.bindings, c, lookup(&level.bindings, key));
            collect(&mut visible.contributions, c, lookup(&level.contributions, key));
            collect(&mut visible.multibindings, c, lookup(&level.multibindings, key));
            collect(&mut visible.delegates, c, lookup(&level.delegates, key));
            collect(
                &mut visible.delegate_contributions,
                c,
                lookup(&level.delegate_contributions, key),
            );
            collect(&mut visible.subcomponents, c, lookup(&level.subcomponents, key));
            collect(&mut visible.optionals, c, lookup(&level.optionals, key));
        }
        visible
    }

    /// True if `component`'s own level declares a unique binding, a delegate
    /// or a subcomponent whose creator is `key`.
    pub fn has_local_unique(&self, component: ComponentId, key: &Key) -> bool {
        let level = &self.levels[component.index()];
        level.bindings.contains_key(key)
            || level.delegates.contains_key(key)
            || level.subcomponents.contains_key(key)
    }

    /// True if `component`'s own level contributes to or declares the
    /// multibinding `key`.
    pub fn has_local_multibinding(&self, component: ComponentId, key: &Key) -> bool {
        let level = &self.levels[component.index()];
        level.contributions.contains_key(key)
            || level.multibindings.contains_key(key)
            || level.delegate_contributions.contains_key(key)
    }

    pub fn has_local_optional(&self, component: ComponentId, key: &Key) -> bool {
        self.levels[component.index()].optionals.contains_key(key)
    }

    /// Components of the tree whose own level binds `key`.
    pub fn components_binding(&self, key: &Key) -> Vec<ComponentId> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                l.bindings.contains_key(key)
                    || l.delegates.contains_key(key)
                    || l.contributions.contains_key(key)
            })
            .map(|(i, _)| ComponentId(i as u32))
            .collect()
    }

    /// Every key declared by `component`'s own level.
    pub fn requestable_keys(&self, component: ComponentId) -> BTreeSet<Key> {
        self.levels[component.index()].requestable_keys()
    }
}

fn collect<'a, T: 'a, I>(out: &mut Vec<(ComponentId, &'a T)>, c: ComponentId, items: I)
where
    I: Iterator<Item = &'a T>,
{
    out.extend(items.map(|t| (c, t)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Declarations, DescriptorBuilder};

    fn index(json: &str) -> (ComponentTree, DeclarationIndex) {
        let decls: Declarations = serde_json::from_str(json).unwrap();
        let desc = DescriptorBuilder::new(&decls).build().unwrap();
        let tree = desc.trees.into_iter().next().unwrap();
        let index = DeclarationIndex::new(&tree, &desc.modules);
        (tree, index)
    }

    const TREE: &str = r#"{
        "modules": [
            {"name": "RootModule", "bindings": [
                {"element": "RootModule.k", "key": "K"},
                {"element": "RootModule.a", "key": "Set<String>", "contribution": "set_element"}
            ]},
            {"name": "ChildModule",
             "bindings": [
                {"element": "ChildModule.k", "key": "K"},
                {"element": "ChildModule.b", "key": "Set<String>", "contribution": "set_element"}
             ],
             "optionals": [{"element": "ChildModule.opt", "key": "Clock"}]}
        ],
        "components": [
            {"name": "Root", "modules": ["RootModule"],
             "factory_methods": [{"element": "Root.child", "child": "Child"}]},
            {"name": "Child", "subcomponent": true, "modules": ["ChildModule"]}
        ]
    }"#;

    #[test]
    fn child_sees_its_own_and_inherited_declarations() {
        let (_, index) = index(TREE);
        let key = Key::parse("K").unwrap();

        let visible = index.declarations(ComponentId(1), &key);
        assert_eq!(visible.bindings.len(), 2);
        assert_eq!(visible.bindings[0].0, ComponentId(1));
        assert_eq!(visible.bindings[1].0, ComponentId(0));

        let (level, bindings, delegates) = visible.nearest_unique().unwrap();
        assert_eq!(level, ComponentId(1));
        assert_eq!(bindings.len(), 1);
        assert!(delegates.is_empty());

        let visible = index.declarations(ComponentId(0), &key);
        assert_eq!(visible.bindings.len(), 1);
    }

    #[test]
    fn contributions_are_indexed_by_collection_key() {
        let (_, index) = index(TREE);
        let key = Key::parse("Set<String>").unwrap();
        let visible = index.declarations(ComponentId(1), &key);
        assert_eq!(visible.contributions.len(), 2);
        assert!(visible.bindings.is_empty());
        assert!(visible.has_multibinding_declarations());
        assert!(index.has_local_multibinding(ComponentId(1), &key));
        assert!(!index.has_local_multibinding(ComponentId(0), &Key::parse("K").unwrap()));
    }

    #[test]
    fn requestable_keys_include_optionals() {
        let (_, index) = index(TREE);
        let keys = index
            .requestable_keys(ComponentId(1))
            .into_iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>();
        assert!(keys.contains(&str!("K")));
        assert!(keys.contains(&str!("Set<String>")));
        assert!(keys.contains(&str!("Optional<Clock>")));
        assert!(index.has_local_optional(ComponentId(1), &Key::parse("Clock").unwrap()));
    }

    #[test]
    fn unknown_keys_have_no_declarations() {
        let (tree, index) = index(TREE);
        let visible = index.declarations(tree.root().id, &Key::parse("Nope").unwrap());
        assert!(visible.is_empty());
        assert!(visible.nearest_unique().is_none());
    }
}
