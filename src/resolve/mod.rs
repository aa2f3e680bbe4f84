//! Resolution of keys to bindings across one component tree.
//!
//! A [`Resolver`] owns every cache of one root pass: resolved bindings per
//! `(component, key)`, the local-dependency memo and the set of children
//! whose creators were requested. Nothing is shared between roots.

use std::collections::BTreeSet;

use fnv::FnvHashMap;

mod multibinding;
mod registry;
mod resolved;

pub use registry::InjectRegistry;
pub use resolved::ResolvedBindings;

use crate::collections::OrderedHashMap;
use crate::descriptor::{ComponentId, ComponentTree, DelegateDeclaration};
use crate::errors::{Defect, DefectKind};
use crate::index::DeclarationIndex;
use crate::model::{
    Binding, BindingKind, DependencyRequest, Key, RequestKind, TypeRef,
};

/// Everything one resolution pass produced.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub contribution: Vec<OrderedHashMap<Key, ResolvedBindings>>,
    pub members_injection: Vec<OrderedHashMap<Key, ResolvedBindings>>,
    /// Components whose entry points were resolved, in resolution order.
    pub components: Vec<ComponentId>,
    pub defects: Vec<Defect>,
}

impl Resolution {
    pub fn resolved(&self, component: ComponentId, key: &Key) -> Option<&ResolvedBindings> {
        self.contribution[component.index()].get(key)
    }

    pub fn members_injection(
        &self,
        component: ComponentId,
        key: &Key,
    ) -> Option<&ResolvedBindings> {
        self.members_injection[component.index()].get(key)
    }

    /// The resolution a request from `component` leads to.
    pub fn for_request(
        &self,
        component: ComponentId,
        request: &DependencyRequest,
    ) -> Option<&ResolvedBindings> {
        match request.kind {
            RequestKind::MembersInjection => self.members_injection(component, &request.key),
            _ => self.resolved(component, &request.key),
        }
    }

    pub fn is_resolved(&self, component: ComponentId) -> bool {
        self.components.contains(&component)
    }
}

pub struct Resolver<'a> {
    tree: &'a ComponentTree,
    index: &'a DeclarationIndex,
    registry: &'a InjectRegistry,
    full_binding_graph: bool,
    resolved: Vec<OrderedHashMap<Key, ResolvedBindings>>,
    members: Vec<OrderedHashMap<Key, ResolvedBindings>>,
    local_deps: Vec<FnvHashMap<Key, bool>>,
    delegate_chain: Vec<Key>,
    delegate_cycles: BTreeSet<Vec<Key>>,
    scheduled: BTreeSet<ComponentId>,
    defects: Vec<Defect>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        tree: &'a ComponentTree,
        index: &'a DeclarationIndex,
        registry: &'a InjectRegistry,
    ) -> Resolver<'a> {
        let n = tree.len();
        Resolver {
            tree,
            index,
            registry,
            full_binding_graph: false,
            resolved: (0..n).map(|_| OrderedHashMap::new()).collect(),
            members: (0..n).map(|_| OrderedHashMap::new()).collect(),
            local_deps: (0..n).map(|_| FnvHashMap::default()).collect(),
            delegate_chain: vec![],
            delegate_cycles: BTreeSet::new(),
            scheduled: BTreeSet::new(),
            defects: vec![],
        }
    }

    /// Resolve every key declared by every installed module, and every
    /// child, instead of only what entry points reach.
    pub fn full_binding_graph(mut self, full: bool) -> Resolver<'a> {
        self.full_binding_graph = full;
        self
    }

    /// Resolves the entry points of every reachable component, parents
    /// before children.
    pub fn run(mut self) -> Resolution {
        let mut done = BTreeSet::new();
        let mut order = vec![];
        while let Some(c) = self.next_component(&done) {
            self.resolve_component(c);
            done.insert(c);
            order.push(c);
        }

        log::debug!(
            "[resolve] {}: resolved {} of {} components",
            self.tree.root().name,
            order.len(),
            self.tree.len()
        );

        Resolution {
            contribution: self.resolved,
            members_injection: self.members,
            components: order,
            defects: self.defects,
        }
    }

    fn next_component(&self, done: &BTreeSet<ComponentId>) -> Option<ComponentId> {
        self.tree
            .iter()
            .map(|c| c.id)
            .find(|id| !done.contains(id) && self.is_reachable(*id, done))
    }

    /// Children created through component methods are always resolved;
    /// module-declared children only once their creator was requested.
    fn is_reachable(&self, id: ComponentId, done: &BTreeSet<ComponentId>) -> bool {
        let parent = unless!(self.tree.parent(id), else { return true });
        if !done.contains(&parent) {
            return false;
        }

        let p = self.tree.get(parent);
        self.full_binding_graph
            || self.scheduled.contains(&id)
            || p.children_by_factory_method.values().any(|m| m.child == id)
            || p.children_by_builder_entry_point.values().any(|c| *c == id)
    }

    fn resolve_component(&mut self, c: ComponentId) {
        let tree = self.tree;
        let desc = tree.get(c);
        log::debug!("[resolve] resolving {}", desc.path);

        for ep in desc.entry_points.iter() {
            self.resolve_request(c, &ep.request);
        }

        if self.full_binding_graph {
            for key in self.index.requestable_keys(c) {
                self.resolve_key(c, &key);
            }
        }
    }

    /// Resolves `key` in `component` and returns the result.
    pub fn resolve(&mut self, component: ComponentId, key: &Key) -> ResolvedBindings {
        self.resolve_key(component, key);
        self.resolved[component.index()]
            .get(key)
            .cloned()
            .unwrap_or_else(|| ResolvedBindings::no_bindings(key.clone()))
    }

    /// Defects recorded so far.
    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    fn resolve_request(&mut self, c: ComponentId, request: &DependencyRequest) {
        self.resolve_pending(vec![(c, request.clone())]);
    }

    fn resolve_key(&mut self, c: ComponentId, key: &Key) {
        let request = DependencyRequest::new(key.clone(), RequestKind::Instance);
        self.resolve_pending(vec![(c, request)]);
    }

    /// Resolves requests and everything they depend on, depth first.
    fn resolve_pending(&mut self, mut pending: Vec<(ComponentId, DependencyRequest)>) {
        while let Some((c, request)) = pending.pop() {
            let deps = match request.kind {
                RequestKind::MembersInjection => {
                    self.resolve_members_injection(c, &request.key)
                }
                _ => self.resolve_single(c, &request.key),
            };
            pending.extend(deps.into_iter().rev().map(|d| (c, d)));
        }
    }

    /// Resolves `key` alone and returns the requests its new bindings make.
    fn resolve_single(&mut self, c: ComponentId, key: &Key) -> Vec<DependencyRequest> {
        if self.resolved[c.index()].contains_key(key) {
            return vec![];
        }

        // a key an ancestor already resolved is shared with it unless this
        // component changes what the key resolves to
        if let Some(parent) = self.tree.parent(c) {
            if self.previously_resolved(parent, key).is_some()
                && !self.index.has_local_unique(c, key)
                && !self.key_depends_on_local(c, key)
            {
                self.resolve_key(parent, key);
                if let Some(rb) = self.resolved[parent.index()].get(key).cloned() {
                    log::trace!(
                        "[resolve] {} in {} reuses {}",
                        key,
                        self.tree.path(c),
                        self.tree.path(parent)
                    );
                    self.resolved[c.index()].insert(key.clone(), rb);
                    return vec![];
                }
            }
        }

        let rb = self.lookup_bindings(c, key);
        log::trace!(
            "[resolve] {} in {}: {} binding(s)",
            key,
            self.tree.path(c),
            rb.binding_count()
        );

        let deps = rb
            .bindings_owned_by(c)
            .into_iter()
            .flat_map(|b| b.dependencies.iter().cloned())
            .collect::<Vec<_>>();
        self.resolved[c.index()].insert(key.clone(), rb);
        deps
    }

    fn resolve_members_injection(&mut self, c: ComponentId, key: &Key) -> Vec<DependencyRequest> {
        if self.members[c.index()].contains_key(key) {
            return vec![];
        }

        let (rb, deps) = match self.registry.members_injection_binding(key) {
            Some(b) => {
                let deps = b.dependencies.clone();
                (ResolvedBindings::for_members_injection(key.clone(), c, b), deps)
            }
            None => (ResolvedBindings::no_bindings(key.clone()), vec![]),
        };
        self.members[c.index()].insert(key.clone(), rb);
        deps
    }

    fn previously_resolved(&self, start: ComponentId, key: &Key) -> Option<&ResolvedBindings> {
        self.tree
            .lineage(start)
            .into_iter()
            .find_map(|a| self.resolved[a.index()].get(key))
    }

    /// Collects every binding satisfying `key` as seen from `c`, each paired
    /// with its owner.
    fn lookup_bindings(&mut self, c: ComponentId, key: &Key) -> ResolvedBindings {
        let index = self.index;
        let tree = self.tree;
        let mut rb = ResolvedBindings::no_bindings(key.clone());
        // bindings with the level that declares them, if any
        let mut candidates: Vec<(Binding, Option<ComponentId>)> = vec![];

        let visible = index.declarations(c, key);
        if let Some((level, bindings, delegates)) = visible.nearest_unique() {
            for b in bindings {
                candidates.push((b.clone(), Some(level)));
            }
            for d in delegates {
                candidates.push((self.delegate_binding(c, d), Some(level)));
            }
        }

        rb.subcomponent_declarations
            .extend(visible.subcomponents.iter().map(|(_, s)| (*s).clone()));
        if let Some((level, decl)) = visible.subcomponents.first() {
            let mut binding = Binding::new(
                key.clone(),
                BindingKind::SubcomponentCreator {
                    child: decl.child.clone(),
                },
            );
            binding.module = Some(decl.module.clone());
            if let Some(child) = tree.child_named(*level, &decl.child) {
                self.scheduled.insert(child);
            }
            candidates.push((binding, Some(*level)));
        }

        if let Some((binding, declarations)) = self.multibinding_for(c, key) {
            rb.multibinding_declarations.extend(declarations);
            candidates.push((binding, None));
        }

        if let Some(binding) = self.optional_binding(c, key, &mut rb) {
            candidates.push((binding, None));
        }

        if candidates.is_empty() {
            if let Some(binding) = self.registry.provision_binding(key) {
                candidates.push((binding, None));
            }
        }

        for (binding, level) in candidates {
            let owner = self.owning_component(c, key, &binding, level);
            rb.add(owner, binding);
        }
        rb
    }

    fn optional_binding(
        &mut self,
        c: ComponentId,
        key: &Key,
        rb: &mut ResolvedBindings,
    ) -> Option<Binding> {
        let inner = key.unwrapped_optional()?;
        let declarations = self.index.declarations(c, &inner).optionals;
        if declarations.is_empty() {
            return None;
        }
        rb.optional_declarations
            .extend(declarations.into_iter().map(|(_, d)| d.clone()));

        if !self.has_bindings(c, &inner) {
            return Some(Binding::new(key.clone(), BindingKind::OptionalAbsent));
        }

        let kind = match &key.ty {
            TypeRef::Optional(t) => RequestKind::unwrap(t).0,
            _ => RequestKind::Instance,
        };
        Some(
            Binding::new(key.clone(), BindingKind::OptionalPresent)
                .with_dependencies(vec![DependencyRequest::new(inner, kind)]),
        )
    }

    /// True if anything at all could satisfy `key` from `c`. Has no side
    /// effects.
    fn has_bindings(&self, c: ComponentId, key: &Key) -> bool {
        let index = self.index;
        let visible = index.declarations(c, key);
        if !visible.bindings.is_empty()
            || !visible.delegates.is_empty()
            || !visible.subcomponents.is_empty()
        {
            return true;
        }

        if key
            .matching_keys()
            .iter()
            .any(|k| index.declarations(c, k).has_multibinding_declarations())
        {
            return true;
        }

        if let Some(inner) = key.unwrapped_optional() {
            if !index.declarations(c, &inner).optionals.is_empty() {
                return true;
            }
        }

        self.registry.provision_binding(key).is_some()
    }

    fn delegate_binding(&mut self, c: ComponentId, decl: &DelegateDeclaration) -> Binding {
        let target = &decl.delegate.key;
        self.delegate_chain.push(decl.key.clone());
        let cyclic = self.follow_delegates(c, target);
        self.delegate_chain.pop();

        let nullable = !cyclic
            && self
                .index
                .declarations(c, target)
                .nearest_unique()
                .map_or(false, |(_, bs, _)| bs.iter().any(|b| b.nullable));

        Binding {
            key: decl.key.clone(),
            kind: BindingKind::Delegate,
            contribution_type: decl.contribution_type,
            // a delegate that aliases itself has nothing to depend on
            dependencies: if cyclic {
                vec![]
            } else {
                vec![decl.delegate.clone()]
            },
            scope: decl.scope.clone(),
            element: Some(decl.element.clone()),
            module: Some(decl.module.clone()),
            nullable,
            map_key: decl.map_key.clone(),
            requires_module_instance: false,
        }
    }

    /// Walks delegate declarations from `key`. Returns true if the walk
    /// leads back to the start of the current chain.
    fn follow_delegates(&mut self, c: ComponentId, key: &Key) -> bool {
        if let Some(pos) = self.delegate_chain.iter().position(|k| k == key) {
            let cycle = self.delegate_chain[pos..].to_vec();
            self.report_delegate_cycle(c, cycle);
            return pos == 0;
        }

        let index = self.index;
        let targets = match index.declarations(c, key).nearest_unique() {
            Some((_, _, delegates)) => delegates
                .iter()
                .map(|d| d.delegate.key.clone())
                .collect::<Vec<_>>(),
            None => vec![],
        };

        self.delegate_chain.push(key.clone());
        let mut reaches_start = false;
        for t in targets.iter() {
            reaches_start |= self.follow_delegates(c, t);
        }
        self.delegate_chain.pop();
        reaches_start
    }

    fn report_delegate_cycle(&mut self, c: ComponentId, mut cycle: Vec<Key>) {
        // rotate so the same cycle found from another key is recognized
        let start = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, k)| *k)
            .map_or(0, |(i, _)| i);
        cycle.rotate_left(start);
        if !self.delegate_cycles.insert(cycle.clone()) {
            return;
        }

        let mut chain = cycle.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        if let Some(first) = cycle.first() {
            chain.push(first.to_string());
        }
        log::debug!("[resolve] delegate cycle: {}", chain.join(" -> "));
        self.defects.push(
            Defect::new(
                DefectKind::DelegateCycle,
                format!("Found a delegate cycle: {}", chain.join(" -> ")),
            )
            .with_keys(cycle)
            .with_component(self.tree.path(c).clone()),
        );
    }

    /// The component that owns `binding` when `key` is requested from `c`.
    ///
    /// Explicit bindings belong to the component whose level declares them,
    /// scoped implicit bindings to the nearest component with their scope
    /// and reusable ones to the highest component that already resolved
    /// them. A binding that depends on bindings installed locally in `c` is
    /// owned by `c` regardless.
    fn owning_component(
        &mut self,
        c: ComponentId,
        key: &Key,
        binding: &Binding,
        declared_at: Option<ComponentId>,
    ) -> ComponentId {
        let tree = self.tree;
        let target = if declared_at.is_some() {
            declared_at
        } else if binding.scope.as_ref().map_or(false, |s| s.is_reusable()) {
            tree.lineage(c).into_iter().rev().find(|a| {
                *a != c
                    && self.resolved[a.index()]
                        .get(key)
                        .map_or(false, |rb| rb.owner_of(binding).is_some())
            })
        } else if let Some(scope) = binding.strict_scope() {
            tree.lineage(c)
                .into_iter()
                .find(|a| tree.get(*a).scopes.contains(scope))
        } else {
            None
        };

        let target = unless!(target, else { return c });
        let parent = unless!(tree.parent(c), else { return c });
        if target == c {
            return c;
        }

        self.resolve_key(parent, key);
        let owner = self.resolved[parent.index()]
            .get(key)
            .and_then(|rb| rb.owner_of(binding));
        match owner {
            Some(o) if !self.binding_depends_on_local(c, binding) => o,
            _ => c,
        }
    }

    /// True if what `key` resolves to in an ancestor would change in `c`
    /// because of multibinding contributions or optional declarations
    /// installed by `c` itself, directly or through the unscoped bindings
    /// the ancestor resolved it to.
    fn key_depends_on_local(&mut self, c: ComponentId, key: &Key) -> bool {
        if let Some(v) = self.local_deps[c.index()].get(key) {
            return *v;
        }

        let mut seen = BTreeSet::new();
        let mut pending = vec![key.clone()];
        let mut result = false;
        while let Some(k) = pending.pop() {
            match self.local_deps[c.index()].get(&k).copied() {
                Some(true) => {
                    result = true;
                    break;
                }
                Some(false) => continue,
                None => {}
            }
            if !seen.insert(k.clone()) {
                continue;
            }
            if self.changes_locally(c, &k) {
                result = true;
                break;
            }
            pending.extend(self.inherited_dependencies(c, &k));
        }

        // without a hit every key visited had its whole closure explored
        if result {
            self.local_deps[c.index()].insert(key.clone(), true);
        } else {
            for k in seen {
                self.local_deps[c.index()].insert(k, false);
            }
        }
        result
    }

    fn changes_locally(&self, c: ComponentId, key: &Key) -> bool {
        let index = self.index;
        if key
            .matching_keys()
            .iter()
            .any(|k| index.has_local_multibinding(c, k))
        {
            return true;
        }
        key.unwrapped_optional().map_or(false, |inner| {
            index.has_local_optional(c, &inner) || index.has_local_unique(c, &inner)
        })
    }

    /// Dependency keys of the bindings an ancestor of `c` resolved `key` to,
    /// skipping those that always stay with their owner.
    fn inherited_dependencies(&self, c: ComponentId, key: &Key) -> Vec<Key> {
        let parent = unless!(self.tree.parent(c), else { return vec![] });
        self.previously_resolved(parent, key)
            .map(|rb| {
                rb.bindings()
                    .filter(|(_, b)| b.strict_scope().is_none() && !b.is_production())
                    .flat_map(|(_, b)| b.dependencies.iter().map(|d| d.key.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Scoped and production bindings always stay with their owner.
    fn binding_depends_on_local(&mut self, c: ComponentId, binding: &Binding) -> bool {
        if binding.strict_scope().is_some() || binding.is_production() {
            return false;
        }

        let keys = binding
            .dependencies
            .iter()
            .map(|d| d.key.clone())
            .collect::<Vec<_>>();
        keys.iter().any(|k| self.key_depends_on_local(c, k))
    }
}
