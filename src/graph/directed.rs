use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::Hash;

use fnv::FnvHashMap;

/// A directed graph over node handles of type `T`, stored as adjacency lists.
///
/// An edge `from -> to` means that `from` depends on `to`.
#[derive(Clone, Debug)]
pub struct DirectedGraph<T> {
    edges: BTreeMap<T, Vec<T>>,
}

impl<T: Clone + Eq + Hash + Ord> Default for DirectedGraph<T> {
    fn default() -> Self {
        DirectedGraph::new()
    }
}

impl<T: Clone + Eq + Hash + Ord> DirectedGraph<T> {
    pub fn new() -> Self {
        DirectedGraph {
            edges: BTreeMap::new(),
        }
    }

    pub fn add_node(&mut self, id: T) {
        self.edges.entry(id).or_insert_with(Vec::new);
    }

    /// Adds `from -> to`, creating both nodes if needed.
    pub fn add_edge(&mut self, from: T, to: T) {
        let succ = self.edges.entry(from).or_insert_with(Vec::new);
        if !succ.contains(&to) {
            succ.push(to.clone());
        }
        self.edges.entry(to).or_insert_with(Vec::new);
    }

    pub fn neighbours(&self, id: &T) -> &[T] {
        self.edges.get(id).map(|n| n.as_slice()).unwrap_or(&[])
    }

    pub fn has_edge(&self, from: &T, to: &T) -> bool {
        self.neighbours(from).contains(to)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Strongly connected components in reverse topological order, each
    /// listed in the order Tarjan's algorithm closes it. Singletons are
    /// included.
    pub fn compute_sccs(&self) -> Vec<Vec<T>> {
        SccBuilder::new(self).run()
    }

    /// The shortest path from `start` back to itself that stays inside
    /// `within`, as a list of nodes beginning with `start`.
    pub fn shortest_cycle(&self, start: &T, within: &BTreeSet<T>) -> Option<Vec<T>> {
        let mut prev: BTreeMap<T, T> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());

        while let Some(curr) = queue.pop_front() {
            for next in self.neighbours(&curr) {
                if !within.contains(next) {
                    continue;
                }

                if next == start {
                    let mut path = vec![curr.clone()];
                    let mut at = curr;
                    while let Some(p) = prev.get(&at) {
                        path.push(p.clone());
                        at = p.clone();
                    }
                    path.reverse();
                    return Some(path);
                }

                if !prev.contains_key(next) {
                    prev.insert(next.clone(), curr.clone());
                    queue.push_back(next.clone());
                }
            }
        }
        None
    }
}

/// Tarjan's algorithm over node indices.
struct SccBuilder<'a, T> {
    graph: &'a DirectedGraph<T>,
    nodes: Vec<T>,
    idx: FnvHashMap<T, usize>,
    index: usize,
    indices: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    sccs: Vec<Vec<T>>,
}

impl<'a, T: Clone + Eq + Hash + Ord> SccBuilder<'a, T> {
    fn new(graph: &'a DirectedGraph<T>) -> Self {
        let nodes = graph.edges.keys().cloned().collect::<Vec<_>>();
        let idx = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect::<FnvHashMap<_, _>>();

        let n = nodes.len();
        SccBuilder {
            graph,
            nodes,
            idx,
            index: 0,
            indices: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: vec![],
            sccs: vec![],
        }
    }

    fn visit(&mut self, v: usize) -> Vec<usize> {
        self.indices[v] = Some(self.index);
        self.lowlink[v] = self.index;
        self.index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;

        let graph = self.graph;
        graph
            .neighbours(&self.nodes[v])
            .iter()
            .filter_map(|w| self.idx.get(w).copied())
            .collect()
    }

    /// Tarjan's walk from `root`, with an explicit stack of
    /// `(node, successors, next successor)` frames.
    fn strong_connect(&mut self, root: usize) {
        let successors = self.visit(root);
        let mut frames = vec![(root, successors, 0)];

        loop {
            let (v, next) = match frames.last_mut() {
                Some((v, successors, pos)) => {
                    let next = successors.get(*pos).copied();
                    *pos += 1;
                    (*v, next)
                }
                None => break,
            };

            if let Some(w) = next {
                match self.indices[w] {
                    None => {
                        let successors = self.visit(w);
                        frames.push((w, successors, 0));
                    }
                    Some(idx_w) if self.on_stack[w] => {
                        self.lowlink[v] = self.lowlink[v].min(idx_w);
                    }
                    _ => {}
                }
                continue;
            }

            frames.pop();
            if let Some((parent, _, _)) = frames.last() {
                self.lowlink[*parent] = self.lowlink[*parent].min(self.lowlink[v]);
            }

            if Some(self.lowlink[v]) == self.indices[v] {
                let mut component = vec![];
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    component.push(self.nodes[w].clone());
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(component);
            }
        }
    }

    fn run(mut self) -> Vec<Vec<T>> {
        for v in 0..self.nodes.len() {
            if self.indices[v].is_none() {
                self.strong_connect(v);
            }
        }
        self.sccs
    }
}
