//! Validation passes over an exported binding network.
//!
//! Each pass reads the frozen [`TopLevelBindingGraph`] and appends
//! [`Defect`]s; none of them mutates the graph. The combined list is sorted
//! and de-duplicated so it does not depend on the order passes run in.

use std::str::FromStr;

use crate::errors::{BindError, BindErrorKind, Defect, Severity};
use crate::graph::{BindingNode, Node, NodeId, TopLevelBindingGraph};
use crate::model::{BindingKind, DependencyRequest};

mod assisted;
mod cycles;
mod duplicates;
mod factory_methods;
mod missing;
mod multibindings;
mod nullable;
mod production;
mod production_executor;
mod scopes;

bitflags::bitflags! {
    pub struct Passes: u16 {
        const CYCLES          = 1 << 0;
        const DUPLICATES      = 1 << 1;
        const MISSING         = 1 << 2;
        const SCOPES          = 1 << 3;
        const MULTIBINDINGS   = 1 << 4;
        const NULLABLE        = 1 << 5;
        const PRODUCTION      = 1 << 6;
        const ASSISTED        = 1 << 7;
        const FACTORY_METHODS = 1 << 8;
        const PRODUCTION_EXECUTOR = 1 << 9;
    }
}

impl Passes {
    const NAMES: [(&'static str, Passes); 10] = [
        ("cycles", Passes::CYCLES),
        ("duplicates", Passes::DUPLICATES),
        ("missing", Passes::MISSING),
        ("scopes", Passes::SCOPES),
        ("multibindings", Passes::MULTIBINDINGS),
        ("nullable", Passes::NULLABLE),
        ("production", Passes::PRODUCTION),
        ("assisted", Passes::ASSISTED),
        ("factory-methods", Passes::FACTORY_METHODS),
        ("production-executor", Passes::PRODUCTION_EXECUTOR),
    ];

    pub fn names() -> impl Iterator<Item = &'static str> {
        Passes::NAMES.iter().map(|(n, _)| *n)
    }

    /// Every pass except the named ones.
    pub fn without<S: AsRef<str>>(names: &[S]) -> Result<Passes, BindError> {
        names.iter().try_fold(Passes::all(), |passes, name| {
            Ok(passes - name.as_ref().parse::<Passes>()?)
        })
    }
}

impl Default for Passes {
    fn default() -> Passes {
        Passes::all()
    }
}

impl FromStr for Passes {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        Passes::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
            .ok_or_else(|| {
                BindError::new(
                    BindErrorKind::Parse,
                    format!(
                        "unknown analysis pass `{}`, expected one of: {}",
                        s,
                        Passes::names().collect::<Vec<_>>().join(", ")
                    ),
                )
            })
    }
}

/// Runs the selected passes over one exported graph.
pub struct Analyzer<'g> {
    graph: &'g TopLevelBindingGraph,
    passes: Passes,
    nullable_severity: Severity,
}

impl<'g> Analyzer<'g> {
    pub fn new(graph: &'g TopLevelBindingGraph) -> Analyzer<'g> {
        Analyzer {
            graph,
            passes: Passes::all(),
            nullable_severity: Severity::Error,
        }
    }

    pub fn passes(mut self, passes: Passes) -> Analyzer<'g> {
        self.passes = passes;
        self
    }

    pub fn nullable_severity(mut self, severity: Severity) -> Analyzer<'g> {
        self.nullable_severity = severity;
        self
    }

    pub fn analyze(&self) -> Vec<Defect> {
        let graph = self.graph;
        let mut defects = vec![];
        let passes: [(Passes, &dyn Fn(&mut Vec<Defect>)); 10] = [
            (Passes::CYCLES, &|d| cycles::check(graph, d)),
            (Passes::DUPLICATES, &|d| duplicates::check(graph, d)),
            (Passes::MISSING, &|d| missing::check(graph, d)),
            (Passes::SCOPES, &|d| scopes::check(graph, d)),
            (Passes::MULTIBINDINGS, &|d| multibindings::check(graph, d)),
            (Passes::NULLABLE, &|d| {
                nullable::check(graph, self.nullable_severity, d)
            }),
            (Passes::PRODUCTION, &|d| production::check(graph, d)),
            (Passes::ASSISTED, &|d| assisted::check(graph, d)),
            (Passes::FACTORY_METHODS, &|d| factory_methods::check(graph, d)),
            (Passes::PRODUCTION_EXECUTOR, &|d| production_executor::check(graph, d)),
        ];

        for (pass, run) in passes.iter() {
            if self.passes.contains(*pass) {
                let before = defects.len();
                run(&mut defects);
                log::trace!(
                    "[analysis] {:?}: {} defect(s)",
                    pass,
                    defects.len() - before
                );
            }
        }

        defects.sort();
        defects.dedup();
        log::debug!(
            "[analysis] {}: {} defect(s)",
            graph.tree().root().path,
            defects.len()
        );
        defects
    }
}

/// Runs `passes` over `graph`.
pub fn analyze(
    graph: &TopLevelBindingGraph,
    passes: Passes,
    nullable_severity: Severity,
) -> Vec<Defect> {
    Analyzer::new(graph)
        .passes(passes)
        .nullable_severity(nullable_severity)
        .analyze()
}

fn binding_node(graph: &TopLevelBindingGraph, id: NodeId) -> Option<&BindingNode> {
    graph.node(id).as_binding()
}

/// Where `request` comes from, for defect chains.
fn requested_at(graph: &TopLevelBindingGraph, source: NodeId, request: &DependencyRequest) -> String {
    match graph.node(source) {
        Node::Component(c) => match &request.element {
            Some(e) => format!("{} is requested at {} (entry point of {})", request, e, c.path),
            None => format!("{} is requested by component {}", request, c.path),
        },
        Node::Binding(b) => match &request.element {
            Some(e) => format!("{} is injected at {} [{}]", request, e, b.path),
            None => format!("{} is requested by {} [{}]", request, b.binding, b.path),
        },
        Node::Missing(m) => format!("{} is requested by missing {}", request, m.key),
    }
}

/// Synthetic bindings that only forward to their dependencies.
fn is_pass_through(kind: &BindingKind) -> bool {
    matches!(kind, BindingKind::Delegate | BindingKind::OptionalPresent)
}
