use std::fmt;
use std::str::FromStr;

use colored::*;
use serde::{Deserialize, Serialize};

use crate::model::{ComponentPath, Key};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Default for Severity {
    fn default() -> Severity {
        Severity::Error
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            _ => Err(format!("unknown severity `{}`", s)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    Duplicate,
    Missing,
    Cycle,
    DelegateCycle,
    ScopeMismatch,
    MultibindingKeyCollision,
    InconsistentMapKeys,
    DuplicateSetContribution,
    NullableMismatch,
    ProvisionDependsOnProduction,
    DependsOnProductionExecutor,
    AssistedInjectionRequest,
    MissingFactoryMethodModule,
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DefectKind::Duplicate => "duplicate binding",
                DefectKind::Missing => "missing binding",
                DefectKind::Cycle => "dependency cycle",
                DefectKind::DelegateCycle => "delegate cycle",
                DefectKind::ScopeMismatch => "scope mismatch",
                DefectKind::MultibindingKeyCollision => "multibinding key collision",
                DefectKind::InconsistentMapKeys => "inconsistent map keys",
                DefectKind::DuplicateSetContribution => "duplicate set contribution",
                DefectKind::NullableMismatch => "nullable mismatch",
                DefectKind::ProvisionDependsOnProduction => "provision depends on production",
                DefectKind::DependsOnProductionExecutor => "depends on production executor",
                DefectKind::AssistedInjectionRequest => "assisted injection request",
                DefectKind::MissingFactoryMethodModule => "missing factory method module",
            }
        )
    }
}

/// A classified problem found while resolving or analyzing a graph.
///
/// `chain` is the human readable explanation: its first line is a summary and
/// the remaining lines list the requests, bindings or components involved.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Defect {
    pub kind: DefectKind,
    pub severity: Severity,
    pub keys: Vec<Key>,
    pub components: Vec<ComponentPath>,
    pub chain: String,
}

impl Defect {
    pub fn new<S: Into<String>>(kind: DefectKind, chain: S) -> Defect {
        Defect {
            kind,
            severity: Severity::Error,
            keys: vec![],
            components: vec![],
            chain: chain.into(),
        }
    }

    pub fn with_key(mut self, key: Key) -> Defect {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    pub fn with_keys<I: IntoIterator<Item = Key>>(self, keys: I) -> Defect {
        keys.into_iter().fold(self, |d, k| d.with_key(k))
    }

    pub fn with_component(mut self, path: ComponentPath) -> Defect {
        if !self.components.contains(&path) {
            self.components.push(path);
        }
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Defect {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn summary(&self) -> &str {
        self.chain.lines().next().unwrap_or("")
    }

    pub fn emit(&self) {
        let kind = format!("{}:", self.kind);
        let prefix = match self.severity {
            Severity::Error => kind.bold().red(),
            Severity::Warning => kind.bold().yellow(),
        };
        eprintln!("{} {}", prefix, super::hanging(&kind, &self.chain).bold());
        for path in self.components.iter() {
            eprintln!(" {} {}", "-->".bold(), path);
        }
        eprintln!()
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.kind, self.chain)
    }
}
