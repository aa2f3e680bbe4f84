use std::fmt;

use serde::{Deserialize, Serialize};

const REUSABLE: &str = "Reusable";
const PRODUCTION_SCOPE: &str = "ProductionScope";

/// A scope annotation, compared by name. The leading `@` is not stored.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(pub String);

impl Scope {
    pub fn new<S: Into<String>>(name: S) -> Scope {
        let name = name.into();
        match name.strip_prefix('@') {
            Some(stripped) => Scope(stripped.to_string()),
            None => Scope(name),
        }
    }

    pub fn reusable() -> Scope {
        Scope::new(REUSABLE)
    }

    /// Reusable bindings may be cached by any component and never conflict
    /// with the scopes a component declares.
    pub fn is_reusable(&self) -> bool {
        self.0 == REUSABLE
    }

    pub fn is_production_scope(&self) -> bool {
        self.0 == PRODUCTION_SCOPE
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Scope {
        Scope::new(s)
    }
}
