use std::fmt;

use serde::{Deserialize, Serialize};

use super::names::ComponentRef;

/// The chain of components from a root component down to some component in
/// its tree.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentPath(Vec<ComponentRef>);

impl ComponentPath {
    pub fn root(component: ComponentRef) -> ComponentPath {
        ComponentPath(vec![component])
    }

    pub fn components(&self) -> &[ComponentRef] {
        &self.0
    }

    pub fn root_component(&self) -> &ComponentRef {
        &self.0[0]
    }

    pub fn current_component(&self) -> &ComponentRef {
        &self.0[self.0.len() - 1]
    }

    pub fn at_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn parent(&self) -> Option<ComponentPath> {
        if self.at_root() {
            None
        } else {
            Some(ComponentPath(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn child_path(&self, child: ComponentRef) -> ComponentPath {
        let mut components = self.0.clone();
        components.push(child);
        ComponentPath(components)
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &ComponentPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for ComponentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::utils::join(&self.0, " → "))
    }
}
