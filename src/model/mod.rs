//! Immutable value types shared by every stage: keys, bindings, requests,
//! scopes and component paths.

mod binding;
mod key;
mod names;
mod path;
mod scope;

pub use binding::{Binding, BindingKind, ContributionType, DependencyRequest, RequestKind};
pub use key::{ContributionId, FrameworkType, Key, MapKey, TypeRef};
pub use names::{AnnotationRef, ComponentRef, ElementRef, ModuleRef, Qualifier};
pub use path::ComponentPath;
pub use scope::Scope;
