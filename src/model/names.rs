use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new<S: Into<String>>(s: S) -> $name {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> $name {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> $name {
                $name(s)
            }
        }
    };
}

name_type!(
    /// A source element (method, parameter, constructor) identified by its
    /// stable rendering, e.g. `AppModule.provideClock`.
    ElementRef
);

name_type!(
    /// The fully-qualified name of a module.
    ModuleRef
);

name_type!(
    /// The fully-qualified name of a component or subcomponent type.
    ComponentRef
);

name_type!(
    /// An opaque annotation token. Only identity and the string form are ever
    /// inspected; the leading `@` is not stored.
    AnnotationRef
);

/// Qualifiers are plain annotation tokens.
pub type Qualifier = AnnotationRef;
