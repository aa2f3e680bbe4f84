use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::key::{FrameworkType, Key, MapKey, TypeRef};
use super::names::{ComponentRef, ElementRef, ModuleRef};
use super::scope::Scope;
use crate::errors::{BindError, BindResult};

/// How a dependency is requested. Deferred kinds do not need the value at
/// construction time and can therefore break dependency cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Instance,
    Provider,
    Lazy,
    ProviderOfLazy,
    Producer,
    Produced,
    Future,
    MembersInjection,
}

impl RequestKind {
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            RequestKind::Provider
                | RequestKind::Lazy
                | RequestKind::ProviderOfLazy
                | RequestKind::Producer
        )
    }

    /// Whether a request of this kind may be satisfied by a production
    /// binding.
    pub fn can_use_production(self) -> bool {
        matches!(
            self,
            RequestKind::Producer | RequestKind::Produced | RequestKind::Future
        )
    }

    /// Splits a requested type into its request kind and the type of the key
    /// that satisfies it.
    pub fn unwrap(ty: &TypeRef) -> (RequestKind, TypeRef) {
        match ty {
            TypeRef::Framework(FrameworkType::Provider, inner) => match inner.as_ref() {
                TypeRef::Framework(FrameworkType::Lazy, t) => {
                    (RequestKind::ProviderOfLazy, t.as_ref().clone())
                }
                t => (RequestKind::Provider, t.clone()),
            },
            TypeRef::Framework(FrameworkType::Lazy, t) => (RequestKind::Lazy, t.as_ref().clone()),
            TypeRef::Framework(FrameworkType::Producer, t) => {
                (RequestKind::Producer, t.as_ref().clone())
            }
            TypeRef::Framework(FrameworkType::Produced, t) => {
                (RequestKind::Produced, t.as_ref().clone())
            }
            TypeRef::Framework(FrameworkType::Future, t) => (RequestKind::Future, t.as_ref().clone()),
            t => (RequestKind::Instance, t.clone()),
        }
    }

    /// Renders a request of this kind for `key`, e.g. `Provider<Lazy<Foo>>`.
    pub fn format(self, key: &Key) -> String {
        let ty = &key.ty;
        let rendered = match self {
            RequestKind::Instance => ty.to_string(),
            RequestKind::Provider => format!("Provider<{}>", ty),
            RequestKind::Lazy => format!("Lazy<{}>", ty),
            RequestKind::ProviderOfLazy => format!("Provider<Lazy<{}>>", ty),
            RequestKind::Producer => format!("Producer<{}>", ty),
            RequestKind::Produced => format!("Produced<{}>", ty),
            RequestKind::Future => format!("ListenableFuture<{}>", ty),
            RequestKind::MembersInjection => format!("injectMembers({})", ty),
        };
        format!("{}", DisplayWith(key, &rendered))
    }
}

struct DisplayWith<'a>(&'a Key, &'a str);

impl fmt::Display for DisplayWith<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_with(f, &self.1)
    }
}

/// A request for the value of a key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RequestRepr")]
pub struct DependencyRequest {
    pub key: Key,
    pub kind: RequestKind,
    pub nullable: bool,
    pub element: Option<ElementRef>,
}

impl DependencyRequest {
    pub fn new(key: Key, kind: RequestKind) -> DependencyRequest {
        DependencyRequest {
            key,
            kind,
            nullable: false,
            element: None,
        }
    }

    pub fn instance(key: Key) -> DependencyRequest {
        DependencyRequest::new(key, RequestKind::Instance)
    }

    /// Parses a requested type such as `@Named Provider<Foo>`. The
    /// `injectMembers(Foo)` form requests members injection of `Foo`.
    pub fn parse(src: &str) -> BindResult<DependencyRequest> {
        let src = src.trim();
        if let Some(inner) = src
            .strip_prefix("injectMembers(")
            .and_then(|s| s.strip_suffix(')'))
        {
            return Ok(DependencyRequest::new(
                Key::parse(inner)?,
                RequestKind::MembersInjection,
            ));
        }

        let key = Key::parse(src)?;
        let (kind, ty) = RequestKind::unwrap(&key.ty);
        Ok(DependencyRequest::new(key.with_type(ty), kind))
    }

    pub fn with_element(mut self, element: ElementRef) -> DependencyRequest {
        self.element = Some(element);
        self
    }

    pub fn nullable(mut self) -> DependencyRequest {
        self.nullable = true;
        self
    }

    /// Requests for an optional whose wrapped request is deferred break
    /// cycles the same way the wrapped request would.
    pub fn is_deferred(&self) -> bool {
        if self.kind.is_deferred() {
            return true;
        }

        match (&self.kind, &self.key.ty) {
            (RequestKind::Instance, TypeRef::Optional(inner)) => {
                RequestKind::unwrap(inner).0.is_deferred()
            }
            _ => false,
        }
    }
}

impl fmt::Display for DependencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.format(&self.key))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestRepr {
    Short(String),
    Full {
        request: String,
        #[serde(default)]
        nullable: bool,
        #[serde(default)]
        element: Option<ElementRef>,
    },
}

impl TryFrom<RequestRepr> for DependencyRequest {
    type Error = BindError;

    fn try_from(repr: RequestRepr) -> Result<Self, Self::Error> {
        match repr {
            RequestRepr::Short(s) => DependencyRequest::parse(&s),
            RequestRepr::Full {
                request,
                nullable,
                element,
            } => {
                let mut req = DependencyRequest::parse(&request)?;
                req.nullable = nullable;
                req.element = element;
                Ok(req)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Unique,
    SetElement,
    SetValues,
    MapEntry,
}

impl ContributionType {
    pub fn is_multibinding(self) -> bool {
        self != ContributionType::Unique
    }
}

impl Default for ContributionType {
    fn default() -> ContributionType {
        ContributionType::Unique
    }
}

impl fmt::Display for ContributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ContributionType::Unique => "unique",
                ContributionType::SetElement => "set element",
                ContributionType::SetValues => "set values",
                ContributionType::MapEntry => "map entry",
            }
        )
    }
}

/// What a binding is, with the data only some kinds carry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    /// A constructor marked for injection.
    Injection,
    AssistedInjection,
    /// A factory interface creating `target` with caller-supplied arguments.
    AssistedFactory { target: TypeRef },
    Provision,
    Production,
    /// An alias for the key of its single dependency.
    Delegate,
    /// A synthesized collection. `production` is set when any contribution
    /// is produced asynchronously.
    MultiboundSet { production: bool },
    MultiboundMap { production: bool },
    /// The component itself.
    Component,
    /// A provision method of a component dependency.
    ComponentProvision,
    ComponentProduction,
    ComponentDependency,
    BoundInstance,
    SubcomponentCreator { child: ComponentRef },
    MembersInjector,
    MembersInjection,
    OptionalPresent,
    OptionalAbsent,
}

impl BindingKind {
    pub fn is_multibinding(&self) -> bool {
        matches!(
            self,
            BindingKind::MultiboundSet { .. } | BindingKind::MultiboundMap { .. }
        )
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, BindingKind::OptionalPresent | BindingKind::OptionalAbsent)
    }

    /// Kinds the resolver creates rather than reads from declarations.
    pub fn is_synthetic(&self) -> bool {
        self.is_multibinding()
            || self.is_optional()
            || matches!(
                self,
                BindingKind::MembersInjector | BindingKind::SubcomponentCreator { .. }
            )
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindingKind::Injection => "injection",
            BindingKind::AssistedInjection => "assisted injection",
            BindingKind::AssistedFactory { .. } => "assisted factory",
            BindingKind::Provision => "provision",
            BindingKind::Production => "production",
            BindingKind::Delegate => "delegate",
            BindingKind::MultiboundSet { .. } => "multibound set",
            BindingKind::MultiboundMap { .. } => "multibound map",
            BindingKind::Component => "component",
            BindingKind::ComponentProvision => "component provision",
            BindingKind::ComponentProduction => "component production",
            BindingKind::ComponentDependency => "component dependency",
            BindingKind::BoundInstance => "bound instance",
            BindingKind::SubcomponentCreator { .. } => "subcomponent creator",
            BindingKind::MembersInjector => "members injector",
            BindingKind::MembersInjection => "members injection",
            BindingKind::OptionalPresent => "present optional",
            BindingKind::OptionalAbsent => "absent optional",
        };
        write!(f, "{}", name)
    }
}

/// A recipe producing a value for `key`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Binding {
    pub key: Key,
    pub kind: BindingKind,
    pub contribution_type: ContributionType,
    pub dependencies: Vec<DependencyRequest>,
    pub scope: Option<Scope>,
    pub element: Option<ElementRef>,
    pub module: Option<ModuleRef>,
    pub nullable: bool,
    pub map_key: Option<MapKey>,
    /// Set for module bindings whose implementation is an instance method
    /// of the module.
    pub requires_module_instance: bool,
}

impl Binding {
    pub fn new(key: Key, kind: BindingKind) -> Binding {
        Binding {
            key,
            kind,
            contribution_type: ContributionType::Unique,
            dependencies: vec![],
            scope: None,
            element: None,
            module: None,
            nullable: false,
            map_key: None,
            requires_module_instance: false,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Binding {
        self.dependencies = dependencies;
        self
    }

    pub fn with_element(mut self, element: ElementRef) -> Binding {
        self.element = Some(element);
        self
    }

    pub fn with_scope(mut self, scope: Option<Scope>) -> Binding {
        self.scope = scope;
        self
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.kind,
            BindingKind::Production
                | BindingKind::ComponentProduction
                | BindingKind::MultiboundSet { production: true }
                | BindingKind::MultiboundMap { production: true }
        )
    }

    /// A scope that ties the binding to a component: anything but
    /// `@Reusable`.
    pub fn strict_scope(&self) -> Option<&Scope> {
        self.scope.as_ref().filter(|s| !s.is_reusable())
    }

    pub fn is_contribution(&self) -> bool {
        self.contribution_type.is_multibinding()
    }

    /// The delegated-to key for alias bindings.
    pub fn delegate_target(&self) -> Option<&Key> {
        match self.kind {
            BindingKind::Delegate => self.dependencies.first().map(|d| &d.key),
            _ => None,
        }
    }

    /// The element that declares this binding, or a synthesized description.
    pub fn display_name(&self) -> String {
        match &self.element {
            Some(e) => e.to_string(),
            None => match &self.kind {
                BindingKind::Injection | BindingKind::AssistedInjection => {
                    format!("@Inject {}", self.key.ty)
                }
                kind => format!("{} {}", kind, self.key),
            },
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_request_kinds() {
        let req = DependencyRequest::parse("Provider<Lazy<Foo>>").unwrap();
        assert_eq!(req.kind, RequestKind::ProviderOfLazy);
        assert_eq!(req.key.to_string(), "Foo");
        assert_eq!(req.to_string(), "Provider<Lazy<Foo>>");

        let req = DependencyRequest::parse("@Named Producer<Foo>").unwrap();
        assert_eq!(req.kind, RequestKind::Producer);
        assert_eq!(req.to_string(), "@Named Producer<Foo>");

        let req = DependencyRequest::parse("injectMembers(Activity)").unwrap();
        assert_eq!(req.kind, RequestKind::MembersInjection);
        assert_eq!(req.to_string(), "injectMembers(Activity)");
    }

    #[test]
    fn deferred_requests() {
        assert!(DependencyRequest::parse("Provider<A>").unwrap().is_deferred());
        assert!(DependencyRequest::parse("Lazy<A>").unwrap().is_deferred());
        assert!(DependencyRequest::parse("Producer<A>").unwrap().is_deferred());
        assert!(!DependencyRequest::parse("A").unwrap().is_deferred());
        assert!(!DependencyRequest::parse("Produced<A>").unwrap().is_deferred());
        assert!(DependencyRequest::parse("Optional<Provider<A>>")
            .unwrap()
            .is_deferred());
        assert!(!DependencyRequest::parse("Optional<A>").unwrap().is_deferred());
    }

    #[test]
    fn requests_deserialize_from_short_and_full_forms() {
        let reqs: Vec<DependencyRequest> = serde_json::from_str(
            r#"["Lazy<A>", {"request": "B", "nullable": true, "element": "Foo.b"}]"#,
        )
        .unwrap();
        assert_eq!(reqs[0].kind, RequestKind::Lazy);
        assert!(reqs[1].nullable);
        assert_eq!(reqs[1].element, Some(ElementRef::new("Foo.b")));
    }

    #[test]
    fn reusable_is_not_a_strict_scope() {
        let key = Key::parse("A").unwrap();
        let b = Binding::new(key.clone(), BindingKind::Provision)
            .with_scope(Some(Scope::reusable()));
        assert!(b.strict_scope().is_none());
        let b = Binding::new(key, BindingKind::Provision).with_scope(Some(Scope::new("@Singleton")));
        assert_eq!(b.strict_scope(), Some(&Scope::new("Singleton")));
    }
}
