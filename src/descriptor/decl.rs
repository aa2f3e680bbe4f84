//! The declaration set consumed by the descriptor builder, as extracted by a
//! front end. Everything here deserializes from the JSON manifest.

use serde::{Deserialize, Serialize};

use crate::model::{
    ComponentRef, ContributionType, DependencyRequest, ElementRef, Key, MapKey, ModuleRef, Scope,
    TypeRef,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Declarations {
    pub modules: Vec<ModuleDecl>,
    pub components: Vec<ComponentDecl>,
    /// Types with an injectable constructor.
    pub injectables: Vec<InjectableDecl>,
    pub assisted_factories: Vec<AssistedFactoryDecl>,
    /// Types with injectable fields or methods.
    pub members_injections: Vec<MembersInjectionDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: ModuleRef,
    #[serde(default)]
    pub includes: Vec<ModuleRef>,
    /// Child components made available by installing this module.
    #[serde(default)]
    pub subcomponents: Vec<ComponentRef>,
    #[serde(default)]
    pub bindings: Vec<BindingDecl>,
    #[serde(default)]
    pub multibindings: Vec<MultibindsDecl>,
    #[serde(default)]
    pub delegates: Vec<DelegateDecl>,
    #[serde(default)]
    pub optionals: Vec<OptionalDecl>,
    /// Whether the generated container may construct the module itself.
    #[serde(default = "default_true")]
    pub instantiable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Provision,
    Production,
}

impl Default for MethodKind {
    fn default() -> MethodKind {
        MethodKind::Provision
    }
}

/// A module method producing a value. For multibinding contributions `key`
/// is the collection key (`Set<T>` or `Map<K, V>`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BindingDecl {
    pub element: ElementRef,
    pub key: Key,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub contribution: ContributionType,
    #[serde(default)]
    pub map_key: Option<MapKey>,
    /// Static methods never need a module instance.
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultibindsDecl {
    pub element: ElementRef,
    pub key: Key,
}

/// An alias: requests for `key` are served by the binding of `delegate`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DelegateDecl {
    pub element: ElementRef,
    pub key: Key,
    pub delegate: DependencyRequest,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub contribution: ContributionType,
    #[serde(default)]
    pub map_key: Option<MapKey>,
}

/// Declares that `Optional<key>` may be requested.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionalDecl {
    pub element: ElementRef,
    pub key: Key,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub name: ComponentRef,
    #[serde(default)]
    pub subcomponent: bool,
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub modules: Vec<ModuleRef>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,
    #[serde(default)]
    pub entry_points: Vec<EntryPointDecl>,
    #[serde(default)]
    pub factory_methods: Vec<FactoryMethodDecl>,
    #[serde(default)]
    pub builder_entry_points: Vec<BuilderEntryPointDecl>,
    #[serde(default)]
    pub creator: Option<CreatorDecl>,
}

/// A component dependency and the provision methods it exposes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DependencyDecl {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub methods: Vec<ProvisionMethodDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProvisionMethodDecl {
    pub element: ElementRef,
    pub key: Key,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntryPointDecl {
    pub element: ElementRef,
    pub request: DependencyRequest,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactoryMethodDecl {
    pub element: ElementRef,
    pub child: ComponentRef,
    /// Modules passed as arguments.
    #[serde(default)]
    pub parameters: Vec<ModuleRef>,
}

/// A component method returning a child's creator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuilderEntryPointDecl {
    pub element: ElementRef,
    pub child: ComponentRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreatorDecl {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub bound_instances: Vec<BoundInstanceDecl>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundInstanceDecl {
    pub element: ElementRef,
    pub key: Key,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InjectableDecl {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub dependencies: Vec<DependencyRequest>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub assisted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistedFactoryDecl {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub target: TypeRef,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MembersInjectionDecl {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub sites: Vec<DependencyRequest>,
}

fn default_true() -> bool {
    true
}
