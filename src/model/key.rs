use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::names::{AnnotationRef, ElementRef, ModuleRef, Qualifier};
use crate::errors::{BindError, BindErrorKind, BindResult};

/// Wrapper types with resolver-level meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FrameworkType {
    Provider,
    Lazy,
    Producer,
    Produced,
    Future,
    MembersInjector,
}

impl fmt::Display for FrameworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FrameworkType::Provider => "Provider",
                FrameworkType::Lazy => "Lazy",
                FrameworkType::Producer => "Producer",
                FrameworkType::Produced => "Produced",
                FrameworkType::Future => "ListenableFuture",
                FrameworkType::MembersInjector => "MembersInjector",
            }
        )
    }
}

/// A fully substituted type, as handed over by the front end.
///
/// Collection, optional and framework wrappers are structural so that the
/// resolver can match requests against contributions without string
/// inspection. Everything else is a `Declared` type compared by identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Declared { name: String, args: Vec<TypeRef> },
    Set(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    Optional(Box<TypeRef>),
    Framework(FrameworkType, Box<TypeRef>),
}

impl TypeRef {
    pub fn declared<S: Into<String>>(name: S) -> TypeRef {
        TypeRef::Declared {
            name: name.into(),
            args: vec![],
        }
    }

    pub fn set(elem: TypeRef) -> TypeRef {
        TypeRef::Set(Box::new(elem))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> TypeRef {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: TypeRef) -> TypeRef {
        TypeRef::Optional(Box::new(inner))
    }

    pub fn wrap(fw: FrameworkType, inner: TypeRef) -> TypeRef {
        TypeRef::Framework(fw, Box::new(inner))
    }

    /// Parses the textual form used in manifests, e.g.
    /// `Map<String, Provider<Handler>>`.
    pub fn parse(src: &str) -> BindResult<TypeRef> {
        TypeParser { src, pos: 0 }.parse()
    }

    pub fn is_set(&self) -> bool {
        matches!(self, TypeRef::Set(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, TypeRef::Map(..))
    }

    pub fn is_multibinding_type(&self) -> bool {
        self.is_set() || self.is_map()
    }

    /// `Map<K, V>` for `Map<K, Provider<V>>` and `Map<K, Producer<V>>`,
    /// `Set<T>` for `Set<Produced<T>>`.
    pub fn unwrapped_collection(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Map(k, v) => match v.as_ref() {
                TypeRef::Framework(FrameworkType::Provider, inner)
                | TypeRef::Framework(FrameworkType::Producer, inner) => {
                    Some(TypeRef::Map(k.clone(), inner.clone()))
                }
                _ => None,
            },
            TypeRef::Set(elem) => match elem.as_ref() {
                TypeRef::Framework(FrameworkType::Produced, inner) => {
                    Some(TypeRef::Set(inner.clone()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// The framework wrapper of a map's values, if any.
    pub fn map_value_framework(&self) -> Option<FrameworkType> {
        match self {
            TypeRef::Map(_, v) => match v.as_ref() {
                TypeRef::Framework(fw, _) => Some(*fw),
                _ => None,
            },
            _ => None,
        }
    }

    fn from_parts(name: &str, mut args: Vec<TypeRef>) -> TypeRef {
        let simple = name.rsplit('.').next().unwrap_or(name);
        match (simple, args.len()) {
            ("Set", 1) => TypeRef::Set(Box::new(args.remove(0))),
            ("Map", 2) => {
                let v = args.remove(1);
                let k = args.remove(0);
                TypeRef::Map(Box::new(k), Box::new(v))
            }
            ("Optional", 1) => TypeRef::Optional(Box::new(args.remove(0))),
            ("Provider", 1) => TypeRef::wrap(FrameworkType::Provider, args.remove(0)),
            ("Lazy", 1) => TypeRef::wrap(FrameworkType::Lazy, args.remove(0)),
            ("Producer", 1) => TypeRef::wrap(FrameworkType::Producer, args.remove(0)),
            ("Produced", 1) => TypeRef::wrap(FrameworkType::Produced, args.remove(0)),
            ("ListenableFuture", 1) | ("Future", 1) => {
                TypeRef::wrap(FrameworkType::Future, args.remove(0))
            }
            ("MembersInjector", 1) => {
                TypeRef::wrap(FrameworkType::MembersInjector, args.remove(0))
            }
            _ => TypeRef::Declared {
                name: name.to_string(),
                args,
            },
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Declared { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<{}>", crate::utils::join(args, ", "))?;
                }
                Ok(())
            }
            TypeRef::Set(elem) => write!(f, "Set<{}>", elem),
            TypeRef::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            TypeRef::Optional(inner) => write!(f, "Optional<{}>", inner),
            TypeRef::Framework(fw, inner) => write!(f, "{}<{}>", fw, inner),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = BindError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&s)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> String {
        ty.to_string()
    }
}

struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn parse(mut self) -> BindResult<TypeRef> {
        let ty = self.ty()?;
        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.error(format!("unexpected `{}`", &self.src[self.pos..])));
        }
        Ok(ty)
    }

    fn error(&self, msg: String) -> BindError {
        BindError::new(
            BindErrorKind::Parse,
            format!("{} in type `{}`", msg, self.src),
        )
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn ident(&mut self) -> BindResult<&'a str> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' || c == '[' || c == ']' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        if start == self.pos {
            Err(self.error(format!("expected a type name at offset {}", start)))
        } else {
            Ok(&self.src[start..self.pos])
        }
    }

    fn ty(&mut self) -> BindResult<TypeRef> {
        let name = self.ident()?;
        self.skip_ws();
        let mut args = vec![];
        if self.peek() == Some('<') {
            self.pos += 1;
            loop {
                args.push(self.ty()?);
                self.skip_ws();
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some('>') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error(str!("unterminated type arguments"))),
                }
            }
        }
        Ok(TypeRef::from_parts(name, args))
    }
}

/// Identifies a single multibinding contribution so that contributions with
/// otherwise equal keys remain distinct.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContributionId {
    pub module: ModuleRef,
    pub element: ElementRef,
}

impl fmt::Display for ContributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.element)
    }
}

/// The key of a map contribution: the map-key annotation type and its value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapKey {
    pub annotation: AnnotationRef,
    pub value: String,
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}({})", self.annotation, self.value)
    }
}

/// A type, an optional qualifier, and (for multibinding contributions) the
/// contribution it identifies.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Key {
    pub ty: TypeRef,
    pub qualifier: Option<Qualifier>,
    pub contribution: Option<ContributionId>,
}

impl Key {
    pub fn of(ty: TypeRef) -> Key {
        Key {
            ty,
            qualifier: None,
            contribution: None,
        }
    }

    pub fn qualified(ty: TypeRef, qualifier: Qualifier) -> Key {
        Key {
            ty,
            qualifier: Some(qualifier),
            contribution: None,
        }
    }

    /// Parses `[@Qualifier ]Type`. Qualifiers may carry parenthesized
    /// arguments containing spaces, e.g. `@Named("a b") String`.
    pub fn parse(src: &str) -> BindResult<Key> {
        let src = src.trim();
        if !src.starts_with('@') {
            return Ok(Key::of(TypeRef::parse(src)?));
        }

        let mut depth = 0usize;
        let mut split = None;
        for (i, c) in src.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                c if c.is_whitespace() && depth == 0 => {
                    split = Some(i);
                    break;
                }
                _ => {}
            }
        }

        let split = unless!(split, else {
            return Err(BindError::new(
                BindErrorKind::Parse,
                format!("qualifier without a type in key `{}`", src),
            ))
        });
        let qualifier = AnnotationRef::new(&src[1..split]);
        let ty = TypeRef::parse(&src[split..])?;
        Ok(Key::qualified(ty, qualifier))
    }

    pub fn with_type(&self, ty: TypeRef) -> Key {
        Key {
            ty,
            qualifier: self.qualifier.clone(),
            contribution: self.contribution.clone(),
        }
    }

    pub fn with_contribution(&self, id: ContributionId) -> Key {
        Key {
            ty: self.ty.clone(),
            qualifier: self.qualifier.clone(),
            contribution: Some(id),
        }
    }

    /// The key without its contribution discriminator.
    pub fn base(&self) -> Key {
        Key {
            ty: self.ty.clone(),
            qualifier: self.qualifier.clone(),
            contribution: None,
        }
    }

    pub fn is_contribution(&self) -> bool {
        self.contribution.is_some()
    }

    /// The keys whose declarations can satisfy a request for this key, the
    /// key itself first.
    pub fn matching_keys(&self) -> Vec<Key> {
        let mut keys = vec![self.clone()];
        if let Some(ty) = self.ty.unwrapped_collection() {
            keys.push(self.with_type(ty));
        }
        keys
    }

    /// For `Optional<T>` keys, the key of `T` with framework wrappers removed.
    pub fn unwrapped_optional(&self) -> Option<Key> {
        match &self.ty {
            TypeRef::Optional(inner) => {
                let (_, ty) = super::RequestKind::unwrap(inner);
                Some(self.base().with_type(ty))
            }
            _ => None,
        }
    }

    pub(crate) fn fmt_with(&self, f: &mut fmt::Formatter<'_>, ty: &dyn fmt::Display) -> fmt::Result {
        if let Some(q) = &self.qualifier {
            write!(f, "@{} ", q)?;
        }
        write!(f, "{}", ty)?;
        if let Some(id) = &self.contribution {
            write!(f, " [{}]", id)?;
        }
        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, &self.ty)
    }
}

impl TryFrom<String> for Key {
    type Error = BindError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Key::parse(&s)
    }
}
