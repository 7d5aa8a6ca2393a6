//! Program facts: value-comparable projections of the program model
//!
//! Facts are the only data that flows from extraction into the rest of the
//! pipeline. They hold strings, booleans and enums only. A [`SymbolId`]
//! must never appear in a fact: identities change between passes, so a fact
//! carrying one would compare unequal for unchanged source and defeat the
//! incremental short-circuit.
//!
//! [`SymbolId`]: crate::model::SymbolId

use crate::model::{Location, TypeKind, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Marker for values that may be cached and compared between passes.
pub trait Fact: Clone + Eq + Hash + Serialize + Send + Sync + 'static {}

impl Fact for RegistrationFact {}
impl Fact for InjectionTargetFact {}
impl Fact for ShapeFact {}

const KEYWORD_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "short", "ushort", "int", "uint", "long", "ulong", "nint",
    "nuint", "float", "double", "decimal", "char", "string", "object", "dynamic",
];

/// Type expression with identities stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr> },
    Array(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Nullable(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            args,
        }
    }

    pub fn is_keyword(name: &str) -> bool {
        KEYWORD_TYPES.contains(&name)
    }
}

impl From<&TypeRef> for TypeExpr {
    fn from(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Named { name, args, .. } => TypeExpr::Named {
                name: name.clone(),
                args: args.iter().map(TypeExpr::from).collect(),
            },
            TypeRef::Array { element } => TypeExpr::Array(Box::new(element.as_ref().into())),
            TypeRef::Tuple { elements } => {
                TypeExpr::Tuple(elements.iter().map(TypeExpr::from).collect())
            }
            TypeRef::Nullable { inner } => TypeExpr::Nullable(Box::new(inner.as_ref().into())),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named { name, args } => {
                if TypeExpr::is_keyword(name) {
                    write!(f, "{}", name)?;
                } else {
                    write!(f, "global::{}", name)?;
                }
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (index, arg) in args.iter().enumerate() {
                        if index > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeExpr::Array(element) => write!(f, "{}[]", element),
            TypeExpr::Tuple(elements) => {
                write!(f, "(")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            TypeExpr::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}

/// One enclosing type re-opened around generated members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeType {
    pub name: String,
    pub keyword: String,
    pub type_parameters: Vec<String>,
}

impl ScopeType {
    /// `Name<T, U>` or `Name`.
    pub fn declared_name(&self) -> String {
        declared_name(&self.name, &self.type_parameters)
    }
}

fn declared_name(name: &str, type_parameters: &[String]) -> String {
    if type_parameters.is_empty() {
        name.to_string()
    } else {
        format!("{}<{}>", name, type_parameters.join(", "))
    }
}

/// Identity of a declared type, as needed to reference or re-open it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeIdentity {
    pub namespace: Option<String>,
    pub containing_types: Vec<ScopeType>,
    pub name: String,
    pub kind: TypeKind,
    pub type_parameters: Vec<String>,
}

impl TypeIdentity {
    /// `Ns.Outer.Name`, the key used to group shapes into trees.
    pub fn metadata_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(ns) = self.namespace.as_deref() {
            parts.push(ns);
        }
        parts.extend(self.containing_types.iter().map(|c| c.name.as_str()));
        parts.push(&self.name);
        parts.join(".")
    }

    /// `Name<T>` as written in its own declaration.
    pub fn declared_name(&self) -> String {
        declared_name(&self.name, &self.type_parameters)
    }

    /// Fully qualified reference: `global::Ns.Outer<T>.Name<U>`.
    pub fn display_name(&self) -> String {
        self.qualified(|scope| scope.declared_name(), declared_name(&self.name, &self.type_parameters))
    }

    /// Unbound generic reference suitable for `typeof`: `global::Ns.Name<,>`.
    pub fn open_generic_name(&self) -> String {
        let unbound = |name: &str, arity: usize| {
            if arity == 0 {
                name.to_string()
            } else {
                format!("{}<{}>", name, ",".repeat(arity - 1))
            }
        };
        self.qualified(
            |scope| unbound(&scope.name, scope.type_parameters.len()),
            unbound(&self.name, self.type_parameters.len()),
        )
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
            || self.containing_types.iter().any(|c| !c.type_parameters.is_empty())
    }

    fn qualified(&self, scope_name: impl Fn(&ScopeType) -> String, own: String) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(ns) = &self.namespace {
            parts.push(ns.clone());
        }
        parts.extend(self.containing_types.iter().map(scope_name));
        parts.push(own);
        format!("global::{}", parts.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceLifetime {
    Transient,
    Scoped,
    Singleton,
}

impl ServiceLifetime {
    /// Parse `Scoped`, `ServiceLifetime.Scoped` or a fully qualified member name.
    pub fn parse(value: &str) -> Option<Self> {
        let member = value.rsplit('.').next().unwrap_or(value);
        match member {
            "Transient" => Some(ServiceLifetime::Transient),
            "Scoped" => Some(ServiceLifetime::Scoped),
            "Singleton" => Some(ServiceLifetime::Singleton),
            _ => None,
        }
    }

    /// Registration call for this lifetime: `AddScoped`.
    pub fn method(self) -> &'static str {
        match self {
            ServiceLifetime::Transient => "AddTransient",
            ServiceLifetime::Scoped => "AddScoped",
            ServiceLifetime::Singleton => "AddSingleton",
        }
    }
}

/// One service registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationFact {
    /// Service type; `None` registers the implementation as itself.
    pub service_type: Option<String>,
    pub implementation_type: String,
    pub lifetime: ServiceLifetime,
    /// Grouping hint; empty means the default group.
    pub hint: String,
    /// Implementation is an unbound generic and must be registered via `typeof`.
    pub is_open_generic: bool,
}

/// Field or property to be supplied through the synthesized constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InjectableMember {
    pub ty: String,
    pub name: String,
}

impl InjectableMember {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            name: name.into(),
        }
    }

    pub fn parameter(&self) -> String {
        crate::naming::parameter_name(&self.name)
    }
}

/// Method carrying the initializer marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookCandidate {
    pub name: String,
    pub is_static: bool,
    pub parameter_count: usize,
    pub location: Location,
}

/// Injected members declared by one ancestor in the base chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseLevel {
    pub type_name: String,
    pub members: Vec<InjectableMember>,
}

/// A partial class that receives a synthesized constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InjectionTargetFact {
    pub target: TypeIdentity,
    pub own_members: Vec<InjectableMember>,
    pub hooks: Vec<HookCandidate>,
    /// Source-declared ancestors, nearest first, excluding the universal root.
    pub base_levels: Vec<BaseLevel>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeProperty {
    pub name: String,
    pub ty: TypeExpr,
    pub ignored: bool,
}

/// Type shape declaration: one shape marked for structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeFact {
    pub identity: TypeIdentity,
    pub properties: Vec<ShapeProperty>,
    pub is_abstract: bool,
    pub is_partial: bool,
    /// Metadata name of the base shape when the base is itself partial and marked.
    pub base: Option<String>,
    pub location: Location,
}

impl ShapeFact {
    pub fn qualified_name(&self) -> String {
        self.identity.metadata_name()
    }
}
