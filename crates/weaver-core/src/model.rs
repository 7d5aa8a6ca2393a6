//! Static program model handed over by the generation host
//!
//! The model is a snapshot of declarations and their attributes. It carries
//! per-pass symbol identities (`SymbolId`) which are only meaningful inside a
//! single pass: two snapshots of the same source may number their symbols
//! differently. Nothing derived from a `SymbolId` may be cached across passes.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// Build property holding the project's root namespace.
pub const ROOT_NAMESPACE_PROPERTY: &str = "RootNamespace";

/// Per-pass identity of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position of a declaration or attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}({},{})", self.file, self.line, self.column)
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Record,
    Struct,
    RecordStruct,
    Interface,
}

impl TypeKind {
    /// Declaration keyword used when re-opening the type.
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Record => "record",
            TypeKind::Struct => "struct",
            TypeKind::RecordStruct => "record struct",
            TypeKind::Interface => "interface",
        }
    }

    pub fn is_value_type(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::RecordStruct)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub is_partial: bool,
    pub is_abstract: bool,
    pub is_static: bool,
    pub is_sealed: bool,
}

/// One enclosing type of a nested declaration, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainingType {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub is_partial: bool,
}

/// Reference to a type as written at a use site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRef {
    Named {
        /// Fully qualified metadata name without arity, or a keyword (`int`).
        name: String,
        /// Declaration in this model, when the type is declared in source.
        #[serde(default)]
        symbol: Option<SymbolId>,
        #[serde(default)]
        args: Vec<TypeRef>,
    },
    Array {
        element: Box<TypeRef>,
    },
    Tuple {
        elements: Vec<TypeRef>,
    },
    Nullable {
        inner: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            symbol: None,
            args: Vec::new(),
        }
    }

    pub fn symbol(name: impl Into<String>, id: SymbolId) -> Self {
        TypeRef::Named {
            name: name.into(),
            symbol: Some(id),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            symbol: None,
            args,
        }
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
        }
    }

    pub fn tuple(elements: Vec<TypeRef>) -> Self {
        TypeRef::Tuple { elements }
    }

    pub fn nullable(inner: TypeRef) -> Self {
        TypeRef::Nullable {
            inner: Box::new(inner),
        }
    }

    /// Declared symbol this reference resolves to, if any.
    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self {
            TypeRef::Named { symbol, .. } => *symbol,
            _ => None,
        }
    }

    /// The universal root type every class ultimately derives from.
    pub fn is_object_root(&self) -> bool {
        matches!(self, TypeRef::Named { name, .. } if name == "object" || name == "System.Object")
    }
}

/// Attribute argument value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    Type(TypeRef),
    String(String),
    /// Enum member as written, e.g. `ServiceLifetime.Scoped`.
    Enum(String),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub args: Vec<AttributeValue>,
    #[serde(default)]
    pub named_args: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub location: Location,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            named_args: BTreeMap::new(),
            location: Location::default(),
        }
    }

    pub fn with_arg(mut self, value: AttributeValue) -> Self {
        self.args.push(value);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.named_args.insert(name.into(), value);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Whether this attribute is the given marker.
    ///
    /// `Inject`, `InjectAttribute` and `Weaver.Inject` all match the marker `Inject`.
    pub fn is(&self, marker: &str) -> bool {
        let short = self.name.rsplit('.').next().unwrap_or(&self.name);
        let short = short.strip_suffix("Attribute").unwrap_or(short);
        let marker = marker.strip_suffix("Attribute").unwrap_or(marker);
        short == marker
    }

    pub fn named(&self, name: &str) -> Option<&AttributeValue> {
        self.named_args.get(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    #[default]
    Field,
    Property,
}

/// Field or property declared on a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub kind: MemberKind,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDecl {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDecl>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub id: SymbolId,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub containing_types: Vec<ContainingType>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub type_parameters: Vec<String>,
    #[serde(default)]
    pub base: Option<TypeRef>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub members: Vec<MemberDecl>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub location: Location,
}

impl TypeDecl {
    /// Metadata name without arity: `Ns.Outer.Name`.
    pub fn metadata_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(ns) = self.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            parts.push(ns);
        }
        parts.extend(self.containing_types.iter().map(|c| c.name.as_str()));
        parts.push(&self.name);
        parts.join(".")
    }

    pub fn has_attribute(&self, marker: &str) -> bool {
        self.attributes.iter().any(|a| a.is(marker))
    }

    pub fn attributes_named<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a Attribute> {
        self.attributes.iter().filter(move |a| a.is(marker))
    }
}

/// Complete snapshot of one compilation as seen by the generators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramModel {
    pub assembly_name: String,
    #[serde(default)]
    pub build_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub assembly_attributes: Vec<Attribute>,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

impl ProgramModel {
    pub fn new(assembly_name: impl Into<String>) -> Self {
        Self {
            assembly_name: assembly_name.into(),
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let model: ProgramModel = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject models whose symbol identities are not unique.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashMap::new();
        for decl in &self.types {
            if let Some(previous) = seen.insert(decl.id, &decl.name) {
                return Err(CoreError::InvalidModel(format!(
                    "symbol {} is used by both '{}' and '{}'",
                    decl.id, previous, decl.name
                )));
            }
        }
        Ok(())
    }

    pub fn build_property(&self, key: &str) -> Option<&str> {
        self.build_properties.get(key).map(String::as_str)
    }

    pub fn index(&self) -> ModelIndex<'_> {
        ModelIndex::new(self)
    }
}

/// Symbol lookup over one model snapshot.
#[derive(Debug)]
pub struct ModelIndex<'a> {
    by_id: HashMap<SymbolId, &'a TypeDecl>,
}

impl<'a> ModelIndex<'a> {
    pub fn new(model: &'a ProgramModel) -> Self {
        Self {
            by_id: model.types.iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn get(&self, id: SymbolId) -> Option<&'a TypeDecl> {
        self.by_id.get(&id).copied()
    }

    /// Source declaration of a base type reference, if it is declared in this model.
    pub fn resolve(&self, ty: &TypeRef) -> Option<&'a TypeDecl> {
        ty.symbol_id().and_then(|id| self.get(id))
    }
}
