//! Explicit registry of comparison strategies
//!
//! The registry maps type names to strategies. It is an ordinary value passed
//! into synthesis; tests build their own instead of sharing global state.

use super::classify::{Classified, TypeClass};
use weaver_core::facts::TypeExpr;

const DEFAULT_PRIMITIVES: &[&str] = &[
    "bool", "byte", "sbyte", "short", "ushort", "int", "uint", "long", "ulong", "nint", "nuint",
    "float", "double", "decimal", "char", "string",
    "System.Boolean", "System.Byte", "System.Int16", "System.Int32", "System.Int64",
    "System.Single", "System.Double", "System.Decimal", "System.Char", "System.String",
    "System.Guid", "System.DateTime", "System.DateTimeOffset", "System.DateOnly",
    "System.TimeOnly", "System.TimeSpan", "System.Uri",
];

const DEFAULT_SEQUENCES: &[&str] = &[
    "System.Collections.Generic.List",
    "System.Collections.Generic.IList",
    "System.Collections.Generic.IReadOnlyList",
    "System.Collections.Generic.ICollection",
    "System.Collections.Generic.IReadOnlyCollection",
    "System.Collections.Generic.IEnumerable",
    "System.Collections.Immutable.ImmutableArray",
    "System.Collections.Immutable.ImmutableList",
];

const NULLABLE_WRAPPER: &str = "System.Nullable";
const TUPLE_TYPES: &[&str] = &["System.ValueTuple", "System.Tuple"];

/// Strategy for a registered name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primitive,
    Sequence,
}

#[derive(Debug, Clone, Default)]
pub struct ComparerRegistry {
    entries: Vec<(String, Strategy)>,
}

impl ComparerRegistry {
    /// A registry with no strategies; every named type is unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for name in DEFAULT_PRIMITIVES {
            registry.register(*name, Strategy::Primitive);
        }
        for name in DEFAULT_SEQUENCES {
            registry.register(*name, Strategy::Sequence);
        }
        registry
    }

    /// Register a strategy. The first registration of a name wins.
    pub fn register(&mut self, name: impl Into<String>, strategy: Strategy) -> &mut Self {
        let name = name.into();
        if self.lookup(&name).is_none() {
            self.entries.push((name, strategy));
        }
        self
    }

    pub fn lookup(&self, name: &str) -> Option<Strategy> {
        self.entries
            .iter()
            .find(|(registered, _)| registered == name)
            .map(|(_, strategy)| *strategy)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Classify a type once, recursively. `is_shape` tells whether a name has a synthesized comparer.
    pub fn classify(&self, ty: &TypeExpr, is_shape: &dyn Fn(&str) -> bool) -> Classified {
        let class = match ty {
            TypeExpr::Array(element) => {
                TypeClass::Container(Box::new(self.classify(element, is_shape)))
            }
            TypeExpr::Tuple(elements) => TypeClass::Tuple(
                elements.iter().map(|e| self.classify(e, is_shape)).collect(),
            ),
            TypeExpr::Nullable(inner) => {
                TypeClass::Nullable(Box::new(self.classify(inner, is_shape)))
            }
            TypeExpr::Named { name, args } => self.classify_named(name, args, is_shape),
        };
        Classified::new(ty.clone(), class)
    }

    fn classify_named(
        &self,
        name: &str,
        args: &[TypeExpr],
        is_shape: &dyn Fn(&str) -> bool,
    ) -> TypeClass {
        if args.is_empty() && is_shape(name) {
            return TypeClass::Shape(name.to_string());
        }
        match (name, args) {
            (NULLABLE_WRAPPER, [inner]) => {
                return TypeClass::Nullable(Box::new(self.classify(inner, is_shape)))
            }
            (tuple, elements) if TUPLE_TYPES.contains(&tuple) && !elements.is_empty() => {
                return TypeClass::Tuple(
                    elements.iter().map(|e| self.classify(e, is_shape)).collect(),
                )
            }
            _ => {}
        }
        match (self.lookup(name), args) {
            (Some(Strategy::Primitive), []) => TypeClass::Primitive,
            (Some(Strategy::Sequence), [element]) => {
                TypeClass::Container(Box::new(self.classify(element, is_shape)))
            }
            _ => TypeClass::Unknown,
        }
    }
}
