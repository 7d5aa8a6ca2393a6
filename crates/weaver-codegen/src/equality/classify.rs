//! Closed classification of property types for structural comparison

use weaver_core::facts::TypeExpr;

/// How a property type takes part in structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// Compared with the type's own default equality.
    Primitive,
    /// Ordered sequence compared element by element.
    Container(Box<Classified>),
    Tuple(Vec<Classified>),
    /// Null-aware wrapper around an inner comparison.
    Nullable(Box<Classified>),
    /// Another shape with a synthesized comparer, by metadata name.
    Shape(String),
    /// No strategy known; falls back to default equality.
    Unknown,
}

/// A type expression paired with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Classified {
    pub ty: TypeExpr,
    pub class: TypeClass,
}

impl Classified {
    pub fn new(ty: TypeExpr, class: TypeClass) -> Self {
        Self { ty, class }
    }

    /// Whether any part of this type has no comparison strategy.
    pub fn has_unknown(&self) -> bool {
        match &self.class {
            TypeClass::Unknown => true,
            TypeClass::Primitive | TypeClass::Shape(_) => false,
            TypeClass::Container(element) | TypeClass::Nullable(element) => element.has_unknown(),
            TypeClass::Tuple(elements) => elements.iter().any(Classified::has_unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_found_in_nested_positions() {
        let inner = Classified::new(TypeExpr::named("App.Opaque"), TypeClass::Unknown);
        let tuple = Classified::new(
            TypeExpr::Tuple(vec![TypeExpr::named("int"), TypeExpr::named("App.Opaque")]),
            TypeClass::Tuple(vec![
                Classified::new(TypeExpr::named("int"), TypeClass::Primitive),
                inner,
            ]),
        );
        assert!(tuple.has_unknown());

        let primitive = Classified::new(TypeExpr::named("int"), TypeClass::Primitive);
        assert!(!primitive.has_unknown());
    }
}
