//! Grouping of shapes into trees and traversal of the shape graph

use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use weaver_core::facts::{ShapeFact, ShapeProperty};

/// A base shape and its direct variants, in declaration order.
///
/// A variant belongs to the tree of its direct base only; a variant with
/// variants of its own is also the base of a second tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShapeTree {
    pub base: String,
    pub variants: Vec<String>,
}

/// All shapes of a pass that receive a comparer, by metadata name.
///
/// Only partial shapes are admitted; a non-partial shape cannot be augmented
/// and is treated like any other type without a comparer.
#[derive(Debug, Clone, Default)]
pub struct ShapeCatalog {
    shapes: BTreeMap<String, ShapeFact>,
    order: Vec<String>,
    trees: BTreeMap<String, TypeShapeTree>,
}

impl ShapeCatalog {
    pub fn new(facts: &[ShapeFact]) -> Self {
        let mut catalog = Self::default();
        for fact in facts.iter().filter(|f| f.is_partial) {
            let name = fact.qualified_name();
            if catalog.shapes.contains_key(&name) {
                debug!(shape = %name, "duplicate shape declaration ignored");
                continue;
            }
            catalog.order.push(name.clone());
            catalog.shapes.insert(name, fact.clone());
        }
        let links: Vec<(String, String)> = catalog
            .order
            .iter()
            .filter_map(|name| catalog.base_of(name).map(|base| (base.to_string(), name.clone())))
            .collect();
        for (base, variant) in links {
            catalog
                .trees
                .entry(base.clone())
                .or_insert_with(|| TypeShapeTree {
                    base,
                    variants: Vec::new(),
                })
                .variants
                .push(variant);
        }
        catalog
    }

    pub fn get(&self, name: &str) -> Option<&ShapeFact> {
        self.shapes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Base shape of `name`, when that base is itself in the catalog.
    pub fn base_of(&self, name: &str) -> Option<&str> {
        self.shapes
            .get(name)
            .and_then(|fact| fact.base.as_deref())
            .filter(|base| self.shapes.contains_key(*base) && *base != name)
    }

    /// The tree based at `name`; `None` when no shape derives from it.
    pub fn tree(&self, name: &str) -> Option<&TypeShapeTree> {
        self.trees.get(name)
    }

    fn variants_of(&self, name: &str) -> &[String] {
        self.tree(name).map(|tree| tree.variants.as_slice()).unwrap_or(&[])
    }

    /// `name` followed by its ancestors, nearest first. A cycle ends the walk.
    pub fn lineage(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(name);
        while let Some(shape) = current {
            if !self.contains(shape) || !visited.insert(shape) {
                break;
            }
            chain.push(shape.to_string());
            current = self.base_of(shape);
        }
        chain
    }

    /// Properties taking part in equality: inherited ones first, then own.
    ///
    /// Ignored properties are dropped; a property redeclared lower in the
    /// hierarchy replaces the inherited one.
    pub fn effective_properties(&self, name: &str) -> Vec<&ShapeProperty> {
        let mut levels: Vec<&ShapeFact> = self
            .lineage(name)
            .iter()
            .filter_map(|shape| self.shapes.get(shape))
            .collect();
        levels.reverse();

        let mut out: Vec<&ShapeProperty> = Vec::new();
        for level in levels {
            for property in &level.properties {
                if let Some(slot) = out.iter_mut().find(|p| p.name == property.name) {
                    *slot = property;
                } else {
                    out.push(property);
                }
            }
        }
        out.retain(|p| !p.ignored);
        out
    }

    /// Every shape, each root followed by its descendants depth-first.
    pub fn tree_order(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        for root in self.order.iter().filter(|name| self.base_of(name).is_none()) {
            self.visit(root, &mut visited, &mut out);
        }
        // shapes caught in a base cycle have no root; append them as found
        for name in &self.order {
            self.visit(name, &mut visited, &mut out);
        }
        out
    }

    fn visit<'a>(&'a self, name: &'a str, visited: &mut HashSet<&'a str>, out: &mut Vec<String>) {
        if !visited.insert(name) {
            return;
        }
        out.push(name.to_string());
        for variant in self.variants_of(name) {
            self.visit(variant, visited, out);
        }
    }
}
