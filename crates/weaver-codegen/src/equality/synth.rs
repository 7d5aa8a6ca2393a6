//! Comparer plans: what each synthesized comparer compares, and in which order
//!
//! A plan is built once per shape per pass through the pass cache. Plans refer
//! to other shapes by name only, so self-referential and mutually recursive
//! shapes never require a plan to be built while it is being built.

use super::classify::Classified;
use super::registry::ComparerRegistry;
use super::tree::ShapeCatalog;
use crate::error::CodegenError;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use weaver_core::cache::{CacheKey, PassCache};
use weaver_core::diagnostics::{Diagnostic, DiagnosticId, Diagnostics};
use weaver_core::facts::{ShapeFact, TypeIdentity};
use weaver_core::CancellationToken;

/// One property comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberComparison {
    pub name: String,
    pub ty: Classified,
}

/// Dispatch target for a direct variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantArm {
    pub shape: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparerPlan {
    pub shape: String,
    pub identity: TypeIdentity,
    pub is_abstract: bool,
    /// Effective properties; empty for an abstract shape.
    pub members: Vec<MemberComparison>,
    /// Direct variants, closed-world.
    pub variants: Vec<VariantArm>,
    /// Warnings for properties compared with default equality.
    pub diagnostics: Vec<Diagnostic>,
}

impl ComparerPlan {
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }
}

/// Builds plans for the shapes of one catalog.
pub struct Synthesizer<'a> {
    catalog: &'a ShapeCatalog,
    registry: &'a ComparerRegistry,
    cache: &'a PassCache<ComparerPlan>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        catalog: &'a ShapeCatalog,
        registry: &'a ComparerRegistry,
        cache: &'a PassCache<ComparerPlan>,
    ) -> Self {
        Self {
            catalog,
            registry,
            cache,
        }
    }

    /// Plan for `shape`, built at most once per pass.
    pub fn plan(&self, shape: &str) -> Result<Arc<ComparerPlan>, CodegenError> {
        self.cache
            .get_or_create(CacheKey::named(shape), || self.build(shape))
            .map_err(CodegenError::from)
    }

    fn build(&self, shape: &str) -> Result<ComparerPlan, CodegenError> {
        let fact = self
            .catalog
            .get(shape)
            .ok_or_else(|| CodegenError::UnknownShape(shape.to_string()))?;

        let is_shape = |name: &str| self.catalog.contains(name);
        let mut diagnostics = Vec::new();
        let members = if fact.is_abstract {
            Vec::new()
        } else {
            self.catalog
                .effective_properties(shape)
                .into_iter()
                .map(|property| {
                    let ty = self.registry.classify(&property.ty, &is_shape);
                    if ty.has_unknown() {
                        warn!(shape = %shape, property = %property.name, "no comparison strategy");
                        diagnostics.push(unsupported(fact, &property.name, &ty));
                    }
                    MemberComparison {
                        name: property.name.clone(),
                        ty,
                    }
                })
                .collect()
        };

        let variants = self
            .catalog
            .tree(shape)
            .map(|tree| {
                tree.variants
                    .iter()
                    .filter_map(|variant| self.catalog.get(variant))
                    .map(|variant| VariantArm {
                        shape: variant.qualified_name(),
                        display_name: variant.identity.display_name(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ComparerPlan {
            shape: shape.to_string(),
            identity: fact.identity.clone(),
            is_abstract: fact.is_abstract,
            members,
            variants,
            diagnostics,
        })
    }
}

fn unsupported(fact: &ShapeFact, property: &str, ty: &Classified) -> Diagnostic {
    Diagnostic::new(DiagnosticId::UnsupportedComparisonType, fact.location.clone())
        .arg(property)
        .arg(fact.qualified_name())
        .arg(ty.ty.to_string())
}

/// The comparers of one pass plus the lineage needed for variant dispatch.
#[derive(Debug, Clone, Default)]
pub struct ComparerSet {
    plans: BTreeMap<String, Arc<ComparerPlan>>,
    order: Vec<String>,
    lineage: BTreeMap<String, Vec<String>>,
}

impl ComparerSet {
    pub fn get(&self, shape: &str) -> Option<&Arc<ComparerPlan>> {
        self.plans.get(shape)
    }

    /// Plans in tree order: each root followed by its descendants.
    pub fn plans(&self) -> impl Iterator<Item = &Arc<ComparerPlan>> {
        self.order.iter().filter_map(|name| self.plans.get(name))
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Whether `shape` has a comparer and is a value type, so `shape?` is a
    /// `Nullable<T>` rather than an annotated reference.
    pub fn is_value_shape(&self, shape: &str) -> bool {
        self.plans
            .get(shape)
            .is_some_and(|plan| plan.identity.kind.is_value_type())
    }

    /// Whether a runtime type is `shape` or derives from it.
    pub fn is_a(&self, runtime_type: &str, shape: &str) -> bool {
        self.lineage
            .get(runtime_type)
            .is_some_and(|chain| chain.iter().any(|s| s == shape))
    }
}

/// Result of synthesizing every comparer of a pass.
#[derive(Debug, Default)]
pub struct Synthesis {
    pub comparers: ComparerSet,
    pub diagnostics: Diagnostics,
}

/// Build plans for every shape in the catalog, in parallel.
///
/// A shape whose plan fails is reported and left out; the others are kept.
#[instrument(skip_all, fields(shapes = catalog.len()))]
pub fn synthesize(
    catalog: &ShapeCatalog,
    registry: &ComparerRegistry,
    cancel: &CancellationToken,
) -> Result<Synthesis, CodegenError> {
    let cache = PassCache::new();
    let synthesizer = Synthesizer::new(catalog, registry, &cache);
    let order = catalog.tree_order();

    let results: Vec<(String, Result<Arc<ComparerPlan>, CodegenError>)> = order
        .par_iter()
        .map(|shape| {
            cancel.check()?;
            Ok((shape.clone(), synthesizer.plan(shape)))
        })
        .collect::<Result<_, CodegenError>>()?;

    let mut synthesis = Synthesis::default();
    for (shape, result) in results {
        match result {
            Ok(plan) => {
                synthesis.diagnostics.extend(plan.diagnostics.iter().cloned());
                synthesis
                    .comparers
                    .lineage
                    .insert(shape.clone(), catalog.lineage(&shape));
                synthesis.comparers.order.push(shape.clone());
                synthesis.comparers.plans.insert(shape, plan);
            }
            Err(CodegenError::CachePoisoned(err)) => {
                let location = catalog
                    .get(&shape)
                    .map(|fact| fact.location.clone())
                    .unwrap_or_default();
                synthesis.diagnostics.push(
                    Diagnostic::new(DiagnosticId::CachePopulationFailed, location)
                        .arg(err.key)
                        .arg(err.message),
                );
            }
            Err(other) => return Err(other),
        }
    }

    debug!(
        comparers = synthesis.comparers.len(),
        builds = cache.builds(),
        "synthesized comparers"
    );
    Ok(synthesis)
}
