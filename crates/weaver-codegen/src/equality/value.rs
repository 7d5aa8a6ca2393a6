//! Executable semantics of comparer plans over dynamic values
//!
//! The emitter turns a [`ComparerPlan`] into source text; this module runs the
//! same plan directly against [`Value`]s. Both follow one rule set, so the
//! equality and hash behaviour of generated comparers can be exercised here.

use super::classify::{Classified, TypeClass};
use super::synth::{ComparerPlan, ComparerSet};
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const HASH_SEED: u64 = 17;
static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Seq(Vec<Value>),
    Tuple(Vec<Value>),
    Object(Arc<ObjectValue>),
}

/// Instance of a shape; `type_name` is its runtime type's metadata name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectValue {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

impl ObjectValue {
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }
}

impl Value {
    pub fn object<'a>(
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        Value::Object(Arc::new(ObjectValue {
            type_name: type_name.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }
}

fn combine(hash: u64, value: u64) -> u64 {
    hash.wrapping_mul(31).wrapping_add(value)
}

fn default_hash(value: &Value) -> u64 {
    if let Value::Null = value {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Evaluates comparers of one pass.
pub struct Evaluator<'a> {
    comparers: &'a ComparerSet,
}

impl<'a> Evaluator<'a> {
    pub fn new(comparers: &'a ComparerSet) -> Self {
        Self { comparers }
    }

    pub fn equals(&self, shape: &str, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Object(x), Value::Object(y)) => {
                if Arc::ptr_eq(x, y) {
                    return true;
                }
                match self.comparers.get(shape) {
                    Some(plan) => self.equals_object(plan, x, y),
                    None => a == b,
                }
            }
            _ => a == b,
        }
    }

    pub fn hash(&self, shape: &str, value: &Value) -> u64 {
        match (value, self.comparers.get(shape)) {
            (Value::Null, _) => 0,
            (Value::Object(object), Some(plan)) => self.hash_object(plan, object),
            _ => default_hash(value),
        }
    }

    fn equals_object(&self, plan: &ComparerPlan, x: &ObjectValue, y: &ObjectValue) -> bool {
        for member in &plan.members {
            if !self.equals_typed(&member.ty, x.field(&member.name), y.field(&member.name)) {
                return false;
            }
        }
        if !plan.has_variants() {
            // an abstract shape without variants has no instance it can match
            return !plan.is_abstract;
        }
        if x.type_name != y.type_name {
            return false;
        }
        if x.type_name == plan.shape {
            return true;
        }
        match self.dispatch(plan, &x.type_name) {
            Some(variant) => self.equals_object(variant, x, y),
            None => false,
        }
    }

    fn hash_object(&self, plan: &ComparerPlan, object: &ObjectValue) -> u64 {
        let mut hash = HASH_SEED;
        for member in &plan.members {
            hash = combine(hash, self.hash_typed(&member.ty, object.field(&member.name)));
        }
        if plan.has_variants() && object.type_name != plan.shape {
            if let Some(variant) = self.dispatch(plan, &object.type_name) {
                hash = combine(hash, self.hash_object(variant, object));
            }
        }
        hash
    }

    /// Direct variant of `plan` whose lineage contains the runtime type.
    fn dispatch(&self, plan: &ComparerPlan, runtime_type: &str) -> Option<&'a ComparerPlan> {
        plan.variants
            .iter()
            .find(|arm| self.comparers.is_a(runtime_type, &arm.shape))
            .and_then(|arm| self.comparers.get(&arm.shape))
            .map(Arc::as_ref)
    }

    fn equals_typed(&self, ty: &Classified, a: &Value, b: &Value) -> bool {
        match &ty.class {
            TypeClass::Primitive | TypeClass::Unknown => a == b,
            TypeClass::Shape(shape) => self.equals(shape, a, b),
            TypeClass::Nullable(inner) => match (a, b) {
                (Value::Null, Value::Null) => true,
                (Value::Null, _) | (_, Value::Null) => false,
                _ => self.equals_typed(inner, a, b),
            },
            TypeClass::Container(element) => match (a, b) {
                (Value::Seq(xs), Value::Seq(ys)) => {
                    xs.len() == ys.len()
                        && xs
                            .iter()
                            .zip(ys)
                            .all(|(x, y)| self.equals_typed(element, x, y))
                }
                _ => a == b,
            },
            TypeClass::Tuple(elements) => match (a, b) {
                (Value::Tuple(xs), Value::Tuple(ys))
                    if xs.len() == elements.len() && ys.len() == elements.len() =>
                {
                    elements
                        .iter()
                        .zip(xs.iter().zip(ys))
                        .all(|(element, (x, y))| self.equals_typed(element, x, y))
                }
                _ => a == b,
            },
        }
    }

    fn hash_typed(&self, ty: &Classified, value: &Value) -> u64 {
        match (&ty.class, value) {
            (_, Value::Null) => 0,
            (TypeClass::Primitive | TypeClass::Unknown, _) => default_hash(value),
            (TypeClass::Shape(shape), _) => self.hash(shape, value),
            (TypeClass::Nullable(inner), _) => self.hash_typed(inner, value),
            (TypeClass::Container(element), Value::Seq(items)) => items
                .iter()
                .fold(combine(HASH_SEED, items.len() as u64), |hash, item| {
                    combine(hash, self.hash_typed(element, item))
                }),
            (TypeClass::Tuple(elements), Value::Tuple(items)) if items.len() == elements.len() => {
                elements
                    .iter()
                    .zip(items)
                    .fold(HASH_SEED, |hash, (element, item)| {
                        combine(hash, self.hash_typed(element, item))
                    })
            }
            _ => default_hash(value),
        }
    }
}
