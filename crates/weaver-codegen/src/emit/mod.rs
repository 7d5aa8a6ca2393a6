//! Rendering of resolved models into generated source files
//!
//! Every function here is pure: the same input always yields byte-identical
//! text. Declarations are grouped by namespace (ordinal order), and keep
//! their input order inside a namespace.

pub mod comparers;
pub mod constructors;
pub mod registrations;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weaver_core::facts::TypeIdentity;

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratedSource {
    pub file_name: String,
    pub text: String,
}

impl GeneratedSource {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
        }
    }
}

/// Group items by the namespace they are emitted into.
pub(crate) fn by_namespace<'a, T>(
    items: impl IntoIterator<Item = &'a T>,
    identity: impl Fn(&T) -> &TypeIdentity,
    root_namespace: &str,
) -> BTreeMap<String, Vec<&'a T>>
where
    T: 'a,
{
    let mut groups: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for item in items {
        let namespace = identity(item)
            .namespace
            .clone()
            .unwrap_or_else(|| root_namespace.to_string());
        groups.entry(namespace).or_default().push(item);
    }
    groups
}
