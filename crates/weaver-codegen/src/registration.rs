//! Grouping of service registrations into composed registration methods

use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use weaver_core::facts::RegistrationFact;
use weaver_core::naming::identifier_fragment;

/// One emitted registration method and the registrations it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationGroup {
    pub hint: String,
    pub method_name: String,
    pub registrations: Vec<RegistrationFact>,
}

impl RegistrationGroup {
    /// Registration call, e.g. `services.AddScoped<global::App.IClock, global::App.Clock>();`.
    pub fn call(registration: &RegistrationFact) -> String {
        let method = registration.lifetime.method();
        let implementation = &registration.implementation_type;
        match (&registration.service_type, registration.is_open_generic) {
            (Some(service), true) => format!(
                "services.{}(typeof({}), typeof({}));",
                method, service, implementation
            ),
            (None, true) => format!("services.{}(typeof({}));", method, implementation),
            (Some(service), false) => {
                format!("services.{}<{}, {}>();", method, service, implementation)
            }
            (None, false) => format!("services.{}<{}>();", method, implementation),
        }
    }
}

/// Group registrations by hint, in order of first appearance.
///
/// Registrations keep their input order inside a group. Hints that sanitize
/// to the same method name get a numeric suffix instead of being merged.
pub fn group_registrations(
    registrations: &[RegistrationFact],
    default_method: &str,
) -> Vec<RegistrationGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut by_hint: BTreeMap<String, Vec<RegistrationFact>> = BTreeMap::new();
    for registration in registrations {
        if !by_hint.contains_key(&registration.hint) {
            order.push(registration.hint.clone());
        }
        by_hint
            .entry(registration.hint.clone())
            .or_default()
            .push(registration.clone());
    }

    let mut taken = HashSet::new();
    order
        .into_iter()
        .map(|hint| {
            let base = method_name(&hint, default_method);
            let mut method_name = base.clone();
            let mut suffix = 2;
            while !taken.insert(method_name.clone()) {
                method_name = format!("{}{}", base, suffix);
                suffix += 1;
            }
            if method_name != base {
                debug!(hint = %hint, method = %method_name, "registration method name disambiguated");
            }
            let registrations = by_hint.remove(&hint).unwrap_or_default();
            RegistrationGroup {
                hint,
                method_name,
                registrations,
            }
        })
        .collect()
}

/// `Add{Hint}Services`, or the default name for an empty hint.
pub fn method_name(hint: &str, default_method: &str) -> String {
    let fragment = identifier_fragment(hint);
    if fragment.is_empty() {
        default_method.to_string()
    } else {
        format!("Add{}Services", fragment)
    }
}
