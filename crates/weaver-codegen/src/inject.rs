//! Constructor composition for injection targets
//!
//! For each target class the resolver computes the constructor parameters
//! (own members plus everything the base chain requires), how they are
//! forwarded to the base constructor, and which post-construction hook, if
//! any, the constructor calls. Problems are recorded on the
//! [`ClassDependencyRecord`]; nothing here fails.

use std::collections::HashSet;
use tracing::{debug, trace};
use weaver_core::diagnostics::{Diagnostic, DiagnosticId, Diagnostics};
use weaver_core::facts::{BaseLevel, HookCandidate, InjectableMember, InjectionTargetFact, TypeIdentity};
use weaver_core::model::Location;

/// Outcome for one hook-marked method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookState {
    Valid,
    /// Takes parameters; never a candidate.
    Parameterized,
    /// Static; never a candidate.
    Static,
    /// One of several valid candidates; none is used.
    Multiple,
    /// The only candidate, on a class without dependencies. Still used.
    NoInjectables,
}

impl HookState {
    /// Whether the method is still called from the constructor.
    pub fn is_usable(self) -> bool {
        matches!(self, HookState::Valid | HookState::NoInjectables)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResolution {
    pub method: String,
    pub state: HookState,
    pub location: Location,
}

impl HookResolution {
    fn diagnostic(&self, type_name: &str) -> Option<Diagnostic> {
        let diagnostic = match self.state {
            HookState::Valid => return None,
            HookState::Parameterized => {
                Diagnostic::new(DiagnosticId::ParameterizedInitializer, self.location.clone())
                    .arg(self.method.clone())
            }
            HookState::Static => {
                Diagnostic::new(DiagnosticId::StaticInitializer, self.location.clone())
                    .arg(self.method.clone())
            }
            HookState::Multiple => {
                Diagnostic::new(DiagnosticId::MultipleInitializers, self.location.clone())
                    .arg(type_name)
                    .arg(self.method.clone())
            }
            HookState::NoInjectables => Diagnostic::new(
                DiagnosticId::InitializerWithoutInjectables,
                self.location.clone(),
            )
            .arg(self.method.clone())
            .arg(type_name),
        };
        Some(diagnostic)
    }
}

/// Resolve the post-construction hook among a class's marked methods.
///
/// Returns the hook to call, if any, and one resolution per candidate in
/// declaration order.
pub fn resolve_hook(
    candidates: &[HookCandidate],
    injectable_count: usize,
) -> (Option<String>, Vec<HookResolution>) {
    let mut resolutions: Vec<HookResolution> = candidates
        .iter()
        .map(|candidate| {
            let state = if candidate.parameter_count > 0 {
                HookState::Parameterized
            } else if candidate.is_static {
                HookState::Static
            } else {
                HookState::Valid
            };
            HookResolution {
                method: candidate.name.clone(),
                state,
                location: candidate.location.clone(),
            }
        })
        .collect();

    let valid: Vec<usize> = resolutions
        .iter()
        .enumerate()
        .filter(|(_, r)| r.state == HookState::Valid)
        .map(|(index, _)| index)
        .collect();

    let hook = match valid.as_slice() {
        [] => None,
        [single] => {
            if injectable_count == 0 {
                resolutions[*single].state = HookState::NoInjectables;
            }
            Some(resolutions[*single].method.clone())
        }
        several => {
            for index in several {
                resolutions[*index].state = HookState::Multiple;
            }
            None
        }
    };
    (hook, resolutions)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorParameter {
    pub ty: String,
    pub name: String,
}

/// `this.member = parameter;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub member: String,
    pub parameter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorPlan {
    pub parameters: Vec<ConstructorParameter>,
    pub assignments: Vec<Assignment>,
    /// Arguments for the base constructor call; empty means no call.
    pub base_arguments: Vec<String>,
    pub hook: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDependencyRecord {
    pub target: TypeIdentity,
    pub own_members: Vec<InjectableMember>,
    /// Members required by the base chain, nearest level first, collapsed.
    pub inherited_members: Vec<InjectableMember>,
    pub hook: Option<String>,
    pub hook_resolutions: Vec<HookResolution>,
    /// `None` when nothing is generated for the class.
    pub constructor: Option<ConstructorPlan>,
    pub diagnostics: Diagnostics,
    pub location: Location,
}

/// Append members, keeping only the first of each `(type, parameter name)`.
fn collapse<'a>(members: impl IntoIterator<Item = &'a InjectableMember>) -> Vec<InjectableMember> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|member| seen.insert((member.ty.clone(), member.parameter())))
        .cloned()
        .collect()
}

/// Parameters the generated constructor of the first level takes.
///
/// Each level requires its own members followed by whatever its base requires.
fn chain_parameters(levels: &[BaseLevel]) -> Vec<InjectableMember> {
    levels.iter().rev().fold(Vec::new(), |required, level| {
        collapse(level.members.iter().chain(required.iter()))
    })
}

fn to_parameters(members: &[InjectableMember]) -> Vec<ConstructorParameter> {
    members
        .iter()
        .map(|member| ConstructorParameter {
            ty: member.ty.clone(),
            name: member.parameter(),
        })
        .collect()
}

/// First pair of parameters sharing a name but not a type.
fn find_conflict(parameters: &[ConstructorParameter]) -> Option<(&ConstructorParameter, &ConstructorParameter)> {
    parameters.iter().enumerate().find_map(|(index, first)| {
        parameters[index + 1..]
            .iter()
            .find(|second| second.name == first.name && second.ty != first.ty)
            .map(|second| (first, second))
    })
}

/// Resolve the dependencies and constructor of one target class.
pub fn resolve(fact: &InjectionTargetFact) -> ClassDependencyRecord {
    let type_name = fact.target.metadata_name();
    let inherited = chain_parameters(&fact.base_levels);
    let all = collapse(fact.own_members.iter().chain(inherited.iter()));
    let parameters = to_parameters(&all);

    let (hook, hook_resolutions) = resolve_hook(&fact.hooks, parameters.len());
    let mut diagnostics: Diagnostics = hook_resolutions
        .iter()
        .filter_map(|resolution| resolution.diagnostic(&type_name))
        .collect();

    let constructor = if let Some((first, second)) = find_conflict(&parameters) {
        debug!(target_type = %type_name, parameter = %first.name, "conflicting dependency names");
        diagnostics.push(
            Diagnostic::new(DiagnosticId::ConflictingDependencyName, fact.location.clone())
                .arg(type_name.clone())
                .arg(first.name.clone())
                .arg(first.ty.clone())
                .arg(second.ty.clone()),
        );
        None
    } else if fact.own_members.is_empty() && hook.is_none() {
        None
    } else {
        Some(ConstructorPlan {
            assignments: fact
                .own_members
                .iter()
                .map(|member| Assignment {
                    member: member.name.clone(),
                    parameter: member.parameter(),
                })
                .collect(),
            base_arguments: inherited.iter().map(InjectableMember::parameter).collect(),
            parameters,
            hook: hook.clone(),
        })
    };

    trace!(
        target_type = %type_name,
        generated = constructor.is_some(),
        "resolved injection target"
    );

    ClassDependencyRecord {
        target: fact.target.clone(),
        own_members: fact.own_members.clone(),
        inherited_members: inherited,
        hook,
        hook_resolutions,
        constructor,
        diagnostics,
        location: fact.location.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_core::model::TypeKind;

    fn candidate(name: &str, is_static: bool, parameter_count: usize) -> HookCandidate {
        HookCandidate {
            name: name.to_string(),
            is_static,
            parameter_count,
            location: Location::default(),
        }
    }

    fn target(own: Vec<InjectableMember>, base_levels: Vec<BaseLevel>) -> InjectionTargetFact {
        InjectionTargetFact {
            target: TypeIdentity {
                namespace: Some("App".to_string()),
                containing_types: vec![],
                name: "Service".to_string(),
                kind: TypeKind::Class,
                type_parameters: vec![],
            },
            own_members: own,
            hooks: vec![],
            base_levels,
            location: Location::default(),
        }
    }

    #[test]
    fn test_static_parameterized_hook_is_parameterized() {
        let (hook, resolutions) = resolve_hook(&[candidate("Init", true, 1)], 1);
        assert_eq!(hook, None);
        assert_eq!(resolutions[0].state, HookState::Parameterized);
    }

    #[test]
    fn test_invalid_candidates_do_not_count_as_multiple() {
        let (hook, resolutions) = resolve_hook(
            &[candidate("Init", false, 0), candidate("Setup", true, 0)],
            2,
        );
        assert_eq!(hook.as_deref(), Some("Init"));
        assert_eq!(
            resolutions.iter().map(|r| r.state).collect::<Vec<_>>(),
            vec![HookState::Valid, HookState::Static]
        );
    }

    #[test]
    fn test_base_arguments_follow_base_constructor_order() {
        let fact = target(
            vec![InjectableMember::new("global::App.IClock", "_clock")],
            vec![
                BaseLevel {
                    type_name: "global::App.Middle".to_string(),
                    members: vec![InjectableMember::new("global::App.ICache", "_cache")],
                },
                BaseLevel {
                    type_name: "global::App.Root".to_string(),
                    members: vec![InjectableMember::new("global::App.ILogger", "_logger")],
                },
            ],
        );
        let record = resolve(&fact);
        let ctor = record.constructor.unwrap();
        assert_eq!(ctor.base_arguments, vec!["cache", "logger"]);
        assert_eq!(
            ctor.parameters.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["clock", "cache", "logger"]
        );
        assert_eq!(record.inherited_members.len(), 2);
    }

    #[test]
    fn test_conflicting_parameter_names_skip_the_class() {
        let fact = target(
            vec![InjectableMember::new("global::App.ILogger", "_logger")],
            vec![BaseLevel {
                type_name: "global::App.Root".to_string(),
                members: vec![InjectableMember::new("global::App.ILogger<global::App.Root>", "Logger")],
            }],
        );
        let record = resolve(&fact);
        assert!(record.constructor.is_none());
        let diagnostic = record.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.id, DiagnosticId::ConflictingDependencyName);
        assert_eq!(diagnostic.args[1], "logger");
    }

    #[test]
    fn test_hook_only_class_gets_parameterless_constructor() {
        let mut fact = target(vec![], vec![]);
        fact.hooks.push(candidate("OnCreated", false, 0));
        let record = resolve(&fact);
        let ctor = record.constructor.unwrap();
        assert!(ctor.parameters.is_empty());
        assert_eq!(ctor.hook.as_deref(), Some("OnCreated"));
        assert_eq!(
            record.hook_resolutions[0].state,
            HookState::NoInjectables
        );
        assert!(!record.diagnostics.has_errors());
    }
}
