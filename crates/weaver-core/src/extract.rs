//! Program model extraction
//!
//! Walks the host's program model and projects the marked declarations into
//! [`facts`](crate::facts). Live model data (symbol identities, attribute
//! objects) stays inside this module; only value-comparable facts and
//! diagnostics leave it.

use crate::cancel::CancellationToken;
use crate::config::MarkerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticId, Diagnostics};
use crate::error::CoreError;
use crate::facts::{
    BaseLevel, HookCandidate, InjectableMember, InjectionTargetFact, RegistrationFact,
    ScopeType, ServiceLifetime, ShapeFact, ShapeProperty, TypeExpr, TypeIdentity,
};
use crate::model::{
    Attribute, AttributeValue, Location, MemberDecl, MemberKind, ModelIndex, ProgramModel,
    TypeDecl, TypeRef,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument, trace};

const HINT_ARGUMENT: &str = "MethodNameHint";
const SERVICE_TYPE_ARGUMENT: &str = "ServiceType";
const IMPLEMENTATION_TYPE_ARGUMENT: &str = "ImplementationType";

/// Facts of one kind plus the diagnostics raised while extracting them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction<T> {
    pub facts: Vec<T>,
    pub diagnostics: Diagnostics,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            facts: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Everything one extraction pass produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFacts {
    pub registrations: Extraction<RegistrationFact>,
    pub injections: Extraction<InjectionTargetFact>,
    pub shapes: Extraction<ShapeFact>,
}

pub struct Extractor<'a> {
    model: &'a ProgramModel,
    index: ModelIndex<'a>,
    markers: &'a MarkerConfig,
    cancel: CancellationToken,
}

impl<'a> Extractor<'a> {
    pub fn new(model: &'a ProgramModel, markers: &'a MarkerConfig) -> Self {
        Self {
            model,
            index: model.index(),
            markers,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[instrument(skip_all, fields(assembly = %self.model.assembly_name))]
    pub fn extract_all(&self) -> Result<ExtractedFacts, CoreError> {
        Ok(ExtractedFacts {
            registrations: self.extract_registrations()?,
            injections: self.extract_injection_targets()?,
            shapes: self.extract_shapes()?,
        })
    }

    /// Registrations from assembly-scoped markers first, then class-scoped markers in declaration order.
    pub fn extract_registrations(&self) -> Result<Extraction<RegistrationFact>, CoreError> {
        let mut out = Extraction::default();
        let marker = self.markers.register_service.as_str();

        for attribute in self.model.assembly_attributes.iter().filter(|a| a.is(marker)) {
            self.cancel.check()?;
            match self.assembly_registration(attribute) {
                Ok(fact) => out.facts.push(fact),
                Err(diagnostic) => out.diagnostics.push(diagnostic),
            }
        }

        for decl in &self.model.types {
            self.cancel.check()?;
            for attribute in decl.attributes_named(marker) {
                match self.class_registration(decl, attribute) {
                    Ok(fact) => out.facts.push(fact),
                    Err(diagnostic) => out.diagnostics.push(diagnostic),
                }
            }
        }

        debug!(
            registrations = out.facts.len(),
            diagnostics = out.diagnostics.len(),
            "extracted registrations"
        );
        Ok(out)
    }

    fn assembly_registration(&self, attribute: &Attribute) -> Result<RegistrationFact, Diagnostic> {
        let lifetime = parse_lifetime(attribute)?;
        let mut types = type_arguments(attribute);
        if let Some(AttributeValue::Type(service)) = attribute.named(SERVICE_TYPE_ARGUMENT) {
            types.insert(0, service);
        }
        if let Some(AttributeValue::Type(implementation)) = attribute.named(IMPLEMENTATION_TYPE_ARGUMENT) {
            types.push(implementation);
        }

        let (service, implementation) = match types.as_slice() {
            [] => {
                return Err(Diagnostic::new(
                    DiagnosticId::MissingImplementationType,
                    attribute.location.clone(),
                )
                .arg("<unspecified service>"))
            }
            [implementation] => (None, *implementation),
            [service, implementation] => (Some(*service), *implementation),
            [service, ..] => {
                return Err(Diagnostic::new(
                    DiagnosticId::InvalidImplementationType,
                    attribute.location.clone(),
                )
                .arg(TypeExpr::from(*service).to_string())
                .arg("given more than one implementation type"))
            }
        };

        if let Some(decl) = self.index.resolve(implementation) {
            check_implementable(decl, &attribute.location)?;
        }

        let (implementation_type, is_open_generic) = self.registration_type_name(implementation);
        let service_type = service.map(|s| self.registration_type_name(s).0);
        Ok(RegistrationFact {
            service_type,
            implementation_type,
            lifetime,
            hint: hint(attribute),
            is_open_generic,
        })
    }

    fn class_registration(
        &self,
        decl: &TypeDecl,
        attribute: &Attribute,
    ) -> Result<RegistrationFact, Diagnostic> {
        let types = type_arguments(attribute);
        if types.len() > 1 || attribute.named(IMPLEMENTATION_TYPE_ARGUMENT).is_some() {
            return Err(Diagnostic::new(
                DiagnosticId::RedundantImplementationType,
                attribute.location.clone(),
            )
            .arg(decl.metadata_name()));
        }
        let lifetime = parse_lifetime(attribute)?;
        check_implementable(decl, &attribute.location)?;

        let service = types.first().copied().or(match attribute.named(SERVICE_TYPE_ARGUMENT) {
            Some(AttributeValue::Type(service)) => Some(service),
            _ => None,
        });

        let identity = type_identity(decl);
        let is_open_generic = identity.is_generic();
        let implementation_type = if is_open_generic {
            identity.open_generic_name()
        } else {
            identity.display_name()
        };

        Ok(RegistrationFact {
            service_type: service.map(|s| self.registration_type_name(s).0),
            implementation_type,
            lifetime,
            hint: hint(attribute),
            is_open_generic,
        })
    }

    /// Display name for a registration type; unbound generics become `typeof`-style names.
    fn registration_type_name(&self, ty: &TypeRef) -> (String, bool) {
        if let (TypeRef::Named { args, .. }, Some(decl)) = (ty, self.index.resolve(ty)) {
            let identity = type_identity(decl);
            if args.is_empty() && identity.is_generic() {
                return (identity.open_generic_name(), true);
            }
        }
        (TypeExpr::from(ty).to_string(), false)
    }

    /// Partial classes with injected members or initializer methods.
    pub fn extract_injection_targets(&self) -> Result<Extraction<InjectionTargetFact>, CoreError> {
        let mut out = Extraction::default();

        for decl in &self.model.types {
            self.cancel.check()?;

            let mut own_members = Vec::new();
            for member in &decl.members {
                match self.injectable(member) {
                    Some(Ok(injectable)) => own_members.push(injectable),
                    Some(Err(diagnostic)) => out.diagnostics.push(diagnostic),
                    None => {}
                }
            }

            let hooks: Vec<HookCandidate> = decl
                .methods
                .iter()
                .filter(|m| m.attributes.iter().any(|a| a.is(&self.markers.inject_initializer)))
                .map(|m| HookCandidate {
                    name: m.name.clone(),
                    is_static: m.is_static,
                    parameter_count: m.parameters.len(),
                    location: m.location.clone(),
                })
                .collect();

            if own_members.is_empty() && hooks.is_empty() {
                continue;
            }

            if !is_fully_partial(decl) {
                out.diagnostics.push(
                    Diagnostic::new(DiagnosticId::TypeNotPartial, decl.location.clone())
                        .arg(decl.metadata_name()),
                );
                continue;
            }

            trace!(target_type = %decl.metadata_name(), members = own_members.len(), "injection target");
            out.facts.push(InjectionTargetFact {
                target: type_identity(decl),
                own_members,
                hooks,
                base_levels: self.base_levels(decl),
                location: decl.location.clone(),
            });
        }

        debug!(
            targets = out.facts.len(),
            diagnostics = out.diagnostics.len(),
            "extracted injection targets"
        );
        Ok(out)
    }

    /// `None` when the member is not marked; `Some(Err)` when the marker is misused.
    fn injectable(&self, member: &MemberDecl) -> Option<Result<InjectableMember, Diagnostic>> {
        let markers = member
            .attributes
            .iter()
            .filter(|a| a.is(&self.markers.inject))
            .count();
        if markers == 0 {
            return None;
        }
        if markers > 1 {
            return Some(Err(Diagnostic::new(
                DiagnosticId::ConflictingInjectMarkers,
                member.location.clone(),
            )
            .arg(member.name.clone())));
        }
        if member.is_static {
            return Some(Err(Diagnostic::new(
                DiagnosticId::InjectOnStaticMember,
                member.location.clone(),
            )
            .arg(member.name.clone())));
        }
        Some(Ok(InjectableMember::new(
            TypeExpr::from(&member.ty).to_string(),
            member.name.clone(),
        )))
    }

    /// Walk the base chain up to the universal root, collecting each source-declared level's members.
    fn base_levels(&self, decl: &TypeDecl) -> Vec<BaseLevel> {
        let mut levels = Vec::new();
        let mut visited = HashSet::from([decl.id]);
        let mut current = decl.base.as_ref();

        while let Some(base) = current {
            if base.is_object_root() {
                break;
            }
            let Some(base_decl) = self.index.resolve(base) else {
                break;
            };
            if !visited.insert(base_decl.id) {
                debug!(type_name = %decl.metadata_name(), "inheritance cycle cut");
                break;
            }
            let members = base_decl
                .members
                .iter()
                .filter_map(|m| self.injectable(m).and_then(Result::ok))
                .collect();
            levels.push(BaseLevel {
                type_name: type_identity(base_decl).display_name(),
                members,
            });
            current = base_decl.base.as_ref();
        }
        levels
    }

    /// Shapes marked for structural equality, with tree membership resolved.
    pub fn extract_shapes(&self) -> Result<Extraction<ShapeFact>, CoreError> {
        let mut out = Extraction::default();
        let marker = self.markers.value_comparer.as_str();

        for decl in self.model.types.iter() {
            self.cancel.check()?;
            if !decl.has_attribute(marker) {
                continue;
            }

            let is_partial = is_fully_partial(decl);
            if !is_partial {
                out.diagnostics.push(
                    Diagnostic::new(DiagnosticId::TypeNotPartial, decl.location.clone())
                        .arg(decl.metadata_name()),
                );
            }

            let base = decl
                .base
                .as_ref()
                .and_then(|b| self.index.resolve(b))
                .filter(|b| b.has_attribute(marker) && is_fully_partial(b))
                .map(TypeDecl::metadata_name);

            let properties = decl
                .members
                .iter()
                .filter(|m| m.kind == MemberKind::Property && !m.is_static)
                .map(|m| ShapeProperty {
                    name: m.name.clone(),
                    ty: TypeExpr::from(&m.ty),
                    ignored: m
                        .attributes
                        .iter()
                        .any(|a| a.is(&self.markers.ignore_in_comparison)),
                })
                .collect();

            out.facts.push(ShapeFact {
                identity: type_identity(decl),
                properties,
                is_abstract: decl.modifiers.is_abstract,
                is_partial,
                base,
                location: decl.location.clone(),
            });
        }

        debug!(
            shapes = out.facts.len(),
            diagnostics = out.diagnostics.len(),
            "extracted shapes"
        );
        Ok(out)
    }
}

/// Project a declaration's identity; drops the symbol id.
pub fn type_identity(decl: &TypeDecl) -> TypeIdentity {
    TypeIdentity {
        namespace: decl.namespace.clone().filter(|ns| !ns.is_empty()),
        containing_types: decl
            .containing_types
            .iter()
            .map(|c| ScopeType {
                name: c.name.clone(),
                keyword: c.kind.keyword().to_string(),
                type_parameters: c.type_parameters.clone(),
            })
            .collect(),
        name: decl.name.clone(),
        kind: decl.kind,
        type_parameters: decl.type_parameters.clone(),
    }
}

fn is_fully_partial(decl: &TypeDecl) -> bool {
    decl.modifiers.is_partial && decl.containing_types.iter().all(|c| c.is_partial)
}

fn check_implementable(decl: &TypeDecl, location: &Location) -> Result<(), Diagnostic> {
    let reason = if decl.modifiers.is_static {
        "static"
    } else if decl.modifiers.is_abstract {
        "abstract"
    } else {
        return Ok(());
    };
    Err(
        Diagnostic::new(DiagnosticId::InvalidImplementationType, location.clone())
            .arg(decl.metadata_name())
            .arg(reason),
    )
}

fn parse_lifetime(attribute: &Attribute) -> Result<ServiceLifetime, Diagnostic> {
    let raw = match attribute.args.first() {
        Some(AttributeValue::Enum(value)) | Some(AttributeValue::String(value)) => value.as_str(),
        _ => "<missing>",
    };
    ServiceLifetime::parse(raw).ok_or_else(|| {
        Diagnostic::new(DiagnosticId::InvalidLifetime, attribute.location.clone()).arg(raw)
    })
}

fn type_arguments(attribute: &Attribute) -> Vec<&TypeRef> {
    attribute
        .args
        .iter()
        .filter_map(|arg| match arg {
            AttributeValue::Type(ty) => Some(ty),
            _ => None,
        })
        .collect()
}

fn hint(attribute: &Attribute) -> String {
    match attribute.named(HINT_ARGUMENT) {
        Some(AttributeValue::String(hint)) => hint.trim().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Modifiers, SymbolId, TypeKind};

    fn class(id: u32, name: &str) -> TypeDecl {
        TypeDecl {
            id: SymbolId(id),
            name: name.to_string(),
            namespace: Some("App".to_string()),
            containing_types: vec![],
            kind: TypeKind::Class,
            modifiers: Modifiers {
                is_partial: true,
                ..Default::default()
            },
            type_parameters: vec![],
            base: None,
            attributes: vec![],
            members: vec![],
            methods: vec![],
            location: Location::new(format!("{}.cs", name), 1, 1),
        }
    }

    fn lifetime(value: &str) -> AttributeValue {
        AttributeValue::Enum(format!("ServiceLifetime.{}", value))
    }

    #[test]
    fn test_class_registration_uses_class_as_implementation() {
        let mut model = ProgramModel::new("App");
        let mut decl = class(1, "Clock");
        decl.attributes.push(
            Attribute::new("RegisterService")
                .with_arg(lifetime("Singleton"))
                .with_arg(AttributeValue::Type(TypeRef::named("App.IClock"))),
        );
        model.types.push(decl);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers).extract_registrations().unwrap();
        assert!(out.diagnostics.is_empty());
        assert_eq!(
            out.facts,
            vec![RegistrationFact {
                service_type: Some("global::App.IClock".to_string()),
                implementation_type: "global::App.Clock".to_string(),
                lifetime: ServiceLifetime::Singleton,
                hint: String::new(),
                is_open_generic: false,
            }]
        );
    }

    #[test]
    fn test_class_registration_rejects_implementation_type() {
        let mut model = ProgramModel::new("App");
        let mut decl = class(1, "Clock");
        decl.attributes.push(
            Attribute::new("RegisterService")
                .with_arg(lifetime("Scoped"))
                .with_arg(AttributeValue::Type(TypeRef::named("App.IClock")))
                .with_arg(AttributeValue::Type(TypeRef::named("App.Clock"))),
        );
        model.types.push(decl);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers).extract_registrations().unwrap();
        assert!(out.facts.is_empty());
        assert_eq!(
            out.diagnostics.iter().map(|d| d.id).collect::<Vec<_>>(),
            vec![DiagnosticId::RedundantImplementationType]
        );
    }

    #[test]
    fn test_open_generic_class_registration() {
        let mut model = ProgramModel::new("App");
        let mut decl = class(1, "Repository");
        decl.type_parameters = vec!["T".to_string()];
        decl.attributes.push(
            Attribute::new("RegisterService")
                .with_arg(lifetime("Scoped"))
                .with_arg(AttributeValue::Type(TypeRef::symbol("App.IRepository", SymbolId(2)))),
        );
        let mut service = class(2, "IRepository");
        service.kind = TypeKind::Interface;
        service.type_parameters = vec!["T".to_string()];
        model.types.push(decl);
        model.types.push(service);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers).extract_registrations().unwrap();
        let fact = &out.facts[0];
        assert!(fact.is_open_generic);
        assert_eq!(fact.implementation_type, "global::App.Repository<>");
        assert_eq!(fact.service_type.as_deref(), Some("global::App.IRepository<>"));
    }

    #[test]
    fn test_abstract_class_cannot_be_registered() {
        let mut model = ProgramModel::new("App");
        let mut decl = class(1, "Handler");
        decl.modifiers.is_abstract = true;
        decl.attributes
            .push(Attribute::new("RegisterService").with_arg(lifetime("Transient")));
        model.types.push(decl);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers).extract_registrations().unwrap();
        assert!(out.facts.is_empty());
        let diagnostic = out.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.id, DiagnosticId::InvalidImplementationType);
        assert!(diagnostic.message().contains("abstract"));
    }

    #[test]
    fn test_invalid_lifetime() {
        let mut model = ProgramModel::new("App");
        model.assembly_attributes.push(
            Attribute::new("RegisterService")
                .with_arg(lifetime("Forever"))
                .with_arg(AttributeValue::Type(TypeRef::named("App.Clock"))),
        );
        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers).extract_registrations().unwrap();
        assert!(out.facts.is_empty());
        assert_eq!(
            out.diagnostics.iter().next().map(|d| d.message()),
            Some("'ServiceLifetime.Forever' is not a valid service lifetime".to_string())
        );
    }

    #[test]
    fn test_static_and_duplicate_inject_markers() {
        let mut model = ProgramModel::new("App");
        let mut decl = class(1, "Service");
        decl.members.push(MemberDecl {
            name: "_shared".to_string(),
            ty: TypeRef::named("App.ICache"),
            kind: MemberKind::Field,
            is_static: true,
            attributes: vec![Attribute::new("Inject")],
            location: Location::default(),
        });
        decl.members.push(MemberDecl {
            name: "_twice".to_string(),
            ty: TypeRef::named("App.IClock"),
            kind: MemberKind::Field,
            is_static: false,
            attributes: vec![Attribute::new("Inject"), Attribute::new("InjectAttribute")],
            location: Location::default(),
        });
        model.types.push(decl);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers)
            .extract_injection_targets()
            .unwrap();
        assert!(out.facts.is_empty());
        let ids: Vec<_> = out.diagnostics.iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![
                DiagnosticId::InjectOnStaticMember,
                DiagnosticId::ConflictingInjectMarkers
            ]
        );
    }

    #[test]
    fn test_non_partial_injection_target() {
        let mut model = ProgramModel::new("App");
        let mut decl = class(1, "Service");
        decl.modifiers.is_partial = false;
        decl.members.push(MemberDecl {
            name: "_clock".to_string(),
            ty: TypeRef::named("App.IClock"),
            kind: MemberKind::Field,
            is_static: false,
            attributes: vec![Attribute::new("Inject")],
            location: Location::default(),
        });
        model.types.push(decl);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers)
            .extract_injection_targets()
            .unwrap();
        assert!(out.facts.is_empty());
        assert_eq!(out.diagnostics.by_id(DiagnosticId::TypeNotPartial).count(), 1);
    }

    #[test]
    fn test_inheritance_cycle_terminates() {
        let mut model = ProgramModel::new("App");
        let mut a = class(1, "A");
        a.base = Some(TypeRef::symbol("App.B", SymbolId(2)));
        a.members.push(MemberDecl {
            name: "_clock".to_string(),
            ty: TypeRef::named("App.IClock"),
            kind: MemberKind::Field,
            is_static: false,
            attributes: vec![Attribute::new("Inject")],
            location: Location::default(),
        });
        let mut b = class(2, "B");
        b.base = Some(TypeRef::symbol("App.A", SymbolId(1)));
        model.types.push(a);
        model.types.push(b);

        let markers = MarkerConfig::default();
        let out = Extractor::new(&model, &markers)
            .extract_injection_targets()
            .unwrap();
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.facts[0].base_levels.len(), 1);
    }

    #[test]
    fn test_cancelled_extraction() {
        let mut model = ProgramModel::new("App");
        model.types.push(class(1, "A"));
        let markers = MarkerConfig::default();
        let token = CancellationToken::new();
        token.cancel();

        let result = Extractor::new(&model, &markers)
            .with_cancellation(token)
            .extract_all();
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }
}
