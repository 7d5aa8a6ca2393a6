//! Diagnostics reported back to the generation host
//!
//! Every condition a generator can run into (bad marker usage, unresolvable
//! hooks, unsupported property types, cache failures) is represented as a
//! [`Diagnostic`] value rather than an error crossing a component boundary.
//! The host decides how to surface them; generation continues for every
//! declaration that is not affected.

use crate::model::Location;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Broad grouping used when summarising a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCategory {
    Registration,
    Injection,
    Comparer,
    Pipeline,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Registration => write!(f, "REGISTRATION"),
            DiagnosticCategory::Injection => write!(f, "INJECTION"),
            DiagnosticCategory::Comparer => write!(f, "COMPARER"),
            DiagnosticCategory::Pipeline => write!(f, "PIPELINE"),
        }
    }
}

/// Every diagnostic the generators can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticId {
    MissingImplementationType,
    RedundantImplementationType,
    InvalidLifetime,
    InvalidImplementationType,
    TypeNotPartial,
    InjectOnStaticMember,
    ConflictingInjectMarkers,
    MultipleInitializers,
    StaticInitializer,
    ParameterizedInitializer,
    InitializerWithoutInjectables,
    ConflictingDependencyName,
    UnsupportedComparisonType,
    CachePopulationFailed,
}

impl DiagnosticId {
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticId::MissingImplementationType => "WV0001",
            DiagnosticId::RedundantImplementationType => "WV0002",
            DiagnosticId::InvalidLifetime => "WV0003",
            DiagnosticId::InvalidImplementationType => "WV0004",
            DiagnosticId::TypeNotPartial => "WV0100",
            DiagnosticId::InjectOnStaticMember => "WV0101",
            DiagnosticId::ConflictingInjectMarkers => "WV0102",
            DiagnosticId::MultipleInitializers => "WV0103",
            DiagnosticId::StaticInitializer => "WV0104",
            DiagnosticId::ParameterizedInitializer => "WV0105",
            DiagnosticId::InitializerWithoutInjectables => "WV0106",
            DiagnosticId::ConflictingDependencyName => "WV0107",
            DiagnosticId::UnsupportedComparisonType => "WV0200",
            DiagnosticId::CachePopulationFailed => "WV0900",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticId::InitializerWithoutInjectables
            | DiagnosticId::UnsupportedComparisonType => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn category(self) -> DiagnosticCategory {
        match self {
            DiagnosticId::MissingImplementationType
            | DiagnosticId::RedundantImplementationType
            | DiagnosticId::InvalidLifetime
            | DiagnosticId::InvalidImplementationType => DiagnosticCategory::Registration,
            DiagnosticId::TypeNotPartial
            | DiagnosticId::InjectOnStaticMember
            | DiagnosticId::ConflictingInjectMarkers
            | DiagnosticId::MultipleInitializers
            | DiagnosticId::StaticInitializer
            | DiagnosticId::ParameterizedInitializer
            | DiagnosticId::InitializerWithoutInjectables
            | DiagnosticId::ConflictingDependencyName => DiagnosticCategory::Injection,
            DiagnosticId::UnsupportedComparisonType => DiagnosticCategory::Comparer,
            DiagnosticId::CachePopulationFailed => DiagnosticCategory::Pipeline,
        }
    }

    /// Message template; `{0}`, `{1}`, ... are replaced by the diagnostic's arguments.
    pub fn template(self) -> &'static str {
        match self {
            DiagnosticId::MissingImplementationType => {
                "Assembly-level registration of '{0}' must specify an implementation type"
            }
            DiagnosticId::RedundantImplementationType => {
                "Registration on class '{0}' must not specify an implementation type; the class itself is the implementation"
            }
            DiagnosticId::InvalidLifetime => "'{0}' is not a valid service lifetime",
            DiagnosticId::InvalidImplementationType => {
                "Type '{0}' cannot be registered as an implementation because it is {1}"
            }
            DiagnosticId::TypeNotPartial => {
                "Type '{0}' must be declared partial (along with its containing types) to receive generated members"
            }
            DiagnosticId::InjectOnStaticMember => "Static member '{0}' cannot be injected",
            DiagnosticId::ConflictingInjectMarkers => {
                "Member '{0}' carries the injection marker more than once"
            }
            DiagnosticId::MultipleInitializers => {
                "Type '{0}' declares more than one initializer method; '{1}' is ignored"
            }
            DiagnosticId::StaticInitializer => "Initializer method '{0}' must not be static",
            DiagnosticId::ParameterizedInitializer => {
                "Initializer method '{0}' must not take parameters"
            }
            DiagnosticId::InitializerWithoutInjectables => {
                "Initializer method '{0}' is declared on '{1}' which has no injected members"
            }
            DiagnosticId::ConflictingDependencyName => {
                "Type '{0}' requires two dependencies named '{1}' with different types ('{2}' and '{3}')"
            }
            DiagnosticId::UnsupportedComparisonType => {
                "Property '{0}' of '{1}' has type '{2}' with no structural comparison strategy; default equality is used"
            }
            DiagnosticId::CachePopulationFailed => "Could not build '{0}': {1}",
        }
    }
}

impl fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub args: Vec<String>,
    pub location: Location,
}

impl Diagnostic {
    pub fn new(id: DiagnosticId, location: Location) -> Self {
        Self {
            id,
            severity: id.severity(),
            args: Vec::new(),
            location,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the template with this diagnostic's arguments.
    pub fn message(&self) -> String {
        let mut message = self.id.template().to_string();
        for (index, value) in self.args.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", index), value);
        }
        message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}: {}",
            self.location,
            self.severity,
            self.id.code(),
            self.message()
        )
    }
}

/// Ordered collection of diagnostics gathered during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(other);
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn by_id(&self, id: DiagnosticId) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.id == id)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Stable order for reporting: by location, then id.
    pub fn sorted(mut self) -> Self {
        self.entries
            .sort_by(|a, b| (&a.location, a.id).cmp(&(&b.location, b.id)));
        self
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Summary grouped by category, for logs.
    pub fn format_summary(&self) -> String {
        if self.entries.is_empty() {
            return "No diagnostics".to_string();
        }

        let mut by_category: BTreeMap<DiagnosticCategory, Vec<&Diagnostic>> = BTreeMap::new();
        for entry in &self.entries {
            by_category.entry(entry.id.category()).or_default().push(entry);
        }

        let mut lines = vec![format!("Found {} diagnostic(s):", self.entries.len())];
        for (category, entries) in by_category {
            lines.push(format!("## {} ({}):", category, entries.len()));
            for entry in entries.iter().take(10) {
                lines.push(format!("  - {}", entry));
            }
            if entries.len() > 10 {
                lines.push(format!("  ... and {} more", entries.len() - 10));
            }
        }
        lines.join("\n")
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
