//! Incremental pass driver
//!
//! A pass extracts facts from a model snapshot, resolves them and renders one
//! file per generator. The driver remembers each generator's facts and output
//! from the last completed pass; a generator whose facts compare equal is not
//! run again. A cancelled or failed pass leaves that memory untouched.

use crate::emit::comparers::emit_comparers;
use crate::emit::constructors::emit_constructors;
use crate::emit::registrations::emit_registrations;
use crate::emit::GeneratedSource;
use crate::equality::{synthesize, ComparerRegistry, ShapeCatalog};
use crate::error::CodegenError;
use crate::inject::resolve;
use crate::registration::group_registrations;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, instrument};
use weaver_core::extract::Extraction;
use weaver_core::facts::{Fact, InjectionTargetFact, RegistrationFact, ShapeFact};
use weaver_core::fingerprint::{fingerprint_facts, ContentFingerprint};
use weaver_core::{CancellationToken, Diagnostics, Extractor, GeneratorConfig, ProgramModel};

/// The generators run by every pass, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeneratorKind {
    Registrations,
    Constructors,
    Comparers,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 3] = [
        GeneratorKind::Registrations,
        GeneratorKind::Constructors,
        GeneratorKind::Comparers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::Registrations => "registrations",
            GeneratorKind::Constructors => "constructors",
            GeneratorKind::Comparers => "comparers",
        }
    }

    pub fn file_name(self, config: &GeneratorConfig) -> &str {
        match self {
            GeneratorKind::Registrations => &config.output.registration_file,
            GeneratorKind::Constructors => &config.output.constructor_file,
            GeneratorKind::Comparers => &config.output.comparer_file,
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one generator produced in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOutput {
    pub kind: GeneratorKind,
    /// `None` when the generator had nothing to emit.
    pub source: Option<GeneratedSource>,
    /// Extraction and resolution diagnostics of this generator.
    pub diagnostics: Diagnostics,
    /// Fingerprint of the facts and settings the output was built from.
    pub fingerprint: ContentFingerprint,
    /// Whether the output was carried over from the previous pass.
    pub reused: bool,
}

/// Everything a completed pass publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutput {
    pub generators: Vec<GeneratorOutput>,
}

impl PassOutput {
    pub fn sources(&self) -> impl Iterator<Item = &GeneratedSource> {
        self.generators.iter().filter_map(|g| g.source.as_ref())
    }

    /// All diagnostics of the pass, in generator order.
    pub fn diagnostics(&self) -> Diagnostics {
        self.generators
            .iter()
            .flat_map(|g| g.diagnostics.iter().cloned())
            .collect()
    }

    pub fn get(&self, kind: GeneratorKind) -> Option<&GeneratorOutput> {
        self.generators.iter().find(|g| g.kind == kind)
    }

    pub fn reused(&self) -> impl Iterator<Item = GeneratorKind> + '_ {
        self.generators.iter().filter(|g| g.reused).map(|g| g.kind)
    }
}

/// Facts a generator's last output was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PreviousInput {
    Registrations(Extraction<RegistrationFact>),
    Constructors(Extraction<InjectionTargetFact>),
    Comparers(Extraction<ShapeFact>),
}

#[derive(Debug, Clone)]
struct Remembered {
    root_namespace: String,
    input: PreviousInput,
    output: GeneratorOutput,
}

/// Runs passes and carries incremental state between them.
pub struct GeneratorDriver {
    config: GeneratorConfig,
    registry: ComparerRegistry,
    previous: BTreeMap<GeneratorKind, Remembered>,
}

impl GeneratorDriver {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_registry(config, ComparerRegistry::with_defaults())
    }

    pub fn with_registry(config: GeneratorConfig, registry: ComparerRegistry) -> Self {
        Self {
            config,
            registry,
            previous: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Forget the previous pass; the next pass runs every generator.
    pub fn reset(&mut self) {
        self.previous.clear();
    }

    /// Run one pass over a model snapshot.
    #[instrument(skip_all, fields(assembly = %model.assembly_name))]
    pub fn run_pass(
        &mut self,
        model: &ProgramModel,
        cancel: &CancellationToken,
    ) -> Result<PassOutput, CodegenError> {
        let root_namespace = self.config.root_namespace(model);
        let extractor =
            Extractor::new(model, &self.config.markers).with_cancellation(cancel.clone());
        let facts = extractor.extract_all()?;

        let mut next = BTreeMap::new();
        let mut generators = Vec::with_capacity(GeneratorKind::ALL.len());
        let inputs = [
            PreviousInput::Registrations(facts.registrations),
            PreviousInput::Constructors(facts.injections),
            PreviousInput::Comparers(facts.shapes),
        ];

        for input in inputs {
            cancel.check()?;
            let kind = input.kind();
            let output = match self.previous.get(&kind) {
                Some(previous)
                    if previous.input == input && previous.root_namespace == root_namespace =>
                {
                    debug!(generator = %kind, "facts unchanged, reusing output");
                    GeneratorOutput {
                        reused: true,
                        ..previous.output.clone()
                    }
                }
                _ => self.generate(&input, &root_namespace, cancel)?,
            };
            next.insert(
                kind,
                Remembered {
                    root_namespace: root_namespace.clone(),
                    input,
                    output: GeneratorOutput {
                        reused: false,
                        ..output.clone()
                    },
                },
            );
            generators.push(output);
        }

        self.previous = next;
        let output = PassOutput { generators };
        info!(
            sources = output.sources().count(),
            reused = output.reused().count(),
            diagnostics = output.diagnostics().len(),
            "pass complete"
        );
        Ok(output)
    }

    fn generate(
        &self,
        input: &PreviousInput,
        root_namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<GeneratorOutput, CodegenError> {
        let kind = input.kind();
        let indent = self.config.output.indent_size;
        let mut diagnostics = Diagnostics::new();

        let (text, fingerprint) = match input {
            PreviousInput::Registrations(extraction) => {
                diagnostics.merge(extraction.diagnostics.clone());
                let groups = group_registrations(
                    &extraction.facts,
                    &self.config.output.default_group_method,
                );
                let text = if groups.is_empty() {
                    None
                } else {
                    Some(emit_registrations(&groups, root_namespace, &self.config.output)?)
                };
                (text, self.fingerprint(kind, &extraction.facts, root_namespace)?)
            }
            PreviousInput::Constructors(extraction) => {
                diagnostics.merge(extraction.diagnostics.clone());
                let mut records = Vec::with_capacity(extraction.facts.len());
                for fact in &extraction.facts {
                    cancel.check()?;
                    let record = resolve(fact);
                    diagnostics.merge(record.diagnostics.clone());
                    records.push(record);
                }
                let text = if records.iter().any(|r| r.constructor.is_some()) {
                    Some(emit_constructors(&records, root_namespace, indent, cancel)?)
                } else {
                    None
                };
                (text, self.fingerprint(kind, &extraction.facts, root_namespace)?)
            }
            PreviousInput::Comparers(extraction) => {
                diagnostics.merge(extraction.diagnostics.clone());
                let catalog = ShapeCatalog::new(&extraction.facts);
                let synthesis = synthesize(&catalog, &self.registry, cancel)?;
                diagnostics.merge(synthesis.diagnostics);
                let text = if synthesis.comparers.is_empty() {
                    None
                } else {
                    Some(emit_comparers(&synthesis.comparers, root_namespace, indent, cancel)?)
                };
                (text, self.fingerprint(kind, &extraction.facts, root_namespace)?)
            }
        };

        debug!(
            generator = %kind,
            emitted = text.is_some(),
            diagnostics = diagnostics.len(),
            "generator ran"
        );
        Ok(GeneratorOutput {
            kind,
            source: text.map(|text| GeneratedSource::new(kind.file_name(&self.config), text)),
            diagnostics,
            fingerprint,
            reused: false,
        })
    }

    fn fingerprint<F: Fact>(
        &self,
        kind: GeneratorKind,
        facts: &[F],
        root_namespace: &str,
    ) -> Result<ContentFingerprint, CodegenError> {
        let indent = self.config.output.indent_size.to_string();
        let mut metadata = vec![
            ("generator", kind.name()),
            ("root_namespace", root_namespace),
            ("file_name", kind.file_name(&self.config)),
            ("indent_size", indent.as_str()),
        ];
        if kind == GeneratorKind::Registrations {
            metadata.push(("registration_class", self.config.output.registration_class.as_str()));
            metadata.push((
                "default_group_method",
                self.config.output.default_group_method.as_str(),
            ));
        }
        Ok(fingerprint_facts(facts, &metadata)?)
    }
}

impl PreviousInput {
    fn kind(&self) -> GeneratorKind {
        match self {
            PreviousInput::Registrations(_) => GeneratorKind::Registrations,
            PreviousInput::Constructors(_) => GeneratorKind::Constructors,
            PreviousInput::Comparers(_) => GeneratorKind::Comparers,
        }
    }
}
