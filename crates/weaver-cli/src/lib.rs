//! Library interface for the weaver CLI

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use weaver_codegen::equality::{synthesize, ComparerRegistry, ShapeCatalog};
use weaver_codegen::{group_registrations, resolve, GeneratorDriver};
use weaver_core::config::CONFIG_FILE_NAME;
use weaver_core::fingerprint::GenerationState;
use weaver_core::{CancellationToken, Diagnostics, Extractor, GeneratorConfig, ProgramModel};

/// Inputs of `weaver generate`.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub model: PathBuf,
    pub out: PathBuf,
    /// Defaults to `weaver.toml` next to the model.
    pub config: Option<PathBuf>,
    /// Defaults to `.weaver-state.json` in the output directory.
    pub state: Option<PathBuf>,
}

/// What a generate run did.
#[derive(Debug, Default, Serialize)]
pub struct GenerateReport {
    pub written: Vec<PathBuf>,
    /// Files left alone because their generator's fingerprint matched.
    pub unchanged: Vec<PathBuf>,
    /// Stale files of generators that no longer emit anything.
    pub removed: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}

impl GenerateReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}

/// Load the configuration, falling back to `weaver.toml` beside the model.
pub fn load_config(config: Option<&Path>, model: &Path) -> Result<GeneratorConfig> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => model
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE_NAME),
    };
    debug!("Loading config from {}", path.display());
    GeneratorConfig::load(&path)
        .with_context(|| format!("Failed to load config: {}", path.display()))
}

pub fn load_model(path: &Path) -> Result<ProgramModel> {
    ProgramModel::load(path).with_context(|| format!("Failed to load model: {}", path.display()))
}

/// Run one pass and write its artifacts into the output directory.
pub fn run_generate(options: &GenerateOptions) -> Result<GenerateReport> {
    let config = load_config(options.config.as_deref(), &options.model)?;
    let model = load_model(&options.model)?;
    info!(
        "Generating for assembly '{}' ({} types)",
        model.assembly_name,
        model.types.len()
    );

    let mut driver = GeneratorDriver::new(config);
    let output = driver
        .run_pass(&model, &CancellationToken::new())
        .context("Generation pass failed")?;

    fs::create_dir_all(&options.out)
        .with_context(|| format!("Failed to create output directory: {}", options.out.display()))?;
    let state_path = options
        .state
        .clone()
        .unwrap_or_else(|| GenerationState::state_path(&options.out));
    let mut state = GenerationState::load(&state_path)
        .with_context(|| format!("Failed to read state file: {}", state_path.display()))?;

    let mut report = GenerateReport {
        diagnostics: output.diagnostics(),
        ..Default::default()
    };

    for generator in &output.generators {
        let path = options.out.join(generator.kind.file_name(driver.config()));
        match &generator.source {
            Some(source) => {
                if path.exists() && state.is_unchanged(generator.kind.name(), &generator.fingerprint) {
                    debug!(
                        "{} unchanged ({}), skipping",
                        path.display(),
                        generator.fingerprint.short_hash()
                    );
                    report.unchanged.push(path);
                } else {
                    fs::write(&path, &source.text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {}", path.display());
                    report.written.push(path);
                }
            }
            None => {
                if path.exists() {
                    fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                    info!("Removed stale {}", path.display());
                    report.removed.push(path);
                }
            }
        }
        state.record(generator.kind.name(), generator.fingerprint.clone());
    }

    state
        .save(&state_path)
        .with_context(|| format!("Failed to write state file: {}", state_path.display()))?;
    Ok(report)
}

/// Extract and resolve without rendering; returns every diagnostic.
pub fn run_check(model_path: &Path, config: Option<&Path>) -> Result<Diagnostics> {
    let config = load_config(config, model_path)?;
    let model = load_model(model_path)?;
    let cancel = CancellationToken::new();

    let facts = Extractor::new(&model, &config.markers)
        .with_cancellation(cancel.clone())
        .extract_all()
        .context("Extraction failed")?;

    let mut diagnostics = Diagnostics::new();
    diagnostics.merge(facts.registrations.diagnostics);
    diagnostics.merge(facts.injections.diagnostics);
    diagnostics.merge(facts.shapes.diagnostics);

    let groups = group_registrations(
        &facts.registrations.facts,
        &config.output.default_group_method,
    );
    let records: Vec<_> = facts.injections.facts.iter().map(resolve).collect();
    for record in &records {
        diagnostics.merge(record.diagnostics.clone());
    }
    let catalog = ShapeCatalog::new(&facts.shapes.facts);
    let synthesis = synthesize(&catalog, &ComparerRegistry::with_defaults(), &cancel)
        .context("Comparer synthesis failed")?;
    diagnostics.merge(synthesis.diagnostics);

    info!(
        "{} registration method(s), {} constructor(s), {} comparer(s)",
        groups.len(),
        records.iter().filter(|r| r.constructor.is_some()).count(),
        synthesis.comparers.len()
    );
    Ok(diagnostics.sorted())
}
