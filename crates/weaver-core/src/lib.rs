//! Program model, extracted facts and pass infrastructure for weaver

pub mod cache;
pub mod cancel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod facts;
pub mod fingerprint;
pub mod model;
pub mod naming;

pub use cache::{CacheError, CacheKey, PassCache};
pub use cancel::CancellationToken;
pub use config::GeneratorConfig;
pub use diagnostics::{Diagnostic, DiagnosticId, Diagnostics, Severity};
pub use error::CoreError;
pub use extract::{ExtractedFacts, Extraction, Extractor};
pub use model::ProgramModel;
