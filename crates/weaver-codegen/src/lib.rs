//! Generators for service registrations, injection constructors and
//! structural equality comparers
//!
//! The entry point is [`GeneratorDriver`], which runs an incremental pass
//! over a [`ProgramModel`](weaver_core::ProgramModel) snapshot. The
//! resolution stages ([`registration`], [`inject`], [`equality`]) and the
//! renderers in [`emit`] are usable on their own.

pub mod driver;
pub mod emit;
pub mod equality;
pub mod error;
pub mod inject;
pub mod registration;
pub mod writer;

pub use driver::{GeneratorDriver, GeneratorKind, GeneratorOutput, PassOutput};
pub use emit::GeneratedSource;
pub use equality::{ComparerRegistry, ComparerSet, Evaluator, ShapeCatalog, Value};
pub use error::CodegenError;
pub use inject::{resolve, ClassDependencyRecord, ConstructorPlan, HookState};
pub use registration::{group_registrations, RegistrationGroup};
