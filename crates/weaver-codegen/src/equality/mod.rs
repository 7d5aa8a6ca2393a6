//! Structural equality synthesis
//!
//! Shapes marked for value comparison are grouped into trees
//! ([`tree`]), every property type is classified once ([`classify`]) through
//! an explicit strategy registry ([`registry`]), and a comparer plan is built
//! per shape ([`synth`]). Plans are rendered to text by
//! [`crate::emit::comparers`] and can be run directly with [`value`].

pub mod classify;
pub mod registry;
pub mod synth;
pub mod tree;
pub mod value;

pub use classify::{Classified, TypeClass};
pub use registry::{ComparerRegistry, Strategy};
pub use synth::{synthesize, ComparerPlan, ComparerSet, Synthesis, Synthesizer};
pub use tree::{ShapeCatalog, TypeShapeTree};
pub use value::{Evaluator, ObjectValue, Value};
