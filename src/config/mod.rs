//! Declarative run configuration
//!
//! A YAML [`RunSpec`] describes the synthetic data, the reference model, the
//! optimizer, the policies to attach and the action to perform.

mod loader;
mod run;
mod schema;
mod validate;

pub use loader::load_config;
pub use run::{build_learner, execute, InterpretationReport, RunReport};
pub use schema::{
    Action, DataSpec, InterpretSpec, ModelSpec, OptimSpec, OptimizerKind, PolicySpec, RunSpec, TrainingSpec,
};
pub use validate::validate_spec;
