//! Optimizers, the hyper-parameter wrapper and annealing schedules

mod adam;
mod clip;
mod optimizer;
pub mod scheduler;
mod sgd;
mod wrapper;

pub use adam::Adam;
pub use clip::clip_grad_norm;
pub use optimizer::Optimizer;
pub use scheduler::{Annealer, Stepper};
pub use sgd::SGD;
pub use wrapper::OptimWrapper;
