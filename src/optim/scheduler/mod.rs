//! Annealing schedules
//!
//! - `Annealer` - interpolation curve between two values
//! - `Stepper` - walks an annealer over a fixed number of iterations

mod annealing;
mod stepper;


pub use annealing::Annealer;
pub use stepper::Stepper;
