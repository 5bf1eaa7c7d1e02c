//! Evaluation metrics computed during validation

mod classification;
mod trait_def;

pub use classification::{Accuracy, ErrorRate};
pub use trait_def::Metric;
