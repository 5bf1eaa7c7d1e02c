//! Core Metric trait definition

use crate::data::Targets;
use ndarray::Array2;

/// Trait for evaluation metrics
///
/// Batch values are averaged over the validation set, weighted by batch size.
pub trait Metric: Send {
    /// Compute the metric for one batch of raw model outputs
    fn compute(&self, output: &Array2<f32>, targets: &Targets) -> f32;

    /// Name of the metric
    fn name(&self) -> &str;

    /// Whether higher values are better (true) or lower (false)
    fn higher_is_better(&self) -> bool {
        true
    }
}
