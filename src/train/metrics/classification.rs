//! Classification metrics

use super::Metric;
use crate::data::argmax;
use crate::data::Targets;
use ndarray::Array2;

fn hit_rate(output: &Array2<f32>, targets: &Targets) -> f32 {
    let n = output.nrows().min(targets.len());
    if n == 0 {
        return 0.0;
    }
    let truth = targets.argmax();
    let hits = output
        .rows()
        .into_iter()
        .zip(&truth)
        .filter(|(row, t)| argmax(row.iter().copied()) == **t)
        .count();
    hits as f32 / n as f32
}

/// Fraction of samples whose argmax prediction matches the target
///
/// Soft targets are compared through their argmax.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accuracy;

impl Metric for Accuracy {
    fn compute(&self, output: &Array2<f32>, targets: &Targets) -> f32 {
        hit_rate(output, targets)
    }

    fn name(&self) -> &str {
        "accuracy"
    }
}

/// `1 - accuracy`
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorRate;

impl Metric for ErrorRate {
    fn compute(&self, output: &Array2<f32>, targets: &Targets) -> f32 {
        1.0 - hit_rate(output, targets)
    }

    fn name(&self) -> &str {
        "error_rate"
    }

    fn higher_is_better(&self) -> bool {
        false
    }
}
