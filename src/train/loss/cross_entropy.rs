//! Cross Entropy Loss for classification

use super::LossFn;
use crate::data::Targets;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// Row-wise softmax: `exp(x_i) / sum(exp(x_j))`
pub fn softmax(x: &Array2<f32>) -> Array2<f32> {
    let mut out = x.clone();
    for mut row in out.rows_mut() {
        let max = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
    out
}

/// Cross Entropy Loss over logits
///
/// `L_i = -sum_j t_ij * log(softmax(x_i)_j)` where class targets are one-hot.
/// The gradient w.r.t. the logits is `p_i * sum_j t_ij - t_i`, which reduces
/// to `p - t` for distributions.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropyLoss;

impl LossFn for CrossEntropyLoss {
    fn per_sample(&self, output: &Array2<f32>, targets: &Targets) -> Result<(Array1<f32>, Array2<f32>)> {
        if output.nrows() != targets.len() {
            return Err(Error::ShapeMismatch {
                context: "loss targets",
                expected: output.nrows(),
                actual: targets.len(),
            });
        }
        let n_classes = output.ncols();
        let dense = targets.to_dense(n_classes)?;
        if dense.ncols() != n_classes {
            return Err(Error::ShapeMismatch {
                context: "target classes",
                expected: n_classes,
                actual: dense.ncols(),
            });
        }

        let probs = softmax(output);
        let log_probs = probs.mapv(|p| p.max(1e-10).ln());
        let losses = -(&dense * &log_probs).sum_axis(Axis(1));
        let mass = dense.sum_axis(Axis(1)).insert_axis(Axis(1));
        let grad = &probs * &mass - &dense;
        Ok((losses, grad))
    }

    fn activation(&self, output: &Array2<f32>) -> Array2<f32> {
        softmax(output)
    }

    fn name(&self) -> &'static str {
        "CrossEntropy"
    }
}
