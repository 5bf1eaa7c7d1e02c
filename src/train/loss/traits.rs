//! Loss function trait

use crate::data::{Batch, Targets};
use crate::{Error, Result};
use ndarray::{Array1, Array2};

/// A reduced loss and its gradient with respect to the model output
#[derive(Debug, Clone)]
pub struct LossOutput {
    pub value: f32,
    pub grad: Array2<f32>,
}

/// Trait for loss functions
pub trait LossFn: Send {
    /// Per-sample losses and the gradient of their *sum* w.r.t. `output`
    fn per_sample(&self, output: &Array2<f32>, targets: &Targets) -> Result<(Array1<f32>, Array2<f32>)>;

    /// Mean loss over a batch
    fn forward(&self, output: &Array2<f32>, batch: &Batch) -> Result<LossOutput> {
        let (losses, grad) = self.per_sample(output, &batch.targets)?;
        mean_reduce(losses, grad)
    }

    /// Maps raw model output to predictions (e.g. probabilities)
    fn activation(&self, output: &Array2<f32>) -> Array2<f32> {
        output.clone()
    }

    /// Name of the loss function
    fn name(&self) -> &'static str;
}

/// Average per-sample losses and their summed gradient
pub(crate) fn mean_reduce(losses: Array1<f32>, grad: Array2<f32>) -> Result<LossOutput> {
    let n = losses.len();
    if n == 0 {
        return Err(Error::EmptyData("cannot reduce the loss of an empty batch".to_string()));
    }
    Ok(LossOutput { value: losses.sum() / n as f32, grad: grad / n as f32 })
}
