//! Model and layer traits

use super::Param;
use crate::data::Batch;
use crate::precision::Precision;
use crate::{Error, Result};
use ndarray::Array2;

/// A single differentiable layer
///
/// `forward` caches whatever `backward` needs; `backward` accumulates
/// parameter gradients and returns the gradient with respect to the input.
pub trait Layer: Send {
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32>;

    fn backward(&mut self, grad_out: &Array2<f32>) -> Array2<f32>;

    fn params(&self) -> Vec<&Param> {
        Vec::new()
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        Vec::new()
    }

    /// Non-trainable state such as running statistics
    fn buffers(&self) -> Vec<Array2<f32>> {
        Vec::new()
    }

    fn load_buffers(&mut self, _buffers: &[Array2<f32>]) -> Result<()> {
        Ok(())
    }

    fn set_training(&mut self, _training: bool) {}

    /// Whether this is a normalisation layer
    fn is_norm(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

/// A trainable model
pub trait Model: Send {
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32>;

    /// Forward a batch, honouring a stacked mixup plan
    ///
    /// When the batch carries a plan with `stack_x`, the inputs arrive
    /// unmixed and are blended here.
    fn forward_batch(&mut self, batch: &Batch) -> Array2<f32> {
        match &batch.mix {
            Some(plan) if plan.stack_x => {
                let mixed = plan.blend(&batch.inputs);
                self.forward(&mixed)
            }
            _ => self.forward(&batch.inputs),
        }
    }

    /// Backpropagate `grad_out` (gradient of the loss w.r.t. the output)
    fn backward(&mut self, grad_out: &Array2<f32>);

    fn params(&self) -> Vec<&Param>;

    fn params_mut(&mut self) -> Vec<&mut Param>;

    fn set_training(&mut self, training: bool);

    /// Put normalisation layers whose parameters are all frozen in eval mode
    fn set_bn_eval(&mut self) {}

    fn layer_groups(&self) -> usize {
        1
    }

    fn precision(&self) -> Precision {
        Precision::Fp32
    }

    /// Switch compute precision; non-norm parameters are rounded on the way
    fn set_precision(&mut self, _precision: Precision) {}

    /// Parameters followed by buffers, in a stable order
    fn state_dict(&self) -> Vec<Array2<f32>> {
        self.params().iter().map(|p| p.data.clone()).collect()
    }

    fn load_state_dict(&mut self, state: &[Array2<f32>]) -> Result<()> {
        let mut params = self.params_mut();
        if state.len() != params.len() {
            return Err(Error::ShapeMismatch {
                context: "state dict",
                expected: params.len(),
                actual: state.len(),
            });
        }
        for (p, s) in params.iter_mut().zip(state) {
            p.data.assign(s);
        }
        Ok(())
    }

    fn zero_grad(&mut self) {
        for p in self.params_mut() {
            p.zero_grad();
        }
    }
}
