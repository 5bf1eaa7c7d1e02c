//! Core traits and types for the callback system
//!
//! - `Progress` - loop counters and last losses
//! - `CallbackContext` - what a callback may read or modify
//! - `CallbackAction` - actions a callback can request
//! - `Callback` - the trait all callbacks implement

use crate::data::Batch;
use crate::nn::Model;
use crate::optim::OptimWrapper;
use crate::train::loss::LossOutput;
use crate::train::Recorder;
use ndarray::Array2;

/// Loop state visible to callbacks
#[derive(Clone, Debug, Default)]
pub struct Progress {
    /// Epochs requested for this fit
    pub n_epochs: usize,
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Training iterations completed in this fit
    pub iteration: usize,
    /// Batch index within the current epoch
    pub num_batch: usize,
    /// Training batches per epoch
    pub batches_per_epoch: usize,
    /// Number of classes of the data
    pub n_classes: usize,
    /// Whether the current batch is a training batch
    pub train: bool,
    pub last_loss: f32,
    /// Bias-corrected exponential moving average of the training loss
    pub smooth_loss: f32,
    /// Validation loss followed by metrics, once validation ran this epoch
    pub last_metrics: Option<Vec<f32>>,
}

/// Mutable view of the learner handed to callbacks
pub struct CallbackContext<'a> {
    pub model: &'a mut dyn Model,
    pub opt: &'a mut OptimWrapper,
    pub recorder: &'a Recorder,
    pub progress: &'a Progress,
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Skip the optimizer step for this batch
    SkipStep,
    /// Skip rest of current epoch
    SkipEpoch,
    /// Stop training
    Stop,
}

impl CallbackAction {
    fn rank(self) -> u8 {
        match self {
            CallbackAction::Continue => 0,
            CallbackAction::SkipStep => 1,
            CallbackAction::SkipEpoch => 2,
            CallbackAction::Stop => 3,
        }
    }

    /// Combine two requests, keeping the stronger one
    pub fn merge(self, other: CallbackAction) -> CallbackAction {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// Trait for training callbacks
///
/// All methods have default no-op implementations, so you only need to
/// implement the events you care about.
pub trait Callback: Send {
    /// Called before training starts
    fn on_train_begin(&mut self, _ctx: &mut CallbackContext<'_>) {}

    /// Called at the start of each epoch, after the model is put in training mode
    fn on_epoch_begin(&mut self, _ctx: &mut CallbackContext<'_>) {}

    /// Called with each training batch before the forward pass
    fn on_batch_begin(&mut self, _ctx: &mut CallbackContext<'_>, _batch: &mut Batch) {}

    /// Called with the model output before the loss is computed
    fn on_loss_begin(&mut self, _ctx: &mut CallbackContext<'_>, _output: &mut Array2<f32>) {}

    /// Called with the loss and its output gradient before backpropagation
    fn on_backward_begin(&mut self, _ctx: &mut CallbackContext<'_>, _loss: &mut LossOutput) {}

    /// Called after gradients are computed; `SkipStep` skips the optimizer step
    fn on_backward_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after the optimizer step (or its skip)
    fn on_step_end(&mut self, _ctx: &mut CallbackContext<'_>) {}

    /// Called after each training batch
    fn on_batch_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch and its validation
    fn on_epoch_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after training ends, including early stops
    fn on_train_end(&mut self, _ctx: &mut CallbackContext<'_>) {}

    /// Whether validation should be skipped while this callback is active
    fn skip_validate(&self) -> bool {
        false
    }

    /// Get callback name for logging and removal
    fn name(&self) -> &'static str {
        "Callback"
    }
}

/// Deferred callback constructor, instantiated at the start of every fit
pub type CallbackFn = Box<dyn Fn() -> Box<dyn Callback> + Send>;
