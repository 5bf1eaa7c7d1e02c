//! Callback manager for dispatching events to multiple callbacks

use super::traits::{Callback, CallbackAction, CallbackContext};
use crate::data::Batch;
use crate::train::loss::LossOutput;
use ndarray::Array2;

/// Manages multiple callbacks and dispatches events
///
/// Every callback sees every event in registration order; actions are
/// merged so the strongest request wins.
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn Callback>>,
}

impl CallbackManager {
    pub fn new(callbacks: Vec<Box<dyn Callback>>) -> Self {
        Self { callbacks }
    }

    /// Add a callback
    pub fn add<C: Callback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Check if no callbacks are registered
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Get number of callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    /// Give the first `n` callbacks back, dropping the rest
    pub fn into_first(mut self, n: usize) -> Vec<Box<dyn Callback>> {
        self.callbacks.truncate(n);
        self.callbacks
    }

    pub fn skip_validate(&self) -> bool {
        self.callbacks.iter().any(|cb| cb.skip_validate())
    }

    fn fold<F>(&mut self, mut f: F) -> CallbackAction
    where
        F: FnMut(&mut Box<dyn Callback>) -> CallbackAction,
    {
        self.callbacks.iter_mut().fold(CallbackAction::Continue, |acc, cb| acc.merge(f(cb)))
    }

    pub fn on_train_begin(&mut self, ctx: &mut CallbackContext<'_>) {
        for cb in &mut self.callbacks {
            cb.on_train_begin(ctx);
        }
    }

    pub fn on_epoch_begin(&mut self, ctx: &mut CallbackContext<'_>) {
        for cb in &mut self.callbacks {
            cb.on_epoch_begin(ctx);
        }
    }

    pub fn on_batch_begin(&mut self, ctx: &mut CallbackContext<'_>, batch: &mut Batch) {
        for cb in &mut self.callbacks {
            cb.on_batch_begin(ctx, batch);
        }
    }

    pub fn on_loss_begin(&mut self, ctx: &mut CallbackContext<'_>, output: &mut Array2<f32>) {
        for cb in &mut self.callbacks {
            cb.on_loss_begin(ctx, output);
        }
    }

    pub fn on_backward_begin(&mut self, ctx: &mut CallbackContext<'_>, loss: &mut LossOutput) {
        for cb in &mut self.callbacks {
            cb.on_backward_begin(ctx, loss);
        }
    }

    pub fn on_backward_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        self.fold(|cb| cb.on_backward_end(ctx))
    }

    pub fn on_step_end(&mut self, ctx: &mut CallbackContext<'_>) {
        for cb in &mut self.callbacks {
            cb.on_step_end(ctx);
        }
    }

    pub fn on_batch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        self.fold(|cb| cb.on_batch_end(ctx))
    }

    pub fn on_epoch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        self.fold(|cb| cb.on_epoch_end(ctx))
    }

    pub fn on_train_end(&mut self, ctx: &mut CallbackContext<'_>) {
        for cb in &mut self.callbacks {
            cb.on_train_end(ctx);
        }
    }
}
