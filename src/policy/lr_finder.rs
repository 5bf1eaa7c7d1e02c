//! Learning-rate range test

use crate::optim::{Annealer, Stepper};
use crate::train::callback::{Callback, CallbackAction, CallbackContext};
use crate::train::{Learner, Recorder};
use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Parameters of a learning-rate range test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrFindConfig {
    pub start_lr: f32,
    pub end_lr: f32,
    /// Number of iterations to run
    pub num_it: usize,
    /// Stop when the smoothed loss exceeds four times the best loss
    pub stop_div: bool,
    pub wd: Option<f32>,
}

impl Default for LrFindConfig {
    fn default() -> Self {
        Self { start_lr: 1e-7, end_lr: 10.0, num_it: 100, stop_div: true, wd: None }
    }
}

impl LrFindConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_it == 0 {
            return Err(Error::InvalidConfig("num_it must be at least 1".to_string()));
        }
        if self.start_lr <= 0.0 || self.end_lr <= self.start_lr {
            return Err(Error::InvalidConfig(format!(
                "lr_find needs 0 < start_lr < end_lr, got {} and {}",
                self.start_lr, self.end_lr
            )));
        }
        Ok(())
    }
}

/// Grows the learning rate exponentially each batch and records the loss
///
/// Parameters (and buffers) are restored when training ends.
pub struct LRFinder {
    sched: Stepper,
    stop_div: bool,
    best_loss: f32,
    stop: bool,
    snapshot: Option<Vec<Array2<f32>>>,
}

impl LRFinder {
    pub fn new(start_lr: Vec<f32>, end_lr: Vec<f32>, num_it: usize, stop_div: bool) -> Self {
        Self {
            sched: Stepper::new(start_lr, end_lr, num_it, Annealer::Exp),
            stop_div,
            best_loss: 0.0,
            stop: false,
            snapshot: None,
        }
    }
}

impl Callback for LRFinder {
    fn on_train_begin(&mut self, ctx: &mut CallbackContext<'_>) {
        self.snapshot = Some(ctx.model.state_dict());
        if let Err(e) = ctx.opt.set_lrs(self.sched.start()) {
            warn!(error = %e, "lr finder start rates do not match the optimizer");
        }
        self.stop = false;
        self.best_loss = 0.0;
    }

    fn on_batch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        if !ctx.progress.train {
            return CallbackAction::Continue;
        }
        let smooth = ctx.progress.smooth_loss;
        if ctx.progress.iteration == 0 || smooth < self.best_loss {
            self.best_loss = smooth;
        }
        let lrs = self.sched.step();
        if ctx.opt.set_lrs(&lrs).is_err() {
            ctx.opt.set_lr(lrs.last().copied().unwrap_or_default());
        }
        let diverged = self.stop_div && (smooth > 4.0 * self.best_loss || smooth.is_nan());
        if self.sched.is_done() || diverged {
            if diverged {
                info!(iteration = ctx.progress.iteration, smooth_loss = smooth, best_loss = self.best_loss, "loss diverged");
            }
            self.stop = true;
            return CallbackAction::Stop;
        }
        CallbackAction::Continue
    }

    fn on_epoch_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        if self.stop {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }

    fn on_train_end(&mut self, ctx: &mut CallbackContext<'_>) {
        if let Some(state) = self.snapshot.take() {
            if let Err(e) = ctx.model.load_state_dict(&state) {
                warn!(error = %e, "could not restore parameters after lr_find");
            }
        }
        ctx.opt.reset();
    }

    fn skip_validate(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "LRFinder"
    }
}

/// Learning rates and smoothed losses collected by `lr_find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrFindResult {
    pub lrs: Vec<f32>,
    pub losses: Vec<f32>,
}

impl LrFindResult {
    fn from_recorder(recorder: &Recorder) -> Self {
        Self { lrs: recorder.lrs.clone(), losses: recorder.losses.clone() }
    }

    pub fn len(&self) -> usize {
        self.lrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lrs.is_empty()
    }

    /// Learning rate at the steepest descent of the loss curve
    ///
    /// The first `skip_start` and last `skip_end` points are ignored. Returns
    /// `None` when fewer than two points remain.
    pub fn suggestion(&self, skip_start: usize, skip_end: usize) -> Option<f32> {
        let end = self.losses.len().checked_sub(skip_end)?;
        if end <= skip_start || end - skip_start < 2 {
            return None;
        }
        let losses = &self.losses[skip_start..end];
        let grads = gradient(losses);
        let best = grads
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_finite())
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)?;
        self.lrs.get(skip_start + best).copied()
    }
}

/// Central differences, one-sided at the edges
fn gradient(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect()
}

/// Explore learning rates from `start_lr` to `end_lr` over `num_it` iterations
///
/// The model and optimizer state are the same afterwards as before.
pub fn lr_find(learn: &mut Learner, config: &LrFindConfig) -> Result<LrFindResult> {
    config.validate()?;
    if learn.data.train_dl.is_empty() {
        return Err(Error::EmptyData("lr_find needs training samples".to_string()));
    }
    let start_lr = learn.lr_range(config.start_lr)?;
    let end_lr = learn.lr_range(config.end_lr)?;
    let epochs = config.num_it.div_ceil(learn.data.train_dl.len());
    info!(start_lr = config.start_lr, end_lr = config.end_lr, num_it = config.num_it, epochs, "lr_find");

    let finder = LRFinder::new(start_lr.clone(), end_lr, config.num_it, config.stop_div);
    learn.fit(epochs, start_lr, config.wd, vec![Box::new(finder)])?;
    Ok(LrFindResult::from_recorder(&learn.recorder))
}
