//! One-cycle learning-rate and momentum policy

use crate::optim::{Annealer, Stepper};
use crate::train::callback::{Callback, CallbackAction, CallbackContext, CallbackFn};
use crate::train::{FitResult, Learner, LrSpec};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Shape of the one-cycle schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneCycleConfig {
    /// Momentum at the start/end and at the peak learning rate
    pub moms: (f32, f32),
    /// Starting learning rate is `lr_max / div_factor`
    pub div_factor: f32,
    /// Fraction of iterations spent warming up
    pub pct_start: f32,
    /// Final learning rate is `lr_max / final_div`; defaults to `div_factor * 1e4`
    pub final_div: Option<f32>,
}

impl Default for OneCycleConfig {
    fn default() -> Self {
        Self { moms: (0.95, 0.85), div_factor: 25.0, pct_start: 0.3, final_div: None }
    }
}

impl OneCycleConfig {
    pub fn final_div(&self) -> f32 {
        self.final_div.unwrap_or(self.div_factor * 1e4)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.pct_start) {
            return Err(Error::InvalidConfig(format!("pct_start must be in [0, 1], got {}", self.pct_start)));
        }
        if self.div_factor <= 0.0 || self.final_div() <= 0.0 {
            return Err(Error::InvalidConfig("div_factor and final_div must be positive".to_string()));
        }
        Ok(())
    }
}

/// Warm up with cosine annealing from `lr_max / div_factor` to `lr_max`,
/// then anneal to `lr_max / final_div`; momentum moves inversely
pub struct OneCycleScheduler {
    lr_max: Vec<f32>,
    config: OneCycleConfig,
    lr_scheds: Vec<Stepper>,
    mom_scheds: Vec<Stepper>,
    idx_s: usize,
}

impl OneCycleScheduler {
    /// `lr_max` holds one value per layer group, or a single broadcast value
    pub fn new(lr_max: Vec<f32>, config: OneCycleConfig) -> Self {
        Self { lr_max, config, lr_scheds: Vec::new(), mom_scheds: Vec::new(), idx_s: 0 }
    }

    fn steps(&self, n_groups: usize, a1: usize, a2: usize) -> (Vec<Stepper>, Vec<Stepper>) {
        let lr_max = if self.lr_max.len() == 1 && n_groups > 1 {
            vec![self.lr_max[0]; n_groups]
        } else {
            self.lr_max.clone()
        };
        let low: Vec<f32> = lr_max.iter().map(|lr| lr / self.config.div_factor).collect();
        let end: Vec<f32> = lr_max.iter().map(|lr| lr / self.config.final_div()).collect();
        let (m0, m1) = self.config.moms;

        let lr_scheds = vec![
            Stepper::new(low, lr_max.clone(), a1, Annealer::Cos),
            Stepper::new(lr_max, end, a2, Annealer::Cos),
        ];
        let mom_scheds = vec![
            Stepper::scalar(m0, m1, a1, Annealer::Cos),
            Stepper::scalar(m1, m0, a2, Annealer::Cos),
        ];
        (lr_scheds, mom_scheds)
    }
}

impl Callback for OneCycleScheduler {
    fn on_train_begin(&mut self, ctx: &mut CallbackContext<'_>) {
        let n = ctx.progress.batches_per_epoch * ctx.progress.n_epochs;
        let a1 = (n as f32 * self.config.pct_start) as usize;
        let a2 = n - a1;
        let (lr_scheds, mom_scheds) = self.steps(ctx.opt.n_groups(), a1, a2);
        self.lr_scheds = lr_scheds;
        self.mom_scheds = mom_scheds;
        self.idx_s = 0;

        if let Err(e) = ctx.opt.set_lrs(self.lr_scheds[0].start()) {
            tracing::warn!(error = %e, "one-cycle learning rates do not match the optimizer");
        }
        ctx.opt.set_mom(self.mom_scheds[0].start()[0]);
        debug!(iterations = n, warmup = a1, annealing = a2, "one-cycle schedule built");
    }

    fn on_batch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        if !ctx.progress.train {
            return CallbackAction::Continue;
        }
        if self.idx_s >= self.lr_scheds.len() {
            return CallbackAction::Stop;
        }
        let lrs = self.lr_scheds[self.idx_s].step();
        if ctx.opt.set_lrs(&lrs).is_err() {
            ctx.opt.set_lr(lrs.last().copied().unwrap_or_default());
        }
        let mom = self.mom_scheds[self.idx_s].step();
        ctx.opt.set_mom(mom[0]);
        if self.lr_scheds[self.idx_s].is_done() {
            self.idx_s += 1;
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "OneCycleScheduler"
    }
}

/// Deferred `OneCycleScheduler` constructor for `Learner::callback_fns`
pub fn one_cycle_scheduler(lr_max: Vec<f32>, config: OneCycleConfig) -> CallbackFn {
    Box::new(move || Box::new(OneCycleScheduler::new(lr_max.clone(), config.clone())) as Box<dyn Callback>)
}

/// Fit `learn` for `cyc_len` epochs following the one-cycle policy
pub fn fit_one_cycle(
    learn: &mut Learner,
    cyc_len: usize,
    max_lr: impl Into<LrSpec>,
    config: &OneCycleConfig,
    wd: Option<f32>,
    mut callbacks: Vec<Box<dyn Callback>>,
) -> Result<FitResult> {
    config.validate()?;
    let max_lr = learn.lr_range(max_lr)?;
    info!(cyc_len, max_lr = ?max_lr, pct_start = config.pct_start, "fit_one_cycle");
    callbacks.push(Box::new(OneCycleScheduler::new(max_lr.clone(), config.clone())));
    learn.fit(cyc_len, max_lr, wd, callbacks)
}
