//! Mixup data augmentation

use crate::data::{Batch, MixPlan, Targets};
use crate::train::callback::{Callback, CallbackContext};
use crate::train::loss::{mean_reduce, LossFn, LossOutput};
use crate::train::Learner;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Mixup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixupConfig {
    /// Both parameters of the Beta distribution `λ` is drawn from
    pub alpha: f32,
    /// Let the model blend the inputs instead of the callback
    pub stack_x: bool,
    /// Let the loss blend per-sample losses instead of blending targets
    pub stack_y: bool,
    /// Seed for `λ` and the permutation; random when absent
    pub seed: Option<u64>,
}

impl Default for MixupConfig {
    fn default() -> Self {
        Self { alpha: 0.4, stack_x: false, stack_y: true, seed: None }
    }
}

impl MixupConfig {
    fn distribution(&self) -> Result<Beta<f32>> {
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(Error::InvalidConfig(format!("mixup alpha must be positive, got {}", self.alpha)));
        }
        Beta::new(self.alpha, self.alpha).map_err(|e| Error::InvalidConfig(format!("mixup alpha: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        self.distribution().map(|_| ())
    }
}

/// Blends each training batch with a shuffled copy of itself
pub struct MixUpCallback {
    beta: Beta<f32>,
    stack_x: bool,
    stack_y: bool,
    rng: StdRng,
}

impl MixUpCallback {
    pub fn new(config: &MixupConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self::with_rng(config.distribution()?, config, rng))
    }

    fn with_rng(beta: Beta<f32>, config: &MixupConfig, rng: StdRng) -> Self {
        Self { beta, stack_x: config.stack_x, stack_y: config.stack_y, rng }
    }

    fn plan(&mut self, n: usize) -> MixPlan {
        let lambda: Array1<f32> = (0..n)
            .map(|_| {
                let l = self.beta.sample(&mut self.rng);
                l.max(1.0 - l)
            })
            .collect();
        let mut shuffle: Vec<usize> = (0..n).collect();
        shuffle.shuffle(&mut self.rng);
        MixPlan { shuffle, lambda, stack_x: self.stack_x, stack_y: self.stack_y }
    }
}

impl Callback for MixUpCallback {
    fn on_batch_begin(&mut self, ctx: &mut CallbackContext<'_>, batch: &mut Batch) {
        if !ctx.progress.train {
            return;
        }
        let plan = self.plan(batch.size());
        if !self.stack_x {
            batch.inputs = plan.blend(&batch.inputs);
        }
        if !self.stack_y {
            match batch.targets.to_dense(ctx.progress.n_classes) {
                Ok(dense) => batch.targets = Targets::Dense(plan.blend(&dense)),
                Err(e) => warn!(error = %e, "targets left unmixed"),
            }
        }
        if self.stack_x || self.stack_y {
            batch.mix = Some(plan);
        }
    }

    fn name(&self) -> &'static str {
        "MixUpCallback"
    }
}

/// Loss wrapper that blends the losses of both mixed targets
pub struct MixUpLoss {
    crit: Box<dyn LossFn>,
}

impl MixUpLoss {
    pub const NAME: &'static str = "MixUpLoss";

    pub fn new(crit: Box<dyn LossFn>) -> Self {
        Self { crit }
    }

    /// The wrapped criterion
    pub fn into_inner(self) -> Box<dyn LossFn> {
        self.crit
    }
}

impl LossFn for MixUpLoss {
    fn per_sample(&self, output: &Array2<f32>, targets: &Targets) -> Result<(Array1<f32>, Array2<f32>)> {
        self.crit.per_sample(output, targets)
    }

    fn forward(&self, output: &Array2<f32>, batch: &Batch) -> Result<LossOutput> {
        let plan = match &batch.mix {
            Some(plan) if plan.stack_y => plan,
            _ => return self.crit.forward(output, batch),
        };
        let (loss1, grad1) = self.crit.per_sample(output, &batch.targets)?;
        let (loss2, grad2) = self.crit.per_sample(output, &batch.targets.select(&plan.shuffle))?;
        let losses = plan.blend_rows(&loss1, &loss2);
        let lambda = plan.lambda.view().insert_axis(Axis(1));
        let grad = &lambda * &grad1 + &(&lambda.mapv(|l| 1.0 - l) * &grad2);
        mean_reduce(losses, grad)
    }

    fn activation(&self, output: &Array2<f32>) -> Array2<f32> {
        self.crit.activation(output)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Train `learn` with mixup
///
/// With `stack_y` the loss function is wrapped in `MixUpLoss` (once). A fresh
/// `MixUpCallback` joins every later fit; seeded callbacks advance the seed
/// per fit.
pub fn mixup<'a>(learn: &'a mut Learner, config: &MixupConfig) -> Result<&'a mut Learner> {
    let beta = config.distribution()?;
    if config.stack_y && learn.loss_func.name() != MixUpLoss::NAME {
        learn.map_loss_func(|crit| Box::new(MixUpLoss::new(crit)));
    }

    let cfg = config.clone();
    let fits = AtomicU64::new(0);
    learn.callback_fns.push(Box::new(move || {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(fits.fetch_add(1, Ordering::Relaxed))),
            None => StdRng::from_os_rng(),
        };
        Box::new(MixUpCallback::with_rng(beta.clone(), &cfg, rng)) as Box<dyn Callback>
    }));
    info!(alpha = config.alpha, stack_x = config.stack_x, stack_y = config.stack_y, "mixup enabled");
    Ok(learn)
}
