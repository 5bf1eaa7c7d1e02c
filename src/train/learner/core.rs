//! Core Learner struct and basic methods

use crate::data::DataBunch;
use crate::nn::Model;
use crate::optim::{OptimWrapper, Optimizer};
use crate::train::callback::{Callback, CallbackFn};
use crate::train::loss::{CrossEntropyLoss, LossFn};
use crate::train::metrics::Metric;
use crate::train::Recorder;
use tracing::debug;

/// Default weight decay applied by `fit` when none is given
pub const DEFAULT_WD: f32 = 1e-2;

/// Trainer object that policies attach to
///
/// # Example
///
/// ```no_run
/// use ciclo::data::{blobs, BlobsConfig, DataBunch};
/// use ciclo::nn::Sequential;
/// use ciclo::train::Learner;
/// use rand::SeedableRng;
///
/// let (x, y) = blobs(&BlobsConfig::default(), 0).unwrap();
/// let data = DataBunch::from_arrays(x, y, 3, 0.2, 16, 0).unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let model = Sequential::mlp(&[2, 16, 3], true, &mut rng).unwrap();
/// let mut learn = Learner::new(data, Box::new(model));
/// let result = learn.fit(2, 1e-2, None, Vec::new()).unwrap();
/// println!("final loss {:.4}", result.final_loss);
/// ```
pub struct Learner {
    pub data: DataBunch,
    pub model: Box<dyn Model>,
    pub opt: OptimWrapper,
    pub loss_func: Box<dyn LossFn>,
    pub metrics: Vec<Box<dyn Metric>>,
    /// Weight decay used when `fit` gets none
    pub wd: f32,
    /// Keep normalisation layers trainable when freezing
    pub train_bn: bool,
    /// Callbacks active in every fit, in order
    pub callbacks: Vec<Box<dyn Callback>>,
    /// Constructors run at the start of every fit
    pub callback_fns: Vec<CallbackFn>,
    pub recorder: Recorder,
}

impl Learner {
    /// Learner with Adam, cross-entropy and no metrics
    pub fn new(data: DataBunch, model: Box<dyn Model>) -> Self {
        let opt = OptimWrapper::adam(model.layer_groups());
        Self {
            data,
            model,
            opt,
            loss_func: Box::new(CrossEntropyLoss),
            metrics: Vec::new(),
            wd: DEFAULT_WD,
            train_bn: true,
            callbacks: Vec::new(),
            callback_fns: Vec::new(),
            recorder: Recorder::default(),
        }
    }

    pub fn with_optimizer(mut self, opt: Box<dyn Optimizer>) -> Self {
        self.opt = OptimWrapper::new(opt, self.model.layer_groups());
        self
    }

    pub fn with_loss(mut self, loss_func: Box<dyn LossFn>) -> Self {
        self.loss_func = loss_func;
        self
    }

    pub fn with_metrics(mut self, metrics: Vec<Box<dyn Metric>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Decoupled weight decay when set, L2 on the gradients otherwise
    pub fn with_true_wd(mut self, true_wd: bool) -> Self {
        self.opt = self.opt.with_true_wd(true_wd);
        self
    }

    pub fn with_wd(mut self, wd: f32) -> Self {
        self.wd = wd;
        self
    }

    pub fn with_train_bn(mut self, train_bn: bool) -> Self {
        self.train_bn = train_bn;
        self
    }

    pub fn n_groups(&self) -> usize {
        self.model.layer_groups()
    }

    /// Replace the loss function with a wrapper around the current one
    pub fn map_loss_func<F>(&mut self, f: F)
    where
        F: FnOnce(Box<dyn LossFn>) -> Box<dyn LossFn>,
    {
        let inner = std::mem::replace(&mut self.loss_func, Box::new(CrossEntropyLoss));
        self.loss_func = f(inner);
    }

    pub fn add_callback(&mut self, callback: Box<dyn Callback>) {
        self.callbacks.push(callback);
    }

    /// Remove every persistent callback called `name`; returns how many went
    pub fn remove_callbacks(&mut self, name: &str) -> usize {
        let before = self.callbacks.len();
        self.callbacks.retain(|cb| cb.name() != name);
        before - self.callbacks.len()
    }

    pub fn has_callback(&self, name: &str) -> bool {
        self.callbacks.iter().any(|cb| cb.name() == name)
    }

    /// Freeze layer groups `0..n` and unfreeze the rest
    ///
    /// Normalisation parameters stay trainable when `train_bn` is set.
    pub fn freeze_to(&mut self, n: usize) {
        let train_bn = self.train_bn;
        for p in self.model.params_mut() {
            p.requires_grad = p.group >= n || (train_bn && p.is_norm());
        }
        debug!(frozen_groups = n, train_bn, "freeze_to");
    }

    /// Freeze everything but the last layer group
    pub fn freeze(&mut self) {
        let n = self.n_groups().saturating_sub(1);
        self.freeze_to(n);
    }

    pub fn unfreeze(&mut self) {
        self.freeze_to(0);
    }
}
