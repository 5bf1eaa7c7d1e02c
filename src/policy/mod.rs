//! Training policies built on the learner's callback system
//!
//! - `one_cycle` - one-cycle learning-rate and momentum schedule
//! - `lr_finder` - exponential learning-rate range test
//! - `fp16` - mixed-precision training with fp32 master weights
//! - `mixup` - mixup augmentation and its loss wrapper
//! - `clip` - gradient clipping
//! - `bn_freeze` - frozen batch norm stays in eval mode
//! - `show_graph` - live loss graph
//!
//! Every policy is also a method on [`Learner`] through [`TrainingPolicies`].
//!
//! # Example
//!
//! ```no_run
//! use ciclo::policy::{LrFindConfig, OneCycleConfig, TrainingPolicies};
//! # fn run(learn: &mut ciclo::train::Learner) -> ciclo::Result<()> {
//! let found = learn.lr_find(&LrFindConfig::default())?;
//! let lr = found.suggestion(10, 5).unwrap_or(1e-3);
//! learn.clip_grad(0.1);
//! learn.fit_one_cycle(5, lr, &OneCycleConfig::default(), None, Vec::new())?;
//! # Ok(())
//! # }
//! ```

mod bn_freeze;
mod clip;
mod fp16;
mod lr_finder;
mod mixup;
mod one_cycle;
mod show_graph;

pub use bn_freeze::BnFreeze;
pub use clip::{clip_grad, GradientClipping};
pub use fp16::{to_fp16, to_fp32, FlatGroup, MasterWeights, MixedPrecision, MixedPrecisionConfig};
pub use lr_finder::{lr_find, LRFinder, LrFindConfig, LrFindResult};
pub use mixup::{mixup, MixUpCallback, MixUpLoss, MixupConfig};
pub use one_cycle::{fit_one_cycle, one_cycle_scheduler, OneCycleConfig, OneCycleScheduler};
pub use show_graph::{sparkline, GraphSink, GraphUpdate, ShowGraph, SparklineSink, SPARK_CHARS};

use crate::train::{Callback, FitResult, Learner, LrSpec};
use crate::Result;

/// Policy functions as `Learner` methods
pub trait TrainingPolicies {
    fn fit_one_cycle(
        &mut self,
        cyc_len: usize,
        max_lr: impl Into<LrSpec>,
        config: &OneCycleConfig,
        wd: Option<f32>,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<FitResult>;

    fn lr_find(&mut self, config: &LrFindConfig) -> Result<LrFindResult>;

    fn to_fp16(&mut self, config: &MixedPrecisionConfig) -> &mut Self;

    fn to_fp32(&mut self) -> &mut Self;

    fn mixup(&mut self, config: &MixupConfig) -> Result<&mut Self>;

    fn clip_grad(&mut self, clip: f32) -> &mut Self;
}

impl TrainingPolicies for Learner {
    fn fit_one_cycle(
        &mut self,
        cyc_len: usize,
        max_lr: impl Into<LrSpec>,
        config: &OneCycleConfig,
        wd: Option<f32>,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<FitResult> {
        fit_one_cycle(self, cyc_len, max_lr, config, wd, callbacks)
    }

    fn lr_find(&mut self, config: &LrFindConfig) -> Result<LrFindResult> {
        lr_find(self, config)
    }

    fn to_fp16(&mut self, config: &MixedPrecisionConfig) -> &mut Self {
        to_fp16(self, config)
    }

    fn to_fp32(&mut self) -> &mut Self {
        to_fp32(self)
    }

    fn mixup(&mut self, config: &MixupConfig) -> Result<&mut Self> {
        mixup(self, config)
    }

    fn clip_grad(&mut self, clip: f32) -> &mut Self {
        clip_grad(self, clip)
    }
}
