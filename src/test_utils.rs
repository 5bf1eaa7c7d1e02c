//! Shared fixtures for unit tests

use crate::data::{blobs, BlobsConfig, DataBunch};
use crate::nn::Sequential;
use crate::optim::OptimWrapper;
use crate::train::callback::{CallbackContext, Progress};
use crate::train::{Learner, Recorder};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Owned parts behind a `CallbackContext`
pub struct ContextFixture {
    pub model: Sequential,
    pub opt: OptimWrapper,
    pub recorder: Recorder,
    pub progress: Progress,
}

impl ContextFixture {
    pub fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(0);
        let model = Sequential::mlp(&[2, 4, 3], true, &mut rng).expect("valid sizes");
        Self {
            model,
            opt: OptimWrapper::sgd(1),
            recorder: Recorder::default(),
            progress: Progress { train: true, n_classes: 3, ..Progress::default() },
        }
    }

    pub fn ctx(&mut self) -> CallbackContext<'_> {
        CallbackContext {
            model: &mut self.model,
            opt: &mut self.opt,
            recorder: &self.recorder,
            progress: &self.progress,
        }
    }
}

/// Three well separated blobs, 48 train / 12 valid samples, batch size 16
pub fn toy_data(seed: u64) -> DataBunch {
    let cfg = BlobsConfig { n_classes: 3, n_per_class: 20, n_features: 2, radius: 4.0, noise: 0.5 };
    let (x, y) = blobs(&cfg, seed).expect("valid blobs");
    DataBunch::from_arrays(x, y, 3, 0.2, 16, seed).expect("valid split")
}

/// `2 -> 8 -> 3` MLP with batch norm; two layer groups when `grouped`
pub fn toy_learner(seed: u64, grouped: bool) -> Learner {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = Sequential::mlp(&[2, 8, 3], true, &mut rng).expect("valid sizes");
    if grouped {
        model = model.with_layer_groups(&[3]).expect("valid groups");
    }
    Learner::new(toy_data(seed), Box::new(model))
}
