//! Callback-driven training policies and classification interpretation.
//!
//! `ciclo` hosts a small `Learner` (model, data, optimizer, loss, callbacks)
//! and builds the classic fast-training policies on its callback events:
//!
//! - one-cycle learning-rate and momentum schedule
//! - learning-rate range test
//! - mixed precision with fp32 master weights and loss scaling
//! - mixup
//! - gradient clipping
//! - frozen batch norm
//! - live loss graph
//!
//! plus a classification interpretation layer (confusion matrix, most
//! confused classes, top losses).
//!
//! # Example
//!
//! ```no_run
//! use ciclo::data::{blobs, BlobsConfig, DataBunch};
//! use ciclo::nn::Sequential;
//! use ciclo::policy::{OneCycleConfig, TrainingPolicies};
//! use ciclo::train::Learner;
//! use rand::SeedableRng;
//!
//! let (x, y) = blobs(&BlobsConfig::default(), 0)?;
//! let data = DataBunch::from_arrays(x, y, 3, 0.2, 16, 0)?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let model = Sequential::mlp(&[2, 16, 3], true, &mut rng)?;
//! let mut learn = Learner::new(data, Box::new(model));
//! learn.clip_grad(0.1);
//! learn.fit_one_cycle(5, 1e-2, &OneCycleConfig::default(), None, Vec::new())?;
//! # Ok::<(), ciclo::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod interpret;
pub mod nn;
pub mod optim;
pub mod policy;
pub mod precision;
pub mod train;

#[cfg(test)]
mod test_utils;

pub use error::{Error, Result};
