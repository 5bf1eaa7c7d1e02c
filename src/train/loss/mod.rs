//! Loss functions for training
//!
//! - [`LossFn`] - per-sample losses with gradients w.r.t. the model output
//! - [`CrossEntropyLoss`] - softmax cross-entropy for hard or soft targets

mod cross_entropy;
mod traits;

pub use cross_entropy::{softmax, CrossEntropyLoss};
pub(crate) use traits::mean_reduce;
pub use traits::{LossFn, LossOutput};
