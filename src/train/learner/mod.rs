//! The `Learner`: model, data, optimizer and loss bound together
//!
//! - `core` - construction, callbacks, freezing
//! - `lr_range` - learning rates per layer group
//! - `fit` - the training loop and validation
//! - `preds` - predictions over a dataset split

mod core;
mod fit;
mod lr_range;
mod preds;
mod result;

#[cfg(test)]
mod tests;

pub use core::{Learner, DEFAULT_WD};
pub use lr_range::{even_mults, LrSpec};
pub use preds::Preds;
pub use result::FitResult;
