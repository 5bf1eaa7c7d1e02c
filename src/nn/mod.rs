//! Reference network building blocks
//!
//! A small dense-network toolkit with explicit forward/backward passes. It
//! gives training policies real parameters, gradients, layer groups and
//! batch-norm layers to act on.

mod activation;
mod batchnorm;
mod linear;
mod model;
mod param;
mod sequential;

pub use activation::ReLU;
pub use batchnorm::BatchNorm1d;
pub use linear::Linear;
pub use model::{Layer, Model};
pub use param::{Param, ParamKind};
pub use sequential::Sequential;
