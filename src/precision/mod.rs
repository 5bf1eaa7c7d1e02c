//! Reduced-precision arithmetic for mixed-precision training
//!
//! Half precision is emulated on top of `f32` storage: values are rounded
//! through IEEE binary16 (or bfloat16) so that a model "in fp16" sees exactly
//! the values, overflows and underflows real half-precision hardware would.
//!
//! - `Precision` - storage precision of a model or batch
//! - `round_to` / `round_array` - materialise values at a precision
//! - `LossScaler` - static or dynamic loss scaling

mod conversions;
mod scaler;
mod types;

#[cfg(test)]
mod tests;

pub use conversions::{bf16_to_f32, f32_to_bf16, f32_to_fp16, fp16_to_f32, round_array, round_to};
pub use scaler::{LossScaler, DEFAULT_MAX_NOSKIP, MAX_LOSS_SCALE};
pub use types::Precision;
