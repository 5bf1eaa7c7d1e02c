//! Precision conversion functions.
//!
//! Bit-level conversion goes through the `half` crate; the helpers here only
//! move between `f32` storage and the 16-bit encodings.

use super::Precision;
use half::{bf16, f16};
use ndarray::Array2;

/// Encode an f32 as bf16 bits, rounding to nearest even
pub fn f32_to_bf16(value: f32) -> u16 {
    bf16::from_f32(value).to_bits()
}

/// Decode bf16 bits
pub fn bf16_to_f32(value: u16) -> f32 {
    bf16::from_bits(value).to_f32()
}

/// Encode an f32 as IEEE binary16 bits, rounding to nearest even
///
/// Values beyond the fp16 range become infinity and values below the
/// smallest subnormal flush to signed zero.
pub fn f32_to_fp16(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Decode IEEE binary16 bits
pub fn fp16_to_f32(value: u16) -> f32 {
    f16::from_bits(value).to_f32()
}

/// Round a value to the nearest value representable at `precision`
pub fn round_to(value: f32, precision: Precision) -> f32 {
    precision.round(value)
}

/// Round every element of `array` in place
pub fn round_array(array: &mut Array2<f32>, precision: Precision) {
    if precision.is_reduced() {
        array.mapv_inplace(|v| precision.round(v));
    }
}
