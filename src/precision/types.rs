//! Storage precision of a model or a batch.

use half::{bf16, f16};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision that parameters, activations and inputs are materialised at
///
/// Storage stays `f32` throughout. A reduced precision means every write is
/// rounded to the nearest representable value, so a model switched to `Fp16`
/// overflows and underflows where binary16 hardware would. Batch-norm
/// parameters are exempt and keep full precision.
///
/// Read from run files in lowercase (`precision: fp16`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Fp32,
    /// IEEE binary16: 5 exponent bits, 10 mantissa bits
    Fp16,
    /// bfloat16: f32 exponent range, 7 mantissa bits
    Bf16,
}

impl Precision {
    /// Whether values need rounding after each write
    pub fn is_reduced(self) -> bool {
        !matches!(self, Precision::Fp32)
    }

    /// Nearest value representable at this precision
    pub fn round(self, value: f32) -> f32 {
        match self {
            Precision::Fp32 => value,
            Precision::Fp16 => f16::from_f32(value).to_f32(),
            Precision::Bf16 => bf16::from_f32(value).to_f32(),
        }
    }

    /// Largest finite value; anything above rounds to infinity
    pub fn max_finite(self) -> f32 {
        match self {
            Precision::Fp32 => f32::MAX,
            Precision::Fp16 => f16::MAX.to_f32(),
            Precision::Bf16 => bf16::MAX.to_f32(),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
        })
    }
}
