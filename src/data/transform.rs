//! Batch transforms applied by data loaders

use super::Batch;
use crate::precision::{round_array, Precision};

/// A transform applied to every batch a loader yields
pub trait BatchTransform: Send {
    fn apply(&self, batch: &mut Batch);

    /// Identifier used to find and remove the transform
    fn name(&self) -> &'static str;
}

/// Casts batch inputs to reduced precision
#[derive(Debug, Clone, Copy)]
pub struct ToHalf {
    pub precision: Precision,
}

impl ToHalf {
    pub const NAME: &'static str = "batch_to_half";

    pub fn new(precision: Precision) -> Self {
        Self { precision }
    }
}

impl BatchTransform for ToHalf {
    fn apply(&self, batch: &mut Batch) {
        round_array(&mut batch.inputs, self.precision);
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}
