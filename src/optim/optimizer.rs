//! Optimizer trait

use crate::nn::Param;

/// Trait for optimization algorithms
///
/// `params` always holds every model parameter in the same order, so
/// per-parameter state can be keyed by position. Frozen parameters
/// (`requires_grad == false`) must be skipped.
pub trait Optimizer: Send {
    /// Perform a single optimization step
    ///
    /// `lrs[g]` is the learning rate of layer group `g`; `mom` is the
    /// momentum (or first-moment decay for Adam).
    fn step(&mut self, params: &mut [&mut Param], lrs: &[f32], mom: f32);

    /// Drop all per-parameter state
    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

/// Learning rate for a parameter's layer group
pub(crate) fn group_lr(lrs: &[f32], group: usize) -> f32 {
    lrs.get(group).or_else(|| lrs.last()).copied().unwrap_or(0.0)
}
