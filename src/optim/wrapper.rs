//! Optimizer wrapper holding the per-group hyper-parameters

use super::{Adam, Optimizer, SGD};
use crate::nn::Model;
use crate::{Error, Result};
use tracing::debug;

/// An optimizer plus the hyper-parameters schedules act on
///
/// Learning rates are stored per layer group. `lr()` reports the last
/// group's value, which is the one recorded and displayed.
pub struct OptimWrapper {
    opt: Box<dyn Optimizer>,
    lrs: Vec<f32>,
    mom: f32,
    wd: f32,
    /// Decoupled weight decay (`p *= 1 - lr * wd`) instead of L2 on the gradient
    true_wd: bool,
}

impl OptimWrapper {
    pub fn new(opt: Box<dyn Optimizer>, n_groups: usize) -> Self {
        Self { opt, lrs: vec![1e-3; n_groups.max(1)], mom: 0.9, wd: 0.0, true_wd: true }
    }

    pub fn sgd(n_groups: usize) -> Self {
        Self::new(Box::new(SGD::new()), n_groups)
    }

    pub fn adam(n_groups: usize) -> Self {
        Self::new(Box::new(Adam::default()), n_groups)
    }

    pub fn with_true_wd(mut self, true_wd: bool) -> Self {
        self.true_wd = true_wd;
        self
    }

    pub fn n_groups(&self) -> usize {
        self.lrs.len()
    }

    pub fn lr(&self) -> f32 {
        self.lrs.last().copied().unwrap_or(0.0)
    }

    pub fn lrs(&self) -> &[f32] {
        &self.lrs
    }

    /// Set the same learning rate on every group
    pub fn set_lr(&mut self, lr: f32) {
        self.lrs.fill(lr);
    }

    /// Set per-group learning rates; a single value is broadcast
    pub fn set_lrs(&mut self, lrs: &[f32]) -> Result<()> {
        match lrs.len() {
            1 => self.set_lr(lrs[0]),
            n if n == self.lrs.len() => self.lrs.copy_from_slice(lrs),
            n => return Err(Error::LayerGroups { expected: self.lrs.len(), actual: n }),
        }
        Ok(())
    }

    pub fn mom(&self) -> f32 {
        self.mom
    }

    pub fn set_mom(&mut self, mom: f32) {
        self.mom = mom;
    }

    pub fn wd(&self) -> f32 {
        self.wd
    }

    pub fn set_wd(&mut self, wd: f32) {
        self.wd = wd;
    }

    pub fn name(&self) -> &'static str {
        self.opt.name()
    }

    /// Apply weight decay and one optimizer step to the model's parameters
    pub fn step(&mut self, model: &mut dyn Model) {
        let mut params = model.params_mut();
        if self.wd != 0.0 {
            for p in params.iter_mut().filter(|p| p.requires_grad) {
                let lr = super::optimizer::group_lr(&self.lrs, p.group);
                if self.true_wd {
                    p.data *= 1.0 - lr * self.wd;
                } else {
                    p.grad.scaled_add(self.wd, &p.data);
                }
            }
        }
        self.opt.step(&mut params, &self.lrs, self.mom);
    }

    /// Drop optimizer state (momentum buffers, moments)
    pub fn reset(&mut self) {
        debug!(optimizer = self.opt.name(), "optimizer state reset");
        self.opt.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Layer, Linear, Sequential};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn model() -> Sequential {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Linear::from_weights(array![[1.0]], array![[0.0]])),
            Box::new(Linear::from_weights(array![[1.0]], array![[0.0]])),
        ];
        Sequential::new(layers).with_layer_groups(&[1]).unwrap()
    }

    #[test]
    fn test_set_lrs_broadcast_and_mismatch() {
        let mut opt = OptimWrapper::sgd(3);
        opt.set_lrs(&[0.5]).unwrap();
        assert_eq!(opt.lrs(), &[0.5, 0.5, 0.5]);
        opt.set_lrs(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(opt.lr(), 0.3);
        assert!(matches!(opt.set_lrs(&[0.1, 0.2]), Err(Error::LayerGroups { expected: 3, actual: 2 })));
    }

    #[test]
    fn test_step_uses_group_lrs() {
        let mut m = model();
        for p in m.params_mut() {
            p.grad.fill(1.0);
        }
        let mut opt = OptimWrapper::sgd(2);
        opt.set_mom(0.0);
        opt.set_lrs(&[0.1, 0.5]).unwrap();
        opt.step(&mut m);
        let params = m.params();
        assert_abs_diff_eq!(params[0].data[[0, 0]], 0.9);
        assert_abs_diff_eq!(params[2].data[[0, 0]], 0.5);
    }

    #[test]
    fn test_decoupled_weight_decay() {
        let mut m = model();
        let mut opt = OptimWrapper::sgd(2);
        opt.set_mom(0.0);
        opt.set_lr(0.1);
        opt.set_wd(0.5);
        opt.step(&mut m);
        // zero grads: only decay applies
        assert_abs_diff_eq!(m.params()[0].data[[0, 0]], 0.95);
    }

    #[test]
    fn test_l2_weight_decay() {
        let mut m = model();
        let mut opt = OptimWrapper::sgd(2).with_true_wd(false);
        opt.set_mom(0.0);
        opt.set_lr(0.1);
        opt.set_wd(0.5);
        opt.step(&mut m);
        assert_abs_diff_eq!(m.params()[0].data[[0, 0]], 0.95);
        assert_eq!(opt.name(), "SGD");
    }
}
