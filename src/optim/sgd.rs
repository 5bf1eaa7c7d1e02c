//! Stochastic Gradient Descent optimizer

use super::optimizer::group_lr;
use super::Optimizer;
use crate::nn::Param;
use ndarray::Array2;

/// SGD with momentum
///
/// `v = mom * v - lr * grad; param += v`
#[derive(Debug, Default)]
pub struct SGD {
    velocities: Vec<Option<Array2<f32>>>,
}

impl SGD {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &mut [&mut Param], lrs: &[f32], mom: f32) {
        if self.velocities.len() != params.len() {
            self.velocities = vec![None; params.len()];
        }

        for (param, slot) in params.iter_mut().zip(self.velocities.iter_mut()) {
            if !param.requires_grad {
                continue;
            }
            let lr = group_lr(lrs, param.group);
            let velocity = match slot.take() {
                Some(v) if v.dim() == param.grad.dim() && mom > 0.0 => v * mom - &param.grad * lr,
                _ => &param.grad * (-lr),
            };
            param.data += &velocity;
            *slot = Some(velocity);
        }
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }

    fn name(&self) -> &'static str {
        "SGD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::ParamKind;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn param(v: f32, g: f32) -> Param {
        let mut p = Param::new(array![[v]], ParamKind::Weight);
        p.grad[[0, 0]] = g;
        p
    }

    #[test]
    fn test_sgd_plain_step() {
        let mut opt = SGD::new();
        let mut p = param(1.0, 0.5);
        opt.step(&mut [&mut p], &[0.1], 0.0);
        assert_abs_diff_eq!(p.data[[0, 0]], 0.95);
    }

    #[test]
    fn test_sgd_momentum_accumulates() {
        let mut opt = SGD::new();
        let mut p = param(0.0, 1.0);
        opt.step(&mut [&mut p], &[0.1], 0.9);
        opt.step(&mut [&mut p], &[0.1], 0.9);
        // v1 = -0.1, v2 = -0.09 - 0.1
        assert_abs_diff_eq!(p.data[[0, 0]], -0.29, epsilon = 1e-6);
    }

    #[test]
    fn test_sgd_skips_frozen_and_uses_group_lr() {
        let mut opt = SGD::new();
        let mut frozen = param(1.0, 1.0);
        frozen.requires_grad = false;
        let mut head = param(1.0, 1.0);
        head.group = 1;
        opt.step(&mut [&mut frozen, &mut head], &[0.01, 0.5], 0.0);
        assert_eq!(frozen.data[[0, 0]], 1.0);
        assert_abs_diff_eq!(head.data[[0, 0]], 0.5);
    }

    #[test]
    fn test_sgd_reset_clears_velocity() {
        let mut opt = SGD::new();
        let mut p = param(0.0, 1.0);
        opt.step(&mut [&mut p], &[0.1], 0.9);
        opt.reset();
        opt.step(&mut [&mut p], &[0.1], 0.9);
        assert_abs_diff_eq!(p.data[[0, 0]], -0.2, epsilon = 1e-6);
    }
}
