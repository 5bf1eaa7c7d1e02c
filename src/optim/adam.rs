//! Adam optimizer

use super::optimizer::group_lr;
use super::Optimizer;
use crate::nn::Param;
use ndarray::Array2;

/// Adam with bias-corrected moments
///
/// The first-moment decay is the wrapper's momentum, so momentum schedules
/// drive `beta1`.
#[derive(Debug)]
pub struct Adam {
    beta2: f32,
    epsilon: f32,
    t: u64,
    m: Vec<Option<Array2<f32>>>,
    v: Vec<Option<Array2<f32>>>,
}

impl Adam {
    pub fn new(beta2: f32, epsilon: f32) -> Self {
        Self { beta2, epsilon, t: 0, m: Vec::new(), v: Vec::new() }
    }

    pub fn step_count(&self) -> u64 {
        self.t
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.99, 1e-8)
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Param], lrs: &[f32], mom: f32) {
        if self.m.len() != params.len() {
            self.m = vec![None; params.len()];
            self.v = vec![None; params.len()];
        }
        self.t += 1;
        let beta1 = mom;
        let t = self.t as i32;
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - self.beta2.powi(t);

        for (i, param) in params.iter_mut().enumerate() {
            if !param.requires_grad {
                continue;
            }
            let lr = group_lr(lrs, param.group);
            let g = &param.grad;

            let m = match self.m[i].take() {
                Some(m) if m.dim() == g.dim() => m * beta1 + &(g * (1.0 - beta1)),
                _ => g * (1.0 - beta1),
            };
            let v = match self.v[i].take() {
                Some(v) if v.dim() == g.dim() => v * self.beta2 + &(g * g * (1.0 - self.beta2)),
                _ => g * g * (1.0 - self.beta2),
            };

            let eps = self.epsilon;
            let update = ndarray::Zip::from(&m).and(&v).map_collect(|&m, &v| {
                let m_hat = if bias1 > 0.0 { m / bias1 } else { m };
                let v_hat = if bias2 > 0.0 { v / bias2 } else { v };
                lr * m_hat / (v_hat.sqrt() + eps)
            });
            param.data -= &update;

            self.m[i] = Some(m);
            self.v[i] = Some(v);
        }
    }

    fn reset(&mut self) {
        self.t = 0;
        self.m.clear();
        self.v.clear();
    }

    fn name(&self) -> &'static str {
        "Adam"
    }
}
