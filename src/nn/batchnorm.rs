//! Batch normalisation over the feature axis

use super::{Layer, Param, ParamKind};
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

const MOMENTUM: f32 = 0.1;
const EPS: f32 = 1e-5;

/// Batch normalisation for `(batch, features)` inputs
///
/// In training mode the batch statistics normalise the input and update the
/// running estimates; in eval mode the running estimates are used and left
/// untouched.
#[derive(Debug)]
pub struct BatchNorm1d {
    gamma: Param,
    beta: Param,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
    training: bool,
    // Backward cache
    x_hat: Option<Array2<f32>>,
    inv_std: Option<Array1<f32>>,
    cached_training: bool,
}

impl BatchNorm1d {
    pub fn new(features: usize) -> Self {
        Self {
            gamma: Param::new(Array2::ones((1, features)), ParamKind::Norm),
            beta: Param::new(Array2::zeros((1, features)), ParamKind::Norm),
            running_mean: Array1::zeros(features),
            running_var: Array1::ones(features),
            training: true,
            x_hat: None,
            inv_std: None,
            cached_training: true,
        }
    }

    pub fn running_mean(&self) -> &Array1<f32> {
        &self.running_mean
    }

    pub fn running_var(&self) -> &Array1<f32> {
        &self.running_var
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    fn features(&self) -> usize {
        self.running_mean.len()
    }
}

impl Layer for BatchNorm1d {
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let m = x.nrows();
        let (mean, var) = if self.training && m > 0 {
            let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(self.features()));
            let centered = x - &mean;
            let var = (&centered * &centered).sum_axis(Axis(0)) / m as f32;

            let unbiased = if m > 1 { &var * (m as f32 / (m - 1) as f32) } else { var.clone() };
            self.running_mean = &self.running_mean * (1.0 - MOMENTUM) + &mean * MOMENTUM;
            self.running_var = &self.running_var * (1.0 - MOMENTUM) + &unbiased * MOMENTUM;
            (mean, var)
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let inv_std = var.mapv(|v| 1.0 / (v + EPS).sqrt());
        let x_hat = (x - &mean) * &inv_std;
        let out = &x_hat * &self.gamma.data.row(0) + &self.beta.data.row(0);

        self.x_hat = Some(x_hat);
        self.inv_std = Some(inv_std);
        self.cached_training = self.training;
        out
    }

    fn backward(&mut self, grad_out: &Array2<f32>) -> Array2<f32> {
        let (Some(x_hat), Some(inv_std)) = (&self.x_hat, &self.inv_std) else {
            return grad_out.clone();
        };

        if self.gamma.requires_grad {
            self.gamma.grad +=
                &(grad_out * x_hat).sum_axis(Axis(0)).insert_axis(Axis(0));
        }
        if self.beta.requires_grad {
            self.beta.grad += &grad_out.sum_axis(Axis(0)).insert_axis(Axis(0));
        }

        let dx_hat = grad_out * &self.gamma.data.row(0);
        if !self.cached_training {
            return dx_hat * inv_std;
        }

        // dx = inv_std / m * (m * dx_hat - sum(dx_hat) - x_hat * sum(dx_hat * x_hat))
        let m = grad_out.nrows() as f32;
        let sum_dx_hat = dx_hat.sum_axis(Axis(0));
        let sum_dx_hat_x_hat = (&dx_hat * x_hat).sum_axis(Axis(0));
        (&dx_hat * m - &sum_dx_hat - &(x_hat * &sum_dx_hat_x_hat)) * inv_std / m
    }

    fn params(&self) -> Vec<&Param> {
        vec![&self.gamma, &self.beta]
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }

    fn buffers(&self) -> Vec<Array2<f32>> {
        vec![
            self.running_mean.clone().insert_axis(Axis(0)),
            self.running_var.clone().insert_axis(Axis(0)),
        ]
    }

    fn load_buffers(&mut self, buffers: &[Array2<f32>]) -> Result<()> {
        let [mean, var] = buffers else {
            return Err(Error::ShapeMismatch {
                context: "batch norm buffers",
                expected: 2,
                actual: buffers.len(),
            });
        };
        if mean.len() != self.features() || var.len() != self.features() {
            return Err(Error::ShapeMismatch {
                context: "batch norm features",
                expected: self.features(),
                actual: mean.len(),
            });
        }
        self.running_mean = mean.row(0).to_owned();
        self.running_var = var.row(0).to_owned();
        Ok(())
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_norm(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "BatchNorm1d"
    }
}
