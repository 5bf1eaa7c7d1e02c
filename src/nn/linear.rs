//! Fully connected layer

use super::{Layer, Param, ParamKind};
use ndarray::{Array2, Axis};
use rand::Rng;

/// Affine map `y = x W + b`
#[derive(Debug)]
pub struct Linear {
    weight: Param,
    bias: Param,
    input: Option<Array2<f32>>,
}

impl Linear {
    /// Uniform init in `±1/sqrt(in_features)`
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        let weight = Array2::from_shape_fn((in_features, out_features), |_| {
            rng.random_range(-bound..bound)
        });
        let bias = Array2::from_shape_fn((1, out_features), |_| rng.random_range(-bound..bound));
        Self::from_weights(weight, bias)
    }

    /// Build from explicit weights (`in x out`) and bias (`1 x out`)
    pub fn from_weights(weight: Array2<f32>, bias: Array2<f32>) -> Self {
        Self {
            weight: Param::new(weight, ParamKind::Weight),
            bias: Param::new(bias, ParamKind::Bias),
            input: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.data.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.data.ncols()
    }
}

impl Layer for Linear {
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        self.input = Some(x.clone());
        x.dot(&self.weight.data) + &self.bias.data
    }

    fn backward(&mut self, grad_out: &Array2<f32>) -> Array2<f32> {
        if let Some(x) = &self.input {
            if self.weight.requires_grad {
                self.weight.grad += &x.t().dot(grad_out);
            }
            if self.bias.requires_grad {
                self.bias.grad += &grad_out.sum_axis(Axis(0)).insert_axis(Axis(0));
            }
        }
        grad_out.dot(&self.weight.data.t())
    }

    fn params(&self) -> Vec<&Param> {
        vec![&self.weight, &self.bias]
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn name(&self) -> &'static str {
        "Linear"
    }
}
