//! Activation layers

use super::Layer;
use ndarray::Array2;

/// Rectified linear unit
#[derive(Debug, Default)]
pub struct ReLU {
    mask: Option<Array2<f32>>,
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for ReLU {
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let mask = x.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let out = x * &mask;
        self.mask = Some(mask);
        out
    }

    fn backward(&mut self, grad_out: &Array2<f32>) -> Array2<f32> {
        match &self.mask {
            Some(mask) => grad_out * mask,
            None => grad_out.clone(),
        }
    }

    fn name(&self) -> &'static str {
        "ReLU"
    }
}
