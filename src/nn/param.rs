//! Trainable parameters

use ndarray::Array2;

/// Role of a parameter inside its layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Weight,
    Bias,
    /// Affine parameters of a normalisation layer
    Norm,
}

/// A trainable tensor with its gradient buffer
#[derive(Debug, Clone)]
pub struct Param {
    pub data: Array2<f32>,
    pub grad: Array2<f32>,
    pub requires_grad: bool,
    /// Layer group index used for discriminative learning rates
    pub group: usize,
    pub kind: ParamKind,
}

impl Param {
    /// Create a trainable parameter in group 0 with a zeroed gradient
    pub fn new(data: Array2<f32>, kind: ParamKind) -> Self {
        let grad = Array2::zeros(data.raw_dim());
        Self { data, grad, requires_grad: true, group: 0, kind }
    }

    /// Number of scalar values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    pub fn is_norm(&self) -> bool {
        self.kind == ParamKind::Norm
    }
}
