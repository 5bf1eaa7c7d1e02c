//! Sequential container with layer groups

use super::{BatchNorm1d, Layer, Linear, Model, Param, ReLU};
use crate::precision::{round_array, Precision};
use crate::{Error, Result};
use ndarray::Array2;
use rand::Rng;

/// Layers applied in order, partitioned into contiguous layer groups
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    /// Index of the first layer of each group; always starts with 0
    group_starts: Vec<usize>,
    training: bool,
    precision: Precision,
}

impl Sequential {
    /// Single-group model
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        Self { layers, group_starts: vec![0], training: true, precision: Precision::Fp32 }
    }

    /// Multi-layer perceptron `sizes[0] -> ... -> sizes[n-1]`
    ///
    /// Hidden blocks are `Linear` (+ `BatchNorm1d`) + `ReLU`; the head is a
    /// bare `Linear`.
    pub fn mlp<R: Rng>(sizes: &[usize], batch_norm: bool, rng: &mut R) -> Result<Self> {
        if sizes.len() < 2 || sizes.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "mlp needs at least two non-zero sizes, got {sizes:?}"
            )));
        }
        let mut layers: Vec<Box<dyn Layer>> = Vec::new();
        for (i, pair) in sizes.windows(2).enumerate() {
            layers.push(Box::new(Linear::new(pair[0], pair[1], rng)));
            if i + 2 < sizes.len() {
                if batch_norm {
                    layers.push(Box::new(BatchNorm1d::new(pair[1])));
                }
                layers.push(Box::new(ReLU::new()));
            }
        }
        Ok(Self::new(layers))
    }

    /// Split into layer groups starting at the given layer indices
    ///
    /// `starts` lists where groups 1.. begin; group 0 always starts at layer 0.
    pub fn with_layer_groups(mut self, starts: &[usize]) -> Result<Self> {
        let mut group_starts = vec![0];
        for &s in starts {
            let last = group_starts.last().copied().unwrap_or(0);
            if s <= last || s >= self.layers.len() {
                return Err(Error::InvalidConfig(format!(
                    "layer group starts must be increasing within 1..{}, got {starts:?}",
                    self.layers.len()
                )));
            }
            group_starts.push(s);
        }
        self.group_starts = group_starts;
        self.assign_groups();
        Ok(self)
    }

    fn assign_groups(&mut self) {
        let starts = self.group_starts.clone();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let group = starts.iter().rposition(|&s| s <= i).unwrap_or(0);
            for p in layer.params_mut() {
                p.group = group;
            }
        }
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Model for Sequential {
    fn forward(&mut self, x: &Array2<f32>) -> Array2<f32> {
        let mut out = x.clone();
        for layer in &mut self.layers {
            out = layer.forward(&out);
            round_array(&mut out, self.precision);
        }
        out
    }

    fn backward(&mut self, grad_out: &Array2<f32>) {
        let mut grad = grad_out.clone();
        round_array(&mut grad, self.precision);
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad);
            round_array(&mut grad, self.precision);
        }
        let precision = self.precision;
        if precision.is_reduced() {
            for p in self.params_mut() {
                if !p.is_norm() {
                    round_array(&mut p.grad, precision);
                }
            }
        }
    }

    fn params(&self) -> Vec<&Param> {
        self.layers.iter().flat_map(|l| l.params()).collect()
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(|l| l.params_mut()).collect()
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        for layer in &mut self.layers {
            layer.set_training(training);
        }
    }

    fn set_bn_eval(&mut self) {
        for layer in &mut self.layers {
            if layer.is_norm() && layer.params().iter().all(|p| !p.requires_grad) {
                layer.set_training(false);
            }
        }
    }

    fn layer_groups(&self) -> usize {
        self.group_starts.len()
    }

    fn precision(&self) -> Precision {
        self.precision
    }

    fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
        for p in self.params_mut() {
            if !p.is_norm() {
                round_array(&mut p.data, precision);
            }
        }
    }

    fn state_dict(&self) -> Vec<Array2<f32>> {
        let mut state: Vec<Array2<f32>> = self.params().iter().map(|p| p.data.clone()).collect();
        for layer in &self.layers {
            state.extend(layer.buffers());
        }
        state
    }

    fn load_state_dict(&mut self, state: &[Array2<f32>]) -> Result<()> {
        let n_params = self.params().len();
        let n_buffers: usize = self.layers.iter().map(|l| l.buffers().len()).sum();
        if state.len() != n_params + n_buffers {
            return Err(Error::ShapeMismatch {
                context: "state dict",
                expected: n_params + n_buffers,
                actual: state.len(),
            });
        }
        let (params, buffers) = state.split_at(n_params);
        for (p, s) in self.params_mut().into_iter().zip(params) {
            if p.data.dim() != s.dim() {
                return Err(Error::ShapeMismatch {
                    context: "state dict parameter",
                    expected: p.data.len(),
                    actual: s.len(),
                });
            }
            p.data.assign(s);
        }
        let mut offset = 0;
        for layer in &mut self.layers {
            let n = layer.buffers().len();
            layer.load_buffers(&buffers[offset..offset + n])?;
            offset += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mlp() -> Sequential {
        let mut rng = StdRng::seed_from_u64(7);
        Sequential::mlp(&[2, 4, 3], true, &mut rng).unwrap()
    }

    #[test]
    fn test_mlp_layout() {
        let model = mlp();
        let names: Vec<_> = model.layers().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["Linear", "BatchNorm1d", "ReLU", "Linear"]);
        assert_eq!(model.params().len(), 6);
        assert_eq!(model.layer_groups(), 1);
    }

    #[test]
    fn test_mlp_rejects_bad_sizes() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Sequential::mlp(&[3], false, &mut rng).is_err());
        assert!(Sequential::mlp(&[3, 0, 2], false, &mut rng).is_err());
    }

    #[test]
    fn test_layer_groups_assignment() {
        let model = mlp().with_layer_groups(&[3]).unwrap();
        assert_eq!(model.layer_groups(), 2);
        let groups: Vec<_> = model.params().iter().map(|p| p.group).collect();
        assert_eq!(groups, vec![0, 0, 0, 0, 1, 1]);
        assert!(mlp().with_layer_groups(&[0]).is_err());
        assert!(mlp().with_layer_groups(&[2, 2]).is_err());
        assert!(mlp().with_layer_groups(&[4]).is_err());
    }

    #[test]
    fn test_set_bn_eval_only_frozen_norm_layers() {
        let mut model = mlp();
        model.set_training(true);
        model.set_bn_eval();
        // Norm params still trainable: nothing changes
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let before = model.state_dict();
        model.forward(&x);
        assert_ne!(model.state_dict()[6], before[6]);

        for p in model.params_mut() {
            if p.is_norm() {
                p.requires_grad = false;
            }
        }
        model.set_bn_eval();
        let before = model.state_dict();
        model.forward(&x);
        assert_eq!(model.state_dict()[6], before[6]);
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = Sequential::mlp(&[2, 3, 1], false, &mut rng).unwrap();
        let x = array![[0.5, -1.0], [1.5, 0.25]];
        let out = model.forward(&x);
        model.backward(&Array2::ones(out.raw_dim()));
        let analytic = model.params()[0].grad[[0, 0]];

        let eps = 1e-3;
        model.params_mut()[0].data[[0, 0]] += eps;
        let plus = model.forward(&x).sum();
        model.params_mut()[0].data[[0, 0]] -= 2.0 * eps;
        let minus = model.forward(&x).sum();
        assert_abs_diff_eq!(analytic, (plus - minus) / (2.0 * eps), epsilon = 1e-2);
    }

    #[test]
    fn test_state_dict_roundtrip() {
        let mut a = mlp();
        a.forward(&array![[1.0, 2.0], [0.0, -1.0]]);
        let state = a.state_dict();
        let mut b = mlp();
        b.load_state_dict(&state).unwrap();
        assert_eq!(b.state_dict(), state);
        assert!(b.load_state_dict(&state[..3]).is_err());
    }

    #[test]
    fn test_set_precision_rounds_weights_not_norm() {
        let mut model = mlp();
        model.params_mut()[0].data[[0, 0]] = 0.1;
        model.params_mut()[2].data[[0, 0]] = 0.1;
        model.set_precision(Precision::Fp16);
        assert_ne!(model.params()[0].data[[0, 0]], 0.1);
        assert_eq!(model.params()[2].data[[0, 0]], 0.1);
        assert_eq!(model.precision(), Precision::Fp16);
    }
}
