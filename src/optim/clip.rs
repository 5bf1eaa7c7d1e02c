//! Gradient clipping utilities

use crate::nn::Param;

/// Clip gradients by global norm
///
/// Computes the global norm over every trainable parameter's gradient and
/// scales them down if it exceeds `max_norm`. Frozen parameters are ignored.
///
/// # Returns
/// The global norm before clipping
pub fn clip_grad_norm(params: &mut [&mut Param], max_norm: f32) -> f32 {
    let total_norm_sq: f32 = params
        .iter()
        .filter(|p| p.requires_grad)
        .map(|p| p.grad.iter().map(|&g| g * g).sum::<f32>())
        .sum();
    let global_norm = total_norm_sq.sqrt();

    // Only clip if global norm exceeds max_norm
    if global_norm > max_norm {
        let clip_coef = max_norm / (global_norm + 1e-6);
        for param in params.iter_mut().filter(|p| p.requires_grad) {
            param.grad *= clip_coef;
        }
    }

    global_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::ParamKind;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use proptest::prelude::*;

    fn with_grad(g: ndarray::Array2<f32>) -> Param {
        let mut p = Param::new(ndarray::Array2::zeros(g.raw_dim()), ParamKind::Weight);
        p.grad = g;
        p
    }

    #[test]
    fn test_clip_grad_norm_no_clipping() {
        let mut a = with_grad(array![[0.1, 0.2]]);
        let mut b = with_grad(array![[0.1]]);
        let norm = clip_grad_norm(&mut [&mut a, &mut b], 1.0);
        assert_abs_diff_eq!(norm, 0.245, epsilon = 1e-3);
        assert_abs_diff_eq!(a.grad[[0, 1]], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_clip_grad_norm_clips() {
        let mut a = with_grad(array![[3.0, 4.0]]);
        let norm = clip_grad_norm(&mut [&mut a], 1.0);
        assert_abs_diff_eq!(norm, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a.grad[[0, 0]], 0.6, epsilon = 1e-5);
        assert_abs_diff_eq!(a.grad[[0, 1]], 0.8, epsilon = 1e-5);
    }

    #[test]
    fn test_clip_ignores_frozen() {
        let mut frozen = with_grad(array![[100.0]]);
        frozen.requires_grad = false;
        let mut live = with_grad(array![[0.5]]);
        let norm = clip_grad_norm(&mut [&mut frozen, &mut live], 1.0);
        assert_abs_diff_eq!(norm, 0.5);
        assert_eq!(frozen.grad[[0, 0]], 100.0);
    }

    proptest! {
        #[test]
        fn prop_clipped_norm_bounded(
            grads in proptest::collection::vec(-50.0f32..50.0, 1..32),
            max_norm in 0.01f32..10.0,
        ) {
            let n = grads.len();
            let mut p = with_grad(ndarray::Array2::from_shape_vec((1, n), grads).unwrap());
            clip_grad_norm(&mut [&mut p], max_norm);
            let after = p.grad.iter().map(|g| g * g).sum::<f32>().sqrt();
            prop_assert!(after <= max_norm * 1.001);
        }
    }
}
