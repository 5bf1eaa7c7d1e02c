//! Learning rates per layer group

use super::Learner;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Learning-rate argument accepted by `fit` and the policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LrSpec {
    /// Same rate for every group
    Scalar(f32),
    /// Explicit rate per group
    PerGroup(Vec<f32>),
    /// Geometric spread from `start` to `stop`; without `start`, `stop / 10`
    /// for every group but the last
    Slice { start: Option<f32>, stop: f32 },
}

impl LrSpec {
    pub fn slice(start: f32, stop: f32) -> Self {
        LrSpec::Slice { start: Some(start), stop }
    }

    pub fn up_to(stop: f32) -> Self {
        LrSpec::Slice { start: None, stop }
    }
}

impl From<f32> for LrSpec {
    fn from(lr: f32) -> Self {
        LrSpec::Scalar(lr)
    }
}

impl From<Vec<f32>> for LrSpec {
    fn from(lrs: Vec<f32>) -> Self {
        LrSpec::PerGroup(lrs)
    }
}

impl From<&[f32]> for LrSpec {
    fn from(lrs: &[f32]) -> Self {
        LrSpec::PerGroup(lrs.to_vec())
    }
}

/// `n` values spaced geometrically from `start` to `stop`
///
/// A single value is `stop`.
pub fn even_mults(start: f32, stop: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![stop],
        _ => {
            let step = (stop / start).powf(1.0 / (n - 1) as f32);
            (0..n).map(|i| start * step.powi(i as i32)).collect()
        }
    }
}

impl Learner {
    /// Expand a learning-rate argument to one value per layer group
    pub fn lr_range(&self, lr: impl Into<LrSpec>) -> Result<Vec<f32>> {
        let n = self.n_groups();
        let lrs = match lr.into() {
            LrSpec::Scalar(lr) => vec![lr; n],
            LrSpec::PerGroup(lrs) => {
                if lrs.len() != n {
                    return Err(Error::LayerGroups { expected: n, actual: lrs.len() });
                }
                lrs
            }
            LrSpec::Slice { start: Some(start), stop } => {
                if start <= 0.0 || stop <= 0.0 {
                    return Err(Error::InvalidConfig(format!(
                        "learning-rate slice bounds must be positive, got {start}..{stop}"
                    )));
                }
                even_mults(start, stop, n)
            }
            LrSpec::Slice { start: None, stop } => {
                let mut lrs = vec![stop / 10.0; n.saturating_sub(1)];
                lrs.push(stop);
                lrs
            }
        };
        if let Some(bad) = lrs.iter().find(|lr| !lr.is_finite()) {
            return Err(Error::InvalidConfig(format!("learning rate must be finite, got {bad}")));
        }
        Ok(lrs)
    }
}
