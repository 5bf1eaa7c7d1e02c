//! Gaussian blobs classification dataset

use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Parameters of the blobs dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobsConfig {
    pub n_classes: usize,
    pub n_per_class: usize,
    pub n_features: usize,
    /// Distance of class centres from the origin
    pub radius: f32,
    /// Standard deviation of the per-feature noise
    pub noise: f32,
}

impl Default for BlobsConfig {
    fn default() -> Self {
        Self { n_classes: 3, n_per_class: 64, n_features: 2, radius: 4.0, noise: 1.0 }
    }
}

/// Sample `n_classes` Gaussian blobs
///
/// Class `k` is centred on the circle of `radius` at angle `2πk / n_classes`
/// in the first two features; remaining features are pure noise.
pub fn blobs(config: &BlobsConfig, seed: u64) -> Result<(Array2<f32>, Vec<usize>)> {
    if config.n_classes == 0 || config.n_per_class == 0 || config.n_features == 0 {
        return Err(Error::InvalidConfig("blobs needs non-zero classes, samples and features".to_string()));
    }
    let normal = Normal::new(0.0f32, config.noise)
        .map_err(|e| Error::InvalidConfig(format!("invalid blobs noise {}: {e}", config.noise)))?;
    let mut rng = StdRng::seed_from_u64(seed);

    let n = config.n_classes * config.n_per_class;
    let mut x = Array2::zeros((n, config.n_features));
    let mut y = Vec::with_capacity(n);
    for k in 0..config.n_classes {
        let angle = 2.0 * PI * k as f32 / config.n_classes as f32;
        let centre = [config.radius * angle.cos(), config.radius * angle.sin()];
        for s in 0..config.n_per_class {
            let row = k * config.n_per_class + s;
            for j in 0..config.n_features {
                let c = centre.get(j).copied().unwrap_or(0.0);
                x[[row, j]] = c + normal.sample(&mut rng);
            }
            y.push(k);
        }
    }
    Ok((x, y))
}
