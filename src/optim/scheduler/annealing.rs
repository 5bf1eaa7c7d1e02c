//! Annealing functions

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Curve used to move a hyper-parameter from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annealer {
    /// Constant at `start`
    No,
    Linear,
    /// Half cosine: `end + (start - end) / 2 * (cos(π·pct) + 1)`
    Cos,
    /// Geometric: `start * (end / start)^pct`
    Exp,
    /// `end + (start - end) * (1 - pct)^degree`
    Poly(f32),
}

impl Annealer {
    /// Value at `pct` (0 = start, 1 = end)
    pub fn anneal(&self, start: f32, end: f32, pct: f32) -> f32 {
        match self {
            Annealer::No => start,
            Annealer::Linear => start + pct * (end - start),
            Annealer::Cos => end + (start - end) / 2.0 * ((PI * pct).cos() + 1.0),
            Annealer::Exp => start * (end / start).powf(pct),
            Annealer::Poly(degree) => end + (start - end) * (1.0 - pct).powf(*degree),
        }
    }
}
