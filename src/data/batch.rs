//! Batch data structures

use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// Batch targets
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// Class indices
    Classes(Vec<usize>),
    /// Per-class target distributions, one row per sample
    Dense(Array2<f32>),
}

impl Targets {
    pub fn len(&self) -> usize {
        match self {
            Targets::Classes(c) => c.len(),
            Targets::Dense(d) => d.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather rows by index
    pub fn select(&self, indices: &[usize]) -> Targets {
        match self {
            Targets::Classes(c) => Targets::Classes(indices.iter().map(|&i| c[i]).collect()),
            Targets::Dense(d) => Targets::Dense(d.select(Axis(0), indices)),
        }
    }

    /// One-hot encode class targets; dense targets are returned as-is
    pub fn to_dense(&self, n_classes: usize) -> Result<Array2<f32>> {
        match self {
            Targets::Classes(c) => {
                let mut out = Array2::zeros((c.len(), n_classes));
                for (row, &label) in c.iter().enumerate() {
                    if label >= n_classes {
                        return Err(Error::LabelOutOfRange { label, n_classes });
                    }
                    out[[row, label]] = 1.0;
                }
                Ok(out)
            }
            Targets::Dense(d) => Ok(d.clone()),
        }
    }

    /// Most likely class per row
    pub fn argmax(&self) -> Vec<usize> {
        match self {
            Targets::Classes(c) => c.clone(),
            Targets::Dense(d) => d.rows().into_iter().map(|r| argmax(r.iter().copied())).collect(),
        }
    }
}

pub(crate) fn argmax(values: impl Iterator<Item = f32>) -> usize {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

/// Mixup plan attached to a batch
///
/// Sample `i` is mixed with sample `shuffle[i]` using weight `lambda[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MixPlan {
    pub shuffle: Vec<usize>,
    pub lambda: Array1<f32>,
    /// Inputs are unmixed and the model must blend them
    pub stack_x: bool,
    /// Targets are unmixed and the loss must blend them
    pub stack_y: bool,
}

impl MixPlan {
    /// `lambda[i] * a[i] + (1 - lambda[i]) * a[shuffle[i]]` row-wise
    pub fn blend(&self, a: &Array2<f32>) -> Array2<f32> {
        let shuffled = a.select(Axis(0), &self.shuffle);
        let lambda = self.lambda.view().insert_axis(Axis(1));
        &lambda * a + &(&lambda.mapv(|l| 1.0 - l) * &shuffled)
    }

    /// Row-wise blend of two per-sample vectors
    pub fn blend_rows(&self, a: &Array1<f32>, b: &Array1<f32>) -> Array1<f32> {
        &self.lambda * a + &(self.lambda.mapv(|l| 1.0 - l) * b)
    }
}

/// A training batch
#[derive(Debug, Clone)]
pub struct Batch {
    pub inputs: Array2<f32>,
    pub targets: Targets,
    pub mix: Option<MixPlan>,
}

impl Batch {
    pub fn new(inputs: Array2<f32>, targets: Targets) -> Self {
        Self { inputs, targets, mix: None }
    }

    /// Number of samples
    pub fn size(&self) -> usize {
        self.inputs.nrows()
    }
}
