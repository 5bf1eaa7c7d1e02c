//! Confusion matrix for multi-class classification

use crate::{Error, Result};
use ndarray::{Array2, Axis};
use std::fmt;

/// Confusion matrix for multi-class classification
///
/// Element `[i, j]` counts samples of actual class `i` predicted as `j`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// Empty matrix over `n_classes` classes
    pub fn new(n_classes: usize) -> Self {
        Self { counts: Array2::zeros((n_classes, n_classes)) }
    }

    /// Count `(actual, predicted)` pairs
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(Error::ShapeMismatch { context: "predictions", expected: y_true.len(), actual: y_pred.len() });
        }
        let mut cm = Self::new(n_classes);
        for (&actual, &pred) in y_true.iter().zip(y_pred) {
            if let Some(&label) = [actual, pred].iter().find(|&&l| l >= n_classes) {
                return Err(Error::LabelOutOfRange { label, n_classes });
            }
            cm.record(actual, pred);
        }
        Ok(cm)
    }

    /// Count one sample; both labels must be below `n_classes`
    pub fn record(&mut self, actual: usize, predicted: usize) {
        self.counts[[actual, predicted]] += 1;
    }

    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[[actual, predicted]]
    }

    /// Samples whose actual class is `class` (row sum)
    pub fn support(&self, class: usize) -> usize {
        self.counts.row(class).sum()
    }

    /// Samples predicted as `class` (column sum)
    pub fn predicted_count(&self, class: usize) -> usize {
        self.counts.column(class).sum()
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.diag().sum() as f64 / total as f64
    }

    /// Each row divided by its sum; rows without samples stay zero
    pub fn normalized(&self) -> Array2<f32> {
        let mut out = self.counts.mapv(|c| c as f32);
        for mut row in out.axis_iter_mut(Axis(0)) {
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }
        out
    }

    /// Off-diagonal `(actual, predicted, count)` entries in row-major order
    pub fn off_diagonal(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.counts
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|((i, j), &c)| (i, j, c))
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confusion Matrix:")?;
        write!(f, "      ")?;
        for j in 0..self.n_classes() {
            write!(f, "Pred {j} ")?;
        }
        writeln!(f)?;
        for (i, row) in self.counts.rows().into_iter().enumerate() {
            write!(f, "True {i}")?;
            for c in row {
                write!(f, "{c:>6} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
