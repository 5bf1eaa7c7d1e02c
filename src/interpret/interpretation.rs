//! Interpretation of a classifier's predictions

use super::ConfusionMatrix;
use crate::data::{argmax, DataBunch, DatasetType};
use crate::train::Learner;
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::debug;

/// Rendering options for [`ClassificationInterpretation::plot_confusion_matrix`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Show each row as fractions of the actual class
    pub normalize: bool,
    pub title: String,
    /// Decimals of normalised values
    pub norm_dec: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self { normalize: false, title: "Confusion matrix".to_string(), norm_dec: 2 }
    }
}

/// Predictions, targets and losses of a classifier over one split
#[derive(Debug, Clone)]
pub struct ClassificationInterpretation {
    pub probs: Array2<f32>,
    pub y_true: Vec<usize>,
    pub losses: Array1<f32>,
    /// Most likely class of each row of `probs`
    pub pred_class: Vec<usize>,
    /// Display name of each class
    pub classes: Vec<String>,
}

impl ClassificationInterpretation {
    pub fn new(data: &DataBunch, probs: Array2<f32>, y_true: Vec<usize>, losses: Array1<f32>) -> Result<Self> {
        let n_classes = data.c;
        if probs.ncols() != n_classes {
            return Err(Error::ShapeMismatch { context: "prediction classes", expected: n_classes, actual: probs.ncols() });
        }
        if probs.nrows() != y_true.len() {
            return Err(Error::ShapeMismatch { context: "predictions", expected: y_true.len(), actual: probs.nrows() });
        }
        if losses.len() != y_true.len() {
            return Err(Error::ShapeMismatch { context: "losses", expected: y_true.len(), actual: losses.len() });
        }
        if let Some(&label) = y_true.iter().find(|&&l| l >= n_classes) {
            return Err(Error::LabelOutOfRange { label, n_classes });
        }

        let pred_class = probs.rows().into_iter().map(|r| argmax(r.iter().copied())).collect();
        let classes = (0..n_classes).map(|i| data.class_name(i)).collect();
        Ok(Self { probs, y_true, losses, pred_class, classes })
    }

    /// Predict `ds_type` with `learn` and interpret the result
    pub fn from_learner(learn: &mut Learner, ds_type: DatasetType) -> Result<Self> {
        let preds = learn.get_preds(ds_type, true)?;
        let y_true = preds.targets.argmax();
        let losses = preds.losses.unwrap_or_else(|| Array1::zeros(y_true.len()));
        debug!(%ds_type, samples = y_true.len(), "interpreting predictions");
        Self::new(&learn.data, preds.probs, y_true, losses)
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn confusion_matrix(&self) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new(self.n_classes());
        for (&actual, &pred) in self.y_true.iter().zip(&self.pred_class) {
            cm.record(actual, pred);
        }
        cm
    }

    /// Text table of the confusion matrix, actual classes down the side
    pub fn plot_confusion_matrix(&self, opts: &PlotOptions) -> String {
        let cm = self.confusion_matrix();
        let cells: Vec<Vec<String>> = if opts.normalize {
            cm.normalized()
                .rows()
                .into_iter()
                .map(|r| r.iter().map(|v| format!("{v:.prec$}", prec = opts.norm_dec)).collect())
                .collect()
        } else {
            cm.counts().rows().into_iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
        };

        let label_w = self.classes.iter().map(|c| c.chars().count()).max().unwrap_or(0).max("Actual".len());
        let cell_w = cells
            .iter()
            .flatten()
            .chain(&self.classes)
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(1);

        let mut out = String::new();
        let _ = writeln!(out, "{}", opts.title);
        let _ = write!(out, "{:<label_w$}", "Actual");
        for name in &self.classes {
            let _ = write!(out, " {name:>cell_w$}");
        }
        let _ = writeln!(out);
        for (name, row) in self.classes.iter().zip(&cells) {
            let _ = write!(out, "{name:<label_w$}");
            for cell in row {
                let _ = write!(out, " {cell:>cell_w$}");
            }
            let _ = writeln!(out);
        }
        let _ = write!(out, "{:<label_w$} Predicted", "");
        out
    }

    /// Off-diagonal confusions above `min_val`, most frequent first
    ///
    /// Ties keep row-major order.
    pub fn most_confused(&self, min_val: usize) -> Vec<(String, String, usize)> {
        let cm = self.confusion_matrix();
        let mut entries: Vec<(usize, usize, usize)> = cm.off_diagonal().filter(|&(_, _, c)| c > min_val).collect();
        entries.sort_by(|a, b| b.2.cmp(&a.2));
        entries
            .into_iter()
            .map(|(i, j, c)| (self.classes[i].clone(), self.classes[j].clone(), c))
            .collect()
    }

    /// The `k` largest losses with their sample indices
    pub fn top_losses(&self, k: usize) -> Vec<(usize, f32)> {
        let mut indexed: Vec<(usize, f32)> = self.losses.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }
}
