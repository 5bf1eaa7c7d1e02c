//! Predictions over a dataset split

use super::Learner;
use crate::data::{DatasetType, Targets};
use crate::{Error, Result};
use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Activated predictions, targets and optional per-sample losses
#[derive(Debug, Clone)]
pub struct Preds {
    /// Output of the loss function's activation, one row per sample
    pub probs: Array2<f32>,
    pub targets: Targets,
    pub losses: Option<Array1<f32>>,
}

fn concat_targets(parts: Vec<Targets>) -> Result<Targets> {
    let mut classes = Vec::new();
    let mut dense: Vec<Array2<f32>> = Vec::new();
    for part in parts {
        match part {
            Targets::Classes(c) => classes.extend(c),
            Targets::Dense(d) => dense.push(d),
        }
    }
    match (classes.is_empty(), dense.is_empty()) {
        (_, true) => Ok(Targets::Classes(classes)),
        (true, false) => {
            let views: Vec<ArrayView2<f32>> = dense.iter().map(|d| d.view()).collect();
            concatenate(Axis(0), &views)
                .map(Targets::Dense)
                .map_err(|e| Error::InvalidConfig(format!("cannot stack targets: {e}")))
        }
        (false, false) => Err(Error::InvalidConfig("mixed class and dense targets in one loader".to_string())),
    }
}

impl Learner {
    /// Run the model in eval mode over a split
    ///
    /// Batches are read in dataset order. With `with_loss`, per-sample losses
    /// of the (unreduced) loss function are returned too.
    pub fn get_preds(&mut self, ds_type: DatasetType, with_loss: bool) -> Result<Preds> {
        let batches = match self.data.dl(ds_type) {
            Some(dl) => dl.ordered_batches(),
            None => return Err(Error::EmptyData(format!("no {ds_type} loader"))),
        };
        if batches.is_empty() {
            return Err(Error::EmptyData(format!("{ds_type} loader has no samples")));
        }
        self.model.set_training(false);

        let mut probs = Vec::with_capacity(batches.len());
        let mut losses = Vec::new();
        let mut targets = Vec::with_capacity(batches.len());
        for batch in batches {
            let output = self.model.forward(&batch.inputs);
            if with_loss {
                let (l, _) = self.loss_func.per_sample(&output, &batch.targets)?;
                losses.push(l);
            }
            probs.push(self.loss_func.activation(&output));
            targets.push(batch.targets);
        }

        let prob_views: Vec<ArrayView2<f32>> = probs.iter().map(|p| p.view()).collect();
        let probs = concatenate(Axis(0), &prob_views)
            .map_err(|e| Error::InvalidConfig(format!("cannot stack predictions: {e}")))?;
        let losses = if with_loss {
            let views: Vec<ArrayView1<f32>> = losses.iter().map(|l| l.view()).collect();
            Some(
                concatenate(Axis(0), &views)
                    .map_err(|e| Error::InvalidConfig(format!("cannot stack losses: {e}")))?,
            )
        } else {
            None
        };
        Ok(Preds { probs, targets: concat_targets(targets)?, losses })
    }
}
