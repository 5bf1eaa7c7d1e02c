//! Training loop with validation

use super::{FitResult, Learner, LrSpec};
use crate::data::DatasetType;
use crate::train::callback::{Callback, CallbackAction, CallbackContext, CallbackManager, Progress};
use crate::train::recorder::SmoothenValue;
use crate::{Error, Result};
use std::time::Instant;
use tracing::{debug, info};

/// Borrow the learner's parts as a callback context
macro_rules! ctx {
    ($learn:expr, $progress:expr) => {
        CallbackContext {
            model: $learn.model.as_mut(),
            opt: &mut $learn.opt,
            recorder: &$learn.recorder,
            progress: &$progress,
        }
    };
}

/// Where the epoch loop ended
struct LoopOutcome {
    epochs_run: usize,
    stopped_early: bool,
}

impl Learner {
    /// Train for `epochs` epochs
    ///
    /// Active callbacks are the persistent `callbacks`, then a fresh instance
    /// of every `callback_fns` entry, then `callbacks` passed here. Only the
    /// persistent ones survive the call. `wd` defaults to `self.wd`.
    ///
    /// `on_train_end` runs even when the loop fails, so callbacks can restore
    /// state before the error propagates.
    pub fn fit(
        &mut self,
        epochs: usize,
        lr: impl Into<LrSpec>,
        wd: Option<f32>,
        callbacks: Vec<Box<dyn Callback>>,
    ) -> Result<FitResult> {
        if self.data.train_dl.is_empty() {
            return Err(Error::EmptyData("training loader has no samples".to_string()));
        }
        let lrs = self.lr_range(lr)?;
        self.opt.set_lrs(&lrs)?;
        self.opt.set_wd(wd.unwrap_or(self.wd));

        let n_persistent = self.callbacks.len();
        let mut active = std::mem::take(&mut self.callbacks);
        active.extend(self.callback_fns.iter().map(|make| make()));
        active.extend(callbacks);
        let mut cbs = CallbackManager::new(active);

        let outcome = self.run(epochs, &mut cbs);
        self.callbacks = cbs.into_first(n_persistent);
        outcome
    }

    fn run(&mut self, epochs: usize, cbs: &mut CallbackManager) -> Result<FitResult> {
        let start = Instant::now();
        let metric_names = self.metrics.iter().map(|m| m.name().to_string()).collect();
        self.recorder.begin(metric_names);

        let mut progress = Progress {
            n_epochs: epochs,
            batches_per_epoch: self.data.train_dl.len(),
            n_classes: self.data.c,
            ..Progress::default()
        };
        let mut smoother = SmoothenValue::default();

        info!(
            epochs,
            lrs = ?self.opt.lrs(),
            wd = self.opt.wd(),
            callbacks = ?cbs.names(),
            "fit started"
        );

        self.model.zero_grad();
        cbs.on_train_begin(&mut ctx!(self, progress));
        let outcome = self.run_epochs(epochs, cbs, &mut progress, &mut smoother);
        progress.train = false;
        cbs.on_train_end(&mut ctx!(self, progress));
        let outcome = outcome?;

        let result = FitResult {
            epochs_run: outcome.epochs_run,
            iterations: progress.iteration,
            final_loss: progress.smooth_loss,
            val_loss: self.recorder.val_losses.last().copied(),
            metrics: self.recorder.metrics.last().cloned().unwrap_or_default(),
            stopped_early: outcome.stopped_early,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            epochs_run = result.epochs_run,
            iterations = result.iterations,
            final_loss = result.final_loss,
            stopped_early = result.stopped_early,
            "fit finished"
        );
        Ok(result)
    }

    fn run_epochs(
        &mut self,
        epochs: usize,
        cbs: &mut CallbackManager,
        progress: &mut Progress,
        smoother: &mut SmoothenValue,
    ) -> Result<LoopOutcome> {
        let skip_validate = cbs.skip_validate();
        let mut epochs_run = 0;

        for epoch in 0..epochs {
            progress.epoch = epoch;
            progress.num_batch = 0;
            progress.last_metrics = None;
            self.model.set_training(true);
            cbs.on_epoch_begin(&mut ctx!(self, *progress));

            let mut stop = false;
            for mut batch in self.data.train_dl.batches() {
                progress.train = true;
                self.recorder.record_hyper_params(self.opt.lr(), self.opt.mom());
                cbs.on_batch_begin(&mut ctx!(self, *progress), &mut batch);

                let mut output = self.model.forward_batch(&batch);
                cbs.on_loss_begin(&mut ctx!(self, *progress), &mut output);
                let mut loss = self.loss_func.forward(&output, &batch)?;

                smoother.add_value(loss.value);
                progress.last_loss = loss.value;
                progress.smooth_loss = smoother.smooth();
                self.recorder.record_loss(progress.smooth_loss);

                cbs.on_backward_begin(&mut ctx!(self, *progress), &mut loss);
                self.model.backward(&loss.grad);
                match cbs.on_backward_end(&mut ctx!(self, *progress)) {
                    CallbackAction::SkipStep => debug!(iteration = progress.iteration, "optimizer step skipped"),
                    CallbackAction::Stop => {
                        stop = true;
                        self.opt.step(self.model.as_mut());
                    }
                    _ => self.opt.step(self.model.as_mut()),
                }
                cbs.on_step_end(&mut ctx!(self, *progress));
                self.model.zero_grad();

                let action = cbs.on_batch_end(&mut ctx!(self, *progress));
                progress.iteration += 1;
                progress.num_batch += 1;
                match action {
                    CallbackAction::Stop => stop = true,
                    CallbackAction::SkipEpoch => break,
                    _ => {}
                }
                if stop {
                    break;
                }
            }
            progress.train = false;

            if !skip_validate && !self.data.valid_dl.is_empty() {
                let (val_loss, metrics) = self.validate(DatasetType::Valid)?;
                progress.last_metrics = Some(std::iter::once(val_loss).chain(metrics).collect());
            }
            self.recorder.record_epoch(progress.num_batch, progress.last_metrics.as_deref());
            epochs_run += 1;
            debug!(
                epoch,
                train_loss = progress.smooth_loss,
                last_metrics = ?progress.last_metrics,
                "epoch finished"
            );

            if cbs.on_epoch_end(&mut ctx!(self, *progress)) == CallbackAction::Stop {
                stop = true;
            }
            if stop {
                return Ok(LoopOutcome { epochs_run, stopped_early: true });
            }
        }
        Ok(LoopOutcome { epochs_run, stopped_early: false })
    }

    /// Loss and metrics over a dataset split, in eval mode
    ///
    /// Both are averaged over samples (batch values weighted by batch size).
    pub fn validate(&mut self, ds_type: DatasetType) -> Result<(f32, Vec<f32>)> {
        let batches = match self.data.dl(ds_type) {
            Some(dl) if !dl.is_empty() => dl.ordered_batches(),
            _ => return Err(Error::EmptyData(format!("no {ds_type} samples to validate on"))),
        };
        self.model.set_training(false);

        let mut total_loss = 0.0;
        let mut metric_sums = vec![0.0; self.metrics.len()];
        let mut n = 0usize;
        for batch in &batches {
            let output = self.model.forward(&batch.inputs);
            let (losses, _) = self.loss_func.per_sample(&output, &batch.targets)?;
            total_loss += losses.sum();
            let bs = batch.size() as f32;
            for (sum, metric) in metric_sums.iter_mut().zip(&self.metrics) {
                *sum += metric.compute(&output, &batch.targets) * bs;
            }
            n += batch.size();
        }
        let n = n as f32;
        Ok((total_loss / n, metric_sums.into_iter().map(|s| s / n).collect()))
    }
}
