//! Tests for the learner and its training loop

use super::*;
use crate::data::{Batch, DatasetType, Targets};
use crate::test_utils::toy_learner;
use crate::train::callback::{Callback, CallbackAction, CallbackContext};
use crate::train::metrics::Accuracy;
use crate::Error;
use approx::assert_abs_diff_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Logs every event it sees
struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl Callback for EventLog {
    fn on_train_begin(&mut self, _ctx: &mut CallbackContext<'_>) {
        self.events.lock().unwrap().push("train_begin".into());
    }
    fn on_epoch_begin(&mut self, _ctx: &mut CallbackContext<'_>) {
        self.events.lock().unwrap().push("epoch_begin".into());
    }
    fn on_batch_begin(&mut self, _ctx: &mut CallbackContext<'_>, _batch: &mut Batch) {
        self.events.lock().unwrap().push("batch_begin".into());
    }
    fn on_loss_begin(&mut self, _ctx: &mut CallbackContext<'_>, _output: &mut ndarray::Array2<f32>) {
        self.events.lock().unwrap().push("loss_begin".into());
    }
    fn on_backward_begin(&mut self, _ctx: &mut CallbackContext<'_>, _loss: &mut crate::train::loss::LossOutput) {
        self.events.lock().unwrap().push("backward_begin".into());
    }
    fn on_backward_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        self.events.lock().unwrap().push("backward_end".into());
        CallbackAction::Continue
    }
    fn on_step_end(&mut self, _ctx: &mut CallbackContext<'_>) {
        self.events.lock().unwrap().push("step_end".into());
    }
    fn on_batch_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        self.events.lock().unwrap().push("batch_end".into());
        CallbackAction::Continue
    }
    fn on_epoch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        let tag = if ctx.progress.last_metrics.is_some() { "epoch_end+val" } else { "epoch_end" };
        self.events.lock().unwrap().push(tag.into());
        CallbackAction::Continue
    }
    fn on_train_end(&mut self, _ctx: &mut CallbackContext<'_>) {
        self.events.lock().unwrap().push("train_end".into());
    }
    fn name(&self) -> &'static str {
        "EventLog"
    }
}

struct StopAt {
    iteration: usize,
}

impl Callback for StopAt {
    fn on_batch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        if ctx.progress.iteration + 1 >= self.iteration {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }
}

struct SkipEveryStep;

impl Callback for SkipEveryStep {
    fn on_backward_end(&mut self, _ctx: &mut CallbackContext<'_>) -> CallbackAction {
        CallbackAction::SkipStep
    }
}

#[test]
fn test_fit_event_order() {
    let mut learn = toy_learner(0, false);
    let events = Arc::new(Mutex::new(Vec::new()));
    learn.fit(1, 1e-2, None, vec![Box::new(EventLog { events: events.clone() })]).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events[0], "train_begin");
    assert_eq!(events[1], "epoch_begin");
    assert_eq!(
        &events[2..9],
        &["batch_begin", "loss_begin", "backward_begin", "backward_end", "step_end", "batch_end", "batch_begin"]
    );
    assert_eq!(events[events.len() - 2], "epoch_end+val");
    assert_eq!(events[events.len() - 1], "train_end");
    assert_eq!(events.iter().filter(|e| *e == "batch_end").count(), 3);
}

#[test]
fn test_fit_records_history() {
    let mut learn = toy_learner(1, false).with_metrics(vec![Box::new(Accuracy)]);
    let result = learn.fit(3, 1e-2, None, Vec::new()).unwrap();

    assert_eq!(result.epochs_run, 3);
    assert_eq!(result.iterations, 9);
    assert!(!result.stopped_early);
    assert_eq!(learn.recorder.lrs.len(), 9);
    assert_eq!(learn.recorder.losses.len(), 9);
    assert_eq!(learn.recorder.nb_batches, vec![3, 3, 3]);
    assert_eq!(learn.recorder.val_losses.len(), 3);
    assert_eq!(learn.recorder.metric_names, vec!["accuracy".to_string()]);
    assert_eq!(result.metrics.len(), 1);
    assert_eq!(result.val_loss, learn.recorder.val_losses.last().copied());
}

#[test]
fn test_fit_learns_separable_blobs() {
    let mut learn = toy_learner(2, false).with_metrics(vec![Box::new(Accuracy)]);
    let result = learn.fit(20, 1e-2, None, Vec::new()).unwrap();
    assert!(result.metrics[0] > 0.9, "accuracy {:?}", result.metrics);
    let first = learn.recorder.val_losses[0];
    assert!(result.val_loss.unwrap() < first);
}

#[test]
fn test_fit_stop_still_validates_epoch() {
    let mut learn = toy_learner(0, false);
    let result = learn.fit(5, 1e-2, None, vec![Box::new(StopAt { iteration: 2 })]).unwrap();
    assert!(result.stopped_early);
    assert_eq!(result.iterations, 2);
    assert_eq!(result.epochs_run, 1);
    assert_eq!(learn.recorder.nb_batches, vec![2]);
    assert_eq!(learn.recorder.val_losses.len(), 1);
}

#[test]
fn test_skip_step_leaves_weights() {
    let mut learn = toy_learner(0, false).with_wd(0.0);
    let before: Vec<_> = learn.model.params().iter().map(|p| p.data.clone()).collect();
    learn.fit(1, 1e-1, None, vec![Box::new(SkipEveryStep)]).unwrap();
    for (p, b) in learn.model.params().iter().zip(&before) {
        assert_eq!(&p.data, b);
    }
}

#[test]
fn test_callback_lifetimes() {
    let made = Arc::new(AtomicUsize::new(0));
    let mut learn = toy_learner(0, false);
    learn.add_callback(Box::new(StopAt { iteration: 100 }));
    let counter = made.clone();
    learn.callback_fns.push(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(SkipEveryStep) as Box<dyn Callback>
    }));

    learn.fit(1, 1e-3, None, vec![Box::new(StopAt { iteration: 100 })]).unwrap();
    learn.fit(1, 1e-3, None, Vec::new()).unwrap();
    assert_eq!(made.load(Ordering::SeqCst), 2);
    assert_eq!(learn.callbacks.len(), 1);
    assert!(learn.has_callback("Callback"));
    assert_eq!(learn.remove_callbacks("Callback"), 1);
    assert!(learn.callbacks.is_empty());
}

/// Corrupts the targets of the second batch
struct BreakTargets;

impl Callback for BreakTargets {
    fn on_batch_begin(&mut self, ctx: &mut CallbackContext<'_>, batch: &mut Batch) {
        if ctx.progress.iteration == 1 {
            batch.targets = Targets::Classes(vec![99; batch.size()]);
        }
    }
}

#[test]
fn test_train_end_runs_on_error() {
    let mut learn = toy_learner(0, false);
    let events = Arc::new(Mutex::new(Vec::new()));
    let err = learn
        .fit(1, 1e-2, None, vec![Box::new(BreakTargets), Box::new(EventLog { events: events.clone() })])
        .unwrap_err();
    assert!(matches!(err, Error::LabelOutOfRange { label: 99, n_classes: 3 }));
    assert_eq!(events.lock().unwrap().last().map(String::as_str), Some("train_end"));
}

#[test]
fn test_fit_sets_hyper_params() {
    let mut learn = toy_learner(0, true);
    learn.fit(1, LrSpec::up_to(1e-2), Some(0.1), Vec::new()).unwrap();
    assert_abs_diff_eq!(learn.opt.lrs()[0], 1e-3, epsilon = 1e-9);
    assert_abs_diff_eq!(learn.opt.lrs()[1], 1e-2, epsilon = 1e-9);
    assert_eq!(learn.opt.wd(), 0.1);
    learn.fit(1, 1e-3, None, Vec::new()).unwrap();
    assert_eq!(learn.opt.wd(), learn.wd);
}

#[test]
fn test_lr_range() {
    let learn = toy_learner(0, true);
    assert_eq!(learn.lr_range(0.1).unwrap(), vec![0.1, 0.1]);
    assert_eq!(learn.lr_range(LrSpec::up_to(1.0)).unwrap(), vec![0.1, 1.0]);
    let lrs = learn.lr_range(LrSpec::slice(1e-4, 1e-2)).unwrap();
    assert_abs_diff_eq!(lrs[0], 1e-4, epsilon = 1e-9);
    assert_abs_diff_eq!(lrs[1], 1e-2, epsilon = 1e-8);
    assert_eq!(learn.lr_range(vec![0.1, 0.2]).unwrap(), vec![0.1, 0.2]);
    assert!(matches!(learn.lr_range(vec![0.1]), Err(Error::LayerGroups { expected: 2, actual: 1 })));
    assert!(learn.lr_range(f32::NAN).is_err());
    assert!(learn.lr_range(LrSpec::slice(0.0, 1.0)).is_err());

    let single = toy_learner(0, false);
    assert_eq!(single.lr_range(LrSpec::slice(1e-4, 1e-2)).unwrap(), vec![1e-2]);
    assert_eq!(single.lr_range(LrSpec::up_to(1e-2)).unwrap(), vec![1e-2]);
}

#[test]
fn test_even_mults() {
    let v = even_mults(1e-3, 1e-1, 3);
    assert_abs_diff_eq!(v[1], 1e-2, epsilon = 1e-7);
    assert_eq!(even_mults(1.0, 2.0, 1), vec![2.0]);
    assert!(even_mults(1.0, 2.0, 0).is_empty());
}

#[test]
fn test_lr_spec_serde_untagged() {
    let s: LrSpec = serde_yaml::from_str("0.01").unwrap();
    assert_eq!(s, LrSpec::Scalar(0.01));
    let s: LrSpec = serde_yaml::from_str("[0.001, 0.01]").unwrap();
    assert_eq!(s, LrSpec::PerGroup(vec![0.001, 0.01]));
    let s: LrSpec = serde_yaml::from_str("{start: 0.0001, stop: 0.01}").unwrap();
    assert_eq!(s, LrSpec::slice(0.0001, 0.01));
    let s: LrSpec = serde_yaml::from_str("{stop: 0.01}").unwrap();
    assert_eq!(s, LrSpec::up_to(0.01));
}

#[test]
fn test_freeze_respects_train_bn() {
    let mut learn = toy_learner(0, true);
    learn.freeze();
    let flags: Vec<_> = learn.model.params().iter().map(|p| p.requires_grad).collect();
    // Linear(w, b), BatchNorm(gamma, beta) in group 0; head in group 1
    assert_eq!(flags, vec![false, false, true, true, true, true]);

    learn.train_bn = false;
    learn.freeze();
    let flags: Vec<_> = learn.model.params().iter().map(|p| p.requires_grad).collect();
    assert_eq!(flags, vec![false, false, false, false, true, true]);

    learn.unfreeze();
    assert!(learn.model.params().iter().all(|p| p.requires_grad));
}

#[test]
fn test_get_preds() {
    let mut learn = toy_learner(0, false);
    let preds = learn.get_preds(DatasetType::Valid, true).unwrap();
    assert_eq!(preds.probs.dim(), (12, 3));
    assert_eq!(preds.targets.len(), 12);
    assert_eq!(preds.losses.as_ref().map(|l| l.len()), Some(12));
    for row in preds.probs.rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-5);
    }

    let train = learn.get_preds(DatasetType::Train, false).unwrap();
    assert_eq!(train.probs.nrows(), 48);
    assert!(train.losses.is_none());
    assert!(matches!(learn.get_preds(DatasetType::Test, false), Err(Error::EmptyData(_))));
}

#[test]
fn test_validate_matches_preds() {
    let mut learn = toy_learner(3, false);
    let (val_loss, _) = learn.validate(DatasetType::Valid).unwrap();
    let preds = learn.get_preds(DatasetType::Valid, true).unwrap();
    let mean = preds.losses.unwrap().mean().unwrap();
    assert_abs_diff_eq!(val_loss, mean, epsilon = 1e-5);
}

#[test]
fn test_map_loss_func() {
    let mut learn = toy_learner(0, false);
    learn.map_loss_func(|inner| {
        assert_eq!(inner.name(), "CrossEntropy");
        inner
    });
    assert_eq!(learn.loss_func.name(), "CrossEntropy");
}
