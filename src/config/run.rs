//! Executing a run description

use super::{Action, InterpretSpec, OptimizerKind, RunSpec};
use crate::data::{blobs, DataBunch, DatasetType};
use crate::interpret::ClassificationInterpretation;
use crate::nn::Sequential;
use crate::optim::{Adam, Optimizer, SGD};
use crate::policy::{BnFreeze, LrFindResult, ShowGraph, TrainingPolicies};
use crate::train::{Accuracy, FitResult, Learner};
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use tracing::info;

/// Outcome of a run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fit: Option<FitResult>,
    pub lr_find: Option<LrFindResult>,
    /// Suggested learning rate from the range test
    pub suggestion: Option<f32>,
    pub interpretation: Option<InterpretationReport>,
}

/// Text summaries of an interpretation
#[derive(Debug, Clone, Default)]
pub struct InterpretationReport {
    pub confusion_matrix: String,
    pub most_confused: Vec<(String, String, usize)>,
    pub top_losses: Vec<(usize, f32)>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(fit) = &self.fit {
            writeln!(f, "Epochs run: {}", fit.epochs_run)?;
            writeln!(f, "Final train loss: {:.4}", fit.final_loss)?;
            if let Some(val_loss) = fit.val_loss {
                writeln!(f, "Validation loss: {val_loss:.4}")?;
            }
            if let Some(acc) = fit.metrics.first() {
                writeln!(f, "Accuracy: {:.2}%", acc * 100.0)?;
            }
            if fit.stopped_early {
                writeln!(f, "Stopped early")?;
            }
        }
        if let Some(found) = &self.lr_find {
            writeln!(f, "LR range test: {} iterations", found.len())?;
            match self.suggestion {
                Some(lr) => writeln!(f, "Suggested learning rate: {lr:.2e}")?,
                None => writeln!(f, "Too few iterations for a suggestion")?,
            }
        }
        if let Some(interp) = &self.interpretation {
            writeln!(f, "{}", interp.confusion_matrix)?;
            if !interp.most_confused.is_empty() {
                writeln!(f, "Most confused (actual, predicted, count):")?;
                for (actual, pred, count) in &interp.most_confused {
                    writeln!(f, "  {actual} -> {pred}: {count}")?;
                }
            }
            writeln!(f, "Top losses (index, loss):")?;
            for (idx, loss) in &interp.top_losses {
                writeln!(f, "  {idx}: {loss:.4}")?;
            }
        }
        Ok(())
    }
}

/// Build the data bunch and learner a run describes, with its policies attached
pub fn build_learner(spec: &RunSpec) -> Result<Learner> {
    let (x, y) = blobs(&spec.data.blobs, spec.seed)?;
    let mut data = DataBunch::from_arrays(
        x,
        y,
        spec.data.blobs.n_classes,
        spec.data.valid_pct,
        spec.data.batch_size,
        spec.seed,
    )?;
    if !spec.data.classes.is_empty() {
        data = data.with_classes(spec.data.classes.clone());
    }

    let mut sizes = vec![spec.data.blobs.n_features];
    sizes.extend(&spec.model.hidden);
    sizes.push(spec.data.blobs.n_classes);
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut model = Sequential::mlp(&sizes, spec.model.batch_norm, &mut rng)?;
    if !spec.model.layer_groups.is_empty() {
        model = model.with_layer_groups(&spec.model.layer_groups)?;
    }

    let opt: Box<dyn Optimizer> = match spec.optimizer.name {
        OptimizerKind::Adam => Box::new(Adam::default()),
        OptimizerKind::Sgd => Box::new(SGD::new()),
    };
    let mut learn = Learner::new(data, Box::new(model))
        .with_optimizer(opt)
        .with_metrics(vec![Box::new(Accuracy)])
        .with_wd(spec.optimizer.wd)
        .with_true_wd(spec.optimizer.true_wd)
        .with_train_bn(spec.policies.train_bn);

    let policies = &spec.policies;
    if policies.freeze {
        learn.freeze();
    }
    if let Some(mp) = &policies.mixed_precision {
        learn.to_fp16(mp);
    }
    if let Some(mixup) = &policies.mixup {
        learn.mixup(mixup)?;
    }
    if let Some(clip) = policies.clip {
        learn.clip_grad(clip);
    }
    if policies.bn_freeze {
        learn.add_callback(Box::new(BnFreeze));
    }
    if policies.show_graph {
        learn.add_callback(Box::new(ShowGraph::default()));
    }
    Ok(learn)
}

fn interpret(learn: &mut Learner, spec: &InterpretSpec) -> Result<InterpretationReport> {
    let interp = ClassificationInterpretation::from_learner(learn, DatasetType::Valid)?;
    Ok(InterpretationReport {
        confusion_matrix: interp.plot_confusion_matrix(&spec.plot),
        most_confused: interp.most_confused(spec.min_val),
        top_losses: interp.top_losses(spec.top_losses),
    })
}

/// Run the described training and return its report
pub fn execute(spec: &RunSpec) -> Result<RunReport> {
    super::validate_spec(spec)?;
    let mut learn = build_learner(spec)?;
    let training = &spec.training;
    info!(action = ?training.action, epochs = training.epochs, seed = spec.seed, "run started");

    let mut report = RunReport::default();
    match training.action {
        Action::Fit => {
            report.fit = Some(learn.fit(training.epochs, training.lr.clone(), training.wd, Vec::new())?);
        }
        Action::FitOneCycle => {
            report.fit = Some(learn.fit_one_cycle(
                training.epochs,
                training.lr.clone(),
                &training.one_cycle,
                training.wd,
                Vec::new(),
            )?);
        }
        Action::LrFind => {
            let found = learn.lr_find(&training.lr_find)?;
            report.suggestion = found.suggestion(10, 5);
            report.lr_find = Some(found);
        }
    }

    if let (Some(interp_spec), true) = (&spec.interpret, report.fit.is_some()) {
        if !learn.data.valid_dl.is_empty() {
            report.interpretation = Some(interpret(&mut learn, interp_spec)?);
        }
    }
    Ok(report)
}
