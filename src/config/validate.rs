//! Configuration validation
//!
//! Checks numeric ranges and cross-field consistency before a run starts.

use super::{Action, RunSpec};
use crate::train::LrSpec;
use crate::{Error, Result};

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfig(msg.into())
}

/// Validate a run description
pub fn validate_spec(spec: &RunSpec) -> Result<()> {
    let data = &spec.data;
    if data.blobs.n_classes < 2 {
        return Err(invalid(format!("need at least 2 classes, got {}", data.blobs.n_classes)));
    }
    if data.blobs.n_per_class == 0 || data.blobs.n_features == 0 {
        return Err(invalid("n_per_class and n_features must be positive"));
    }
    if data.batch_size == 0 {
        return Err(invalid("batch_size must be positive"));
    }
    if !(0.0..1.0).contains(&data.valid_pct) {
        return Err(invalid(format!("valid_pct must be in [0, 1), got {}", data.valid_pct)));
    }
    if !data.classes.is_empty() && data.classes.len() != data.blobs.n_classes {
        return Err(Error::ShapeMismatch {
            context: "class names",
            expected: data.blobs.n_classes,
            actual: data.classes.len(),
        });
    }

    if spec.model.hidden.contains(&0) {
        return Err(invalid("hidden layer widths must be positive"));
    }
    if spec.optimizer.wd < 0.0 {
        return Err(invalid(format!("weight decay must be non-negative, got {}", spec.optimizer.wd)));
    }

    let policies = &spec.policies;
    if let Some(mp) = &policies.mixed_precision {
        if !(mp.loss_scale > 0.0 && mp.loss_scale.is_finite()) {
            return Err(invalid(format!("loss_scale must be positive, got {}", mp.loss_scale)));
        }
        if mp.loss_scale > mp.precision.max_finite() {
            return Err(invalid(format!(
                "loss_scale {} overflows {} (max {})",
                mp.loss_scale,
                mp.precision,
                mp.precision.max_finite()
            )));
        }
    }
    if let Some(mixup) = &policies.mixup {
        mixup.validate()?;
    }
    if let Some(clip) = policies.clip {
        if clip < 0.0 {
            return Err(invalid(format!("clip must be non-negative, got {clip}")));
        }
    }

    let training = &spec.training;
    if training.epochs == 0 && training.action != Action::LrFind {
        return Err(invalid("epochs must be positive"));
    }
    let lr_ok = match &training.lr {
        LrSpec::Scalar(lr) => *lr > 0.0,
        LrSpec::PerGroup(lrs) => !lrs.is_empty() && lrs.iter().all(|&lr| lr > 0.0),
        LrSpec::Slice { start, stop } => *stop > 0.0 && start.is_none_or(|s| s > 0.0),
    };
    if !lr_ok {
        return Err(invalid(format!("learning rates must be positive, got {:?}", training.lr)));
    }
    match training.action {
        Action::FitOneCycle => training.one_cycle.validate()?,
        Action::LrFind => training.lr_find.validate()?,
        Action::Fit => {}
    }
    Ok(())
}
