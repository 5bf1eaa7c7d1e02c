//! Training host: learner, callbacks, losses, metrics and history
//!
//! - `Learner` - binds model, data, optimizer and loss; runs `fit`
//! - `callback` - event hooks policies are built on
//! - `Recorder` - per-iteration and per-epoch history of the last fit

pub mod callback;
pub mod learner;
pub mod loss;
pub mod metrics;
mod recorder;

pub use callback::{Callback, CallbackAction, CallbackContext, CallbackFn, CallbackManager, Progress};
pub use learner::{even_mults, FitResult, Learner, LrSpec, Preds};
pub use loss::{CrossEntropyLoss, LossFn, LossOutput};
pub use metrics::{Accuracy, ErrorRate, Metric};
pub use recorder::{Recorder, SmoothenValue};
