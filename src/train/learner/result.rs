//! Fit result types

/// Outcome of a call to `Learner::fit`
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Epochs that ran, including a partially run last epoch
    pub epochs_run: usize,
    /// Training iterations run
    pub iterations: usize,
    /// Last smoothed training loss
    pub final_loss: f32,
    /// Last validation loss, if validation ran
    pub val_loss: Option<f32>,
    /// Last metric values, in the learner's metric order
    pub metrics: Vec<f32>,
    /// Whether a callback stopped training
    pub stopped_early: bool,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}
