//! Training history and loss smoothing

/// Bias-corrected exponential moving average
#[derive(Debug, Clone)]
pub struct SmoothenValue {
    beta: f32,
    n: i32,
    mov_avg: f32,
    smooth: f32,
}

impl SmoothenValue {
    pub fn new(beta: f32) -> Self {
        Self { beta, n: 0, mov_avg: 0.0, smooth: 0.0 }
    }

    pub fn add_value(&mut self, value: f32) {
        self.n += 1;
        self.mov_avg = self.beta * self.mov_avg + (1.0 - self.beta) * value;
        self.smooth = self.mov_avg / (1.0 - self.beta.powi(self.n));
    }

    pub fn smooth(&self) -> f32 {
        self.smooth
    }
}

impl Default for SmoothenValue {
    fn default() -> Self {
        Self::new(0.98)
    }
}

/// Per-iteration and per-epoch history of the last fit
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    /// Learning rate (last layer group) used by each training batch
    pub lrs: Vec<f32>,
    pub moms: Vec<f32>,
    /// Smoothed training loss after each batch
    pub losses: Vec<f32>,
    /// Batches run in each epoch
    pub nb_batches: Vec<usize>,
    pub val_losses: Vec<f32>,
    /// Metric values per validated epoch, in `metric_names` order
    pub metrics: Vec<Vec<f32>>,
    pub metric_names: Vec<String>,
}

impl Recorder {
    /// Clear the history at the start of a fit
    pub fn begin(&mut self, metric_names: Vec<String>) {
        *self = Self { metric_names, ..Self::default() };
    }

    pub fn record_hyper_params(&mut self, lr: f32, mom: f32) {
        self.lrs.push(lr);
        self.moms.push(mom);
    }

    pub fn record_loss(&mut self, smooth_loss: f32) {
        self.losses.push(smooth_loss);
    }

    /// Close an epoch; `last_metrics` is the validation loss followed by metrics
    pub fn record_epoch(&mut self, num_batch: usize, last_metrics: Option<&[f32]>) {
        self.nb_batches.push(num_batch);
        if let Some((val_loss, metrics)) = last_metrics.and_then(|m| m.split_first()) {
            self.val_losses.push(*val_loss);
            self.metrics.push(metrics.to_vec());
        }
    }

    pub fn iterations(&self) -> usize {
        self.losses.len()
    }
}
