//! Live loss graph
//!
//! After every validated epoch the training and validation losses are
//! published to a [`GraphSink`]. The default sink renders them as Unicode
//! sparklines through `tracing`.

use crate::train::callback::{Callback, CallbackAction, CallbackContext};
use crate::train::Recorder;
use tracing::info;

/// Unicode block characters, lowest first
pub const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One frame of the loss graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphUpdate {
    /// `(iteration, smoothed training loss)`
    pub train: Vec<(f32, f32)>,
    /// `(cumulative batches, validation loss)`
    pub valid: Vec<(f32, f32)>,
    pub x_bounds: (f32, f32),
    pub y_bounds: (f32, f32),
}

impl GraphUpdate {
    /// Build a frame from the history; `n_epochs` sizes the x axis for the whole fit
    pub fn from_recorder(recorder: &Recorder, n_epochs: usize) -> Self {
        let train = recorder.losses.iter().enumerate().map(|(i, &l)| (i as f32, l)).collect();
        let valid = recorder
            .nb_batches
            .iter()
            .scan(0usize, |total, &n| {
                *total += n;
                Some(*total as f32)
            })
            .zip(&recorder.val_losses)
            .map(|(x, &l)| (x, l))
            .collect();

        let last_nb = recorder.nb_batches.last().copied().unwrap_or(0);
        let remaining = n_epochs.saturating_sub(recorder.nb_batches.len());
        let x_max = (remaining * last_nb + recorder.losses.len()) as f32;
        let y_max = recorder
            .losses
            .iter()
            .chain(&recorder.val_losses)
            .copied()
            .fold(0.0f32, f32::max);
        Self { train, valid, x_bounds: (0.0, x_max), y_bounds: (0.0, y_max) }
    }
}

/// Receives graph frames
pub trait GraphSink: Send {
    fn update(&mut self, update: &GraphUpdate);
}

/// Map values to sparkline characters within `[min, max]`
///
/// Values are subsampled to at most `width` characters.
pub fn sparkline(values: &[f32], width: usize, min: f32, max: f32) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }
    let values: Vec<f32> = if values.len() > width {
        let step = values.len() as f32 / width as f32;
        (0..width)
            .map(|i| values[((i as f32 * step) as usize).min(values.len() - 1)])
            .collect()
    } else {
        values.to_vec()
    };

    let range = max - min;
    if range < f32::EPSILON {
        return SPARK_CHARS[4].to_string().repeat(values.len());
    }
    values
        .iter()
        .map(|v| {
            let normalized = (v.clamp(min, max) - min) / range;
            SPARK_CHARS[((normalized * 7.0).round() as usize).min(7)]
        })
        .collect()
}

/// Logs each frame as two sparklines sharing the y range
#[derive(Debug, Clone, Copy)]
pub struct SparklineSink {
    pub width: usize,
}

impl Default for SparklineSink {
    fn default() -> Self {
        Self { width: 40 }
    }
}

impl SparklineSink {
    pub fn render(&self, update: &GraphUpdate) -> (String, String) {
        let (lo, hi) = update.y_bounds;
        let train: Vec<f32> = update.train.iter().map(|&(_, l)| l).collect();
        let valid: Vec<f32> = update.valid.iter().map(|&(_, l)| l).collect();
        (sparkline(&train, self.width, lo, hi), sparkline(&valid, self.width, lo, hi))
    }
}

impl GraphSink for SparklineSink {
    fn update(&mut self, update: &GraphUpdate) {
        let (train, valid) = self.render(update);
        info!(
            train = %train,
            valid = %valid,
            x_max = update.x_bounds.1,
            y_max = update.y_bounds.1,
            "loss graph"
        );
    }
}

/// Publishes the loss graph after each validated epoch
pub struct ShowGraph {
    sink: Box<dyn GraphSink>,
}

impl ShowGraph {
    pub fn new(sink: Box<dyn GraphSink>) -> Self {
        Self { sink }
    }
}

impl Default for ShowGraph {
    fn default() -> Self {
        Self::new(Box::new(SparklineSink::default()))
    }
}

impl Callback for ShowGraph {
    fn on_epoch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        if ctx.progress.last_metrics.is_some() {
            self.sink.update(&GraphUpdate::from_recorder(ctx.recorder, ctx.progress.n_epochs));
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "ShowGraph"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{toy_learner, ContextFixture};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Frames(Arc<Mutex<Vec<GraphUpdate>>>);

    impl GraphSink for Frames {
        fn update(&mut self, update: &GraphUpdate) {
            self.0.lock().unwrap().push(update.clone());
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            losses: vec![2.0, 1.5, 1.2, 1.0, 0.9],
            nb_batches: vec![3, 2],
            val_losses: vec![1.4, 2.5],
            ..Recorder::default()
        }
    }

    #[test]
    fn test_update_points_and_bounds() {
        let u = GraphUpdate::from_recorder(&recorder(), 4);
        assert_eq!(u.train[0], (0.0, 2.0));
        assert_eq!(u.train.len(), 5);
        assert_eq!(u.valid, vec![(3.0, 1.4), (5.0, 2.5)]);
        // two epochs left at 2 batches each, plus 5 done
        assert_eq!(u.x_bounds, (0.0, 9.0));
        assert_eq!(u.y_bounds, (0.0, 2.5));
    }

    #[test]
    fn test_sparkline_scales_to_range() {
        let s = sparkline(&[0.0, 1.0, 2.0], 10, 0.0, 2.0);
        let chars: Vec<char> = s.chars().collect();
        assert_eq!(chars, vec![SPARK_CHARS[0], SPARK_CHARS[4], SPARK_CHARS[7]]);
        assert_eq!(sparkline(&[], 10, 0.0, 1.0), "");
        assert_eq!(sparkline(&[1.0; 3], 10, 1.0, 1.0).chars().count(), 3);
    }

    #[test]
    fn test_sparkline_subsamples() {
        let values: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(sparkline(&values, 20, 0.0, 99.0).chars().count(), 20);
    }

    #[test]
    fn test_sparkline_sink_render() {
        let (train, valid) = SparklineSink { width: 10 }.render(&GraphUpdate::from_recorder(&recorder(), 2));
        assert_eq!(train.chars().count(), 5);
        assert_eq!(valid.chars().count(), 2);
        assert_eq!(valid.chars().last(), Some(SPARK_CHARS[7]));
    }

    #[test]
    fn test_no_update_without_metrics() {
        let frames = Frames::default();
        let mut fx = ContextFixture::new();
        let mut cb = ShowGraph::new(Box::new(frames.clone()));
        assert_eq!(cb.on_epoch_end(&mut fx.ctx()), CallbackAction::Continue);
        assert!(frames.0.lock().unwrap().is_empty());
        fx.progress.last_metrics = Some(vec![1.0]);
        cb.on_epoch_end(&mut fx.ctx());
        assert_eq!(frames.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_one_frame_per_epoch() {
        let frames = Frames::default();
        let mut learn = toy_learner(0, false);
        learn.fit(3, 1e-2, None, vec![Box::new(ShowGraph::new(Box::new(frames.clone())))]).unwrap();
        let frames = frames.0.lock().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].x_bounds, (0.0, 9.0));
        assert_eq!(frames[2].valid.len(), 3);
        assert_eq!(frames[2].valid[2].0, 9.0);
    }
}
