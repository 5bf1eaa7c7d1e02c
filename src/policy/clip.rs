//! Gradient clipping by global norm

use crate::optim::clip_grad_norm;
use crate::train::callback::{Callback, CallbackAction, CallbackContext};
use crate::train::Learner;
use tracing::{info, trace};

/// Clips gradients to a global norm of `clip` after each backward pass
#[derive(Debug, Clone, Copy)]
pub struct GradientClipping {
    pub clip: f32,
}

impl GradientClipping {
    pub fn new(clip: f32) -> Self {
        Self { clip }
    }
}

impl Callback for GradientClipping {
    fn on_backward_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
        if self.clip > 0.0 {
            let norm = clip_grad_norm(&mut ctx.model.params_mut(), self.clip);
            trace!(norm, clip = self.clip, "gradient norm");
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "GradientClipping"
    }
}

/// Clip gradients at `clip` in every later fit
pub fn clip_grad(learn: &mut Learner, clip: f32) -> &mut Learner {
    learn.callback_fns.push(Box::new(move || Box::new(GradientClipping::new(clip)) as Box<dyn Callback>));
    info!(clip, "gradient clipping enabled");
    learn
}
