//! Keep frozen batch-norm layers in eval mode

use crate::train::callback::{Callback, CallbackContext};

/// Puts batch-norm layers whose parameters are all frozen in eval mode at
/// the start of every epoch, so their running statistics stay put
#[derive(Debug, Default, Clone, Copy)]
pub struct BnFreeze;

impl Callback for BnFreeze {
    fn on_epoch_begin(&mut self, ctx: &mut CallbackContext<'_>) {
        ctx.model.set_bn_eval();
    }

    fn name(&self) -> &'static str {
        "BnFreeze"
    }
}
