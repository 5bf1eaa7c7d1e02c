//! Callback system for training events
//!
//! Hooks fire in loop order:
//! - `on_train_begin` / `on_train_end`
//! - `on_epoch_begin` / `on_epoch_end`
//! - `on_batch_begin` / `on_loss_begin` / `on_backward_begin`
//! - `on_backward_end` / `on_step_end` / `on_batch_end`
//!
//! # Example
//!
//! ```rust
//! use ciclo::train::callback::{Callback, CallbackAction, CallbackContext};
//!
//! struct StopAfter(usize);
//!
//! impl Callback for StopAfter {
//!     fn on_batch_end(&mut self, ctx: &mut CallbackContext<'_>) -> CallbackAction {
//!         if ctx.progress.iteration + 1 >= self.0 {
//!             CallbackAction::Stop
//!         } else {
//!             CallbackAction::Continue
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "StopAfter"
//!     }
//! }
//! ```

mod manager;
mod traits;

pub use manager::CallbackManager;
pub use traits::{Callback, CallbackAction, CallbackContext, CallbackFn, Progress};
