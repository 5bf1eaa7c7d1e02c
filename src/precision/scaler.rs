//! Loss scaler for mixed-precision training.

/// Number of overflow-free steps before a dynamic scale doubles
pub const DEFAULT_MAX_NOSKIP: usize = 1000;

/// Upper bound for a dynamic scale (2^24)
pub const MAX_LOSS_SCALE: f32 = 16_777_216.0;

/// Loss scaler for mixed-precision training
///
/// Multiplies the loss before the backward pass so that small gradients
/// survive half precision, and divides them back out before the optimizer
/// step. A static scaler never changes; a dynamic one halves on overflow and
/// doubles after `growth_interval` clean steps.
#[derive(Debug, Clone)]
pub struct LossScaler {
    /// Current loss scale
    scale: f32,
    /// Growth factor
    growth_factor: f32,
    /// Backoff factor
    backoff_factor: f32,
    /// Growth interval
    growth_interval: usize,
    /// Steps since last growth
    steps_since_growth: usize,
    /// Whether dynamic scaling is enabled
    dynamic: bool,
    /// Number of overflows encountered
    overflow_count: usize,
    /// Number of successful steps
    successful_steps: usize,
}

impl LossScaler {
    /// Create a scaler that always uses `scale`
    pub fn fixed(scale: f32) -> Self {
        Self {
            scale,
            growth_factor: 2.0,
            backoff_factor: 0.5,
            growth_interval: DEFAULT_MAX_NOSKIP,
            steps_since_growth: 0,
            dynamic: false,
            overflow_count: 0,
            successful_steps: 0,
        }
    }

    /// Create a dynamic scaler starting at `initial_scale`
    pub fn dynamic(initial_scale: f32, growth_interval: usize) -> Self {
        Self { dynamic: true, growth_interval: growth_interval.max(1), ..Self::fixed(initial_scale) }
    }

    /// Get current scale
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Scale a loss value
    pub fn scale_loss(&self, loss: f32) -> f32 {
        loss * self.scale
    }

    /// Unscale gradients in place and check for overflow
    ///
    /// Returns true if gradients are valid (no overflow), false otherwise.
    pub fn unscale_and_check<'a, I>(&self, grads: I) -> bool
    where
        I: IntoIterator<Item = &'a mut f32>,
    {
        let inv_scale = 1.0 / self.scale;
        let mut has_overflow = false;

        for grad in grads {
            *grad *= inv_scale;
            if !grad.is_finite() {
                has_overflow = true;
            }
        }

        !has_overflow
    }

    /// Update the scale after a step
    ///
    /// Pass `true` if gradients were valid.
    pub fn update(&mut self, grads_valid: bool) {
        if !self.dynamic {
            return;
        }

        if grads_valid {
            self.successful_steps += 1;
            self.steps_since_growth += 1;

            if self.steps_since_growth >= self.growth_interval && self.scale < MAX_LOSS_SCALE {
                self.scale *= self.growth_factor;
                self.steps_since_growth = 0;
            }
        } else {
            self.overflow_count += 1;
            self.scale *= self.backoff_factor;
            self.steps_since_growth = 0;

            // Ensure scale doesn't go too low
            self.scale = self.scale.max(1.0);
        }
    }

    /// Get overflow count
    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    /// Get successful step count
    pub fn successful_steps(&self) -> usize {
        self.successful_steps
    }

    /// Check if dynamic scaling is enabled
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

impl Default for LossScaler {
    fn default() -> Self {
        Self::fixed(512.0)
    }
}
