//! Single-pole IIR smoother for the displayed weight.

#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f32,
    value: f32,
    initialized: bool,
}

impl Smoother {
    /// `alpha` is clamped into (0, 1]; non-finite values fall back to 1.0
    /// (passthrough).
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 {
            alpha.min(1.0)
        } else {
            1.0
        };
        Self {
            alpha,
            value: 0.0,
            initialized: false,
        }
    }

    /// Blend `x` into the state and return the new smoothed value. The first
    /// update after construction or `reset()` seeds the state with `x`.
    #[inline]
    pub fn update(&mut self, x: f32) -> f32 {
        self.value = if self.initialized {
            (1.0 - self.alpha) * self.value + self.alpha * x
        } else {
            self.initialized = true;
            x
        };
        self.value
    }

    /// Mark a discontinuity; the next update seeds instead of blending.
    pub fn reset(&mut self) {
        self.initialized = false;
    }

    pub fn value(&self) -> Option<f32> {
        self.initialized.then_some(self.value)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}
