//! Settle detection: a debounce over the continuous weight signal.
//!
//! The reading is flagged stable only once consecutive readings have stayed
//! within `delta_g` of each other for at least `stable_ms`. A single larger
//! step clears the flag at once and restarts the quiet-period timer.

use crate::config::StabilityCfg;

#[derive(Debug, Clone)]
pub struct StabilityDetector {
    delta_g: f32,
    stable_ms: u64,
    last_grams: f32,
    /// Last moment the reading moved by more than `delta_g`.
    last_ref_ms: u64,
    stable: bool,
}

impl StabilityDetector {
    pub fn new(cfg: &StabilityCfg) -> Self {
        Self {
            delta_g: cfg.delta_g,
            stable_ms: cfg.stable_ms,
            last_grams: 0.0,
            last_ref_ms: 0,
            stable: false,
        }
    }

    /// Feed this cycle's reading taken at `now_ms`; returns the stable flag.
    pub fn update(&mut self, grams: f32, now_ms: u64) -> bool {
        let delta = (grams - self.last_grams).abs();
        if delta <= self.delta_g {
            if now_ms.saturating_sub(self.last_ref_ms) >= self.stable_ms {
                self.stable = true;
            }
        } else {
            // also taken for NaN deltas
            self.stable = false;
            self.last_ref_ms = now_ms;
        }
        self.last_grams = grams;
        self.stable
    }

    /// Clear the flag and restart the quiet period without a new reading
    /// (used when a sample could not be acquired).
    pub fn invalidate(&mut self, now_ms: u64) {
        self.stable = false;
        self.last_ref_ms = now_ms;
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    pub fn last_grams(&self) -> f32 {
        self.last_grams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(delta_g: f32, stable_ms: u64) -> StabilityDetector {
        StabilityDetector::new(&StabilityCfg { delta_g, stable_ms })
    }

    #[test]
    fn becomes_stable_after_quiet_period() {
        let mut d = detector(1.0, 700);
        // step from the initial 0 g arms the timer at t=0
        assert!(!d.update(100.0, 0));
        assert!(!d.update(100.4, 20));
        assert!(!d.update(100.1, 680));
        assert!(d.update(100.2, 700));
        assert!(d.update(99.6, 720));
    }

    #[test]
    fn single_excursion_clears_and_restarts_timer() {
        let mut d = detector(1.0, 100);
        d.update(10.0, 0);
        assert!(d.update(10.0, 100));
        assert!(!d.update(12.0, 120));
        // quiet again, but only 90 ms since the excursion
        assert!(!d.update(12.0, 210));
        assert!(d.update(12.0, 220));
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut d = detector(0.5, 0);
        d.update(0.0, 0);
        assert!(d.update(0.5, 1));
        assert!(!d.update(1.25, 2));
    }

    #[test]
    fn slow_drift_below_threshold_still_settles() {
        let mut d = detector(1.0, 100);
        let mut g = 0.0;
        let mut stable = false;
        for t in (0..=200).step_by(20) {
            g += 0.5;
            stable = d.update(g, t);
        }
        assert!(stable);
    }

    #[test]
    fn invalidate_clears_flag() {
        let mut d = detector(1.0, 50);
        d.update(0.0, 0);
        assert!(d.update(0.0, 60));
        d.invalidate(70);
        assert!(!d.is_stable());
        assert!(!d.update(0.0, 100));
        assert!(d.update(0.0, 120));
    }
}
