//! Simulated load cell for development without an HX711 attached.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bascula_traits::{BoxError, Scale};

/// Handle to change the simulated load while the scale is owned by the loop.
#[derive(Debug, Clone, Default)]
pub struct SimLoad(Arc<AtomicU32>);

impl SimLoad {
    pub fn set_grams(&self, grams: f32) {
        self.0.store(grams.to_bits(), Ordering::Relaxed);
    }

    pub fn grams(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Simulated amplifier: `baseline + load * counts_per_gram` plus bounded
/// pseudo-random noise and an occasional mechanical-shock spike.
#[derive(Debug)]
pub struct SimulatedScale {
    baseline_counts: i32,
    counts_per_gram: f32,
    noise_counts: u32,
    spike_every: u32,
    spike_counts: i32,
    load: SimLoad,
    rng: u32,
    reads: u64,
}

impl Default for SimulatedScale {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedScale {
    pub fn new() -> Self {
        Self {
            baseline_counts: 84_213,
            counts_per_gram: 420.0,
            noise_counts: 40,
            spike_every: 97,
            spike_counts: 25_000,
            load: SimLoad::default(),
            rng: 0x2545_F491,
            reads: 0,
        }
    }

    /// Noise-free variant; useful when exact counts matter.
    pub fn quiet() -> Self {
        Self {
            noise_counts: 0,
            spike_every: 0,
            ..Self::new()
        }
    }

    pub fn with_baseline(mut self, counts: i32) -> Self {
        self.baseline_counts = counts;
        self
    }

    pub fn with_counts_per_gram(mut self, counts_per_gram: f32) -> Self {
        self.counts_per_gram = counts_per_gram;
        self
    }

    pub fn load_handle(&self) -> SimLoad {
        self.load.clone()
    }

    fn next_noise(&mut self) -> i32 {
        if self.noise_counts == 0 {
            return 0;
        }
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let span = self.noise_counts.saturating_mul(2).saturating_add(1);
        (x % span) as i32 - self.noise_counts as i32
    }
}

impl Scale for SimulatedScale {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        self.reads = self.reads.wrapping_add(1);
        let signal = (self.load.grams() * self.counts_per_gram).round() as i32;
        let mut raw = self
            .baseline_counts
            .saturating_add(signal)
            .saturating_add(self.next_noise());
        if self.spike_every > 0 && self.reads % u64::from(self.spike_every) == 0 {
            raw = raw.saturating_add(self.spike_counts);
        }
        // HX711 output range
        Ok(raw.clamp(-8_388_608, 8_388_607))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_scale_tracks_load_exactly() {
        let mut scale = SimulatedScale::quiet()
            .with_baseline(1000)
            .with_counts_per_gram(10.0);
        let load = scale.load_handle();
        assert_eq!(scale.read(Duration::ZERO).unwrap(), 1000);
        load.set_grams(12.5);
        assert_eq!(scale.read(Duration::ZERO).unwrap(), 1125);
    }

    #[test]
    fn noise_stays_within_amplitude() {
        let mut scale = SimulatedScale {
            spike_every: 0,
            ..SimulatedScale::new()
        };
        for _ in 0..1000 {
            let raw = scale.read(Duration::ZERO).unwrap();
            assert!((raw - 84_213).abs() <= 40, "raw {raw} outside noise band");
        }
    }

    #[test]
    fn spikes_are_periodic() {
        let mut scale = SimulatedScale {
            noise_counts: 0,
            ..SimulatedScale::new()
        };
        let reads: Vec<i32> = (0..97).map(|_| scale.read(Duration::ZERO).unwrap()).collect();
        assert!(reads[..96].iter().all(|&r| r == 84_213));
        assert_eq!(reads[96], 84_213 + 25_000);
    }
}
