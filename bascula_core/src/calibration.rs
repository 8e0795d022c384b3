//! Raw→grams calibration: tare offset plus linear scale factor.
//!
//! `CalibrationEngine` owns the only copy of `CalibrationState`. Both
//! mutations (`tare`, `calibrate`) write the new value through to the store
//! first and commit it in memory only once the write succeeded, so the
//! device and the store never disagree.

use std::time::Duration;

use bascula_traits::{BoxError, Clock, Scale, Storage};

use crate::config::{CalibrationCfg, Timeouts};
use crate::error::CalibrationError;
use crate::hw_error::map_hw_error;

/// Store key of the scale factor (grams per net count).
pub const KEY_SCALE_FACTOR: &str = "cal_f";
/// Store key of the tare offset (raw counts).
pub const KEY_TARE_OFFSET: &str = "tare";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationState {
    pub scale_factor: f32,
    pub tare_offset: i32,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            tare_offset: 0,
        }
    }
}

impl CalibrationState {
    /// `(raw - tare_offset) * scale_factor`, with the subtraction done in i64.
    #[inline]
    pub fn raw_to_grams(&self, raw: i32) -> f32 {
        let net = i64::from(raw) - i64::from(self.tare_offset);
        net as f32 * self.scale_factor
    }

    /// Read the persisted state; absent keys take their defaults.
    pub fn load<St: Storage + ?Sized>(store: &St) -> Result<Self, BoxError> {
        let defaults = Self::default();
        let scale_factor = store
            .get_f32(KEY_SCALE_FACTOR)?
            .unwrap_or(defaults.scale_factor);
        let tare_offset = store
            .get_i32(KEY_TARE_OFFSET)?
            .unwrap_or(defaults.tare_offset);
        Ok(Self {
            scale_factor,
            tare_offset,
        })
    }
}

/// Sum `samples` consecutive raw reads, sleeping `settle` after each one, and
/// return the truncating integer mean.
///
/// Any failed read aborts the whole average.
pub fn settle_and_average<S: Scale + ?Sized>(
    scale: &mut S,
    clock: &dyn Clock,
    samples: u32,
    settle: Duration,
    timeout: Duration,
) -> Result<i32, BoxError> {
    let n = samples.max(1);
    let mut acc: i64 = 0;
    for _ in 0..n {
        acc += i64::from(scale.read(timeout)?);
        clock.sleep(settle);
    }
    // mean of i32 values always fits back into i32
    Ok((acc / i64::from(n)) as i32)
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    state: CalibrationState,
    samples: u32,
    settle: Duration,
    sensor_timeout: Duration,
}

impl CalibrationEngine {
    pub fn new(state: CalibrationState, cfg: &CalibrationCfg, timeouts: &Timeouts) -> Self {
        Self {
            state,
            samples: cfg.samples.max(1),
            settle: Duration::from_millis(cfg.settle_ms),
            sensor_timeout: Duration::from_millis(timeouts.sensor_ms),
        }
    }

    /// Build from the persisted state. A store that cannot be read is not
    /// fatal: the fault is logged and the defaults are used.
    pub fn from_store<St: Storage + ?Sized>(
        store: &St,
        cfg: &CalibrationCfg,
        timeouts: &Timeouts,
    ) -> Self {
        let state = match CalibrationState::load(store) {
            Ok(s) if s.scale_factor.is_finite() => s,
            Ok(s) => {
                tracing::warn!(
                    scale_factor = s.scale_factor,
                    "persisted scale factor is not finite; using defaults"
                );
                CalibrationState::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "calibration store unreadable; using defaults");
                CalibrationState::default()
            }
        };
        tracing::info!(
            scale_factor = state.scale_factor,
            tare_offset = state.tare_offset,
            "calibration loaded"
        );
        Self::new(state, cfg, timeouts)
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    #[inline]
    pub fn raw_to_grams(&self, raw: i32) -> f32 {
        self.state.raw_to_grams(raw)
    }

    /// Take one fresh raw sample as the new zero. Returns the stored offset.
    pub fn tare<S, St>(&mut self, scale: &mut S, store: &mut St) -> Result<i32, CalibrationError>
    where
        S: Scale + ?Sized,
        St: Storage + ?Sized,
    {
        let raw = scale
            .read(self.sensor_timeout)
            .map_err(|e| CalibrationError::Sensor(map_hw_error(e.as_ref()).to_string()))?;
        store.put_i32(KEY_TARE_OFFSET, raw).map_err(|e| {
            tracing::error!(error = %e, "failed to persist tare offset");
            CalibrationError::Storage(e.to_string())
        })?;
        self.state.tare_offset = raw;
        tracing::info!(tare_offset = raw, "tare saved");
        Ok(raw)
    }

    /// Derive the scale factor from a known reference weight on the platform.
    /// Returns the stored factor.
    pub fn calibrate<S, St>(
        &mut self,
        reference_g: f32,
        scale: &mut S,
        store: &mut St,
        clock: &dyn Clock,
    ) -> Result<f32, CalibrationError>
    where
        S: Scale + ?Sized,
        St: Storage + ?Sized,
    {
        if !(reference_g.is_finite() && reference_g > 0.0) {
            return Err(CalibrationError::InvalidWeight);
        }
        let mean = settle_and_average(
            scale,
            clock,
            self.samples,
            self.settle,
            self.sensor_timeout,
        )
        .map_err(|e| CalibrationError::Sensor(map_hw_error(e.as_ref()).to_string()))?;

        let net = i64::from(mean) - i64::from(self.state.tare_offset);
        if net == 0 {
            return Err(CalibrationError::ZeroNetRaw);
        }
        let factor = reference_g / net as f32;
        tracing::debug!(mean, net, reference_g, factor, "calibration average");

        store.put_f32(KEY_SCALE_FACTOR, factor).map_err(|e| {
            tracing::error!(error = %e, "failed to persist scale factor");
            CalibrationError::Storage(e.to_string())
        })?;
        self.state.scale_factor = factor;
        tracing::info!(scale_factor = factor, "calibration saved");
        Ok(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedScale;
    use crate::store::MemoryStore;
    use bascula_traits::clock::test_clock::TestClock;

    fn engine(state: CalibrationState) -> CalibrationEngine {
        CalibrationEngine::new(state, &CalibrationCfg::default(), &Timeouts::default())
    }

    #[test]
    fn raw_to_grams_is_pure() {
        let s = CalibrationState {
            scale_factor: 0.5,
            tare_offset: 100,
        };
        let a = s.raw_to_grams(300);
        assert_eq!(a, 100.0);
        assert_eq!(s.raw_to_grams(300), a);
    }

    #[test]
    fn raw_to_grams_does_not_overflow_on_extremes() {
        let s = CalibrationState {
            scale_factor: 1.0,
            tare_offset: i32::MIN,
        };
        assert!(s.raw_to_grams(i32::MAX).is_finite());
    }

    #[test]
    fn tare_zeroes_current_reading() {
        let mut e = engine(CalibrationState::default());
        let mut scale = ScriptedScale::constant(12_345);
        let mut store = MemoryStore::new();
        assert_eq!(e.tare(&mut scale, &mut store), Ok(12_345));
        assert_eq!(e.raw_to_grams(12_345), 0.0);
        assert_eq!(store.get_i32(KEY_TARE_OFFSET).unwrap(), Some(12_345));
    }

    #[test]
    fn average_truncates_and_sleeps_between_samples() {
        let clock = TestClock::new();
        let start = clock.now();
        let mut scale = ScriptedScale::from_samples([10, 11, 11, 11]);
        let mean = settle_and_average(
            &mut scale,
            &clock,
            4,
            Duration::from_millis(5),
            Duration::from_millis(150),
        )
        .unwrap();
        // 43 / 4 = 10.75
        assert_eq!(mean, 10);
        assert_eq!(clock.ms_since(start), 20);
    }

    #[test]
    fn negative_mean_truncates_toward_zero() {
        let clock = TestClock::new();
        let mut scale = ScriptedScale::from_samples([-10, -11]);
        let mean = settle_and_average(
            &mut scale,
            &clock,
            2,
            Duration::ZERO,
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(mean, -10);
    }

    #[test]
    fn failed_tare_read_leaves_state() {
        let mut e = engine(CalibrationState {
            scale_factor: 2.0,
            tare_offset: 7,
        });
        let mut scale = ScriptedScale::failing("no data ready");
        let mut store = MemoryStore::new();
        assert!(matches!(
            e.tare(&mut scale, &mut store),
            Err(CalibrationError::Sensor(_))
        ));
        assert_eq!(e.state().tare_offset, 7);
        assert_eq!(store.get_i32(KEY_TARE_OFFSET).unwrap(), None);
    }

    #[test]
    fn store_write_failure_is_not_committed() {
        let mut e = engine(CalibrationState::default());
        let mut scale = ScriptedScale::constant(1500);
        let mut store = MemoryStore::new().with_failing_writes(true);
        let clock = TestClock::new();
        assert!(matches!(
            e.tare(&mut scale, &mut store),
            Err(CalibrationError::Storage(_))
        ));
        assert!(matches!(
            e.calibrate(500.0, &mut scale, &mut store, &clock),
            Err(CalibrationError::Storage(_))
        ));
        assert_eq!(e.state(), CalibrationState::default());
    }

    #[test]
    fn load_uses_defaults_for_missing_keys() {
        let mut store = MemoryStore::new();
        store.put_i32(KEY_TARE_OFFSET, -42).unwrap();
        let s = CalibrationState::load(&store).unwrap();
        assert_eq!(s.tare_offset, -42);
        assert_eq!(s.scale_factor, 1.0);
    }
}
