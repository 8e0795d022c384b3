//! Runtime configuration for the firmware loop.
//!
//! These are the structs used by `Firmware` itself. They are separate from
//! the TOML-deserialized config in `bascula_config`; see `conversions`.

use std::time::Duration;

/// Signal conditioning and loop pacing.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// IIR smoothing factor in (0, 1); small values favour a steady display.
    pub iir_alpha: f32,
    /// Cycle rate in Hz.
    pub loop_hz: u32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            iir_alpha: 0.20,
            loop_hz: 50,
        }
    }
}

impl FilterCfg {
    /// Time between cycle starts: `1 / loop_hz`, never below 1 µs. A zero
    /// rate is read as 1 Hz.
    pub fn period(&self) -> Duration {
        let us = (1_000_000 / u64::from(self.loop_hz.max(1))).max(1);
        Duration::from_micros(us)
    }
}

/// Settle detection thresholds.
#[derive(Debug, Clone)]
pub struct StabilityCfg {
    /// Largest cycle-to-cycle change (grams) still counted as quiet.
    pub delta_g: f32,
    /// Quiet period before the reading is flagged stable.
    pub stable_ms: u64,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            delta_g: 1.0,
            stable_ms: 700,
        }
    }
}

/// Host protocol settings.
#[derive(Debug, Clone)]
pub struct ProtocolCfg {
    pub cmd_max_len: usize,
    pub device_id: String,
}

/// Default command line bound (excluding the terminator).
pub const CMD_MAX_LEN: usize = 80;

impl Default for ProtocolCfg {
    fn default() -> Self {
        Self {
            cmd_max_len: CMD_MAX_LEN,
            device_id: "RPI-HX711".to_string(),
        }
    }
}

/// Settle-and-average parameters of the `C:<weight>` procedure.
#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    pub samples: u32,
    pub settle_ms: u64,
}

/// Raw samples averaged per calibration.
pub const CAL_SAMPLES: u32 = 20;
/// Delay between calibration samples.
pub const CAL_SETTLE_MS: u64 = 5;

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            samples: CAL_SAMPLES,
            settle_ms: CAL_SETTLE_MS,
        }
    }
}

/// Timeouts and watchdogs.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Max sensor wait per read (ms).
    pub sensor_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { sensor_ms: 150 }
    }
}

/// Everything `Firmware` needs besides its peripherals.
#[derive(Debug, Clone, Default)]
pub struct FirmwareCfg {
    pub filter: FilterCfg,
    pub stability: StabilityCfg,
    pub protocol: ProtocolCfg,
    pub calibration: CalibrationCfg,
    pub timeouts: Timeouts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(50, 20_000)]
    #[case(1, 1_000_000)]
    #[case(3, 333_333)]
    #[case(0, 1_000_000)]
    #[case(u32::MAX, 1)]
    fn period_follows_loop_rate(#[case] loop_hz: u32, #[case] micros: u64) {
        let f = FilterCfg {
            loop_hz,
            ..FilterCfg::default()
        };
        assert_eq!(f.period(), Duration::from_micros(micros));
    }
}
