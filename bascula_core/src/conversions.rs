//! `From` implementations bridging `bascula_config` types to runtime types.

use crate::config::{
    CalibrationCfg, FilterCfg, FirmwareCfg, ProtocolCfg, StabilityCfg, Timeouts,
};

// ── FilterCfg ────────────────────────────────────────────────────────────────

impl From<&bascula_config::FilterCfg> for FilterCfg {
    fn from(c: &bascula_config::FilterCfg) -> Self {
        Self {
            iir_alpha: c.iir_alpha,
            loop_hz: c.loop_hz,
        }
    }
}

// ── StabilityCfg ─────────────────────────────────────────────────────────────

impl From<&bascula_config::StabilityCfg> for StabilityCfg {
    fn from(c: &bascula_config::StabilityCfg) -> Self {
        Self {
            delta_g: c.delta_g,
            stable_ms: c.stable_ms,
        }
    }
}

// ── ProtocolCfg ──────────────────────────────────────────────────────────────

impl From<&bascula_config::ProtocolCfg> for ProtocolCfg {
    fn from(c: &bascula_config::ProtocolCfg) -> Self {
        Self {
            cmd_max_len: c.cmd_max_len,
            device_id: c.device_id.clone(),
        }
    }
}

// ── CalibrationCfg ───────────────────────────────────────────────────────────

impl From<&bascula_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &bascula_config::CalibrationCfg) -> Self {
        Self {
            samples: c.samples,
            settle_ms: c.settle_ms,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&bascula_config::Hardware> for Timeouts {
    fn from(c: &bascula_config::Hardware) -> Self {
        Self {
            sensor_ms: c.sensor_read_timeout_ms,
        }
    }
}

// ── FirmwareCfg ──────────────────────────────────────────────────────────────

impl From<&bascula_config::Config> for FirmwareCfg {
    fn from(c: &bascula_config::Config) -> Self {
        Self {
            filter: (&c.filter).into(),
            stability: (&c.stability).into(),
            protocol: (&c.protocol).into(),
            calibration: (&c.calibration).into(),
            timeouts: (&c.hardware).into(),
        }
    }
}
