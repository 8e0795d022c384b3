#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the bascula firmware.
//!
//! `Config` and its sections are deserialized from TOML and checked by
//! `Config::validate`. Everything except `[pins]` has defaults for the stock
//! board (HX711 on GPIO 4/5, 50 Hz loop, 80-byte command lines).
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterCfg {
    /// Smoothing factor of the IIR stage, in (0.0, 1.0).
    pub iir_alpha: f32,
    /// Cycle loop rate in Hz.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StabilityCfg {
    /// Max change between consecutive readings (grams) that still counts as quiet.
    pub delta_g: f32,
    /// Quiet period required before the reading is flagged stable.
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProtocolCfg {
    /// Longest accepted command line, excluding the terminator.
    pub cmd_max_len: usize,
    /// Identifier sent in the boot `HELLO:<device_id>` line.
    pub device_id: String,
}

impl Default for ProtocolCfg {
    fn default() -> Self {
        Self {
            cmd_max_len: 80,
            device_id: "RPI-HX711".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Raw samples averaged by a `C:<weight>` calibration.
    pub samples: u32,
    /// Delay between those samples, letting the amplifier settle.
    pub settle_ms: u64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            samples: 20,
            settle_ms: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Hardware {
    /// Max time to wait for HX711 data-ready (DT low) before failing
    pub sensor_read_timeout_ms: u64,
    /// Clock pulses per conversion: 25 = channel A gain 128, 26 = B/32, 27 = A/64.
    pub gain_pulses: u8,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            sensor_read_timeout_ms: 150,
            gain_pulses: 25,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialCfg {
    /// UART device for the host link; stdin/stdout is used when absent.
    pub port: Option<String>,
    pub baud: u32,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageCfg {
    /// File backing the persisted calibration (`cal_f`, `tare`).
    pub path: String,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: "bascula_nvs.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub stability: StabilityCfg,
    #[serde(default)]
    pub protocol: ProtocolCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub hardware: Hardware,
    #[serde(default)]
    pub serial: SerialCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.hx711_dt == self.pins.hx711_sck {
            eyre::bail!("pins.hx711_dt and pins.hx711_sck must differ");
        }

        // Filter
        if !(self.filter.iir_alpha > 0.0 && self.filter.iir_alpha < 1.0) {
            eyre::bail!("filter.iir_alpha must be in (0.0, 1.0)");
        }
        if self.filter.loop_hz == 0 {
            eyre::bail!("filter.loop_hz must be > 0");
        }
        if self.filter.loop_hz > 1000 {
            eyre::bail!("filter.loop_hz must be <= 1000");
        }

        // Stability
        if !self.stability.delta_g.is_finite() || self.stability.delta_g.is_sign_negative() {
            eyre::bail!("stability.delta_g must be >= 0");
        }
        if self.stability.stable_ms > 5 * 60 * 1000 {
            eyre::bail!("stability.stable_ms is unreasonably large (>5min)");
        }

        // Protocol
        if self.protocol.cmd_max_len == 0 || self.protocol.cmd_max_len > 1024 {
            eyre::bail!("protocol.cmd_max_len must be in [1, 1024]");
        }
        let id = &self.protocol.device_id;
        if id.is_empty()
            || !id
                .bytes()
                .all(|b| b.is_ascii_graphic() && b != b':' && b != b',')
        {
            eyre::bail!("protocol.device_id must be non-empty printable ASCII without ':' or ','");
        }

        // Calibration
        if self.calibration.samples == 0 || self.calibration.samples > 1000 {
            eyre::bail!("calibration.samples must be in [1, 1000]");
        }
        if self.calibration.settle_ms > 1000 {
            eyre::bail!("calibration.settle_ms must be <= 1000");
        }

        // Hardware
        if self.hardware.sensor_read_timeout_ms == 0 {
            eyre::bail!("hardware.sensor_read_timeout_ms must be >= 1");
        }
        if !(25..=27).contains(&self.hardware.gain_pulses) {
            eyre::bail!("hardware.gain_pulses must be 25, 26 or 27");
        }

        // Serial
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if matches!(self.serial.port.as_deref(), Some("")) {
            eyre::bail!("serial.port must not be empty when set");
        }

        // Storage
        if self.storage.path.trim().is_empty() {
            eyre::bail!("storage.path must not be empty");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
