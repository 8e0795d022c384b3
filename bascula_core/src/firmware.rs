//! The weighing cycle (`Firmware`).
//!
//! One `cycle()` is: read a raw sample, feed the median window, convert the
//! median to grams, smooth, update the stability flag, emit one status frame,
//! then drain the host channel and dispatch any complete command lines.
//! Pacing between cycles is left to `runner`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bascula_traits::clock::{Clock, MonotonicClock};
use bascula_traits::{HostLink, Scale, Storage};

use crate::calibration::{CalibrationEngine, CalibrationState};
use crate::config::FirmwareCfg;
use crate::error::{BuildError, FirmwareError, Result};
use crate::hw_error::map_hw_error;
use crate::median::{MEDIAN_WINDOW, MedianWindow};
use crate::protocol::{Command, CommandLineBuffer, Reply, StatusFrame};
use crate::smoothing::Smoother;
use crate::stability::StabilityDetector;

/// Bytes pulled from the host link per read.
const DRAIN_CHUNK: usize = 64;

pub struct Firmware<S: Scale, L: HostLink, St: Storage> {
    scale: S,
    link: L,
    store: St,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,

    median: MedianWindow<MEDIAN_WINDOW>,
    smoother: Smoother,
    stability: StabilityDetector,
    calibration: CalibrationEngine,
    line: CommandLineBuffer,

    device_id: String,
    sensor_timeout: Duration,
    period: Duration,

    last_frame: StatusFrame,
    booted: bool,
    cycles: u64,
    sensor_faults: u64,
}

impl<S: Scale, L: HostLink, St: Storage> core::fmt::Debug for Firmware<S, L, St> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Firmware")
            .field("device_id", &self.device_id)
            .field("calibration", &self.calibration.state())
            .field("last_frame", &self.last_frame)
            .field("cycles", &self.cycles)
            .finish()
    }
}

impl<S: Scale, L: HostLink, St: Storage> Firmware<S, L, St> {
    /// Validate `cfg`, load the persisted calibration from `store` and wire
    /// up the pipeline. `clock` defaults to `MonotonicClock`.
    pub fn new(
        scale: S,
        link: L,
        store: St,
        cfg: FirmwareCfg,
        clock: Option<Arc<dyn Clock + Send + Sync>>,
    ) -> Result<Self> {
        if cfg.filter.loop_hz == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "loop_hz must be > 0",
            )));
        }
        if !(cfg.filter.iir_alpha > 0.0 && cfg.filter.iir_alpha <= 1.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "iir_alpha must be in (0, 1]",
            )));
        }
        if cfg.protocol.cmd_max_len == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "cmd_max_len must be > 0",
            )));
        }
        if cfg.protocol.device_id.is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "device_id must not be empty",
            )));
        }
        if cfg.timeouts.sensor_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "sensor_ms must be >= 1",
            )));
        }

        let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();
        let calibration =
            CalibrationEngine::from_store(&store, &cfg.calibration, &cfg.timeouts);

        Ok(Self {
            scale,
            link,
            store,
            clock,
            epoch,
            median: MedianWindow::new(),
            smoother: Smoother::new(cfg.filter.iir_alpha),
            stability: StabilityDetector::new(&cfg.stability),
            calibration,
            line: CommandLineBuffer::new(cfg.protocol.cmd_max_len),
            device_id: cfg.protocol.device_id,
            sensor_timeout: Duration::from_millis(cfg.timeouts.sensor_ms),
            period: cfg.filter.period(),
            last_frame: StatusFrame {
                grams: 0.0,
                stable: false,
            },
            booted: false,
            cycles: 0,
            sensor_faults: 0,
        })
    }

    /// Announce the device on the host channel. Only the first call writes.
    pub fn boot(&mut self) -> Result<()> {
        if self.booted {
            return Ok(());
        }
        let hello = Reply::Hello(self.device_id.clone());
        self.send(&hello.to_string())?;
        self.booted = true;
        let cal = self.calibration.state();
        tracing::info!(
            device_id = %self.device_id,
            scale_factor = cal.scale_factor,
            tare_offset = cal.tare_offset,
            "boot"
        );
        Ok(())
    }

    /// Run one iteration of the loop (without the pacing delay) and return
    /// the frame that was emitted.
    pub fn cycle(&mut self) -> Result<StatusFrame> {
        let now_ms = self.clock.ms_since(self.epoch);
        let frame = self.acquire(now_ms);
        self.send(&frame.to_string())?;
        self.last_frame = frame;
        self.drain_host()?;
        self.cycles += 1;
        Ok(frame)
    }

    fn acquire(&mut self, now_ms: u64) -> StatusFrame {
        let raw = match self.scale.read(self.sensor_timeout) {
            Ok(raw) => raw,
            Err(e) => {
                self.sensor_faults += 1;
                let err = map_hw_error(e.as_ref());
                tracing::warn!(error = %err, faults = self.sensor_faults, "sensor read failed");
                self.stability.invalidate(now_ms);
                return StatusFrame {
                    grams: self.last_frame.grams,
                    stable: false,
                };
            }
        };
        self.median.add(raw);
        let grams = if self.median.is_warm() {
            let g = self.calibration.raw_to_grams(self.median.median());
            self.smoother.update(g)
        } else {
            self.calibration.raw_to_grams(raw)
        };
        let stable = self.stability.update(grams, now_ms);
        tracing::trace!(raw, grams, stable, "sample");
        StatusFrame { grams, stable }
    }

    /// Pull every pending host byte through the line buffer and answer each
    /// complete line. Stops once the link reports nothing pending. Returns
    /// the number of replies sent.
    fn drain_host(&mut self) -> Result<usize> {
        let mut buf = [0u8; DRAIN_CHUNK];
        let mut replies = 0;
        loop {
            let n = self
                .link
                .read_available(&mut buf)
                .map_err(|e| eyre::Report::new(FirmwareError::Link(e.to_string())))?;
            if n == 0 {
                break;
            }
            for &b in &buf[..n] {
                if let Some(cmd) = self.line.push_byte(b) {
                    let reply = self.dispatch(cmd);
                    self.send(&reply.to_string())?;
                    replies += 1;
                }
            }
        }
        Ok(replies)
    }

    /// Execute one tokenized command and produce its reply line.
    pub fn dispatch(&mut self, cmd: Command) -> Reply {
        tracing::debug!(?cmd, "command");
        let reply = match cmd {
            Command::Tare => match self.calibration.tare(&mut self.scale, &mut self.store) {
                Ok(_) => {
                    self.smoother.reset();
                    Reply::AckTare
                }
                Err(e) => Reply::from(&e),
            },
            Command::Calibrate { weight_g } => match self.calibration.calibrate(
                weight_g,
                &mut self.scale,
                &mut self.store,
                self.clock.as_ref(),
            ) {
                Ok(factor) => {
                    self.smoother.reset();
                    Reply::AckCalibrate(factor)
                }
                Err(e) => Reply::from(&e),
            },
            Command::Overflow => Reply::ErrCmdLen,
            Command::Unknown(_) => Reply::ErrUnknownCmd,
        };
        if !matches!(reply, Reply::AckTare | Reply::AckCalibrate(_)) {
            tracing::debug!(%reply, "command rejected");
        }
        reply
    }

    fn send(&mut self, line: &str) -> Result<()> {
        self.link
            .write_line(line)
            .map_err(|e| eyre::Report::new(FirmwareError::Link(e.to_string())))
    }

    /// Target time between cycle starts.
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn calibration(&self) -> CalibrationState {
        self.calibration.state()
    }

    pub fn last_frame(&self) -> StatusFrame {
        self.last_frame
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sensor_faults(&self) -> u64 {
        self.sensor_faults
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn scale_mut(&mut self) -> &mut S {
        &mut self.scale
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn store(&self) -> &St {
        &self.store
    }
}
