//! Command implementations: peripheral assembly, the weighing loop, and the
//! read-only inspection commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use bascula_core::error::Result as CoreResult;
use bascula_core::{
    CalibrationState, DynFirmware, FileStore, FirmwareCfg, RunOptions, RunStats, Timeouts,
};
use bascula_traits::{HostLink, Scale};
use eyre::WrapErr;

use crate::cli::RtLock;
use crate::rt::setup_rt_once;

/// Everything `run` needs beyond the config file.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub sim: bool,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub cycles: Option<u64>,
    pub stats: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: RtLock,
}

/// Open the raw sample source: the HX711 when built with `hardware`,
/// otherwise (or with `--sim`) the simulated load cell.
pub fn open_scale(cfg: &bascula_config::Config, sim: bool) -> eyre::Result<Box<dyn Scale>> {
    if sim {
        tracing::info!("using simulated load cell");
        return Ok(Box::new(bascula_hardware::SimulatedScale::new()));
    }
    #[cfg(feature = "hardware")]
    {
        let scale = bascula_hardware::Hx711Scale::new(
            cfg.pins.hx711_dt,
            cfg.pins.hx711_sck,
            cfg.hardware.gain_pulses,
        )
        .wrap_err("open hx711")?;
        tracing::info!(
            dt = cfg.pins.hx711_dt,
            sck = cfg.pins.hx711_sck,
            gain_pulses = cfg.hardware.gain_pulses,
            "hx711 ready"
        );
        Ok(Box::new(scale))
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = cfg;
        tracing::warn!("built without the `hardware` feature; using simulated load cell");
        Ok(Box::new(bascula_hardware::SimulatedScale::new()))
    }
}

/// Open the host channel: the serial port when one is configured, else
/// stdin/stdout.
pub fn open_link(
    cfg: &bascula_config::Config,
    port: Option<&str>,
    baud: Option<u32>,
) -> eyre::Result<Box<dyn HostLink>> {
    let port = port.or(cfg.serial.port.as_deref());
    let baud = baud.unwrap_or(cfg.serial.baud);
    match port {
        None => {
            tracing::info!("host link on stdin/stdout");
            Ok(Box::new(bascula_hardware::StdioLink::spawn()))
        }
        #[cfg(feature = "serial")]
        Some(path) => {
            let link = bascula_hardware::SerialLink::open(path, baud)
                .wrap_err_with(|| format!("open serial port {path}"))?;
            tracing::info!(port = path, baud, "host link on serial port");
            Ok(Box::new(link))
        }
        #[cfg(not(feature = "serial"))]
        Some(path) => {
            let _ = baud;
            eyre::bail!("serial port {path} requested but this build lacks the `serial` feature")
        }
    }
}

pub fn open_store(cfg: &bascula_config::Config) -> eyre::Result<FileStore> {
    FileStore::open(&cfg.storage.path)
}

/// Boot and run the weighing loop until `shutdown` or the cycle budget.
pub fn run_firmware(
    cfg: &bascula_config::Config,
    args: &RunArgs,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunStats> {
    setup_rt_once(args.rt, args.rt_prio, args.rt_lock);

    let scale = open_scale(cfg, args.sim)?;
    let link = open_link(cfg, args.port.as_deref(), args.baud)?;
    let store = open_store(cfg)?;

    let mut fw = DynFirmware::builder()
        .with_scale(scale)
        .with_link(link)
        .with_store(store)
        .with_config(FirmwareCfg::from(cfg))
        .build()?;

    let stats = bascula_core::run(
        &mut fw,
        &shutdown,
        &RunOptions {
            max_cycles: args.cycles,
        },
    )?;
    if args.stats {
        print_stats(&stats, fw.period());
    }
    Ok(stats)
}

/// Print loop timing stats to stderr (stdout may be the host link).
fn print_stats(stats: &RunStats, period: Duration) {
    eprintln!("\n--- Bascula Stats ---");
    eprintln!("Cycles: {}", stats.cycles);
    eprintln!("Period (us): {}", period.as_micros());
    eprintln!(
        "Cycle time min/avg/max (us): {} / {} / {}",
        stats.min_cycle.as_micros(),
        stats.avg_cycle().as_micros(),
        stats.max_cycle.as_micros()
    );
    eprintln!("Missed deadlines (> period): {}", stats.missed_deadlines);
    eprintln!("Sensor faults: {}", stats.sensor_faults);
    eprintln!("---------------------\n");
}

/// One raw reading and its conversion under the persisted calibration.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub raw: i32,
    pub grams: f32,
}

pub fn self_check(
    cfg: &bascula_config::Config,
    sim: bool,
    samples: u32,
) -> eyre::Result<Vec<Reading>> {
    let mut scale = open_scale(cfg, sim)?;
    let store = open_store(cfg)?;
    let cal = CalibrationState::load(&store)
        .map_err(|e| eyre::eyre!("read calibration: {e}"))?;
    let timeout = Duration::from_millis(Timeouts::from(&cfg.hardware).sensor_ms);

    let mut out = Vec::with_capacity(samples as usize);
    for _ in 0..samples {
        let raw = scale
            .read(timeout)
            .map_err(|e| eyre::Report::new(bascula_core::hw_error::map_hw_error(e.as_ref())))
            .wrap_err("self-check read")?;
        out.push(Reading {
            raw,
            grams: cal.raw_to_grams(raw),
        });
    }
    Ok(out)
}

pub fn show_calibration(cfg: &bascula_config::Config) -> eyre::Result<CalibrationState> {
    let store = open_store(cfg)?;
    CalibrationState::load(&store).map_err(|e| eyre::eyre!("read calibration: {e}"))
}
