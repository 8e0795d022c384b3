//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "bascula", version, about = "Load-cell weighing firmware")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/bascula.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Boot and run the weighing loop, speaking the line protocol on the host link
    Run {
        /// Use the simulated load cell instead of the HX711
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Serial device for the host link (overrides [serial].port); stdin/stdout otherwise
        #[arg(long, value_name = "DEV")]
        port: Option<String>,
        /// Serial baud rate (overrides [serial].baud)
        #[arg(long, value_name = "BAUD")]
        baud: Option<u32>,
        /// Stop after this many cycles instead of running until ctrl-c
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Print loop latency and missed-deadline stats on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority and mlockall to keep the bit-banged HX711 reads and the loop period free of page-fault and scheduler jitter. Needs CAP_SYS_NICE / CAP_IPC_LOCK (or root); failures are logged and the loop runs anyway."
        )]
        rt: bool,
        /// SCHED_FIFO priority for --rt (clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
    },
    /// Read a few raw samples and print them with the converted grams
    SelfCheck {
        /// Use the simulated load cell instead of the HX711
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Number of samples to read
        #[arg(long, value_name = "N", default_value_t = 5)]
        samples: u32,
    },
    /// Print the persisted calibration (scale factor and tare offset)
    ShowCalibration,
}
