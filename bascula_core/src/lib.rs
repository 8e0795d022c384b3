#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core weighing logic (hardware-agnostic).
//!
//! This crate turns raw load-cell counts into a filtered, calibrated weight
//! and speaks the host line protocol. All hardware interactions go through
//! the `bascula_traits::Scale`, `HostLink` and `Storage` traits.
//!
//! ## Architecture
//!
//! - **Filtering**: fixed-size median window over raw counts (`median`),
//!   followed by a single-pole IIR smoother on grams (`smoothing`)
//! - **Calibration**: tare offset + scale factor, write-through to the store
//!   (`calibration`, `store`)
//! - **Stability**: quiet-period debounce on the weight (`stability`)
//! - **Protocol**: bounded line buffer, command tokenizer, replies and the
//!   `G:<grams>,S:<0|1>` frame (`protocol`)
//! - **Loop**: `Firmware::cycle` plus paced execution in `runner`
//!
//! ```no_run
//! use bascula_core::{DynFirmware, FileStore};
//! use bascula_core::mocks::{MemoryLink, ScriptedScale};
//!
//! let mut fw = DynFirmware::builder()
//!     .with_scale(ScriptedScale::constant(0))
//!     .with_link(MemoryLink::new())
//!     .with_store(FileStore::open("bascula_nvs.toml")?)
//!     .build()?;
//! fw.boot()?;
//! let frame = fw.cycle()?;
//! println!("{frame}");
//! # Ok::<(), eyre::Report>(())
//! ```

pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod firmware;
pub mod hw_error;
pub mod median;
pub mod mocks;
pub mod protocol;
pub mod runner;
pub mod smoothing;
pub mod stability;
pub mod store;

pub use builder::{DynFirmware, FirmwareBuilder, Missing, Set};
pub use calibration::{
    CalibrationEngine, CalibrationState, KEY_SCALE_FACTOR, KEY_TARE_OFFSET, settle_and_average,
};
pub use config::{CalibrationCfg, FilterCfg, FirmwareCfg, ProtocolCfg, StabilityCfg, Timeouts};
pub use firmware::Firmware;
pub use median::{MEDIAN_WINDOW, MedianWindow};
pub use protocol::{Command, CommandLineBuffer, Reply, StatusFrame, parse_command};
pub use runner::{RunOptions, RunStats, run};
pub use smoothing::Smoother;
pub use stability::StabilityDetector;
pub use store::{FileStore, MemoryStore};
