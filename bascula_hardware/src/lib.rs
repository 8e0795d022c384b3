//! Peripherals for the bascula firmware: the HX711 amplifier, a simulated
//! load cell, and the host-facing line channels.

pub mod error;
#[cfg(feature = "hardware")]
pub mod hx711;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;
pub mod stdio;
pub mod util;

pub use error::HwError;
pub use sim::{SimLoad, SimulatedScale};
pub use stdio::{ChannelLink, StdioLink};

#[cfg(feature = "hardware")]
pub use hx711::Hx711Scale;
#[cfg(feature = "serial")]
pub use serial::SerialLink;
