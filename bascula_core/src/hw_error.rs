//! Maps `Box<dyn Error>` from trait boundaries to typed `FirmwareError`.
//!
//! The traits in `bascula_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `bascula_hardware::HwError` downcasting.

use crate::error::FirmwareError;

/// Map a trait-boundary error to a typed `FirmwareError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FirmwareError {
    #[cfg(feature = "hardware-errors")]
    {
        use bascula_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::DataReadyTimeout => FirmwareError::Timeout,
                HwError::Serial(_) | HwError::LinkClosed => FirmwareError::Link(hw.to_string()),
                other => FirmwareError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        FirmwareError::Timeout
    } else {
        FirmwareError::Hardware(s)
    }
}
