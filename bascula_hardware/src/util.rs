use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait until the provided `is_high` predicate becomes false (HX711 DOUT
/// pulled low = conversion ready), or fail once `timeout` expires.
/// Polls every `poll_interval` instead of spinning.
pub fn wait_until_low_with_timeout(
    mut is_high: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while is_high() {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Sign-extend a 24-bit two's complement ADC word into an `i32`.
#[inline]
pub fn sign_extend_24(word: u32) -> i32 {
    let word = word & 0x00FF_FFFF;
    if word & 0x0080_0000 != 0 {
        (word | 0xFF00_0000) as i32
    } else {
        word as i32
    }
}
