use std::time::Duration;

use bascula_traits::{BoxError, Scale};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_low_with_timeout};

/// Bit-banged HX711 load-cell amplifier on two GPIO lines.
pub struct Hx711 {
    dt: InputPin,
    sck: OutputPin,
    gain_pulses: u8, // 25 = A/128, 26 = B/32, 27 = A/64
}

impl Hx711 {
    pub fn open(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 dt pin {dt_pin}: {e}")))?
            .into_input();
        // clock idle low; holding it high >60us powers the chip down
        let sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("open hx711 sck pin {sck_pin}: {e}")))?
            .into_output_low();
        Ok(Self {
            dt,
            sck,
            gain_pulses,
        })
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        let dt = &self.dt;
        wait_until_low_with_timeout(|| dt.is_high(), timeout, Duration::from_micros(200))?;

        let mut word: u32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay_100ns();
            word = (word << 1) | u32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay_100ns();
        }

        // Extra pulses select channel/gain for the next conversion.
        for _ in 24..self.gain_pulses {
            self.sck.set_high();
            spin_delay_100ns();
            self.sck.set_low();
            spin_delay_100ns();
        }

        let raw = sign_extend_24(word);
        trace!(raw, "hx711 raw read");
        Ok(raw)
    }
}

#[inline(always)]
fn spin_delay_100ns() {
    std::hint::spin_loop();
}

/// `Scale` over an HX711 with bounded retries on data-ready timeouts.
pub struct Hx711Scale {
    hx711: Hx711,
    max_retries: u32,
}

impl Hx711Scale {
    pub fn new(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        Ok(Self {
            hx711: Hx711::open(dt_pin, sck_pin, gain_pulses)?,
            max_retries: 3,
        })
    }
}

impl Scale for Hx711Scale {
    fn read(&mut self, timeout: Duration) -> std::result::Result<i32, BoxError> {
        let mut attempts = 0;
        loop {
            match self.hx711.read_with_timeout(timeout) {
                Ok(raw) => return Ok(raw),
                Err(HwError::DataReadyTimeout) if attempts < self.max_retries => {
                    attempts += 1;
                    tracing::warn!(retries = attempts, "hx711 data-ready timeout, retrying");
                }
                Err(e) => {
                    tracing::error!(error = %e, "hx711 read failed");
                    return Err(Box::new(e));
                }
            }
        }
    }
}
