//! Hardware seams for the bascula firmware.
//!
//! Everything the cycle loop touches outside pure computation goes through
//! one of these traits, so the core can be driven by real peripherals, a
//! simulator, or scripted test doubles.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw sample source: one signed ADC count per call (24-bit, sign-extended).
pub trait Scale {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError>;
}

/// Host-facing line channel.
///
/// `read_available` must never block: it copies whatever bytes are already
/// pending into `buf` and returns how many were copied (0 when idle).
pub trait HostLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, BoxError>;
    /// Write one protocol line; the implementation appends the terminator.
    fn write_line(&mut self, line: &str) -> Result<(), BoxError>;
}

/// Non-volatile key/value store for named scalar values.
pub trait Storage {
    fn get_f32(&self, key: &str) -> Result<Option<f32>, BoxError>;
    fn get_i32(&self, key: &str) -> Result<Option<i32>, BoxError>;
    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), BoxError>;
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), BoxError>;
}

impl<T: Scale + ?Sized> Scale for Box<T> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError> {
        (**self).read(timeout)
    }
}

impl<T: HostLink + ?Sized> HostLink for Box<T> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, BoxError> {
        (**self).read_available(buf)
    }
    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        (**self).write_line(line)
    }
}

impl<T: Storage + ?Sized> Storage for Box<T> {
    fn get_f32(&self, key: &str) -> Result<Option<f32>, BoxError> {
        (**self).get_f32(key)
    }
    fn get_i32(&self, key: &str) -> Result<Option<i32>, BoxError> {
        (**self).get_i32(key)
    }
    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        (**self).put_f32(key, value)
    }
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), BoxError> {
        (**self).put_i32(key, value)
    }
}
