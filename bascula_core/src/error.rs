use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum FirmwareError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("host link error: {0}")]
    Link(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Why a tare or calibration was refused. Each variant maps to one `ERR:` reply.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("reference weight must be a positive number of grams")]
    InvalidWeight,
    #[error("net raw counts are zero; load the reference weight before calibrating")]
    ZeroNetRaw,
    #[error("sensor read failed: {0}")]
    Sensor(String),
    #[error("persisting calibration failed: {0}")]
    Storage(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing scale")]
    MissingScale,
    #[error("missing host link")]
    MissingLink,
    #[error("missing storage")]
    MissingStorage,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
