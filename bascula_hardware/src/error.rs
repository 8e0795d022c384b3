use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("hx711 data-ready timeout")]
    DataReadyTimeout,
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("host link closed")]
    LinkClosed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

impl HwError {
    /// Classify an I/O error on a host link: a peer that went away becomes
    /// `LinkClosed`, anything else stays `Io`.
    pub fn from_link_io(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof => HwError::LinkClosed,
            _ => HwError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn vanished_peer_is_link_closed() {
        assert!(matches!(
            HwError::from_link_io(Error::from(ErrorKind::BrokenPipe)),
            HwError::LinkClosed
        ));
        assert!(matches!(
            HwError::from_link_io(Error::other("framing")),
            HwError::Io(_)
        ));
    }
}
