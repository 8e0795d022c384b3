//! UART host channel (8N1) via the `serialport` crate.

use std::io::{Read, Write};
use std::time::Duration;

use bascula_traits::{BoxError, HostLink};
use tracing::info;

use crate::error::{HwError, Result};

pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_millis(1))
            .open()
            .map_err(|e| HwError::Serial(format!("open {path}: {e}")))?;
        info!(port = path, baud, "serial host link open");
        Ok(Self { port })
    }
}

impl HostLink for SerialLink {
    fn read_available(&mut self, buf: &mut [u8]) -> std::result::Result<usize, BoxError> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|e| HwError::Serial(e.to_string()))? as usize;
        if pending == 0 {
            return Ok(0);
        }
        let want = pending.min(buf.len());
        match self.port.read(&mut buf[..want]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(Box::new(HwError::from_link_io(e))),
        }
    }

    fn write_line(&mut self, line: &str) -> std::result::Result<(), BoxError> {
        self.port.write_all(line.as_bytes()).map_err(HwError::from_link_io)?;
        self.port.write_all(b"\n").map_err(HwError::from_link_io)?;
        self.port.flush().map_err(HwError::from_link_io)?;
        Ok(())
    }
}
