//! Host channel over a byte channel plus a writer; stdin/stdout by default.
//!
//! Blocking reads happen on a dedicated thread that forwards chunks through a
//! channel, so the cycle loop only ever does a non-blocking `try_recv`.

use std::io::{Read, Write};

use bascula_traits::{BoxError, HostLink};

use crate::error::HwError;
use crossbeam_channel as xch;

pub struct ChannelLink<W: Write> {
    rx: xch::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    out: W,
}

/// Host link on the process's own stdin/stdout.
pub type StdioLink = ChannelLink<std::io::Stdout>;

impl StdioLink {
    /// Spawn the stdin reader thread. The thread ends at EOF; after that the
    /// link simply reports no pending input.
    pub fn spawn() -> Self {
        let (tx, rx) = xch::unbounded();
        std::thread::spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut chunk = [0u8; 256];
            loop {
                match stdin.read(&mut chunk) {
                    Ok(0) => {
                        tracing::debug!("stdin closed, host input finished");
                        break;
                    }
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        });
        ChannelLink::new(rx, std::io::stdout())
    }
}

impl<W: Write> ChannelLink<W> {
    pub fn new(rx: xch::Receiver<Vec<u8>>, out: W) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            out,
        }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> HostLink for ChannelLink<W> {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, BoxError> {
        while self.pending.len() < buf.len() {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(_) => break,
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush())
            .map_err(HwError::from_link_io)?;
        Ok(())
    }
}
