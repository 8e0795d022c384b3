//! Test and helper doubles for bascula_core.

use std::collections::VecDeque;
use std::time::Duration;

use bascula_traits::{BoxError, HostLink, Scale};

/// Scale that replays a fixed script of samples and failures, then keeps
/// repeating the last entry.
#[derive(Debug, Clone)]
pub struct ScriptedScale {
    script: VecDeque<Result<i32, String>>,
    last: Result<i32, String>,
    reads: u64,
}

impl ScriptedScale {
    pub fn constant(raw: i32) -> Self {
        Self {
            script: VecDeque::new(),
            last: Ok(raw),
            reads: 0,
        }
    }

    pub fn from_samples(samples: impl IntoIterator<Item = i32>) -> Self {
        Self::from_script(samples.into_iter().map(Ok))
    }

    pub fn from_script(script: impl IntoIterator<Item = Result<i32, String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: Ok(0),
            reads: 0,
        }
    }

    /// Every read fails with `msg`.
    pub fn failing(msg: &str) -> Self {
        Self {
            script: VecDeque::new(),
            last: Err(msg.to_string()),
            reads: 0,
        }
    }

    /// Queue one more sample after the current script.
    pub fn push(&mut self, raw: i32) {
        self.script.push_back(Ok(raw));
    }

    pub fn push_error(&mut self, msg: &str) {
        self.script.push_back(Err(msg.to_string()));
    }

    /// Replace the repeating tail value, dropping anything still queued.
    pub fn set_constant(&mut self, raw: i32) {
        self.script.clear();
        self.last = Ok(raw);
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl Scale for ScriptedScale {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        self.reads += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
            .clone()
            .map_err(|msg| Box::new(std::io::Error::other(msg)) as BoxError)
    }
}

/// In-memory host link: input is queued by the test, output lines are
/// collected for inspection.
#[derive(Debug, Default)]
pub struct MemoryLink {
    input: VecDeque<u8>,
    output: Vec<String>,
    closed: bool,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, text: &str) {
        self.input.extend(text.bytes());
    }

    /// Drain the lines written so far.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Make every later write fail, as an unplugged serial adapter would.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl HostLink for MemoryLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, BoxError> {
        let n = self.input.len().min(buf.len());
        for (slot, b) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        if self.closed {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "host link closed",
            )));
        }
        self.output.push(line.to_string());
        Ok(())
    }
}
