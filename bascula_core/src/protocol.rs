//! Host line protocol: command tokenizer, replies and the status frame.
//!
//! Inbound bytes accumulate in a bounded `CommandLineBuffer` until `\r` or
//! `\n`. A line that hits the bound is discarded up to its terminator and
//! reported once as `ERR:CMDLEN`.

use core::fmt;

use crate::error::CalibrationError;

/// A complete inbound line, tokenized.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tare,
    /// `weight_g` is NaN when the argument did not parse as a number.
    Calibrate {
        weight_g: f32,
    },
    Unknown(String),
    Overflow,
}

/// Tokenize one already trimmed, non-empty line.
pub fn parse_command(line: &str) -> Command {
    if line.eq_ignore_ascii_case("t") {
        return Command::Tare;
    }
    if let Some(prefix) = line.get(..2)
        && prefix.eq_ignore_ascii_case("c:")
    {
        let weight_g = line[2..].trim().parse::<f32>().unwrap_or(f32::NAN);
        return Command::Calibrate { weight_g };
    }
    Command::Unknown(line.to_string())
}

#[derive(Debug, Clone)]
pub struct CommandLineBuffer {
    buf: Vec<u8>,
    max_len: usize,
    overflow: bool,
}

impl CommandLineBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len),
            max_len,
            overflow: false,
        }
    }

    /// Feed one byte. Returns a command when a terminator completes a
    /// non-empty line (or an overflowed one).
    pub fn push_byte(&mut self, b: u8) -> Option<Command> {
        if b == b'\r' || b == b'\n' {
            let cmd = if self.overflow {
                Some(Command::Overflow)
            } else {
                let text = String::from_utf8_lossy(&self.buf);
                let line = text.trim();
                (!line.is_empty()).then(|| parse_command(line))
            };
            self.buf.clear();
            self.overflow = false;
            return cmd;
        }
        if !self.overflow {
            if self.buf.len() < self.max_len {
                self.buf.push(b);
            } else {
                self.overflow = true;
            }
        }
        None
    }

    /// Bytes held for the current (unterminated) line.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflow
    }
}

/// Every line the firmware writes in answer to a command, plus the boot
/// banner.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Hello(String),
    AckTare,
    AckCalibrate(f32),
    ErrCalWeight,
    ErrCalZero,
    ErrSensor,
    ErrNvs,
    ErrCmdLen,
    ErrUnknownCmd,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hello(id) => write!(f, "HELLO:{id}"),
            Self::AckTare => f.write_str("ACK:T"),
            Self::AckCalibrate(factor) => write!(f, "ACK:C:{factor:.8}"),
            Self::ErrCalWeight => f.write_str("ERR:CAL:weight"),
            Self::ErrCalZero => f.write_str("ERR:CAL:zero"),
            Self::ErrSensor => f.write_str("ERR:SENSOR"),
            Self::ErrNvs => f.write_str("ERR:NVS"),
            Self::ErrCmdLen => f.write_str("ERR:CMDLEN"),
            Self::ErrUnknownCmd => f.write_str("ERR:UNKNOWN_CMD"),
        }
    }
}

impl From<&CalibrationError> for Reply {
    fn from(e: &CalibrationError) -> Self {
        match e {
            CalibrationError::InvalidWeight => Self::ErrCalWeight,
            CalibrationError::ZeroNetRaw => Self::ErrCalZero,
            CalibrationError::Sensor(_) => Self::ErrSensor,
            CalibrationError::Storage(_) => Self::ErrNvs,
        }
    }
}

/// Per-cycle outbound frame `G:<grams>,S:<0|1>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFrame {
    pub grams: f32,
    pub stable: bool,
}

impl fmt::Display for StatusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G:{:.2},S:{}", self.grams, u8::from(self.stable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn feed(buf: &mut CommandLineBuffer, s: &str) -> Vec<Command> {
        s.bytes().filter_map(|b| buf.push_byte(b)).collect()
    }

    #[rstest]
    #[case("T", Command::Tare)]
    #[case("t", Command::Tare)]
    #[case("C:500", Command::Calibrate { weight_g: 500.0 })]
    #[case("c: 12.5 ", Command::Calibrate { weight_g: 12.5 })]
    #[case("C:-3", Command::Calibrate { weight_g: -3.0 })]
    #[case("TARE", Command::Unknown("TARE".into()))]
    #[case("X:1", Command::Unknown("X:1".into()))]
    #[case("ñ", Command::Unknown("ñ".into()))]
    fn tokenizes(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse_command(line), expected);
    }

    #[rstest]
    #[case("C:")]
    #[case("C:abc")]
    #[case("C:12g")]
    #[case("C:1 2")]
    fn unparsable_weight_is_nan(#[case] line: &str) {
        match parse_command(line) {
            Command::Calibrate { weight_g } => assert!(weight_g.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn trims_and_skips_blank_lines() {
        let mut b = CommandLineBuffer::new(80);
        assert_eq!(feed(&mut b, "  T \r\n\n   \n"), vec![Command::Tare]);
        assert!(b.is_empty());
    }

    #[test]
    fn overlong_line_reports_once_and_recovers() {
        let mut b = CommandLineBuffer::new(80);
        let long = "A".repeat(81);
        assert!(feed(&mut b, &long).is_empty());
        assert!(b.is_overflowed());
        assert_eq!(b.len(), 80);
        assert_eq!(feed(&mut b, "\n"), vec![Command::Overflow]);
        assert!(!b.is_overflowed());
        assert!(b.is_empty());
        assert_eq!(feed(&mut b, "T\n"), vec![Command::Tare]);
    }

    #[test]
    fn line_at_exact_limit_is_dispatched() {
        let mut b = CommandLineBuffer::new(4);
        assert_eq!(
            feed(&mut b, "C:10\n"),
            vec![Command::Calibrate { weight_g: 10.0 }]
        );
    }

    #[test]
    fn partial_line_survives_between_feeds() {
        let mut b = CommandLineBuffer::new(80);
        assert!(feed(&mut b, "C:5").is_empty());
        assert_eq!(feed(&mut b, "00\r"), vec![Command::Calibrate { weight_g: 500.0 }]);
    }

    #[rstest]
    #[case(Reply::Hello("RPI-HX711".into()), "HELLO:RPI-HX711")]
    #[case(Reply::AckTare, "ACK:T")]
    #[case(Reply::AckCalibrate(1.0 / 3.0), "ACK:C:0.33333334")]
    #[case(Reply::ErrCalWeight, "ERR:CAL:weight")]
    #[case(Reply::ErrCalZero, "ERR:CAL:zero")]
    #[case(Reply::ErrCmdLen, "ERR:CMDLEN")]
    #[case(Reply::ErrUnknownCmd, "ERR:UNKNOWN_CMD")]
    fn reply_wire_format(#[case] reply: Reply, #[case] wire: &str) {
        assert_eq!(reply.to_string(), wire);
    }

    #[rstest]
    #[case(123.454, true, "G:123.45,S:1")]
    #[case(0.0, false, "G:0.00,S:0")]
    #[case(-2.5, false, "G:-2.50,S:0")]
    fn frame_wire_format(#[case] grams: f32, #[case] stable: bool, #[case] wire: &str) {
        assert_eq!(StatusFrame { grams, stable }.to_string(), wire);
    }
}
