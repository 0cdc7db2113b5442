//! Telemetry line parsing.
//!
//! The firmware prints one debug line per sensor pass (~67 Hz):
//!
//! ```text
//! L:45(W) R:120(B) Loss:L Out:-1
//! ```
//!
//! Both IR readings are raw 10-bit ADC values with a white/black surface
//! classification, `Loss:` names the side that lost the line (`-` while
//! tracking), and `Out:` is the recovery steering direction. The host
//! polls far slower than the device emits, so [`LineReassembler`] turns
//! whatever bytes are buffered into complete lines and [`parse_line`]
//! turns each line into a [`TelemetryFrame`].
//!
//! Unknown tokens (boot banners, stray prints) are ignored; a line only
//! fails to parse when one of the four fields is absent or malformed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::{SENSOR_MAX, SENSOR_MIN};

/// Longest line the reassembler will buffer before treating the input
/// as binary garbage and discarding to the next newline.
pub const MAX_LINE_LEN: usize = 256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("bad {field} value {value:?}")]
    BadValue { field: &'static str, value: String },

    #[error("sensor reading {0} out of range ({SENSOR_MIN}-{SENSOR_MAX})")]
    RawOutOfRange(u16),
}

/// Surface classification under one IR sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    White,
    Black,
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Surface::White => write!(f, "W"),
            Surface::Black => write!(f, "B"),
        }
    }
}

/// Which side lost the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineLoss {
    Left,
    Right,
    /// Still tracking.
    None,
}

impl std::fmt::Display for LineLoss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineLoss::Left => write!(f, "L"),
            LineLoss::Right => write!(f, "R"),
            LineLoss::None => write!(f, "-"),
        }
    }
}

/// Recovery steering direction reported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Steer {
    Left,
    Straight,
    Right,
}

impl Steer {
    /// Signed offset as printed on the wire: -1, 0, +1.
    pub fn as_offset(&self) -> i8 {
        match self {
            Steer::Left => -1,
            Steer::Straight => 0,
            Steer::Right => 1,
        }
    }
}

impl std::fmt::Display for Steer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_offset() {
            0 => write!(f, "0"),
            n => write!(f, "{n:+}"),
        }
    }
}

/// One parsed telemetry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub left_raw: u16,
    pub left_surface: Surface,
    pub right_raw: u16,
    pub right_surface: Surface,
    pub loss: LineLoss,
    pub steer: Steer,
}

impl std::fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "L:{}({}) R:{}({}) Loss:{} Out:{}",
            self.left_raw,
            self.left_surface,
            self.right_raw,
            self.right_surface,
            self.loss,
            self.steer
        )
    }
}

/// Parse one telemetry line (terminator already stripped).
///
/// Fields may appear in any order and unrecognized tokens are skipped;
/// the first occurrence of each field wins.
pub fn parse_line(line: &str) -> Result<TelemetryFrame, TelemetryError> {
    let mut left: Option<(u16, Surface)> = None;
    let mut right: Option<(u16, Surface)> = None;
    let mut loss: Option<LineLoss> = None;
    let mut steer: Option<Steer> = None;

    for token in line.split_whitespace() {
        if let Some(rest) = token.strip_prefix("L:") {
            if left.is_none() {
                left = Some(parse_sensor("L", rest)?);
            }
        } else if let Some(rest) = token.strip_prefix("R:") {
            if right.is_none() {
                right = Some(parse_sensor("R", rest)?);
            }
        } else if let Some(rest) = token.strip_prefix("Loss:") {
            if loss.is_none() {
                loss = Some(parse_loss(rest)?);
            }
        } else if let Some(rest) = token.strip_prefix("Out:") {
            if steer.is_none() {
                steer = Some(parse_steer(rest)?);
            }
        }
    }

    let (left_raw, left_surface) = left.ok_or(TelemetryError::MissingField("L"))?;
    let (right_raw, right_surface) = right.ok_or(TelemetryError::MissingField("R"))?;
    Ok(TelemetryFrame {
        left_raw,
        left_surface,
        right_raw,
        right_surface,
        loss: loss.ok_or(TelemetryError::MissingField("Loss"))?,
        steer: steer.ok_or(TelemetryError::MissingField("Out"))?,
    })
}

fn parse_sensor(field: &'static str, rest: &str) -> Result<(u16, Surface), TelemetryError> {
    let bad = || TelemetryError::BadValue {
        field,
        value: rest.to_string(),
    };

    let open = rest.find('(').ok_or_else(bad)?;
    let raw: u16 = rest[..open].parse().map_err(|_| bad())?;
    if raw > SENSOR_MAX {
        return Err(TelemetryError::RawOutOfRange(raw));
    }

    let surface = match &rest[open..] {
        "(W)" => Surface::White,
        "(B)" => Surface::Black,
        _ => return Err(bad()),
    };
    Ok((raw, surface))
}

fn parse_loss(rest: &str) -> Result<LineLoss, TelemetryError> {
    match rest {
        "L" => Ok(LineLoss::Left),
        "R" => Ok(LineLoss::Right),
        "-" => Ok(LineLoss::None),
        _ => Err(TelemetryError::BadValue {
            field: "Loss",
            value: rest.to_string(),
        }),
    }
}

fn parse_steer(rest: &str) -> Result<Steer, TelemetryError> {
    let bad = || TelemetryError::BadValue {
        field: "Out",
        value: rest.to_string(),
    };

    // The firmware may print the sign explicitly (+1) or not (1).
    let value: i32 = rest
        .strip_prefix('+')
        .unwrap_or(rest)
        .parse()
        .map_err(|_| bad())?;
    match value {
        -1 => Ok(Steer::Left),
        0 => Ok(Steer::Straight),
        1 => Ok(Steer::Right),
        _ => Err(bad()),
    }
}

/// Byte-fed line splitter for the telemetry stream.
///
/// Returns complete lines with terminators stripped (`\r\n` and bare
/// `\n` both end a line) and keeps the trailing partial line until more
/// bytes arrive. Empty lines are dropped. A pending line that outgrows
/// [`MAX_LINE_LEN`] is discarded through its newline and counted.
#[derive(Debug, Default)]
pub struct LineReassembler {
    pending: Vec<u8>,
    dropping: bool,
    discarded: u64,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and extract every complete line.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in bytes {
            if self.dropping {
                if byte == b'\n' {
                    self.dropping = false;
                }
                continue;
            }

            if byte == b'\n' {
                let mut raw = std::mem::take(&mut self.pending);
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                if !raw.is_empty() {
                    lines.push(String::from_utf8_lossy(&raw).into_owned());
                }
            } else {
                self.pending.push(byte);
                if self.pending.len() > MAX_LINE_LEN {
                    self.pending.clear();
                    self.dropping = true;
                    self.discarded += 1;
                }
            }
        }

        lines
    }

    /// Bytes of the current partial line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Lines discarded for exceeding [`MAX_LINE_LEN`].
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> TelemetryFrame {
        TelemetryFrame {
            left_raw: 45,
            left_surface: Surface::White,
            right_raw: 120,
            right_surface: Surface::Black,
            loss: LineLoss::Left,
            steer: Steer::Left,
        }
    }

    #[test]
    fn test_parse_nominal_line() {
        let frame = parse_line("L:45(W) R:120(B) Loss:L Out:-1").unwrap();
        assert_eq!(frame, nominal());
    }

    #[test]
    fn test_parse_tracking_line() {
        let frame = parse_line("L:80(W) R:82(W) Loss:- Out:0").unwrap();
        assert_eq!(frame.loss, LineLoss::None);
        assert_eq!(frame.steer, Steer::Straight);
    }

    #[test]
    fn test_parse_steer_sign_optional() {
        let plus = parse_line("L:45(W) R:520(B) Loss:R Out:+1").unwrap();
        let bare = parse_line("L:45(W) R:520(B) Loss:R Out:1").unwrap();
        assert_eq!(plus.steer, Steer::Right);
        assert_eq!(bare.steer, Steer::Right);
    }

    #[test]
    fn test_parse_rejects_out_of_range_raw() {
        assert_eq!(
            parse_line("L:1024(W) R:0(W) Loss:- Out:0"),
            Err(TelemetryError::RawOutOfRange(1024))
        );
    }

    #[test]
    fn test_parse_rejects_bad_surface() {
        assert!(matches!(
            parse_line("L:45(X) R:0(W) Loss:- Out:0"),
            Err(TelemetryError::BadValue { field: "L", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_steer() {
        assert!(matches!(
            parse_line("L:45(W) R:0(W) Loss:- Out:2"),
            Err(TelemetryError::BadValue { field: "Out", .. })
        ));
    }

    #[test]
    fn test_parse_missing_field() {
        assert_eq!(
            parse_line("L:45(W) R:0(W) Loss:-"),
            Err(TelemetryError::MissingField("Out"))
        );
    }

    #[test]
    fn test_parse_ignores_unknown_tokens() {
        let frame = parse_line("READY L:45(W) R:120(B) Loss:L Out:-1 #42").unwrap();
        assert_eq!(frame, nominal());
    }

    #[test]
    fn test_parse_extra_whitespace() {
        let frame = parse_line("  L:45(W)   R:120(B)  Loss:L  Out:-1 ").unwrap();
        assert_eq!(frame, nominal());
    }

    #[test]
    fn test_display_right_steer_prints_plus() {
        let mut frame = nominal();
        frame.loss = LineLoss::Right;
        frame.steer = Steer::Right;
        assert_eq!(frame.to_string(), "L:45(W) R:120(B) Loss:R Out:+1");
    }

    #[test]
    fn test_display_round_trips() {
        let frame = nominal();
        assert_eq!(parse_line(&frame.to_string()), Ok(frame));
    }

    #[test]
    fn test_reassembler_splits_burst() {
        // The device outruns the poll rate; one drain sees several lines.
        let mut lines = LineReassembler::new();
        let burst = b"L:1(W) R:2(W) Loss:- Out:0\nL:3(W) R:4(W) Loss:- Out:0\nL:5(";
        let out = lines.push_bytes(burst);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "L:1(W) R:2(W) Loss:- Out:0");
        assert_eq!(lines.pending_len(), 4);
    }

    #[test]
    fn test_reassembler_partial_across_feeds() {
        let mut lines = LineReassembler::new();
        assert!(lines.push_bytes(b"L:45(W) R:12").is_empty());
        let out = lines.push_bytes(b"0(B) Loss:L Out:-1\n");
        assert_eq!(out, vec!["L:45(W) R:120(B) Loss:L Out:-1".to_string()]);
    }

    #[test]
    fn test_reassembler_crlf() {
        let mut lines = LineReassembler::new();
        let out = lines.push_bytes(b"L:1(W) R:2(W) Loss:- Out:0\r\n");
        assert_eq!(out, vec!["L:1(W) R:2(W) Loss:- Out:0".to_string()]);
    }

    #[test]
    fn test_reassembler_skips_empty_lines() {
        let mut lines = LineReassembler::new();
        assert!(lines.push_bytes(b"\n\r\n\n").is_empty());
    }

    #[test]
    fn test_reassembler_sheds_oversize_garbage() {
        let mut lines = LineReassembler::new();
        let mut stream = vec![b'x'; 400];
        stream.extend_from_slice(b"\nL:1(W) R:2(W) Loss:- Out:0\n");
        let out = lines.push_bytes(&stream);
        assert_eq!(out, vec!["L:1(W) R:2(W) Loss:- Out:0".to_string()]);
        assert_eq!(lines.discarded(), 1);
    }

    #[test]
    fn test_reassembler_then_parse_garbage_banner() {
        let mut lines = LineReassembler::new();
        let out = lines.push_bytes(b"boot v1.2\nL:45(W) R:120(B) Loss:L Out:-1\n");
        assert_eq!(out.len(), 2);
        assert!(parse_line(&out[0]).is_err());
        assert_eq!(parse_line(&out[1]), Ok(nominal()));
    }
}
