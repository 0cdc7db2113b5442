//! Legacy binary DAC packet codec.
//!
//! The legacy pin-control tools drive the motor DACs with a fixed
//! 4-byte frame:
//!
//! ```text
//! [0xFF start] [port: 2|3] [data: 0-255] [checksum]
//! ```
//!
//! The checksum is the wrapping byte sum of the first three bytes.
//! Port 2 selects DAC output 1 (left motor, pin A6), port 3 selects DAC
//! output 2 (right motor, pin A7).
//!
//! [`PacketDecoder`] recovers frames from an arbitrary byte stream,
//! resynchronizing past garbage and holding truncated frames until the
//! rest arrives.

use thiserror::Error;

/// Start byte of every DAC packet.
pub const PACKET_START: u8 = 0xFF;

/// Wire length of a DAC packet.
pub const PACKET_LEN: usize = 4;

/// DAC output selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPort {
    /// DAC output 1, left motor (pin A6). Wire value 2.
    Dac1,
    /// DAC output 2, right motor (pin A7). Wire value 3.
    Dac2,
}

impl OutputPort {
    /// Byte sent in the packet's port field.
    pub fn wire_value(&self) -> u8 {
        match self {
            OutputPort::Dac1 => 2,
            OutputPort::Dac2 => 3,
        }
    }

    /// Decode a port field byte.
    pub fn from_wire(byte: u8) -> Result<Self, PacketError> {
        match byte {
            2 => Ok(OutputPort::Dac1),
            3 => Ok(OutputPort::Dac2),
            other => Err(PacketError::BadPort(other)),
        }
    }

    /// Which motor this output drives.
    pub fn motor(&self) -> &'static str {
        match self {
            OutputPort::Dac1 => "left",
            OutputPort::Dac2 => "right",
        }
    }
}

impl std::fmt::Display for OutputPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputPort::Dac1 => write!(f, "DAC1"),
            OutputPort::Dac2 => write!(f, "DAC2"),
        }
    }
}

/// Packet validation error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    #[error("bad start byte 0x{0:02X} (expected 0xFF)")]
    BadStart(u8),

    #[error("bad port byte {0} (expected 2 or 3)")]
    BadPort(u8),

    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{got:02X}")]
    BadChecksum { expected: u8, got: u8 },
}

/// A raw write to one of the motor DACs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DacPacket {
    pub port: OutputPort,
    pub data: u8,
}

impl DacPacket {
    pub fn new(port: OutputPort, data: u8) -> Self {
        Self { port, data }
    }

    /// Checksum over the start, port and data bytes.
    pub fn checksum(port: u8, data: u8) -> u8 {
        PACKET_START.wrapping_add(port).wrapping_add(data)
    }

    /// Render the 4-byte wire frame.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let port = self.port.wire_value();
        [
            PACKET_START,
            port,
            self.data,
            Self::checksum(port, self.data),
        ]
    }

    /// Strict decode of exactly one frame.
    pub fn decode(frame: &[u8; PACKET_LEN]) -> Result<Self, PacketError> {
        if frame[0] != PACKET_START {
            return Err(PacketError::BadStart(frame[0]));
        }
        let port = OutputPort::from_wire(frame[1])?;
        let expected = Self::checksum(frame[1], frame[2]);
        if frame[3] != expected {
            return Err(PacketError::BadChecksum {
                expected,
                got: frame[3],
            });
        }
        Ok(Self {
            port,
            data: frame[2],
        })
    }
}

/// Incremental packet decoder over a byte stream.
///
/// Bytes before a start byte are discarded. A start byte that does not
/// lead a valid frame (bad port or checksum) is treated as noise: it is
/// dropped and the scan resumes one byte later, so a real frame embedded
/// after a stray 0xFF is still recovered.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    buffer: Vec<u8>,
    discarded: u64,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and extract every complete valid packet.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<DacPacket> {
        self.buffer.extend_from_slice(bytes);
        let mut packets = Vec::new();
        while let Some(packet) = self.try_extract_packet() {
            packets.push(packet);
        }
        packets
    }

    fn try_extract_packet(&mut self) -> Option<DacPacket> {
        loop {
            // Drop everything ahead of the next start byte.
            match self.buffer.iter().position(|&b| b == PACKET_START) {
                Some(0) => {}
                Some(n) => {
                    self.discarded += n as u64;
                    self.buffer.drain(..n);
                }
                None => {
                    self.discarded += self.buffer.len() as u64;
                    self.buffer.clear();
                    return None;
                }
            }

            if self.buffer.len() < PACKET_LEN {
                return None;
            }

            let frame = [self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]];
            match DacPacket::decode(&frame) {
                Ok(packet) => {
                    self.buffer.drain(..PACKET_LEN);
                    return Some(packet);
                }
                Err(_) => {
                    // False start byte: drop it and rescan.
                    self.discarded += 1;
                    self.buffer.drain(..1);
                }
            }
        }
    }

    /// Bytes held waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes discarded as garbage or false starts.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_wrapping_sum() {
        // 0xFF + 0x02 + 0x80 = 0x181, truncated to 0x81
        assert_eq!(DacPacket::checksum(2, 128), 0x81);
    }

    #[test]
    fn test_encode_left() {
        let packet = DacPacket::new(OutputPort::Dac1, 128);
        assert_eq!(packet.encode(), [0xFF, 0x02, 0x80, 0x81]);
    }

    #[test]
    fn test_encode_right() {
        let packet = DacPacket::new(OutputPort::Dac2, 0);
        assert_eq!(packet.encode(), [0xFF, 0x03, 0x00, 0x02]);
    }

    #[test]
    fn test_decode_round() {
        let packet = DacPacket::new(OutputPort::Dac2, 213);
        assert_eq!(DacPacket::decode(&packet.encode()), Ok(packet));
    }

    #[test]
    fn test_decode_rejects_bad_start() {
        assert_eq!(
            DacPacket::decode(&[0xFE, 2, 0, 1]),
            Err(PacketError::BadStart(0xFE))
        );
    }

    #[test]
    fn test_decode_rejects_bad_port() {
        assert_eq!(
            DacPacket::decode(&[0xFF, 4, 0, 3]),
            Err(PacketError::BadPort(4))
        );
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        assert_eq!(
            DacPacket::decode(&[0xFF, 2, 128, 0x82]),
            Err(PacketError::BadChecksum {
                expected: 0x81,
                got: 0x82
            })
        );
    }

    #[test]
    fn test_decoder_single_packet() {
        let mut decoder = PacketDecoder::new();
        let packets = decoder.push_bytes(&[0xFF, 0x02, 0x80, 0x81]);
        assert_eq!(packets, vec![DacPacket::new(OutputPort::Dac1, 128)]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_decoder_skips_leading_garbage() {
        let mut decoder = PacketDecoder::new();
        let mut stream = vec![0x00, 0x41, 0x42];
        stream.extend_from_slice(&DacPacket::new(OutputPort::Dac2, 7).encode());
        let packets = decoder.push_bytes(&stream);
        assert_eq!(packets, vec![DacPacket::new(OutputPort::Dac2, 7)]);
        assert_eq!(decoder.discarded(), 3);
    }

    #[test]
    fn test_decoder_truncation_across_feeds() {
        let mut decoder = PacketDecoder::new();
        let frame = DacPacket::new(OutputPort::Dac1, 200).encode();
        assert!(decoder.push_bytes(&frame[..2]).is_empty());
        assert_eq!(decoder.pending(), 2);
        let packets = decoder.push_bytes(&frame[2..]);
        assert_eq!(packets, vec![DacPacket::new(OutputPort::Dac1, 200)]);
    }

    #[test]
    fn test_decoder_data_byte_is_start_value() {
        // data = 0xFF is legal: [FF 02 FF 00], checksum 0xFF+2+0xFF = 0x00
        let mut decoder = PacketDecoder::new();
        let mut stream = DacPacket::new(OutputPort::Dac1, 0xFF).encode().to_vec();
        stream.extend_from_slice(&DacPacket::new(OutputPort::Dac2, 1).encode());
        let packets = decoder.push_bytes(&stream);
        assert_eq!(
            packets,
            vec![
                DacPacket::new(OutputPort::Dac1, 0xFF),
                DacPacket::new(OutputPort::Dac2, 1),
            ]
        );
    }

    #[test]
    fn test_decoder_resyncs_after_false_start() {
        let mut decoder = PacketDecoder::new();
        // Stray 0xFF followed by junk, then a real frame.
        let mut stream = vec![0xFF, 0x99, 0x99, 0x99];
        stream.extend_from_slice(&DacPacket::new(OutputPort::Dac2, 42).encode());
        let packets = decoder.push_bytes(&stream);
        assert_eq!(packets, vec![DacPacket::new(OutputPort::Dac2, 42)]);
    }

    #[test]
    fn test_decoder_bounded_on_start_byte_flood() {
        let mut decoder = PacketDecoder::new();
        // A run of start bytes never yields a packet (port 0xFF is invalid)
        // and must not accumulate without bound.
        let packets = decoder.push_bytes(&[0xFF; 64]);
        assert!(packets.is_empty());
        assert!(decoder.pending() < PACKET_LEN);
    }

    #[test]
    fn test_decoder_back_to_back_packets() {
        let mut decoder = PacketDecoder::new();
        let mut stream = Vec::new();
        for code in [0u8, 64, 128, 255] {
            stream.extend_from_slice(&DacPacket::new(OutputPort::Dac1, code).encode());
            stream.extend_from_slice(&DacPacket::new(OutputPort::Dac2, code).encode());
        }
        let packets = decoder.push_bytes(&stream);
        assert_eq!(packets.len(), 8);
        assert_eq!(packets[5], DacPacket::new(OutputPort::Dac2, 128));
    }
}
