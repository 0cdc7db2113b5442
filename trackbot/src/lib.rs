//! Wire protocol for the trackbot line-follower controller.
//!
//! The controller speaks three things over one 9600 baud serial line:
//!
//! - A legacy binary packet format for raw DAC writes
//!   (`[0xFF][port][data][checksum]`), kept for the pin-level tools.
//! - Newline-terminated text commands for motor speed and drive
//!   enable/disable (`L50`, `R50`, `S50`, `E`, `D`).
//! - Unsolicited telemetry lines at ~67 Hz reporting both IR sensor
//!   readings, surface classification, line-loss side, and the recovery
//!   steering direction.
//!
//! This crate is pure data and parsing; the serial port itself lives in
//! the `hardware` crate.

pub mod command;
pub mod convert;
pub mod packet;
pub mod telemetry;

pub use command::{Command, CommandError};
pub use convert::{dac_code, output_voltage, percent_from_code, BAUD_RATE};
pub use packet::{DacPacket, OutputPort, PacketDecoder, PacketError, PACKET_LEN, PACKET_START};
pub use telemetry::{
    parse_line, LineLoss, LineReassembler, Steer, Surface, TelemetryError, TelemetryFrame,
};
