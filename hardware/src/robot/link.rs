//! Serial link to the robot controller.
//!
//! One `RobotLink` owns the port for both directions: text commands and
//! legacy DAC packets out, telemetry lines in. Reads never block beyond
//! the port timeout; [`RobotLink::poll`] drains whatever the OS has
//! buffered, which at the firmware's ~67 Hz against a ~20 Hz poll is
//! usually several lines at once.

use std::io::{Read, Write};
use std::time::Duration;

use clap::Args;
use log::{debug, info, warn};
use serialport::SerialPort;
use thiserror::Error;

use trackbot::telemetry::{self, LineReassembler};
use trackbot::{Command, CommandError, DacPacket, TelemetryFrame, BAUD_RATE};

/// Serial link options shared by the CLI tools.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial port device path
    #[arg(
        short,
        long,
        default_value = "/dev/ttyACM0",
        long_help = "Serial port device path (e.g. /dev/ttyACM0 on Linux, COM3 on \
                     Windows). Use --list-ports to see what is connected."
    )]
    pub port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = BAUD_RATE)]
    pub baud: u32,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,
}

impl LinkArgs {
    /// Handle the `--list-ports` flag.
    ///
    /// Returns true when the flag was set and the caller should exit.
    pub fn handle_list_ports(&self) -> Result<bool, LinkError> {
        if !self.list_ports {
            return Ok(false);
        }

        let ports = crate::robot::list_serial_ports()?;
        if ports.is_empty() {
            println!("No serial ports found");
        } else {
            println!("Available serial ports:");
            for (index, info) in ports.iter().enumerate() {
                crate::robot::print_port_info(index, info);
            }
        }
        Ok(true)
    }

    /// Open the link described by these arguments.
    pub fn open(&self) -> Result<RobotLink, LinkError> {
        RobotLink::open(&self.port, self.baud)
    }
}

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Bidirectional serial link to the controller.
pub struct RobotLink {
    port: Box<dyn SerialPort>,
    port_name: String,
    lines: LineReassembler,
    parse_errors: u64,
    drive_armed: bool,
}

impl RobotLink {
    /// Read timeout on the underlying port.
    pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

    pub fn open(path: &str, baud: u32) -> Result<Self, LinkError> {
        info!("Opening serial port: {path} at {baud} bps");

        let port = serialport::new(path, baud)
            .timeout(Self::READ_TIMEOUT)
            .open()?;

        Ok(Self {
            port,
            port_name: path.to_string(),
            lines: LineReassembler::new(),
            parse_errors: 0,
            drive_armed: false,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Send one text command and flush it out.
    pub fn send(&mut self, cmd: &Command) -> Result<(), LinkError> {
        self.port.write_all(&cmd.encode())?;
        self.port.flush()?;
        debug!("Sent command {cmd}");

        match cmd {
            Command::Enable => self.drive_armed = true,
            Command::Disable => self.drive_armed = false,
            _ => {}
        }
        Ok(())
    }

    /// Write a raw DAC packet (legacy binary protocol).
    ///
    /// DAC writes drive a motor directly, bypassing the follower loop, so
    /// they arm the close-time disable just like [`Command::Enable`].
    pub fn write_dac(&mut self, packet: &DacPacket) -> Result<(), LinkError> {
        self.port.write_all(&packet.encode())?;
        self.port.flush()?;
        debug!("Wrote {} code {}", packet.port, packet.data);
        self.drive_armed = true;
        Ok(())
    }

    /// Set both motor speeds with per-side commands.
    pub fn set_speeds(&mut self, left: u8, right: u8) -> Result<(), LinkError> {
        self.send(&Command::left(left)?)?;
        self.send(&Command::right(right)?)?;
        Ok(())
    }

    /// Drain every complete telemetry line currently buffered.
    ///
    /// Malformed lines are counted and logged at debug, not returned as
    /// errors; the stream keeps flowing past them.
    pub fn poll(&mut self) -> Result<Vec<TelemetryFrame>, LinkError> {
        let mut frames = Vec::new();
        let mut scratch = [0u8; 512];

        loop {
            let available = self.port.bytes_to_read()? as usize;
            if available == 0 {
                break;
            }

            let want = available.min(scratch.len());
            let got = match self.port.read(&mut scratch[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e.into()),
            };

            for line in self.lines.push_bytes(&scratch[..got]) {
                match telemetry::parse_line(&line) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => {
                        self.parse_errors += 1;
                        debug!("Unparseable telemetry line {line:?}: {e}");
                    }
                }
            }
        }

        Ok(frames)
    }

    /// Telemetry lines that failed to parse since the link opened.
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// Oversize lines the reassembler discarded.
    pub fn discarded_lines(&self) -> u64 {
        self.lines.discarded()
    }
}

impl Drop for RobotLink {
    fn drop(&mut self) {
        // Never leave motors running without a console attached. Only fires
        // when this handle set something in motion (Enable or a DAC write)
        // and never sent the matching Disable.
        if !self.drive_armed {
            return;
        }
        match self.send(&Command::Disable) {
            Ok(()) => info!("Drive disabled on link close"),
            Err(e) => warn!("Failed to disable drive on link close: {e}"),
        }
    }
}
