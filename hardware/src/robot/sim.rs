//! Firmware simulator.
//!
//! Stands in for the controller on a bench: emits the same telemetry
//! lines the real firmware prints and executes incoming commands and
//! DAC packets. The track model is a deterministic sweep, so runs are
//! reproducible and tests can assert on exact behavior.
//!
//! Model: the line's position under the chassis sweeps sinusoidally
//! between the two IR sensors while the drive is enabled. A sensor
//! reads black when the line is within its view; readings stay inside
//! the white/black reference bands. Scheduled loss episodes move the
//! line out of view of both sensors and report the recovery steer
//! toward the side that last saw it.

use log::{debug, warn};

use trackbot::convert::{percent_from_code, BLACK_MIN, WHITE_MAX};
use trackbot::telemetry::{LineLoss, LineReassembler, Steer, Surface, TelemetryFrame};
use trackbot::{Command, DacPacket, OutputPort, PacketDecoder, PACKET_START};

/// Frames per full sweep of the line across the sensors.
const SWEEP_TICKS: f64 = 100.0;

/// Sensor positions either side of the chassis centerline.
const SENSOR_OFFSET: f64 = 0.35;

/// Half-width of one sensor's view of the line.
const SENSOR_HALF_WIDTH: f64 = 0.3;

/// Peak line offset during normal tracking. Stays inside sensor reach,
/// so the line is only ever lost by a scheduled episode.
const SWEEP_AMPLITUDE: f64 = 0.55;

/// Frames a loss episode lasts.
const LOSS_TICKS: u32 = 8;

/// Deterministic stand-in for the robot firmware.
#[derive(Debug)]
pub struct FirmwareSim {
    enabled: bool,
    left_speed: u8,
    right_speed: u8,
    tick: u64,
    phase: f64,
    loss_every: u64,
    loss_remaining: u32,
    lost_side: LineLoss,
    last_black: LineLoss,
    lines: LineReassembler,
    packets: PacketDecoder,
}

impl FirmwareSim {
    pub fn new() -> Self {
        Self {
            enabled: false,
            left_speed: 50,
            right_speed: 50,
            tick: 0,
            phase: 0.0,
            loss_every: 0,
            loss_remaining: 0,
            lost_side: LineLoss::Left,
            last_black: LineLoss::Left,
            lines: LineReassembler::new(),
            packets: PacketDecoder::new(),
        }
    }

    /// Schedule a loss episode every `every` frames (0 = never).
    pub fn set_loss_every(&mut self, every: u64) {
        self.loss_every = every;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Current (left, right) speed percents.
    pub fn speeds(&self) -> (u8, u8) {
        (self.left_speed, self.right_speed)
    }

    /// Execute one text command.
    pub fn handle_command(&mut self, cmd: &Command) {
        match cmd {
            Command::Left(n) => self.left_speed = *n,
            Command::Right(n) => self.right_speed = *n,
            Command::Both(n) => {
                self.left_speed = *n;
                self.right_speed = *n;
            }
            Command::Enable => self.enabled = true,
            Command::Disable => self.enabled = false,
        }
        debug!(
            "Command {cmd}: drive {} speeds {}%/{}%",
            if self.enabled { "on" } else { "off" },
            self.left_speed,
            self.right_speed
        );
    }

    /// Apply a raw DAC write, stored as the nearest speed percent.
    pub fn handle_dac(&mut self, packet: &DacPacket) {
        let percent = percent_from_code(packet.data);
        match packet.port {
            OutputPort::Dac1 => self.left_speed = percent,
            OutputPort::Dac2 => self.right_speed = percent,
        }
        debug!("DAC write {} code {} -> {percent}%", packet.port, packet.data);
    }

    /// Execute raw bytes from the host.
    ///
    /// Text commands and binary DAC frames share the inbound stream. A
    /// start byte (or an unfinished DAC frame) routes bytes to the packet
    /// decoder; everything else is treated as command text. Command bytes
    /// never equal the start byte, so a complete frame is unambiguous even
    /// when its data or checksum happens to be a newline.
    pub fn feed_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.packets.pending() > 0 || byte == PACKET_START {
                for packet in self.packets.push_bytes(&[byte]) {
                    self.handle_dac(&packet);
                }
            } else {
                for line in self.lines.push_bytes(&[byte]) {
                    match Command::parse(&line) {
                        Ok(cmd) => self.handle_command(&cmd),
                        Err(err) => warn!("Ignoring bad command {line:?}: {err}"),
                    }
                }
            }
        }
    }

    /// Advance one sensor pass and report it.
    pub fn next_frame(&mut self) -> TelemetryFrame {
        self.tick += 1;

        // The chassis only moves while the drive is enabled.
        if self.enabled {
            self.phase += std::f64::consts::TAU / SWEEP_TICKS;

            if self.loss_every > 0 && self.tick % self.loss_every == 0 {
                self.loss_remaining = LOSS_TICKS;
                self.lost_side = match self.last_black {
                    LineLoss::Right => LineLoss::Right,
                    _ => LineLoss::Left,
                };
            }
        }

        let in_loss = self.loss_remaining > 0;
        if in_loss {
            self.loss_remaining -= 1;
        }

        let (left_black, right_black) = if in_loss {
            (false, false)
        } else {
            let line_pos = SWEEP_AMPLITUDE * self.phase.sin();
            (
                (line_pos + SENSOR_OFFSET).abs() <= SENSOR_HALF_WIDTH,
                (line_pos - SENSOR_OFFSET).abs() <= SENSOR_HALF_WIDTH,
            )
        };

        if left_black {
            self.last_black = LineLoss::Left;
        }
        if right_black {
            self.last_black = LineLoss::Right;
        }

        let loss = if in_loss { self.lost_side } else { LineLoss::None };

        let steer = if !self.enabled {
            Steer::Straight
        } else if in_loss {
            match self.lost_side {
                LineLoss::Left => Steer::Left,
                LineLoss::Right => Steer::Right,
                LineLoss::None => Steer::Straight,
            }
        } else if left_black {
            Steer::Left
        } else if right_black {
            Steer::Right
        } else {
            Steer::Straight
        };

        TelemetryFrame {
            left_raw: self.reading(left_black, 0),
            left_surface: if left_black {
                Surface::Black
            } else {
                Surface::White
            },
            right_raw: self.reading(right_black, 17),
            right_surface: if right_black {
                Surface::Black
            } else {
                Surface::White
            },
            loss,
            steer,
        }
    }

    /// A reading inside the band for the surface, varying with time the
    /// way a noisy ADC does.
    fn reading(&self, black: bool, salt: u64) -> u16 {
        if black {
            BLACK_MIN + 120 + ((self.tick * 7 + salt) % 300) as u16
        } else {
            30 + ((self.tick * 3 + salt) % 90) as u16
        }
    }
}

impl Default for FirmwareSim {
    fn default() -> Self {
        Self::new()
    }
}
