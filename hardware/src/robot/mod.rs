//! Robot link management and control logic.
//!
//! Provides the serial link to the controller plus the host-side pieces
//! built on top of it: operation modes, telemetry history, the lap
//! stopwatch, and the firmware simulator behind `mock_robot`.

mod history;
mod link;
mod modes;
mod sim;
mod stopwatch;

pub use history::{Sample, SampleHistory, HISTORY_LENGTH};
pub use link::{LinkArgs, LinkError, RobotLink};
pub use modes::{
    builtin_profiles, load_profiles, ModeController, ModeKind, ModeProfile, ProfileError,
    SpeedUpdate,
};
pub use sim::FirmwareSim;
pub use stopwatch::{LapTimer, StopwatchError};

use serialport::SerialPortInfo;

/// List serial ports visible to the host.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, serialport::Error> {
    serialport::available_ports()
}

/// Print port info to stdout in a formatted way.
pub fn print_port_info(index: usize, info: &SerialPortInfo) {
    match &info.port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            println!(
                "  [{}] {} - USB {:04x}:{:04x} {}",
                index,
                info.port_name,
                usb.vid,
                usb.pid,
                usb.product.as_deref().unwrap_or("(unnamed)")
            );
        }
        other => {
            println!("  [{}] {} - {:?}", index, info.port_name, other);
        }
    }
}
