//! Unit conversions and device constants.
//!
//! Motor speed is expressed to users as a 0-100 percentage. The
//! controller's 8-bit DACs span the full drive range, with the output
//! stage mapping code 0 to -15 V, code 128 (50%) to ~0 V, and code 255
//! to +15 V. The IR line sensors are read by a 10-bit ADC.

use std::time::Duration;

/// Serial line rate of the controller.
pub const BAUD_RATE: u32 = 9600;

/// Firmware sensor-pass period (~67 Hz telemetry).
pub const TELEMETRY_INTERVAL: Duration = Duration::from_millis(15);

/// Host poll period (~20 Hz); each poll drains everything buffered.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lowest possible IR sensor reading.
pub const SENSOR_MIN: u16 = 0;

/// Highest possible IR sensor reading (10-bit ADC).
pub const SENSOR_MAX: u16 = 1023;

/// Readings at or below this are reliably white surface.
pub const WHITE_MAX: u16 = 150;

/// Readings at or above this are reliably black line.
pub const BLACK_MIN: u16 = 400;

/// 8-bit DAC code for a speed percentage.
///
/// The controller scales at 2.55 codes per percent; inputs above 100
/// saturate at 255.
pub fn dac_code(percent: u8) -> u8 {
    (2.55 * percent as f64).round().clamp(0.0, 255.0) as u8
}

/// Nearest speed percentage for a DAC code.
pub fn percent_from_code(code: u8) -> u8 {
    (code as f64 / 2.55).round().clamp(0.0, 100.0) as u8
}

/// Motor output voltage for a speed percentage.
///
/// 0% is full reverse (-15 V), 50% is stopped (0 V), 100% is full
/// forward (+15 V).
pub fn output_voltage(percent: u8) -> f64 {
    (percent as f64 - 50.0) * (15.0 / 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dac_code_endpoints() {
        assert_eq!(dac_code(0), 0);
        assert_eq!(dac_code(50), 128);
        assert_eq!(dac_code(100), 255);
    }

    #[test]
    fn test_dac_code_saturates() {
        assert_eq!(dac_code(200), 255);
    }

    #[test]
    fn test_percent_from_code_endpoints() {
        assert_eq!(percent_from_code(0), 0);
        assert_eq!(percent_from_code(128), 50);
        assert_eq!(percent_from_code(255), 100);
    }

    #[test]
    fn test_code_percent_inverse_at_endpoints() {
        for percent in [0u8, 50, 100] {
            assert_eq!(percent_from_code(dac_code(percent)), percent);
        }
    }

    #[test]
    fn test_output_voltage_mapping() {
        assert!((output_voltage(0) + 15.0).abs() < 1e-9);
        assert!(output_voltage(50).abs() < 1e-9);
        assert!((output_voltage(100) - 15.0).abs() < 1e-9);
        assert!((output_voltage(75) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_bands_are_disjoint() {
        assert!(WHITE_MAX < BLACK_MIN);
        assert!(BLACK_MIN < SENSOR_MAX);
    }
}
