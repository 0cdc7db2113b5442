//! Text command channel.
//!
//! Host-to-robot commands are single ASCII lines terminated by `\n`:
//!
//! | line       | meaning                        |
//! |------------|--------------------------------|
//! | `L<0-100>` | left motor speed, percent      |
//! | `R<0-100>` | right motor speed, percent     |
//! | `S<0-100>` | both motor speeds, percent     |
//! | `E`        | enable line-follower drive     |
//! | `D`        | disable drive                  |
//!
//! Verbs are case-sensitive. [`Command::parse`] is the firmware-side
//! reading of the same grammar, used by the mock robot.

use thiserror::Error;

/// Highest legal speed percentage.
pub const MAX_SPEED: u8 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command verb {0:?}")]
    UnknownVerb(char),

    #[error("bad speed value {0:?}")]
    BadSpeed(String),

    #[error("speed {0} out of range (0-{MAX_SPEED})")]
    SpeedOutOfRange(u32),

    #[error("unexpected input after {verb:?}: {rest:?}")]
    TrailingInput { verb: char, rest: String },
}

/// A single robot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set left motor speed.
    Left(u8),
    /// Set right motor speed.
    Right(u8),
    /// Set both motor speeds.
    Both(u8),
    /// Enable line-follower drive.
    Enable,
    /// Disable drive; motors stop.
    Disable,
}

impl Command {
    /// Left-motor speed command, validated to 0-100.
    pub fn left(percent: u8) -> Result<Self, CommandError> {
        check_speed(percent)?;
        Ok(Command::Left(percent))
    }

    /// Right-motor speed command, validated to 0-100.
    pub fn right(percent: u8) -> Result<Self, CommandError> {
        check_speed(percent)?;
        Ok(Command::Right(percent))
    }

    /// Both-motors speed command, validated to 0-100.
    pub fn both(percent: u8) -> Result<Self, CommandError> {
        check_speed(percent)?;
        Ok(Command::Both(percent))
    }

    /// The speed payload, if this command carries one.
    pub fn speed(&self) -> Option<u8> {
        match self {
            Command::Left(n) | Command::Right(n) | Command::Both(n) => Some(*n),
            Command::Enable | Command::Disable => None,
        }
    }

    /// Wire bytes: the command line with its terminating newline.
    pub fn encode(&self) -> Vec<u8> {
        format!("{self}\n").into_bytes()
    }

    /// Parse one command line (terminator already stripped).
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut chars = line.chars();
        let verb = chars.next().ok_or(CommandError::Empty)?;
        let rest = chars.as_str();

        match verb {
            'E' | 'D' => {
                if !rest.is_empty() {
                    return Err(CommandError::TrailingInput {
                        verb,
                        rest: rest.to_string(),
                    });
                }
                Ok(if verb == 'E' {
                    Command::Enable
                } else {
                    Command::Disable
                })
            }
            'L' | 'R' | 'S' => {
                let value: u32 = rest
                    .parse()
                    .map_err(|_| CommandError::BadSpeed(rest.to_string()))?;
                if value > MAX_SPEED as u32 {
                    return Err(CommandError::SpeedOutOfRange(value));
                }
                let speed = value as u8;
                Ok(match verb {
                    'L' => Command::Left(speed),
                    'R' => Command::Right(speed),
                    _ => Command::Both(speed),
                })
            }
            other => Err(CommandError::UnknownVerb(other)),
        }
    }
}

fn check_speed(percent: u8) -> Result<(), CommandError> {
    if percent > MAX_SPEED {
        return Err(CommandError::SpeedOutOfRange(percent as u32));
    }
    Ok(())
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Left(n) => write!(f, "L{n}"),
            Command::Right(n) => write!(f, "R{n}"),
            Command::Both(n) => write!(f, "S{n}"),
            Command::Enable => write!(f, "E"),
            Command::Disable => write!(f, "D"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_all_verbs() {
        assert_eq!(Command::Left(50).encode(), b"L50\n");
        assert_eq!(Command::Right(0).encode(), b"R0\n");
        assert_eq!(Command::Both(100).encode(), b"S100\n");
        assert_eq!(Command::Enable.encode(), b"E\n");
        assert_eq!(Command::Disable.encode(), b"D\n");
    }

    #[test]
    fn test_parse_speed_commands() {
        assert_eq!(Command::parse("L50"), Ok(Command::Left(50)));
        assert_eq!(Command::parse("R0"), Ok(Command::Right(0)));
        assert_eq!(Command::parse("S100"), Ok(Command::Both(100)));
    }

    #[test]
    fn test_parse_bare_verbs() {
        assert_eq!(Command::parse("E"), Ok(Command::Enable));
        assert_eq!(Command::parse("D"), Ok(Command::Disable));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Command::parse("l50"), Err(CommandError::UnknownVerb('l')));
        assert_eq!(Command::parse("e"), Err(CommandError::UnknownVerb('e')));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(
            Command::parse("L101"),
            Err(CommandError::SpeedOutOfRange(101))
        );
        assert_eq!(
            Command::parse("S300"),
            Err(CommandError::SpeedOutOfRange(300))
        );
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        assert_eq!(
            Command::parse("L-1"),
            Err(CommandError::BadSpeed("-1".to_string()))
        );
        assert_eq!(
            Command::parse("L1x"),
            Err(CommandError::BadSpeed("1x".to_string()))
        );
        assert_eq!(
            Command::parse("L"),
            Err(CommandError::BadSpeed(String::new()))
        );
    }

    #[test]
    fn test_parse_rejects_trailing_input() {
        assert_eq!(
            Command::parse("E5"),
            Err(CommandError::TrailingInput {
                verb: 'E',
                rest: "5".to_string()
            })
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Command::parse(""), Err(CommandError::Empty));
    }

    #[test]
    fn test_constructors_validate() {
        assert_eq!(Command::left(100), Ok(Command::Left(100)));
        assert_eq!(Command::both(101), Err(CommandError::SpeedOutOfRange(101)));
    }

    #[test]
    fn test_display_matches_parse() {
        for cmd in [
            Command::Left(7),
            Command::Right(99),
            Command::Both(42),
            Command::Enable,
            Command::Disable,
        ] {
            assert_eq!(Command::parse(&cmd.to_string()), Ok(cmd));
        }
    }

    #[test]
    fn test_speed_accessor() {
        assert_eq!(Command::Both(42).speed(), Some(42));
        assert_eq!(Command::Enable.speed(), None);
    }
}
