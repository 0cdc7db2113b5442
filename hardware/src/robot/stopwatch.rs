//! Lap stopwatch.
//!
//! Times laps around the course. With a link attached, starting a lap
//! enables the drive and sets both motors, and stopping disables the
//! drive; without one it is a plain stopwatch. The robot-side writes
//! happen before the clock changes state, so a failed write leaves the
//! timer where it was.

use std::time::{Duration, Instant};

use log::info;
use thiserror::Error;

use trackbot::{Command, CommandError};

use super::link::{LinkError, RobotLink};

#[derive(Error, Debug)]
pub enum StopwatchError {
    #[error("stopwatch already running")]
    AlreadyRunning,

    #[error("stopwatch is not running")]
    NotRunning,

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

#[derive(Debug, Default)]
pub struct LapTimer {
    started: Option<Instant>,
    laps: Vec<Duration>,
    best: Option<Duration>,
}

impl LapTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lap. With a link, sends drive-enable then the speed for
    /// both motors.
    pub fn start(
        &mut self,
        link: Option<&mut RobotLink>,
        speed: u8,
    ) -> Result<(), StopwatchError> {
        if self.started.is_some() {
            return Err(StopwatchError::AlreadyRunning);
        }

        let speed_cmd = Command::both(speed)?;
        if let Some(link) = link {
            link.send(&Command::Enable)?;
            link.send(&speed_cmd)?;
        }

        self.started = Some(Instant::now());
        Ok(())
    }

    /// Stop the lap. With a link, disables the drive first; the lap is
    /// only recorded once that write succeeds.
    pub fn stop(&mut self, link: Option<&mut RobotLink>) -> Result<Duration, StopwatchError> {
        let started = self.started.ok_or(StopwatchError::NotRunning)?;

        if let Some(link) = link {
            link.send(&Command::Disable)?;
        }

        let lap = started.elapsed();
        self.started = None;
        self.laps.push(lap);

        if self.best.map_or(true, |best| lap < best) {
            self.best = Some(lap);
            info!("New best lap: {:.2}s", lap.as_secs_f64());
        }
        Ok(lap)
    }

    /// Clear the running state and recorded laps. The best lap survives
    /// a reset.
    pub fn reset(&mut self) {
        self.started = None;
        self.laps.clear();
    }

    /// Live elapsed time while running, otherwise the last lap.
    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => started.elapsed(),
            None => self.laps.last().copied().unwrap_or(Duration::ZERO),
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn best_lap(&self) -> Option<Duration> {
        self.best
    }

    pub fn laps(&self) -> &[Duration] {
        &self.laps
    }
}
