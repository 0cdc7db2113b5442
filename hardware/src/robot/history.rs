//! Rolling telemetry history.
//!
//! Keeps the most recent telemetry frames in a fixed-capacity window,
//! stamped relative to the history epoch. Fifty samples at the host's
//! 20 Hz poll rate is the dashboard graph's 2.5 second window.

use std::collections::vec_deque::Iter;
use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use trackbot::TelemetryFrame;

/// Samples kept in the rolling window.
pub const HISTORY_LENGTH: usize = 50;

/// One telemetry frame with its arrival offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the history epoch (creation or last clear).
    pub offset_ms: u64,
    pub frame: TelemetryFrame,
}

/// Fixed-capacity sample window that evicts the oldest entry when full.
#[derive(Debug)]
pub struct SampleHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
    epoch: Instant,
}

impl SampleHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_LENGTH)
    }

    /// # Panics
    /// Panics if capacity is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than 0");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            epoch: Instant::now(),
        }
    }

    /// Record a frame, evicting the oldest sample at capacity.
    pub fn push(&mut self, frame: TelemetryFrame) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample {
            offset_ms: self.epoch.elapsed().as_millis() as u64,
            frame,
        });
    }

    /// The most recent sample, if any.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all samples and restart the epoch.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.epoch = Instant::now();
    }

    /// Min and max raw reading across both sensors in the window, for
    /// graph scaling. `None` while empty.
    pub fn channel_bounds(&self) -> Option<(u16, u16)> {
        let mut bounds: Option<(u16, u16)> = None;
        for sample in &self.samples {
            for raw in [sample.frame.left_raw, sample.frame.right_raw] {
                bounds = Some(match bounds {
                    None => (raw, raw),
                    Some((lo, hi)) => (lo.min(raw), hi.max(raw)),
                });
            }
        }
        bounds
    }
}

impl Default for SampleHistory {
    fn default() -> Self {
        Self::new()
    }
}
