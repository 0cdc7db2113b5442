//! Host-side support for the trackbot line-follower robot.
//!
//! Wraps the wire protocol from the `trackbot` crate with a serial link
//! manager, operation-mode control, telemetry history, a lap stopwatch,
//! and a deterministic firmware simulator used by the mock tools.

pub mod robot;
