//! Listen for line-tracker telemetry over a serial port
//!
//! Receives sensor frames at the firmware's ~67 Hz emit rate, draining the
//! port at the dashboard's 20 Hz poll cadence. Validates and parses each
//! line, reports tracking and rate statistics, and optionally records
//! frames as JSON lines for the learning-mode workflow.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::{debug, info, warn};
use serde::Serialize;

use hardware::robot::{LinkArgs, RobotLink, SampleHistory};
use trackbot::convert::POLL_INTERVAL;
use trackbot::telemetry::{LineLoss, Steer};
use trackbot::TelemetryFrame;

#[derive(Parser, Debug)]
#[command(name = "listen_robot")]
#[command(about = "Line-tracker telemetry receiver and validator")]
struct Args {
    /// Serial link options (use --list-ports to see available ports)
    #[command(flatten)]
    link: LinkArgs,

    /// Number of frames to receive (0 = infinite)
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Report statistics interval in frames
    #[arg(long, default_value = "200")]
    report_interval: u64,

    /// Record received frames to a JSON-lines file
    #[arg(long)]
    record: Option<PathBuf>,
}

/// Rolling frame statistics
struct Statistics {
    total_frames: u64,
    lost_left: u64,
    lost_right: u64,
    steer_left: u64,
    steer_right: u64,
    start_time: Instant,
    last_report_time: Instant,
    last_report_count: u64,
}

impl Statistics {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            total_frames: 0,
            lost_left: 0,
            lost_right: 0,
            steer_left: 0,
            steer_right: 0,
            start_time: now,
            last_report_time: now,
            last_report_count: 0,
        }
    }

    fn record_frame(&mut self, frame: &TelemetryFrame) {
        self.total_frames += 1;

        match frame.loss {
            LineLoss::Left => self.lost_left += 1,
            LineLoss::Right => self.lost_right += 1,
            LineLoss::None => {}
        }

        match frame.steer {
            Steer::Left => self.steer_left += 1,
            Steer::Right => self.steer_right += 1,
            Steer::Straight => {}
        }
    }

    fn tracking_pct(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        let lost = self.lost_left + self.lost_right;
        100.0 * (self.total_frames - lost) as f64 / self.total_frames as f64
    }

    fn report(&mut self, link: &RobotLink, history: &SampleHistory) {
        let now = Instant::now();
        let total_elapsed = self.start_time.elapsed().as_secs_f64();
        let interval_elapsed = now.duration_since(self.last_report_time).as_secs_f64();
        let interval_frames = self.total_frames - self.last_report_count;

        let total_rate = self.total_frames as f64 / total_elapsed;
        let interval_rate = interval_frames as f64 / interval_elapsed;

        info!(
            "Frames: {} | Rate: {:.1} Hz (interval: {:.1} Hz) | Tracking: {:.1}% | Loss: L={} R={} | Steer: L={} R={} | Window: {} | Parse errors: {}",
            self.total_frames,
            total_rate,
            interval_rate,
            self.tracking_pct(),
            self.lost_left,
            self.lost_right,
            self.steer_left,
            self.steer_right,
            format_bounds(history),
            link.parse_errors()
        );

        self.last_report_time = now;
        self.last_report_count = self.total_frames;
    }

    fn final_report(&self, link: &RobotLink) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = self.total_frames as f64 / elapsed;
        let lost = self.lost_left + self.lost_right;

        info!("=== Final Statistics ===");
        info!("Total frames: {}", self.total_frames);
        info!("Duration: {elapsed:.2}s");
        info!("Average rate: {rate:.1} Hz");
        info!(
            "Tracking: {:.1}% ({}/{})",
            self.tracking_pct(),
            self.total_frames - lost,
            self.total_frames
        );
        info!("Line lost: left={}, right={}", self.lost_left, self.lost_right);
        info!(
            "Steer corrections: left={}, right={}",
            self.steer_left, self.steer_right
        );
        info!("Parse errors: {}", link.parse_errors());
        info!("Discarded lines: {}", link.discarded_lines());
    }
}

/// Raw-reading range over the history window, for graph scaling.
fn format_bounds(history: &SampleHistory) -> String {
    match history.channel_bounds() {
        Some((lo, hi)) => format!("{lo}-{hi}"),
        None => "-".to_string(),
    }
}

/// One recorded line: receive timestamp plus the frame fields.
#[derive(Serialize)]
struct RecordEntry {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    frame: TelemetryFrame,
}

/// JSON-lines frame recorder
struct Recorder {
    writer: BufWriter<File>,
}

impl Recorder {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create record file {}", path.display()))?;
        info!("Recording frames to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, frame: &TelemetryFrame) -> Result<()> {
        let entry = RecordEntry {
            timestamp: Utc::now(),
            frame: *frame,
        };
        serde_json::to_writer(&mut self.writer, &entry).context("Failed to encode frame")?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

fn run_listener(mut link: RobotLink, args: &Args) -> Result<()> {
    info!("Listening for telemetry on {}...", link.port_name());
    info!(
        "Will report statistics every {} frames",
        args.report_interval
    );

    let mut stats = Statistics::new();
    let mut history = SampleHistory::new();
    let mut recorder = match &args.record {
        Some(path) => Some(Recorder::create(path)?),
        None => None,
    };

    loop {
        let frames = match link.poll() {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Read error: {e}");
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        for frame in frames {
            stats.record_frame(&frame);
            history.push(frame);
            debug!("{frame}");

            if let Some(recorder) = recorder.as_mut() {
                recorder.write(&frame)?;
            }

            // Report statistics periodically
            if args.report_interval > 0 && stats.total_frames % args.report_interval == 0 {
                stats.report(&link, &history);
            }

            // Check if we've hit the count limit
            if args.count > 0 && stats.total_frames >= args.count {
                if let Some(recorder) = recorder.as_mut() {
                    recorder.flush()?;
                }
                stats.final_report(&link);
                return Ok(());
            }
        }

        if let Some(recorder) = recorder.as_mut() {
            recorder.flush()?;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.link.handle_list_ports()? {
        return Ok(());
    }

    let link = args.link.open()?;
    run_listener(link, &args)
}
