//! Mock line-tracker firmware over a serial port
//!
//! Emits telemetry lines at the firmware's ~15 ms sensor-pass cadence and
//! executes any commands or DAC packets that arrive between sends. Point
//! the dashboard tools at the other end of a virtual serial pair, e.g.
//!
//!   socat -d -d pty,raw,echo=0,link=/tmp/ttyV0 pty,raw,echo=0,link=/tmp/ttyV1
//!
//! to exercise the full protocol without hardware.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use hardware::robot::{FirmwareSim, LinkArgs};
use trackbot::convert::TELEMETRY_INTERVAL;
use trackbot::Command;

#[derive(Parser, Debug)]
#[command(name = "mock_robot")]
#[command(about = "Mock line-tracker firmware transmitter")]
struct Args {
    /// Serial link options (use --list-ports to see available ports)
    #[command(flatten)]
    link: LinkArgs,

    /// Telemetry interval in milliseconds
    #[arg(short, long, default_value_t = TELEMETRY_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    /// Number of frames to send (0 = infinite)
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Inject a line-loss episode every N frames (0 = never)
    #[arg(long, default_value = "0")]
    loss_every: u64,

    /// Start with the drive enabled instead of waiting for E
    #[arg(long)]
    enabled: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.link.handle_list_ports()? {
        return Ok(());
    }

    info!(
        "Opening serial port: {} at {} bps",
        args.link.port, args.link.baud
    );
    let mut port = serialport::new(&args.link.port, args.link.baud)
        .timeout(Duration::from_millis(1))
        .open()
        .with_context(|| format!("Failed to open serial port {}", args.link.port))?;

    let mut sim = FirmwareSim::new();
    sim.set_loss_every(args.loss_every);
    if args.enabled {
        sim.handle_command(&Command::Enable);
    }

    let interval = Duration::from_millis(args.interval_ms);
    let mut frame_count: u64 = 0;
    let mut read_buffer = [0u8; 256];

    info!(
        "Starting telemetry transmission at {}ms intervals",
        args.interval_ms
    );
    if args.loss_every > 0 {
        info!(
            "Injecting a line-loss episode every {} frames",
            args.loss_every
        );
    }

    let start_time = Instant::now();
    let mut next_send = Instant::now();

    loop {
        let now = Instant::now();

        if now >= next_send {
            let frame = sim.next_frame();
            let line = format!("{frame}\n");
            port.write_all(line.as_bytes())
                .context("Failed to write telemetry line")?;
            debug!("Sent {frame}");

            frame_count += 1;
            next_send += interval;

            if args.count > 0 && frame_count >= args.count {
                break;
            }

            if frame_count % 500 == 0 {
                let elapsed = start_time.elapsed().as_secs_f64();
                let rate = frame_count as f64 / elapsed;
                info!("Sent {frame_count} frames in {elapsed:.2}s ({rate:.1} Hz)");
            }
        }

        // Execute anything the host sent since the last pass. The 1ms read
        // timeout paces the loop between sends.
        match port.read(&mut read_buffer) {
            Ok(n) if n > 0 => sim.feed_bytes(&read_buffer[..n]),
            Ok(_) => std::thread::sleep(Duration::from_micros(100)),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!("Read error: {e:?}");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    let elapsed = start_time.elapsed().as_secs_f64();
    let rate = frame_count as f64 / elapsed;
    let (left, right) = sim.speeds();
    info!("Complete: {frame_count} frames in {elapsed:.2}s ({rate:.1} Hz)");
    info!(
        "Final state: enabled={}, speeds {left}% / {right}%",
        sim.enabled()
    );

    Ok(())
}
