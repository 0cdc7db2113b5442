//! Send drive commands to the line tracker
//!
//! One-shot counterpart of the dashboard controls: motor speeds, drive
//! enable/disable, operation-mode switches and raw DAC writes. Speed
//! actions echo the DAC code and output voltage they translate to, and
//! `--watch` tails telemetry afterwards to confirm the effect.
//!
//! Closing the link disables anything this invocation set in motion, so
//! `--enable` and `--dac` keep the motors running only while the tool is
//! alive. Pair them with `--watch` to hold the session open.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use hardware::robot::{load_profiles, LinkArgs, ModeController, ModeKind, RobotLink};
use trackbot::convert::{dac_code, output_voltage, percent_from_code, POLL_INTERVAL};
use trackbot::{Command, DacPacket, OutputPort};

#[derive(Parser, Debug)]
#[command(name = "drive")]
#[command(about = "Line-tracker drive and mode control")]
struct Args {
    /// Serial link options (use --list-ports to see available ports)
    #[command(flatten)]
    link: LinkArgs,

    /// Enable the line follower (runs until this tool exits)
    #[arg(long)]
    enable: bool,

    /// Set both motor speeds (0-100)
    #[arg(long, value_name = "PERCENT", conflicts_with_all = ["left", "right"])]
    both: Option<u8>,

    /// Set left motor speed (0-100)
    #[arg(long, value_name = "PERCENT")]
    left: Option<u8>,

    /// Set right motor speed (0-100)
    #[arg(long, value_name = "PERCENT")]
    right: Option<u8>,

    /// Switch operation mode, rescaling the current speeds
    #[arg(long, value_enum)]
    mode: Option<ModeKind>,

    /// JSON file with mode profile overrides
    #[arg(long, value_name = "PATH")]
    profiles: Option<PathBuf>,

    /// Raw DAC write as <output>:<code> (output 1 or 2, code 0-255)
    #[arg(long, value_name = "N:CODE")]
    dac: Option<String>,

    /// Disable the drive after everything else
    #[arg(long)]
    disable: bool,

    /// Print telemetry for this many seconds before exiting
    #[arg(long, default_value = "0", value_name = "SECS")]
    watch: u64,
}

/// Parse `<output>:<code>` into a checksummed packet.
fn parse_dac_spec(spec: &str) -> Result<DacPacket> {
    let (output, code) = spec
        .split_once(':')
        .with_context(|| format!("Bad DAC spec {spec:?}: expected <output>:<code>"))?;
    let port = match output {
        "1" => OutputPort::Dac1,
        "2" => OutputPort::Dac2,
        other => bail!("Bad DAC output {other:?}: expected 1 or 2"),
    };
    let code: u8 = code
        .parse()
        .with_context(|| format!("Bad DAC code {code:?}: expected 0-255"))?;
    Ok(DacPacket::new(port, code))
}

fn send_speed(link: &mut RobotLink, cmd: Command, label: &str) -> Result<()> {
    // Constructors validated the range, so speed() is always present here.
    let percent = cmd.speed().unwrap_or(0);
    link.send(&cmd)?;
    info!(
        "{label} {percent}% -> DAC code {} ({:+.1} V)",
        dac_code(percent),
        output_voltage(percent)
    );
    Ok(())
}

fn watch_telemetry(link: &mut RobotLink, secs: u64) -> Result<()> {
    info!("Watching telemetry for {secs}s...");
    let deadline = Instant::now() + Duration::from_secs(secs);

    while Instant::now() < deadline {
        match link.poll() {
            Ok(frames) => {
                for frame in frames {
                    println!("{frame}");
                }
            }
            Err(e) => {
                warn!("Read error: {e}");
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.link.handle_list_ports()? {
        return Ok(());
    }

    let no_action = !args.enable
        && !args.disable
        && args.both.is_none()
        && args.left.is_none()
        && args.right.is_none()
        && args.mode.is_none()
        && args.dac.is_none();
    if no_action && args.watch == 0 {
        bail!("No action requested (see --help)");
    }

    // Validate before touching the port.
    let dac_packet = args.dac.as_deref().map(parse_dac_spec).transpose()?;

    let mut link = args.link.open()?;

    if args.enable {
        link.send(&Command::Enable)?;
        info!("Drive enabled");
    }

    if let Some(percent) = args.both {
        send_speed(&mut link, Command::both(percent)?, "Both motors")?;
    }
    if let Some(percent) = args.left {
        send_speed(&mut link, Command::left(percent)?, "Left motor")?;
    }
    if let Some(percent) = args.right {
        send_speed(&mut link, Command::right(percent)?, "Right motor")?;
    }

    if let Some(kind) = args.mode {
        let mut modes = match &args.profiles {
            Some(path) => ModeController::with_overrides(load_profiles(path)?),
            None => ModeController::new(),
        };
        // Rescale from the speeds this invocation set, or the firmware
        // boot default of 50% per side.
        let left = args.left.or(args.both).unwrap_or(50);
        let right = args.right.or(args.both).unwrap_or(50);
        modes.switch(kind, Some(&mut link), left, right)?;
    }

    if let Some(packet) = dac_packet {
        link.write_dac(&packet)?;
        info!(
            "{} ({} motor) code {} -> {}% ({:+.1} V)",
            packet.port,
            packet.port.motor(),
            packet.data,
            percent_from_code(packet.data),
            output_voltage(percent_from_code(packet.data))
        );
    }

    if args.disable {
        link.send(&Command::Disable)?;
        info!("Drive disabled");
    }

    if args.watch > 0 {
        watch_telemetry(&mut link, args.watch)?;
    }

    Ok(())
}
