/* gmmk-rgb entrypoint: sets up tracing, acquires the keyboard, runs the requested lighting
 * command (or the demo cycle), and releases the device on every exit path. */
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gmmk_rgb::command::{MAX_BRIGHTNESS, MAX_LED_MODE};
use gmmk_rgb::{DeviceConfig, Keyboard, RusbDevice, Session, UsbTransport};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Per-transfer timeout in milliseconds
    #[arg(long, env = "GMMK_TIMEOUT_MS", default_value_t = 1000)]
    timeout_ms: u64,

    /// Pause between LED modes in the demo, in milliseconds
    #[arg(long, env = "GMMK_STEP_DELAY_MS", default_value_t = 1000)]
    step_delay_ms: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Set backlight brightness (0-3)
    Brightness {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=3))]
        level: u8,
    },
    /// Select an LED animation mode (0-18)
    Mode {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=18))]
        mode: u8,
    },
    /// Switch to an onboard profile (0-2). EXPERIMENTAL: sends unverified placeholder tables
    ///
    /// The profile tables built into this tool are placeholders that have not been checked
    /// against a capture from real hardware. Use at your own risk.
    Profile {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=2))]
        profile: u8,
    },
    /// Cycle brightness 0-3, then every LED mode
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting gmmk-rgb version {}", env!("CARGO_PKG_VERSION"));

    let config = DeviceConfig::default().with_timeout(Duration::from_millis(cli.timeout_ms));
    let mut session = Session::open(&config).with_context(|| {
        format!(
            "Failed to acquire keyboard {:04x}:{:04x}",
            config.vendor_id, config.product_id
        )
    })?;

    let step_delay = Duration::from_millis(cli.step_delay_ms);
    let result = run(session.keyboard(), cli.command.unwrap_or(Command::Demo), step_delay).await;

    /* Release before reporting so the kernel driver is back even when the command failed */
    let released = session.release().context("Failed to release keyboard");
    result?;
    released
}

async fn run(
    mut kb: Keyboard<'_, UsbTransport<RusbDevice>>,
    command: Command,
    step_delay: Duration,
) -> Result<()> {
    match command {
        Command::Brightness { level } => kb
            .set_brightness(level)
            .await
            .with_context(|| format!("Failed to set brightness {level}"))?,
        Command::Mode { mode } => kb
            .set_led_mode(mode)
            .await
            .with_context(|| format!("Failed to set LED mode {mode}"))?,
        Command::Profile { profile } => {
            warn!("Profile switching is experimental and sends unverified placeholder tables");
            kb.set_profile(profile)
                .await
                .with_context(|| format!("Failed to select profile {profile}"))?
        }
        Command::Demo => {
            for level in 0..=MAX_BRIGHTNESS {
                if level > 0 {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                kb.set_brightness(level)
                    .await
                    .with_context(|| format!("Failed to set brightness {level}"))?;
            }
            for mode in 0..=MAX_LED_MODE {
                tokio::time::sleep(step_delay).await;
                kb.set_led_mode(mode)
                    .await
                    .with_context(|| format!("Failed to set LED mode {mode}"))?;
            }
        }
    }
    Ok(())
}
