//! Battery Gauge Monitor
//!
//! Polls the OSD's battery sensor and keeps voltage, state of charge and
//! estimated remaining runtime drawn on screen until interrupted with
//! Ctrl-C, then restores the device's previous configuration.
//!
//! Usage:
//!   cargo run --example monitor                          # defaults
//!   cargo run --example monitor -- -p /dev/ttyUSB1 -b 57600
//!   cargo run --example monitor -- -s 0.15               # sag correction
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=debug cargo run --example monitor

use clap::Parser;
use log::{error, info};
use osd_battery::constants::{DEFAULT_BAUD_RATE, DEFAULT_PORT};
use osd_battery::{BatteryMonitor, MonitorConfig, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "monitor")]
#[command(about = "Show battery voltage and remaining runtime on an OSD")]
struct Args {
    /// Serial port the OSD is connected to
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    /// Baud rate; must match the configured OSD value
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Per-cell voltage sag under load, in volts
    #[arg(short, long, default_value_t = 0.0)]
    sag: f64,
}

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Ctrl-C raises the stop flag; the monitor notices at its next
    // checkpoint and unwinds through the restore sequence.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .expect("failed to install Ctrl-C handler");
    }

    let config = MonitorConfig {
        port: args.port,
        baud_rate: args.baud,
        voltage_sag: args.sag,
        ..MonitorConfig::default()
    };

    info!(
        "Connecting to OSD on {} at {} baud...",
        config.port, config.baud_rate
    );
    let monitor = match BatteryMonitor::connect(config, stop) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Failed to open OSD connection: {}", e);
            return Err(e);
        }
    };

    let report = monitor.run()?;

    info!("=== Session Summary ===");
    if let Ok(json) = serde_json::to_string_pretty(&report) {
        info!("{}", json);
    }

    Ok(())
}
