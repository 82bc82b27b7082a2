//! Raw Command Exchange
//!
//! Sends one command to the OSD and prints the decoded response payload.
//! Useful for poking at a device interactively, checking sensor wiring,
//! or trying out commands before scripting them.
//!
//! Usage:
//!   cargo run --example command -- " GET_SENSOR 0 "    # interactive port pick
//!   cargo run --example command -- -p /dev/ttyUSB0 " GET_VERSION "
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=trace cargo run --example command -- " CLEAR "

use clap::Parser;
use inquire::Select;
use log::info;
use osd_battery::constants::DEFAULT_BAUD_RATE;
use osd_battery::{Osd, Result};

#[derive(Parser)]
#[command(name = "command")]
#[command(about = "Send a raw command to an OSD and print the response")]
struct Args {
    /// Serial port; selected interactively when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate; must match the configured OSD value
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Command to send, including any leading/trailing spaces
    command: String,
}

/// Interactive serial port selection using inquire
fn select_port() -> Result<String> {
    let ports = Osd::list_ports()?;
    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let choices: Vec<String> = ports
        .iter()
        .map(|p| format!("{} - {:?}", p.port_name, p.port_type))
        .collect();
    let picked = Select::new("Serial port the OSD is on:", choices)
        .prompt()
        .map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::Other, format!("no port picked: {}", e))
        })?;

    // Drop the port-type suffix added above.
    Ok(picked.split(" - ").next().unwrap().to_string())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let port = match args.port {
        Some(port) => port,
        None => select_port()?,
    };

    info!("Connecting to OSD on {} at {} baud...", port, args.baud);
    let mut osd = Osd::open(&port, args.baud)?;
    osd.set_echo(true);

    let payload = osd.exchange(&args.command)?;
    println!();
    println!("payload: {:?}", payload);

    Ok(())
}
