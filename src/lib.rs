//! # OSD Battery Gauge
//!
//! A Rust library for running a battery gauge on GSOSD-style on-screen
//! display devices over a serial link. The OSD measures the pack voltage
//! on one of its sensor inputs; this library polls that sensor, converts
//! the voltage to a state-of-charge percentage through a LiPo calibration
//! curve, estimates the remaining runtime from the observed discharge
//! rate, and keeps the result drawn on screen.
//!
//! ## Features
//!
//! - Framed command exchange with the device (SOH/STX/ETX/EOT control bytes)
//! - Piecewise-linear open-circuit-voltage to state-of-charge conversion
//! - Noise-tolerant discharge-rate and remaining-runtime estimation
//! - Polling control loop with clean cancellation and device-state restore
//!
//! ## Example
//!
//! ```no_run
//! use osd_battery::{BatteryMonitor, MonitorConfig};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stop = Arc::new(AtomicBool::new(false));
//!     let monitor = BatteryMonitor::connect(MonitorConfig::default(), stop)?;
//!     let report = monitor.run()?;
//!     println!("polled {} cycles", report.cycles);
//!     Ok(())
//! }
//! ```

pub mod constants;
pub mod error;
pub mod estimator;
pub mod gauge;
pub mod monitor;
pub mod protocol;
pub mod types;

pub use error::{OsdError, Result};
pub use estimator::RuntimeEstimator;
pub use monitor::BatteryMonitor;
pub use protocol::Osd;
pub use types::*;
