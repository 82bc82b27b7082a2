//! Protocol constants for GSOSD serial communication.
//!
//! This module defines the control bytes framing device responses, the
//! serial port defaults, and the fixed parameters of a battery gauge
//! session.

/// Start-of-attention byte opening a device response
pub const SOH: u8 = 0x01;

/// Start-of-payload byte
pub const STX: u8 = 0x02;

/// End-of-payload byte; snapshots the payload accumulated so far
pub const ETX: u8 = 0x03;

/// End-of-transmission byte terminating a response
pub const EOT: u8 = 0x04;

/// Default serial device path
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default baud rate, matching the GSOSD factory configuration
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout in milliseconds; bounds a read the device never completes
pub const READ_TIMEOUT_MS: u64 = 2000;

/// Seconds between battery poll cycles
pub const POLL_INTERVAL_SECS: u64 = 10;

/// Highest voltage a single LiPo cell can reach; used for cell count inference
pub const MAX_CELL_VOLTAGE: f64 = 4.5;

/// Screen column of the gauge readout
pub const DISPLAY_X: i32 = 10;

/// Screen row of the gauge readout
pub const DISPLAY_Y: i32 = 1;

/// Sensor input the battery pack is wired to
pub const BATTERY_SENSOR: u32 = 0;
