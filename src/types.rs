use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_PORT, DISPLAY_X, DISPLAY_Y, POLL_INTERVAL_SECS,
};

/// One point of the state-of-charge calibration curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    /// Open-circuit cell voltage in volts
    pub voltage: f64,
    /// State of charge at that voltage, in percent
    pub percentage: f64,
}

/// Configuration for one battery gauge session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Serial device the OSD is connected to
    pub port: String,
    /// Baud rate; must match the configured OSD value
    pub baud_rate: u32,
    /// Per-cell voltage sag under load, added back before the curve lookup.
    /// Highly dependent on battery quality.
    pub voltage_sag: f64,
    /// Time between poll cycles
    pub poll_interval: Duration,
    /// Screen position (column, row) of the readout
    pub position: (i32, i32),
    /// Echo raw device bytes to stdout while the session runs
    pub echo: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            voltage_sag: 0.0,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            position: (DISPLAY_X, DISPLAY_Y),
            echo: true,
        }
    }
}

/// Summary of one completed gauge session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Number of completed poll cycles
    pub cycles: u64,
    /// Cell count inferred from the first voltage reading
    pub num_cells: Option<u32>,
    /// Last total pack voltage read, in volts
    pub last_voltage: Option<f64>,
    /// Last state-of-charge percentage computed
    pub last_percentage: Option<f64>,
    /// Last runtime estimate, in minutes; `None` while unknown
    pub remaining_minutes: Option<i64>,
}
