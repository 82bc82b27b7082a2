//! Error types for OSD gauge operations.

use thiserror::Error;

/// Result type alias for OSD operations.
pub type Result<T> = std::result::Result<T, OsdError>;

/// Error types for OSD device communication.
#[derive(Error, Debug)]
pub enum OsdError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
