//! Serial link to a GSOSD on-screen display.
//!
//! The device brackets every response with control bytes: SOH marks the
//! start of attention, STX and ETX bracket a payload snapshot, EOT ends
//! the transmission. Everything outside the brackets (welcome banner,
//! prompt, echoed input) is chatter that callers never see.

use crate::constants::{EOT, ETX, READ_TIMEOUT_MS, SOH, STX};
use crate::error::Result;
use log::trace;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Framed command exchange with a GSOSD device.
///
/// Owns the underlying stream exclusively for the lifetime of the
/// session; no other component touches it.
pub struct Osd<P> {
    port: P,
    echo_rx: bool,
}

impl Osd<Box<dyn SerialPort>> {
    /// Open the serial device at `path` with the given baud rate.
    ///
    /// The port gets a bounded read timeout so a response the device
    /// never finishes cannot block an exchange forever.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(READ_TIMEOUT_MS))
            .open()?;
        Ok(Self::from_port(port))
    }

    /// List available serial ports
    pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>> {
        Ok(serialport::available_ports()?)
    }
}

impl<P: Read + Write> Osd<P> {
    /// Wrap an already-open stream.
    pub fn from_port(port: P) -> Self {
        Self {
            port,
            echo_rx: false,
        }
    }

    /// Enable/disable echoing raw response bytes to stdout.
    pub fn set_echo(&mut self, rx: bool) {
        self.echo_rx = rx;
    }

    /// Send a command and read back one framed response.
    ///
    /// Returns the payload captured by the last STX..ETX span before EOT.
    /// Bytes before the first SOH are discarded. A stream that closes or
    /// times out before EOT yields whatever was captured so far, possibly
    /// nothing; the caller decides whether an empty payload matters.
    /// The exchange is never retried.
    pub fn exchange(&mut self, cmd: &str) -> Result<String> {
        trace!("send: {cmd:?}");
        self.port.write_all(cmd.as_bytes())?;

        let mut soh = false;
        let mut payload: Option<Vec<u8>> = None;
        let mut data: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(e) => return Err(e.into()),
            }
            let ch = byte[0];
            if self.echo_rx {
                let _ = io::stdout().write_all(&byte);
                let _ = io::stdout().flush();
            }
            if ch == SOH {
                soh = true;
            }
            if !soh {
                continue;
            }
            if ch == EOT {
                break;
            }
            if ch == ETX {
                data = payload.clone().unwrap_or_default();
            }
            // Markers land in the raw payload buffer but never in the
            // snapshot taken above.
            if let Some(buf) = payload.as_mut() {
                buf.push(ch);
            }
            if ch == STX {
                payload = Some(Vec::new());
            }
        }

        let text = String::from_utf8_lossy(&data).into_owned();
        trace!("recv: {text:?}");
        Ok(text)
    }

    /// Query the silent-mode flag.
    pub fn get_silent(&mut self) -> Result<String> {
        self.exchange(" GET_SILENT ")
    }

    /// Query the control-mode flags.
    pub fn get_control(&mut self) -> Result<String> {
        self.exchange(" GET_CONTROL ")
    }

    /// Set the silent-mode flag.
    pub fn set_silent(&mut self, value: &str) -> Result<String> {
        self.exchange(&format!(" SET_SILENT {value} "))
    }

    /// Set the control-mode flags.
    pub fn set_control(&mut self, value: &str) -> Result<String> {
        self.exchange(&format!(" SET_CONTROL {value} "))
    }

    /// Clear the on-screen display.
    pub fn clear(&mut self) -> Result<String> {
        self.exchange(" CLEAR ")
    }

    /// Read the value of an analog sensor input.
    pub fn get_sensor(&mut self, index: u32) -> Result<String> {
        self.exchange(&format!(" GET_SENSOR {index} "))
    }

    /// Query the device firmware version.
    pub fn get_version(&mut self) -> Result<String> {
        self.exchange(" GET_VERSION ")
    }

    /// Query the screen width in characters.
    pub fn get_width(&mut self) -> Result<String> {
        self.exchange(" GET_WIDTH ")
    }

    /// Query the screen height in characters.
    pub fn get_height(&mut self) -> Result<String> {
        self.exchange(" GET_HEIGHT ")
    }

    /// Draw `text` at screen position (`x`, `y`).
    ///
    /// `width` is the number of payload bytes the device consumes; pad
    /// `text` to `width` to overwrite leftovers of a longer previous
    /// draw.
    pub fn print_raw(&mut self, x: i32, y: i32, width: usize, text: &str) -> Result<String> {
        self.exchange(&format!(" P_RAW {x} {y} {width} {text}"))
    }
}
