//! Battery gauge control loop.
//!
//! Polls the pack voltage through one of the OSD's sensor inputs,
//! converts it to state of charge and remaining runtime, and keeps one
//! line of the display current. The device's silent/control
//! configuration is captured before the loop starts and restored on the
//! way out, whichever way out that is.

use crate::constants::{BATTERY_SENSOR, MAX_CELL_VOLTAGE};
use crate::error::Result;
use crate::estimator::RuntimeEstimator;
use crate::gauge::{estimate_cell_count, soc_from_voltage};
use crate::protocol::Osd;
use crate::types::{MonitorConfig, SessionReport};
use chrono::Utc;
use log::info;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One battery gauge session over an OSD link.
///
/// The stop flag is the only state shared with the outside: a signal
/// handler raises it, the loop polls it at the top of each cycle and
/// during the inter-cycle sleep.
pub struct BatteryMonitor<P> {
    osd: Osd<P>,
    config: MonitorConfig,
    stop: Arc<AtomicBool>,
}

impl BatteryMonitor<Box<dyn SerialPort>> {
    /// Open the configured serial device and prepare a session.
    pub fn connect(config: MonitorConfig, stop: Arc<AtomicBool>) -> Result<Self> {
        let osd = Osd::open(&config.port, config.baud_rate)?;
        Ok(Self::with_link(osd, config, stop))
    }
}

impl<P: Read + Write> BatteryMonitor<P> {
    /// Build a session over an already-open link.
    pub fn with_link(mut osd: Osd<P>, config: MonitorConfig, stop: Arc<AtomicBool>) -> Self {
        osd.set_echo(config.echo);
        Self { osd, config, stop }
    }

    /// Run the polling loop until the stop flag is raised.
    ///
    /// The device's silent/control flags are captured first and restored
    /// before this returns, on cancellation and on a mid-session link
    /// error alike. The link itself is released when the monitor is
    /// dropped on return.
    pub fn run(mut self) -> Result<SessionReport> {
        let started_at = Utc::now();
        let silent = self.osd.get_silent()?;
        let control = self.osd.get_control()?;
        self.osd.set_silent("0")?;
        self.osd.set_control("3")?;
        self.osd.clear()?;
        info!("session started; captured silent={silent:?} control={control:?}");

        let mut report = SessionReport {
            started_at,
            ended_at: started_at,
            cycles: 0,
            num_cells: None,
            last_voltage: None,
            last_percentage: None,
            remaining_minutes: None,
        };
        let outcome = self.poll_loop(&mut report);
        let restored = self.restore(&silent, &control);
        report.ended_at = Utc::now();

        outcome?;
        restored?;
        info!("session ended after {} cycles", report.cycles);
        Ok(report)
    }

    fn poll_loop(&mut self, report: &mut SessionReport) -> Result<()> {
        let epoch = Instant::now();
        let mut estimator = RuntimeEstimator::new();
        let mut num_cells: Option<u32> = None;
        let mut max_width = 0;
        let (x, y) = self.config.position;

        while !self.stop.load(Ordering::SeqCst) {
            let data = self.osd.get_sensor(BATTERY_SENSOR)?;
            // A malformed or absent frame parses as zero volts; the cycle
            // still completes with a degraded reading.
            let voltage: f64 = data.trim().parse().unwrap_or(0.0);

            // Pack configuration is fixed for the session: infer the cell
            // count from the first reading only.
            let cells = *num_cells
                .get_or_insert_with(|| estimate_cell_count(voltage, MAX_CELL_VOLTAGE));
            let cell_voltage = voltage / f64::from(cells) + self.config.voltage_sag;
            let percentage = soc_from_voltage(cell_voltage);
            estimator.sample(percentage, epoch.elapsed().as_secs_f64() / 60.0);

            let text = format!(
                "{:.2}V {}% ({})",
                voltage,
                percentage.round() as i64,
                estimator.runtime_text()
            );
            // Pad to the widest string sent this session so a shorter
            // reading overwrites the leftovers of a longer one.
            max_width = max_width.max(text.len());
            let padded = format!("{text:<max_width$}");
            self.osd.print_raw(x, y, max_width, &padded)?;

            report.cycles += 1;
            report.num_cells = Some(cells);
            report.last_voltage = Some(voltage);
            report.last_percentage = Some(percentage);
            let remaining = estimator.remaining_minutes();
            report.remaining_minutes = (remaining >= 0).then_some(remaining);

            self.sleep_between_cycles();
        }
        Ok(())
    }

    /// Sleep the poll interval in short slices so a stop raised
    /// mid-interval is honored without waiting the interval out.
    fn sleep_between_cycles(&self) {
        let deadline = Instant::now() + self.config.poll_interval;
        while !self.stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(100)));
        }
    }

    /// Clear the display and put the silent/control flags back to their
    /// pre-session values, like already in eeprom.
    fn restore(&mut self, silent: &str, control: &str) -> Result<()> {
        // A failing step must not keep the later steps from running.
        let steps = [
            self.osd.clear().map(drop),
            self.osd.set_silent(silent).map(drop),
            self.osd.set_control(control).map(drop),
        ];
        for step in steps {
            step?;
        }
        info!("device configuration restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    enum Reply {
        Framed(&'static str),
        Dead,
    }

    /// Scripted port: each command sent pops the next reply; the shared
    /// log records every command for later inspection. Optionally raises
    /// the stop flag after a given number of sensor queries.
    struct ScriptedPort {
        replies: VecDeque<Reply>,
        current: io::Cursor<Vec<u8>>,
        dead: bool,
        sent: Rc<RefCell<Vec<String>>>,
        stop: Arc<AtomicBool>,
        stop_after_queries: usize,
        queries: usize,
    }

    impl ScriptedPort {
        fn new(
            replies: Vec<Reply>,
            stop: Arc<AtomicBool>,
            stop_after_queries: usize,
        ) -> (Self, Rc<RefCell<Vec<String>>>) {
            let sent = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    replies: replies.into(),
                    current: io::Cursor::new(Vec::new()),
                    dead: false,
                    sent: sent.clone(),
                    stop,
                    stop_after_queries,
                    queries: 0,
                },
                sent,
            )
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.dead {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"));
            }
            self.current.read(buf)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let cmd = String::from_utf8_lossy(buf).into_owned();
            if cmd.starts_with(" GET_SENSOR") {
                self.queries += 1;
                if self.stop_after_queries > 0 && self.queries >= self.stop_after_queries {
                    self.stop.store(true, Ordering::SeqCst);
                }
            }
            self.sent.borrow_mut().push(cmd);
            match self.replies.pop_front() {
                Some(Reply::Framed(payload)) => {
                    let mut frame = vec![crate::constants::SOH, crate::constants::STX];
                    frame.extend_from_slice(payload.as_bytes());
                    frame.push(crate::constants::ETX);
                    frame.push(crate::constants::EOT);
                    self.current = io::Cursor::new(frame);
                    self.dead = false;
                }
                Some(Reply::Dead) => self.dead = true,
                None => self.current = io::Cursor::new(Vec::new()),
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn quick_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::ZERO,
            echo: false,
            ..MonitorConfig::default()
        }
    }

    fn monitor_with(
        replies: Vec<Reply>,
        stop: Arc<AtomicBool>,
        stop_after_queries: usize,
    ) -> (BatteryMonitor<ScriptedPort>, Rc<RefCell<Vec<String>>>) {
        let (port, sent) = ScriptedPort::new(replies, stop.clone(), stop_after_queries);
        let monitor = BatteryMonitor::with_link(Osd::from_port(port), quick_config(), stop);
        (monitor, sent)
    }

    #[test]
    fn stop_raised_before_the_loop_skips_all_cycles() {
        let stop = Arc::new(AtomicBool::new(true));
        let replies = vec![
            Reply::Framed("1"), // GET_SILENT
            Reply::Framed("0"), // GET_CONTROL
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
        ];
        let (monitor, sent) = monitor_with(replies, stop, 0);

        let report = monitor.run().unwrap();
        assert_eq!(report.cycles, 0);
        assert_eq!(report.num_cells, None);
        assert_eq!(
            sent.borrow().as_slice(),
            [
                " GET_SILENT ",
                " GET_CONTROL ",
                " SET_SILENT 0 ",
                " SET_CONTROL 3 ",
                " CLEAR ",
                // Restoration with the captured values, exactly once.
                " CLEAR ",
                " SET_SILENT 1 ",
                " SET_CONTROL 0 ",
            ]
        );
    }

    #[test]
    fn cycles_poll_estimate_and_draw() {
        let stop = Arc::new(AtomicBool::new(false));
        let replies = vec![
            Reply::Framed("0"),
            Reply::Framed("3"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("12.60"), // 3 cells, 4.2 V/cell -> 100%
            Reply::Framed("<OK>"),
            Reply::Framed("12.30"), // 4.1 V/cell -> 94%
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
        ];
        let (monitor, sent) = monitor_with(replies, stop, 2);

        let report = monitor.run().unwrap();
        assert_eq!(report.cycles, 2);
        assert_eq!(report.num_cells, Some(3));
        assert_eq!(report.last_voltage, Some(12.3));

        let sent = sent.borrow();
        let draws: Vec<&String> = sent.iter().filter(|c| c.starts_with(" P_RAW")).collect();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].as_str(), " P_RAW 10 1 14 12.60V 100% ()");
        assert!(draws[1].starts_with(" P_RAW 10 1 15 12.30V 94% ("));
    }

    #[test]
    fn display_width_never_shrinks() {
        let stop = Arc::new(AtomicBool::new(false));
        let replies = vec![
            Reply::Framed("0"),
            Reply::Framed("3"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("12.60"), // "12.60V 100% ()" is 14 wide
            Reply::Framed("<OK>"),
            Reply::Framed("8.00"), // "8.00V 0% (0m)" is 13 wide
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
        ];
        let (monitor, sent) = monitor_with(replies, stop, 2);

        monitor.run().unwrap();
        let sent = sent.borrow();
        let draws: Vec<&String> = sent.iter().filter(|c| c.starts_with(" P_RAW")).collect();
        assert_eq!(draws[0].as_str(), " P_RAW 10 1 14 12.60V 100% ()");
        // The shorter reading is padded out to the widest seen so far.
        assert_eq!(draws[1].len(), draws[0].len());
        assert!(draws[1].starts_with(" P_RAW 10 1 14 8.00V 0% ("));
        assert!(draws[1].ends_with(' '));
    }

    #[test]
    fn unparsable_reading_degrades_to_zero_volts() {
        let stop = Arc::new(AtomicBool::new(false));
        let replies = vec![
            Reply::Framed("0"),
            Reply::Framed("3"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("garbage"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
        ];
        let (monitor, sent) = monitor_with(replies, stop, 1);

        let report = monitor.run().unwrap();
        assert_eq!(report.cycles, 1);
        assert_eq!(report.last_voltage, Some(0.0));
        assert_eq!(report.num_cells, Some(1));
        let sent = sent.borrow();
        let draw = sent.iter().find(|c| c.starts_with(" P_RAW")).unwrap();
        assert_eq!(draw.as_str(), " P_RAW 10 1 11 0.00V 0% ()");
    }

    #[test]
    fn link_death_mid_session_still_restores() {
        let stop = Arc::new(AtomicBool::new(false));
        let replies = vec![
            Reply::Framed("1"),
            Reply::Framed("2"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Dead, // GET_SENSOR read fails hard
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
            Reply::Framed("<OK>"),
        ];
        let (monitor, sent) = monitor_with(replies, stop, 0);

        assert!(monitor.run().is_err());
        let sent = sent.borrow();
        let tail: Vec<&str> = sent[sent.len() - 3..].iter().map(String::as_str).collect();
        assert_eq!(tail, [" CLEAR ", " SET_SILENT 1 ", " SET_CONTROL 2 "]);
    }
}
