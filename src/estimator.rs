//! Discharge-rate and remaining-runtime estimation.
//!
//! State-of-charge readings derived from a loaded pack are noisy and can
//! tick upward between polls. The estimator anchors on the lowest
//! percentage seen so far in the session and projects that anchor forward
//! with the current discharge rate whenever a reading bounces up, so the
//! runtime estimate keeps shrinking instead of jumping around.

use log::debug;

/// Sentinel remaining-minutes value meaning "not yet known".
pub const UNKNOWN_RUNTIME: i64 = -1;

/// Stateful remaining-runtime estimator for one gauge session.
///
/// Feed successive percentage samples through [`RuntimeEstimator::sample`].
/// The discharge rate is recomputed from the session start on every sample
/// rather than maintained incrementally, so a single outlier cannot skew
/// the rate for the rest of the session.
#[derive(Debug, Default)]
pub struct RuntimeEstimator {
    tracking: Option<Tracking>,
}

#[derive(Debug)]
struct Tracking {
    initial_percentage: f64,
    initial_time: f64,
    /// Lowest percentage seen so far, and when it was seen
    min_percentage: f64,
    min_time: f64,
    rate: f64,
    remaining: i64,
}

impl RuntimeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a percentage sample taken `minutes` after an arbitrary epoch.
    ///
    /// The first sample only seeds the session baseline; the runtime stays
    /// unknown until the pack has net-discharged below that baseline.
    /// Samples at or above the baseline leave the rate and the previous
    /// estimate untouched.
    pub fn sample(&mut self, percentage: f64, minutes: f64) {
        let Some(t) = self.tracking.as_mut() else {
            self.tracking = Some(Tracking {
                initial_percentage: percentage,
                initial_time: minutes,
                min_percentage: percentage,
                min_time: minutes,
                rate: 0.0,
                remaining: UNKNOWN_RUNTIME,
            });
            return;
        };

        if t.initial_percentage > percentage {
            t.rate = (t.initial_percentage - percentage) / (minutes - t.initial_time);
            let correction = if percentage < t.min_percentage {
                t.min_percentage = percentage;
                t.min_time = minutes;
                0.0
            } else {
                // Bounced up from noise; project the anchor forward.
                t.rate * (minutes - t.min_time)
            };
            debug!("discharge rate: {:.2} % per minute", t.rate);
            debug!("correction: {:.2} %", correction);
            if t.rate > 0.0 {
                t.remaining = ((percentage - correction) / t.rate).round() as i64;
            }
        }
    }

    /// Discharge rate in percent per minute; 0 until net discharge is seen.
    pub fn rate(&self) -> f64 {
        self.tracking.as_ref().map_or(0.0, |t| t.rate)
    }

    /// Estimated minutes of runtime left, or [`UNKNOWN_RUNTIME`].
    pub fn remaining_minutes(&self) -> i64 {
        self.tracking
            .as_ref()
            .map_or(UNKNOWN_RUNTIME, |t| t.remaining)
    }

    /// Runtime rendered for the display: empty while unknown, `"42m"`
    /// under an hour, `"1h5m"` from an hour up.
    pub fn runtime_text(&self) -> String {
        let remaining = self.remaining_minutes();
        if remaining < 0 {
            String::new()
        } else if remaining >= 60 {
            format!("{}h{}m", remaining / 60, remaining % 60)
        } else {
            format!("{}m", remaining)
        }
    }
}
