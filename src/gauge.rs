//! State-of-charge calibration curve and pack geometry.
//!
//! The curve maps LiPo open-circuit cell voltage to remaining capacity.
//! Voltage measured under load sits a little lower than the open-circuit
//! value; callers correct with a configurable sag offset before looking
//! a reading up here.

use crate::types::CalibrationPoint;

const fn pt(voltage: f64, percentage: f64) -> CalibrationPoint {
    CalibrationPoint {
        voltage,
        percentage,
    }
}

/// LiPo cell state of charge; open-circuit voltage vs. percentage.
///
/// Data taken from the HobbyKing HK-010 Wattmeter & Voltage Analyzer.
/// Voltages are strictly increasing, percentages non-decreasing.
pub const LIPO_SOC: [CalibrationPoint; 51] = [
    pt(3.000, 0.0),
    pt(3.431, 2.0),
    pt(3.508, 4.0),
    pt(3.573, 6.0),
    pt(3.630, 8.0),
    pt(3.671, 10.0),
    pt(3.695, 12.0),
    pt(3.705, 14.0),
    pt(3.710, 16.0),
    pt(3.719, 18.0),
    pt(3.725, 20.0),
    pt(3.731, 22.0),
    pt(3.739, 24.0),
    pt(3.744, 26.0),
    pt(3.752, 28.0),
    pt(3.759, 30.0),
    pt(3.763, 32.0),
    pt(3.770, 34.0),
    pt(3.778, 36.0),
    pt(3.788, 38.0),
    pt(3.795, 40.0),
    pt(3.800, 42.0),
    pt(3.807, 44.0),
    pt(3.817, 46.0),
    pt(3.827, 48.0),
    pt(3.837, 50.0),
    pt(3.843, 52.0),
    pt(3.847, 54.0),
    pt(3.857, 56.0),
    pt(3.865, 58.0),
    pt(3.876, 60.0),
    pt(3.887, 62.0),
    pt(3.896, 64.0),
    pt(3.905, 66.0),
    pt(3.915, 68.0),
    pt(3.925, 70.0),
    pt(3.935, 72.0),
    pt(3.945, 74.0),
    pt(3.964, 76.0),
    pt(3.974, 78.0),
    pt(3.984, 80.0),
    pt(3.998, 82.0),
    pt(4.013, 84.0),
    pt(4.028, 86.0),
    pt(4.042, 88.0),
    pt(4.062, 90.0),
    pt(4.086, 92.0),
    pt(4.101, 94.0),
    pt(4.135, 96.0),
    pt(4.170, 98.0),
    pt(4.200, 100.0),
];

/// Convert an open-circuit cell voltage to a state-of-charge percentage.
///
/// Scans the curve for the bracket enclosing `voltage` and interpolates
/// linearly within it. Voltages at or below the first entry yield 0.
/// Voltages above the last entry extrapolate from the final two entries,
/// so results above 100 are possible. Exact curve points reproduce their
/// stored percentage.
pub fn soc_from_voltage(voltage: f64) -> f64 {
    let mut low = LIPO_SOC[0];
    let mut high = LIPO_SOC[0];
    for point in &LIPO_SOC {
        if voltage > point.voltage {
            low = *point;
        } else {
            high = *point;
            break;
        }
    }
    if voltage > low.voltage && high.voltage <= low.voltage {
        // Ran off the top of the curve; extrapolate from the last bracket.
        low = LIPO_SOC[LIPO_SOC.len() - 2];
        high = LIPO_SOC[LIPO_SOC.len() - 1];
    }
    if high.voltage > low.voltage {
        low.percentage
            + (high.percentage - low.percentage) * (voltage - low.voltage)
                / (high.voltage - low.voltage)
    } else {
        0.0
    }
}

/// Infer the pack cell count from the total pack voltage.
///
/// Computed as `1 + floor(total / max_cell)`. Pack configuration is
/// assumed constant for a session, so callers cache the result of the
/// first reading instead of recomputing it later.
pub fn estimate_cell_count(total_voltage: f64, max_cell_voltage: f64) -> u32 {
    1 + (total_voltage / max_cell_voltage).floor() as u32
}
