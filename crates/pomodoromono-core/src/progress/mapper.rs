//! Countdown state to radial-indicator geometry.
//!
//! Everything here is a pure function of `(remaining, total, finished)`.

use serde::{Deserialize, Serialize};

/// Scale used once the countdown has finished, regardless of ratio.
pub const FINISHED_SCALE: f64 = 0.15;
/// Scale at ratio 0 while still counting.
pub const BASE_SCALE: f64 = 0.45;
/// Scale gained between ratio 0 and ratio 1.
pub const SCALE_SPAN: f64 = 0.55;
/// Sweep drawn for a (nearly) full circle. A true 360 renders as an empty arc.
pub const FULL_SWEEP: f64 = 359.999;

const FULL_RATIO: f64 = 0.999;
const EMPTY_RATIO: f64 = 0.001;

/// Visual parameters for the radial progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Fraction of the duration remaining, `0.0 ..= 1.0`.
    pub ratio: f64,
    /// Indicator scale, `0.0 ..= 1.0`.
    pub scale: f64,
    /// Arc extent in degrees, `0.0 .. 360.0`.
    pub sweep_degrees: f64,
}

impl ProgressSnapshot {
    /// Map countdown state to a snapshot.
    pub fn map(remaining_secs: u64, total_secs: u64, finished: bool) -> Self {
        Self::from_ratio(ratio(remaining_secs, total_secs), finished)
    }

    /// Map an already-derived ratio (e.g. an animated one).
    pub fn from_ratio(ratio: f64, finished: bool) -> Self {
        let ratio = clamp_unit(ratio);
        Self {
            ratio,
            scale: scale(ratio, finished),
            sweep_degrees: sweep_degrees(ratio),
        }
    }

    /// Sweep rendered the way conic-gradient stops expect it.
    pub fn conic_stop(&self) -> String {
        format!("{:.2}deg", self.sweep_degrees)
    }
}

/// Remaining fraction; 0 for a zero-length duration.
pub fn ratio(remaining_secs: u64, total_secs: u64) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    clamp_unit(remaining_secs as f64 / total_secs as f64)
}

pub fn scale(ratio: f64, finished: bool) -> f64 {
    if finished {
        return FINISHED_SCALE;
    }
    round3(BASE_SCALE + clamp_unit(ratio) * SCALE_SPAN).min(1.0)
}

pub fn sweep_degrees(ratio: f64) -> f64 {
    let ratio = clamp_unit(ratio);
    if ratio >= FULL_RATIO {
        FULL_SWEEP
    } else if ratio <= EMPTY_RATIO {
        0.0
    } else {
        ratio * 360.0
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
