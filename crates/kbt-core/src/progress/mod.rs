//! Progress estimation for transfers (percentage, rate, ETA).
//!
//! Everything here is a pure function of the samples passed in. Rate is
//! instantaneous: the delta between the last two samples, not an average
//! over the whole transfer.

mod format;

pub use format::{format_size, format_speed, format_time};

use serde::Serialize;
use tokio::time::Instant;

/// Smallest elapsed time used when two samples share a timestamp.
const MIN_ELAPSED_SECS: f64 = 0.001;

/// One `(timestamp, bytes loaded so far)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub at: Instant,
    pub bytes_loaded: u64,
}

impl ProgressSample {
    pub fn new(at: Instant, bytes_loaded: u64) -> Self {
        Self { at, bytes_loaded }
    }
}

/// Derived progress figures for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEstimate {
    /// Whole percent in `0..=100`; `None` when the total size is unknown.
    pub percentage: Option<u8>,
    /// Bytes per second since the previous sample.
    pub speed_bytes_per_sec: f64,
    /// Seconds remaining at the current speed; `None` if unknown.
    pub eta_secs: Option<f64>,
}

/// Whole-number percentage of `bytes_loaded` over `bytes_total`.
pub fn percentage(bytes_loaded: u64, bytes_total: Option<u64>) -> Option<u8> {
    let total = bytes_total?;
    if total == 0 {
        return Some(100);
    }
    let pct = (100.0 * bytes_loaded as f64 / total as f64).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

/// Estimate progress from the previous and current sample.
pub fn estimate(
    previous: ProgressSample,
    current: ProgressSample,
    bytes_total: Option<u64>,
) -> ProgressEstimate {
    let elapsed = current
        .at
        .saturating_duration_since(previous.at)
        .as_secs_f64()
        .max(MIN_ELAPSED_SECS);
    let delta = current.bytes_loaded.saturating_sub(previous.bytes_loaded);
    let speed = delta as f64 / elapsed;

    let eta_secs = match bytes_total {
        Some(total) if speed > 0.0 => {
            Some(total.saturating_sub(current.bytes_loaded) as f64 / speed)
        }
        _ => None,
    };

    ProgressEstimate {
        percentage: percentage(current.bytes_loaded, bytes_total),
        speed_bytes_per_sec: speed,
        eta_secs,
    }
}
