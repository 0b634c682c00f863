// src/eta.rs

use chrono::{NaiveTime, Timelike};

const OFF_PEAK_BASE_MIN: i64 = 25;
const PEAK_BASE_MIN: i64 = 30;
const MIN_EXTRA: i64 = 1;
const MAX_EXTRA: i64 = 25;
const MIN_TOTAL: i64 = 20;
const MAX_TOTAL: i64 = 55;

/// Lunch and dinner rush, inclusive hour windows.
fn is_peak(hour: u32) -> bool {
    (12..=15).contains(&hour) || (19..=21).contains(&hour)
}

/// Estimated preparation time in minutes for an order placed now.
/// Pure on purpose: the caller supplies the clock and the count of
/// orders the kitchen is already working on.
pub fn estimate_minutes(at: NaiveTime, active_orders: i64) -> i64 {
    let base = if is_peak(at.hour()) {
        PEAK_BASE_MIN
    } else {
        OFF_PEAK_BASE_MIN
    };
    let extra = active_orders.clamp(MIN_EXTRA, MAX_EXTRA);
    (base + extra).clamp(MIN_TOTAL, MAX_TOTAL)
}
