//! Simulation time model and GTFS clock-time handling.
//!
//! # Design
//!
//! Simulation time is an absolute count of **milliseconds** since midnight of
//! the operating day, wrapped in `SimTime`.  Integer time keeps event-queue
//! ordering exact — two events scheduled from the same arithmetic always
//! compare identically, with no floating-point drift.  Millisecond resolution
//! is fine enough that rounding congestion-dependent road costs (computed in
//! `f64` seconds) loses nothing observable.
//!
//! GTFS timetable values stay in whole seconds (`u32`): `parse_gtfs_time`
//! accepts `H:MM:SS` and `HH:MM:SS`, with hours past 24 for service running
//! over midnight.

use std::fmt;

use thiserror::Error;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// Absolute simulation time in milliseconds since the operating day's midnight.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    /// Construct from whole seconds.
    #[inline]
    pub fn from_secs(secs: u32) -> SimTime {
        SimTime(secs as u64 * 1_000)
    }

    /// Construct from fractional seconds, rounding to the nearest millisecond.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> SimTime {
        SimTime((secs * 1_000.0).round().max(0.0) as u64)
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Whole seconds, truncating sub-second precision.
    #[inline]
    pub fn as_secs(self) -> u64 {
        self.0 / 1_000
    }

    /// The time `ms` milliseconds after `self`.
    #[inline]
    pub fn offset_ms(self, ms: u64) -> SimTime {
        SimTime(self.0 + ms)
    }

    /// Milliseconds elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs_ms: u64) -> SimTime {
        SimTime(self.0 + rhs_ms)
    }
}

impl std::ops::Sub for SimTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: SimTime) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0 / 1_000;
        write!(f, "{}:{:02}:{:02}", total / 3_600, (total % 3_600) / 60, total % 60)
    }
}

// ── GTFS clock times ──────────────────────────────────────────────────────────

/// Failure to interpret a GTFS clock-time string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("malformed GTFS time {0:?} (expected H:MM:SS)")]
    Malformed(String),
}

/// Parse a GTFS `H:MM:SS` / `HH:MM:SS` string into seconds since midnight.
///
/// Hours may exceed 24 for trips running past midnight; minutes and seconds
/// must be below 60.
pub fn parse_gtfs_time(s: &str) -> Result<u32, TimeError> {
    let mut parts = s.trim().splitn(3, ':');
    let (h, m, sec) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(sec)) => (h, m, sec),
        _ => return Err(TimeError::Malformed(s.to_string())),
    };
    let parse = |p: &str| p.parse::<u32>().map_err(|_| TimeError::Malformed(s.to_string()));
    let (h, m, sec) = (parse(h)?, parse(m)?, parse(sec)?);
    if m >= 60 || sec >= 60 {
        return Err(TimeError::Malformed(s.to_string()));
    }
    Ok(h * 3_600 + m * 60 + sec)
}

/// Format seconds since midnight back to GTFS `H:MM:SS`.
///
/// Single-digit hours are not zero-padded, matching the loosest form the
/// parser accepts, so `format(parse(x))` preserves `x` up to padding.
pub fn format_gtfs_time(secs: u32) -> String {
    format!("{}:{:02}:{:02}", secs / 3_600, (secs % 3_600) / 60, secs % 60)
}
