//! Time and perceived-time scalars.
//!
//! # Design
//!
//! Timetable times are integer seconds (`Time = i64`), so all schedule
//! arithmetic is exact.  Perceived arrival times (`PerceivedTime = f64`) mix
//! real seconds with weighted overheads (walking, waiting, transfer
//! penalties) and therefore need a real-valued type.
//!
//! Two sentinels bound the ranges:
//!
//! - [`NEVER`] is the +∞ departure time carried by profile sentinel entries.
//!   It is `i64::MAX / 2` rather than `i64::MAX` so that adding a transfer
//!   or buffer time to it cannot overflow.
//! - [`UNREACHABLE`] is the perceived arrival time of an option that cannot
//!   reach the destination.  `f64::INFINITY` compares greater than every
//!   finite PAT and survives `min` folds unchanged.

/// Timetable time in seconds.  Negative values are permitted (times are
/// offsets from an arbitrary day origin), sentinels excepted.
pub type Time = i64;

/// Departure-time sentinel: later than every real timetable time.
pub const NEVER: Time = i64::MAX / 2;

/// A perceived arrival time: seconds plus weighted overheads.
pub type PerceivedTime = f64;

/// PAT sentinel: larger than any finite perceived arrival time.
pub const UNREACHABLE: PerceivedTime = f64::INFINITY;

/// Truncate a perceived time to integer seconds, saturating sentinels.
///
/// Mirrors the narrowing the decision models apply to their inputs: finite
/// PATs round toward zero, [`UNREACHABLE`] maps to a value that still
/// behaves as "worse than everything" under integer differences without
/// overflowing them.
#[inline]
pub fn pat_to_int(pat: PerceivedTime) -> i64 {
    if pat >= NEVER as PerceivedTime {
        NEVER
    } else {
        pat as i64
    }
}
