//! Low-precision lunar ephemeris: Moon age and lunation number.
//!
//! Mean-lunation model after Schaefer (Sky & Telescope, 1985/1994) with the
//! epoch of Meeus' lunation 0 (2000-01-06). Accuracy is well inside ±1 day,
//! which is plenty for choosing between spring and neap rates.

use chrono::{DateTime, Utc};

/// Mean length of the synodic month in days
pub const SYNODIC_MONTH_DAYS: f64 = 29.530_588_68;

/// Julian Day of the mean new moon starting lunation 0
pub const LUNATION_EPOCH_JD: f64 = 2_451_550.097_66;

/// Julian Day of the Unix epoch
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Moon age for an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LunarAge {
    /// Civil days since the preceding new moon, in `[0, SYNODIC_MONTH_DAYS)`
    pub age_days: f64,
    /// Lunations since the epoch (negative before 2000-01-06)
    pub lunation: i64,
}

impl LunarAge {
    /// Phase index 0 – 7 (0 = new, 4 = full).
    pub fn phase_index(&self) -> u8 {
        ((self.age_days / SYNODIC_MONTH_DAYS * 8.0 + 0.5).floor() as i64).rem_euclid(8) as u8
    }
}

/// Continuous Julian Day for a UTC instant, including fractional seconds.
pub fn julian_day(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    UNIX_EPOCH_JD + seconds / 86_400.0
}

/// Days since the last new moon and the lunation number for a Julian Day.
///
/// Pure function: the same `jd` always yields the same answer.
pub fn days_since_new(jd: f64) -> LunarAge {
    let cycles = (jd - LUNATION_EPOCH_JD) / SYNODIC_MONTH_DAYS;
    let lunation = cycles.floor();
    let mut age_days = (cycles - lunation) * SYNODIC_MONTH_DAYS;
    // rounding right below a new moon can land exactly on the month length
    if age_days >= SYNODIC_MONTH_DAYS {
        age_days = 0.0;
    }
    LunarAge {
        age_days,
        lunation: lunation as i64,
    }
}
