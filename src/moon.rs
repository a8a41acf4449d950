//! # Moon Phase
//!
//! Lunar age and the spring-to-neap blend fraction for an instant. The age is
//! memoised for the last instant queried so that a screenful of tidal
//! diamonds evaluated for the same moment costs one ephemeris call.

use crate::lunar::{self, SYNODIC_MONTH_DAYS};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Queries closer than this to the memoised instant reuse its age
const MEMO_TOLERANCE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy)]
struct AgeMemo {
    at: DateTime<Utc>,
    age_days: f64,
}

impl AgeMemo {
    fn covers(&self, time: DateTime<Utc>) -> bool {
        (time - self.at).num_milliseconds().abs() < MEMO_TOLERANCE_SECS * 1000
    }
}

/// Lunar age calculator with a single-slot memo.
#[derive(Debug, Clone, Default)]
pub struct MoonPhase {
    memo: Option<AgeMemo>,
    recomputations: u64,
}

impl MoonPhase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fractional days since the preceding new moon.
    pub fn lunar_age(&mut self, time: DateTime<Utc>) -> f64 {
        if let Some(memo) = self.memo.filter(|m| m.covers(time)) {
            debug!(%time, age = memo.age_days, "moon age (memo)");
            return memo.age_days;
        }
        let age_days = lunar::days_since_new(lunar::julian_day(time)).age_days;
        self.memo = Some(AgeMemo { at: time, age_days });
        self.recomputations += 1;
        debug!(%time, age = age_days, "moon age (computed)");
        age_days
    }

    /// Minutes since the preceding new moon.
    pub fn minutes_since_new(&mut self, time: DateTime<Utc>) -> f64 {
        self.lunar_age(time) * 24.0 * 60.0
    }

    /// Position between spring (0, new or full moon) and neap (1, first or
    /// last quarter).
    pub fn spring_neap_fraction(&mut self, time: DateTime<Utc>) -> f64 {
        spring_neap_fraction_for_age(self.lunar_age(time))
    }

    /// How many times the ephemeris has actually been evaluated.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

/// Triangular wave over the lunar age with period half a synodic month:
/// rising through the first and third quarters of the month, falling
/// through the second and fourth.
pub fn spring_neap_fraction_for_age(age_days: f64) -> f64 {
    let quarter = SYNODIC_MONTH_DAYS / 4.0;
    let quadrant = (age_days / quarter).floor();
    let residual = (age_days - quadrant * quarter).clamp(0.0, quarter) / quarter;
    if (quadrant as i64).rem_euclid(2) == 0 {
        residual
    } else {
        1.0 - residual
    }
}
