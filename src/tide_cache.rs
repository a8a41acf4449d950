//! # Per-Station Tide Window
//!
//! Each station keeps an 8-day window of predicted heights every 15 minutes
//! (768 samples) and the high-water events inside it. Queries within the
//! window, at least 8 hours from either edge, are answered from memory. A
//! query closer to an edge re-centres the window 8 hours before the query and
//! recomputes both arrays from the oracle in one go.
//!
//! The 8-hour margin is six hours plus slack, so that the nearest high water
//! on either side of any served instant is always inside the window.
//!
//! ## Failure policy
//! A refill is built in temporaries and installed only when both oracle
//! calls succeed and return data. On failure the previous window stays
//! exactly as it was and the query reports the oracle error.

use crate::oracle::TideOracle;
use crate::{HighWater, TideError};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info};

/// Length of the cached window in days
pub const WINDOW_DAYS: i64 = 8;

/// Spacing of cached heights in minutes
pub const INTERVAL_MINUTES: i64 = 15;

/// Number of height slots in a window
pub const WINDOW_POINTS: usize = (WINDOW_DAYS * 24 * 60 / INTERVAL_MINUTES) as usize;

/// At most three high waters a day
pub const MAX_HIGH_WATERS: usize = (WINDOW_DAYS * 3) as usize;

/// Distance a served query must keep from either end of the window
pub const SAFETY_MARGIN_MINUTES: i64 = 8 * 60;

pub fn interval() -> Duration {
    Duration::minutes(INTERVAL_MINUTES)
}

pub fn safety_margin() -> Duration {
    Duration::minutes(SAFETY_MARGIN_MINUTES)
}

/// Round down to the previous 15-minute boundary.
pub fn align_to_interval(time: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let seconds = time.timestamp();
    let aligned = seconds - seconds.rem_euclid(INTERVAL_MINUTES * 60);
    Utc.timestamp_opt(aligned, 0).single()
}

/// One complete, validated window.
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    heights: Vec<Option<f32>>,
    high_waters: Vec<HighWater>,
}

impl Window {
    fn compute(
        station: &str,
        requested_start: DateTime<Utc>,
        oracle: &dyn TideOracle,
    ) -> Result<Self, TideError> {
        let malformed = |reason: &str| TideError::OracleMalformedOutput {
            station: station.to_string(),
            reason: reason.to_string(),
        };
        let out_of_range = || TideError::QueryOutOfRange {
            station: station.to_string(),
            time: requested_start,
        };
        let start = align_to_interval(requested_start).ok_or_else(out_of_range)?;
        let end = start
            .checked_add_signed(Duration::days(WINDOW_DAYS))
            .ok_or_else(out_of_range)?;
        info!(station, %start, %end, "computing tide window");

        let mut heights = vec![None; WINDOW_POINTS];
        for sample in oracle.heights(station, start, end, interval())? {
            if let Some(index) = slot_index(start, sample.time) {
                heights[index] = Some(sample.height_m);
            }
        }
        let filled = heights.iter().filter(|h| h.is_some()).count();
        if filled == 0 {
            return Err(malformed("no height samples in window"));
        }
        if filled < WINDOW_POINTS {
            debug!(station, filled, expected = WINDOW_POINTS, "tide window has gaps");
        }

        let mut high_waters: Vec<HighWater> = oracle
            .high_waters(station, start, end)?
            .into_iter()
            .filter(|hw| hw.time >= start && hw.time <= end)
            .collect();
        high_waters.sort_by_key(|hw| hw.time);
        high_waters.dedup_by_key(|hw| hw.time);
        high_waters.truncate(MAX_HIGH_WATERS);
        if high_waters.is_empty() {
            return Err(malformed("no high waters in window"));
        }
        debug!(station, count = high_waters.len(), "high waters cached");

        Ok(Window {
            start,
            end,
            heights,
            high_waters,
        })
    }
}

/// Rounded sample index of `time` in a window starting at `start`, if inside.
fn slot_index(start: DateTime<Utc>, time: DateTime<Utc>) -> Option<usize> {
    let offset = (time - start).num_seconds() as f64 / (INTERVAL_MINUTES * 60) as f64;
    let index = offset.round();
    (index >= 0.0 && index < WINDOW_POINTS as f64).then_some(index as usize)
}

/// Rolling window of predictions for one station.
pub struct TideWindowCache {
    station: String,
    window: Window,
    fills: u64,
}

impl TideWindowCache {
    /// Create a window starting at `initial_time` rounded down to a
    /// 15-minute boundary and fill it immediately.
    pub fn for_station(
        station: &str,
        initial_time: DateTime<Utc>,
        oracle: &dyn TideOracle,
    ) -> Result<Self, TideError> {
        let window = Window::compute(station, initial_time, oracle)?;
        Ok(TideWindowCache {
            station: station.to_string(),
            window,
            fills: 1,
        })
    }

    /// Height in metres at the 15-minute sample nearest `time`.
    pub fn height(&mut self, time: DateTime<Utc>, oracle: &dyn TideOracle) -> Result<f32, TideError> {
        self.ensure_covers(time, oracle)?;
        let height = slot_index(self.window.start, time)
            .and_then(|index| self.window.heights[index])
            .ok_or_else(|| self.out_of_range(time))?;
        debug!(station = %self.station, %time, height, "tide height");
        Ok(height)
    }

    /// High water closest to `time`; ties go to the later event.
    pub fn nearest_high_water(
        &mut self,
        time: DateTime<Utc>,
        oracle: &dyn TideOracle,
    ) -> Result<HighWater, TideError> {
        self.ensure_covers(time, oracle)?;
        let events = &self.window.high_waters;
        let after = events.partition_point(|hw| hw.time < time);
        let before = after.checked_sub(1).map(|i| events[i]);
        let after = events.get(after).copied();

        let nearest = match (before, after) {
            (Some(b), Some(a)) => {
                if (a.time - time) <= (time - b.time) {
                    a
                } else {
                    b
                }
            }
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => return Err(self.out_of_range(time)),
        };
        debug!(station = %self.station, %time, hw = %nearest.time, "nearest high water");
        Ok(nearest)
    }

    /// True when `time` can be served without a refill.
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        time >= self.window.start + safety_margin() && time <= self.window.end - safety_margin()
    }

    fn ensure_covers(&mut self, time: DateTime<Utc>, oracle: &dyn TideOracle) -> Result<(), TideError> {
        if self.covers(time) {
            return Ok(());
        }
        debug!(station = %self.station, %time, start = %self.window.start, "query near window edge, refilling");
        let start = time
            .checked_sub_signed(safety_margin())
            .ok_or_else(|| self.out_of_range(time))?;
        self.window = Window::compute(&self.station, start, oracle)?;
        self.fills += 1;
        Ok(())
    }

    fn out_of_range(&self, time: DateTime<Utc>) -> TideError {
        TideError::QueryOutOfRange {
            station: self.station.clone(),
            time,
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.window.start
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.window.end
    }

    /// Cached heights; `None` marks a slot the oracle did not provide
    pub fn heights(&self) -> &[Option<f32>] {
        &self.window.heights
    }

    pub fn high_waters(&self) -> &[HighWater] {
        &self.window.high_waters
    }

    /// Number of times the window has been computed, including creation
    pub fn fill_count(&self) -> u64 {
        self.fills
    }
}
