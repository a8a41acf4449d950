//! # Tide Overlay Core Library
//!
//! This library is the prediction engine behind a nautical chart tide overlay.
//! It turns `(station, instant)` queries into tide heights, nearest high-water
//! events and tidal stream bearing/rate, while keeping calls to the external
//! tide predictor to a minimum.
//!
//! ## Design Philosophy
//!
//! ### Rolling Windows
//! - **One window per station**: each station keeps 8 days of heights sampled
//!   every 15 minutes (768 samples) plus the high-water events in that span
//! - **Refill on approach**: a query closer than 8 hours to either edge re-centres
//!   the window and recomputes it in one oracle round trip
//! - **Atomic refills**: a failed refill leaves the previous window untouched
//!
//! ### Streams
//! Tidal diamonds tabulate bearing and rate hourly from 6 hours before to
//! 6 hours after high water at a reference port. Values between the hours come
//! from natural cubic splines fitted to the Cartesian components of the
//! stream vector, which keeps bearings continuous across north.
//!
//! ### Data Flow
//! 1. **Query**: caller asks [`prediction::TidePredictionService`] for a station and time
//! 2. **Cache**: the station's [`tide_cache::TideWindowCache`] answers or refills
//! 3. **Streams**: [`overlay::TideOverlay`] combines nearest high water, moon phase
//!    and [`stream::StreamInterpolator`] into arrows for display
//!
//! ## Core Types
//! - [`Sample`]: a single predicted tide height at an absolute instant
//! - [`HighWater`]: a predicted high-water event
//! - [`TideSeries`]: a run of samples for rendering, with an offline flag

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod fallback;
pub mod level;
pub mod lunar;
pub mod moon;
pub mod oracle;
pub mod overlay;
pub mod prediction;
pub mod renderer;
pub mod spline;
pub mod stations;
pub mod stream;
pub mod tide_cache;

#[cfg(test)]
mod tests;

pub use error::TideError;

/// A single predicted tide height.
///
/// Heights are in metres above chart datum, as produced by the predictor
/// with `-u m`.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_overlay_lib::Sample;
///
/// let sample = Sample {
///     time: Utc.with_ymd_and_hms(2010, 5, 5, 12, 0, 0).unwrap(),
///     height_m: 3.2,
/// };
/// assert_eq!(sample.height_m, 3.2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Instant of the prediction
    pub time: DateTime<Utc>,
    /// Tide height in metres
    pub height_m: f32,
}

/// A predicted high-water event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighWater {
    /// Instant of the local maximum
    pub time: DateTime<Utc>,
    /// Height at high water in metres
    pub height_m: f32,
}

/// A run of tide samples for one station, ready for rendering.
///
/// # Offline Behavior
/// When `offline = true` the heights come from the harmonic approximation in
/// [`fallback`] rather than the external predictor, and renderers should say so.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use tide_overlay_lib::{Sample, TideSeries};
///
/// let t0 = Utc.with_ymd_and_hms(2010, 5, 5, 12, 0, 0).unwrap();
/// let series = TideSeries {
///     station: "ABERDEEN".to_string(),
///     samples: vec![
///         Sample { time: t0, height_m: 2.1 },
///         Sample { time: t0 + Duration::minutes(15), height_m: 2.3 },
///     ],
///     offline: false,
/// };
///
/// assert_eq!(series.samples.len(), 2);
/// assert!(!series.offline);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TideSeries {
    /// Station the heights belong to
    pub station: String,
    /// Samples in ascending time order
    pub samples: Vec<Sample>,
    /// True if using the harmonic approximation instead of the predictor
    pub offline: bool,
}
