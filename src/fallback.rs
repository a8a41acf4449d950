//! # Offline Harmonic Oracle
//!
//! This module provides a lunar-phase-aware approximation for when the
//! external predictor is unavailable. It is only an offline stand-in for
//! the real oracle: it is used when `--offline` is asked for explicitly and
//! never chosen by default. It implements [`TideOracle`] with a
//! two-constituent semidiurnal model:
//!
//! - **M2** (principal lunar, 12.42 h) sets the basic rhythm, phased to the
//!   real-time clock
//! - **S2** (principal solar, 12.00 h) is put in or out of step with M2 by the
//!   Moon's age, so the range swells at new/full moon and shrinks at quarters
//!
//! ## Accuracy Trade-offs
//! - ✅ **Correct period**: matches the real semidiurnal cycle
//! - ✅ **Spring–neap envelope**: amplitude follows the Moon
//! - ❌ **Not station specific**: every station gets the same curve
//! - ❌ **No asymmetry or weather effects**
//!
//! High waters are found by scanning the modelled curve minute by minute.
//! [`TideOracle::is_offline`] returns true so displays can flag the data.

use crate::lunar::{self, SYNODIC_MONTH_DAYS};
use crate::oracle::TideOracle;
use crate::{HighWater, Sample, TideError};
use chrono::{DateTime, Duration, Utc};
use std::f64::consts::TAU;

/// Lunar M2 amplitude (m) and period (h)
const A_M2: f64 = 1.60;
const P_M2_HRS: f64 = 12.42;

/// Solar S2 amplitude (m); its 12.00 h period follows from M2 and the Moon
const A_S2: f64 = 0.50;

/// High-water interval (Moon transit to local HW), hours
const LUNITIDAL_OFFSET_HRS: f64 = 3.59;

/// Mean level above chart datum, metres
const MEAN_LEVEL_M: f64 = 2.90;

/// Approximate predictor; see the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarmonicOracle;

impl HarmonicOracle {
    pub fn new() -> Self {
        HarmonicOracle
    }

    /// Modelled height in metres at an instant.
    pub fn height_at(&self, time: DateTime<Utc>) -> f64 {
        let seconds = time.timestamp() as f64;
        let m2_period = P_M2_HRS * 3600.0;
        let theta_m2 = (seconds + LUNITIDAL_OFFSET_HRS * 3600.0).rem_euclid(m2_period)
            / m2_period
            * TAU;

        let age = lunar::days_since_new(lunar::julian_day(time)).age_days;
        let moon_angle = age / SYNODIC_MONTH_DAYS * TAU;
        // twice the Moon's elongation is exactly the S2 - M2 frequency difference
        let theta_s2 = theta_m2 + 2.0 * moon_angle;

        MEAN_LEVEL_M + A_M2 * theta_m2.sin() + A_S2 * theta_s2.sin()
    }
}

impl TideOracle for HarmonicOracle {
    fn heights(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<Sample>, TideError> {
        if interval <= Duration::zero() {
            return Err(TideError::OracleMalformedOutput {
                station: station.to_string(),
                reason: "non-positive sample interval".to_string(),
            });
        }
        let mut samples = Vec::new();
        let mut time = start;
        while time <= end {
            samples.push(Sample {
                time,
                height_m: self.height_at(time) as f32,
            });
            time += interval;
        }
        Ok(samples)
    }

    fn high_waters(
        &self,
        _station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HighWater>, TideError> {
        let step = Duration::minutes(1);
        let mut events = Vec::new();
        let mut prev = self.height_at(start - step);
        let mut time = start;
        let mut here = self.height_at(time);
        while time <= end {
            let next = self.height_at(time + step);
            if prev < here && here >= next {
                events.push(HighWater {
                    time,
                    height_m: here as f32,
                });
            }
            prev = here;
            here = next;
            time += step;
        }
        Ok(events)
    }

    fn is_offline(&self) -> bool {
        true
    }
}
