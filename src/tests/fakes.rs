//! In-process oracles for tests.

use crate::fallback::HarmonicOracle;
use crate::oracle::TideOracle;
use crate::{HighWater, Sample, TideError};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Station name every fake oracle refuses to predict.
pub const UNKNOWN_STATION: &str = "NOWHERE";

/// Shared view of a [`CountingOracle`] that stays usable after the oracle
/// has been boxed into a service.
#[derive(Clone, Default)]
pub struct OracleProbe {
    height_calls: Arc<AtomicUsize>,
    high_water_calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl OracleProbe {
    pub fn height_calls(&self) -> usize {
        self.height_calls.load(Ordering::SeqCst)
    }

    pub fn high_water_calls(&self) -> usize {
        self.high_water_calls.load(Ordering::SeqCst)
    }

    /// Make every following oracle call fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check(&self, station: &str) -> Result<(), TideError> {
        if self.fail.load(Ordering::SeqCst) || station == UNKNOWN_STATION {
            return Err(TideError::OracleUnavailable {
                station: station.to_string(),
                reason: "predictor switched off".to_string(),
            });
        }
        Ok(())
    }
}

/// Harmonic model that counts its calls and can be made to fail.
pub struct CountingOracle {
    model: HarmonicOracle,
    probe: OracleProbe,
}

impl CountingOracle {
    pub fn new() -> (Self, OracleProbe) {
        let probe = OracleProbe::default();
        (
            CountingOracle {
                model: HarmonicOracle::new(),
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl TideOracle for CountingOracle {
    fn heights(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<Sample>, TideError> {
        self.probe.height_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.check(station)?;
        self.model.heights(station, start, end, interval)
    }

    fn high_waters(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HighWater>, TideError> {
        self.probe.high_water_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.check(station)?;
        self.model.high_waters(station, start, end)
    }

    fn is_offline(&self) -> bool {
        self.model.is_offline()
    }
}

/// Oracle returning a flat tide and a fixed list of high waters.
pub struct ScriptedOracle {
    pub height_m: f32,
    pub high_waters: Vec<HighWater>,
    /// Leave every odd sample out
    pub gaps: bool,
}

impl TideOracle for ScriptedOracle {
    fn heights(
        &self,
        _station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<Sample>, TideError> {
        let mut samples = Vec::new();
        let mut time = start;
        let mut index = 0;
        while time < end {
            if !(self.gaps && index % 2 == 1) {
                samples.push(Sample {
                    time,
                    height_m: self.height_m,
                });
            }
            time += interval;
            index += 1;
        }
        Ok(samples)
    }

    fn high_waters(
        &self,
        _station: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<HighWater>, TideError> {
        Ok(self.high_waters.clone())
    }
}
