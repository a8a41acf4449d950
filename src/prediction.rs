//! # Tide Prediction Service
//!
//! Entry point for height and high-water queries. Holds one
//! [`TideWindowCache`] per station name, created lazily on the first query
//! and kept for the life of the service.
//!
//! Queries take `&mut self`: a refill mutates the station's window in place,
//! so callers sharing a service between threads wrap it in a `Mutex`.
//! Queries may block for as long as the external predictor runs.

use crate::config::Config;
use crate::fallback::HarmonicOracle;
use crate::oracle::{TideOracle, XtideOracle};
use crate::stations::StationDirectory;
use crate::tide_cache::{interval, safety_margin, TideWindowCache};
use crate::{HighWater, Sample, TideError, TideSeries};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{info, warn};

pub struct TidePredictionService {
    oracle: Box<dyn TideOracle>,
    directory: StationDirectory,
    caches: HashMap<String, TideWindowCache>,
}

impl TidePredictionService {
    pub fn new(oracle: Box<dyn TideOracle>, directory: StationDirectory) -> Self {
        TidePredictionService {
            oracle,
            directory,
            caches: HashMap::new(),
        }
    }

    /// Build from configuration. A station index that cannot be opened is
    /// logged and replaced by an empty directory; predictions still work for
    /// any name the oracle understands.
    pub fn from_config(config: &Config, offline: bool) -> Result<Self, TideError> {
        let oracle: Box<dyn TideOracle> = if offline {
            info!("using offline harmonic approximation");
            Box::new(HarmonicOracle::new())
        } else {
            Box::new(XtideOracle::new(&config.oracle)?)
        };
        let directory = StationDirectory::load(&config.stations.index).unwrap_or_else(|e| {
            warn!(error = %e, "continuing without station data");
            StationDirectory::empty()
        });
        Ok(Self::new(oracle, directory))
    }

    /// Tide height in metres at `station` for `time`.
    pub fn find_tide(&mut self, station: &str, time: DateTime<Utc>) -> Result<f32, TideError> {
        self.with_cache(station, time, |cache, oracle| cache.height(time, oracle))
    }

    /// High water at `station` nearest to `time`.
    pub fn find_nearest_high_water(
        &mut self,
        station: &str,
        time: DateTime<Utc>,
    ) -> Result<HighWater, TideError> {
        self.with_cache(station, time, |cache, oracle| {
            cache.nearest_high_water(time, oracle)
        })
    }

    /// Heights every 15 minutes from `from` to `to` inclusive.
    pub fn series(
        &mut self,
        station: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TideSeries, TideError> {
        let mut samples = Vec::new();
        let mut time = from;
        while time <= to {
            samples.push(Sample {
                time,
                height_m: self.find_tide(station, time)?,
            });
            time += interval();
        }
        Ok(TideSeries {
            station: station.to_string(),
            samples,
            offline: self.is_offline(),
        })
    }

    /// Position of a station from the directory; independent of the caches.
    pub fn station_location(&mut self, station: &str) -> Result<(f64, f64), TideError> {
        let record = self.directory.resolve(station)?;
        Ok((record.lat, record.lon))
    }

    pub fn directory_mut(&mut self) -> &mut StationDirectory {
        &mut self.directory
    }

    /// Cached window for a station, if one has been created
    pub fn cache(&self, station: &str) -> Option<&TideWindowCache> {
        self.caches.get(station)
    }

    pub fn cached_stations(&self) -> usize {
        self.caches.len()
    }

    pub fn is_offline(&self) -> bool {
        self.oracle.is_offline()
    }

    /// Run `query` against the station's window, creating it first if needed.
    ///
    /// A new window starts one safety margin before `time`, the same place a
    /// refill would put it, so the first query never triggers a second fill.
    fn with_cache<T>(
        &mut self,
        station: &str,
        time: DateTime<Utc>,
        query: impl FnOnce(&mut TideWindowCache, &dyn TideOracle) -> Result<T, TideError>,
    ) -> Result<T, TideError> {
        let oracle: &dyn TideOracle = &*self.oracle;
        let cache = match self.caches.entry(station.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                info!(station, "creating tide window cache");
                let start = time.checked_sub_signed(safety_margin()).ok_or_else(|| {
                    TideError::QueryOutOfRange {
                        station: station.to_string(),
                        time,
                    }
                })?;
                let cache = TideWindowCache::for_station(station, start, oracle)?;
                entry.insert(cache)
            }
        };
        query(cache, oracle)
    }
}
