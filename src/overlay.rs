//! # Chart Overlay
//!
//! Combines the prediction service, the Moon and the tidal diamonds into
//! what a chart display draws for one instant: an arrow per diamond and a
//! level gauge per port.
//!
//! For each diamond the reference port's nearest high water is looked up,
//! the offset from it selects a point in the hourly table, and the Moon's
//! spring/neap fraction blends the spring and neap rates.

use crate::level::TideLevelRecord;
use crate::moon::MoonPhase;
use crate::prediction::TidePredictionService;
use crate::stream::{ReferenceEvent, StreamInterpolator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Stream arrow for one diamond.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamArrow {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Degrees clockwise from north
    pub bearing: f64,
    /// Knots
    pub rate: f64,
    /// Minutes from the reference high water
    pub minutes_from_reference: f64,
}

/// Level gauge for one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelMarker {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Bottom of the gauge (MLWS)
    pub low: f32,
    /// Top of the gauge (MHWS)
    pub high: f32,
    /// Predicted level now
    pub level: f32,
}

pub struct TideOverlay {
    predictions: TidePredictionService,
    moon: MoonPhase,
}

impl TideOverlay {
    pub fn new(predictions: TidePredictionService) -> Self {
        TideOverlay {
            predictions,
            moon: MoonPhase::new(),
        }
    }

    pub fn predictions(&mut self) -> &mut TidePredictionService {
        &mut self.predictions
    }

    pub fn moon(&mut self) -> &mut MoonPhase {
        &mut self.moon
    }

    /// Arrows for every diamond whose reference port can be predicted.
    pub fn stream_arrows(
        &mut self,
        streams: &mut [StreamInterpolator],
        time: DateTime<Utc>,
    ) -> Vec<StreamArrow> {
        let fraction = self.moon.spring_neap_fraction(time);
        debug!(%time, fraction, "plotting tidal streams");

        let mut arrows = Vec::with_capacity(streams.len());
        for stream in streams.iter_mut() {
            let harmonics = stream.harmonics();
            if harmonics.reference_event == ReferenceEvent::LowWater {
                debug!(stream = %harmonics.name, "low-water referenced table offset from high water");
            }
            let reference = harmonics.reference.clone();
            let hw = match self.predictions.find_nearest_high_water(&reference, time) {
                Ok(hw) => hw,
                Err(e) => {
                    warn!(stream = %harmonics.name, reference = %reference, error = %e, "skipping tidal stream");
                    continue;
                }
            };
            let minutes = (time - hw.time).num_seconds() as f64 / 60.0;
            let reading = stream.stream_blended(minutes, fraction);
            let harmonics = stream.harmonics();
            arrows.push(StreamArrow {
                name: harmonics.name.clone(),
                lat: harmonics.lat,
                lon: harmonics.lon,
                bearing: reading.bearing,
                rate: reading.rate,
                minutes_from_reference: minutes,
            });
        }
        arrows
    }

    /// Gauges for every port whose level can be predicted. The level is
    /// also stored on the record.
    pub fn level_markers(
        &mut self,
        levels: &mut [TideLevelRecord],
        time: DateTime<Utc>,
    ) -> Vec<LevelMarker> {
        let mut markers = Vec::with_capacity(levels.len());
        for record in levels.iter_mut() {
            let level = match self.predictions.find_tide(&record.name, time) {
                Ok(level) => level,
                Err(e) => {
                    warn!(port = %record.name, error = %e, "skipping tidal level");
                    continue;
                }
            };
            record.set_current_level(level);
            let (low, high) = record.spring_range();
            debug!(port = %record.name, level, low, high, "tidal level");
            markers.push(LevelMarker {
                name: record.name.clone(),
                lat: record.lat,
                lon: record.lon,
                low,
                high,
                level,
            });
        }
        markers
    }

    /// True when the diamond's reference port is in the station directory.
    pub fn known_reference(&mut self, stream: &StreamInterpolator) -> bool {
        self.predictions
            .station_location(&stream.harmonics().reference)
            .is_ok()
    }

    /// Drop diamonds whose reference port is not a known station. Returns
    /// the number dropped.
    pub fn retain_known_references(&mut self, streams: &mut Vec<StreamInterpolator>) -> usize {
        let before = streams.len();
        streams.retain(|stream| {
            let known = self.known_reference(stream);
            if !known {
                let harmonics = stream.harmonics();
                info!(
                    stream = %harmonics.name,
                    reference = %harmonics.reference,
                    "tidal stream ignored, reference is not a recognised location"
                );
            }
            known
        });
        before - streams.len()
    }
}
