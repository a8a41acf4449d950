//! # Tidal Streams
//!
//! A tidal diamond tabulates the stream at 13 hourly offsets, from 6 hours
//! before to 6 hours after high (occasionally low) water at a reference port.
//! Records are tab-separated:
//!
//! ```text
//! chart  HW  RefPort   Num  Diamond  lat min    lon min    13 x [bearing spring neap 9999 9999 9999]
//! BA1481 HW  ABERDEEN  244  A        56  25.89  -2  36.99  59 1.2 0.6 9999 9999 9999 63 ...
//! ```
//!
//! ## Interpolation
//!
//! Bearing and rate are not splined directly: a stream swinging from 350° to
//! 10° would interpolate through 180°, and a slack stream's bearing is
//! meaningless. Instead each sample is decomposed into east and north
//! components (`x = rate·sin(bearing)`, `y = rate·cos(bearing)`) for spring
//! and for neap rates, a natural cubic spline is fitted to each of the four
//! curves, and bearing/rate are recombined after evaluation.

use crate::level::{degrees_minutes, parse_field};
use crate::spline::NaturalSpline;
use crate::TideError;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;
use tracing::{debug, warn};

/// Hourly samples from -6 h to +6 h
pub const STREAM_HOURS: usize = 13;

/// Offsets inside this many minutes of the reference event are served
const TABLE_LIMIT_MINS: f64 = 6.0 * 60.0;

/// Offsets beyond the table but inside this limit are clamped to its ends
const CLAMP_LIMIT_MINS: f64 = 7.0 * 60.0;

/// Fields before the first hourly group
const HEADER_FIELDS: usize = 9;

/// Fields per hourly group: bearing, spring, neap and three unused
const GROUP_FIELDS: usize = 6;

/// Event at the reference port that the hourly table is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceEvent {
    HighWater,
    LowWater,
}

/// One hourly row of a diamond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSample {
    /// Degrees clockwise from north
    pub bearing: f64,
    /// Knots at spring tides
    pub spring_rate: f64,
    /// Knots at neap tides
    pub neap_rate: f64,
}

/// A tidal diamond as read from the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHarmonics {
    pub chart: String,
    pub number: i32,
    pub name: String,
    /// Reference port whose high water anchors the table
    pub reference: String,
    pub reference_event: ReferenceEvent,
    pub lat: f64,
    pub lon: f64,
    /// Rows for offsets -6 h ..= +6 h
    pub samples: [StreamSample; STREAM_HOURS],
}

impl FromStr for StreamHarmonics {
    type Err = TideError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "tidal stream";
        let fields: Vec<&str> = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();
        // the last group's three unused fields may be cut off
        let needed = HEADER_FIELDS + GROUP_FIELDS * (STREAM_HOURS - 1) + 3;
        if fields.len() < needed {
            return Err(TideError::RecordParse {
                kind: KIND,
                reason: format!("expected at least {needed} fields, got {}", fields.len()),
            });
        }
        let coord = |d: usize| {
            degrees_minutes(fields[d], fields[d + 1])
                .map_err(|reason| TideError::RecordParse { kind: KIND, reason })
        };

        let mut samples = [StreamSample::default(); STREAM_HOURS];
        for (hour, sample) in samples.iter_mut().enumerate() {
            let base = HEADER_FIELDS + hour * GROUP_FIELDS;
            *sample = StreamSample {
                bearing: parse_field(KIND, &fields, base, "bearing")?,
                spring_rate: parse_field(KIND, &fields, base + 1, "spring rate")?,
                neap_rate: parse_field(KIND, &fields, base + 2, "neap rate")?,
            };
        }

        Ok(StreamHarmonics {
            chart: fields[0].trim().to_string(),
            // "HW", or "LW" for ports such as Le Havre
            reference_event: if fields[1].trim_start().starts_with('H') {
                ReferenceEvent::HighWater
            } else {
                ReferenceEvent::LowWater
            },
            reference: fields[2].trim().to_string(),
            number: parse_field(KIND, &fields, 3, "number")?,
            name: fields[4].trim().to_string(),
            lat: coord(5)?,
            lon: coord(7)?,
            samples,
        })
    }
}

/// Stream at an offset for both spring and neap tides.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamState {
    pub bearing: f64,
    pub spring_rate: f64,
    pub neap_rate: f64,
}

/// Stream blended for the Moon's phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StreamReading {
    pub bearing: f64,
    pub rate: f64,
}

/// Splines over the Cartesian stream components of one diamond.
#[derive(Debug, Clone)]
pub struct StreamInterpolator {
    harmonics: StreamHarmonics,
    x_spring: NaturalSpline,
    y_spring: NaturalSpline,
    x_neap: NaturalSpline,
    y_neap: NaturalSpline,
    current: Option<StreamReading>,
}

impl StreamInterpolator {
    pub fn new(harmonics: StreamHarmonics) -> Result<Self, TideError> {
        let hours: Vec<f64> = (0..STREAM_HOURS).map(|h| h as f64).collect();
        let component = |f: fn(&StreamSample) -> f64| -> Result<NaturalSpline, TideError> {
            let ys: Vec<f64> = harmonics.samples.iter().map(f).collect();
            if ys.iter().any(|y| !y.is_finite()) {
                return Err(TideError::RecordParse {
                    kind: "tidal stream",
                    reason: format!("non-finite rate or bearing at {}", harmonics.name),
                });
            }
            NaturalSpline::new(&hours, &ys).ok_or_else(|| TideError::RecordParse {
                kind: "tidal stream",
                reason: format!("cannot fit spline for {}", harmonics.name),
            })
        };

        let x_spring = component(|s| s.spring_rate * s.bearing.to_radians().sin())?;
        let y_spring = component(|s| s.spring_rate * s.bearing.to_radians().cos())?;
        let x_neap = component(|s| s.neap_rate * s.bearing.to_radians().sin())?;
        let y_neap = component(|s| s.neap_rate * s.bearing.to_radians().cos())?;

        Ok(StreamInterpolator {
            harmonics,
            x_spring,
            y_spring,
            x_neap,
            y_neap,
            current: None,
        })
    }

    pub fn harmonics(&self) -> &StreamHarmonics {
        &self.harmonics
    }

    /// Stream `minutes` after (negative: before) the reference event.
    ///
    /// Offsets between 6 and 7 hours are clamped to the table ends; beyond
    /// 7 hours the query is a caller error and zeros are returned.
    pub fn stream_at(&self, minutes: f64) -> StreamState {
        if !minutes.is_finite() || minutes.abs() > CLAMP_LIMIT_MINS {
            warn!(
                stream = %self.harmonics.name,
                hours = minutes / 60.0,
                "stream requested outside the tidal table"
            );
            return StreamState::default();
        }
        let minutes = minutes.clamp(-TABLE_LIMIT_MINS, TABLE_LIMIT_MINS);
        let hour = (minutes + TABLE_LIMIT_MINS) / 60.0;

        if hour.fract() == 0.0 {
            let row = self.harmonics.samples[hour as usize];
            return StreamState {
                bearing: row.bearing,
                spring_rate: row.spring_rate,
                neap_rate: row.neap_rate,
            };
        }

        let (xs, ys) = (self.x_spring.eval(hour), self.y_spring.eval(hour));
        let (xn, yn) = (self.x_neap.eval(hour), self.y_neap.eval(hour));
        let state = StreamState {
            // TODO: bearing comes from the spring components only; blend with
            // the neap bearing once confirmed against observed streams
            bearing: xs.atan2(ys).to_degrees().rem_euclid(360.0),
            spring_rate: xs.hypot(ys),
            neap_rate: xn.hypot(yn),
        };
        debug!(
            stream = %self.harmonics.name,
            hour = hour - 6.0,
            bearing = state.bearing,
            spring = state.spring_rate,
            neap = state.neap_rate,
            "stream interpolated"
        );
        state
    }

    /// Stream blended between spring and neap rates.
    ///
    /// `fraction` is 0 at springs and 1 at neaps; the rate follows a
    /// quarter-cosine between them rather than a straight line.
    pub fn stream_blended(&mut self, minutes: f64, fraction: f64) -> StreamReading {
        let state = self.stream_at(minutes);
        let rate = state.neap_rate
            + (state.spring_rate - state.neap_rate) * (FRAC_PI_2 * fraction).cos();
        let reading = StreamReading {
            bearing: state.bearing,
            rate,
        };
        self.current = Some(reading);
        reading
    }

    /// Reading from the most recent [`Self::stream_blended`] call
    pub fn current(&self) -> Option<StreamReading> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABERDEEN_A: &str = "BA1481\tHW\tABERDEEN\t244\tA\t56\t25.89\t-2\t36.99\t\
59\t1.2\t0.6\t9999\t9999\t9999\t63\t0.6\t0.3\t9999\t9999\t9999\t\
112\t0.3\t0.1\t9999\t9999\t9999\t195\t0.6\t0.3\t9999\t9999\t9999\t\
213\t1.1\t0.5\t9999\t9999\t9999\t223\t1.1\t0.5\t9999\t9999\t9999\t\
231\t0.9\t0.4\t9999\t9999\t9999\t240\t0.6\t0.3\t9999\t9999\t9999\t\
268\t0.3\t0.1\t9999\t9999\t9999\t334\t0.4\t0.2\t9999\t9999\t9999\t\
23\t0.8\t0.4\t9999\t9999\t9999\t34\t1.1\t0.5\t9999\t9999\t9999\t\
52\t1.2\t0.6\t9999\t9999\t9999\tDUSTIN\tCLEMENTS\n";

    fn table(f: impl Fn(usize) -> StreamSample) -> StreamHarmonics {
        let mut samples = [StreamSample::default(); STREAM_HOURS];
        for (i, s) in samples.iter_mut().enumerate() {
            *s = f(i);
        }
        StreamHarmonics {
            chart: "TEST".to_string(),
            number: 1,
            name: "T".to_string(),
            reference: "ABERDEEN".to_string(),
            reference_event: ReferenceEvent::HighWater,
            lat: 0.0,
            lon: 0.0,
            samples,
        }
    }

    #[test]
    fn parses_diamond_line() {
        let h: StreamHarmonics = ABERDEEN_A.parse().unwrap();
        assert_eq!(h.chart, "BA1481");
        assert_eq!(h.reference, "ABERDEEN");
        assert_eq!(h.reference_event, ReferenceEvent::HighWater);
        assert_eq!(h.number, 244);
        assert_eq!(h.name, "A");
        assert!((h.lat - (56.0 + 25.89 / 60.0)).abs() < 1e-9);
        assert!((h.lon - (-2.0 - 36.99 / 60.0)).abs() < 1e-9);
        assert_eq!(h.samples[0].bearing, 59.0);
        assert_eq!(h.samples[6].spring_rate, 0.9);
        assert_eq!(h.samples[12].neap_rate, 0.6);
    }

    #[test]
    fn low_water_reference() {
        let line = ABERDEEN_A.replacen("\tHW\t", "\tLW\t", 1);
        let h: StreamHarmonics = line.parse().unwrap();
        assert_eq!(h.reference_event, ReferenceEvent::LowWater);
    }

    #[test]
    fn short_line_rejected() {
        let line: String = ABERDEEN_A.split('\t').take(40).collect::<Vec<_>>().join("\t");
        assert!(matches!(
            line.parse::<StreamHarmonics>(),
            Err(TideError::RecordParse { .. })
        ));
    }

    #[test]
    fn knots_return_table_values() {
        let h: StreamHarmonics = ABERDEEN_A.parse().unwrap();
        let interp = StreamInterpolator::new(h.clone()).unwrap();
        for (i, row) in h.samples.iter().enumerate() {
            let state = interp.stream_at((i as f64 - 6.0) * 60.0);
            assert_eq!(state.bearing, row.bearing);
            assert_eq!(state.spring_rate, row.spring_rate);
            assert_eq!(state.neap_rate, row.neap_rate);
        }
    }

    #[test]
    fn at_reference_event_returns_hour_zero() {
        let h: StreamHarmonics = ABERDEEN_A.parse().unwrap();
        let interp = StreamInterpolator::new(h).unwrap();
        let state = interp.stream_at(0.0);
        assert_eq!(state.bearing, 231.0);
        assert_eq!(state.spring_rate, 0.9);
        assert_eq!(state.neap_rate, 0.4);
    }

    #[test]
    fn constant_bearing_linear_rate() {
        let h = table(|i| StreamSample {
            bearing: 90.0,
            spring_rate: 0.1 * i as f64,
            neap_rate: 0.05 * i as f64,
        });
        let interp = StreamInterpolator::new(h.clone()).unwrap();
        let state = interp.stream_at(3.5 * 60.0);
        assert!((state.bearing - 90.0).abs() < 1e-6, "bearing {}", state.bearing);
        let (lo, hi) = (h.samples[9].spring_rate, h.samples[10].spring_rate);
        assert!(state.spring_rate > lo && state.spring_rate < hi);
        assert!((state.spring_rate - 0.95).abs() < 1e-9);
    }

    #[test]
    fn bearing_wraps_through_north() {
        let h = table(|i| StreamSample {
            bearing: (340.0 + 5.0 * i as f64) % 360.0,
            spring_rate: 1.0,
            neap_rate: 0.5,
        });
        let interp = StreamInterpolator::new(h).unwrap();
        // between 355° (hour index 3) and 0° (index 4)
        let state = interp.stream_at(-2.5 * 60.0);
        let off_north = state.bearing.min(360.0 - state.bearing);
        assert!(off_north < 5.0, "bearing {}", state.bearing);
        assert!((state.spring_rate - 1.0).abs() < 0.01);
    }

    #[test]
    fn clamps_between_six_and_seven_hours() {
        let h: StreamHarmonics = ABERDEEN_A.parse().unwrap();
        let interp = StreamInterpolator::new(h).unwrap();
        assert_eq!(interp.stream_at(6.5 * 60.0), interp.stream_at(6.0 * 60.0));
        assert_eq!(interp.stream_at(-6.9 * 60.0), interp.stream_at(-6.0 * 60.0));
    }

    #[test]
    fn far_offsets_return_zeros() {
        let h: StreamHarmonics = ABERDEEN_A.parse().unwrap();
        let interp = StreamInterpolator::new(h).unwrap();
        assert_eq!(interp.stream_at(8.0 * 60.0), StreamState::default());
        assert_eq!(interp.stream_at(f64::NAN), StreamState::default());
    }

    #[test]
    fn blend_is_cosine_taper() {
        let h: StreamHarmonics = ABERDEEN_A.parse().unwrap();
        let mut interp = StreamInterpolator::new(h).unwrap();
        assert!(interp.current().is_none());

        let springs = interp.stream_blended(0.0, 0.0);
        assert!((springs.rate - 0.9).abs() < 1e-9);
        let neaps = interp.stream_blended(0.0, 1.0);
        assert!((neaps.rate - 0.4).abs() < 1e-9);

        let half = interp.stream_blended(0.0, 0.5);
        let expected = 0.4 + 0.5 * std::f64::consts::FRAC_1_SQRT_2;
        assert!((half.rate - expected).abs() < 1e-9);
        assert_eq!(half.bearing, 231.0);
        assert_eq!(interp.current(), Some(half));
    }
}
