//! # Tidal Levels
//!
//! Secondary-port tidal level records, read from tab-separated lines:
//!
//! ```text
//! chart   N    place   lat min  lon min  MHWS MHWN MLWN MLWS datum remarks
//! BA1481  236  DUNDEE  56  27   -2  58   5.4  4.3  1.9  0.7  2.9   BELOW ORDNANCE DATUM
//! ```
//!
//! The current level is not part of the record; it is a slot filled by the
//! most recent prediction so that a display can show it later.

use crate::TideError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Degrees plus minutes, the minutes taking the sign of the degrees.
///
/// A leading '-' on the degrees counts even when they are zero, so "-0 30"
/// is half a degree south/west.
pub(crate) fn degrees_minutes(deg: &str, min: &str) -> Result<f64, String> {
    let deg = deg.trim();
    let whole: f64 = deg
        .parse()
        .map_err(|_| format!("bad degrees {deg:?}"))?;
    let minutes: f64 = min
        .trim()
        .parse()
        .map_err(|_| format!("bad minutes {min:?}"))?;
    let sign = if deg.starts_with('-') { -1.0 } else { 1.0 };
    Ok(whole + sign * minutes / 60.0)
}

pub(crate) fn parse_field<T: FromStr>(
    kind: &'static str,
    fields: &[&str],
    index: usize,
    what: &str,
) -> Result<T, TideError> {
    let raw = fields.get(index).map(|f| f.trim()).unwrap_or("");
    raw.parse().map_err(|_| TideError::RecordParse {
        kind,
        reason: format!("bad {what} {raw:?}"),
    })
}

/// Mean high/low water levels for a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TideLevelRecord {
    pub chart: String,
    pub number: i32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Mean high water springs, metres
    pub mhws: f32,
    /// Mean high water neaps
    pub mhwn: f32,
    /// Mean low water neaps
    pub mlwn: f32,
    /// Mean low water springs
    pub mlws: f32,
    #[serde(skip)]
    current_level: Option<f32>,
}

impl TideLevelRecord {
    /// Level set by the most recent query, if any
    pub fn current_level(&self) -> Option<f32> {
        self.current_level
    }

    pub fn set_current_level(&mut self, level: f32) {
        self.current_level = Some(level);
    }

    /// Spring range from MLWS to MHWS
    pub fn spring_range(&self) -> (f32, f32) {
        (self.mlws, self.mhws)
    }

    /// Neap range from MLWN to MHWN
    pub fn neap_range(&self) -> (f32, f32) {
        (self.mlwn, self.mhwn)
    }
}

impl FromStr for TideLevelRecord {
    type Err = TideError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        const KIND: &str = "tidal level";
        let fields: Vec<&str> = line.trim_end_matches(&['\r', '\n'][..]).split('\t').collect();
        if fields.len() < 11 {
            return Err(TideError::RecordParse {
                kind: KIND,
                reason: format!("expected at least 11 fields, got {}", fields.len()),
            });
        }
        let coord = |d: usize| {
            degrees_minutes(fields[d], fields[d + 1])
                .map_err(|reason| TideError::RecordParse { kind: KIND, reason })
        };

        Ok(TideLevelRecord {
            chart: fields[0].trim().to_string(),
            number: parse_field(KIND, &fields, 1, "number")?,
            name: fields[2].trim().to_string(),
            lat: coord(3)?,
            lon: coord(5)?,
            mhws: parse_field(KIND, &fields, 7, "MHWS")?,
            mhwn: parse_field(KIND, &fields, 8, "MHWN")?,
            mlwn: parse_field(KIND, &fields, 9, "MLWN")?,
            mlws: parse_field(KIND, &fields, 10, "MLWS")?,
            current_level: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUNDEE: &str =
        "BA1481\t236\tDUNDEE\t56\t27\t-2\t58\t5.4\t4.3\t1.9\t0.7\t2.9\tBELOW ORDNANCE DATUM\n";

    #[test]
    fn parses_level_line() {
        let rec: TideLevelRecord = DUNDEE.parse().unwrap();
        assert_eq!(rec.chart, "BA1481");
        assert_eq!(rec.number, 236);
        assert_eq!(rec.name, "DUNDEE");
        assert!((rec.lat - (56.0 + 27.0 / 60.0)).abs() < 1e-9);
        assert!((rec.lon - (-2.0 - 58.0 / 60.0)).abs() < 1e-9);
        assert_eq!(rec.spring_range(), (0.7, 5.4));
        assert_eq!(rec.neap_range(), (1.9, 4.3));
        assert_eq!(rec.current_level(), None);
    }

    #[test]
    fn short_line_is_rejected() {
        let err = "BA1481\t236\tDUNDEE".parse::<TideLevelRecord>().unwrap_err();
        assert!(matches!(err, TideError::RecordParse { kind: "tidal level", .. }));
    }

    #[test]
    fn bad_number_is_rejected() {
        let line = DUNDEE.replace("5.4", "high");
        assert!(line.parse::<TideLevelRecord>().is_err());
    }

    #[test]
    fn negative_zero_degrees_keep_sign() {
        assert!((degrees_minutes("-0", "30").unwrap() + 0.5).abs() < 1e-12);
        assert!((degrees_minutes("0", "30").unwrap() - 0.5).abs() < 1e-12);
        assert!(degrees_minutes("x", "30").is_err());
    }

    #[test]
    fn current_level_slot() {
        let mut rec: TideLevelRecord = DUNDEE.parse().unwrap();
        rec.set_current_level(3.25);
        assert_eq!(rec.current_level(), Some(3.25));
    }
}
