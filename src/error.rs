//! # Error Taxonomy
//!
//! Every fallible operation in the library returns [`TideError`]. Nothing is
//! retried automatically; callers decide whether a failed refill is worth
//! another attempt.

use crate::stations::StationId;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving stations, predicting tides or
/// parsing tidal records.
#[derive(Error, Debug)]
pub enum TideError {
    /// Station database missing or corrupt. Fatal to the directory only;
    /// the rest of the process continues without station data.
    #[error("cannot open station database {path}: {reason}")]
    DatabaseOpen { path: PathBuf, reason: String },

    /// Neither an exact nor a fuzzy match exists for the name
    #[error("station not found: {0}")]
    StationNotFound(String),

    /// Station resolved but its header could not be read
    #[error("station record {0} unavailable")]
    RecordUnavailable(StationId),

    /// Predictor could not be run, timed out or exited with an error
    #[error("tide predictor unavailable for {station}: {reason}")]
    OracleUnavailable { station: String, reason: String },

    /// Predictor ran but produced nothing usable
    #[error("tide predictor output unusable for {station}: {reason}")]
    OracleMalformedOutput { station: String, reason: String },

    /// Time cannot be served even after re-centring the window
    #[error("time {time} out of range for {station}")]
    QueryOutOfRange { station: String, time: DateTime<Utc> },

    /// Tidal stream or level line could not be parsed
    #[error("bad {kind} record: {reason}")]
    RecordParse { kind: &'static str, reason: String },
}
