//! # Tide Prediction Oracle
//!
//! The core never computes tides from harmonic constituents itself. It asks a
//! [`TideOracle`] for heights on a regular grid and for the high-water events
//! in a time range.
//!
//! ## XTide
//!
//! [`XtideOracle`] runs the `tide` program distributed with XTide and parses
//! its CSV output:
//!
//! ```text
//! raw mode (-m r -f c):    Leith| Scotland,1273017600,3.45
//! plain mode (-m p -f c):  Leith| Scotland,2010 05 13,01 48,5.12 m,High Tide
//! ```
//!
//! Malformed or unrelated lines are skipped, never fatal. Each run gets the
//! harmonics path in its own environment (`HFILE_PATH`); the process-wide
//! environment is left alone.

use crate::config::OracleConfig;
use crate::{HighWater, Sample, TideError};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Source of tide predictions for a station.
pub trait TideOracle: Send {
    /// Heights from `start` to `end` inclusive every `interval`, in time order.
    fn heights(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<Sample>, TideError>;

    /// High-water events between `start` and `end`, in time order.
    fn high_waters(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HighWater>, TideError>;

    /// True when predictions are an approximation rather than the real thing.
    fn is_offline(&self) -> bool {
        false
    }
}

/// Oracle backed by the external XTide `tide` program.
pub struct XtideOracle {
    program: PathBuf,
    harmonics_file: PathBuf,
    timeout: std::time::Duration,
    runtime: Runtime,
}

impl XtideOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, TideError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TideError::OracleUnavailable {
                station: String::new(),
                reason: format!("cannot start runtime: {e}"),
            })?;
        Ok(XtideOracle {
            program: config.program.clone(),
            harmonics_file: config.harmonics_file.clone(),
            timeout: config.timeout(),
            runtime,
        })
    }

    /// Run the predictor and return its standard output.
    fn run(&self, station: &str, args: &[String]) -> Result<String, TideError> {
        let unavailable = |reason: String| TideError::OracleUnavailable {
            station: station.to_string(),
            reason,
        };

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(args)
            .env("HFILE_PATH", &self.harmonics_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(program = %self.program.display(), ?args, "running tide predictor");

        let output = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, command.output()).await })
            .map_err(|_| unavailable(format!("timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(format!(
                "{}: {}",
                output.status,
                stderr.lines().next().unwrap_or("").trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn range_args(start: DateTime<Utc>, end: DateTime<Utc>) -> [String; 4] {
    [
        "-b".to_string(),
        start.format("%Y-%m-%d %H:%M").to_string(),
        "-e".to_string(),
        end.format("%Y-%m-%d %H:%M").to_string(),
    ]
}

impl TideOracle for XtideOracle {
    fn heights(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<Sample>, TideError> {
        let step = format!(
            "{:02}:{:02}",
            interval.num_minutes() / 60,
            interval.num_minutes() % 60
        );
        let mut args: Vec<String> = [
            "-l", station, "-m", "r", "-f", "c", "-s", step.as_str(), "-z", "y", "-u", "m",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend(range_args(start, end));

        let stdout = self.run(station, &args)?;
        Ok(parse_raw_heights(&stdout))
    }

    fn high_waters(
        &self,
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HighWater>, TideError> {
        let mut args: Vec<String> = [
            "-l", station, "-m", "p", "-f", "c", "-z", "y", "-u", "m", "-em", "pSsMm", "-df",
            "%Y %m %d", "-tf", "%H %M",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend(range_args(start, end));

        let stdout = self.run(station, &args)?;
        Ok(parse_high_waters(&stdout))
    }
}

/// Parse raw-mode CSV lines `name,<unix seconds>,<height>`.
///
/// Fields are taken from the right so commas inside the name do no harm.
pub fn parse_raw_heights(text: &str) -> Vec<Sample> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let sample = parse_raw_line(line.trim());
            if sample.is_none() {
                warn!(line, "skipping malformed height line");
            }
            sample
        })
        .collect()
}

fn parse_raw_line(line: &str) -> Option<Sample> {
    let mut fields = line.rsplitn(3, ',');
    let height_m: f32 = fields.next()?.trim().parse().ok()?;
    let seconds: i64 = fields.next()?.trim().parse().ok()?;
    fields.next()?;
    let time = Utc.timestamp_opt(seconds, 0).single()?;
    Some(Sample { time, height_m })
}

/// Parse plain-mode CSV event lines, keeping only high tides.
pub fn parse_high_waters(text: &str) -> Vec<HighWater> {
    text.lines()
        .filter(|line| line.contains("High Tide"))
        .filter_map(|line| {
            let event = parse_event_line(line.trim());
            if event.is_none() {
                warn!(line, "skipping malformed high water line");
            }
            event
        })
        .collect()
}

fn parse_event_line(line: &str) -> Option<HighWater> {
    // name,YYYY MM DD,HH MM,5.12 m,High Tide
    let mut fields = line.rsplitn(5, ',');
    let _kind = fields.next()?;
    let height_m: f32 = fields.next()?.split_whitespace().next()?.parse().ok()?;
    let mut hm = fields.next()?.split_whitespace().map(str::parse::<u32>);
    let (hour, minute) = (hm.next()?.ok()?, hm.next()?.ok()?);
    let mut ymd = fields.next()?.split_whitespace();
    let year: i32 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next()?.parse().ok()?;
    let day: u32 = ymd.next()?.parse().ok()?;
    fields.next()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(HighWater {
        time: Utc.from_utc_datetime(&naive),
        height_m,
    })
}
