//! # Tide Overlay Application Entry Point
//!
//! Command-line front end for the prediction service: tide heights, the
//! Moon's spring/neap state, tidal stream arrows, level gauges and an ASCII
//! chart. Predictions come from the external `tide` program unless
//! `--offline` selects the built-in harmonic approximation.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tide_overlay_lib::config::Config;
use tide_overlay_lib::level::TideLevelRecord;
use tide_overlay_lib::overlay::TideOverlay;
use tide_overlay_lib::prediction::TidePredictionService;
use tide_overlay_lib::renderer::draw_ascii;
use tide_overlay_lib::stream::{StreamHarmonics, StreamInterpolator};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tide-overlay", version, about = "Tide heights and tidal streams for chart overlays")]
struct Cli {
    /// Configuration file (defaults to tide-overlay.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the built-in harmonic approximation instead of the tide program
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Height and nearest high water at a station
    Height {
        #[arg(long)]
        station: String,
        /// RFC 3339 instant, defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Lunar age and spring/neap fraction
    Moon {
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Stream arrows for every diamond in a tab-separated file
    Streams {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Level gauges for every port in a tab-separated file
    Levels {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// ASCII chart of the 24 hours around an instant
    Chart {
        #[arg(long)]
        station: String,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "debug,tide_overlay_lib=debug"
    } else {
        "info,tide_overlay_lib=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Non-empty, non-comment lines of a record file.
fn record_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading records from {}", path.display()))?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn load_streams(path: &Path) -> Result<Vec<StreamInterpolator>> {
    let mut streams = Vec::new();
    for (number, line) in record_lines(path)?.iter().enumerate() {
        match line
            .parse::<StreamHarmonics>()
            .and_then(StreamInterpolator::new)
        {
            Ok(stream) => streams.push(stream),
            Err(e) => warn!(line = number + 1, error = %e, "skipping stream record"),
        }
    }
    info!(count = streams.len(), file = %path.display(), "loaded tidal streams");
    Ok(streams)
}

fn load_levels(path: &Path) -> Result<Vec<TideLevelRecord>> {
    let mut levels = Vec::new();
    for (number, line) in record_lines(path)?.iter().enumerate() {
        match line.parse::<TideLevelRecord>() {
            Ok(level) => levels.push(level),
            Err(e) => warn!(line = number + 1, error = %e, "skipping level record"),
        }
    }
    info!(count = levels.len(), file = %path.display(), "loaded tidal levels");
    Ok(levels)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    debug!(?config, "configuration");

    let service = TidePredictionService::from_config(&config, cli.offline)
        .context("starting tide prediction service")?;
    let mut overlay = TideOverlay::new(service);

    match cli.command {
        Command::Height { station, at } => {
            let time = at.unwrap_or_else(Utc::now);
            let predictions = overlay.predictions();
            let height = predictions
                .find_tide(&station, time)
                .with_context(|| format!("predicting height at {station}"))?;
            let hw = predictions
                .find_nearest_high_water(&station, time)
                .with_context(|| format!("finding high water at {station}"))?;
            println!("{station} {}", time.format("%Y-%m-%d %H:%M UTC"));
            println!("  height      {height:.2} m");
            println!(
                "  high water  {} ({:.2} m)",
                hw.time.format("%Y-%m-%d %H:%M UTC"),
                hw.height_m
            );
            if let Ok((lat, lon)) = predictions.station_location(&station) {
                println!("  position    {lat:.4}, {lon:.4}");
            }
        }
        Command::Moon { at } => {
            let time = at.unwrap_or_else(Utc::now);
            let moon = overlay.moon();
            println!("{}", time.format("%Y-%m-%d %H:%M UTC"));
            println!("  lunar age   {:.2} days", moon.lunar_age(time));
            println!("  since new   {:.0} min", moon.minutes_since_new(time));
            println!("  spring/neap {:.3}", moon.spring_neap_fraction(time));
        }
        Command::Streams { file, at } => {
            let time = at.unwrap_or_else(Utc::now);
            let mut streams = load_streams(&file)?;
            overlay.retain_known_references(&mut streams);
            for arrow in overlay.stream_arrows(&mut streams, time) {
                println!(
                    "{:<24} {:>8.4} {:>9.4}  {:>5.1}°  {:>4.2} kn  HW{:+.0} min",
                    arrow.name,
                    arrow.lat,
                    arrow.lon,
                    arrow.bearing,
                    arrow.rate,
                    arrow.minutes_from_reference
                );
            }
        }
        Command::Levels { file, at } => {
            let time = at.unwrap_or_else(Utc::now);
            let mut levels = load_levels(&file)?;
            for marker in overlay.level_markers(&mut levels, time) {
                println!(
                    "{:<24} {:>8.4} {:>9.4}  {:>5.2} m  [{:.1} .. {:.1}]",
                    marker.name, marker.lat, marker.lon, marker.level, marker.low, marker.high
                );
            }
        }
        Command::Chart { station, at } => {
            let time = at.unwrap_or_else(Utc::now);
            let predictions = overlay.predictions();
            let series = predictions
                .series(&station, time - Duration::hours(12), time + Duration::hours(12))
                .with_context(|| format!("building chart for {station}"))?;
            let hw = predictions
                .cache(&station)
                .map(|cache| cache.high_waters().to_vec())
                .unwrap_or_default();
            draw_ascii(&series, time, &hw);
        }
    }
    Ok(())
}
