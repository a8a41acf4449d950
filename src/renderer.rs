//! # ASCII Tide Chart
//!
//! Renders a [`TideSeries`] as a text chart for terminals and logs. One column
//! per sample, heights scaled onto a fixed number of rows, the sample nearest
//! "now" marked with `X` and high waters with `^` under the axis.

use crate::{HighWater, TideSeries};
use chrono::{DateTime, Utc};

const ROWS: usize = 16;
const Y_AXIS_WIDTH: usize = 6; // room for "-0.5│"

/// Render the chart to a string.
pub fn render_ascii(series: &TideSeries, now: DateTime<Utc>, high_waters: &[HighWater]) -> String {
    let mut out = String::new();
    if series.samples.is_empty() {
        out.push_str(&format!("{}: no tide data\n", series.station));
        return out;
    }

    let (min_h, max_h) = series
        .samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), s| {
            (min.min(s.height_m), max.max(s.height_m))
        });
    let span = (max_h - min_h).max(0.1);
    let to_row = |h: f32| {
        let normalized = (h - min_h) / span;
        ((1.0 - normalized) * (ROWS as f32 - 1.0)).round() as usize
    };

    let columns = series.samples.len();
    let mut grid = vec![vec![' '; columns + Y_AXIS_WIDTH]; ROWS];

    // Y-axis labels every half metre (every metre for big ranges)
    let step = if span > 4.0 { 1.0 } else { 0.5 };
    let mut label_h = (min_h / step).ceil() * step;
    while label_h <= max_h {
        let row = to_row(label_h).min(ROWS - 1);
        let label = format!("{:>5.1}", label_h);
        for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 1).enumerate() {
            grid[row][i] = ch;
        }
        grid[row][Y_AXIS_WIDTH - 1] = '│';
        label_h += step;
    }

    let now_column = series
        .samples
        .iter()
        .enumerate()
        .min_by_key(|(_, s)| (s.time - now).num_seconds().abs())
        .map(|(i, _)| i);

    for (column, sample) in series.samples.iter().enumerate() {
        let row = to_row(sample.height_m).min(ROWS - 1);
        grid[row][column + Y_AXIS_WIDTH] = if Some(column) == now_column { 'X' } else { '•' };
    }

    if series.offline {
        out.push_str("⚠ OFFLINE (approximate tides)\n");
    }
    out.push_str(&format!("{}\n", series.station));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    // hour ticks, then high-water markers
    let first = series.samples[0].time;
    let last = series.samples[columns - 1].time;
    let mut ticks = " ".repeat(Y_AXIS_WIDTH);
    let mut marks = " ".repeat(Y_AXIS_WIDTH);
    for sample in &series.samples {
        ticks.push(if sample.time.timestamp() % 3600 == 0 { '|' } else { ' ' });
        let is_hw = high_waters.iter().any(|hw| {
            hw.time >= first && hw.time <= last && (hw.time - sample.time).num_minutes().abs() <= 7
        });
        marks.push(if is_hw { '^' } else { ' ' });
    }
    out.push_str(ticks.trim_end());
    out.push('\n');
    if marks.trim().is_empty() {
        return out;
    }
    out.push_str(marks.trim_end());
    out.push('\n');
    for hw in high_waters.iter().filter(|hw| hw.time >= first && hw.time <= last) {
        out.push_str(&format!(
            "  HW {} {:.2} m\n",
            hw.time.format("%Y-%m-%d %H:%M UTC"),
            hw.height_m
        ));
    }
    out
}

/// Print the chart to stdout.
pub fn draw_ascii(series: &TideSeries, now: DateTime<Utc>, high_waters: &[HighWater]) {
    print!("{}", render_ascii(series, now, high_waters));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;
    use chrono::{Duration, TimeZone};

    fn series(offline: bool) -> TideSeries {
        let t0 = Utc.with_ymd_and_hms(2010, 5, 5, 0, 0, 0).unwrap();
        let samples = (0..=96)
            .map(|i| Sample {
                time: t0 + Duration::minutes(15 * i),
                height_m: 2.9 + 1.6 * ((i as f32) * std::f32::consts::TAU / 49.7).sin(),
            })
            .collect();
        TideSeries {
            station: "ABERDEEN".to_string(),
            samples,
            offline,
        }
    }

    #[test]
    fn marks_now_once() {
        let s = series(false);
        let now = s.samples[48].time;
        let text = render_ascii(&s, now, &[]);
        assert_eq!(text.matches('X').count(), 1);
        assert!(text.starts_with("ABERDEEN\n"));
        assert!(!text.contains("OFFLINE"));
    }

    #[test]
    fn flags_offline_and_high_water() {
        let s = series(true);
        let hw = HighWater {
            time: s.samples[12].time,
            height_m: 4.5,
        };
        let text = render_ascii(&s, s.samples[0].time, &[hw]);
        assert!(text.contains("OFFLINE"));
        assert!(text.contains('^'));
        assert!(text.contains("HW 2010-05-05 03:00 UTC 4.50 m"));
    }

    #[test]
    fn empty_series() {
        let s = TideSeries {
            station: "LEITH".to_string(),
            samples: vec![],
            offline: false,
        };
        assert_eq!(render_ascii(&s, Utc::now(), &[]), "LEITH: no tide data\n");
    }
}
