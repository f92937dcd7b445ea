//! Source adapter: reads raw position rows from CSV into typed observations.
//!
//! Columns follow the source query aliases: `timestamp` (Unix seconds), `id`,
//! `lat`, `lon`, `speed_knots`, `course`, `distance_from_shore_km`. Rows with a
//! missing, unparsable or out-of-range value are dropped and counted.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::types::RawObservation;
use crate::stats::RunStats;

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    timestamp: Option<f64>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    lon: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    speed_knots: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    course: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    distance_from_shore_km: Option<f64>,
}

impl RawRow {
    fn into_observation(self, line: u64) -> PipelineResult<RawObservation> {
        let id = match self.id.map(|s| s.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => return Err(PipelineError::malformed(line, "missing id")),
        };

        Ok(RawObservation {
            id,
            timestamp: timestamp(self.timestamp, line)?,
            lat: required(self.lat, "lat", line, -90.0, 90.0)?,
            lon: required(self.lon, "lon", line, -180.0, 180.0)?,
            speed_knots: required(self.speed_knots, "speed_knots", line, 0.0, 100.0)?,
            course: course(self.course, line)?,
            distance_from_shore_km: required(
                self.distance_from_shore_km,
                "distance_from_shore_km",
                line,
                0.0,
                20_000.0,
            )?,
        })
    }
}

fn required(value: Option<f64>, field: &str, line: u64, min: f64, max: f64) -> PipelineResult<f64> {
    match value {
        None => Err(PipelineError::malformed(line, format!("missing {field}"))),
        Some(v) if !v.is_finite() || v < min || v > max => Err(PipelineError::malformed(
            line,
            format!("{field} {v} outside [{min}, {max}]"),
        )),
        Some(v) => Ok(v),
    }
}

// must map to a calendar date for partitioning and to an index on the grid
fn timestamp(value: Option<f64>, line: u64) -> PipelineResult<f64> {
    let v = required(value, "timestamp", line, f64::MIN, f64::MAX)?;
    if DateTime::from_timestamp(v.floor() as i64, 0).is_none() {
        return Err(PipelineError::malformed(
            line,
            format!("timestamp {v} is not a representable date"),
        ));
    }
    Ok(v)
}

// course is half-open: 360 must be reported as 0 upstream
fn course(value: Option<f64>, line: u64) -> PipelineResult<f64> {
    let v = required(value, "course", line, 0.0, 360.0)?;
    if v >= 360.0 {
        return Err(PipelineError::malformed(line, format!("course {v} outside [0, 360)")));
    }
    Ok(v)
}

/// Reads every valid observation from CSV `reader`, counting rows in `stats`.
///
/// # Errors
///
/// Only I/O failures and an unreadable header are fatal; bad rows are skipped.
pub fn read_observations<R: Read>(reader: R, stats: &mut RunStats) -> PipelineResult<Vec<RawObservation>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut observations = Vec::new();
    let mut record = csv::StringRecord::new();

    loop {
        match rdr.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                stats.rows_read += 1;
                stats.malformed_rows += 1;
                debug!(error = %e, "Unreadable CSV row dropped");
                continue;
            }
        }

        stats.rows_read += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let parsed = record
            .deserialize::<RawRow>(Some(&headers))
            .map_err(|e| PipelineError::malformed(line, e.to_string()))
            .and_then(|row| row.into_observation(line));

        match parsed {
            Ok(obs) => observations.push(obs),
            Err(e) => {
                stats.malformed_rows += 1;
                debug!(error = %e, "Malformed record dropped");
            }
        }
    }

    Ok(observations)
}

/// Opens a CSV file, transparently decompressing `.gz`.
pub fn open_source(path: &Path) -> PipelineResult<Box<dyn Read + Send>> {
    let file = BufReader::new(File::open(path)?);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Reads observations from a single CSV file.
pub fn read_file(path: &Path, stats: &mut RunStats) -> PipelineResult<Vec<RawObservation>> {
    read_observations(open_source(path)?, stats)
}

/// Dates to read for the range `[start, end]`: one lookback day before
/// `start` through `end`, inclusive.
pub fn source_dates(start: NaiveDate, end: NaiveDate) -> PipelineResult<Vec<NaiveDate>> {
    if start > end {
        return Err(PipelineError::invalid_config(format!(
            "start date {start} is after end date {end}"
        )));
    }

    let mut dates = Vec::new();
    let mut day = start.pred_opt().unwrap_or(start);
    while day <= end {
        dates.push(day);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    Ok(dates)
}

/// Finds the partition file for `date` under `dir`, plain or gzipped.
pub fn partition_file(dir: &Path, date: NaiveDate) -> Option<PathBuf> {
    let stem = format!("date={}.csv", date.format("%Y-%m-%d"));
    [dir.join(&stem), dir.join(format!("{stem}.gz"))]
        .into_iter()
        .find(|p| p.exists())
}

/// Reads every available daily partition for `[start, end]` (plus the
/// lookback day) from `dir`. Missing days are skipped.
#[tracing::instrument(skip(dir, stats), fields(dir = %dir.display()))]
pub fn read_partitioned(
    dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
    stats: &mut RunStats,
) -> PipelineResult<Vec<RawObservation>> {
    let mut observations = Vec::new();

    for date in source_dates(start, end)? {
        let Some(path) = partition_file(dir, date) else {
            warn!(date = %date, "No source partition for date");
            continue;
        };

        let before = stats.malformed_rows;
        let mut batch = read_file(&path, stats)?;
        info!(
            date = %date,
            rows = batch.len(),
            malformed = stats.malformed_rows - before,
            "Source partition read"
        );
        observations.append(&mut batch);
    }

    Ok(observations)
}
