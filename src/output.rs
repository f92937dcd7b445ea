//! Sink adapter: persists feature records as CSV.
//!
//! Supports appending to a single file and writing one file per UTC event
//! date (`date=YYYY-MM-DD.csv`, optionally gzipped).

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info, warn};

use crate::pipeline::types::FeatureRecord;
use crate::stats::RunStats;

/// A partition file written by [`write_partitions`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPartition {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub records: usize,
}

/// Logs run statistics as pretty-printed JSON.
pub fn print_json(stats: &RunStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// UTC calendar date of a Unix timestamp in seconds.
pub fn partition_date(timestamp: f64) -> Option<NaiveDate> {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos).map(|dt| dt.date_naive())
}

/// File name of the partition for `date`.
pub fn partition_file_name(date: NaiveDate, gzip: bool) -> String {
    let name = format!("date={}.csv", date.format("%Y-%m-%d"));
    if gzip { format!("{name}.gz") } else { name }
}

/// Appends feature records as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, records: &[FeatureRecord]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, records = records.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // header only for a new file
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes records into one CSV per event date under `dir`, replacing any
/// existing partition of the same name.
///
/// Records dated before `since` are skipped.
pub fn write_partitions(
    dir: &Path,
    records: &[FeatureRecord],
    since: Option<NaiveDate>,
    gzip: bool,
) -> Result<Vec<WrittenPartition>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut by_date: BTreeMap<NaiveDate, Vec<&FeatureRecord>> = BTreeMap::new();
    for record in records {
        let Some(date) = partition_date(record.timestamp) else {
            warn!(id = %record.id, timestamp = record.timestamp, "Record timestamp has no calendar date");
            continue;
        };
        if since.is_some_and(|s| date < s) {
            continue;
        }
        by_date.entry(date).or_default().push(record);
    }

    let mut written = Vec::with_capacity(by_date.len());
    for (date, rows) in by_date {
        let path = dir.join(partition_file_name(date, gzip));
        let file = File::create(&path)
            .with_context(|| format!("failed to create partition {}", path.display()))?;

        if gzip {
            let encoder = write_rows(GzEncoder::new(file, Compression::default()), &rows)?;
            encoder.finish()?;
        } else {
            write_rows(file, &rows)?;
        }

        debug!(date = %date, records = rows.len(), path = %path.display(), "Partition written");
        written.push(WrittenPartition {
            date,
            path,
            records: rows.len(),
        });
    }

    Ok(written)
}

fn write_rows<W: Write>(inner: W, rows: &[&FeatureRecord]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(inner);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV writer: {}", e.error()))
}
