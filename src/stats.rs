//! Counters for a pipeline run.
//!
//! Each track produces its own [`TrackStats`]; the run folds them into a
//! [`RunStats`] without any shared mutable state.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackStats {
    pub observations: usize,
    pub duplicate_timestamps: usize,
    pub insufficient_data: bool,
    pub segments: usize,
    pub resampled_points: usize,
    pub stationary_runs_trimmed: usize,
    pub stationary_points_dropped: usize,
    pub degenerate_features: usize,
    pub records: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,

    // source
    pub rows_read: usize,
    pub malformed_rows: usize,

    // tracks
    pub tracks: usize,
    pub insufficient_tracks: usize,
    pub observations: usize,
    pub duplicate_timestamps: usize,
    pub segments: usize,
    pub resampled_points: usize,
    pub stationary_runs_trimmed: usize,
    pub stationary_points_dropped: usize,
    pub degenerate_features: usize,

    // sink
    pub records_built: usize,
    pub records_written: usize,
    pub partitions_written: usize,
}

impl RunStats {
    pub fn new() -> Self {
        RunStats {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Folds one track's counters into the run totals.
    pub fn add_track(&mut self, t: &TrackStats) {
        self.tracks += 1;
        if t.insufficient_data {
            self.insufficient_tracks += 1;
        }
        self.observations += t.observations;
        self.duplicate_timestamps += t.duplicate_timestamps;
        self.segments += t.segments;
        self.resampled_points += t.resampled_points;
        self.stationary_runs_trimmed += t.stationary_runs_trimmed;
        self.stationary_points_dropped += t.stationary_points_dropped;
        self.degenerate_features += t.degenerate_features;
        self.records_built += t.records;
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of raw rows dropped as malformed.
    pub fn malformed_pct(&self) -> f64 {
        Self::pct(self.malformed_rows, self.rows_read)
    }

    /// Share of resampled points removed by stationary trimming.
    pub fn trimmed_pct(&self) -> f64 {
        Self::pct(self.stationary_points_dropped, self.resampled_points)
    }
}
