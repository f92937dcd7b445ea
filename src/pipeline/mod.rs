//! The per-vessel feature pipeline.
//!
//! Observations are grouped into one [`Track`] per identifier, then every
//! track runs the resample -> trim -> features chain independently on the
//! rayon pool. Tracks never share state, so one vessel cannot affect another.

pub mod features;
pub mod geo;
pub mod group;
pub mod resample;
pub mod trim;
pub mod types;

use rayon::prelude::*;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::stats::{RunStats, TrackStats};
use features::build_features;
use group::{dedup_timestamps, group_by_id};
use resample::resample;
use trim::trim_stationary;
use types::{FeatureRecord, RawObservation, Track};

/// Runs the full chain for one track.
pub fn process_track(track: &Track, config: &PipelineConfig) -> (Vec<FeatureRecord>, TrackStats) {
    let mut stats = TrackStats {
        observations: track.observations.len(),
        ..Default::default()
    };

    let (observations, duplicates) = dedup_timestamps(&track.observations);
    stats.duplicate_timestamps = duplicates;

    if observations.len() < 2 {
        debug!(id = %track.id, observations = observations.len(), "Insufficient data to resample");
        stats.insufficient_data = true;
        return (Vec::new(), stats);
    }

    let track = Track {
        id: track.id.clone(),
        observations,
    };

    let resampled = resample(&track, &config.resample);
    stats.segments = resampled.segments as usize;
    stats.resampled_points = resampled.points.len();

    if resampled.points.is_empty() {
        debug!(id = %track.id, "No resampled points for track");
        stats.insufficient_data = true;
        return (Vec::new(), stats);
    }

    let trimmed = trim_stationary(&resampled.points, &config.trim);
    stats.stationary_runs_trimmed = trimmed.runs_trimmed;
    stats.stationary_points_dropped = trimmed.points_dropped;

    let features = build_features(&trimmed.points);
    stats.degenerate_features = features.degenerate;
    stats.records = features.records.len();

    if duplicates > 0 || features.degenerate > 0 {
        debug!(
            id = %track.id,
            duplicates,
            degenerate = features.degenerate,
            "Numeric degeneracy resolved to null features"
        );
    }

    (features.records, stats)
}

/// Groups observations and processes every track in parallel.
///
/// Records come back ordered by identifier, then by timestamp. `stats`
/// receives the per-track counters.
pub fn run_pipeline<I>(observations: I, config: &PipelineConfig, stats: &mut RunStats) -> Vec<FeatureRecord>
where
    I: IntoIterator<Item = RawObservation>,
{
    let tracks = group_by_id(observations);
    debug!(tracks = tracks.len(), "Grouped observations into tracks");

    let results: Vec<(Vec<FeatureRecord>, TrackStats)> = tracks
        .par_iter()
        .map(|track| process_track(track, config))
        .collect();

    let mut records = Vec::with_capacity(results.iter().map(|(r, _)| r.len()).sum());
    for (track_records, track_stats) in results {
        stats.add_track(&track_stats);
        records.extend(track_records);
    }

    records
}
