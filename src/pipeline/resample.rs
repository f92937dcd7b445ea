//! Resampler: puts an irregular track onto the global sampling grid.
//!
//! A track is first split wherever two consecutive observations are more than
//! `max_gap` apart. Each piece starts with its first observation carried at
//! its own timestamp, then is sampled at every later grid timestamp up to its
//! last observation, interpolating between the bracketing observations. The
//! track's final observation closes the output even when it is off the grid.
//! Grid timestamps are `grid_origin + k * increment` for integer `k`, so
//! output from different vessels lines up.

use tracing::{debug, warn};

use crate::config::ResampleParams;
use crate::pipeline::geo::{intermediate_point, interpolate_course};
use crate::pipeline::types::{RawObservation, ResampledPoint, Track};

// largest grid index an f64 holds exactly
const MAX_GRID_INDEX: f64 = 9_007_199_254_740_992.0;

/// Resampler output for one track.
#[derive(Debug, Default)]
pub struct Resampled {
    pub points: Vec<ResampledPoint>,
    pub segments: u32,
}

/// Smallest grid index whose timestamp is at or after `timestamp`, or `None`
/// when the timestamp is too far from the grid origin to index.
pub fn grid_index_at_or_after(timestamp: f64, params: &ResampleParams) -> Option<i64> {
    let index = ((timestamp - params.grid_origin) / params.increment_secs()).ceil();
    if !index.is_finite() || index.abs() >= MAX_GRID_INDEX {
        return None;
    }

    let mut k = index as i64;
    while grid_time(k, params) < timestamp {
        k = k.checked_add(1)?;
    }
    Some(k)
}

pub fn grid_time(k: i64, params: &ResampleParams) -> f64 {
    params.grid_origin + k as f64 * params.increment_secs()
}

/// Splits observations wherever consecutive timestamps differ by more than
/// `max_gap_secs`. Every returned slice is non-empty.
pub fn split_segments(observations: &[RawObservation], max_gap_secs: f64) -> Vec<&[RawObservation]> {
    let mut segments = Vec::new();
    if observations.is_empty() {
        return segments;
    }

    let mut start = 0;
    for i in 1..observations.len() {
        if observations[i].timestamp - observations[i - 1].timestamp > max_gap_secs {
            segments.push(&observations[start..i]);
            start = i;
        }
    }
    segments.push(&observations[start..]);
    segments
}

/// Resamples one track. Tracks with fewer than two observations produce
/// nothing.
pub fn resample(track: &Track, params: &ResampleParams) -> Resampled {
    let mut out = Resampled::default();

    if track.observations.len() < 2 {
        return out;
    }

    let segments = split_segments(&track.observations, params.max_gap_secs());
    let last = segments.len() - 1;

    for (i, segment) in segments.into_iter().enumerate() {
        if resample_segment(segment, out.segments, params, i == last, &mut out.points) {
            out.segments += 1;
        } else {
            warn!(
                id = %track.id,
                start = segment[0].timestamp,
                observations = segment.len(),
                "Segment outside the sampling grid range dropped"
            );
        }
    }

    debug!(id = %track.id, segments = out.segments, points = out.points.len(), "Track resampled");
    out
}

/// Emits one segment into `out`. Returns false, emitting nothing, when the
/// segment cannot be placed on the grid.
fn resample_segment(
    segment: &[RawObservation],
    segment_id: u32,
    params: &ResampleParams,
    closes_track: bool,
    out: &mut Vec<ResampledPoint>,
) -> bool {
    let first = &segment[0];
    let last = &segment[segment.len() - 1];

    let Some(mut k) = grid_index_at_or_after(first.timestamp, params) else {
        return false;
    };
    if grid_time(k, params) == first.timestamp {
        match k.checked_add(1) {
            Some(next) => k = next,
            None => return false,
        }
    }

    out.push(carry(first, segment_id));

    // invariant: segment[j].timestamp <= t <= segment[j + 1].timestamp
    let mut j = 0;
    while segment.len() > 1 {
        let t = grid_time(k, params);
        if t > last.timestamp {
            break;
        }
        while j + 2 < segment.len() && segment[j + 1].timestamp <= t {
            j += 1;
        }

        let (a, b) = (&segment[j], &segment[j + 1]);
        // strictly inside (a, b) implies a non-zero span
        let point = if t == a.timestamp {
            carry(a, segment_id)
        } else if t == b.timestamp {
            carry(b, segment_id)
        } else {
            let f = ((t - a.timestamp) / (b.timestamp - a.timestamp)).clamp(0.0, 1.0);
            interpolate(a, b, f, t, segment_id)
        };
        out.push(point);

        match k.checked_add(1) {
            Some(next) => k = next,
            None => break,
        }
    }

    if closes_track && out.last().map(|p| p.timestamp) != Some(last.timestamp) {
        out.push(carry(last, segment_id));
    }

    true
}

fn carry(obs: &RawObservation, segment_id: u32) -> ResampledPoint {
    ResampledPoint {
        id: obs.id.clone(),
        timestamp: obs.timestamp,
        lat: obs.lat,
        lon: obs.lon,
        speed_knots: obs.speed_knots,
        course: obs.course,
        distance_from_shore_km: obs.distance_from_shore_km,
        segment_id,
    }
}

fn interpolate(
    a: &RawObservation,
    b: &RawObservation,
    f: f64,
    timestamp: f64,
    segment_id: u32,
) -> ResampledPoint {
    let lerp = |x: f64, y: f64| x + (y - x) * f;
    let (lat, lon) = intermediate_point(a.lat, a.lon, b.lat, b.lon, f);

    ResampledPoint {
        id: a.id.clone(),
        timestamp,
        lat,
        lon,
        speed_knots: lerp(a.speed_knots, b.speed_knots),
        course: interpolate_course(a.course, b.course, f),
        distance_from_shore_km: lerp(a.distance_from_shore_km, b.distance_from_shore_km),
        segment_id,
    }
}
