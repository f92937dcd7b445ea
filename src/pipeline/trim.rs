//! Stationary trimmer: collapses long dwell periods to their endpoints.
//!
//! A run starts at some point (the anchor) and extends while each following
//! point in the same segment stays within `max_distance_km` of the anchor.
//! Runs lasting at least `min_period` keep only their first and last points
//! and the next run is anchored after them. A shorter run keeps its anchor
//! and the next point is tried as an anchor, so a dwell is found from its own
//! first point. Both thresholds are inclusive.

use crate::config::TrimParams;
use crate::pipeline::geo::haversine_km;
use crate::pipeline::types::{ResampledPoint, TrimmedPoint};

/// Trimmer output for one track.
#[derive(Debug, Default)]
pub struct Trimmed {
    pub points: Vec<TrimmedPoint>,
    pub runs_trimmed: usize,
    pub points_dropped: usize,
}

/// Trims stationary runs from a resampled track. Input must be in
/// timestamp order with segments contiguous, as the resampler emits them.
pub fn trim_stationary(points: &[ResampledPoint], params: &TrimParams) -> Trimmed {
    let mut out = Trimmed {
        points: Vec::with_capacity(points.len()),
        ..Default::default()
    };

    let min_period = params.min_period_secs();
    let mut start = 0;

    while start < points.len() {
        let end = run_end(points, start, params.max_distance_km);
        let run = &points[start..end];

        let duration = run[run.len() - 1].timestamp - run[0].timestamp;
        if run.len() >= 2 && duration >= min_period {
            out.points.push(boundary(&run[0]));
            out.points.push(boundary(&run[run.len() - 1]));
            out.runs_trimmed += 1;
            out.points_dropped += run.len() - 2;
            start = end;
        } else {
            out.points.push(TrimmedPoint {
                point: run[0].clone(),
                is_stationary_boundary: false,
            });
            start += 1;
        }
    }

    out
}

/// Exclusive end index of the run anchored at `start`.
fn run_end(points: &[ResampledPoint], start: usize, max_distance_km: f64) -> usize {
    let anchor = &points[start];
    let mut end = start + 1;

    while end < points.len() {
        let p = &points[end];
        if p.segment_id != anchor.segment_id
            || haversine_km(anchor.lat, anchor.lon, p.lat, p.lon) > max_distance_km
        {
            break;
        }
        end += 1;
    }

    end
}

fn boundary(point: &ResampledPoint) -> TrimmedPoint {
    TrimmedPoint {
        point: point.clone(),
        is_stationary_boundary: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: f64 = 3600.0;
    // roughly 0.1 km of latitude
    const STEP_DEG: f64 = 0.0009;

    fn point(timestamp: f64, lat: f64, lon: f64, segment_id: u32) -> ResampledPoint {
        ResampledPoint {
            id: "A".to_string(),
            timestamp,
            lat,
            lon,
            speed_knots: 0.0,
            course: 0.0,
            distance_from_shore_km: 1.0,
            segment_id,
        }
    }

    /// Points every 15 minutes for `hours`, jittering within ~0.2 km.
    fn dwell(start: f64, hours: f64, segment_id: u32) -> Vec<ResampledPoint> {
        let n = (hours * 4.0) as usize;
        (0..=n)
            .map(|i| {
                let jitter = (i % 3) as f64 * STEP_DEG;
                point(start + i as f64 * 900.0, 10.0 + jitter, 20.0, segment_id)
            })
            .collect()
    }

    /// Points every 15 minutes moving north about 4 km per step.
    fn transit(start: f64, steps: usize, lat0: f64, segment_id: u32) -> Vec<ResampledPoint> {
        (0..steps)
            .map(|i| point(start + i as f64 * 900.0, lat0 + i as f64 * 0.036, 20.0, segment_id))
            .collect()
    }

    #[test]
    fn test_long_dwell_collapses_to_endpoints() {
        let input = dwell(0.0, 50.0, 0);
        let out = trim_stationary(&input, &TrimParams::default());

        assert_eq!(out.points.len(), 2);
        assert_eq!(out.points[0].point, input[0]);
        assert_eq!(out.points[1].point, input[input.len() - 1]);
        assert!(out.points.iter().all(|p| p.is_stationary_boundary));
        assert_eq!(out.runs_trimmed, 1);
        assert_eq!(out.points_dropped, input.len() - 2);
    }

    #[test]
    fn test_short_dwell_is_identity() {
        let input = dwell(0.0, 47.0, 0);
        let out = trim_stationary(&input, &TrimParams::default());

        assert_eq!(out.points.len(), input.len());
        assert!(out.points.iter().zip(&input).all(|(o, i)| o.point == *i));
        assert!(out.points.iter().all(|p| !p.is_stationary_boundary));
        assert_eq!(out.runs_trimmed, 0);
    }

    #[test]
    fn test_duration_exactly_min_period_qualifies() {
        let input = dwell(0.0, 48.0, 0);
        let out = trim_stationary(&input, &TrimParams::default());
        assert_eq!(out.points.len(), 2);
    }

    #[test]
    fn test_distance_exactly_threshold_qualifies() {
        let a = point(0.0, 0.0, 0.0, 0);
        let b = point(HOUR, 0.0, 0.01, 0);
        let c = point(2.0 * HOUR, 0.0, 0.0, 0);
        let params = TrimParams {
            max_distance_km: haversine_km(0.0, 0.0, 0.0, 0.01),
            min_period_min: 120.0,
        };

        let out = trim_stationary(&[a, b, c], &params);
        assert_eq!(out.points.len(), 2);
        assert_eq!(out.runs_trimmed, 1);
    }

    #[test]
    fn test_transit_around_dwell_is_preserved() {
        let mut input = transit(0.0, 8, 9.0, 0);
        let dwell_start = input[input.len() - 1].timestamp + 900.0;
        let docked = dwell(dwell_start, 60.0, 0);
        let docked_len = docked.len();
        input.extend(docked);
        let after = input[input.len() - 1].timestamp + 900.0;
        input.extend(transit(after, 5, 10.5, 0));

        let out = trim_stationary(&input, &TrimParams::default());

        assert_eq!(out.runs_trimmed, 1);
        assert_eq!(out.points.len(), 8 + 2 + 5);
        assert_eq!(out.points_dropped, docked_len - 2);
        let flagged: Vec<f64> = out
            .points
            .iter()
            .filter(|p| p.is_stationary_boundary)
            .map(|p| p.point.timestamp)
            .collect();
        assert_eq!(flagged, vec![dwell_start, dwell_start + 60.0 * HOUR]);
    }

    #[test]
    fn test_approach_point_does_not_split_dwell() {
        // at the equator 0.0045 deg of longitude is ~0.5 km, 0.0036 deg ~0.4 km
        let mut input = vec![point(0.0, 0.0, -0.0045, 0)];
        input.extend((0..=200).map(|i| {
            let lon = if i % 2 == 0 { 0.0 } else { 0.0036 };
            point(900.0 + i as f64 * 900.0, 0.0, lon, 0)
        }));

        let out = trim_stationary(&input, &TrimParams::default());

        let kept: Vec<f64> = out.points.iter().map(|p| p.point.timestamp).collect();
        assert_eq!(kept, vec![0.0, 900.0, 900.0 + 50.0 * HOUR]);
        assert!(!out.points[0].is_stationary_boundary);
        assert!(out.points[1..].iter().all(|p| p.is_stationary_boundary));
        assert_eq!(out.runs_trimmed, 1);
        assert_eq!(out.points_dropped, 199);
    }

    #[test]
    fn test_runs_do_not_cross_segments() {
        let mut input = dwell(0.0, 30.0, 0);
        input.extend(dwell(31.0 * HOUR, 30.0, 1));

        let out = trim_stationary(&input, &TrimParams::default());

        assert_eq!(out.points.len(), input.len());
        assert_eq!(out.runs_trimmed, 0);
    }

    #[test]
    fn test_empty_input() {
        let out = trim_stationary(&[], &TrimParams::default());
        assert!(out.points.is_empty());
    }
}
