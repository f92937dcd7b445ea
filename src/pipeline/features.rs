//! Feature builder: derives per-point motion features relative to the
//! previous kept point of the same segment.

use crate::pipeline::geo::{KM_PER_NM, angle_difference, haversine_km, initial_bearing};
use crate::pipeline::types::{FeatureRecord, TrimmedPoint};

/// Feature builder output for one track.
#[derive(Debug, Default)]
pub struct Features {
    pub records: Vec<FeatureRecord>,
    /// Records whose implied speed or course was left null because of a zero
    /// elapsed time or coincident positions.
    pub degenerate: usize,
}

pub fn build_features(points: &[TrimmedPoint]) -> Features {
    let mut out = Features {
        records: Vec::with_capacity(points.len()),
        ..Default::default()
    };

    let mut prev: Option<&TrimmedPoint> = None;

    for current in points {
        let p = &current.point;
        let previous = prev.filter(|q| q.point.segment_id == p.segment_id);

        let mut record = FeatureRecord {
            id: p.id.clone(),
            timestamp: p.timestamp,
            lat: p.lat,
            lon: p.lon,
            speed_knots: p.speed_knots,
            course: p.course,
            distance_from_shore_km: p.distance_from_shore_km,
            segment_id: p.segment_id,
            elapsed_s: None,
            displacement_km: None,
            implied_speed_knots: None,
            implied_course: None,
            speed_delta_knots: None,
            course_delta: None,
        };

        if let Some(q) = previous.map(|q| &q.point) {
            let elapsed = p.timestamp - q.timestamp;
            let displacement = haversine_km(q.lat, q.lon, p.lat, p.lon);

            record.elapsed_s = Some(elapsed);
            record.displacement_km = Some(displacement);
            record.speed_delta_knots = Some(p.speed_knots - q.speed_knots);
            record.course_delta = Some(angle_difference(q.course, p.course));

            if elapsed > 0.0 {
                record.implied_speed_knots = Some(displacement / KM_PER_NM / (elapsed / 3600.0));
                if displacement > 0.0 {
                    record.implied_course = Some(initial_bearing(q.lat, q.lon, p.lat, p.lon));
                } else {
                    out.degenerate += 1;
                }
            } else {
                out.degenerate += 1;
            }
        }

        out.records.push(record);
        prev = Some(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::ResampledPoint;

    fn kept(timestamp: f64, lat: f64, lon: f64, segment_id: u32) -> TrimmedPoint {
        TrimmedPoint {
            point: ResampledPoint {
                id: "A".to_string(),
                timestamp,
                lat,
                lon,
                speed_knots: 8.0,
                course: 90.0,
                distance_from_shore_km: 3.0,
                segment_id,
            },
            is_stationary_boundary: false,
        }
    }

    #[test]
    fn test_first_point_has_null_features() {
        let out = build_features(&[kept(0.0, 0.0, 0.0, 0)]);
        let r = &out.records[0];
        assert!(r.elapsed_s.is_none());
        assert!(r.displacement_km.is_none());
        assert!(r.implied_speed_knots.is_none());
        assert!(r.implied_course.is_none());
        assert!(r.speed_delta_knots.is_none());
        assert_eq!(out.degenerate, 0);
    }

    #[test]
    fn test_eastward_motion() {
        let out = build_features(&[kept(0.0, 0.0, 0.0, 0), kept(3600.0, 0.0, 0.1, 0)]);
        let r = &out.records[1];

        let expected_km = haversine_km(0.0, 0.0, 0.0, 0.1);
        assert_eq!(r.elapsed_s, Some(3600.0));
        assert!((r.displacement_km.unwrap() - expected_km).abs() < 1e-9);
        assert!((r.implied_speed_knots.unwrap() - expected_km / KM_PER_NM).abs() < 1e-9);
        assert!((r.implied_course.unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(r.speed_knots, 8.0);
        assert_eq!(r.course, 90.0);
    }

    #[test]
    fn test_implied_speed_times_elapsed_is_displacement() {
        let points = vec![
            kept(0.0, 10.0, 10.0, 0),
            kept(900.0, 10.02, 10.01, 0),
            kept(1800.0, 10.05, 10.03, 0),
            kept(180_000.0, 10.05, 10.031, 0),
        ];
        let out = build_features(&points);

        for r in out.records.iter().filter(|r| r.implied_speed_knots.is_some()) {
            let hours = r.elapsed_s.unwrap() / 3600.0;
            let km = r.implied_speed_knots.unwrap() * hours * KM_PER_NM;
            assert!((km - r.displacement_km.unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_segment_start_resets_previous() {
        let out = build_features(&[
            kept(0.0, 0.0, 0.0, 0),
            kept(900.0, 0.0, 0.01, 0),
            kept(90_000.0, 1.0, 1.0, 1),
            kept(90_900.0, 1.0, 1.01, 1),
        ]);

        assert!(out.records[2].elapsed_s.is_none());
        assert!(out.records[2].implied_course.is_none());
        assert_eq!(out.records[3].elapsed_s, Some(900.0));
    }

    #[test]
    fn test_coincident_points_have_null_course() {
        let out = build_features(&[kept(0.0, 5.0, 5.0, 0), kept(900.0, 5.0, 5.0, 0)]);
        let r = &out.records[1];

        assert_eq!(r.displacement_km, Some(0.0));
        assert_eq!(r.implied_speed_knots, Some(0.0));
        assert!(r.implied_course.is_none());
        assert_eq!(out.degenerate, 1);
    }

    #[test]
    fn test_zero_elapsed_has_null_speed() {
        let out = build_features(&[kept(900.0, 5.0, 5.0, 0), kept(900.0, 5.1, 5.0, 0)]);
        let r = &out.records[1];

        assert_eq!(r.elapsed_s, Some(0.0));
        assert!(r.implied_speed_knots.is_none());
        assert!(r.implied_course.is_none());
        assert_eq!(out.degenerate, 1);
    }

    #[test]
    fn test_observed_deltas() {
        let mut a = kept(0.0, 0.0, 0.0, 0);
        let mut b = kept(900.0, 0.0, 0.01, 0);
        a.point.course = 350.0;
        b.point.course = 20.0;
        b.point.speed_knots = 5.0;

        let out = build_features(&[a, b]);
        let r = &out.records[1];
        assert!((r.course_delta.unwrap() - 30.0).abs() < 1e-9);
        assert_eq!(r.speed_delta_knots, Some(-3.0));
    }
}
