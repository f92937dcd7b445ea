//! Grouper: partitions an interleaved observation stream into per-identifier
//! tracks.

use std::collections::HashMap;

use crate::pipeline::types::{RawObservation, Track};

/// Groups observations by identifier.
///
/// Each track is stably sorted by timestamp, so arrival order across
/// identifiers does not matter. Tracks come back sorted by identifier.
pub fn group_by_id<I>(observations: I) -> Vec<Track>
where
    I: IntoIterator<Item = RawObservation>,
{
    let mut by_id: HashMap<String, Vec<RawObservation>> = HashMap::new();

    for obs in observations {
        by_id.entry(obs.id.clone()).or_default().push(obs);
    }

    let mut tracks: Vec<Track> = by_id
        .into_iter()
        .map(|(id, mut observations)| {
            observations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
            Track { id, observations }
        })
        .collect();

    tracks.sort_by(|a, b| a.id.cmp(&b.id));
    tracks
}

/// Collapses observations that share a timestamp, keeping the last one.
///
/// Returns the deduplicated observations and how many were dropped.
pub fn dedup_timestamps(observations: &[RawObservation]) -> (Vec<RawObservation>, usize) {
    let mut out: Vec<RawObservation> = Vec::with_capacity(observations.len());
    let mut dropped = 0;

    for obs in observations {
        match out.last_mut() {
            Some(last) if last.timestamp == obs.timestamp => {
                *last = obs.clone();
                dropped += 1;
            }
            _ => out.push(obs.clone()),
        }
    }

    (out, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: &str, timestamp: f64) -> RawObservation {
        RawObservation {
            id: id.to_string(),
            timestamp,
            lat: 0.0,
            lon: 0.0,
            speed_knots: 0.0,
            course: 0.0,
            distance_from_shore_km: 0.0,
        }
    }

    #[test]
    fn test_group_interleaved_ids() {
        let input = vec![
            obs("B", 10.0),
            obs("A", 5.0),
            obs("B", 20.0),
            obs("A", 15.0),
            obs("C", 1.0),
        ];

        let tracks = group_by_id(input);

        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[0].id, "A");
        assert_eq!(tracks[1].id, "B");
        assert_eq!(tracks[2].id, "C");
        assert_eq!(tracks[0].observations.len(), 2);
        assert_eq!(tracks[1].observations.len(), 2);
        assert!(tracks.iter().all(|t| t.observations.iter().all(|o| o.id == t.id)));
    }

    #[test]
    fn test_group_sorts_each_track() {
        let tracks = group_by_id(vec![obs("A", 30.0), obs("A", 10.0), obs("A", 20.0)]);
        let times: Vec<f64> = tracks[0].observations.iter().map(|o| o.timestamp).collect();
        assert_eq!(times, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_group_empty_input() {
        assert!(group_by_id(Vec::new()).is_empty());
    }

    #[test]
    fn test_dedup_keeps_last_duplicate() {
        let mut second = obs("A", 10.0);
        second.speed_knots = 7.0;
        let input = vec![obs("A", 0.0), obs("A", 10.0), second, obs("A", 20.0)];

        let (out, dropped) = dedup_timestamps(&input);

        assert_eq!(dropped, 1);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].speed_knots, 7.0);
    }
}
