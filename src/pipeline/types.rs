//! Typed records handed between pipeline stages.
//!
//! Every stage takes its input by value or reference and builds fresh output
//! records; nothing is mutated after it has been passed on.

use serde::Serialize;

/// One validated raw position report.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub id: String,
    /// Unix seconds.
    pub timestamp: f64,
    pub lat: f64,
    pub lon: f64,
    pub speed_knots: f64,
    pub course: f64,
    pub distance_from_shore_km: f64,
}

/// All observations for one identifier, ascending by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub observations: Vec<RawObservation>,
}

/// A resampled point: on the global sampling grid, or a carried segment start
/// or track end.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledPoint {
    pub id: String,
    pub timestamp: f64,
    pub lat: f64,
    pub lon: f64,
    pub speed_knots: f64,
    pub course: f64,
    pub distance_from_shore_km: f64,
    pub segment_id: u32,
}

/// A resampled point that survived stationary trimming.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedPoint {
    pub point: ResampledPoint,
    /// First or last point of a collapsed stationary run.
    pub is_stationary_boundary: bool,
}

/// Terminal record handed to the sink.
///
/// The `Option` features are `None` for the first point of a segment, and for
/// implied speed/course when they are numerically undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub id: String,
    pub timestamp: f64,
    pub lat: f64,
    pub lon: f64,
    pub speed_knots: f64,
    pub course: f64,
    pub distance_from_shore_km: f64,
    pub segment_id: u32,

    // derived
    pub elapsed_s: Option<f64>,
    pub displacement_km: Option<f64>,
    pub implied_speed_knots: Option<f64>,
    pub implied_course: Option<f64>,
    pub speed_delta_knots: Option<f64>,
    pub course_delta: Option<f64>,
}
