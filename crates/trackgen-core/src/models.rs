//! Core data models shared by the path engine and its consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spatial;

/// A geographic point on a plan or track.
///
/// Geometry compares coordinates; `id` is only carried through so authored
/// waypoints can be traced back to their plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

impl Waypoint {
    /// Create an anonymous waypoint.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, id: None }
    }

    /// Create a waypoint carrying a plan identifier.
    pub fn with_id(id: u32, lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            id: Some(id),
        }
    }

    /// Great-circle distance to another waypoint in meters.
    pub fn distance_to(&self, other: &Waypoint) -> f64 {
        spatial::distance(self, other)
    }

    /// True when both waypoints sit within `tolerance_m` of each other.
    pub fn coincides(&self, other: &Waypoint, tolerance_m: f64) -> bool {
        self.distance_to(other) <= tolerance_m
    }
}

/// A named run of waypoints, e.g. "taxi-out" or "departure".
///
/// Sections are concatenated in order to form the lateral plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSection {
    pub name: String,
    pub waypoints: Vec<Waypoint>,
}

/// Turbulence deviation per axis at a sampled instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurbulenceSample {
    pub lateral: f64,
    pub vertical: f64,
    pub longitudinal: f64,
}

/// One time-stamped trajectory sample emitted by a sampling worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the start of the track
    pub elapsed_s: f64,
    pub timestamp: DateTime<Utc>,
    pub position: Waypoint,
    /// Distance along the lateral track from its start
    pub distance_m: f64,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub altitude_m: f64,
    pub climb_angle_rad: f64,
    pub vertical_speed_mps: f64,
    pub wind_speed_mps: f64,
    pub visibility_m: f64,
    pub temperature_c: f64,
    #[serde(default)]
    pub turbulence: TurbulenceSample,
}
