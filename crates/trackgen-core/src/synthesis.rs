//! Plan to track synthesis pipeline.
//!
//! Order matters: turns are sized from the velocity plan, the velocity
//! track is re-mapped onto the turned lateral track, and altitude and
//! weather are timed by the velocity track.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::config::TrackConfig;
use crate::error::Result;
use crate::events::ChangeEvent;
use crate::lateral::LateralPath;
use crate::models::{PlanSection, Sample};
use crate::velocity::VelocityPath;
use crate::vertical::VerticalPath;
use crate::weather::WeatherPath;

/// Everything needed to synthesize one trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    #[serde(default)]
    pub name: String,
    pub sections: Vec<PlanSection>,
    #[serde(default)]
    pub events: Vec<ChangeEvent>,
    pub initial_speed_mps: f64,
    #[serde(default)]
    pub initial_altitude_m: f64,
    /// Wall-clock time at elapsed zero
    #[serde(default)]
    pub departure: DateTime<Utc>,
}

/// Plans and tracks for every dimension, shared read-only between
/// sampling workers.
#[derive(Debug, Clone)]
pub struct TrackSet {
    pub lateral_plan: Arc<LateralPath>,
    pub lateral_track: Arc<LateralPath>,
    pub velocity_plan: Arc<VelocityPath>,
    pub velocity_track: Arc<VelocityPath>,
    pub vertical_plan: Arc<VerticalPath>,
    pub vertical_track: Arc<VerticalPath>,
    pub weather_plan: Arc<WeatherPath>,
    pub weather_track: Arc<WeatherPath>,
    pub departure: DateTime<Utc>,
}

impl TrackSet {
    /// Seconds from the start to the end of the track.
    pub fn duration(&self) -> f64 {
        self.velocity_track.duration()
    }

    /// State of the vehicle `elapsed_s` seconds after departure.
    pub fn sample_at(&self, elapsed_s: f64) -> Sample {
        let offset = self.velocity_track.distance_at_time(elapsed_s);
        let weather = self.weather_track.conditions_at_offset(offset);
        let millis = (elapsed_s * 1_000.0).round() as i64;
        Sample {
            elapsed_s,
            timestamp: self.departure + TimeDelta::milliseconds(millis),
            position: self.lateral_track.position_at(offset),
            distance_m: offset,
            heading_deg: self.lateral_track.course_at_offset(offset),
            speed_mps: self.velocity_track.speed_at_offset(offset),
            altitude_m: self.vertical_track.altitude_at_offset(offset),
            climb_angle_rad: self.vertical_track.climb_angle_at_offset(offset),
            vertical_speed_mps: self.vertical_track.vertical_speed_at_offset(offset),
            wind_speed_mps: weather.wind_speed_mps,
            visibility_m: weather.visibility_m,
            temperature_c: weather.temperature_c,
            turbulence: weather.turbulence,
        }
    }
}

/// Build every plan and track for `input`.
pub fn synthesize(input: &PlanInput, config: &TrackConfig) -> Result<TrackSet> {
    let _span = info_span!("synthesize", name = %input.name).entered();
    let lateral_plan = Arc::new(LateralPath::from_sections(&input.sections, config)?);
    info!(
        name = %input.name,
        segments = lateral_plan.segments().len(),
        length_m = lateral_plan.length(),
        "lateral plan built"
    );

    let velocity_plan = Arc::new(VelocityPath::plan(
        lateral_plan.clone(),
        input.initial_speed_mps,
        &input.events,
        config,
    )?);
    let lateral_track = Arc::new(LateralPath::track(&lateral_plan, &velocity_plan, config)?);
    let velocity_track = Arc::new(VelocityPath::track(&velocity_plan, lateral_track.clone(), config)?);

    let vertical_plan = Arc::new(VerticalPath::plan(
        velocity_plan.clone(),
        input.initial_altitude_m,
        &input.events,
        config,
    )?);
    let vertical_track = Arc::new(VerticalPath::track(&vertical_plan, velocity_track.clone(), config)?);

    let weather_plan = Arc::new(WeatherPath::plan(velocity_plan.clone(), &input.events, config)?);
    let weather_track = Arc::new(WeatherPath::track(&weather_plan, velocity_track.clone(), config)?);

    info!(
        name = %input.name,
        track_length_m = lateral_track.length(),
        duration_s = velocity_track.duration(),
        "track synthesized"
    );

    Ok(TrackSet {
        lateral_plan,
        lateral_track,
        velocity_plan,
        velocity_track,
        vertical_plan,
        vertical_track,
        weather_plan,
        weather_track,
        departure: input.departure,
    })
}
