//! Tunable physical and behavioural constants for synthesis.
//!
//! Built once by the caller and passed by reference into every builder.

use serde::{Deserialize, Serialize};

use crate::segment::TurnDirection;

/// Meters per second in one knot.
pub const MPS_PER_KNOT: f64 = 0.514_444;

/// Configuration for plan-to-track synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Standard gravity used for turn radius
    pub gravity_mps2: f64,
    /// Course differences at or below this are treated as straight
    pub course_epsilon_deg: f64,
    /// Path distances below this magnitude snap to zero
    pub distance_epsilon_m: f64,
    /// Maximum gap allowed between consecutive segments of a validated path
    pub continuity_tolerance_m: f64,
    /// Kinematic overlaps larger than this are repaired with a bridge
    pub overlap_tolerance_m: f64,
    /// Below this approach speed turns use ground-maneuvering geometry
    pub taxi_speed_threshold_mps: f64,
    /// Turn radius for ground turns without authored turn points
    pub taxi_turn_radius_m: f64,
    /// A downstream segment no longer than this is read as a ground turn chord
    pub taxi_chord_max_m: f64,
    /// Intersection apex must lie within this multiple of the chord length
    pub taxi_apex_bound_factor: f64,
    /// Bank angle (degrees) by airspeed
    pub bank_angle_schedule: SpeedSchedule,
    /// Roll rate (degrees per second) by airspeed
    pub roll_rate_schedule: SpeedSchedule,
    /// Floor for a bank angle reduced to fit a short turn leg
    pub min_bank_angle_deg: f64,
    /// Slope class of the roll-in curve
    pub roll_in_slope: u8,
    /// Direction flown for an exact course reversal
    pub u_turn_direction: TurnDirection,
    pub weather: WeatherConfig,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            gravity_mps2: 9.80665,
            course_epsilon_deg: 0.1,
            distance_epsilon_m: 1e-4,
            continuity_tolerance_m: 1e-6,
            overlap_tolerance_m: 1.0,
            taxi_speed_threshold_mps: 25.0 * MPS_PER_KNOT,
            taxi_turn_radius_m: 25.0,
            taxi_chord_max_m: 60.0,
            taxi_apex_bound_factor: 2.0,
            bank_angle_schedule: SpeedSchedule::new(vec![
                SpeedBreakpoint { speed_kts: 0.0, value: 10.0 },
                SpeedBreakpoint { speed_kts: 60.0, value: 15.0 },
                SpeedBreakpoint { speed_kts: 120.0, value: 25.0 },
                SpeedBreakpoint { speed_kts: 250.0, value: 25.0 },
                SpeedBreakpoint { speed_kts: 350.0, value: 30.0 },
            ]),
            roll_rate_schedule: SpeedSchedule::new(vec![
                SpeedBreakpoint { speed_kts: 0.0, value: 6.0 },
                SpeedBreakpoint { speed_kts: 120.0, value: 5.0 },
                SpeedBreakpoint { speed_kts: 250.0, value: 3.0 },
            ]),
            min_bank_angle_deg: 3.0,
            roll_in_slope: 25,
            u_turn_direction: TurnDirection::Right,
            weather: WeatherConfig::default(),
        }
    }
}

impl TrackConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Bank angle in degrees for a ground speed in m/s.
    pub fn bank_angle_deg(&self, speed_mps: f64) -> f64 {
        self.bank_angle_schedule.lookup(speed_mps / MPS_PER_KNOT)
    }

    /// Roll rate in degrees per second for a ground speed in m/s.
    pub fn roll_rate_dps(&self, speed_mps: f64) -> f64 {
        self.roll_rate_schedule.lookup(speed_mps / MPS_PER_KNOT)
    }
}

/// Initial weather and turbulence generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub initial_wind_speed_mps: f64,
    pub initial_visibility_m: f64,
    pub initial_temperature_c: f64,
    /// Seed for clear-air-turbulence sub-events; same seed, same track
    pub turbulence_seed: u64,
    /// Mean spacing between turbulence sub-events along the path
    pub cat_spacing_m: f64,
    /// Length of one turbulence sub-event
    pub cat_length_m: f64,
    /// Slope class of the turbulence bump
    pub cat_slope: u8,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            initial_wind_speed_mps: 0.0,
            initial_visibility_m: 10_000.0,
            initial_temperature_c: 15.0,
            turbulence_seed: 0x5eed,
            cat_spacing_m: 400.0,
            cat_length_m: 150.0,
            cat_slope: 20,
        }
    }
}

/// One row of a speed-indexed table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeedBreakpoint {
    pub speed_kts: f64,
    pub value: f64,
}

/// Piecewise-linear table keyed by speed in knots, clamped at both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedSchedule {
    pub breakpoints: Vec<SpeedBreakpoint>,
}

impl SpeedSchedule {
    pub fn new(mut breakpoints: Vec<SpeedBreakpoint>) -> Self {
        breakpoints.sort_by(|a, b| a.speed_kts.total_cmp(&b.speed_kts));
        Self { breakpoints }
    }

    pub fn lookup(&self, speed_kts: f64) -> f64 {
        let Some(first) = self.breakpoints.first() else {
            return 0.0;
        };
        if speed_kts <= first.speed_kts {
            return first.value;
        }
        for pair in self.breakpoints.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if speed_kts <= hi.speed_kts {
                let span = hi.speed_kts - lo.speed_kts;
                if span <= f64::EPSILON {
                    return hi.value;
                }
                let t = (speed_kts - lo.speed_kts) / span;
                return lo.value + t * (hi.value - lo.value);
            }
        }
        self.breakpoints.last().map(|b| b.value).unwrap_or(first.value)
    }
}
