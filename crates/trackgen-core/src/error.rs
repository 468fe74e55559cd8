//! Error types for plan and track synthesis.

use thiserror::Error;

/// Reasons a change event cannot be resolved into a segment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("only {known} of 5 fields are known or resolvable, need at least 4")]
    UnderSpecified { known: usize },

    #[error("no feasible value: {0}")]
    Infeasible(&'static str),

    #[error("end point lies {distance_m:.1} m before the start point")]
    Reversed { distance_m: f64 },
}

/// Failures surfaced by plan/track synthesis and validation.
///
/// Geometry and kinematics problems are repaired locally where a repair
/// exists; these variants are what remains when none does.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    #[error("a lateral plan needs at least two distinct waypoints, got {0}")]
    TooFewWaypoints(usize),

    #[error("turns can only be inserted into a lateral plan")]
    NotAPlan,

    #[error("no unique intersection for the turn at junction {junction}")]
    AmbiguousIntersection { junction: usize },

    #[error("turns around segment {segment} curve the same direction and overlap")]
    SameDirectionTurns { segment: usize },

    #[error("turns around segment {segment} overlap and have no common tangent")]
    NoCommonTangent { segment: usize },

    #[error("turn at junction {junction} extends past the end of the path")]
    TurnExceedsPath { junction: usize },

    #[error("turn segment {index} has no radius or curves away from its apex")]
    InconsistentTurn { index: usize },

    #[error("gap of {gap_m:.6} m after segment {index}")]
    Discontinuity { index: usize, gap_m: f64 },

    #[error("event {index} is invalid: {source}")]
    InvalidEvent {
        index: usize,
        #[source]
        source: EventError,
    },

    #[error("velocity segments {first} and {second} cannot be bridged")]
    VelocityUnbridgeable { first: usize, second: usize },

    #[error("altitude segments {first} and {second} cannot be bridged")]
    AltitudeUnbridgeable { first: usize, second: usize },

    #[error("weather segments {first} and {second} cannot be bridged")]
    WeatherUnbridgeable { first: usize, second: usize },

    #[error("velocity segment {index} has no speed over {distance_m:.1} m")]
    StalledSegment { index: usize, distance_m: f64 },

    #[error("sampling window {window} failed: {reason}")]
    Window { window: usize, reason: String },

    #[error("invalid sampling setup: {0}")]
    Sampling(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;
