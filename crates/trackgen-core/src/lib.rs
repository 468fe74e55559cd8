pub mod config;
pub mod curve;
pub mod error;
pub mod events;
pub mod lateral;
pub mod models;
pub mod partition;
pub mod profile;
pub mod segment;
pub mod spatial;
pub mod synthesis;
pub mod velocity;
pub mod vertical;
pub mod weather;

pub use config::{SpeedBreakpoint, SpeedSchedule, TrackConfig, WeatherConfig, MPS_PER_KNOT};
pub use error::{EventError, Result, TrackError};
pub use events::{ChangeEvent, EventKind, ResolvedChange, TurbulenceSpec, WeatherElement};
pub use lateral::{LateralPath, PathKind};
pub use models::{PlanSection, Sample, TurbulenceSample, Waypoint};
pub use partition::{partition, sample_parallel, sample_window, TimeWindow};
pub use segment::{PathSegment, StraightSegment, TurnDirection, TurnSegment};
pub use spatial::haversine_distance;
pub use synthesis::{synthesize, PlanInput, TrackSet};
pub use velocity::{VelocityPath, VelocitySegment, VelocitySegmentKind};
pub use vertical::VerticalPath;
pub use weather::{TurbulenceAxis, TurbulenceEvent, WeatherConditions, WeatherPath};
