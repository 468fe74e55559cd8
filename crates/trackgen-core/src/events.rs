//! Change events and their resolution into fully specified changes.
//!
//! An event carries up to five fields: start point, end point, initial
//! value, final value and rate. Any single missing field is inferred from
//! the other four under the law governing the event's quantity.

use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::lateral::LateralPath;
use crate::models::Waypoint;
use crate::velocity::VelocityPath;

/// Slack allowed when a derived end point lands on the path end.
const PATH_OVERRUN_M: f64 = 1e-3;

/// Weather quantity changed by a weather event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherElement {
    WindSpeed,
    Visibility,
    Temperature,
}

impl WeatherElement {
    pub const ALL: [WeatherElement; 3] = [
        WeatherElement::WindSpeed,
        WeatherElement::Visibility,
        WeatherElement::Temperature,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Rate is an acceleration in m/s²
    Airspeed,
    /// Rate is a vertical speed in m/s
    Altitude,
    /// Rate is a change per second
    Weather(WeatherElement),
}

/// Turbulence requested on a weather event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurbulenceSpec {
    /// Peak deviation of a single sub-event
    pub intensity: f64,
}

/// A sparse, possibly under-specified change event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub id: Option<u32>,
    pub kind: EventKind,
    #[serde(default)]
    pub start: Option<Waypoint>,
    #[serde(default)]
    pub end: Option<Waypoint>,
    #[serde(default)]
    pub initial: Option<f64>,
    #[serde(default, rename = "final")]
    pub final_value: Option<f64>,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub turbulence: Option<TurbulenceSpec>,
}

impl ChangeEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: None,
            kind,
            start: None,
            end: None,
            initial: None,
            final_value: None,
            rate: None,
            turbulence: None,
        }
    }

    pub fn airspeed() -> Self {
        Self::new(EventKind::Airspeed)
    }

    pub fn altitude() -> Self {
        Self::new(EventKind::Altitude)
    }

    pub fn weather(element: WeatherElement) -> Self {
        Self::new(EventKind::Weather(element))
    }

    pub fn starting_at(mut self, point: Waypoint) -> Self {
        self.start = Some(point);
        self
    }

    pub fn ending_at(mut self, point: Waypoint) -> Self {
        self.end = Some(point);
        self
    }

    pub fn from_value(mut self, value: f64) -> Self {
        self.initial = Some(value);
        self
    }

    pub fn to_value(mut self, value: f64) -> Self {
        self.final_value = Some(value);
        self
    }

    pub fn at_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_turbulence(mut self, intensity: f64) -> Self {
        self.turbulence = Some(TurbulenceSpec { intensity });
        self
    }

    /// Number of the five fields that are set.
    pub fn known_fields(&self) -> usize {
        [
            self.start.is_some(),
            self.end.is_some(),
            self.initial.is_some(),
            self.final_value.is_some(),
            self.rate.is_some(),
        ]
        .into_iter()
        .filter(|known| *known)
        .count()
    }

    /// Path offset used to order events before resolution.
    pub fn anchor_offset(&self, path: &LateralPath) -> Option<f64> {
        self.start
            .or(self.end)
            .map(|point| path.offset_of(&point))
    }
}

/// A change with every field resolved and both ends placed on the path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChange {
    /// Position of the source event in the caller's event list
    pub index: usize,
    pub start: Waypoint,
    pub end: Waypoint,
    pub start_offset: f64,
    pub end_offset: f64,
    pub initial: f64,
    pub final_value: f64,
    pub rate: f64,
    pub turbulence: Option<TurbulenceSpec>,
}

impl ResolvedChange {
    pub fn distance(&self) -> f64 {
        self.end_offset - self.start_offset
    }
}

/// Fill a missing initial value from the value in effect, when that is what
/// brings the event up to four known fields.
fn with_value_in_effect(event: &ChangeEvent, in_effect: f64) -> Result<ChangeEvent, EventError> {
    let mut event = event.clone();
    let mut known = event.known_fields();
    if known < 4 && event.initial.is_none() {
        event.initial = Some(in_effect);
        known += 1;
    }
    if known < 4 {
        return Err(EventError::UnderSpecified { known });
    }
    Ok(event)
}

/// Resolve an airspeed event under constant acceleration:
/// `v_f² = v_i² + 2·a·d`.
pub fn resolve_airspeed(
    index: usize,
    event: &ChangeEvent,
    path: &LateralPath,
    speed_in_effect: f64,
) -> Result<ResolvedChange, EventError> {
    let event = with_value_in_effect(event, speed_in_effect)?;
    let start = event.start.map(|p| path.align_to_path(&p));
    let end = event.end.map(|p| path.align_to_path(&p));

    let (start, end, initial, final_value) = match (start, end, event.initial, event.final_value, event.rate) {
        (Some(start), Some(end), Some(vi), Some(vf), _) => (start, end, vi, vf),
        (Some(start), None, Some(vi), Some(vf), Some(a)) => {
            let d = kinematic_distance(vi, vf, a)?;
            (start, point_within_path(path, &start, d)?, vi, vf)
        }
        (None, Some(end), Some(vi), Some(vf), Some(a)) => {
            let d = kinematic_distance(vi, vf, a)?;
            (point_within_path(path, &end, -d)?, end, vi, vf)
        }
        (Some(start), Some(end), None, Some(vf), Some(a)) => {
            let d = path.path_distance(&start, &end);
            let vi_sq = vf * vf - 2.0 * a * d;
            if vi_sq < 0.0 {
                return Err(EventError::Infeasible("initial speed would be imaginary"));
            }
            (start, end, vi_sq.sqrt(), vf)
        }
        (Some(start), Some(end), Some(vi), None, Some(a)) => {
            let d = path.path_distance(&start, &end);
            let vf_sq = vi * vi + 2.0 * a * d;
            if vf_sq < 0.0 {
                return Err(EventError::Infeasible("vehicle stops before the end point"));
            }
            (start, end, vi, vf_sq.sqrt())
        }
        _ => {
            return Err(EventError::UnderSpecified {
                known: event.known_fields(),
            })
        }
    };

    if initial < 0.0 || final_value < 0.0 {
        return Err(EventError::Infeasible("negative speed"));
    }

    let start_offset = path.offset_of(&start);
    let end_offset = path.offset_of(&end);
    let distance = end_offset - start_offset;
    if distance < 0.0 {
        return Err(EventError::Reversed {
            distance_m: -distance,
        });
    }
    let rate = if distance > 1e-9 {
        (final_value * final_value - initial * initial) / (2.0 * distance)
    } else if (final_value - initial).abs() <= 1e-9 {
        0.0
    } else {
        return Err(EventError::Infeasible("speed change over zero distance"));
    };

    Ok(ResolvedChange {
        index,
        start: keep_id(start, event.start),
        end: keep_id(end, event.end),
        start_offset,
        end_offset,
        initial,
        final_value,
        rate,
        turbulence: event.turbulence,
    })
}

/// Point `distance_m` along `path` from `from`, refusing to clamp at
/// either end.
fn point_within_path(path: &LateralPath, from: &Waypoint, distance_m: f64) -> Result<Waypoint, EventError> {
    let target = path.offset_of(from) + distance_m;
    if target > path.length() + PATH_OVERRUN_M {
        return Err(EventError::Infeasible("change runs past the end of the path"));
    }
    if target < -PATH_OVERRUN_M {
        return Err(EventError::Infeasible("change starts before the path"));
    }
    Ok(path.point_at_distance(from, distance_m))
}

fn kinematic_distance(vi: f64, vf: f64, a: f64) -> Result<f64, EventError> {
    if a.abs() <= 1e-12 {
        return Err(EventError::Infeasible("zero acceleration implies no distance"));
    }
    let d = (vf * vf - vi * vi) / (2.0 * a);
    if d < 0.0 {
        return Err(EventError::Infeasible(
            "acceleration sign disagrees with the speed change",
        ));
    }
    Ok(d)
}

/// Resolve an event whose value changes at a steady rate per second of
/// flight (altitude, weather). Time comes from `velocity`, which must be
/// flown over `path`.
pub fn resolve_linear(
    index: usize,
    event: &ChangeEvent,
    path: &LateralPath,
    velocity: &VelocityPath,
    value_in_effect: f64,
) -> Result<ResolvedChange, EventError> {
    let event = with_value_in_effect(event, value_in_effect)?;
    let start = event.start.map(|p| path.align_to_path(&p));
    let end = event.end.map(|p| path.align_to_path(&p));

    let (start, end, initial, final_value) = match (start, end, event.initial, event.final_value, event.rate) {
        (Some(start), Some(end), Some(vi), Some(vf), _) => (start, end, vi, vf),
        (Some(start), None, Some(vi), Some(vf), Some(rate)) => {
            let seconds = change_duration(vi, vf, rate)?;
            let arrival = velocity.time_at(&start) + seconds;
            if arrival > velocity.duration() + 1e-6 {
                return Err(EventError::Infeasible("change runs past the end of the path"));
            }
            (start, path.position_at(velocity.distance_at_time(arrival)), vi, vf)
        }
        (None, Some(end), Some(vi), Some(vf), Some(rate)) => {
            let seconds = change_duration(vi, vf, rate)?;
            let departure = velocity.time_at(&end) - seconds;
            if departure < -1e-6 {
                return Err(EventError::Infeasible("change starts before the path"));
            }
            let departure = departure.max(0.0);
            (path.position_at(velocity.distance_at_time(departure)), end, vi, vf)
        }
        (Some(start), Some(end), None, Some(vf), Some(rate)) => {
            let seconds = velocity.time_at(&end) - velocity.time_at(&start);
            (start, end, vf - rate * seconds, vf)
        }
        (Some(start), Some(end), Some(vi), None, Some(rate)) => {
            let seconds = velocity.time_at(&end) - velocity.time_at(&start);
            (start, end, vi, vi + rate * seconds)
        }
        _ => {
            return Err(EventError::UnderSpecified {
                known: event.known_fields(),
            })
        }
    };

    let start_offset = path.offset_of(&start);
    let end_offset = path.offset_of(&end);
    if end_offset < start_offset {
        return Err(EventError::Reversed {
            distance_m: start_offset - end_offset,
        });
    }
    let seconds = velocity.time_at_offset(end_offset) - velocity.time_at_offset(start_offset);
    let rate = if seconds > 1e-9 {
        (final_value - initial) / seconds
    } else if (final_value - initial).abs() <= 1e-9 {
        0.0
    } else {
        return Err(EventError::Infeasible("value change over zero time"));
    };

    Ok(ResolvedChange {
        index,
        start: keep_id(start, event.start),
        end: keep_id(end, event.end),
        start_offset,
        end_offset,
        initial,
        final_value,
        rate,
        turbulence: event.turbulence,
    })
}

fn change_duration(vi: f64, vf: f64, rate: f64) -> Result<f64, EventError> {
    let change = vf - vi;
    if change.abs() <= 1e-12 {
        return Err(EventError::Infeasible("no change implies no duration"));
    }
    if rate.abs() <= 1e-12 {
        return Err(EventError::Infeasible("zero rate never completes the change"));
    }
    Ok(change.abs() / rate.abs())
}

fn keep_id(mut point: Waypoint, source: Option<Waypoint>) -> Waypoint {
    if let Some(source) = source {
        point.id = source.id;
    }
    point
}

/// Resolve events one after another in path order, each inheriting the
/// value left in effect by the previous one.
pub(crate) fn resolve_in_order<F>(
    events: &[(usize, &ChangeEvent)],
    path: &LateralPath,
    initial_value: f64,
    mut resolve: F,
) -> Result<Vec<ResolvedChange>, (usize, EventError)>
where
    F: FnMut(usize, &ChangeEvent, f64) -> Result<ResolvedChange, EventError>,
{
    let mut ordered: Vec<(f64, usize, &ChangeEvent)> = Vec::with_capacity(events.len());
    for (index, event) in events {
        let Some(anchor) = event.anchor_offset(path) else {
            return Err((
                *index,
                EventError::UnderSpecified {
                    known: event.known_fields(),
                },
            ));
        };
        ordered.push((anchor, *index, event));
    }
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut in_effect = initial_value;
    let mut resolved = Vec::with_capacity(ordered.len());
    for (_, index, event) in ordered {
        let change = resolve(index, event, in_effect).map_err(|err| (index, err))?;
        in_effect = change.final_value;
        resolved.push(change);
    }
    resolved.sort_by(|a, b| a.start_offset.total_cmp(&b.start_offset).then(a.index.cmp(&b.index)));
    Ok(resolved)
}
