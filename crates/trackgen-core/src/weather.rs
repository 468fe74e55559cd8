//! Weather along the path: wind speed, visibility and temperature
//! profiles plus clear-air turbulence.
//!
//! Turbulence is a set of short sub-events drawn once, from a seeded RNG,
//! inside every weather change that asks for it. Each sub-event disturbs
//! one axis with a smooth bump shaped by the curve module.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{TrackConfig, WeatherConfig};
use crate::curve;
use crate::error::{Result, TrackError};
use crate::events::{resolve_in_order, resolve_linear, ChangeEvent, EventKind, ResolvedChange, WeatherElement};
use crate::lateral::PathKind;
use crate::models::{TurbulenceSample, Waypoint};
use crate::profile::LinearProfile;
use crate::velocity::VelocityPath;
use crate::vertical::remap_changes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurbulenceAxis {
    Lateral,
    Vertical,
    Longitudinal,
}

impl TurbulenceAxis {
    const ALL: [TurbulenceAxis; 3] = [
        TurbulenceAxis::Lateral,
        TurbulenceAxis::Vertical,
        TurbulenceAxis::Longitudinal,
    ];
}

/// One clear-air-turbulence disturbance.
#[derive(Debug, Clone, PartialEq)]
pub struct TurbulenceEvent {
    pub axis: TurbulenceAxis,
    pub start: Waypoint,
    pub end: Waypoint,
    pub start_offset: f64,
    pub end_offset: f64,
    /// Signed peak deviation reached mid-event
    pub peak: f64,
}

impl TurbulenceEvent {
    /// Deviation at `offset`; zero outside the event.
    pub fn deviation_at(&self, offset: f64, slope_class: u8) -> f64 {
        let span = self.end_offset - self.start_offset;
        if span <= 0.0 || offset < self.start_offset || offset > self.end_offset {
            return 0.0;
        }
        let progress = (offset - self.start_offset) / span;
        let triangle = 1.0 - (2.0 * progress - 1.0).abs();
        self.peak * curve::shape(1.0, triangle, slope_class)
    }
}

/// Weather values at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherConditions {
    pub wind_speed_mps: f64,
    pub visibility_m: f64,
    pub temperature_c: f64,
    pub turbulence: TurbulenceSample,
}

#[derive(Debug, Clone)]
struct ElementProfile {
    initial: f64,
    changes: Vec<ResolvedChange>,
    profile: LinearProfile,
}

#[derive(Debug, Clone)]
pub struct WeatherPath {
    kind: PathKind,
    velocity: Arc<VelocityPath>,
    elements: BTreeMap<WeatherElement, ElementProfile>,
    turbulence: Vec<TurbulenceEvent>,
    cat_slope: u8,
}

fn initial_value(config: &WeatherConfig, element: WeatherElement) -> f64 {
    match element {
        WeatherElement::WindSpeed => config.initial_wind_speed_mps,
        WeatherElement::Visibility => config.initial_visibility_m,
        WeatherElement::Temperature => config.initial_temperature_c,
    }
}

impl WeatherPath {
    pub fn plan(velocity: Arc<VelocityPath>, events: &[ChangeEvent], config: &TrackConfig) -> Result<Self> {
        let lateral = velocity.lateral().clone();
        let mut resolved = BTreeMap::new();
        for element in WeatherElement::ALL {
            let matching: Vec<(usize, &ChangeEvent)> = events
                .iter()
                .enumerate()
                .filter(|(_, event)| event.kind == EventKind::Weather(element))
                .collect();
            let initial = initial_value(&config.weather, element);
            let changes = resolve_in_order(&matching, &lateral, initial, |index, event, in_effect| {
                resolve_linear(index, event, &lateral, &velocity, in_effect)
            })
            .map_err(|(index, source)| TrackError::InvalidEvent { index, source })?;
            resolved.insert(element, (initial, changes));
        }

        let mut rng = StdRng::seed_from_u64(config.weather.turbulence_seed);
        let mut turbulence = Vec::new();
        for (_, changes) in resolved.values() {
            for change in changes {
                if let Some(spec) = change.turbulence {
                    draw_turbulence(&mut rng, change, spec.intensity, &velocity, &config.weather, &mut turbulence);
                }
            }
        }
        turbulence.sort_by(|a, b| a.start_offset.total_cmp(&b.start_offset));
        debug!(sub_events = turbulence.len(), "turbulence drawn");

        Self::build(PathKind::Plan, velocity, resolved, turbulence, config)
    }

    /// Re-map the plan's weather and turbulence onto a velocity track.
    pub fn track(plan: &WeatherPath, velocity: Arc<VelocityPath>, config: &TrackConfig) -> Result<Self> {
        let resolved = plan
            .elements
            .iter()
            .map(|(element, profile)| {
                (*element, (profile.initial, remap_changes(&profile.changes, &velocity)))
            })
            .collect();
        let lateral = velocity.lateral().clone();
        let mut turbulence: Vec<TurbulenceEvent> = plan
            .turbulence
            .iter()
            .map(|event| {
                let start = lateral.align_to_path(&event.start);
                let end = lateral.align_to_path(&event.end);
                TurbulenceEvent {
                    start,
                    end,
                    start_offset: lateral.offset_of(&start),
                    end_offset: lateral.offset_of(&end),
                    ..event.clone()
                }
            })
            .collect();
        turbulence.sort_by(|a, b| a.start_offset.total_cmp(&b.start_offset));
        Self::build(PathKind::Track, velocity, resolved, turbulence, config)
    }

    fn build(
        kind: PathKind,
        velocity: Arc<VelocityPath>,
        resolved: BTreeMap<WeatherElement, (f64, Vec<ResolvedChange>)>,
        turbulence: Vec<TurbulenceEvent>,
        config: &TrackConfig,
    ) -> Result<Self> {
        let length = velocity.lateral().length();
        let mut elements = BTreeMap::new();
        for (element, (initial, changes)) in resolved {
            let profile = LinearProfile::build(
                &changes,
                initial,
                length,
                config.distance_epsilon_m,
                config.overlap_tolerance_m,
                |first, second| TrackError::WeatherUnbridgeable { first, second },
            )?;
            elements.insert(
                element,
                ElementProfile {
                    initial,
                    changes,
                    profile,
                },
            );
        }
        info!(kind = ?kind, turbulence = turbulence.len(), "weather path built");
        Ok(Self {
            kind,
            velocity,
            elements,
            turbulence,
            cat_slope: config.weather.cat_slope,
        })
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn turbulence_events(&self) -> &[TurbulenceEvent] {
        &self.turbulence
    }

    pub fn value_at_offset(&self, element: WeatherElement, offset: f64) -> f64 {
        self.elements
            .get(&element)
            .map(|e| e.profile.value_at_offset(offset))
            .unwrap_or(0.0)
    }

    pub fn value_at(&self, element: WeatherElement, point: &Waypoint) -> f64 {
        self.value_at_offset(element, self.velocity.lateral().offset_of(point))
    }

    /// Rate of change per second at `offset`.
    pub fn rate_at_offset(&self, element: WeatherElement, offset: f64) -> f64 {
        let slope = self
            .elements
            .get(&element)
            .map(|e| e.profile.slope_at_offset(offset))
            .unwrap_or(0.0);
        slope * self.velocity.speed_at_offset(offset)
    }

    pub fn turbulence_at_offset(&self, offset: f64) -> TurbulenceSample {
        let mut sample = TurbulenceSample::default();
        let active = self.turbulence.partition_point(|e| e.start_offset <= offset);
        for event in self.turbulence[..active].iter().filter(|e| e.end_offset >= offset) {
            let deviation = event.deviation_at(offset, self.cat_slope);
            match event.axis {
                TurbulenceAxis::Lateral => sample.lateral += deviation,
                TurbulenceAxis::Vertical => sample.vertical += deviation,
                TurbulenceAxis::Longitudinal => sample.longitudinal += deviation,
            }
        }
        sample
    }

    /// Deviation on one axis at `point`.
    pub fn turbulence_deviation_at(&self, point: &Waypoint, axis: TurbulenceAxis) -> f64 {
        let sample = self.turbulence_at_offset(self.velocity.lateral().offset_of(point));
        match axis {
            TurbulenceAxis::Lateral => sample.lateral,
            TurbulenceAxis::Vertical => sample.vertical,
            TurbulenceAxis::Longitudinal => sample.longitudinal,
        }
    }

    pub fn conditions_at_offset(&self, offset: f64) -> WeatherConditions {
        WeatherConditions {
            wind_speed_mps: self.value_at_offset(WeatherElement::WindSpeed, offset),
            visibility_m: self.value_at_offset(WeatherElement::Visibility, offset),
            temperature_c: self.value_at_offset(WeatherElement::Temperature, offset),
            turbulence: self.turbulence_at_offset(offset),
        }
    }

    pub fn conditions_at(&self, point: &Waypoint) -> WeatherConditions {
        self.conditions_at_offset(self.velocity.lateral().offset_of(point))
    }
}

/// Scatter sub-events through the span of `change`.
fn draw_turbulence(
    rng: &mut StdRng,
    change: &ResolvedChange,
    intensity: f64,
    velocity: &VelocityPath,
    config: &WeatherConfig,
    out: &mut Vec<TurbulenceEvent>,
) {
    if config.cat_spacing_m <= 0.0 || config.cat_length_m <= 0.0 || intensity == 0.0 {
        return;
    }
    let lateral = velocity.lateral();
    let mut cursor = change.start_offset + rng.random_range(0.0..config.cat_spacing_m);
    while cursor + config.cat_length_m <= change.end_offset {
        let axis = TurbulenceAxis::ALL[rng.random_range(0..TurbulenceAxis::ALL.len())];
        let peak = intensity * rng.random_range(-1.0..=1.0);
        let end_offset = cursor + config.cat_length_m;
        out.push(TurbulenceEvent {
            axis,
            start: lateral.position_at(cursor),
            end: lateral.position_at(end_offset),
            start_offset: cursor,
            end_offset,
            peak,
        });
        cursor = end_offset + rng.random_range(0.5 * config.cat_spacing_m..1.5 * config.cat_spacing_m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lateral::LateralPath;
    use crate::spatial::destination;

    fn cruise(length_m: f64, speed: f64) -> Arc<VelocityPath> {
        let config = TrackConfig::default();
        let a = Waypoint::new(-33.9, 151.2);
        let b = destination(&a, length_m, 0.0);
        let lateral = Arc::new(LateralPath::plan(&[a, b], &config).unwrap());
        Arc::new(VelocityPath::plan(lateral, speed, &[], &config).unwrap())
    }

    fn windy(velocity: &VelocityPath) -> Vec<ChangeEvent> {
        let lateral = velocity.lateral();
        vec![
            ChangeEvent::weather(WeatherElement::WindSpeed)
                .starting_at(lateral.position_at(1_000.0))
                .ending_at(lateral.position_at(9_000.0))
                .to_value(20.0)
                .with_turbulence(3.0),
            ChangeEvent::weather(WeatherElement::Temperature)
                .starting_at(lateral.position_at(0.0))
                .to_value(5.0)
                .at_rate(-0.1),
        ]
    }

    #[test]
    fn defaults_hold_without_events() {
        let velocity = cruise(5_000.0, 50.0);
        let weather = WeatherPath::plan(velocity, &[], &TrackConfig::default()).unwrap();
        let here = weather.conditions_at_offset(2_500.0);
        assert_eq!(here.wind_speed_mps, 0.0);
        assert_eq!(here.visibility_m, 10_000.0);
        assert_eq!(here.temperature_c, 15.0);
        assert_eq!(here.turbulence, TurbulenceSample::default());
    }

    #[test]
    fn values_follow_events() {
        let velocity = cruise(12_000.0, 50.0);
        let events = windy(&velocity);
        let weather = WeatherPath::plan(velocity, &events, &TrackConfig::default()).unwrap();
        assert!((weather.value_at_offset(WeatherElement::WindSpeed, 5_000.0) - 10.0).abs() < 1e-6);
        // 10 degrees at 0.1 per second is 100 s, 5 km at 50 m/s
        assert!((weather.value_at_offset(WeatherElement::Temperature, 2_500.0) - 10.0).abs() < 1e-3);
        assert!((weather.value_at_offset(WeatherElement::Temperature, 8_000.0) - 5.0).abs() < 1e-6);
        assert!((weather.rate_at_offset(WeatherElement::Temperature, 2_500.0) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn turbulence_is_seeded_and_bounded() {
        let velocity = cruise(12_000.0, 50.0);
        let events = windy(&velocity);
        let config = TrackConfig::default();
        let first = WeatherPath::plan(velocity.clone(), &events, &config).unwrap();
        let second = WeatherPath::plan(velocity, &events, &config).unwrap();

        assert!(!first.turbulence_events().is_empty());
        assert_eq!(first.turbulence_events(), second.turbulence_events());
        for event in first.turbulence_events() {
            assert!(event.start_offset >= 1_000.0 - 1e-6);
            assert!(event.end_offset <= 9_000.0 + 1e-6);
            assert!(event.peak.abs() <= 3.0);
            assert_eq!(event.deviation_at(event.start_offset, config.weather.cat_slope), 0.0);
            let mid = 0.5 * (event.start_offset + event.end_offset);
            assert!((event.deviation_at(mid, config.weather.cat_slope) - event.peak).abs() < 1e-9);
        }
        let outside = first.turbulence_at_offset(10_500.0);
        assert_eq!(outside, TurbulenceSample::default());

        let event = &first.turbulence_events()[0];
        let mid = 0.5 * (event.start_offset + event.end_offset);
        let point = first.velocity.lateral().position_at(mid);
        let expected = first.turbulence_at_offset(mid);
        let deviation = first.turbulence_deviation_at(&point, event.axis);
        let on_axis = match event.axis {
            TurbulenceAxis::Lateral => expected.lateral,
            TurbulenceAxis::Vertical => expected.vertical,
            TurbulenceAxis::Longitudinal => expected.longitudinal,
        };
        assert!((deviation - on_axis).abs() < 1e-6);
    }
}
