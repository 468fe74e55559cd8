//! Altitude along the path.

use std::sync::Arc;

use tracing::info;

use crate::config::TrackConfig;
use crate::error::{Result, TrackError};
use crate::events::{resolve_in_order, resolve_linear, ChangeEvent, EventKind, ResolvedChange};
use crate::lateral::PathKind;
use crate::models::Waypoint;
use crate::profile::LinearProfile;
use crate::velocity::VelocityPath;

/// Altitude profile flown over a velocity path.
///
/// Within a change the climb angle is constant, `α = atan(Δh / d)`, and
/// vertical speed follows ground speed as `tan(α) · v`.
#[derive(Debug, Clone)]
pub struct VerticalPath {
    kind: PathKind,
    velocity: Arc<VelocityPath>,
    initial_altitude: f64,
    changes: Vec<ResolvedChange>,
    profile: LinearProfile,
}

impl VerticalPath {
    pub fn plan(
        velocity: Arc<VelocityPath>,
        initial_altitude_m: f64,
        events: &[ChangeEvent],
        config: &TrackConfig,
    ) -> Result<Self> {
        let altitude: Vec<(usize, &ChangeEvent)> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.kind == EventKind::Altitude)
            .collect();
        let lateral = velocity.lateral().clone();
        let changes = resolve_in_order(&altitude, &lateral, initial_altitude_m, |index, event, in_effect| {
            resolve_linear(index, event, &lateral, &velocity, in_effect)
        })
        .map_err(|(index, source)| TrackError::InvalidEvent { index, source })?;

        Self::build(PathKind::Plan, velocity, initial_altitude_m, changes, config)
    }

    /// Re-map the plan's altitude changes onto a velocity track.
    pub fn track(plan: &VerticalPath, velocity: Arc<VelocityPath>, config: &TrackConfig) -> Result<Self> {
        let changes = remap_changes(&plan.changes, &velocity);
        Self::build(PathKind::Track, velocity, plan.initial_altitude, changes, config)
    }

    fn build(
        kind: PathKind,
        velocity: Arc<VelocityPath>,
        initial_altitude: f64,
        changes: Vec<ResolvedChange>,
        config: &TrackConfig,
    ) -> Result<Self> {
        let profile = LinearProfile::build(
            &changes,
            initial_altitude,
            velocity.lateral().length(),
            config.distance_epsilon_m,
            config.overlap_tolerance_m,
            |first, second| TrackError::AltitudeUnbridgeable { first, second },
        )?;
        info!(kind = ?kind, changes = changes.len(), "vertical path built");
        Ok(Self {
            kind,
            velocity,
            initial_altitude,
            changes,
            profile,
        })
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn changes(&self) -> &[ResolvedChange] {
        &self.changes
    }

    pub fn altitude_at_offset(&self, offset: f64) -> f64 {
        self.profile.value_at_offset(offset)
    }

    pub fn altitude_at(&self, point: &Waypoint) -> f64 {
        self.altitude_at_offset(self.velocity.lateral().offset_of(point))
    }

    /// Climb angle in radians; negative while descending.
    pub fn climb_angle_at_offset(&self, offset: f64) -> f64 {
        self.profile.slope_at_offset(offset).atan()
    }

    pub fn climb_angle_at(&self, point: &Waypoint) -> f64 {
        self.climb_angle_at_offset(self.velocity.lateral().offset_of(point))
    }

    pub fn vertical_speed_at_offset(&self, offset: f64) -> f64 {
        self.profile.slope_at_offset(offset) * self.velocity.speed_at_offset(offset)
    }

    pub fn vertical_speed_at(&self, point: &Waypoint) -> f64 {
        self.vertical_speed_at_offset(self.velocity.lateral().offset_of(point))
    }
}

/// Place resolved changes onto the lateral path under `velocity`.
pub(crate) fn remap_changes(changes: &[ResolvedChange], velocity: &VelocityPath) -> Vec<ResolvedChange> {
    let lateral = velocity.lateral();
    let mut remapped: Vec<ResolvedChange> = changes
        .iter()
        .map(|change| {
            let mut start = lateral.align_to_path(&change.start);
            start.id = change.start.id;
            let mut end = lateral.align_to_path(&change.end);
            end.id = change.end.id;
            ResolvedChange {
                start,
                end,
                start_offset: lateral.offset_of(&start),
                end_offset: lateral.offset_of(&end),
                ..change.clone()
            }
        })
        .collect();
    remapped.sort_by(|a, b| a.start_offset.total_cmp(&b.start_offset).then(a.index.cmp(&b.index)));
    remapped
}
