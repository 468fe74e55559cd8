//! Speed along a lateral path.
//!
//! A velocity path is a contiguous run of constant-acceleration segments
//! laid over path offsets: authored changes, cruise fillers between them,
//! and bridges inserted where two changes overlap. Within a segment
//! `v(d) = sqrt(v_i² + 2·a·d)` and the time to cover `d` is
//! `2·d / (v_i + v(d))`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::TrackConfig;
use crate::error::{Result, TrackError};
use crate::events::{resolve_airspeed, resolve_in_order, ChangeEvent, EventKind, ResolvedChange};
use crate::lateral::{LateralPath, PathKind};
use crate::models::Waypoint;

/// Accelerations below this magnitude are treated as constant speed.
const ACCELERATION_EPSILON: f64 = 1e-12;
/// Speed slack allowed when checking a transition against a segment's range.
const SPEED_TOLERANCE_MPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocitySegmentKind {
    /// Constant speed between authored changes
    Cruise,
    /// An authored speed change
    Change,
    /// Constant speed joining two changes that overlapped
    Bridge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySegment {
    pub kind: VelocitySegmentKind,
    /// Source event for `Change` segments
    pub event: Option<usize>,
    pub start: Waypoint,
    pub end: Waypoint,
    pub start_offset: f64,
    pub end_offset: f64,
    pub initial_speed: f64,
    pub final_speed: f64,
    pub acceleration: f64,
}

impl VelocitySegment {
    fn constant(kind: VelocitySegmentKind, start_offset: f64, end_offset: f64, speed: f64) -> Self {
        Self {
            kind,
            event: None,
            start: Waypoint::new(0.0, 0.0),
            end: Waypoint::new(0.0, 0.0),
            start_offset,
            end_offset,
            initial_speed: speed,
            final_speed: speed,
            acceleration: 0.0,
        }
    }

    fn cruise(start_offset: f64, end_offset: f64, speed: f64) -> Self {
        Self::constant(VelocitySegmentKind::Cruise, start_offset, end_offset, speed)
    }

    fn bridge(start_offset: f64, end_offset: f64, speed: f64) -> Self {
        Self::constant(VelocitySegmentKind::Bridge, start_offset, end_offset, speed)
    }

    fn change(
        event: Option<usize>,
        start_offset: f64,
        end_offset: f64,
        initial_speed: f64,
        final_speed: f64,
    ) -> Self {
        Self {
            kind: VelocitySegmentKind::Change,
            event,
            start: Waypoint::new(0.0, 0.0),
            end: Waypoint::new(0.0, 0.0),
            start_offset,
            end_offset,
            initial_speed,
            final_speed,
            acceleration: derived_acceleration(initial_speed, final_speed, end_offset - start_offset),
        }
    }

    fn from_resolved(change: &ResolvedChange) -> Self {
        let mut segment = Self::change(
            Some(change.index),
            change.start_offset,
            change.end_offset,
            change.initial,
            change.final_value,
        );
        segment.start = change.start;
        segment.end = change.end;
        segment
    }

    /// Signed length; negative when the segment runs backwards.
    pub fn distance(&self) -> f64 {
        self.end_offset - self.start_offset
    }

    pub fn is_constant(&self) -> bool {
        self.acceleration.abs() <= ACCELERATION_EPSILON
    }

    /// Speed `local_m` into the segment.
    pub fn speed_at_local(&self, local_m: f64) -> f64 {
        let d = local_m.clamp(0.0, self.distance().max(0.0));
        (self.initial_speed * self.initial_speed + 2.0 * self.acceleration * d)
            .max(0.0)
            .sqrt()
    }

    /// Seconds needed to fly the whole segment.
    pub fn duration(&self) -> f64 {
        self.time_at_local(self.distance())
    }

    pub fn time_at_local(&self, local_m: f64) -> f64 {
        let d = local_m.clamp(0.0, self.distance().max(0.0));
        if d <= 0.0 {
            return 0.0;
        }
        let sum = self.initial_speed + self.speed_at_local(d);
        if sum <= 0.0 {
            return f64::INFINITY;
        }
        2.0 * d / sum
    }

    /// Distance flown `seconds` after entering the segment.
    pub fn local_at_time(&self, seconds: f64) -> f64 {
        let length = self.distance().max(0.0);
        let t = seconds.clamp(0.0, self.duration());
        let d = self.initial_speed * t + 0.5 * self.acceleration * t * t;
        d.clamp(0.0, length)
    }

    /// Squared speed of the forward law, extended past the segment ends.
    fn forward_speed_sq(&self, offset: f64) -> f64 {
        self.initial_speed * self.initial_speed + 2.0 * self.acceleration * (offset - self.start_offset)
    }

    /// Squared speed of the law anchored at the segment end.
    fn backward_speed_sq(&self, offset: f64) -> f64 {
        self.final_speed * self.final_speed - 2.0 * self.acceleration * (self.end_offset - offset)
    }

    fn recut_end(&mut self, offset: f64, speed: f64) {
        self.end_offset = offset;
        self.final_speed = speed;
        self.acceleration = derived_acceleration(self.initial_speed, speed, self.distance());
    }

    fn recut_start(&mut self, offset: f64, speed: f64) {
        self.start_offset = offset;
        self.initial_speed = speed;
        self.acceleration = derived_acceleration(speed, self.final_speed, self.distance());
    }

    fn speed_range_contains(&self, speed: f64) -> bool {
        let lo = self.initial_speed.min(self.final_speed);
        let hi = self.initial_speed.max(self.final_speed);
        speed >= lo - SPEED_TOLERANCE_MPS && speed <= hi + SPEED_TOLERANCE_MPS
    }
}

fn derived_acceleration(initial: f64, final_speed: f64, distance_m: f64) -> f64 {
    if distance_m.abs() <= 1e-9 {
        0.0
    } else {
        (final_speed * final_speed - initial * initial) / (2.0 * distance_m)
    }
}

/// Speed profile over a lateral path, with precomputed segment timing.
#[derive(Debug, Clone)]
pub struct VelocityPath {
    kind: PathKind,
    lateral: Arc<LateralPath>,
    initial_speed: f64,
    changes: Vec<ResolvedChange>,
    segments: Vec<VelocitySegment>,
    /// Elapsed seconds at the start of each segment, plus the total.
    start_times: Vec<f64>,
}

impl VelocityPath {
    /// Resolve the airspeed events against a lateral plan and build the
    /// velocity plan.
    pub fn plan(
        lateral: Arc<LateralPath>,
        initial_speed_mps: f64,
        events: &[ChangeEvent],
        config: &TrackConfig,
    ) -> Result<Self> {
        let airspeed: Vec<(usize, &ChangeEvent)> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.kind == EventKind::Airspeed)
            .collect();

        let changes = resolve_in_order(&airspeed, &lateral, initial_speed_mps, |index, event, in_effect| {
            resolve_airspeed(index, event, &lateral, in_effect)
        })
        .map_err(|(index, source)| TrackError::InvalidEvent { index, source })?;

        debug!(events = changes.len(), "resolved airspeed events");
        Self::build(PathKind::Plan, lateral, initial_speed_mps, changes, config)
    }

    /// Re-map the plan's resolved changes onto a lateral track and rebuild.
    pub fn track(plan: &VelocityPath, lateral: Arc<LateralPath>, config: &TrackConfig) -> Result<Self> {
        let changes = plan
            .changes
            .iter()
            .map(|change| {
                let start = keep_id(lateral.align_to_path(&change.start), &change.start);
                let end = keep_id(lateral.align_to_path(&change.end), &change.end);
                let start_offset = lateral.offset_of(&start);
                let end_offset = lateral.offset_of(&end);
                ResolvedChange {
                    start,
                    end,
                    start_offset,
                    end_offset,
                    rate: derived_acceleration(change.initial, change.final_value, end_offset - start_offset),
                    ..change.clone()
                }
            })
            .collect();
        Self::build(PathKind::Track, lateral, plan.initial_speed, changes, config)
    }

    fn build(
        kind: PathKind,
        lateral: Arc<LateralPath>,
        initial_speed: f64,
        mut changes: Vec<ResolvedChange>,
        config: &TrackConfig,
    ) -> Result<Self> {
        changes.sort_by(|a, b| a.start_offset.total_cmp(&b.start_offset).then(a.index.cmp(&b.index)));
        let mut segments = assemble(&changes, initial_speed, lateral.length(), config.distance_epsilon_m);
        repair(&mut segments, config)?;

        let mut start_times = Vec::with_capacity(segments.len() + 1);
        let mut elapsed = 0.0;
        for (index, segment) in segments.iter_mut().enumerate() {
            let distance_m = segment.distance();
            if distance_m > config.distance_epsilon_m
                && segment.initial_speed + segment.final_speed <= SPEED_TOLERANCE_MPS
            {
                return Err(TrackError::StalledSegment { index, distance_m });
            }
            segment.start = keep_id(lateral.position_at(segment.start_offset), &segment.start);
            segment.end = keep_id(lateral.position_at(segment.end_offset), &segment.end);
            start_times.push(elapsed);
            elapsed += segment.duration();
        }
        start_times.push(elapsed);

        info!(
            kind = ?kind,
            segments = segments.len(),
            duration_s = elapsed,
            "velocity path built"
        );
        Ok(Self {
            kind,
            lateral,
            initial_speed,
            changes,
            segments,
            start_times,
        })
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn lateral(&self) -> &Arc<LateralPath> {
        &self.lateral
    }

    pub fn segments(&self) -> &[VelocitySegment] {
        &self.segments
    }

    pub fn changes(&self) -> &[ResolvedChange] {
        &self.changes
    }

    /// Total seconds to fly the path.
    pub fn duration(&self) -> f64 {
        self.start_times.last().copied().unwrap_or(0.0)
    }

    pub fn segment_index_at_offset(&self, offset: f64) -> usize {
        let index = self.segments.partition_point(|s| s.start_offset <= offset);
        index.saturating_sub(1).min(self.segments.len().saturating_sub(1))
    }

    pub fn speed_at_offset(&self, offset: f64) -> f64 {
        let segment = &self.segments[self.segment_index_at_offset(offset)];
        segment.speed_at_local(offset - segment.start_offset)
    }

    pub fn speed_at(&self, point: &Waypoint) -> f64 {
        self.speed_at_offset(self.lateral.offset_of(point))
    }

    pub fn acceleration_at(&self, point: &Waypoint) -> f64 {
        let offset = self.lateral.offset_of(point);
        self.segments[self.segment_index_at_offset(offset)].acceleration
    }

    /// Elapsed seconds when the vehicle reaches `offset`.
    pub fn time_at_offset(&self, offset: f64) -> f64 {
        let offset = offset.clamp(0.0, self.lateral.length());
        let index = self.segment_index_at_offset(offset);
        let segment = &self.segments[index];
        self.start_times[index] + segment.time_at_local(offset - segment.start_offset)
    }

    pub fn time_at(&self, point: &Waypoint) -> f64 {
        self.time_at_offset(self.lateral.offset_of(point))
    }

    /// Path offset reached after `seconds`, clamped to the path.
    pub fn distance_at_time(&self, seconds: f64) -> f64 {
        let t = seconds.clamp(0.0, self.duration());
        let starts = &self.start_times[..self.segments.len()];
        let index = starts
            .partition_point(|start| *start <= t)
            .saturating_sub(1)
            .min(self.segments.len().saturating_sub(1));
        let segment = &self.segments[index];
        segment.start_offset + segment.local_at_time(t - self.start_times[index])
    }

    pub fn position_at_time(&self, seconds: f64) -> Waypoint {
        self.lateral.position_at(self.distance_at_time(seconds))
    }

    /// Distance flown in `elapsed_s` seconds starting from `reference`.
    pub fn distance_covered(&self, reference: &Waypoint, elapsed_s: f64) -> f64 {
        let from = self.lateral.offset_of(reference);
        self.distance_at_time(self.time_at_offset(from) + elapsed_s) - from
    }

    /// Average speed between two points: path distance over flight time.
    pub fn uniform_speed_between(&self, p1: &Waypoint, p2: &Waypoint) -> f64 {
        let distance_m = self.lateral.path_distance(p1, p2);
        let seconds = self.time_at(p2) - self.time_at(p1);
        if seconds.abs() <= 1e-9 {
            return self.speed_at(p1);
        }
        distance_m / seconds
    }
}

fn keep_id(mut point: Waypoint, source: &Waypoint) -> Waypoint {
    point.id = source.id;
    point
}

/// Lay resolved changes over the path, filling gaps with cruise segments
/// at the speed left in effect.
fn assemble(
    changes: &[ResolvedChange],
    initial_speed: f64,
    length: f64,
    epsilon: f64,
) -> Vec<VelocitySegment> {
    let mut segments = Vec::with_capacity(changes.len() * 2 + 1);
    let mut cursor = 0.0_f64;
    let mut speed = initial_speed;
    for change in changes {
        if change.start_offset > cursor + epsilon {
            segments.push(VelocitySegment::cruise(cursor, change.start_offset, speed));
        }
        segments.push(VelocitySegment::from_resolved(change));
        cursor = cursor.max(change.start_offset).max(change.end_offset);
        speed = change.final_value;
    }
    if segments.is_empty() || cursor < length - epsilon {
        segments.push(VelocitySegment::cruise(cursor, length.max(cursor), speed));
    }
    segments
}

/// Remove reversed segments and overlaps until the sequence is monotonic.
fn repair(segments: &mut Vec<VelocitySegment>, config: &TrackConfig) -> Result<()> {
    let max_passes = segments.len() * 2 + 2;
    for _ in 0..max_passes {
        let reversed = remove_reversed(segments, config.distance_epsilon_m)?;
        let overlapped = resolve_overlaps(segments, config)?;
        if !reversed && !overlapped {
            return Ok(());
        }
    }
    match segments.iter().position(|s| s.distance() < -config.distance_epsilon_m) {
        Some(index) => Err(TrackError::VelocityUnbridgeable {
            first: index,
            second: index,
        }),
        None => Ok(()),
    }
}

fn remove_reversed(segments: &mut Vec<VelocitySegment>, epsilon: f64) -> Result<bool> {
    let Some(k) = segments.iter().position(|s| s.distance() < -epsilon) else {
        return Ok(false);
    };
    if k == 0 || k + 1 >= segments.len() {
        return Err(TrackError::VelocityUnbridgeable {
            first: k.saturating_sub(1),
            second: k,
        });
    }
    let (prev, next) = (&segments[k - 1], &segments[k + 1]);

    if let Some((offset, speed)) = transition(prev, next, epsilon) {
        debug!(segment = k, offset, speed, "dropped reversed velocity segment");
        segments[k - 1].recut_end(offset, speed);
        segments[k + 1].recut_start(offset, speed);
        segments.remove(k);
        return Ok(true);
    }

    // Two fillers with different speeds have parallel laws; spread the
    // change over both instead.
    if prev.kind == VelocitySegmentKind::Cruise
        && next.kind == VelocitySegmentKind::Cruise
        && next.end_offset - prev.start_offset > epsilon
    {
        let merged = VelocitySegment::change(
            segments[k].event,
            prev.start_offset,
            next.end_offset,
            prev.initial_speed,
            next.final_speed,
        );
        debug!(segment = k, "spread reversed change over neighbouring fillers");
        segments.splice(k - 1..=k + 1, [merged]);
        return Ok(true);
    }

    Err(TrackError::VelocityUnbridgeable {
        first: k - 1,
        second: k + 1,
    })
}

/// Where the squared-speed lines of `prev` (forward) and `next` (backward)
/// meet, if that point is reachable by both.
fn transition(prev: &VelocitySegment, next: &VelocitySegment, epsilon: f64) -> Option<(f64, f64)> {
    let denom = 2.0 * (prev.acceleration - next.acceleration);
    if denom.abs() <= ACCELERATION_EPSILON {
        return None;
    }
    let offset = (next.final_speed * next.final_speed - 2.0 * next.acceleration * next.end_offset
        - prev.initial_speed * prev.initial_speed
        + 2.0 * prev.acceleration * prev.start_offset)
        / denom;
    if offset < prev.start_offset - epsilon || offset > next.end_offset + epsilon {
        return None;
    }
    let speed_sq = prev.forward_speed_sq(offset);
    if speed_sq < 0.0 {
        return None;
    }
    let speed = speed_sq.sqrt();
    if !prev.speed_range_contains(speed) || !next.speed_range_contains(speed) {
        return None;
    }
    Some((offset.clamp(prev.start_offset, next.end_offset), speed))
}

fn resolve_overlaps(segments: &mut Vec<VelocitySegment>, config: &TrackConfig) -> Result<bool> {
    let epsilon = config.distance_epsilon_m;
    let mut changed = false;
    let mut i = 0;
    while i + 1 < segments.len() {
        let overlap = segments[i].end_offset - segments[i + 1].start_offset;
        if overlap < -epsilon {
            let (from, to, speed) = (segments[i].end_offset, segments[i + 1].start_offset, segments[i].final_speed);
            segments.insert(i + 1, VelocitySegment::cruise(from, to, speed));
            changed = true;
        } else if overlap > epsilon && overlap <= config.overlap_tolerance_m {
            let (at, speed) = (segments[i].end_offset, segments[i + 1].initial_speed);
            segments[i + 1].recut_start(at, speed);
            changed = true;
        } else if overlap > config.overlap_tolerance_m {
            let Some((cut_end, cut_start, speed)) = bridge(&segments[i], &segments[i + 1], epsilon) else {
                return Err(TrackError::VelocityUnbridgeable {
                    first: i,
                    second: i + 1,
                });
            };
            debug!(first = i, overlap_m = overlap, speed, "bridged overlapping velocity segments");
            segments[i].recut_end(cut_end, speed);
            segments[i + 1].recut_start(cut_start, speed);
            segments.insert(i + 1, VelocitySegment::bridge(cut_end, cut_start, speed));
            changed = true;
        }
        i += 1;
    }
    Ok(changed)
}

/// Bridge two overlapping segments at the highest speed both can meet
/// without leaving their own spans. Returns where `first` now ends, where
/// `second` now starts, and the bridge speed.
fn bridge(first: &VelocitySegment, second: &VelocitySegment, epsilon: f64) -> Option<(f64, f64, f64)> {
    let first_at_overlap = first.forward_speed_sq(second.start_offset).max(0.0).sqrt();
    let second_at_overlap = second.backward_speed_sq(first.end_offset).max(0.0).sqrt();

    let mut lo = 0.0_f64;
    let mut hi = f64::INFINITY;
    if first.acceleration > ACCELERATION_EPSILON {
        hi = hi.min(first_at_overlap);
    } else if first.acceleration < -ACCELERATION_EPSILON {
        lo = lo.max(first_at_overlap);
    } else {
        lo = lo.max(first_at_overlap);
        hi = hi.min(first_at_overlap);
    }
    if second.acceleration < -ACCELERATION_EPSILON {
        hi = hi.min(second_at_overlap);
    } else if second.acceleration > ACCELERATION_EPSILON {
        lo = lo.max(second_at_overlap);
    } else {
        lo = lo.max(second_at_overlap);
        hi = hi.min(second_at_overlap);
    }
    if lo > hi + SPEED_TOLERANCE_MPS {
        return None;
    }
    let speed = if hi.is_finite() { hi } else { lo };

    let cut_end = if first.is_constant() {
        second.start_offset
    } else {
        first.start_offset + (speed * speed - first.initial_speed * first.initial_speed) / (2.0 * first.acceleration)
    };
    let cut_start = if second.is_constant() {
        first.end_offset
    } else {
        second.end_offset - (second.final_speed * second.final_speed - speed * speed) / (2.0 * second.acceleration)
    };
    if cut_end < first.start_offset - epsilon
        || cut_start > second.end_offset + epsilon
        || cut_end > cut_start + epsilon
    {
        return None;
    }
    let cut_end = cut_end.max(first.start_offset);
    let cut_start = cut_start.min(second.end_offset).max(cut_end);
    Some((cut_end, cut_start, speed))
}
