//! Piecewise-linear value profiles over path offsets.
//!
//! Altitude and weather quantities change linearly with distance inside a
//! change and hold level between changes. Overlapping changes are cut at
//! the point where their lines cross; a reversed change is removed and its
//! neighbours are joined where their lines meet.

use tracing::{debug, warn};

use crate::error::{Result, TrackError};
use crate::events::ResolvedChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSegmentKind {
    Level,
    Change,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSegment {
    pub kind: ProfileSegmentKind,
    pub event: Option<usize>,
    pub start_offset: f64,
    pub end_offset: f64,
    pub initial: f64,
    pub final_value: f64,
}

impl ProfileSegment {
    fn level(start_offset: f64, end_offset: f64, value: f64) -> Self {
        Self {
            kind: ProfileSegmentKind::Level,
            event: None,
            start_offset,
            end_offset,
            initial: value,
            final_value: value,
        }
    }

    pub fn distance(&self) -> f64 {
        self.end_offset - self.start_offset
    }

    /// Change in value per meter of path.
    pub fn slope(&self) -> f64 {
        let d = self.distance();
        if d.abs() <= 1e-9 {
            0.0
        } else {
            (self.final_value - self.initial) / d
        }
    }

    pub fn value_at_local(&self, local_m: f64) -> f64 {
        let d = local_m.clamp(0.0, self.distance().max(0.0));
        self.initial + self.slope() * d
    }

    fn value_on_line(&self, offset: f64) -> f64 {
        self.initial + self.slope() * (offset - self.start_offset)
    }
}

#[derive(Debug, Clone)]
pub struct LinearProfile {
    segments: Vec<ProfileSegment>,
}

impl LinearProfile {
    /// Lay `changes` (sorted by start offset) over `[0, length]`.
    /// `unbridgeable` builds the error reported for two segments that
    /// cannot be joined.
    pub fn build(
        changes: &[ResolvedChange],
        initial: f64,
        length: f64,
        epsilon: f64,
        overlap_tolerance: f64,
        unbridgeable: fn(usize, usize) -> TrackError,
    ) -> Result<Self> {
        let mut segments = Vec::with_capacity(changes.len() * 2 + 1);
        let mut cursor = 0.0_f64;
        let mut value = initial;
        for change in changes {
            if change.start_offset > cursor + epsilon {
                segments.push(ProfileSegment::level(cursor, change.start_offset, value));
            }
            segments.push(ProfileSegment {
                kind: ProfileSegmentKind::Change,
                event: Some(change.index),
                start_offset: change.start_offset,
                end_offset: change.end_offset,
                initial: change.initial,
                final_value: change.final_value,
            });
            cursor = cursor.max(change.end_offset);
            value = change.final_value;
        }
        if segments.is_empty() || cursor < length - epsilon {
            segments.push(ProfileSegment::level(cursor, length.max(cursor), value));
        }

        while remove_reversed(&mut segments, epsilon, unbridgeable)? {}

        let mut i = 0;
        while i + 1 < segments.len() {
            let overlap = segments[i].end_offset - segments[i + 1].start_offset;
            if overlap > overlap_tolerance {
                let Some(cross) = crossing(&segments[i], &segments[i + 1], epsilon) else {
                    return Err(unbridgeable(i, i + 1));
                };
                let at = segments[i].value_on_line(cross);
                segments[i].end_offset = cross;
                segments[i].final_value = at;
                segments[i + 1].start_offset = cross;
                segments[i + 1].initial = at;
            } else if overlap > epsilon {
                let at = segments[i].end_offset;
                let value = segments[i + 1].value_on_line(at);
                segments[i + 1].start_offset = at;
                segments[i + 1].initial = value;
            }
            i += 1;
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[ProfileSegment] {
        &self.segments
    }

    fn segment_at(&self, offset: f64) -> &ProfileSegment {
        let index = self
            .segments
            .partition_point(|s| s.start_offset <= offset)
            .saturating_sub(1)
            .min(self.segments.len().saturating_sub(1));
        &self.segments[index]
    }

    pub fn value_at_offset(&self, offset: f64) -> f64 {
        let segment = self.segment_at(offset);
        segment.value_at_local(offset - segment.start_offset)
    }

    /// Value change per meter at `offset`.
    pub fn slope_at_offset(&self, offset: f64) -> f64 {
        self.segment_at(offset).slope()
    }
}

/// Drop the first reversed change and join its neighbours. Returns
/// whether anything was removed.
fn remove_reversed(
    segments: &mut Vec<ProfileSegment>,
    epsilon: f64,
    unbridgeable: fn(usize, usize) -> TrackError,
) -> Result<bool> {
    let Some(k) = segments.iter().position(|s| s.distance() < -epsilon) else {
        return Ok(false);
    };
    if k == 0 || k + 1 >= segments.len() {
        warn!(segment = k, "reversed profile change at the path boundary");
        return Err(unbridgeable(k.saturating_sub(1), k));
    }
    let (prev, next) = (&segments[k - 1], &segments[k + 1]);

    if let Some(x) = line_crossing(prev, next) {
        if x >= prev.start_offset - epsilon && x <= next.end_offset + epsilon {
            let x = x.clamp(prev.start_offset, next.end_offset);
            let at = prev.value_on_line(x);
            debug!(segment = k, offset = x, value = at, "dropped reversed profile change");
            segments[k - 1].end_offset = x;
            segments[k - 1].final_value = at;
            segments[k + 1].start_offset = x;
            segments[k + 1].initial = at;
            segments.remove(k);
            return Ok(true);
        }
    }

    // Two level fillers never meet; spread the change over both instead.
    if prev.kind == ProfileSegmentKind::Level
        && next.kind == ProfileSegmentKind::Level
        && next.end_offset - prev.start_offset > epsilon
    {
        let merged = ProfileSegment {
            kind: ProfileSegmentKind::Change,
            event: segments[k].event,
            start_offset: prev.start_offset,
            end_offset: next.end_offset,
            initial: prev.initial,
            final_value: next.final_value,
        };
        debug!(segment = k, "spread reversed profile change over neighbouring levels");
        segments.splice(k - 1..=k + 1, [merged]);
        return Ok(true);
    }

    warn!(segment = k, "reversed profile change cannot be bridged");
    Err(unbridgeable(k - 1, k + 1))
}

/// Offset where the lines through two segments meet, `None` when parallel.
fn line_crossing(first: &ProfileSegment, second: &ProfileSegment) -> Option<f64> {
    let (s1, s2) = (first.slope(), second.slope());
    if (s1 - s2).abs() <= 1e-12 {
        return None;
    }
    // first.initial + s1 (x - a) = second.initial + s2 (x - b)
    Some((second.initial - first.initial + s1 * first.start_offset - s2 * second.start_offset) / (s1 - s2))
}

/// Offset inside the overlap where the two lines meet.
fn crossing(first: &ProfileSegment, second: &ProfileSegment, epsilon: f64) -> Option<f64> {
    let x = line_crossing(first, second)?;
    let lo = second.start_offset.max(first.start_offset);
    let hi = first.end_offset.min(second.end_offset);
    if x < lo - epsilon || x > hi + epsilon {
        return None;
    }
    Some(x.clamp(lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Waypoint;

    fn change(index: usize, from: f64, to: f64, initial: f64, final_value: f64) -> ResolvedChange {
        ResolvedChange {
            index,
            start: Waypoint::new(0.0, 0.0),
            end: Waypoint::new(0.0, 0.0),
            start_offset: from,
            end_offset: to,
            initial,
            final_value,
            rate: 0.0,
            turbulence: None,
        }
    }

    fn altitude_error(first: usize, second: usize) -> TrackError {
        TrackError::AltitudeUnbridgeable { first, second }
    }

    #[test]
    fn level_between_changes() {
        let changes = [change(0, 100.0, 200.0, 0.0, 100.0)];
        let profile = LinearProfile::build(&changes, 0.0, 500.0, 1e-4, 1.0, altitude_error).unwrap();
        assert_eq!(profile.segments().len(), 3);
        assert_eq!(profile.value_at_offset(50.0), 0.0);
        assert!((profile.value_at_offset(150.0) - 50.0).abs() < 1e-9);
        assert_eq!(profile.value_at_offset(400.0), 100.0);
        assert!((profile.slope_at_offset(150.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overlapping_changes_cut_at_crossing() {
        let changes = [
            change(0, 0.0, 100.0, 0.0, 100.0),
            change(1, 50.0, 150.0, 100.0, 0.0),
        ];
        let profile = LinearProfile::build(&changes, 0.0, 150.0, 1e-4, 1.0, altitude_error).unwrap();
        let segments = profile.segments();
        assert!((segments[0].end_offset - 75.0).abs() < 1e-9);
        assert!((segments[1].start_offset - 75.0).abs() < 1e-9);
        assert!((profile.value_at_offset(75.0) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn parallel_overlap_is_unbridgeable() {
        let changes = [
            change(0, 0.0, 100.0, 0.0, 100.0),
            change(1, 50.0, 150.0, 200.0, 300.0),
        ];
        let err = LinearProfile::build(&changes, 0.0, 150.0, 1e-4, 1.0, altitude_error).unwrap_err();
        assert_eq!(err, TrackError::AltitudeUnbridgeable { first: 0, second: 1 });
    }

    #[test]
    fn reversed_change_between_levels_is_spread() {
        let changes = [
            change(0, 0.0, 100.0, 0.0, 100.0),
            change(1, 300.0, 250.0, 100.0, 500.0),
            change(2, 400.0, 500.0, 500.0, 600.0),
        ];
        let profile = LinearProfile::build(&changes, 0.0, 600.0, 1e-4, 1.0, altitude_error).unwrap();
        let segments = profile.segments();
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.distance() >= 0.0));
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
            assert!((pair[0].final_value - pair[1].initial).abs() < 1e-9);
        }
        assert!((profile.value_at_offset(399.999) - profile.value_at_offset(400.0)).abs() < 0.01);
        assert!((profile.value_at_offset(250.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn reversed_change_joins_neighbour_lines() {
        let changes = [
            change(0, 0.0, 100.0, 0.0, 100.0),
            change(1, 80.0, 60.0, 100.0, 50.0),
        ];
        let profile = LinearProfile::build(&changes, 0.0, 300.0, 1e-4, 1.0, altitude_error).unwrap();
        let segments = profile.segments();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].end_offset - 50.0).abs() < 1e-9);
        assert!((segments[1].start_offset - 50.0).abs() < 1e-9);
        assert!((profile.value_at_offset(50.0) - 50.0).abs() < 1e-9);
        assert!((profile.value_at_offset(200.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn reversed_change_between_parallel_lines_is_unbridgeable() {
        let changes = [
            change(0, 0.0, 100.0, 0.0, 100.0),
            change(1, 90.0, 80.0, 100.0, 200.0),
            change(2, 100.0, 200.0, 200.0, 300.0),
        ];
        let err = LinearProfile::build(&changes, 0.0, 200.0, 1e-4, 1.0, altitude_error).unwrap_err();
        assert_eq!(err, TrackError::AltitudeUnbridgeable { first: 0, second: 2 });
    }
}
