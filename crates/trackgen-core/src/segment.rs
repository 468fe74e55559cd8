//! Lateral path segments: straight legs and constant-radius turns.
//!
//! Every query takes a point that is assumed to be on, or close to, the
//! segment and works in local offsets measured from the segment start.

use serde::{Deserialize, Serialize};

use crate::models::Waypoint;
use crate::spatial::{self, course_change, destination, distance, initial_bearing, normalize_course};

/// Sweeps at or above this are flown as a U-turn and have no corner apex.
pub const U_TURN_SWEEP_DEG: f64 = 180.0 - 1e-6;

/// Direction of rotation through a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    /// Counter-clockwise, course decreasing
    Left,
    /// Clockwise, course increasing
    Right,
}

impl TurnDirection {
    /// +1 for right turns, -1 for left turns.
    pub fn sign(self) -> f64 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }

    pub fn from_course_change(delta_deg: f64) -> Self {
        if delta_deg < 0.0 {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}

/// A great-circle leg between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightSegment {
    pub start: Waypoint,
    pub end: Waypoint,
}

impl StraightSegment {
    pub fn new(start: Waypoint, end: Waypoint) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        distance(&self.start, &self.end)
    }

    /// Course leaving the start point.
    pub fn course(&self) -> f64 {
        initial_bearing(&self.start, &self.end)
    }

    /// Course arriving at the end point.
    pub fn final_course(&self) -> f64 {
        spatial::final_bearing(&self.start, &self.end)
    }

    /// Offset of the projection of `point` from the start, clamped to the leg.
    pub fn local_offset(&self, point: &Waypoint) -> f64 {
        let c = self.length();
        if c <= 1e-9 || distance(&self.start, point) <= 1e-12 {
            return 0.0;
        }
        spatial::along_track_distance(point, &self.start, &self.end).clamp(0.0, c)
    }

    pub fn point_at(&self, local_m: f64) -> Waypoint {
        let length = self.length();
        if local_m <= 0.0 || length <= 1e-9 {
            return self.start;
        }
        if local_m >= length {
            return self.end;
        }
        spatial::intermediate_point(&self.start, &self.end, local_m / length)
    }

    pub fn course_at(&self, point: &Waypoint) -> f64 {
        let length = self.length();
        let local = self.local_offset(point);
        if length - local <= 1e-3 {
            return self.final_course();
        }
        initial_bearing(&self.point_at(local), &self.end)
    }

    /// Offset of `point` from the leg; distance to the nearer end when the
    /// point projects outside it.
    pub fn error(&self, point: &Waypoint) -> f64 {
        let a = distance(&self.start, point);
        let b = distance(&self.end, point);
        let c = self.length();
        if c <= 1e-9 || a <= 1e-12 || b <= 1e-12 {
            return a.min(b);
        }
        let along = spatial::along_track_distance(point, &self.start, &self.end);
        if along < 0.0 {
            a
        } else if along > c {
            b
        } else {
            spatial::cross_track_distance(point, &self.start, &self.end).abs()
        }
    }
}

/// A constant-radius arc between two straight legs.
///
/// `apex` is the corner where the two tangent legs meet; for a U-turn,
/// where no corner exists, it is the midpoint of the arc.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSegment {
    pub start: Waypoint,
    pub apex: Waypoint,
    pub end: Waypoint,
    pub center: Waypoint,
    pub radius_m: f64,
    pub course_start: f64,
    pub course_end: f64,
    pub direction: TurnDirection,
    start_radial: f64,
    sweep_deg: f64,
}

impl TurnSegment {
    /// Arc starting at `start` on `course_start`, turning `sweep_deg`
    /// (positive) in `direction` with the given radius.
    pub fn new(
        start: Waypoint,
        course_start: f64,
        radius_m: f64,
        sweep_deg: f64,
        direction: TurnDirection,
    ) -> Self {
        let sign = direction.sign();
        let center = destination(&start, radius_m, course_start + sign * 90.0);
        let start_radial = normalize_course(course_start - sign * 90.0);
        let end = destination(&center, radius_m, start_radial + sign * sweep_deg);
        let mut turn = Self {
            start,
            apex: start,
            end,
            center,
            radius_m,
            course_start: normalize_course(course_start),
            course_end: normalize_course(course_start + sign * sweep_deg),
            direction,
            start_radial,
            sweep_deg,
        };
        turn.apex = turn.compute_apex();
        turn
    }

    /// Total rotation through the turn in degrees, always positive.
    pub fn sweep_deg(&self) -> f64 {
        self.sweep_deg
    }

    /// Signed course change, positive for right turns.
    pub fn course_change(&self) -> f64 {
        self.direction.sign() * self.sweep_deg
    }

    pub fn is_u_turn(&self) -> bool {
        self.sweep_deg >= U_TURN_SWEEP_DEG
    }

    pub fn length(&self) -> f64 {
        self.radius_m * self.sweep_deg.to_radians()
    }

    /// Move the end of the arc to the radial through `end`, keeping the
    /// start, center and radius.
    pub fn recut_end(&mut self, end: Waypoint) {
        let radial = initial_bearing(&self.center, &end);
        self.sweep_deg = self.angle_from_start(radial);
        self.end = end;
        self.course_end = normalize_course(self.course_start + self.direction.sign() * self.sweep_deg);
        self.apex = self.compute_apex();
    }

    /// Move the start of the arc to the radial through `start`, keeping the
    /// end, center and radius.
    pub fn recut_start(&mut self, start: Waypoint) {
        let sign = self.direction.sign();
        let end_radial = normalize_course(self.start_radial + sign * self.sweep_deg);
        let radial = initial_bearing(&self.center, &start);
        let sweep = (sign * (end_radial - radial)).rem_euclid(360.0);
        self.start_radial = radial;
        self.sweep_deg = sweep;
        self.start = start;
        self.course_start = normalize_course(radial + sign * 90.0);
        self.apex = self.compute_apex();
    }

    /// Angle travelled from the start radial to the radial through `point`,
    /// clamped to the arc.
    fn swept_angle(&self, point: &Waypoint) -> f64 {
        if distance(&self.center, point) <= 1e-9 {
            return 0.0;
        }
        let raw = self.raw_angle(initial_bearing(&self.center, point));
        if raw <= self.sweep_deg {
            return raw;
        }
        // Past the end or before the start: snap to whichever is nearer.
        if raw - self.sweep_deg < 360.0 - raw {
            self.sweep_deg
        } else {
            0.0
        }
    }

    fn raw_angle(&self, radial: f64) -> f64 {
        (self.direction.sign() * (radial - self.start_radial)).rem_euclid(360.0)
    }

    fn angle_from_start(&self, radial: f64) -> f64 {
        let raw = self.raw_angle(radial);
        if raw > 360.0 - 1e-9 {
            0.0
        } else {
            raw
        }
    }

    fn compute_apex(&self) -> Waypoint {
        if self.is_u_turn() {
            return destination(
                &self.center,
                self.radius_m,
                self.start_radial + self.direction.sign() * self.sweep_deg / 2.0,
            );
        }
        let leg = self.radius_m * (self.sweep_deg.to_radians() / 2.0).tan();
        destination(&self.start, leg, self.course_start)
    }

    pub fn local_offset(&self, point: &Waypoint) -> f64 {
        self.radius_m * self.swept_angle(point).to_radians()
    }

    pub fn point_at(&self, local_m: f64) -> Waypoint {
        let length = self.length();
        if local_m <= 0.0 || length <= 1e-9 {
            return self.start;
        }
        if local_m >= length {
            return self.end;
        }
        let angle = (local_m / self.radius_m).to_degrees();
        destination(
            &self.center,
            self.radius_m,
            self.start_radial + self.direction.sign() * angle,
        )
    }

    pub fn course_at(&self, point: &Waypoint) -> f64 {
        normalize_course(self.course_start + self.direction.sign() * self.swept_angle(point))
    }

    /// Offset from the two tangent legs through the apex.
    pub fn plan_error(&self, point: &Waypoint) -> f64 {
        let inbound = StraightSegment::new(self.start, self.apex).error(point);
        let outbound = StraightSegment::new(self.apex, self.end).error(point);
        inbound.min(outbound)
    }

    /// Offset from the arc itself.
    pub fn track_error(&self, point: &Waypoint) -> f64 {
        let raw = self.raw_angle(initial_bearing(&self.center, point));
        if raw <= self.sweep_deg {
            (distance(&self.center, point) - self.radius_m).abs()
        } else {
            distance(point, &self.start).min(distance(point, &self.end))
        }
    }

    /// Radius is positive and the apex lies on the turning side.
    pub fn is_consistent(&self) -> bool {
        if !(self.radius_m > 0.0 && self.sweep_deg > 0.0) {
            return false;
        }
        let apex_radial = initial_bearing(&self.center, &self.apex);
        self.direction.sign() * course_change(self.start_radial, apex_radial) > 0.0
    }
}

/// One piece of a lateral path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Straight(StraightSegment),
    Turn(TurnSegment),
}

impl PathSegment {
    pub fn straight(start: Waypoint, end: Waypoint) -> Self {
        PathSegment::Straight(StraightSegment::new(start, end))
    }

    pub fn start(&self) -> Waypoint {
        match self {
            PathSegment::Straight(s) => s.start,
            PathSegment::Turn(t) => t.start,
        }
    }

    pub fn end(&self) -> Waypoint {
        match self {
            PathSegment::Straight(s) => s.end,
            PathSegment::Turn(t) => t.end,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            PathSegment::Straight(s) => s.length(),
            PathSegment::Turn(t) => t.length(),
        }
    }

    pub fn is_turn(&self) -> bool {
        matches!(self, PathSegment::Turn(_))
    }

    pub fn as_turn(&self) -> Option<&TurnSegment> {
        match self {
            PathSegment::Turn(t) => Some(t),
            PathSegment::Straight(_) => None,
        }
    }

    pub fn local_offset(&self, point: &Waypoint) -> f64 {
        match self {
            PathSegment::Straight(s) => s.local_offset(point),
            PathSegment::Turn(t) => t.local_offset(point),
        }
    }

    pub fn point_at(&self, local_m: f64) -> Waypoint {
        match self {
            PathSegment::Straight(s) => s.point_at(local_m),
            PathSegment::Turn(t) => t.point_at(local_m),
        }
    }

    pub fn course_at(&self, point: &Waypoint) -> f64 {
        match self {
            PathSegment::Straight(s) => s.course_at(point),
            PathSegment::Turn(t) => t.course_at(point),
        }
    }

    /// Signed distance from `p1` to `p2` measured inside this segment.
    pub fn distance_between(&self, p1: &Waypoint, p2: &Waypoint) -> f64 {
        self.local_offset(p2) - self.local_offset(p1)
    }

    /// Point `distance_m` from `reference` along this segment, clamped to
    /// its ends. Also returns the part of the request that did not fit,
    /// signed like `distance_m`.
    pub fn point_at_distance(&self, reference: &Waypoint, distance_m: f64) -> (Waypoint, f64) {
        let target = self.local_offset(reference) + distance_m;
        let length = self.length();
        if target < 0.0 {
            (self.start(), target)
        } else if target > length {
            (self.end(), target - length)
        } else {
            (self.point_at(target), 0.0)
        }
    }

    pub fn plan_error(&self, point: &Waypoint) -> f64 {
        match self {
            PathSegment::Straight(s) => s.error(point),
            PathSegment::Turn(t) => t.plan_error(point),
        }
    }

    pub fn track_error(&self, point: &Waypoint) -> f64 {
        match self {
            PathSegment::Straight(s) => s.error(point),
            PathSegment::Turn(t) => t.track_error(point),
        }
    }

    /// Score used to find the segment owning a point.
    pub fn error(&self, point: &Waypoint) -> f64 {
        match self {
            PathSegment::Straight(s) => s.error(point),
            PathSegment::Turn(t) => t.plan_error(point).min(t.track_error(point)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Waypoint {
        Waypoint::new(33.0, -117.0)
    }

    #[test]
    fn straight_offsets_and_points() {
        let start = origin();
        let end = destination(&start, 1_000.0, 45.0);
        let leg = StraightSegment::new(start, end);
        assert!((leg.length() - 1_000.0).abs() < 1e-6);

        let mid = leg.point_at(400.0);
        assert!((leg.local_offset(&mid) - 400.0).abs() < 1e-3);
        assert!(leg.error(&mid) < 1e-3);
        assert_eq!(leg.point_at(-5.0), start);
        assert_eq!(leg.point_at(5_000.0), end);
    }

    #[test]
    fn straight_error_outside_projection_is_endpoint_distance() {
        let start = origin();
        let end = destination(&start, 1_000.0, 90.0);
        let leg = StraightSegment::new(start, end);
        let behind = destination(&start, 50.0, 270.0);
        assert!((leg.error(&behind) - 50.0).abs() < 1e-6);
        assert_eq!(leg.local_offset(&behind), 0.0);

        let abeam = destination(&leg.point_at(500.0), 30.0, 0.0);
        assert!((leg.error(&abeam) - 30.0).abs() < 0.01);
        assert!((leg.local_offset(&abeam) - 500.0).abs() < 0.01);
    }

    #[test]
    fn right_turn_geometry() {
        let turn = TurnSegment::new(origin(), 0.0, 200.0, 90.0, TurnDirection::Right);
        let expected_length = 200.0 * std::f64::consts::FRAC_PI_2;
        assert!((turn.length() - expected_length).abs() < 1e-9);
        assert!((distance(&turn.center, &turn.end) - 200.0).abs() < 1e-6);
        assert!((turn.course_end - 90.0).abs() < 1e-9);
        assert!(turn.is_consistent());

        // Apex is the corner: one leg length ahead of the start.
        assert!((distance(&turn.start, &turn.apex) - 200.0).abs() < 1e-6);
        assert!((distance(&turn.apex, &turn.end) - 200.0).abs() < 0.01);
        assert!(turn.track_error(&turn.apex) > 50.0);
        assert!(turn.plan_error(&turn.apex) < 1e-6);
    }

    #[test]
    fn turn_offsets_follow_the_arc() {
        let turn = TurnSegment::new(origin(), 90.0, 150.0, 60.0, TurnDirection::Left);
        let quarter = turn.point_at(turn.length() / 4.0);
        assert!((turn.local_offset(&quarter) - turn.length() / 4.0).abs() < 1e-3);
        assert!(turn.track_error(&quarter) < 1e-3);
        let course = turn.course_at(&quarter);
        assert!((course - 75.0).abs() < 1e-3, "course {course}");
        assert_eq!(turn.point_at(turn.length()), turn.end);
    }

    #[test]
    fn u_turn_offsets_resolve_near_end() {
        let turn = TurnSegment::new(origin(), 0.0, 100.0, 180.0, TurnDirection::Right);
        assert!(turn.is_u_turn());
        assert!(turn.is_consistent());
        let near_end = turn.point_at(turn.length() - 0.01);
        assert!((turn.local_offset(&near_end) - (turn.length() - 0.01)).abs() < 1e-3);
        let beyond = destination(&turn.end, 5.0, 180.0);
        assert!((turn.local_offset(&beyond) - turn.length()).abs() < 1e-6);
    }

    #[test]
    fn recut_end_shortens_sweep() {
        let mut turn = TurnSegment::new(origin(), 0.0, 200.0, 90.0, TurnDirection::Right);
        let new_end = turn.point_at(turn.length() / 3.0);
        turn.recut_end(new_end);
        assert!((turn.sweep_deg() - 30.0).abs() < 1e-6);
        assert!((turn.course_end - 30.0).abs() < 1e-6);
        assert_eq!(turn.end, new_end);
    }

    #[test]
    fn recut_start_keeps_end() {
        let mut turn = TurnSegment::new(origin(), 0.0, 200.0, 90.0, TurnDirection::Right);
        let end = turn.end;
        let new_start = turn.point_at(turn.length() / 2.0);
        turn.recut_start(new_start);
        assert!((turn.sweep_deg() - 45.0).abs() < 1e-6);
        assert!((turn.course_start - 45.0).abs() < 1e-6);
        assert_eq!(turn.end, end);
    }

    #[test]
    fn segment_point_at_distance_reports_overflow() {
        let start = origin();
        let seg = PathSegment::straight(start, destination(&start, 100.0, 0.0));
        let (point, rest) = seg.point_at_distance(&start, 130.0);
        assert_eq!(point, seg.end());
        assert!((rest - 30.0).abs() < 1e-6);
        let (point, rest) = seg.point_at_distance(&seg.end(), -40.0);
        assert!(rest == 0.0);
        assert!((seg.local_offset(&point) - 60.0).abs() < 1e-3);
    }
}
