//! Lateral paths and the path query engine.
//!
//! A plan is the authored polyline; a track is the plan with a turn
//! inserted at every junction where the course changes. Both answer the
//! same queries through cumulative segment offsets, so a point is resolved
//! once to its owning segment and everything else is offset arithmetic.

use tracing::{debug, info, warn};

use crate::config::TrackConfig;
use crate::curve;
use crate::error::{Result, TrackError};
use crate::models::{PlanSection, Waypoint};
use crate::segment::{PathSegment, StraightSegment, TurnDirection, TurnSegment, U_TURN_SWEEP_DEG};
use crate::spatial::{course_change, destination, distance, initial_bearing, intersection};
use crate::velocity::VelocityPath;

/// Waypoints closer than this are merged when building a plan.
const DUPLICATE_WAYPOINT_M: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Plan,
    Track,
}

/// An ordered, continuous sequence of lateral segments.
#[derive(Debug, Clone)]
pub struct LateralPath {
    kind: PathKind,
    segments: Vec<PathSegment>,
    /// Distance from the path start to the start of each segment, plus the
    /// total length as the final entry.
    offsets: Vec<f64>,
    distance_epsilon_m: f64,
}

impl LateralPath {
    /// Build a plan from authored waypoints. Consecutive duplicates are
    /// merged; at least two distinct points are required.
    pub fn plan(waypoints: &[Waypoint], config: &TrackConfig) -> Result<Self> {
        let mut points: Vec<Waypoint> = Vec::with_capacity(waypoints.len());
        for wp in waypoints {
            if points
                .last()
                .is_some_and(|last| last.coincides(wp, DUPLICATE_WAYPOINT_M))
            {
                continue;
            }
            points.push(*wp);
        }
        if points.len() < 2 {
            return Err(TrackError::TooFewWaypoints(points.len()));
        }

        let segments = points
            .windows(2)
            .map(|pair| PathSegment::straight(pair[0], pair[1]))
            .collect();
        Ok(Self::from_segments(PathKind::Plan, segments, config))
    }

    /// Build a plan from named sections flown in order.
    pub fn from_sections(sections: &[PlanSection], config: &TrackConfig) -> Result<Self> {
        let waypoints: Vec<Waypoint> = sections
            .iter()
            .flat_map(|section| section.waypoints.iter().copied())
            .collect();
        Self::plan(&waypoints, config)
    }

    /// Derive a track from a plan, sizing each turn from the approach speed
    /// of the velocity plan flown over it.
    pub fn track(plan: &LateralPath, velocity: &VelocityPath, config: &TrackConfig) -> Result<Self> {
        Self::track_with(plan, |point| velocity.speed_at(point), config)
    }

    /// Derive a track from a plan, sizing each turn from the approach
    /// speed reported by `speed_at`.
    pub fn track_with<F>(plan: &LateralPath, speed_at: F, config: &TrackConfig) -> Result<Self>
    where
        F: Fn(&Waypoint) -> f64,
    {
        if plan.kind != PathKind::Plan {
            return Err(TrackError::NotAPlan);
        }
        let legs: Vec<StraightSegment> = plan
            .segments
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Straight(leg) => Some(leg.clone()),
                PathSegment::Turn(_) => None,
            })
            .collect();

        let mut drafts = TurnInserter::new(&legs, config).run(&speed_at)?;
        repair_overlaps(&mut drafts)?;

        let segments: Vec<PathSegment> = drafts
            .into_iter()
            .map(|draft| draft.segment)
            .filter(|segment| segment.is_turn() || segment.length() > 1e-9)
            .collect();
        let track = Self::from_segments(PathKind::Track, segments, config);
        track.check_turns()?;
        track.check_continuity(config)?;

        info!(
            segments = track.segments.len(),
            turns = track.segments.iter().filter(|s| s.is_turn()).count(),
            length_m = track.length(),
            "Lateral track synthesized"
        );
        Ok(track)
    }

    fn from_segments(kind: PathKind, segments: Vec<PathSegment>, config: &TrackConfig) -> Self {
        let mut offsets = Vec::with_capacity(segments.len() + 1);
        let mut total = 0.0;
        offsets.push(total);
        for segment in &segments {
            total += segment.length();
            offsets.push(total);
        }
        Self {
            kind,
            segments,
            offsets,
            distance_epsilon_m: config.distance_epsilon_m,
        }
    }

    /// Every segment ends where the next begins.
    pub fn check_continuity(&self, config: &TrackConfig) -> Result<()> {
        for (index, pair) in self.segments.windows(2).enumerate() {
            let gap_m = distance(&pair[0].end(), &pair[1].start());
            if gap_m > config.continuity_tolerance_m {
                return Err(TrackError::Discontinuity { index, gap_m });
            }
        }
        Ok(())
    }

    /// Every turn has a positive radius and bends towards its apex.
    pub fn check_turns(&self) -> Result<()> {
        for (index, segment) in self.segments.iter().enumerate() {
            if let PathSegment::Turn(turn) = segment {
                if !turn.is_consistent() {
                    warn!(segment = index, radius_m = turn.radius_m, "Inconsistent turn segment");
                    return Err(TrackError::InconsistentTurn { index });
                }
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn length(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> Waypoint {
        self.segments
            .first()
            .map(PathSegment::start)
            .unwrap_or(Waypoint::new(0.0, 0.0))
    }

    pub fn end(&self) -> Waypoint {
        self.segments
            .last()
            .map(PathSegment::end)
            .unwrap_or(Waypoint::new(0.0, 0.0))
    }

    /// Distance from the path start to the start of segment `index`.
    pub fn segment_offset(&self, index: usize) -> f64 {
        self.offsets[index.min(self.segments.len())]
    }

    /// Index of the segment with the smallest error for `point`; ties go to
    /// the earlier segment.
    pub fn nearest_segment(&self, point: &Waypoint) -> usize {
        let mut best = 0;
        let mut best_error = f64::INFINITY;
        for (index, segment) in self.segments.iter().enumerate() {
            let error = segment.error(point);
            if error < best_error {
                best = index;
                best_error = error;
            }
        }
        best
    }

    /// The segment owning `point`.
    pub fn segment_at(&self, point: &Waypoint) -> &PathSegment {
        &self.segments[self.nearest_segment(point)]
    }

    /// Distance along the path from its start to the projection of `point`.
    pub fn offset_of(&self, point: &Waypoint) -> f64 {
        let index = self.nearest_segment(point);
        self.offsets[index] + self.segments[index].local_offset(point)
    }

    /// Signed distance along the path from `p1` to `p2`.
    pub fn path_distance(&self, p1: &Waypoint, p2: &Waypoint) -> f64 {
        let first = self.nearest_segment(p1);
        let second = self.nearest_segment(p2);
        let distance = if first == second {
            self.segments[first].distance_between(p1, p2)
        } else {
            let from = self.offsets[first] + self.segments[first].local_offset(p1);
            let to = self.offsets[second] + self.segments[second].local_offset(p2);
            to - from
        };
        self.snap(distance)
    }

    fn snap(&self, distance: f64) -> f64 {
        if distance.abs() < self.distance_epsilon_m {
            0.0
        } else {
            distance
        }
    }

    /// Point reached `distance_m` metres from `point`, forward when positive.
    /// Requests past either end clamp to that end.
    pub fn point_at_distance(&self, point: &Waypoint, distance_m: f64) -> Waypoint {
        self.position_at(self.offset_of(point) + distance_m)
    }

    /// Index of the segment containing path offset `distance_m` (clamped).
    pub fn segment_index_at_offset(&self, distance_m: f64) -> usize {
        if self.segments.is_empty() {
            return 0;
        }
        let upper = self.offsets.partition_point(|offset| *offset <= distance_m);
        upper.saturating_sub(1).min(self.segments.len() - 1)
    }

    /// Point at `distance_m` from the path start, clamped to the path.
    pub fn position_at(&self, distance_m: f64) -> Waypoint {
        if distance_m <= 0.0 {
            return self.start();
        }
        if distance_m >= self.length() {
            return self.end();
        }
        let index = self.segment_index_at_offset(distance_m);
        self.segments[index].point_at(distance_m - self.offsets[index])
    }

    /// Course of the path at `point`.
    pub fn course_at(&self, point: &Waypoint) -> f64 {
        self.segment_at(point).course_at(point)
    }

    /// Course of the path at offset `distance_m` from its start.
    pub fn course_at_offset(&self, distance_m: f64) -> f64 {
        let index = self.segment_index_at_offset(distance_m);
        let local = (distance_m - self.offsets[index]).max(0.0);
        let segment = &self.segments[index];
        segment.course_at(&segment.point_at(local))
    }

    /// Snap a point close to the path onto it.
    pub fn align_to_path(&self, point: &Waypoint) -> Waypoint {
        let index = self.nearest_segment(point);
        let segment = &self.segments[index];
        let mut aligned = segment.point_at(segment.local_offset(point));
        aligned.id = point.id;
        aligned
    }
}

/// A track segment under construction, remembering the course its plan
/// leg was authored with so reversals can be detected.
#[derive(Debug, Clone)]
struct DraftSegment {
    segment: PathSegment,
    plan_course: f64,
    junction: usize,
}

/// How a single junction is turned.
struct JunctionTurn {
    turn: TurnSegment,
    /// Plan legs consumed, counting the inbound leg
    consumed: usize,
}

struct TurnInserter<'a> {
    legs: &'a [StraightSegment],
    config: &'a TrackConfig,
}

impl<'a> TurnInserter<'a> {
    fn new(legs: &'a [StraightSegment], config: &'a TrackConfig) -> Self {
        Self { legs, config }
    }

    fn run<F>(&self, speed_at: &F) -> Result<Vec<DraftSegment>>
    where
        F: Fn(&Waypoint) -> f64,
    {
        let legs = self.legs;
        let mut drafts = Vec::with_capacity(legs.len() * 2);
        let mut current = legs[0].clone();
        let mut current_course = legs[0].course();
        let mut i = 0;

        while i + 1 < legs.len() {
            let inbound = legs[i].final_course();
            let outbound = legs[i + 1].course();
            let delta = course_change(inbound, outbound);
            if delta.abs() <= self.config.course_epsilon_deg {
                drafts.push(DraftSegment {
                    segment: PathSegment::Straight(current),
                    plan_course: current_course,
                    junction: i,
                });
                current = legs[i + 1].clone();
                current_course = legs[i + 1].course();
                i += 1;
                continue;
            }

            let junction = legs[i].end;
            let speed = speed_at(&junction);
            let planned = self.turn_at(i, inbound, delta, speed)?;
            debug!(
                junction = i,
                speed_mps = speed,
                radius_m = planned.turn.radius_m,
                sweep_deg = planned.turn.sweep_deg(),
                consumed = planned.consumed,
                "Inserted turn"
            );

            current.end = planned.turn.start;
            drafts.push(DraftSegment {
                segment: PathSegment::Straight(current),
                plan_course: current_course,
                junction: i,
            });
            let next_leg = &legs[i + planned.consumed];
            current = StraightSegment::new(planned.turn.end, next_leg.end);
            current_course = next_leg.course();
            drafts.push(DraftSegment {
                plan_course: planned.turn.course_start,
                segment: PathSegment::Turn(planned.turn),
                junction: i,
            });
            i += planned.consumed;
        }

        drafts.push(DraftSegment {
            segment: PathSegment::Straight(current),
            plan_course: current_course,
            junction: i,
        });
        Ok(drafts)
    }

    fn turn_at(&self, i: usize, inbound: f64, delta: f64, speed: f64) -> Result<JunctionTurn> {
        let junction = self.legs[i].end;

        if speed < self.config.taxi_speed_threshold_mps {
            if let Some(chord) = self.taxi_chord_turn(i)? {
                return Ok(chord);
            }
            let radius = self.config.taxi_turn_radius_m;
            return Ok(JunctionTurn {
                turn: self.corner_turn(&junction, inbound, delta, radius),
                consumed: 1,
            });
        }

        let radius = self.banked_radius(speed, delta.abs());
        Ok(JunctionTurn {
            turn: self.corner_turn(&junction, inbound, delta, radius),
            consumed: 1,
        })
    }

    /// Turn tangent to both legs of the corner at `junction`, or the
    /// explicit center construction for a course reversal.
    fn corner_turn(
        &self,
        junction: &Waypoint,
        inbound: f64,
        delta: f64,
        radius: f64,
    ) -> TurnSegment {
        if delta.abs() >= U_TURN_SWEEP_DEG {
            return TurnSegment::new(
                *junction,
                inbound,
                radius,
                180.0,
                self.config.u_turn_direction,
            );
        }
        let leg = radius * (delta.abs().to_radians() / 2.0).tan();
        let start = destination(junction, -leg, inbound);
        TurnSegment::new(
            start,
            inbound,
            radius,
            delta.abs(),
            TurnDirection::from_course_change(delta),
        )
    }

    /// Radius from the bank angle for `speed`, reduced once when the roll-in
    /// cannot reach that bank within the turn leg.
    fn banked_radius(&self, speed: f64, sweep_deg: f64) -> f64 {
        let config = self.config;
        let radius_for = |bank_deg: f64| {
            speed * speed / (config.gravity_mps2 * bank_deg.to_radians().tan())
        };
        let half_sweep = (sweep_deg.min(U_TURN_SWEEP_DEG).to_radians() / 2.0).tan();

        let bank = config.bank_angle_deg(speed).max(config.min_bank_angle_deg);
        let roll_rate = config.roll_rate_dps(speed).max(0.1);
        let radius = radius_for(bank);
        let leg = radius * half_sweep;

        let roll_in_distance = speed * bank / roll_rate;
        if roll_in_distance <= leg || sweep_deg >= U_TURN_SWEEP_DEG {
            return radius;
        }

        let linear_bank = roll_rate * leg / speed;
        let reduced = curve::accelerate(bank, linear_bank, config.roll_in_slope)
            .max(config.min_bank_angle_deg);
        debug!(
            bank_deg = bank,
            reduced_deg = reduced,
            "Bank angle reduced to fit turn leg"
        );
        radius_for(reduced)
    }

    /// Ground turn through authored turn points: leg `i` arrives at the
    /// turn start, leg `i + 1` is the chord, leg `i + 2` leaves from the
    /// turn end.
    fn taxi_chord_turn(&self, i: usize) -> Result<Option<JunctionTurn>> {
        let legs = self.legs;
        if i + 2 >= legs.len() {
            return Ok(None);
        }
        let chord = &legs[i + 1];
        let chord_length = chord.length();
        if chord_length > self.config.taxi_chord_max_m || chord_length <= 1e-6 {
            return Ok(None);
        }

        let inbound = legs[i].final_course();
        let outbound = legs[i + 2].course();
        let delta = course_change(inbound, outbound);
        if delta.abs() <= self.config.course_epsilon_deg || delta.abs() >= U_TURN_SWEEP_DEG {
            return Ok(None);
        }

        let turn_start = chord.start;
        let turn_end = chord.end;
        let bound = self.config.taxi_apex_bound_factor * chord_length;
        let candidates = [
            (inbound, outbound + 180.0),
            (inbound + 180.0, outbound + 180.0),
            (inbound, outbound),
        ];

        for (attempt, (bearing_from_start, bearing_from_end)) in candidates.iter().enumerate() {
            let Some(apex) =
                intersection(&turn_start, *bearing_from_start, &turn_end, *bearing_from_end)
            else {
                continue;
            };
            let to_start = distance(&apex, &turn_start);
            let to_end = distance(&apex, &turn_end);
            if to_start > bound || to_end > bound {
                continue;
            }
            let leg = to_start.min(to_end);
            if leg <= 1e-3 {
                continue;
            }

            let radius = leg / (delta.abs().to_radians() / 2.0).tan();
            let start = destination(&apex, -leg, inbound);
            let turn = TurnSegment::new(
                start,
                inbound,
                radius,
                delta.abs(),
                TurnDirection::from_course_change(delta),
            );
            debug!(junction = i, attempt, radius_m = radius, "Ground turn from authored points");
            return Ok(Some(JunctionTurn { turn, consumed: 2 }));
        }

        warn!(junction = i, "No usable intersection for ground turn");
        Err(TrackError::AmbiguousIntersection { junction: i })
    }
}

/// Repair straights that two neighbouring turns have eaten through.
fn repair_overlaps(drafts: &mut [DraftSegment]) -> Result<()> {
    for k in 0..drafts.len() {
        let PathSegment::Straight(leg) = &drafts[k].segment else {
            continue;
        };
        if leg.length() <= 1e-6 {
            continue;
        }
        let reversed = course_change(drafts[k].plan_course, leg.course()).abs() > 90.0;
        if !reversed {
            continue;
        }

        let junction = drafts[k].junction;
        let last = drafts.len() - 1;
        if k == 0 || k == last {
            warn!(segment = k, "Turn overruns the path boundary");
            return Err(TrackError::TurnExceedsPath { junction });
        }
        let (Some(before), Some(after)) = (
            drafts[k - 1].segment.as_turn().cloned(),
            drafts[k + 1].segment.as_turn().cloned(),
        ) else {
            return Err(TrackError::TurnExceedsPath { junction });
        };

        if before.direction == after.direction {
            warn!(segment = k, "Overlapping turns curve the same direction");
            return Err(TrackError::SameDirectionTurns { segment: k });
        }

        let Some((exit, entry)) = inner_tangent(&before, &after) else {
            warn!(segment = k, "Overlapping turns have no common tangent");
            return Err(TrackError::NoCommonTangent { segment: k });
        };

        let mut before = before;
        let mut after = after;
        before.recut_end(exit);
        after.recut_start(entry);
        if before.sweep_deg() >= 360.0 - 1e-6 || after.sweep_deg() >= 360.0 - 1e-6 {
            return Err(TrackError::NoCommonTangent { segment: k });
        }
        debug!(
            segment = k,
            exit_sweep_deg = before.sweep_deg(),
            entry_sweep_deg = after.sweep_deg(),
            "Re-cut overlapping turns to common tangent"
        );

        let bridge = StraightSegment::new(exit, entry);
        drafts[k].plan_course = bridge.course();
        drafts[k].segment = PathSegment::Straight(bridge);
        drafts[k - 1].segment = PathSegment::Turn(before);
        drafts[k + 1].segment = PathSegment::Turn(after);
    }
    Ok(())
}

/// Tangent points of the line leaving `first` and entering `second` when
/// the two turns rotate in opposite directions.
fn inner_tangent(first: &TurnSegment, second: &TurnSegment) -> Option<(Waypoint, Waypoint)> {
    let d1 = first.direction.sign();
    let d2 = second.direction.sign();
    let r1 = first.radius_m;
    let r2 = second.radius_m;

    let centers = distance(&first.center, &second.center);
    let offset = d2 * r2 - d1 * r1;
    if centers <= offset.abs() {
        return None;
    }
    let along = (centers * centers - offset * offset).sqrt();
    let course = initial_bearing(&first.center, &second.center) - offset.atan2(along).to_degrees();

    let radial = |sign: f64| if sign > 0.0 { course - 90.0 } else { course + 90.0 };
    let exit = destination(&first.center, r1, radial(d1));
    let entry = destination(&second.center, r2, radial(d2));
    Some((exit, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::haversine_distance;

    fn config() -> TrackConfig {
        TrackConfig::default()
    }

    fn origin() -> Waypoint {
        Waypoint::with_id(1, 47.0, 8.0)
    }

    fn l_shape(leg_m: f64) -> Vec<Waypoint> {
        let a = origin();
        let b = destination(&a, leg_m, 0.0);
        let c = destination(&b, leg_m, 90.0);
        vec![a, b, c]
    }

    #[test]
    fn plan_requires_two_distinct_points() {
        let a = origin();
        let err = LateralPath::plan(&[a, a], &config()).unwrap_err();
        assert_eq!(err, TrackError::TooFewWaypoints(1));
    }

    #[test]
    fn straight_plan_queries() {
        let a = Waypoint::with_id(1, 33.6846, -117.8265);
        let b = Waypoint::with_id(2, 33.7000, -117.8000);
        let plan = LateralPath::plan(&[a, b], &config()).unwrap();
        let expected = haversine_distance(a.lat, a.lon, b.lat, b.lon);
        assert!((plan.length() - expected).abs() < 1e-6);
        assert_eq!(plan.position_at(0.0), a);
        assert_eq!(plan.position_at(plan.length()), b);
        assert_eq!(plan.position_at(-10.0), a);
        assert_eq!(plan.position_at(plan.length() + 10.0), b);
        assert!((plan.path_distance(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn path_distance_crosses_segments() {
        let points = l_shape(1_000.0);
        let plan = LateralPath::plan(&points, &config()).unwrap();
        let p = plan.position_at(400.0);
        let q = plan.position_at(1_700.0);
        assert!((plan.path_distance(&p, &q) - 1_300.0).abs() < 1e-3);
        assert!((plan.path_distance(&q, &p) + 1_300.0).abs() < 1e-3);
        assert_eq!(plan.path_distance(&p, &p), 0.0);
    }

    #[test]
    fn point_at_distance_clamps() {
        let plan = LateralPath::plan(&l_shape(500.0), &config()).unwrap();
        let start = plan.start();
        assert_eq!(plan.point_at_distance(&start, -50.0), start);
        assert_eq!(plan.point_at_distance(&start, 5_000.0), plan.end());
        let reached = plan.point_at_distance(&start, 750.0);
        assert!((plan.offset_of(&reached) - 750.0).abs() < 1e-3);
    }

    #[test]
    fn align_snaps_nearby_point() {
        let plan = LateralPath::plan(&l_shape(500.0), &config()).unwrap();
        let on_path = plan.position_at(200.0);
        let off_path = Waypoint { id: Some(9), ..destination(&on_path, 3.0, 90.0) };
        let aligned = plan.align_to_path(&off_path);
        assert!(distance(&aligned, &on_path) < 1e-3);
        assert_eq!(aligned.id, Some(9));
    }

    #[test]
    fn taxi_turn_inserted_between_shortened_legs() {
        let points = l_shape(500.0);
        let plan = LateralPath::plan(&points, &config()).unwrap();
        let track = LateralPath::track_with(&plan, |_| 5.0, &config()).unwrap();

        let segments = track.segments();
        assert_eq!(segments.len(), 3);
        assert!(!segments[0].is_turn());
        assert!(segments[1].is_turn());
        assert!(!segments[2].is_turn());

        let radius = config().taxi_turn_radius_m;
        let arc = radius * std::f64::consts::FRAC_PI_2;
        let cut = 2.0 * radius - arc;
        assert!((segments[0].length() - (500.0 - radius)).abs() < 0.05);
        assert!((segments[2].length() - (500.0 - radius)).abs() < 0.05);
        assert!((track.length() - (plan.length() - cut)).abs() < 0.1);
        track.check_continuity(&config()).unwrap();
    }

    #[test]
    fn banked_turn_grows_with_speed() {
        let plan = LateralPath::plan(&l_shape(20_000.0), &config()).unwrap();
        let slow = LateralPath::track_with(&plan, |_| 60.0, &config()).unwrap();
        let fast = LateralPath::track_with(&plan, |_| 120.0, &config()).unwrap();
        let slow_radius = slow.segments()[1].as_turn().unwrap().radius_m;
        let fast_radius = fast.segments()[1].as_turn().unwrap().radius_m;
        assert!(fast_radius > slow_radius * 2.0);
    }

    #[test]
    fn shallow_turn_reduces_bank() {
        let config = config();
        let inserter_legs = [
            StraightSegment::new(origin(), destination(&origin(), 10_000.0, 0.0)),
        ];
        let inserter = TurnInserter::new(&inserter_legs, &config);
        let speed = 100.0;
        let full_bank = config.bank_angle_deg(speed);
        let full_radius = speed * speed / (config.gravity_mps2 * full_bank.to_radians().tan());
        // 2 degree course change leaves a very short turn leg.
        let radius = inserter.banked_radius(speed, 2.0);
        assert!(radius > full_radius);
    }

    #[test]
    fn u_turn_uses_center_construction() {
        let a = origin();
        let b = destination(&a, 1_000.0, 0.0);
        let c = destination(&b, 1_000.0, 180.0);
        let plan = LateralPath::plan(&[a, b, c], &config()).unwrap();
        let track = LateralPath::track_with(&plan, |_| 5.0, &config()).unwrap();
        let turn = track.segments()[1].as_turn().expect("u-turn segment");
        assert!(turn.is_u_turn());
        assert_eq!(turn.start, b);
        assert!((distance(&turn.start, &turn.end) - 2.0 * config().taxi_turn_radius_m).abs() < 1e-3);
        track.check_continuity(&config()).unwrap();
    }

    #[test]
    fn taxi_chord_turn_consumes_authored_points() {
        let a = origin();
        let b = destination(&a, 300.0, 0.0);
        // Turn start and end 30 m apart around a 90 degree corner.
        let corner = destination(&b, 21.213, 0.0);
        let c = destination(&corner, 21.213, 90.0);
        let d = destination(&c, 300.0, 90.0);
        let plan = LateralPath::plan(&[a, b, c, d], &config()).unwrap();
        let track = LateralPath::track_with(&plan, |_| 5.0, &config()).unwrap();

        let turns: Vec<&TurnSegment> = track.segments().iter().filter_map(|s| s.as_turn()).collect();
        assert_eq!(turns.len(), 1);
        assert_eq!(track.segments().len(), 3);
        assert!((turns[0].radius_m - 21.213).abs() < 0.05);
        assert!(distance(&turns[0].start, &b) < 0.05);
    }

    #[test]
    fn opposite_turns_recut_to_tangent() {
        // Right then left with a 30 m connecting leg and 25 m radii overlap.
        let a = origin();
        let b = destination(&a, 500.0, 0.0);
        let c = destination(&b, 30.0, 90.0);
        let d = destination(&c, 500.0, 0.0);
        let mut config = config();
        config.taxi_chord_max_m = 0.0;
        let plan = LateralPath::plan(&[a, b, c, d], &config).unwrap();
        let track = LateralPath::track_with(&plan, |_| 5.0, &config).unwrap();

        assert_eq!(track.segments().len(), 5);
        let bridge = &track.segments()[2];
        assert!(!bridge.is_turn());
        let first = track.segments()[1].as_turn().unwrap();
        let second = track.segments()[3].as_turn().unwrap();
        assert!(first.sweep_deg() < 90.0);
        assert!((first.course_end - second.course_start).abs() < 1e-3);
        track.check_turns().unwrap();
        track.check_continuity(&config).unwrap();
    }

    #[test]
    fn degenerate_turns_fail_validation() {
        let a = origin();
        let b = destination(&a, 500.0, 0.0);
        let leg = PathSegment::straight(a, b);

        let pinned = TurnSegment::new(b, 0.0, 0.0, 90.0, TurnDirection::Right);
        let track = LateralPath::from_segments(PathKind::Track, vec![leg.clone(), PathSegment::Turn(pinned)], &config());
        assert_eq!(track.check_turns(), Err(TrackError::InconsistentTurn { index: 1 }));

        let collapsed = TurnSegment::new(b, 0.0, 50.0, 0.0, TurnDirection::Left);
        let track = LateralPath::from_segments(PathKind::Track, vec![leg.clone(), PathSegment::Turn(collapsed)], &config());
        assert_eq!(track.check_turns(), Err(TrackError::InconsistentTurn { index: 1 }));

        let good = TurnSegment::new(b, 0.0, 50.0, 90.0, TurnDirection::Left);
        let track = LateralPath::from_segments(PathKind::Track, vec![leg, PathSegment::Turn(good)], &config());
        track.check_turns().unwrap();
    }

    #[test]
    fn same_direction_overlap_is_rejected() {
        let a = origin();
        let b = destination(&a, 500.0, 0.0);
        let c = destination(&b, 20.0, 90.0);
        let d = destination(&c, 500.0, 180.0);
        let mut config = config();
        config.taxi_chord_max_m = 0.0;
        let plan = LateralPath::plan(&[a, b, c, d], &config).unwrap();
        let err = LateralPath::track_with(&plan, |_| 5.0, &config).unwrap_err();
        assert_eq!(err, TrackError::SameDirectionTurns { segment: 2 });
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn zigzag() -> LateralPath {
            let a = origin();
            let b = destination(&a, 2_000.0, 30.0);
            let c = destination(&b, 1_500.0, 100.0);
            let d = destination(&c, 2_500.0, 20.0);
            let plan = LateralPath::plan(&[a, b, c, d], &TrackConfig::default()).unwrap();
            LateralPath::track_with(&plan, |_| 40.0, &TrackConfig::default()).unwrap()
        }

        proptest! {
            #[test]
            fn distance_is_antisymmetric(f1 in 0.0..1.0_f64, f2 in 0.0..1.0_f64) {
                let track = zigzag();
                let p = track.position_at(f1 * track.length());
                let q = track.position_at(f2 * track.length());
                let forward = track.path_distance(&p, &q);
                let backward = track.path_distance(&q, &p);
                prop_assert!((forward + backward).abs() < 1e-6);
            }

            #[test]
            fn point_at_distance_round_trips(f1 in 0.0..1.0_f64, f2 in 0.0..1.0_f64) {
                let track = zigzag();
                let p = track.position_at(f1 * track.length());
                let q = track.position_at(f2 * track.length());
                let reached = track.point_at_distance(&p, track.path_distance(&p, &q));
                prop_assert!(distance(&reached, &q) < 0.01);
            }
        }
    }
}
