use super::assignment::LaneAssignments;
use crate::math::{element_polygon, heading_vector, rot90, Aabb, PiecewiseCubic, Point2d};
use crate::util::Interval;
use crate::{BoundaryId, LaneId, MarkingId, RoadId, SectionId, SignId, TrafficLightId};
use cgmath::prelude::*;
use geo::Polygon;
use serde::{Deserialize, Serialize};
use slotmap::Key;
use smallvec::SmallVec;

/// The function of a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneType {
    Driving,
    Stop,
    Shoulder,
    Biking,
    Sidewalk,
    Border,
    Restricted,
    Parking,
    Curb,
    Median,
    Entry,
    Exit,
    OnRamp,
    OffRamp,
    ConnectingRamp,
    None,
}

impl LaneType {
    /// Whether vehicles may drive on lanes of this type.
    pub fn is_drivable(self) -> bool {
        use LaneType::*;
        matches!(
            self,
            Driving | Median | Exit | Entry | OnRamp | OffRamp | ConnectingRamp
        )
    }
}

/// A sample of a lane's geometry at one s-offset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometryJoint {
    /// The s-offset along the road, in m.
    pub s: f64,
    pub left: Point2d,
    pub centre: Point2d,
    pub right: Point2d,
    /// The curvature of the lane centre, in 1/m.
    pub curvature: f64,
    /// The heading of the lane centre, in rad.
    pub heading: f64,
    /// The elevation of the road surface, in m.
    pub elevation: f64,
}

/// The quadrilateral between two consecutive geometry joints.
#[derive(Clone, Debug)]
pub struct LaneElement {
    /// Index of the joint at the start of the element.
    pub joint: usize,
    pub polygon: Polygon<f64>,
    pub bounds: Aabb,
}

/// A lane represents a single strip of road surface within a section.
#[derive(Clone, Debug)]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The road the lane belongs to.
    road: RoadId,
    /// The section the lane belongs to.
    section: SectionId,
    /// The authoring-time lane index; negative lanes lie to the right of the reference line.
    signed_id: i32,
    lane_type: LaneType,
    /// Width polynomials, relative to the start of the section.
    widths: PiecewiseCubic,
    /// The sampled geometry, strictly ordered by s.
    joints: Vec<LaneGeometryJoint>,
    /// Polygons between consecutive joints.
    elements: Vec<LaneElement>,
    /// The bounding box of all elements.
    bounds: Option<Aabb>,
    /// The lane to the left, or the null key.
    left: LaneId,
    /// The lane to the right, or the null key.
    right: LaneId,
    left_boundaries: Vec<BoundaryId>,
    right_boundaries: Vec<BoundaryId>,
    /// Lanes following this one in the direction of increasing s.
    next: SmallVec<[LaneId; 2]>,
    /// Lanes preceding this one in the direction of increasing s.
    previous: SmallVec<[LaneId; 2]>,
    /// The objects currently overlapping the lane.
    assignments: LaneAssignments,
    signs: Vec<SignId>,
    lights: Vec<TrafficLightId>,
    markings: Vec<MarkingId>,
}

/// Reasons a lane edge may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkRejection {
    SelfReference,
    Duplicate,
}

impl Lane {
    /// Creates a new lane without geometry or neighbours.
    pub(crate) fn new(
        id: LaneId,
        road: RoadId,
        section: SectionId,
        signed_id: i32,
        lane_type: LaneType,
        widths: PiecewiseCubic,
    ) -> Self {
        Self {
            id,
            road,
            section,
            signed_id,
            lane_type,
            widths,
            joints: vec![],
            elements: vec![],
            bounds: None,
            left: LaneId::default(),
            right: LaneId::default(),
            left_boundaries: vec![],
            right_boundaries: vec![],
            next: SmallVec::new(),
            previous: SmallVec::new(),
            assignments: LaneAssignments::default(),
            signs: vec![],
            lights: vec![],
            markings: vec![],
        }
    }

    /// Gets the lane's ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn road(&self) -> RoadId {
        self.road
    }

    pub fn section(&self) -> SectionId {
        self.section
    }

    /// The authoring-time lane index.
    pub fn signed_id(&self) -> i32 {
        self.signed_id
    }

    pub fn lane_type(&self) -> LaneType {
        self.lane_type
    }

    pub(crate) fn widths(&self) -> &PiecewiseCubic {
        &self.widths
    }

    /// The neighbouring lane to the left, if there is one.
    pub fn left(&self) -> Option<LaneId> {
        Some(self.left).filter(|id| !id.is_null())
    }

    /// The neighbouring lane to the right, if there is one.
    pub fn right(&self) -> Option<LaneId> {
        Some(self.right).filter(|id| !id.is_null())
    }

    pub fn left_boundaries(&self) -> &[BoundaryId] {
        &self.left_boundaries
    }

    pub fn right_boundaries(&self) -> &[BoundaryId] {
        &self.right_boundaries
    }

    pub fn next(&self) -> &[LaneId] {
        &self.next
    }

    pub fn previous(&self) -> &[LaneId] {
        &self.previous
    }

    /// The successors in the given travel direction along the road.
    pub fn downstream(&self, in_road_direction: bool) -> &[LaneId] {
        if in_road_direction {
            &self.next
        } else {
            &self.previous
        }
    }

    pub fn joints(&self) -> &[LaneGeometryJoint] {
        &self.joints
    }

    pub fn elements(&self) -> &[LaneElement] {
        &self.elements
    }

    pub(crate) fn bounds(&self) -> Option<&Aabb> {
        self.bounds.as_ref()
    }

    pub fn assignments(&self) -> &LaneAssignments {
        &self.assignments
    }

    pub(crate) fn assignments_mut(&mut self) -> &mut LaneAssignments {
        &mut self.assignments
    }

    pub fn signs(&self) -> &[SignId] {
        &self.signs
    }

    pub fn traffic_lights(&self) -> &[TrafficLightId] {
        &self.lights
    }

    pub fn road_markings(&self) -> &[MarkingId] {
        &self.markings
    }

    /// The s-offset range covered by the lane's geometry.
    pub fn range(&self) -> Interval<f64> {
        match (self.joints.first(), self.joints.last()) {
            (Some(first), Some(last)) => Interval::new(first.s, last.s),
            _ => Interval::new(0.0, 0.0),
        }
    }

    /// The length of the lane, in m.
    pub fn length(&self) -> f64 {
        self.range().length()
    }

    /// Whether the s-offset lies on the lane. Both ends are included.
    pub fn covers(&self, s: f64) -> bool {
        !self.joints.is_empty() && self.range().contains(s)
    }

    /// Appends a joint. Joints that do not advance along the lane are ignored.
    pub(crate) fn add_joint(&mut self, joint: LaneGeometryJoint) {
        if let Some(last) = self.joints.last() {
            if joint.s <= last.s {
                return;
            }
        }
        self.joints.push(joint);
    }

    /// Builds the element polygons from the sampled joints.
    pub(crate) fn build_elements(&mut self) {
        self.elements = self
            .joints
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| {
                let corners = [pair[0].left, pair[0].right, pair[1].right, pair[1].left];
                LaneElement {
                    joint: idx,
                    polygon: element_polygon(&corners),
                    bounds: Aabb::from_points(&corners),
                }
            })
            .collect();
        let corners = self
            .joints
            .iter()
            .flat_map(|j| [j.left, j.right])
            .collect::<Vec<_>>();
        self.bounds = (!corners.is_empty()).then(|| Aabb::from_points(&corners));
    }

    pub(crate) fn set_left(&mut self, lane: LaneId) {
        self.left = lane;
    }

    pub(crate) fn set_right(&mut self, lane: LaneId) {
        self.right = lane;
    }

    pub(crate) fn left_boundaries_mut(&mut self) -> &mut Vec<BoundaryId> {
        &mut self.left_boundaries
    }

    pub(crate) fn right_boundaries_mut(&mut self) -> &mut Vec<BoundaryId> {
        &mut self.right_boundaries
    }

    /// Adds a successor lane.
    pub(crate) fn add_next(&mut self, lane: LaneId) -> Result<(), LinkRejection> {
        Self::add_link(self.id, &mut self.next, lane)
    }

    /// Adds a predecessor lane.
    pub(crate) fn add_previous(&mut self, lane: LaneId) -> Result<(), LinkRejection> {
        Self::add_link(self.id, &mut self.previous, lane)
    }

    fn add_link(
        own: LaneId,
        links: &mut SmallVec<[LaneId; 2]>,
        lane: LaneId,
    ) -> Result<(), LinkRejection> {
        if lane == own {
            return Err(LinkRejection::SelfReference);
        }
        if links.contains(&lane) {
            return Err(LinkRejection::Duplicate);
        }
        links.push(lane);
        Ok(())
    }

    pub(crate) fn add_sign(&mut self, sign: SignId) {
        self.signs.push(sign);
    }

    pub(crate) fn add_traffic_light(&mut self, light: TrafficLightId) {
        self.lights.push(light);
    }

    pub(crate) fn add_road_marking(&mut self, marking: MarkingId) {
        self.markings.push(marking);
    }

    /// Finds the joints either side of `s` and the interpolation factor between them.
    fn bracket(&self, s: f64) -> Option<(&LaneGeometryJoint, &LaneGeometryJoint, f64)> {
        if !self.covers(s) {
            return None;
        }
        let idx = self.joints.partition_point(|j| j.s <= s);
        let prev = &self.joints[idx.saturating_sub(1)];
        let next = self.joints.get(idx).unwrap_or(prev);
        let span = next.s - prev.s;
        let f = if span > 0.0 { (s - prev.s) / span } else { 0.0 };
        Some((prev, next, f))
    }

    /// The lane width at `s`, in m.
    pub fn width_at(&self, s: f64) -> Option<f64> {
        self.bracket(s).map(|(a, b, f)| {
            let wa = (a.left - a.right).magnitude();
            let wb = (b.left - b.right).magnitude();
            wa + f * (wb - wa)
        })
    }

    /// The curvature of the lane centre at `s`, in 1/m.
    pub fn curvature_at(&self, s: f64) -> Option<f64> {
        self.bracket(s)
            .map(|(a, b, f)| a.curvature + f * (b.curvature - a.curvature))
    }

    /// The heading of the lane at `s`, taken from the joint at or before `s`.
    pub fn direction_at(&self, s: f64) -> Option<f64> {
        self.bracket(s).map(|(a, _, _)| a.heading)
    }

    /// Maps a world point into the (s, t) frame of a geometry element.
    ///
    /// The element is treated as linear in s between its joints, and points beyond the
    /// ends of the element extrapolate past them. `t` is measured from the lane centre,
    /// positive to the left.
    pub fn element_coordinates(&self, element: &LaneElement, point: Point2d) -> (f64, f64) {
        let (a, b) = (&self.joints[element.joint], &self.joints[element.joint + 1]);
        let axis = b.centre - a.centre;
        let len2 = axis.magnitude2();
        if len2 <= f64::EPSILON {
            return (a.s, (point - a.centre).magnitude());
        }
        let rel = point - a.centre;
        let f = rel.dot(axis) / len2;
        let t = axis.perp_dot(rel) / len2.sqrt();
        (a.s + f * (b.s - a.s), t)
    }

    /// The world position at `s` offset laterally by `t` from the lane centre.
    pub fn interpolate(&self, s: f64, t: f64) -> Option<Point2d> {
        let (a, b, f) = self.bracket(s)?;
        let centre = a.centre + (b.centre - a.centre) * f;
        let across = (a.left - a.right) + ((b.left - b.right) - (a.left - a.right)) * f;
        let normal = if across.magnitude2() > 1e-12 {
            across.normalize()
        } else {
            rot90(heading_vector(a.heading))
        };
        Some(centre + normal * t)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use slotmap::SlotMap;

    fn straight_lane(length: usize) -> Lane {
        let mut ids = SlotMap::<LaneId, ()>::with_key();
        let id = ids.insert(());
        let mut lane = Lane::new(
            id,
            RoadId::default(),
            SectionId::default(),
            -1,
            LaneType::Driving,
            PiecewiseCubic::default(),
        );
        for i in 0..=length {
            let s = i as f64;
            lane.add_joint(LaneGeometryJoint {
                s,
                left: Point2d::new(s, 0.0),
                centre: Point2d::new(s, -1.5),
                right: Point2d::new(s, -3.0),
                curvature: 0.0,
                heading: 0.0,
                elevation: 0.0,
            });
        }
        lane.build_elements();
        lane
    }

    #[test]
    fn covers_upper_boundary() {
        let lane = straight_lane(10);
        assert!(lane.covers(0.0));
        assert!(lane.covers(10.0));
        assert!(!lane.covers(11.0));
        assert!(!lane.covers(-1.0));
    }

    #[test]
    fn joints_strictly_ordered() {
        let mut lane = straight_lane(3);
        let mut duplicate = lane.joints()[3];
        lane.add_joint(duplicate);
        duplicate.s = 2.5;
        lane.add_joint(duplicate);
        assert_eq!(lane.joints().len(), 4);
        assert_eq!(lane.elements().len(), 3);
    }

    #[test]
    fn interpolation() {
        let lane = straight_lane(10);
        assert_approx_eq!(lane.width_at(4.5).unwrap(), 3.0);
        assert_approx_eq!(lane.curvature_at(4.5).unwrap(), 0.0);
        assert_approx_eq!(lane.direction_at(9.9).unwrap(), 0.0);
        let p = lane.interpolate(2.5, 1.0).unwrap();
        assert_approx_eq!(p.x, 2.5);
        assert_approx_eq!(p.y, -0.5);
        assert!(lane.width_at(10.5).is_none());
    }

    #[test]
    fn element_frame() {
        let lane = straight_lane(10);
        let element = &lane.elements()[3];
        let (s, t) = lane.element_coordinates(element, Point2d::new(3.25, -1.0));
        assert_approx_eq!(s, 3.25);
        assert_approx_eq!(t, 0.5);
        let (s, t) = lane.element_coordinates(element, Point2d::new(7.0, -1.5));
        assert_approx_eq!(s, 7.0);
        assert_approx_eq!(t, 0.0);
    }

    #[test]
    fn rejects_bad_links() {
        let mut lane = straight_lane(1);
        let own = lane.id();
        assert_eq!(lane.add_next(own), Err(LinkRejection::SelfReference));
        let mut ids = SlotMap::<LaneId, ()>::with_key();
        let _ = ids.insert(());
        let other = ids.insert(());
        assert!(lane.add_next(other).is_ok());
        assert_eq!(lane.add_next(other), Err(LinkRejection::Duplicate));
        assert!(lane.add_previous(other).is_ok());
    }
}
