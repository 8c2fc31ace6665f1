use super::{Obstruction, Route};
use crate::math::{heading_vector, Point2d};
use crate::network::{Assignment, Lane, LaneType, RoadNetwork};
use crate::object::{ObjectId, ObjectKind, Placed, RoadPosition};
use crate::util::Interval;
use crate::{BoundaryId, LaneId, MarkingId, RoadId, SignId};
use cgmath::prelude::*;
use std::collections::HashSet;
use std::f64::consts::PI;

/// The most lanes a stream will follow in either direction.
const MAX_STREAM_LANES: usize = 1024;

/// A lane as part of a [LaneStream].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneStreamElement {
    pub lane: LaneId,
    pub road: RoadId,
    /// Whether the lane is travelled in the direction of increasing s.
    pub in_stream_direction: bool,
    /// The s-offsets covered by the lane, along its road.
    pub lane_range: Interval<f64>,
    /// The stream positions covered by the lane.
    pub stream_range: Interval<f64>,
}

impl LaneStreamElement {
    /// The stream position of an s-offset along the lane's road.
    pub fn stream_position(&self, s: f64) -> f64 {
        if self.in_stream_direction {
            self.stream_range.min + (s - self.lane_range.min)
        } else {
            self.stream_range.max - (s - self.lane_range.min)
        }
    }

    /// The s-offset along the lane's road of a stream position.
    pub fn road_s(&self, stream_position: f64) -> f64 {
        if self.in_stream_direction {
            self.lane_range.min + (stream_position - self.stream_range.min)
        } else {
            self.lane_range.min + (self.stream_range.max - stream_position)
        }
    }

    /// The stream positions covered by an s-offset range along the road, lowest first.
    pub fn stream_interval(&self, s: Interval<f64>) -> Interval<f64> {
        let (a, b) = (self.stream_position(s.min), self.stream_position(s.max));
        Interval::new(a.min(b), a.max(b))
    }
}

/// A lane type along a stream, starting at `start`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneTypeAt {
    pub start: f64,
    pub lane_type: LaneType,
}

/// A sign or marking found along a stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalHit<T> {
    pub id: T,
    /// Distance from the search position along the stream, negative when behind, in m.
    pub relative_distance: f64,
}

/// Which side of the stream to look for markings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A lane boundary found along a stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneMarkingHit {
    pub id: BoundaryId,
    /// Where the boundary starts and ends relative to the search position, in m.
    pub relative_range: Interval<f64>,
}

/// A route-aware sequence of lanes forming a single longitudinal coordinate frame.
///
/// Stream positions start at zero at the most upstream lane and increase in the
/// direction of travel, whichever way each lane's road runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaneStream {
    elements: Vec<LaneStreamElement>,
}

impl LaneStream {
    /// Builds the stream through `lane` following `route`.
    ///
    /// The stream extends upstream and downstream from `lane` until it runs off the
    /// route or the lanes end. It is empty if the lane's road is not on the route.
    pub fn new(network: &RoadNetwork, route: &Route, lane: LaneId) -> Self {
        let Some(start) = network.lane(lane) else {
            return Self::default();
        };
        let Some(index) = route.position_of(start.road()) else {
            return Self::default();
        };

        let mut upstream = vec![];
        let mut visited = HashSet::from([lane]);
        let (mut current, mut idx) = (start, index);
        while upstream.len() < MAX_STREAM_LANES {
            let in_dir = route.elements()[idx].in_road_direction;
            let Some((next, next_idx)) = step(network, route, current, idx, !in_dir, -1) else {
                break;
            };
            if !visited.insert(next.id()) {
                break;
            }
            upstream.push((next, next_idx));
            current = next;
            idx = next_idx;
        }

        let mut downstream = vec![(start, index)];
        let (mut current, mut idx) = (start, index);
        while downstream.len() < MAX_STREAM_LANES {
            let in_dir = route.elements()[idx].in_road_direction;
            let Some((next, next_idx)) = step(network, route, current, idx, in_dir, 1) else {
                break;
            };
            if !visited.insert(next.id()) {
                break;
            }
            downstream.push((next, next_idx));
            current = next;
            idx = next_idx;
        }

        let mut elements = vec![];
        let mut position = 0.0;
        for (lane, idx) in upstream.into_iter().rev().chain(downstream) {
            let range = lane.range();
            elements.push(LaneStreamElement {
                lane: lane.id(),
                road: lane.road(),
                in_stream_direction: route.elements()[idx].in_road_direction,
                lane_range: range,
                stream_range: Interval::new(position, position + range.length()),
            });
            position += range.length();
        }
        Self { elements }
    }

    pub fn elements(&self) -> &[LaneStreamElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The total length of the stream, in m.
    pub fn length(&self) -> f64 {
        self.elements.last().map_or(0.0, |el| el.stream_range.max)
    }

    /// The element containing a stream position.
    pub fn element_at(&self, stream_position: f64) -> Option<&LaneStreamElement> {
        self.elements
            .iter()
            .find(|el| el.stream_range.contains(stream_position))
    }

    /// Converts a lane-relative position into a stream position.
    pub fn stream_position(&self, lane: LaneId, s: f64) -> Option<f64> {
        self.elements
            .iter()
            .find(|el| el.lane == lane && el.lane_range.contains(s))
            .map(|el| el.stream_position(s))
    }

    /// Converts a stream position and a lateral offset into a lane-relative position.
    ///
    /// `t` is positive to the left of the direction of travel; it is negated on lanes
    /// travelled against their road. The heading is that of the stream relative to the lane.
    pub fn road_position(&self, stream_position: f64, t: f64) -> Option<RoadPosition> {
        let el = self.element_at(stream_position)?;
        let sign = if el.in_stream_direction { 1.0 } else { -1.0 };
        Some(RoadPosition {
            road: el.road,
            lane: el.lane,
            s: el.road_s(stream_position),
            t: sign * t,
            hdg: if el.in_stream_direction { 0.0 } else { PI },
        })
    }

    /// The lane types along the stream, merging consecutive lanes of the same type.
    pub fn lane_types(&self, network: &RoadNetwork) -> Vec<LaneTypeAt> {
        let mut types: Vec<LaneTypeAt> = vec![];
        for el in &self.elements {
            let Some(lane) = network.lane(el.lane) else {
                continue;
            };
            if types.last().map(|t| t.lane_type) != Some(lane.lane_type()) {
                types.push(LaneTypeAt {
                    start: el.stream_range.min,
                    lane_type: lane.lane_type(),
                });
            }
        }
        types
    }

    /// Finds the objects overlapping the stream between two stream positions.
    ///
    /// Objects are returned once each, in order of the stream position where they start.
    pub fn objects_in_range(&self, network: &RoadNetwork, start: f64, end: f64) -> Vec<ObjectId> {
        self.objects_of_kind_in_range(network, start, end, None)
    }

    /// Like [LaneStream::objects_in_range], keeping only objects of the given kind.
    ///
    /// # Parameters
    /// * `kind` - The kind of object to find, or `None` for every object
    pub fn objects_of_kind_in_range(
        &self,
        network: &RoadNetwork,
        start: f64,
        end: f64,
        kind: Option<ObjectKind>,
    ) -> Vec<ObjectId> {
        let mut found = vec![];
        for el in &self.elements {
            if el.stream_range.max < start {
                continue;
            }
            if el.stream_range.min > end {
                break;
            }
            let Some(lane) = network.lane(el.lane) else {
                continue;
            };
            for assignment in lane.assignments().ordered(el.in_stream_direction) {
                let range = el.stream_interval(overlap_range(assignment));
                if range.min > end {
                    break;
                }
                if range.max >= start
                    && is_of_kind(assignment, kind)
                    && !found.contains(&assignment.object)
                {
                    found.push(assignment.object);
                }
            }
        }
        found
    }

    /// The first object ahead of `position`, searching up to `max_search_length` along the stream.
    ///
    /// Lanes are searched in stream order; within the first lane holding a match, the
    /// object whose rear is furthest upstream wins.
    pub fn next_object(
        &self,
        network: &RoadNetwork,
        position: f64,
        max_search_length: f64,
        kind: Option<ObjectKind>,
    ) -> Option<ObjectId> {
        let end = position + max_search_length;
        for el in &self.elements {
            if el.stream_range.max < position {
                continue;
            }
            if el.stream_range.min > end {
                break;
            }
            let found = objects_within(network, el, position, end, kind)
                .min_by(|a, b| a.1.min.total_cmp(&b.1.min));
            if let Some((id, _)) = found {
                return Some(id);
            }
        }
        None
    }

    /// The last object before `position + max_search_length`, searching back to `position`.
    ///
    /// Lanes are searched against stream order; within the first lane holding a match,
    /// the object whose front is furthest downstream wins.
    pub fn last_object(
        &self,
        network: &RoadNetwork,
        position: f64,
        max_search_length: f64,
        kind: Option<ObjectKind>,
    ) -> Option<ObjectId> {
        let end = position + max_search_length;
        for el in self.elements.iter().rev() {
            if el.stream_range.min > end {
                continue;
            }
            if el.stream_range.max < position {
                break;
            }
            let found = objects_within(network, el, position, end, kind)
                .max_by(|a, b| a.1.max.total_cmp(&b.1.max));
            if let Some((id, _)) = found {
                return Some(id);
            }
        }
        None
    }

    /// The distance from `position` to where the stream stops being drivable by the
    /// allowed lane types.
    ///
    /// Returns infinity if the stream continues beyond `max_search_length`.
    pub fn distance_to_end_of_lane(
        &self,
        network: &RoadNetwork,
        position: f64,
        max_search_length: f64,
        allowed: &[LaneType],
    ) -> f64 {
        for el in &self.elements {
            if el.stream_range.max < position {
                continue;
            }
            let lane_type = network.lane(el.lane).map(|l| l.lane_type());
            if !lane_type.map_or(false, |t| allowed.contains(&t)) {
                return (el.stream_range.min - position).max(0.0);
            }
            if el.stream_range.max > position + max_search_length {
                return f64::INFINITY;
            }
        }
        (self.length() - position).max(0.0)
    }

    /// Elements overlapping the search window starting at `position`.
    ///
    /// A negative `range` searches backwards.
    fn window(
        &self,
        position: f64,
        range: f64,
    ) -> (Interval<f64>, impl Iterator<Item = &LaneStreamElement>) {
        let window = if range >= 0.0 {
            Interval::new(position, position + range)
        } else {
            Interval::new(position + range, position)
        };
        let elements = self
            .elements
            .iter()
            .filter(move |el| el.stream_range.overlaps(&window));
        (window, elements)
    }

    fn signals_in_range<T: Copy + PartialEq>(
        &self,
        position: f64,
        range: f64,
        ids_on_lane: impl Fn(LaneId) -> Vec<(T, f64)>,
    ) -> Vec<SignalHit<T>> {
        let (window, elements) = self.window(position, range);
        let mut hits: Vec<SignalHit<T>> = vec![];
        for el in elements {
            for (id, s) in ids_on_lane(el.lane) {
                if !el.lane_range.contains(s) || hits.iter().any(|h| h.id == id) {
                    continue;
                }
                let at = el.stream_position(s);
                if window.contains(at) {
                    hits.push(SignalHit {
                        id,
                        relative_distance: at - position,
                    });
                }
            }
        }
        hits.sort_by(|a, b| a.relative_distance.abs().total_cmp(&b.relative_distance.abs()));
        hits
    }

    /// The traffic signs along the stream within `range` of `position`, nearest first.
    pub fn traffic_signs_in_range(
        &self,
        network: &RoadNetwork,
        position: f64,
        range: f64,
    ) -> Vec<SignalHit<SignId>> {
        self.signals_in_range(position, range, |lane| {
            network
                .lane(lane)
                .map(Lane::signs)
                .unwrap_or_default()
                .iter()
                .filter_map(|id| network.sign(*id).map(|s| (*id, s.placement.s)))
                .collect()
        })
    }

    /// The road markings along the stream within `range` of `position`, nearest first.
    pub fn road_markings_in_range(
        &self,
        network: &RoadNetwork,
        position: f64,
        range: f64,
    ) -> Vec<SignalHit<MarkingId>> {
        self.signals_in_range(position, range, |lane| {
            network
                .lane(lane)
                .map(Lane::road_markings)
                .unwrap_or_default()
                .iter()
                .filter_map(|id| network.road_marking(*id).map(|m| (*id, m.placement.s)))
                .collect()
        })
    }

    /// The lane boundaries on one side of the stream within `range` of `position`.
    ///
    /// Boundaries are returned in order along the search direction.
    pub fn lane_markings_in_range(
        &self,
        network: &RoadNetwork,
        position: f64,
        range: f64,
        side: Side,
    ) -> Vec<LaneMarkingHit> {
        let (window, elements) = self.window(position, range);
        let mut hits: Vec<LaneMarkingHit> = vec![];
        for el in elements {
            let Some(lane) = network.lane(el.lane) else {
                continue;
            };
            let boundaries = match (side, el.in_stream_direction) {
                (Side::Left, true) | (Side::Right, false) => lane.left_boundaries(),
                (Side::Right, true) | (Side::Left, false) => lane.right_boundaries(),
            };
            for &id in boundaries {
                let Some(boundary) = network.boundary(id) else {
                    continue;
                };
                let on_lane = boundary.range().clamp_to(&el.lane_range);
                let at = el.stream_interval(on_lane);
                if !boundary.range().overlaps(&el.lane_range) || !at.overlaps(&window) {
                    continue;
                }
                let relative = Interval::new(at.min - position, at.max - position);
                match hits.iter_mut().find(|h| h.id == id) {
                    Some(hit) => hit.relative_range = hit.relative_range.union(&relative),
                    None => hits.push(LaneMarkingHit {
                        id,
                        relative_range: relative,
                    }),
                }
            }
        }
        if range < 0.0 {
            hits.reverse();
        }
        hits
    }

    /// How far another object intrudes laterally relative to a line along the stream.
    ///
    /// The line runs at lateral offset `t` from the centre of the stream's lanes,
    /// across the s-range the other object covers on the stream's roads. The result is
    /// invalid if the object does not lie on the stream.
    pub fn obstruction(&self, network: &RoadNetwork, t: f64, other: &impl Placed) -> Obstruction {
        let location = other.location();
        let mut first: Option<(Point2d, f64)> = None;
        let mut second: Option<Point2d> = None;
        for el in &self.elements {
            let Some(touched) = location.touched_roads.get(&el.road) else {
                continue;
            };
            let Some(lane) = network.lane(el.lane) else {
                continue;
            };
            let (s_first, s_second, lateral) = if el.in_stream_direction {
                (touched.min, touched.max, t)
            } else {
                (touched.max, touched.min, -t)
            };
            if first.is_none() && lane.covers(s_first) {
                let heading = lane.direction_at(s_first).unwrap_or(0.0)
                    + if el.in_stream_direction { 0.0 } else { PI };
                first = lane.interpolate(s_first, lateral).map(|p| (p, heading));
            }
            if second.is_none() && lane.covers(s_second) {
                second = lane.interpolate(s_second, lateral);
            }
            if first.is_some() && second.is_some() {
                break;
            }
        }
        let (Some((a, heading)), Some(mut b)) = (first, second) else {
            return Obstruction::invalid();
        };
        if (b - a).magnitude2() < 1e-12 {
            b = a + heading_vector(heading);
        }
        Obstruction::from_corners(&other.corners(), a, b)
    }
}

/// The lane following (`dir` = 1) or preceding (`dir` = -1) `lane` along the route.
///
/// Lanes on the same road are preferred; otherwise the stream moves to the adjacent
/// route element.
fn step<'a>(
    network: &'a RoadNetwork,
    route: &Route,
    lane: &Lane,
    idx: usize,
    in_road_direction: bool,
    dir: isize,
) -> Option<(&'a Lane, usize)> {
    let candidates = lane
        .downstream(in_road_direction)
        .iter()
        .filter_map(|id| network.lane(*id))
        .collect::<Vec<_>>();
    if let Some(next) = candidates.iter().find(|l| l.road() == lane.road()) {
        return Some((next, idx));
    }
    let next_idx = idx.checked_add_signed(dir)?;
    let next_road = route.elements().get(next_idx)?.road;
    candidates
        .into_iter()
        .find(|l| l.road() == next_road)
        .map(|l| (l, next_idx))
}

/// The objects of a lane lying strictly inside a stream range, with their stream ranges.
fn objects_within<'a>(
    network: &'a RoadNetwork,
    el: &'a LaneStreamElement,
    start: f64,
    end: f64,
    kind: Option<ObjectKind>,
) -> impl Iterator<Item = (ObjectId, Interval<f64>)> + 'a {
    network
        .lane(el.lane)
        .into_iter()
        .flat_map(|lane| lane.assignments().iter())
        .filter(move |a| is_of_kind(a, kind))
        .map(move |a| (a.object, el.stream_interval(overlap_range(a))))
        .filter(move |(_, range)| range.max > start && range.min < end)
}

/// The s-offsets an assignment covers on its lane.
fn overlap_range(assignment: &Assignment) -> Interval<f64> {
    Interval::new(assignment.overlap.s_min, assignment.overlap.s_max)
}

fn is_of_kind(assignment: &Assignment, kind: Option<ObjectKind>) -> bool {
    kind.map_or(true, |k| assignment.kind == k)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{OutOfRangePolicy, WorldConfig};
    use crate::converter::build_network;
    use crate::description::{
        GeometryDescription, LaneDescription, RoadDescription, RoadNetworkDescription,
        SectionDescription,
    };
    use crate::localization::locate;
    use crate::math::GeometryShape;
    use crate::object::{
        Dimension, MovingObject, MovingObjectAttributes, MovingObjectState, MovingObjectType,
    };
    use crate::query::RouteElement;
    use assert_approx_eq::assert_approx_eq;

    fn network() -> RoadNetwork {
        let desc = RoadNetworkDescription {
            roads: vec![RoadDescription {
                id: "r".into(),
                length: 100.0,
                geometries: vec![GeometryDescription {
                    s: 0.0,
                    x: 0.0,
                    y: 0.0,
                    hdg: 0.0,
                    length: 100.0,
                    shape: GeometryShape::Line,
                }],
                sections: vec![SectionDescription {
                    s: 0.0,
                    lanes: vec![LaneDescription::centre(), LaneDescription::driving(-1, 3.0)],
                }],
                ..Default::default()
            }],
            junctions: vec![],
        };
        build_network(&desc, &WorldConfig::default()).unwrap()
    }

    fn car_at(network: &RoadNetwork, x: f64) -> MovingObject {
        let attributes = MovingObjectAttributes {
            kind: MovingObjectType::Car,
            dimension: Dimension {
                length: 4.0,
                width: 2.0,
                height: 1.5,
            },
            state: MovingObjectState::at(Point2d::new(x, -1.5), 0.0),
        };
        let mut car = MovingObject::new(ObjectId(1), &attributes);
        let location = locate(
            network,
            &car.corners(),
            car.position(),
            car.yaw(),
            OutOfRangePolicy::Clamp,
        );
        car.set_location(location);
        car
    }

    #[test]
    fn obstruction_uses_first_pass_over_road() {
        let network = network();
        let road = network.road_by_name("r").unwrap();
        let lane = network.lane_by_name("r", -1, 0.0).unwrap();
        let route = Route::new(vec![RouteElement::new(road, true)]);
        let forward = LaneStream::new(&network, &route, lane);
        assert_eq!(forward.elements().len(), 1);

        // Comes back along the same lane after reaching its end.
        let mut revisiting = forward.clone();
        let first = revisiting.elements[0];
        revisiting.elements.push(LaneStreamElement {
            in_stream_direction: false,
            stream_range: Interval::new(100.0, 200.0),
            ..first
        });

        let car = car_at(&network, 40.0);
        let once = forward.obstruction(&network, 0.5, &car);
        assert!(once.valid);
        assert_approx_eq!(once.left, 0.5);
        assert_approx_eq!(once.right, -1.5);
        assert_eq!(revisiting.obstruction(&network, 0.5, &car), once);
    }

    #[test]
    fn element_positions() {
        let el = LaneStreamElement {
            lane: LaneId::default(),
            road: RoadId::default(),
            in_stream_direction: false,
            lane_range: Interval::new(10.0, 30.0),
            stream_range: Interval::new(100.0, 120.0),
        };
        assert_approx_eq!(el.stream_position(12.0), 118.0);
        assert_approx_eq!(el.road_s(118.0), 12.0);
        let range = el.stream_interval(Interval::new(12.0, 15.0));
        assert_approx_eq!(range.min, 115.0);
        assert_approx_eq!(range.max, 118.0);
    }
}
