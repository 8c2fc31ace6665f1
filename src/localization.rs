//! Finds where an object's footprint lies on the road network.

use crate::config::OutOfRangePolicy;
use crate::math::{element_polygon, intersect, normalize_angle, Aabb, Point2d};
use crate::network::{Lane, LaneOverlap, RoadNetwork};
use crate::object::{ObjectLocation, RoadPosition};
use crate::util::Interval;
use geo::Intersects;
use log::warn;

/// Slack allowed when checking an overlap against its lane's range, in m.
const RANGE_TOLERANCE: f64 = 1e-6;

/// Locates a rectangular footprint on the road network.
///
/// # Parameters
/// * `network` - The road network
/// * `corners` - The corners of the footprint
/// * `reference` - The object's reference point
/// * `yaw` - The object's heading in world coordinates
/// * `policy` - What to do with an overlap reaching beyond the ends of its lane
pub(crate) fn locate(
    network: &RoadNetwork,
    corners: &[Point2d; 4],
    reference: Point2d,
    yaw: f64,
    policy: OutOfRangePolicy,
) -> ObjectLocation {
    let footprint = element_polygon(corners);
    let bounds = Aabb::from_points(corners);
    let mut location = ObjectLocation {
        reference: locate_point(network, reference, yaw),
        ..Default::default()
    };

    for lane in network.lanes() {
        if !lane.bounds().map_or(false, |b| b.overlaps(&bounds)) {
            continue;
        }
        let mut overlap = None;
        for element in lane.elements() {
            if !element.bounds.overlaps(&bounds) {
                continue;
            }
            let Some(points) = intersect(&element.polygon, &footprint, 0.0) else {
                continue;
            };
            let range = lane.range();
            let overlap = overlap.get_or_insert_with(LaneOverlap::default);
            for point in points {
                let (s, t) = lane.element_coordinates(element, point);
                let width = lane.width_at(s.clamp(range.min, range.max)).unwrap_or(0.0);
                overlap.include(s, t, 0.5 * width);
            }
        }
        let Some(overlap) = overlap.and_then(|o| check_range(lane, o, policy)) else {
            continue;
        };
        location
            .touched_roads
            .entry(lane.road())
            .and_modify(|r| *r = r.union(&Interval::new(overlap.s_min, overlap.s_max)))
            .or_insert(Interval::new(overlap.s_min, overlap.s_max));
        location.overlaps.push((lane.id(), overlap));
    }
    location
}

/// Applies the out-of-range policy to an overlap.
fn check_range(
    lane: &Lane,
    mut overlap: LaneOverlap,
    policy: OutOfRangePolicy,
) -> Option<LaneOverlap> {
    let range = lane.range();
    let outside = overlap.s_min < range.min - RANGE_TOLERANCE
        || overlap.s_max > range.max + RANGE_TOLERANCE;
    if outside {
        warn!(
            "Overlap [{}, {}] lies outside lane {} range [{}, {}], {}",
            overlap.s_min,
            overlap.s_max,
            lane.signed_id(),
            range.min,
            range.max,
            match policy {
                OutOfRangePolicy::Clamp => "clamping",
                OutOfRangePolicy::Drop => "dropping",
            }
        );
        if policy == OutOfRangePolicy::Drop {
            return None;
        }
    }
    overlap.s_min = overlap.s_min.clamp(range.min, range.max);
    overlap.s_max = overlap.s_max.clamp(range.min, range.max);
    Some(overlap)
}

/// Finds the lane containing a point.
///
/// The returned heading is `yaw` relative to the lane direction. Points between lanes
/// or off the road yield `None`.
pub(crate) fn locate_point(
    network: &RoadNetwork,
    point: Point2d,
    yaw: f64,
) -> Option<RoadPosition> {
    let target = geo::Point::new(point.x, point.y);
    let bounds = Aabb::from_points(&[point]);
    network
        .lanes()
        .filter(|lane| lane.bounds().map_or(false, |b| b.overlaps(&bounds)))
        .find_map(|lane| {
            let element = lane
                .elements()
                .iter()
                .filter(|el| el.bounds.overlaps(&bounds))
                .find(|el| el.polygon.intersects(&target))?;
            let (s, t) = lane.element_coordinates(element, point);
            let s = s.clamp(lane.range().min, lane.range().max);
            let direction = lane.direction_at(s).unwrap_or(0.0);
            Some(RoadPosition {
                road: lane.road(),
                lane: lane.id(),
                s,
                t,
                hdg: normalize_angle(yaw - direction),
            })
        })
}
