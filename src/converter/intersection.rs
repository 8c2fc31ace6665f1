//! Finds where the connecting roads of each junction overlap.

use crate::math::intersect;
use crate::network::{IntersectionInfo, Lane, LaneElement, RoadNetwork};
use crate::util::Interval;
use crate::{JunctionId, RoadId};
use itertools::Itertools;
use log::debug;

/// Computes the intersections between every pair of connecting roads in every junction.
///
/// # Parameters
/// * `min_area` - Overlaps with an area at or below this are ignored, in m^2
pub(crate) fn convert_intersections(network: &mut RoadNetwork, min_area: f64) {
    let junctions = network.junctions().map(|j| j.id()).collect::<Vec<_>>();
    let mut total = 0;
    for junction_id in junctions {
        let found = junction_intersections(network, junction_id, min_area);
        total += found.len();
        if let Some(junction) = network.junction_mut(junction_id) {
            for (road, info) in found {
                junction.add_intersection(road, info);
            }
        }
    }
    debug!("Found {} junction intersections", total);
}

fn junction_intersections(
    network: &RoadNetwork,
    junction_id: JunctionId,
    min_area: f64,
) -> Vec<(RoadId, IntersectionInfo)> {
    let Some(junction) = network.junction(junction_id) else {
        return vec![];
    };
    let mut found = vec![];
    for (&a, &b) in junction.connecting_roads().iter().tuple_combinations() {
        let Some(info_a) = overlap_with(network, junction_id, a, b, min_area) else {
            continue;
        };
        found.push((a, info_a));
        if let Some(info_b) = overlap_with(network, junction_id, b, a, min_area) {
            found.push((b, info_b));
        }
    }
    found
}

/// Every element of every lane of a road.
fn road_elements(network: &RoadNetwork, road: RoadId) -> Vec<(&Lane, &LaneElement)> {
    let Some(road) = network.road(road) else {
        return vec![];
    };
    road.sections()
        .iter()
        .filter_map(|id| network.section(*id))
        .flat_map(|section| section.lanes().iter())
        .filter_map(|id| network.lane(*id))
        .flat_map(|lane| lane.elements().iter().map(move |el| (lane, el)))
        .collect()
}

/// The overlap of road `own` with road `other`, expressed along `own`.
fn overlap_with(
    network: &RoadNetwork,
    junction_id: JunctionId,
    own: RoadId,
    other: RoadId,
    min_area: f64,
) -> Option<IntersectionInfo> {
    let junction = network.junction(junction_id)?;
    let own_elements = road_elements(network, own);
    let other_elements = road_elements(network, other);

    let mut info = IntersectionInfo {
        intersecting_road: other,
        relative_rank: junction.rank(own, other),
        s_offsets: Default::default(),
    };
    for ((own_lane, own_el), (other_lane, other_el)) in
        own_elements.iter().cartesian_product(other_elements.iter())
    {
        if !own_el.bounds.overlaps(&other_el.bounds) {
            continue;
        }
        let Some(points) = intersect(&own_el.polygon, &other_el.polygon, min_area) else {
            continue;
        };
        let lane_range = own_lane.range();
        let mut range = Interval::empty();
        for point in points {
            let s = own_lane.element_coordinates(own_el, point).0;
            range.extend(s.clamp(lane_range.min, lane_range.max));
        }
        if !range.is_empty() {
            info.merge(own_lane.id(), other_lane.id(), range);
        }
    }
    (!info.s_offsets.is_empty()).then_some(info)
}
