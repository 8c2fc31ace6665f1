//! Questions about traffic approaching and crossing the connecting roads of a junction.

use super::{route_to_connector, LaneStream};
use crate::network::{LaneType, RoadNetwork};
use crate::object::{ObjectId, ObjectKind, ObjectLocation};
use crate::{LaneId, RoadId};

/// Distances along an object's route to where its lane crosses a lane of another
/// connecting road.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorCrossing {
    /// From the front of the object to where the crossing starts, in m.
    pub until_enters: f64,
    /// From the rear of the object to where the crossing ends, in m.
    pub until_leaves: f64,
}

/// The moving objects on the driving lanes of a connecting road and the lanes leading
/// to it, within `range` of the end of the connecting road.
pub fn moving_objects_near_connector(
    network: &RoadNetwork,
    connecting: RoadId,
    range: f64,
) -> Vec<ObjectId> {
    let Some(route) = route_to_connector(network, connecting) else {
        return vec![];
    };
    let entry_s = match route.elements().last() {
        Some(el) if !el.in_road_direction => network.road(connecting).map_or(0.0, |r| r.length()),
        _ => 0.0,
    };
    let mut found = vec![];
    for lane in network.lanes_of_type_at(connecting, entry_s, &[LaneType::Driving]) {
        let stream = LaneStream::new(network, &route, lane);
        let end = stream.length();
        for id in stream.objects_of_kind_in_range(network, end - range, end, Some(ObjectKind::Moving)) {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    found
}

/// Where the route of an object onto its own connecting road crosses a lane of another
/// connecting road.
///
/// Returns `None` if the object is off-road, the two connecting roads do not intersect,
/// or the object's lane does not lead onto a lane crossing `intersecting_lane`.
///
/// # Parameters
/// * `location` - Where the object lies
/// * `own` - The connecting road the object is heading onto or driving on
/// * `intersecting` - The other connecting road
/// * `intersecting_lane` - The lane of the other connecting road
pub fn connector_crossing(
    network: &RoadNetwork,
    location: &ObjectLocation,
    own: RoadId,
    intersecting: RoadId,
    intersecting_lane: LaneId,
) -> Option<ConnectorCrossing> {
    let reference = location.reference?;
    let junction = network.junction(network.road(own)?.junction()?)?;
    let info = junction
        .intersections(own)
        .iter()
        .find(|info| info.intersecting_road == intersecting)?;

    let route = route_to_connector(network, own)?;
    let stream = LaneStream::new(network, &route, reference.lane);
    let own_el = stream.elements().last().filter(|el| el.road == own)?;
    let crossing = own_el.stream_interval(*info.s_offsets.get(&(own_el.lane, intersecting_lane))?);

    let object_el = stream.elements().iter().find(|el| el.lane == reference.lane)?;
    let touched = location.touched_roads.get(&reference.road)?;
    let object = object_el.stream_interval(*touched);

    Some(ConnectorCrossing {
        until_enters: crossing.min - object.max,
        until_leaves: crossing.max - object.min,
    })
}
