use crate::description::ContactPoint;
use crate::network::{RoadLink, RoadNetwork};
use crate::object::RoadPosition;
use crate::{JunctionId, RoadId};
use serde::{Deserialize, Serialize};

/// The most roads [route_to_connector] walks back over.
const MAX_ROUTE_ROADS: usize = 256;

/// A road travelled as part of a route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteElement {
    pub road: RoadId,
    /// Whether the road is travelled in the direction of increasing s.
    pub in_road_direction: bool,
}

impl RouteElement {
    pub fn new(road: RoadId, in_road_direction: bool) -> Self {
        Self {
            road,
            in_road_direction,
        }
    }
}

/// An ordered sequence of roads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    elements: Vec<RouteElement>,
}

impl Route {
    pub fn new(elements: Vec<RouteElement>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[RouteElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The index of the first occurrence of a road in the route.
    pub fn position_of(&self, road: RoadId) -> Option<usize> {
        self.elements.iter().position(|el| el.road == road)
    }

    /// The distance along the route from the start of its first road to `s` on `road`.
    pub fn road_stream_position(&self, network: &RoadNetwork, road: RoadId, s: f64) -> Option<f64> {
        let mut offset = 0.0;
        for el in &self.elements {
            let length = network.road(el.road)?.length();
            if el.road == road {
                return Some(if el.in_road_direction {
                    offset + s
                } else {
                    offset + length - s
                });
            }
            offset += length;
        }
        None
    }

    /// The distance along the route from a position to the first road of a junction.
    ///
    /// The distance is negative once the position lies past the start of the junction.
    /// Returns `None` if the route misses the position's road or the junction.
    pub fn distance_to_junction(
        &self,
        network: &RoadNetwork,
        position: &RoadPosition,
        junction: JunctionId,
    ) -> Option<f64> {
        let from = self.road_stream_position(network, position.road, position.s)?;
        let mut offset = 0.0;
        for el in &self.elements {
            let road = network.road(el.road)?;
            if road.junction() == Some(junction) {
                return Some(offset - from);
            }
            offset += road.length();
        }
        None
    }
}

/// The route leading up to a connecting road through the roads linked before it.
///
/// The route starts at the furthest road reachable backwards over plain road links
/// and ends on the connecting road itself.
pub fn route_to_connector(network: &RoadNetwork, connecting: RoadId) -> Option<Route> {
    let road = network.road(connecting)?;
    let junction = network.junction(road.junction()?)?;
    let connection = junction
        .connections()
        .iter()
        .find(|c| c.connecting == connecting)?;
    let incoming = network.road(connection.incoming)?;
    let towards_junction = incoming.successor() == Some(RoadLink::Junction(junction.id()));

    let mut elements = vec![
        RouteElement::new(connecting, connection.contact == ContactPoint::Start),
        RouteElement::new(incoming.id(), towards_junction),
    ];
    let mut current = RouteElement::new(incoming.id(), towards_junction);
    while elements.len() < MAX_ROUTE_ROADS {
        let Some(road) = network.road(current.road) else {
            break;
        };
        let entry = if current.in_road_direction {
            ContactPoint::Start
        } else {
            ContactPoint::End
        };
        let Some(RoadLink::Road { road, contact }) = road.link_at(entry) else {
            break;
        };
        if elements.iter().any(|el| el.road == road) {
            break;
        }
        current = RouteElement::new(road, contact == ContactPoint::End);
        elements.push(current);
    }
    elements.reverse();
    Some(Route::new(elements))
}

/// Finds the shortest route from one road to another.
///
/// Roads are connected by their predecessor/successor links and by junction connections.
/// The length of each road entered is its cost.
///
/// # Parameters
/// * `network` - The road network
/// * `from` - The starting road and the direction it is travelled in
/// * `to` - The destination road, which may be travelled in either direction
pub fn find_route(network: &RoadNetwork, from: RouteElement, to: RoadId) -> Option<Route> {
    let (path, _) = pathfinding::directed::dijkstra::dijkstra(
        &from,
        |el| successors(network, *el),
        |el| el.road == to,
    )?;
    Some(Route::new(path))
}

/// The roads reachable from the end of a road element, with the cost of travelling them.
fn successors(network: &RoadNetwork, el: RouteElement) -> Vec<(RouteElement, u64)> {
    let Some(road) = network.road(el.road) else {
        return vec![];
    };
    let link = road.link_at(if el.in_road_direction {
        ContactPoint::End
    } else {
        ContactPoint::Start
    });
    let entered = |id: RoadId, contact: ContactPoint| {
        let next = RouteElement::new(id, contact == ContactPoint::Start);
        network.road(id).map(|r| (next, cost(r.length())))
    };
    match link {
        Some(RoadLink::Road { road, contact }) => entered(road, contact).into_iter().collect(),
        Some(RoadLink::Junction(junction)) => network
            .junction(junction)
            .into_iter()
            .flat_map(|j| j.connections_from(el.road))
            .filter_map(|c| entered(c.connecting, c.contact))
            .collect(),
        None => vec![],
    }
}

/// Road length in whole centimetres.
fn cost(length: f64) -> u64 {
    (length * 100.0).round().max(0.0) as u64
}
