use crate::description::ContactPoint;
use crate::util::Interval;
use crate::{JunctionId, LaneId, RoadId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The right of way of a road relative to a road it intersects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntersectingConnectionRank {
    Higher,
    Lower,
    Undefined,
}

impl IntersectingConnectionRank {
    /// The rank as seen from the other road.
    pub fn inverse(self) -> Self {
        match self {
            Self::Higher => Self::Lower,
            Self::Lower => Self::Higher,
            Self::Undefined => Self::Undefined,
        }
    }
}

/// Where the lanes of one connecting road overlap the lanes of another.
#[derive(Clone, Debug)]
pub struct IntersectionInfo {
    pub intersecting_road: RoadId,
    pub relative_rank: IntersectingConnectionRank,
    /// The s-offsets along the owning road where (own lane, other lane) overlap.
    pub s_offsets: BTreeMap<(LaneId, LaneId), Interval<f64>>,
}

impl IntersectionInfo {
    /// Unions `range` into the entry for the lane pair.
    pub(crate) fn merge(&mut self, own: LaneId, other: LaneId, range: Interval<f64>) {
        self.s_offsets
            .entry((own, other))
            .and_modify(|r| *r = r.union(&range))
            .or_insert(range);
    }
}

/// A connecting road leading from an incoming road through the junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub incoming: RoadId,
    pub connecting: RoadId,
    /// The end of the connecting road touching the incoming road.
    pub contact: ContactPoint,
}

/// A node joining roads through connecting roads.
#[derive(Clone, Debug)]
pub struct Junction {
    id: JunctionId,
    /// The authoring-time id.
    name: String,
    connecting_roads: Vec<RoadId>,
    connections: Vec<Connection>,
    /// Pairs of (high, low) priority roads.
    priorities: Vec<(RoadId, RoadId)>,
    intersections: HashMap<RoadId, Vec<IntersectionInfo>>,
}

impl Junction {
    pub(crate) fn new(id: JunctionId, name: String) -> Self {
        Self {
            id,
            name,
            connecting_roads: vec![],
            connections: vec![],
            priorities: vec![],
            intersections: HashMap::new(),
        }
    }

    pub fn id(&self) -> JunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connecting_roads(&self) -> &[RoadId] {
        &self.connecting_roads
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// The connections leaving the given incoming road.
    pub fn connections_from(&self, incoming: RoadId) -> impl Iterator<Item = &Connection> + '_ {
        self.connections.iter().filter(move |c| c.incoming == incoming)
    }

    /// The rank of `own` relative to `other`.
    pub fn rank(&self, own: RoadId, other: RoadId) -> IntersectingConnectionRank {
        if self.priorities.contains(&(own, other)) {
            IntersectingConnectionRank::Higher
        } else if self.priorities.contains(&(other, own)) {
            IntersectingConnectionRank::Lower
        } else {
            IntersectingConnectionRank::Undefined
        }
    }

    /// The intersections along the given connecting road.
    pub fn intersections(&self, road: RoadId) -> &[IntersectionInfo] {
        self.intersections.get(&road).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn add_connection(&mut self, connection: Connection) {
        if !self.connecting_roads.contains(&connection.connecting) {
            self.connecting_roads.push(connection.connecting);
        }
        self.connections.push(connection);
    }

    pub(crate) fn add_priority(&mut self, high: RoadId, low: RoadId) {
        self.priorities.push((high, low));
    }

    pub(crate) fn add_intersection(&mut self, road: RoadId, info: IntersectionInfo) {
        self.intersections.entry(road).or_default().push(info);
    }
}
