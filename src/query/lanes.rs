use super::{LaneStream, Route, RouteElement};
use crate::network::{LaneType, RoadNetwork};
use crate::{LaneId, RoadId};
use serde::{Deserialize, Serialize};

/// Where a lane lies across its road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneCategory {
    /// No lane lies to the right of this one.
    RightMostLane,
    RegularLane,
}

/// A summary of a run of connected lanes along one road.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneQueryResult {
    /// The first lane of the run, shared by every lane in it.
    pub stream_id: LaneId,
    /// The s-offset where the run starts, in m.
    pub start: f64,
    /// The s-offset where the run ends, in m.
    pub end: f64,
    pub category: LaneCategory,
    pub is_driving_lane: bool,
}

/// Describes a lane and the run of lanes along its road that it belongs to.
pub fn query_lane(network: &RoadNetwork, lane: LaneId) -> Option<LaneQueryResult> {
    let lane = network.lane(lane)?;
    let route = Route::new(vec![RouteElement::new(lane.road(), true)]);
    let stream = LaneStream::new(network, &route, lane.id());
    let (first, last) = (stream.elements().first()?, stream.elements().last()?);
    Some(LaneQueryResult {
        stream_id: first.lane,
        start: first.lane_range.min,
        end: last.lane_range.max,
        category: match lane.right() {
            None => LaneCategory::RightMostLane,
            Some(_) => LaneCategory::RegularLane,
        },
        is_driving_lane: lane.lane_type() == LaneType::Driving,
    })
}

/// Describes each run of lanes on a road between two s-offsets.
///
/// Each run is reported once, for the first of its lanes met in section order.
pub fn query_lanes(network: &RoadNetwork, road: RoadId, start: f64, end: f64) -> Vec<LaneQueryResult> {
    let Some(road) = network.road(road) else {
        return vec![];
    };
    let mut results: Vec<LaneQueryResult> = vec![];
    let sections = road
        .sections()
        .iter()
        .filter_map(|id| network.section(*id))
        .filter(|section| section.covers_interval(start, end));
    for section in sections {
        for lane in section.lanes() {
            let Some(result) = query_lane(network, *lane) else {
                continue;
            };
            if !results.iter().any(|r| r.stream_id == result.stream_id) {
                results.push(result);
            }
        }
    }
    results
}
