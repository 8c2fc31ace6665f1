//! Read-only questions asked of the road network and the objects on it.
//!
//! Most queries are relative to a [LaneStream], which strings the lanes of a route
//! together into one longitudinal coordinate frame that crosses section, road and
//! junction boundaries.

pub use connector::{connector_crossing, moving_objects_near_connector, ConnectorCrossing};
pub use lanes::{query_lane, query_lanes, LaneCategory, LaneQueryResult};
pub use obstruction::Obstruction;
pub use route::{find_route, route_to_connector, Route, RouteElement};
pub use sector::apply_sector_filter;
pub use stream::{
    LaneMarkingHit, LaneStream, LaneStreamElement, LaneTypeAt, Side, SignalHit,
};

mod connector;
mod lanes;
mod obstruction;
mod route;
mod sector;
mod stream;
