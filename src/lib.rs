pub use cgmath;
pub use config::{InterfaceVersion, OutOfRangePolicy, WorldConfig};
pub use error::{Result, WorldError};
pub use object::{ObjectId, Placed, WorldObject};
pub use slotmap::{Key, KeyData};
pub use sync::{CycleState, Mutation};
pub use util::Interval;
pub use world::World;

use slotmap::new_key_type;

pub mod config;
mod converter;
pub mod description;
pub mod error;
pub mod ground_truth;
mod localization;
pub mod math;
pub mod network;
pub mod object;
pub mod query;
pub mod sync;
mod util;
mod world;

new_key_type! {
    /// Unique ID of a [Road](network::Road).
    pub struct RoadId;
    /// Unique ID of a [Section](network::Section).
    pub struct SectionId;
    /// Unique ID of a [Lane](network::Lane).
    pub struct LaneId;
    /// Unique ID of a [LaneBoundary](network::LaneBoundary).
    pub struct BoundaryId;
    /// Unique ID of a [Junction](network::Junction).
    pub struct JunctionId;
    /// Unique ID of a [TrafficSign](network::TrafficSign).
    pub struct SignId;
    /// Unique ID of a [TrafficLight](network::TrafficLight).
    pub struct TrafficLightId;
    /// Unique ID of a [RoadMarking](network::RoadMarking).
    pub struct MarkingId;
}
