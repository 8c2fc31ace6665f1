//! Moving and stationary objects placed in the world.

use crate::math::{rectangle_corners, Point2d, Vector2d};
use crate::network::LaneOverlap;
use crate::util::Interval;
use crate::{LaneId, RoadId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique ID of a [WorldObject].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Hands out object ids, including ones for objects not yet committed.
#[derive(Debug)]
pub(crate) struct ObjectIdAllocator(AtomicU64);

impl Default for ObjectIdAllocator {
    fn default() -> Self {
        Self(AtomicU64::new(1))
    }
}

impl ObjectIdAllocator {
    pub fn next(&self) -> ObjectId {
        ObjectId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// Whether an object moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Moving,
    Stationary,
}

/// The size of an object's bounding box, in m.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// The category of a moving object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingObjectType {
    #[default]
    Car,
    Truck,
    Motorbike,
    Bicycle,
    Pedestrian,
    Other,
}

/// The dynamic state of a moving object, in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovingObjectState {
    /// The centre of the bounding box.
    pub position: Point2d,
    /// The height of the bounding box centre, in m.
    pub z: f64,
    /// Heading anti-clockwise from the x-axis, in rad.
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Velocity in m/s.
    pub velocity: Vector2d,
    /// Acceleration in m/s^2.
    pub acceleration: Vector2d,
    /// Yaw rate in rad/s.
    pub yaw_rate: f64,
}

impl MovingObjectState {
    /// A state at rest at the given position and heading.
    pub fn at(position: Point2d, yaw: f64) -> Self {
        Self {
            position,
            z: 0.0,
            yaw,
            pitch: 0.0,
            roll: 0.0,
            velocity: Vector2d::new(0.0, 0.0),
            acceleration: Vector2d::new(0.0, 0.0),
            yaw_rate: 0.0,
        }
    }
}

/// The attributes of a moving object to be added.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovingObjectAttributes {
    pub kind: MovingObjectType,
    pub dimension: Dimension,
    pub state: MovingObjectState,
}

/// A position relative to a lane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoadPosition {
    pub road: RoadId,
    pub lane: LaneId,
    /// The s-offset along the road, in m.
    pub s: f64,
    /// The lateral offset from the lane centre, positive to the left, in m.
    pub t: f64,
    /// The heading relative to the lane, in rad.
    pub hdg: f64,
}

/// Where an object lies on the road network.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectLocation {
    /// The lanes the footprint overlaps.
    pub overlaps: Vec<(LaneId, LaneOverlap)>,
    /// The s-offsets covered on each road the footprint touches.
    pub touched_roads: BTreeMap<RoadId, Interval<f64>>,
    /// The lane containing the reference point, if any.
    pub reference: Option<RoadPosition>,
}

impl ObjectLocation {
    /// Whether the object lies on any lane.
    pub fn is_on_road(&self) -> bool {
        !self.overlaps.is_empty()
    }

    /// The overlap with the given lane, if any.
    pub fn overlap(&self, lane: LaneId) -> Option<&LaneOverlap> {
        self.overlaps.iter().find(|(id, _)| *id == lane).map(|(_, o)| o)
    }
}

/// Capabilities shared by every kind of object.
pub trait Placed {
    fn id(&self) -> ObjectId;

    /// The centre of the bounding box.
    fn position(&self) -> Point2d;

    /// Heading anti-clockwise from the x-axis, in rad.
    fn yaw(&self) -> f64;

    fn dimension(&self) -> Dimension;

    fn location(&self) -> &ObjectLocation;

    /// The corners of the footprint, anti-clockwise from the front left.
    fn corners(&self) -> [Point2d; 4] {
        let dim = self.dimension();
        rectangle_corners(self.position(), self.yaw(), dim.length, dim.width)
    }
}

/// An agent controlled by a behaviour model.
#[derive(Clone, Debug)]
pub struct MovingObject {
    id: ObjectId,
    kind: MovingObjectType,
    dimension: Dimension,
    state: MovingObjectState,
    location: ObjectLocation,
}

impl MovingObject {
    pub(crate) fn new(id: ObjectId, attributes: &MovingObjectAttributes) -> Self {
        Self {
            id,
            kind: attributes.kind,
            dimension: attributes.dimension,
            state: attributes.state,
            location: ObjectLocation::default(),
        }
    }

    pub fn kind(&self) -> MovingObjectType {
        self.kind
    }

    pub fn state(&self) -> &MovingObjectState {
        &self.state
    }

    pub(crate) fn set_state(&mut self, state: MovingObjectState) {
        self.state = state;
    }

    pub(crate) fn set_location(&mut self, location: ObjectLocation) {
        self.location = location;
    }
}

impl Placed for MovingObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> Point2d {
        self.state.position
    }

    fn yaw(&self) -> f64 {
        self.state.yaw
    }

    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn location(&self) -> &ObjectLocation {
        &self.location
    }
}

/// A static obstacle created at import.
#[derive(Clone, Debug)]
pub struct StationaryObject {
    id: ObjectId,
    /// The authoring-time id.
    name: String,
    dimension: Dimension,
    position: Point2d,
    z: f64,
    yaw: f64,
    location: ObjectLocation,
}

impl StationaryObject {
    pub(crate) fn new(
        id: ObjectId,
        name: String,
        dimension: Dimension,
        position: Point2d,
        z: f64,
        yaw: f64,
    ) -> Self {
        Self {
            id,
            name,
            dimension,
            position,
            z,
            yaw,
            location: ObjectLocation::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The height of the bounding box centre, in m.
    pub fn z(&self) -> f64 {
        self.z
    }

    pub(crate) fn set_location(&mut self, location: ObjectLocation) {
        self.location = location;
    }
}

impl Placed for StationaryObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> Point2d {
        self.position
    }

    fn yaw(&self) -> f64 {
        self.yaw
    }

    fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn location(&self) -> &ObjectLocation {
        &self.location
    }
}

/// Any object in the world.
#[derive(Clone, Debug)]
pub enum WorldObject {
    Moving(MovingObject),
    Stationary(StationaryObject),
}

impl WorldObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            WorldObject::Moving(_) => ObjectKind::Moving,
            WorldObject::Stationary(_) => ObjectKind::Stationary,
        }
    }

    pub fn as_moving(&self) -> Option<&MovingObject> {
        match self {
            WorldObject::Moving(obj) => Some(obj),
            WorldObject::Stationary(_) => None,
        }
    }

    pub fn as_stationary(&self) -> Option<&StationaryObject> {
        match self {
            WorldObject::Stationary(obj) => Some(obj),
            WorldObject::Moving(_) => None,
        }
    }

    fn placed(&self) -> &dyn Placed {
        match self {
            WorldObject::Moving(obj) => obj,
            WorldObject::Stationary(obj) => obj,
        }
    }
}

impl Placed for WorldObject {
    fn id(&self) -> ObjectId {
        self.placed().id()
    }

    fn position(&self) -> Point2d {
        self.placed().position()
    }

    fn yaw(&self) -> f64 {
        self.placed().yaw()
    }

    fn dimension(&self) -> Dimension {
        self.placed().dimension()
    }

    fn location(&self) -> &ObjectLocation {
        self.placed().location()
    }
}
