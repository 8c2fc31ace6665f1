//! Snapshots of the world in the interchange schema read by sensor models.
//!
//! A [GroundTruth] describes every object, lane, boundary and signal. A [SensorView]
//! wraps a ground truth filtered to what one sensor can see, always including the
//! vehicle it is mounted on.

use crate::config::InterfaceVersion;
use crate::error::Result;
use crate::math::{normalize_angle, rotate, Point2d, Vector2d};
use crate::network::{
    BoundarySide, LaneType, LightState, RoadMarkColor, RoadMarkType, RoadNetwork, SignalPlacement,
};
use crate::object::{MovingObjectType, ObjectId, Placed, WorldObject};
use crate::query::apply_sector_filter;
use crate::{BoundaryId, LaneId};
use log::warn;
use serde::{Deserialize, Serialize};
use slotmap::Key;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

/// Simulation time since the start of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            seconds: (ms / 1000) as i64,
            nanos: ((ms % 1000) * 1_000_000) as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    fn planar(v: Vector2d, z: f64) -> Self {
        Self { x: v.x, y: v.y, z }
    }

    fn at(p: Point2d, z: f64) -> Self {
        Self { x: p.x, y: p.y, z }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation3 {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension3 {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Pose and motion of a moving object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseMoving {
    pub dimension: Dimension3,
    pub position: Vector3,
    pub orientation: Orientation3,
    pub velocity: Vector3,
    pub acceleration: Vector3,
    pub orientation_rate: Orientation3,
}

/// Pose of a stationary object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseStationary {
    pub dimension: Dimension3,
    pub position: Vector3,
    pub orientation: Orientation3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovingObjectRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MovingObjectType,
    pub base: BaseMoving,
    pub assigned_lane_ids: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationaryObjectRecord {
    pub id: u64,
    pub name: String,
    pub base: BaseStationary,
    pub assigned_lane_ids: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub lane_type: LaneType,
    pub left_lane_id: Option<u64>,
    pub right_lane_id: Option<u64>,
    pub left_boundary_ids: Vec<u64>,
    pub right_boundary_ids: Vec<u64>,
    pub successor_ids: Vec<u64>,
    pub predecessor_ids: Vec<u64>,
    pub centerline: Vec<Vector3>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneBoundaryRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: RoadMarkType,
    pub color: RoadMarkColor,
    pub width: f64,
    pub side: BoundarySide,
    pub points: Vec<Vector3>,
}

/// Where a signal stands and which lanes it applies to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalBase {
    pub position: Vector3,
    pub yaw: f64,
    pub assigned_lane_ids: Vec<u64>,
}

impl From<&SignalPlacement> for SignalBase {
    fn from(placement: &SignalPlacement) -> Self {
        Self {
            position: Vector3::at(placement.position, 0.0),
            yaw: placement.heading,
            assigned_lane_ids: placement.lanes.iter().map(|l| key_id(*l)).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficSignRecord {
    pub id: u64,
    pub code: String,
    pub value: Option<f64>,
    pub base: SignalBase,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightRecord {
    pub id: u64,
    pub state: LightState,
    pub base: SignalBase,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadMarkingRecord {
    pub id: u64,
    pub code: String,
    pub base: SignalBase,
}

/// A description of the world at one instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub version: InterfaceVersion,
    pub timestamp: Timestamp,
    pub host_vehicle_id: Option<u64>,
    pub moving_objects: Vec<MovingObjectRecord>,
    pub stationary_objects: Vec<StationaryObjectRecord>,
    pub lanes: Vec<LaneRecord>,
    pub lane_boundaries: Vec<LaneBoundaryRecord>,
    pub traffic_signs: Vec<TrafficSignRecord>,
    pub traffic_lights: Vec<TrafficLightRecord>,
    pub road_markings: Vec<RoadMarkingRecord>,
}

/// The pose of a sensor relative to the vehicle it is mounted on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MountingPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

/// A sensor attached to a moving object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorConfiguration {
    pub id: u64,
    pub host: ObjectId,
    pub mounting: MountingPosition,
    /// The opening angle, in rad. Anything of at least a full turn sees all around.
    pub field_of_view: f64,
    /// The detection range, in m.
    pub range: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostVehicleData {
    pub location: BaseMoving,
}

/// The input of one sensor model for one cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorView {
    pub version: InterfaceVersion,
    pub timestamp: Timestamp,
    pub sensor_id: u64,
    pub mounting_position: MountingPosition,
    pub host_vehicle_id: u64,
    pub host_vehicle_data: HostVehicleData,
    pub global_ground_truth: GroundTruth,
}

impl SensorView {
    /// Serializes the view as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn key_id(key: impl Key) -> u64 {
    key.data().as_ffi()
}

fn assigned_lanes(object: &impl Placed) -> Vec<u64> {
    object
        .location()
        .overlaps
        .iter()
        .map(|(lane, _)| key_id(*lane))
        .collect()
}

fn moving_base(object: &WorldObject) -> Option<BaseMoving> {
    let moving = object.as_moving()?;
    let state = moving.state();
    let dim = moving.dimension();
    Some(BaseMoving {
        dimension: Dimension3 {
            length: dim.length,
            width: dim.width,
            height: dim.height,
        },
        position: Vector3::at(state.position, state.z),
        orientation: Orientation3 {
            roll: state.roll,
            pitch: state.pitch,
            yaw: state.yaw,
        },
        velocity: Vector3::planar(state.velocity, 0.0),
        acceleration: Vector3::planar(state.acceleration, 0.0),
        orientation_rate: Orientation3 {
            yaw: state.yaw_rate,
            ..Default::default()
        },
    })
}

/// Builds ground truth from the committed state of a world.
pub(crate) struct Snapshot<'a> {
    pub network: &'a RoadNetwork,
    pub objects: &'a BTreeMap<ObjectId, WorldObject>,
    pub version: InterfaceVersion,
    pub time_ms: u64,
    pub angle_epsilon: f64,
}

/// The parts of the world a sensor can see.
#[derive(Default)]
struct Visible {
    objects: BTreeSet<ObjectId>,
    lanes: Option<BTreeSet<LaneId>>,
    signal_filter: Option<(Point2d, f64, f64, f64)>,
}

impl Snapshot<'_> {
    /// The complete, unfiltered ground truth.
    pub fn ground_truth(&self) -> GroundTruth {
        let visible = Visible {
            objects: self.objects.keys().copied().collect(),
            ..Default::default()
        };
        self.build(&visible, None)
    }

    /// The ground truth seen by a sensor, or `None` if its host does not exist.
    pub fn sensor_view(&self, sensor: &SensorConfiguration) -> Option<SensorView> {
        let Some(host) = self.objects.get(&sensor.host).filter(|o| o.as_moving().is_some())
        else {
            warn!("Sensor {} is mounted on unknown object {:?}", sensor.id, sensor.host);
            return None;
        };
        let host_base = moving_base(host)?;

        let mount = Vector2d::new(sensor.mounting.x, sensor.mounting.y);
        let origin = host.position() + rotate(mount, host.yaw());
        let yaw = host.yaw() + sensor.mounting.yaw;
        let (left, right) = if sensor.field_of_view >= 2.0 * PI {
            (PI, -PI)
        } else {
            (
                normalize_angle(yaw + 0.5 * sensor.field_of_view),
                normalize_angle(yaw - 0.5 * sensor.field_of_view),
            )
        };

        let sector = |points: Vec<(ObjectId, Point2d)>| {
            apply_sector_filter(
                points,
                |(_, p)| *p,
                origin,
                sensor.range,
                left,
                right,
                self.angle_epsilon,
            )
        };
        let mut objects = sector(
            self.objects
                .values()
                .map(|o| (o.id(), o.position()))
                .collect(),
        )
        .into_iter()
        .map(|(id, _)| id)
        .collect::<BTreeSet<_>>();
        objects.insert(sensor.host);

        let lanes = self
            .network
            .lanes()
            .filter(|lane| {
                let centres = lane.joints().iter().map(|j| j.centre).collect::<Vec<_>>();
                !apply_sector_filter(
                    centres,
                    |p| *p,
                    origin,
                    sensor.range,
                    left,
                    right,
                    self.angle_epsilon,
                )
                .is_empty()
            })
            .map(|lane| lane.id())
            .chain(host.location().overlaps.iter().map(|(lane, _)| *lane))
            .collect();

        let visible = Visible {
            objects,
            lanes: Some(lanes),
            signal_filter: Some((origin, sensor.range, left, right)),
        };
        Some(SensorView {
            version: self.version,
            timestamp: Timestamp::from_millis(self.time_ms),
            sensor_id: sensor.id,
            mounting_position: sensor.mounting,
            host_vehicle_id: sensor.host.0,
            host_vehicle_data: HostVehicleData {
                location: host_base,
            },
            global_ground_truth: self.build(&visible, Some(sensor.host)),
        })
    }

    fn build(&self, visible: &Visible, host: Option<ObjectId>) -> GroundTruth {
        let mut truth = GroundTruth {
            version: self.version,
            timestamp: Timestamp::from_millis(self.time_ms),
            host_vehicle_id: host.map(|h| h.0),
            ..Default::default()
        };

        for id in &visible.objects {
            let Some(object) = self.objects.get(id) else {
                continue;
            };
            match object {
                WorldObject::Moving(moving) => {
                    if let Some(base) = moving_base(object) {
                        truth.moving_objects.push(MovingObjectRecord {
                            id: id.0,
                            kind: moving.kind(),
                            base,
                            assigned_lane_ids: assigned_lanes(object),
                        });
                    }
                }
                WorldObject::Stationary(stationary) => {
                    let dim = stationary.dimension();
                    truth.stationary_objects.push(StationaryObjectRecord {
                        id: id.0,
                        name: stationary.name().to_owned(),
                        base: BaseStationary {
                            dimension: Dimension3 {
                                length: dim.length,
                                width: dim.width,
                                height: dim.height,
                            },
                            position: Vector3::at(stationary.position(), stationary.z()),
                            orientation: Orientation3 {
                                yaw: stationary.yaw(),
                                ..Default::default()
                            },
                        },
                        assigned_lane_ids: assigned_lanes(object),
                    });
                }
            }
        }

        let mut boundaries = BTreeSet::<BoundaryId>::new();
        for lane in self.network.lanes() {
            if let Some(lanes) = &visible.lanes {
                if !lanes.contains(&lane.id()) {
                    continue;
                }
            }
            boundaries.extend(lane.left_boundaries());
            boundaries.extend(lane.right_boundaries());
            truth.lanes.push(LaneRecord {
                id: key_id(lane.id()),
                lane_type: lane.lane_type(),
                left_lane_id: lane.left().map(key_id),
                right_lane_id: lane.right().map(key_id),
                left_boundary_ids: lane.left_boundaries().iter().map(|b| key_id(*b)).collect(),
                right_boundary_ids: lane.right_boundaries().iter().map(|b| key_id(*b)).collect(),
                successor_ids: lane.next().iter().map(|l| key_id(*l)).collect(),
                predecessor_ids: lane.previous().iter().map(|l| key_id(*l)).collect(),
                centerline: lane
                    .joints()
                    .iter()
                    .map(|j| Vector3::at(j.centre, j.elevation))
                    .collect(),
            });
        }
        if visible.lanes.is_none() {
            boundaries.extend(self.network.boundaries().map(|b| b.id()));
        }
        for boundary in boundaries.iter().filter_map(|id| self.network.boundary(*id)) {
            truth.lane_boundaries.push(LaneBoundaryRecord {
                id: key_id(boundary.id()),
                kind: boundary.kind(),
                color: boundary.color(),
                width: boundary.width(),
                side: boundary.side(),
                points: boundary
                    .points()
                    .iter()
                    .map(|p| Vector3::at(p.point, 0.0))
                    .collect(),
            });
        }

        let sees = |placement: &SignalPlacement| match visible.signal_filter {
            Some((origin, range, left, right)) => !apply_sector_filter(
                [placement.position],
                |p| *p,
                origin,
                range,
                left,
                right,
                self.angle_epsilon,
            )
            .is_empty(),
            None => true,
        };
        for (id, sign) in self.network.signs().filter(|(_, s)| sees(&s.placement)) {
            truth.traffic_signs.push(TrafficSignRecord {
                id: key_id(id),
                code: sign.code.clone(),
                value: sign.value,
                base: (&sign.placement).into(),
            });
        }
        for (id, light) in self.network.traffic_lights().filter(|(_, l)| sees(&l.placement)) {
            truth.traffic_lights.push(TrafficLightRecord {
                id: key_id(id),
                state: light.state(),
                base: (&light.placement).into(),
            });
        }
        for (id, marking) in self.network.road_markings().filter(|(_, m)| sees(&m.placement)) {
            truth.road_markings.push(RoadMarkingRecord {
                id: key_id(id),
                code: marking.code.clone(),
                base: (&marking.placement).into(),
            });
        }
        truth
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timestamp_from_millis() {
        assert_eq!(
            Timestamp::from_millis(12_345),
            Timestamp {
                seconds: 12,
                nanos: 345_000_000
            }
        );
        assert_eq!(Timestamp::from_millis(0), Timestamp::default());
    }

    #[test]
    fn empty_ground_truth_is_stamped() {
        let network = RoadNetwork::new();
        let objects = BTreeMap::new();
        let snapshot = Snapshot {
            network: &network,
            objects: &objects,
            version: InterfaceVersion::default(),
            time_ms: 1500,
            angle_epsilon: 1e-9,
        };
        let truth = snapshot.ground_truth();
        assert_eq!(truth.version.major, 3);
        assert_eq!(truth.timestamp.seconds, 1);
        assert_eq!(truth.timestamp.nanos, 500_000_000);
        assert!(truth.moving_objects.is_empty());
        assert!(truth.host_vehicle_id.is_none());
    }

    #[test]
    fn sensor_on_unknown_host() {
        let network = RoadNetwork::new();
        let objects = BTreeMap::new();
        let snapshot = Snapshot {
            network: &network,
            objects: &objects,
            version: InterfaceVersion::default(),
            time_ms: 0,
            angle_epsilon: 1e-9,
        };
        let sensor = SensorConfiguration {
            id: 1,
            host: ObjectId(42),
            mounting: MountingPosition::default(),
            field_of_view: 1.0,
            range: 50.0,
        };
        assert!(snapshot.sensor_view(&sensor).is_none());
    }
}
