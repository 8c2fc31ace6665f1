use crate::config::WorldConfig;
use crate::converter::{build_network, reference_pose};
use crate::description::RoadNetworkDescription;
use crate::error::{Result, WorldError};
use crate::ground_truth::{GroundTruth, SensorConfiguration, SensorView, Snapshot};
use crate::localization::{locate, locate_point};
use crate::math::Point2d;
use crate::network::{
    IntersectingConnectionRank, IntersectionInfo, LaneType, LightState, RoadNetwork,
};
use crate::object::{
    Dimension, MovingObject, MovingObjectAttributes, MovingObjectState, ObjectId,
    ObjectIdAllocator, ObjectKind, Placed, RoadPosition, StationaryObject, WorldObject,
};
use crate::query::{
    apply_sector_filter, connector_crossing, find_route, moving_objects_near_connector,
    query_lane, query_lanes, ConnectorCrossing, LaneMarkingHit, LaneQueryResult, LaneStream,
    Obstruction, Route, RouteElement, Side, SignalHit,
};
use crate::sync::{CycleState, Mutation, MutationQueue};
use crate::{JunctionId, LaneId, MarkingId, RoadId, SignId, TrafficLightId};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// The spatial world model of a simulation run.
///
/// Agents read from the world through shared references and enqueue their changes,
/// which only become visible once [World::sync] commits them.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    /// The description the network was built from, kept for resets.
    description: RoadNetworkDescription,
    network: RoadNetwork,
    /// Every committed object.
    objects: BTreeMap<ObjectId, WorldObject>,
    queue: MutationQueue,
    ids: ObjectIdAllocator,
    /// The time of the last commit, in ms since the start of the run.
    time_ms: u64,
}

impl World {
    /// Builds a world from a road network description.
    ///
    /// Fails if the configuration is invalid or the description describes an
    /// inconsistent network.
    pub fn import(description: RoadNetworkDescription, config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let mut world = Self {
            config,
            description,
            network: RoadNetwork::new(),
            objects: BTreeMap::new(),
            queue: MutationQueue::new(),
            ids: ObjectIdAllocator::default(),
            time_ms: 0,
        };
        world.load()?;
        Ok(world)
    }

    /// Rebuilds the network and stationary objects from the stored description.
    fn load(&mut self) -> Result<()> {
        self.network = build_network(&self.description, &self.config)?;
        self.objects.clear();
        self.place_stationary_objects()?;
        info!(
            "Imported {} roads with {} lanes, {} junctions and {} stationary objects",
            self.network.roads().count(),
            self.network.lanes().count(),
            self.network.junctions().count(),
            self.objects.len()
        );
        Ok(())
    }

    fn place_stationary_objects(&mut self) -> Result<()> {
        for road_desc in &self.description.roads {
            let road = self
                .network
                .road_by_name(&road_desc.id)
                .ok_or_else(|| WorldError::UnknownRoad {
                    road: road_desc.id.clone(),
                })?;
            for obj in &road_desc.objects {
                let Some((position, heading, elevation)) =
                    reference_pose(&self.network, road, obj.s, obj.t)
                else {
                    warn!(
                        "Object '{}' at s = {} lies outside the geometry of road '{}'",
                        obj.id, obj.s, road_desc.id
                    );
                    continue;
                };
                let id = self.ids.next();
                let dimension = Dimension {
                    length: obj.length,
                    width: obj.width,
                    height: obj.height,
                };
                let mut object = StationaryObject::new(
                    id,
                    obj.id.clone(),
                    dimension,
                    position,
                    elevation + obj.z_offset,
                    heading + obj.hdg,
                );
                let location = locate(
                    &self.network,
                    &object.corners(),
                    position,
                    object.yaw(),
                    self.config.out_of_range_policy,
                );
                for (lane, overlap) in &location.overlaps {
                    if let Some(lane) = self.network.lane_mut(*lane) {
                        lane.assignments_mut().insert(id, ObjectKind::Stationary, *overlap);
                    }
                }
                object.set_location(location);
                self.objects.insert(id, WorldObject::Stationary(object));
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The road network.
    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// Gets the committed object with the given ID.
    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    /// Returns an iterator over all the committed objects.
    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    /// The time of the last commit, in ms.
    pub fn time_ms(&self) -> u64 {
        self.time_ms
    }

    pub fn cycle_state(&self) -> CycleState {
        self.queue.state()
    }

    /// The number of mutations waiting for the next commit.
    pub fn pending_mutations(&self) -> usize {
        self.queue.len()
    }

    /// Enqueues a new agent, returning the ID it will have once committed.
    pub fn add_agent(&self, attributes: MovingObjectAttributes) -> ObjectId {
        let id = self.ids.next();
        self.queue
            .push(Mutation::AddMovingObject { id, attributes });
        id
    }

    /// Enqueues the removal of an agent.
    pub fn remove_agent(&self, id: ObjectId) {
        self.queue.push(Mutation::RemoveMovingObject(id));
    }

    /// Enqueues a new state for an agent.
    pub fn update_agent(&self, id: ObjectId, state: MovingObjectState) {
        self.queue.push(Mutation::UpdateMovingObject { id, state });
    }

    /// Enqueues a new state for a traffic light.
    pub fn set_traffic_light_state(&self, light: TrafficLightId, state: LightState) {
        self.queue
            .push(Mutation::SetTrafficLightState { light, state });
    }

    /// Commits every enqueued mutation and relocates every moving object.
    ///
    /// # Parameters
    /// * `time_ms` - The simulation time of the new snapshot, in ms
    pub fn sync(&mut self, time_ms: u64) {
        let batch = self.queue.drain();

        for id in &batch.removes {
            match self.objects.get(id).map(WorldObject::kind) {
                Some(ObjectKind::Moving) => {
                    self.objects.remove(id);
                }
                Some(ObjectKind::Stationary) => {
                    warn!("Object {:?} is stationary and cannot be removed", id)
                }
                None => warn!("Cannot remove unknown object {:?}", id),
            }
        }
        for (id, attributes) in &batch.adds {
            self.objects
                .insert(*id, WorldObject::Moving(MovingObject::new(*id, attributes)));
        }
        for (id, state) in &batch.updates {
            match self.objects.get_mut(id) {
                Some(WorldObject::Moving(object)) => object.set_state(*state),
                _ => debug!("Ignoring update of unknown object {:?}", id),
            }
        }
        for (light, state) in &batch.light_states {
            match self.network.traffic_light_mut(*light) {
                Some(l) => l.set_state(*state),
                None => warn!("Cannot set state of unknown traffic light {:?}", light),
            }
        }

        self.network.clear_moving_assignments();
        let network = &mut self.network;
        for object in self.objects.values_mut() {
            let WorldObject::Moving(object) = object else {
                continue;
            };
            let location = locate(
                network,
                &object.corners(),
                object.position(),
                object.yaw(),
                self.config.out_of_range_policy,
            );
            for (lane, overlap) in &location.overlaps {
                if let Some(lane) = network.lane_mut(*lane) {
                    lane.assignments_mut()
                        .insert(object.id(), ObjectKind::Moving, *overlap);
                }
            }
            object.set_location(location);
        }

        self.time_ms = time_ms;
        self.queue.finish();
        debug!(
            "Committed {} removes, {} adds, {} updates and {} light states at {} ms",
            batch.removes.len(),
            batch.adds.len(),
            batch.updates.len(),
            batch.light_states.len(),
            time_ms
        );
    }

    /// Discards every object and pending mutation and rebuilds the world from its description.
    pub fn reset(&mut self) -> Result<()> {
        self.queue.clear();
        self.time_ms = 0;
        self.load()?;
        info!("World reset");
        Ok(())
    }

    /// Finds a lane by its road's authoring id, its signed index and an s-offset on the road.
    pub fn lane_id(&self, road: &str, signed_id: i32, s: f64) -> Option<LaneId> {
        self.network.lane_by_name(road, signed_id, s)
    }

    /// The shortest route from a road to another.
    pub fn route(&self, from: RouteElement, to: RoadId) -> Option<Route> {
        find_route(&self.network, from, to)
    }

    /// The lane stream through `lane` along `route`.
    pub fn lane_stream(&self, route: &Route, lane: LaneId) -> LaneStream {
        LaneStream::new(&self.network, route, lane)
    }

    /// The objects on a stream within `backward` behind and `forward` ahead of a position,
    /// in stream order.
    pub fn objects_in_range(
        &self,
        stream: &LaneStream,
        position: f64,
        backward: f64,
        forward: f64,
    ) -> Vec<&WorldObject> {
        stream
            .objects_in_range(&self.network, position - backward, position + forward)
            .into_iter()
            .filter_map(|id| self.objects.get(&id))
            .collect()
    }

    /// The objects of one kind on a stream between two stream positions, in stream order.
    pub fn objects_of_kind_in_range(
        &self,
        stream: &LaneStream,
        start: f64,
        end: f64,
        kind: ObjectKind,
    ) -> Vec<&WorldObject> {
        stream
            .objects_of_kind_in_range(&self.network, start, end, Some(kind))
            .into_iter()
            .filter_map(|id| self.objects.get(&id))
            .collect()
    }

    /// The first object ahead of a stream position, within `max_search_length`.
    ///
    /// # Parameters
    /// * `kind` - The kind of object to find, or `None` for any object
    pub fn next_object_in_lane(
        &self,
        stream: &LaneStream,
        position: f64,
        max_search_length: f64,
        kind: Option<ObjectKind>,
    ) -> Option<&WorldObject> {
        let id = stream.next_object(&self.network, position, max_search_length, kind)?;
        self.objects.get(&id)
    }

    /// The last object before the end of a search window starting at a stream position.
    pub fn last_object_in_lane(
        &self,
        stream: &LaneStream,
        position: f64,
        max_search_length: f64,
        kind: Option<ObjectKind>,
    ) -> Option<&WorldObject> {
        let id = stream.last_object(&self.network, position, max_search_length, kind)?;
        self.objects.get(&id)
    }

    /// The moving objects on or approaching a connecting road, within `range` of its end.
    pub fn moving_objects_near_connector(&self, connecting: RoadId, range: f64) -> Vec<&WorldObject> {
        moving_objects_near_connector(&self.network, connecting, range)
            .into_iter()
            .filter_map(|id| self.objects.get(&id))
            .collect()
    }

    /// The distance from the front of an object to where its route onto `own` starts
    /// crossing a lane of `intersecting`.
    ///
    /// # Parameters
    /// * `object` - The object heading onto or driving on `own`
    /// * `own` - The object's connecting road
    /// * `intersecting` - Another connecting road of the same junction
    /// * `intersecting_lane` - The authoring-time index of the lane of `intersecting`
    pub fn distance_until_object_enters_connector(
        &self,
        object: ObjectId,
        own: RoadId,
        intersecting: RoadId,
        intersecting_lane: i32,
    ) -> Option<f64> {
        self.connector_crossing(object, own, intersecting, intersecting_lane)
            .map(|c| c.until_enters)
    }

    /// The distance from the rear of an object to where its route onto `own` stops
    /// crossing a lane of `intersecting`.
    pub fn distance_until_object_leaves_connector(
        &self,
        object: ObjectId,
        own: RoadId,
        intersecting: RoadId,
        intersecting_lane: i32,
    ) -> Option<f64> {
        self.connector_crossing(object, own, intersecting, intersecting_lane)
            .map(|c| c.until_leaves)
    }

    fn connector_crossing(
        &self,
        object: ObjectId,
        own: RoadId,
        intersecting: RoadId,
        intersecting_lane: i32,
    ) -> Option<ConnectorCrossing> {
        let object = self.objects.get(&object)?;
        let section = self.network.section_at(intersecting, 0.0)?;
        let lane = self.network.lane_in_section(section, intersecting_lane)?;
        connector_crossing(&self.network, object.location(), own, intersecting, lane)
    }

    /// The distance along a route from an object to the first road of a junction.
    pub fn distance_to_junction(
        &self,
        route: &Route,
        object: ObjectId,
        junction: JunctionId,
    ) -> Option<f64> {
        let position = self.objects.get(&object)?.location().reference?;
        route.distance_to_junction(&self.network, &position, junction)
    }

    /// The objects whose reference point lies within a circular sector.
    pub fn objects_in_sector(
        &self,
        origin: Point2d,
        radius: f64,
        left_angle: f64,
        right_angle: f64,
    ) -> Vec<&WorldObject> {
        apply_sector_filter(
            self.objects.values(),
            |o| o.position(),
            origin,
            radius,
            left_angle,
            right_angle,
            self.config.angle_epsilon,
        )
    }

    /// The distance along a stream to the first lane not of an allowed type.
    pub fn distance_to_end_of_lane(
        &self,
        stream: &LaneStream,
        position: f64,
        max_search_length: f64,
        allowed: &[LaneType],
    ) -> f64 {
        stream.distance_to_end_of_lane(&self.network, position, max_search_length, allowed)
    }

    pub fn traffic_signs_in_range(
        &self,
        stream: &LaneStream,
        position: f64,
        range: f64,
    ) -> Vec<SignalHit<SignId>> {
        stream.traffic_signs_in_range(&self.network, position, range)
    }

    pub fn road_markings_in_range(
        &self,
        stream: &LaneStream,
        position: f64,
        range: f64,
    ) -> Vec<SignalHit<MarkingId>> {
        stream.road_markings_in_range(&self.network, position, range)
    }

    pub fn lane_markings_in_range(
        &self,
        stream: &LaneStream,
        position: f64,
        range: f64,
        side: Side,
    ) -> Vec<LaneMarkingHit> {
        stream.lane_markings_in_range(&self.network, position, range, side)
    }

    /// How far another object intrudes relative to a lateral offset along a stream.
    pub fn obstruction(&self, stream: &LaneStream, t: f64, other: ObjectId) -> Obstruction {
        match self.objects.get(&other) {
            Some(object) => stream.obstruction(&self.network, t, object),
            None => Obstruction::invalid(),
        }
    }

    /// The number of lanes of a road at `s`.
    pub fn number_of_lanes(&self, road: RoadId, s: f64) -> usize {
        self.network.number_of_lanes(road, s)
    }

    /// The lanes of a road at `s` whose type is one of `lane_types`.
    pub fn lanes_of_type_at(&self, road: RoadId, s: f64, lane_types: &[LaneType]) -> Vec<LaneId> {
        self.network.lanes_of_type_at(road, s, lane_types)
    }

    pub fn query_lane(&self, lane: LaneId) -> Option<LaneQueryResult> {
        query_lane(&self.network, lane)
    }

    /// Describes each run of lanes on a road between two s-offsets.
    pub fn query_lanes(&self, road: RoadId, start: f64, end: f64) -> Vec<LaneQueryResult> {
        query_lanes(&self.network, road, start, end)
    }

    pub fn lane_width(&self, lane: LaneId, s: f64) -> Option<f64> {
        self.network.lane(lane)?.width_at(s)
    }

    pub fn lane_curvature(&self, lane: LaneId, s: f64) -> Option<f64> {
        self.network.lane(lane)?.curvature_at(s)
    }

    pub fn lane_direction(&self, lane: LaneId, s: f64) -> Option<f64> {
        self.network.lane(lane)?.direction_at(s)
    }

    /// The world position at `s` on a lane, offset by `t` from its centre.
    pub fn world_position(&self, lane: LaneId, s: f64, t: f64) -> Option<Point2d> {
        self.network.lane(lane)?.interpolate(s, t)
    }

    /// The lane position of a world point, with `yaw` made relative to the lane.
    pub fn locate_point(&self, point: Point2d, yaw: f64) -> Option<RoadPosition> {
        locate_point(&self.network, point, yaw)
    }

    /// The priority of one connecting road of a junction over another.
    pub fn junction_priority(
        &self,
        junction: JunctionId,
        own: RoadId,
        other: RoadId,
    ) -> Option<IntersectingConnectionRank> {
        Some(self.network.junction(junction)?.rank(own, other))
    }

    /// Where a connecting road crosses the other roads of its junction.
    pub fn intersections(&self, road: RoadId) -> &[IntersectionInfo] {
        self.network
            .road(road)
            .and_then(|r| r.junction())
            .and_then(|j| self.network.junction(j))
            .map(|j| j.intersections(road))
            .unwrap_or_default()
    }

    /// The complete ground truth at the last commit.
    pub fn ground_truth(&self) -> GroundTruth {
        self.snapshot().ground_truth()
    }

    /// The ground truth seen by a sensor, or `None` if its host does not exist.
    pub fn sensor_view(&self, sensor: &SensorConfiguration) -> Option<SensorView> {
        self.snapshot().sensor_view(sensor)
    }

    fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            network: &self.network,
            objects: &self.objects,
            version: self.config.interface_version,
            time_ms: self.time_ms,
            angle_epsilon: self.config.angle_epsilon,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::description::{
        GeometryDescription, LaneDescription, RoadDescription, SectionDescription,
    };
    use crate::math::GeometryShape;
    use crate::object::{Dimension, MovingObjectType};
    use std::thread;

    fn world() -> World {
        let desc = RoadNetworkDescription {
            roads: vec![RoadDescription {
                id: "r".into(),
                length: 50.0,
                geometries: vec![GeometryDescription {
                    s: 0.0,
                    x: 0.0,
                    y: 0.0,
                    hdg: 0.0,
                    length: 50.0,
                    shape: GeometryShape::Line,
                }],
                sections: vec![SectionDescription {
                    s: 0.0,
                    lanes: vec![LaneDescription::centre(), LaneDescription::driving(-1, 3.5)],
                }],
                ..Default::default()
            }],
            junctions: vec![],
        };
        World::import(desc, WorldConfig::default()).unwrap()
    }

    fn attributes(x: f64) -> MovingObjectAttributes {
        MovingObjectAttributes {
            kind: MovingObjectType::Car,
            dimension: Dimension {
                length: 4.0,
                width: 1.8,
                height: 1.5,
            },
            state: MovingObjectState::at(Point2d::new(x, -1.75), 0.0),
        }
    }

    #[test]
    fn agents_enqueue_from_many_threads() {
        let mut world = world();
        let ids = thread::scope(|scope| {
            let handles = (0..4)
                .map(|i| {
                    let world = &world;
                    scope.spawn(move || world.add_agent(attributes(5.0 + 10.0 * i as f64)))
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert_eq!(world.pending_mutations(), 4);
        assert_eq!(world.objects().count(), 0);

        world.sync(40);
        assert_eq!(world.objects().count(), 4);
        let lane = world.lane_id("r", -1, 0.0).unwrap();
        assert_eq!(world.network().lane(lane).unwrap().assignments().len(), 4);
        for id in ids {
            assert!(world.object(id).unwrap().location().is_on_road());
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = WorldConfig {
            sampling_rate: 0.0,
            ..Default::default()
        };
        let err = World::import(RoadNetworkDescription::default(), config).unwrap_err();
        assert!(matches!(err, WorldError::InvalidConfig { .. }));
    }

    #[test]
    fn objects_in_sector_use_reference_points() {
        let mut world = world();
        let near = world.add_agent(attributes(10.0));
        world.add_agent(attributes(45.0));
        world.sync(0);

        let found = world.objects_in_sector(Point2d::new(0.0, -1.75), 20.0, 0.5, -0.5);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), near);
    }
}
