//! Tests that involve committing changes to the world over several cycles.

mod common;

use assert_approx_eq::assert_approx_eq;
use common::{car_at, single_road};
use road_world::description::{
    GeometryDescription, RoadNetworkDescription, SignalDescription, SignalKind,
    StationaryObjectDescription,
};
use road_world::ground_truth::{MountingPosition, SensorConfiguration};
use road_world::math::{GeometryShape, Point2d};
use road_world::network::LightState;
use road_world::object::{MovingObjectState, ObjectKind};
use road_world::query::RouteElement;
use road_world::{CycleState, ObjectId, OutOfRangePolicy, Placed, World, WorldConfig};
use std::f64::consts::FRAC_PI_2;

/// A 100 m road with a traffic light at 50 m and a parked crate at 80 m.
fn furnished_road() -> World {
    let mut desc = single_road(100.0);
    let road = &mut desc.roads[0];
    road.signals.push(SignalDescription {
        id: "light".into(),
        s: 50.0,
        t: -4.0,
        kind: SignalKind::TrafficLight,
        value: None,
        validity: None,
        hdg: 0.0,
    });
    road.objects.push(StationaryObjectDescription {
        id: "crate".into(),
        s: 80.0,
        t: -1.5,
        z_offset: 0.0,
        hdg: 0.0,
        length: 1.0,
        width: 1.0,
        height: 1.0,
    });
    World::import(desc, WorldConfig::default()).unwrap()
}

/// Test that enqueued changes stay invisible until they are committed.
#[test]
fn commit_is_atomic() {
    let mut world = World::import(single_road(100.0), WorldConfig::default()).unwrap();
    let first = world.add_agent(car_at(10.0, -1.5, 0.0));
    assert_eq!(world.cycle_state(), CycleState::AcceptingMutations);
    assert!(world.object(first).is_none());
    assert_eq!(world.objects().count(), 0);

    world.sync(100);
    assert_eq!(world.cycle_state(), CycleState::Idle);
    assert_eq!(world.time_ms(), 100);
    assert!(world.object(first).is_some());

    let second = world.add_agent(car_at(30.0, -1.5, 0.0));
    world.remove_agent(first);
    world.update_agent(first, MovingObjectState::at(Point2d::new(60.0, -1.5), 0.0));
    assert!(world.object(first).is_some());
    assert!(world.object(second).is_none());
    assert_eq!(world.pending_mutations(), 3);

    world.sync(200);
    assert!(world.object(first).is_none());
    assert!(world.object(second).is_some());
    assert_eq!(world.pending_mutations(), 0);

    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let assigned = world
        .network()
        .lane(lane)
        .unwrap()
        .assignments()
        .iter()
        .map(|a| a.object)
        .collect::<Vec<_>>();
    assert_eq!(assigned, vec![second]);
}

/// Test that an update moves the object and its lane assignment.
#[test]
fn update_relocates_object() {
    let mut world = World::import(single_road(100.0), WorldConfig::default()).unwrap();
    let id = world.add_agent(car_at(10.0, -1.5, 0.0));
    world.sync(0);
    world.update_agent(id, MovingObjectState::at(Point2d::new(70.0, -1.5), 0.0));
    world.update_agent(id, MovingObjectState::at(Point2d::new(40.0, -1.5), 0.0));
    world.sync(100);

    let object = world.object(id).unwrap();
    assert_approx_eq!(object.position().x, 40.0);
    let reference = object.location().reference.unwrap();
    assert_approx_eq!(reference.s, 40.0);
    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let overlap = object.location().overlap(lane).unwrap();
    assert_approx_eq!(overlap.s_min, 38.0);
    assert_approx_eq!(overlap.s_max, 42.0);
}

/// Test that removing an unknown or stationary object changes nothing.
#[test]
fn removing_unknown_objects() {
    let mut world = furnished_road();
    let stationary = world.objects().next().unwrap().id();
    world.remove_agent(ObjectId(999));
    world.remove_agent(stationary);
    world.sync(100);
    assert_eq!(world.objects().count(), 1);
    assert!(world.object(stationary).is_some());
}

/// Test that stationary objects are placed and assigned at import.
#[test]
fn stationary_objects_are_placed() {
    let world = furnished_road();
    let object = world.objects().next().unwrap();
    let stationary = object.as_stationary().unwrap();
    assert_eq!(stationary.name(), "crate");
    assert_approx_eq!(object.position().x, 80.0);
    assert_approx_eq!(object.position().y, -1.5);

    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let overlap = object.location().overlap(lane).unwrap();
    assert_approx_eq!(overlap.s_min, 79.5);
    assert_approx_eq!(overlap.s_max, 80.5);
}

/// Test that traffic light states are committed with the other changes.
#[test]
fn traffic_light_state() {
    let mut world = furnished_road();
    let (light, _) = world.network().traffic_lights().next().unwrap();
    let lane = world.lane_id("main", -1, 0.0).unwrap();
    assert_eq!(world.network().lane(lane).unwrap().traffic_lights(), &[light]);

    world.set_traffic_light_state(light, LightState::Red);
    world.set_traffic_light_state(light, LightState::Green);
    assert_eq!(
        world.network().traffic_light(light).unwrap().state(),
        LightState::Off
    );
    world.sync(100);
    assert_eq!(
        world.network().traffic_light(light).unwrap().state(),
        LightState::Green
    );
    assert_eq!(world.ground_truth().traffic_lights[0].state, LightState::Green);
}

/// Test that a reset drops agents and pending changes but keeps the road network.
#[test]
fn reset_restores_import() {
    let mut world = furnished_road();
    let agent = world.add_agent(car_at(10.0, -1.5, 0.0));
    world.sync(100);
    world.add_agent(car_at(20.0, -1.5, 0.0));

    world.reset().unwrap();
    assert_eq!(world.time_ms(), 0);
    assert_eq!(world.pending_mutations(), 0);
    assert_eq!(world.cycle_state(), CycleState::Idle);
    assert!(world.object(agent).is_none());
    assert_eq!(world.objects().count(), 1);
    assert!(world.lane_id("main", -1, 0.0).is_some());

    world.sync(100);
    assert_eq!(world.objects().count(), 1);
}

/// Test that ground truth carries every object and the commit time.
#[test]
fn ground_truth_snapshot() {
    let mut world = furnished_road();
    world.add_agent(car_at(10.0, -1.5, 0.0));
    world.sync(1500);

    let truth = world.ground_truth();
    assert_eq!(truth.timestamp.seconds, 1);
    assert_eq!(truth.timestamp.nanos, 500_000_000);
    assert_eq!(truth.moving_objects.len(), 1);
    assert_eq!(truth.stationary_objects.len(), 1);
    assert_eq!(truth.lanes.len(), 1);
    assert_eq!(truth.traffic_lights.len(), 1);
    assert_eq!(truth.moving_objects[0].assigned_lane_ids, vec![truth.lanes[0].id]);
    assert!(truth.host_vehicle_id.is_none());
}

/// Test that a sensor sees what lies in its sector and always its host.
#[test]
fn sensor_view_filters_by_sector() {
    let mut world = furnished_road();
    let host = world.add_agent(car_at(10.0, -1.5, 0.0));
    let ahead = world.add_agent(car_at(40.0, -1.5, 0.0));
    let behind = world.add_agent(car_at(-30.0, -1.5, 0.0));
    world.sync(100);

    let sensor = SensorConfiguration {
        id: 7,
        host,
        mounting: MountingPosition {
            x: 2.0,
            ..Default::default()
        },
        field_of_view: FRAC_PI_2,
        range: 50.0,
    };
    let view = world.sensor_view(&sensor).unwrap();
    assert_eq!(view.sensor_id, 7);
    assert_eq!(view.host_vehicle_id, host.0);
    assert_eq!(view.global_ground_truth.host_vehicle_id, Some(host.0));
    let seen = view
        .global_ground_truth
        .moving_objects
        .iter()
        .map(|o| o.id)
        .collect::<Vec<_>>();
    assert_eq!(seen, vec![host.0, ahead.0]);
    assert!(!seen.contains(&behind.0));
    assert!(view.global_ground_truth.stationary_objects.is_empty());
    assert_eq!(view.global_ground_truth.traffic_lights.len(), 1);
    assert!(view.to_json().unwrap().contains("\"sensor_id\":7"));

    let blind = SensorConfiguration {
        field_of_view: 0.0,
        ..sensor
    };
    let view = world.sensor_view(&blind).unwrap();
    assert_eq!(view.global_ground_truth.moving_objects.len(), 1);
    assert_eq!(view.global_ground_truth.moving_objects[0].id, host.0);
}

/// Test that a sensor on a missing host yields no view.
#[test]
fn sensor_on_unknown_host() {
    let world = furnished_road();
    let sensor = SensorConfiguration {
        id: 1,
        host: ObjectId(42),
        mounting: MountingPosition::default(),
        field_of_view: FRAC_PI_2,
        range: 10.0,
    };
    assert!(world.sensor_view(&sensor).is_none());
}

/// Test the searches for the nearest objects of each kind along a stream.
#[test]
fn nearest_objects_along_stream() {
    let mut world = furnished_road();
    let first = world.add_agent(car_at(20.0, -1.5, 0.0));
    let second = world.add_agent(car_at(60.0, -1.5, 0.0));
    world.sync(100);
    let stationary = world
        .objects()
        .find(|o| o.kind() == ObjectKind::Stationary)
        .unwrap()
        .id();

    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let road = world.network().road_by_name("main").unwrap();
    let route = world.route(RouteElement::new(road, true), road).unwrap();
    let stream = world.lane_stream(&route, lane);
    let ids = |objects: Vec<&road_world::WorldObject>| objects.iter().map(|o| o.id()).collect::<Vec<_>>();

    assert_eq!(
        ids(world.objects_of_kind_in_range(&stream, 0.0, 100.0, ObjectKind::Moving)),
        vec![first, second]
    );
    assert_eq!(
        ids(world.objects_of_kind_in_range(&stream, 0.0, 100.0, ObjectKind::Stationary)),
        vec![stationary]
    );

    let next = |position: f64, length: f64, kind: Option<ObjectKind>| {
        world
            .next_object_in_lane(&stream, position, length, kind)
            .map(|o| o.id())
    };
    assert_eq!(next(30.0, 100.0, None), Some(second));
    assert_eq!(next(30.0, 100.0, Some(ObjectKind::Stationary)), Some(stationary));
    assert_eq!(next(30.0, 20.0, None), None);

    let last = |position: f64, length: f64, kind: Option<ObjectKind>| {
        world
            .last_object_in_lane(&stream, position, length, kind)
            .map(|o| o.id())
    };
    assert_eq!(last(0.0, 100.0, None), Some(stationary));
    assert_eq!(last(0.0, 100.0, Some(ObjectKind::Moving)), Some(second));
    assert_eq!(last(0.0, 50.0, Some(ObjectKind::Moving)), Some(first));
}

/// A road curving left on a 10 m radius, whose lane elements fan out on the outside.
fn curved_road(policy: OutOfRangePolicy) -> World {
    let mut desc: RoadNetworkDescription = single_road(10.0);
    desc.roads[0].geometries = vec![GeometryDescription {
        s: 0.0,
        x: 0.0,
        y: 0.0,
        hdg: 0.0,
        length: 10.0,
        shape: GeometryShape::Arc { curvature: 0.1 },
    }];
    let config = WorldConfig {
        out_of_range_policy: policy,
        ..Default::default()
    };
    World::import(desc, config).unwrap()
}

/// Test that an object reaching past the start of a curved lane is clamped or dropped.
#[test]
fn overlap_outside_lane_range() {
    // The outer corner of the first element projects just before s = 0.
    let mut clamped = curved_road(OutOfRangePolicy::Clamp);
    let id = clamped.add_agent(car_at(0.0, -1.5, 0.0));
    clamped.sync(0);
    let lane = clamped.lane_id("main", -1, 0.0).unwrap();
    let overlap = *clamped.object(id).unwrap().location().overlap(lane).unwrap();
    assert_eq!(overlap.s_min, 0.0);
    assert!(overlap.s_max > 1.0);
    assert_eq!(clamped.network().lane(lane).unwrap().assignments().len(), 1);

    let mut dropped = curved_road(OutOfRangePolicy::Drop);
    let id = dropped.add_agent(car_at(0.0, -1.5, 0.0));
    dropped.sync(0);
    let lane = dropped.lane_id("main", -1, 0.0).unwrap();
    let object = dropped.object(id).unwrap();
    assert!(object.location().overlap(lane).is_none());
    assert!(!object.location().is_on_road());
    assert!(dropped.network().lane(lane).unwrap().assignments().is_empty());
}
