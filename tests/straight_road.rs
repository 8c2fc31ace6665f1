//! Tests that involve a single straight road.

mod common;

use assert_approx_eq::assert_approx_eq;
use common::{car_at, single_road, two_section_road, two_way_road};
use road_world::cgmath::prelude::*;
use road_world::description::RoadMarkDescription;
use road_world::math::Point2d;
use road_world::network::{LaneType, RoadMarkType};
use road_world::query::{LaneCategory, LaneStream, RouteElement};
use road_world::{LaneId, Placed, World, WorldConfig};
use std::f64::consts::PI;

/// Test that a 10 m road sampled every metre gets a joint per metre, 3 m apart at the edges.
#[test]
fn lane_geometry_is_sampled() {
    let world = World::import(single_road(10.0), WorldConfig::default()).unwrap();
    let lane_id = world.lane_id("main", -1, 5.0).unwrap();
    let lane = world.network().lane(lane_id).unwrap();

    assert_eq!(lane.joints().len(), 11);
    assert_eq!(lane.elements().len(), 10);
    for (i, joint) in lane.joints().iter().enumerate() {
        assert_approx_eq!(joint.s, i as f64);
        assert_approx_eq!(joint.centre.y, -1.5);
        assert_approx_eq!((joint.left - joint.centre).magnitude(), 1.5);
        assert_approx_eq!((joint.right - joint.centre).magnitude(), 1.5);
        assert_approx_eq!(joint.left.y, 0.0);
        assert_approx_eq!(joint.right.y, -3.0);
        assert_approx_eq!(joint.curvature, 0.0);
    }
    assert_approx_eq!(world.lane_width(lane_id, 4.2).unwrap(), 3.0);
    assert_approx_eq!(world.lane_curvature(lane_id, 4.2).unwrap(), 0.0);
    assert_approx_eq!(world.lane_direction(lane_id, 4.2).unwrap(), 0.0);
}

/// Test that a lane covers both ends of its range and nothing beyond.
#[test]
fn lane_covers_its_closed_range() {
    let world = World::import(single_road(10.0), WorldConfig::default()).unwrap();
    let lane = world
        .network()
        .lane(world.lane_id("main", -1, 0.0).unwrap())
        .unwrap();

    assert!(lane.covers(0.0));
    assert!(lane.covers(10.0));
    assert!(!lane.covers(11.0));
    assert!(!lane.covers(-1.0));
}

/// Test that objects are found by the part of the stream they overlap.
#[test]
fn objects_in_range_along_stream() {
    let mut world = World::import(single_road(600.0), WorldConfig::default()).unwrap();
    let near = world.add_agent(car_at(5.0, -1.5, 0.0));
    let middle = world.add_agent(car_at(50.0, -1.5, 0.0));
    let far = world.add_agent(car_at(500.0, -1.5, 0.0));
    world.sync(100);

    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let road = world.network().road_of_lane(lane).unwrap().id();
    let route = world.route(RouteElement::new(road, true), road).unwrap();
    let stream = world.lane_stream(&route, lane);
    assert_approx_eq!(stream.length(), 600.0);

    let found = world.objects_in_range(&stream, 60.0, 50.0, 50.0);
    let ids = found.iter().map(|o| o.id()).collect::<Vec<_>>();
    assert_eq!(ids, vec![middle]);

    let everything = world.objects_in_range(&stream, 300.0, 300.0, 300.0);
    let ids = everything.iter().map(|o| o.id()).collect::<Vec<_>>();
    assert_eq!(ids, vec![near, middle, far]);
}

/// Test that world and lane coordinates convert back and forth.
#[test]
fn world_position_and_locate_point() {
    let world = World::import(single_road(20.0), WorldConfig::default()).unwrap();
    let lane = world.lane_id("main", -1, 0.0).unwrap();

    let point = world.world_position(lane, 7.5, 0.5).unwrap();
    assert_approx_eq!(point.x, 7.5);
    assert_approx_eq!(point.y, -1.0);

    let position = world.locate_point(point, 0.25).unwrap();
    assert_eq!(position.lane, lane);
    assert_approx_eq!(position.s, 7.5);
    assert_approx_eq!(position.t, 0.5);
    assert_approx_eq!(position.hdg, 0.25);

    assert!(world.locate_point(Point2d::new(7.5, 4.0), 0.0).is_none());
}

/// Test that an object straddling the lane edge touches it with no margin on that side.
#[test]
fn object_overlapping_lane_edge() {
    let mut world = World::import(single_road(20.0), WorldConfig::default()).unwrap();
    let id = world.add_agent(car_at(10.0, -0.5, 0.0));
    world.sync(0);

    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let object = world.object(id).unwrap();
    let overlap = object.location().overlap(lane).unwrap();
    assert_approx_eq!(overlap.s_min, 8.0);
    assert_approx_eq!(overlap.s_max, 12.0);
    assert_approx_eq!(overlap.min_delta_left, 0.0);
    assert_approx_eq!(overlap.min_delta_right, 1.5);
}

/// Test that the drivable part of the stream runs to the end of the road.
#[test]
fn distance_to_end_of_lane() {
    let world = World::import(single_road(100.0), WorldConfig::default()).unwrap();
    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let road = world.network().road_of_lane(lane).unwrap().id();
    let route = world.route(RouteElement::new(road, true), road).unwrap();
    let stream = world.lane_stream(&route, lane);

    let types = stream.lane_types(world.network());
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].lane_type, LaneType::Driving);
    assert!(types[0].lane_type.is_drivable());
    assert!(!LaneType::Sidewalk.is_drivable());

    assert_approx_eq!(
        world.distance_to_end_of_lane(&stream, 30.0, 1000.0, &[LaneType::Driving]),
        70.0
    );
    assert_eq!(
        world.distance_to_end_of_lane(&stream, 30.0, 10.0, &[LaneType::Driving]),
        f64::INFINITY
    );
    assert_approx_eq!(
        world.distance_to_end_of_lane(&stream, 30.0, 1000.0, &[LaneType::Shoulder]),
        0.0
    );
}

/// Test that a car ahead in the same lane blocks it entirely.
#[test]
fn obstruction_of_car_ahead() {
    let mut world = World::import(single_road(100.0), WorldConfig::default()).unwrap();
    let ahead = world.add_agent(car_at(40.0, -1.5, 0.0));
    world.sync(0);

    let lane = world.lane_id("main", -1, 0.0).unwrap();
    let road = world.network().road_of_lane(lane).unwrap().id();
    let route = world.route(RouteElement::new(road, true), road).unwrap();
    let stream = world.lane_stream(&route, lane);

    let obstruction = world.obstruction(&stream, 0.0, ahead);
    assert!(obstruction.valid);
    assert_approx_eq!(obstruction.left, 1.0);
    assert_approx_eq!(obstruction.right, -1.0);
    assert!(obstruction.blocks(1.0));
}

/// Builds the stream through a lane along its own road.
fn stream_on_road(world: &World, lane: LaneId, in_road_direction: bool) -> LaneStream {
    let road = world.network().road_of_lane(lane).unwrap().id();
    let route = world
        .route(RouteElement::new(road, in_road_direction), road)
        .unwrap();
    world.lane_stream(&route, lane)
}

/// Test that a road mark starting inside a section gets a joint of its own.
#[test]
fn road_mark_start_is_sampled() {
    let mut desc = single_road(10.0);
    let mark = |s_offset: f64, kind: RoadMarkType| RoadMarkDescription {
        s_offset,
        kind,
        color: Default::default(),
        weight: Default::default(),
    };
    desc.roads[0].sections[0].lanes[1].road_marks =
        vec![mark(0.0, RoadMarkType::Solid), mark(2.5, RoadMarkType::Broken)];
    let world = World::import(desc, WorldConfig::default()).unwrap();
    let lane = world.network().lane(world.lane_id("main", -1, 0.0).unwrap()).unwrap();

    let offsets = lane.joints().iter().map(|j| j.s).collect::<Vec<_>>();
    let expected = [0.0, 1.0, 2.0, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.0];
    assert_eq!(offsets.len(), expected.len());
    for (s, e) in offsets.iter().zip(expected) {
        assert_approx_eq!(*s, e);
    }

    let ranges = lane
        .right_boundaries()
        .iter()
        .map(|id| world.network().boundary(*id).unwrap().range())
        .collect::<Vec<_>>();
    assert_eq!(ranges.len(), 2);
    assert_approx_eq!(ranges[0].max, 2.5);
    assert_approx_eq!(ranges[1].min, 2.5);
}

/// Test that an object across a section boundary is found once.
#[test]
fn object_across_sections_found_once() {
    let mut world = World::import(two_section_road(), WorldConfig::default()).unwrap();
    let id = world.add_agent(car_at(50.0, -1.5, 0.0));
    world.sync(0);

    let first = world.lane_id("main", -1, 10.0).unwrap();
    let second = world.lane_id("main", -1, 60.0).unwrap();
    assert_ne!(first, second);
    let object = world.object(id).unwrap();
    assert_approx_eq!(object.location().overlap(first).unwrap().s_min, 48.0);
    assert_approx_eq!(object.location().overlap(second).unwrap().s_max, 52.0);

    let stream = stream_on_road(&world, first, true);
    assert_eq!(stream.elements().len(), 2);
    let found = world.objects_in_range(&stream, 50.0, 10.0, 10.0);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), id);
}

/// Test that a stream against the road runs from the road's end back to its start.
#[test]
fn stream_against_road_direction() {
    let mut world = World::import(two_way_road(100.0), WorldConfig::default()).unwrap();
    let near_start = world.add_agent(car_at(20.0, 1.5, PI));
    let near_end = world.add_agent(car_at(70.0, 1.5, PI));
    world.sync(0);

    let lane = world.lane_id("main", 1, 0.0).unwrap();
    let stream = stream_on_road(&world, lane, false);
    assert!(!stream.elements()[0].in_stream_direction);
    assert_approx_eq!(stream.stream_position(lane, 70.0).unwrap(), 30.0);
    let position = stream.road_position(30.0, 0.5).unwrap();
    assert_approx_eq!(position.s, 70.0);
    assert_approx_eq!(position.t, -0.5);
    assert_approx_eq!(position.hdg, PI);

    let ids = world
        .objects_in_range(&stream, 50.0, 50.0, 50.0)
        .iter()
        .map(|o| o.id())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![near_end, near_start]);
    let ids = world
        .objects_in_range(&stream, 30.0, 5.0, 5.0)
        .iter()
        .map(|o| o.id())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![near_end]);

    let next = world.next_object_in_lane(&stream, 0.0, 100.0, None).unwrap();
    assert_eq!(next.id(), near_end);
    let last = world.last_object_in_lane(&stream, 0.0, 100.0, None).unwrap();
    assert_eq!(last.id(), near_start);

    assert_approx_eq!(
        world.distance_to_end_of_lane(&stream, 10.0, 1000.0, &[LaneType::Driving]),
        90.0
    );
}

/// Test the lane layout queries on a road with a lane on each side.
#[test]
fn lanes_across_road() {
    let world = World::import(two_way_road(100.0), WorldConfig::default()).unwrap();
    let road = world.network().road_by_name("main").unwrap();
    let left = world.lane_id("main", 1, 0.0).unwrap();
    let right = world.lane_id("main", -1, 0.0).unwrap();

    assert_eq!(world.number_of_lanes(road, 50.0), 2);
    assert_eq!(world.number_of_lanes(road, 150.0), 0);
    assert_eq!(
        world.lanes_of_type_at(road, 50.0, &[LaneType::Driving]),
        vec![left, right]
    );
    assert!(world
        .lanes_of_type_at(road, 50.0, &[LaneType::Shoulder])
        .is_empty());

    let results = world.query_lanes(road, 0.0, 100.0);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].stream_id, left);
    assert_eq!(results[0].category, LaneCategory::RegularLane);
    assert_eq!(results[1].stream_id, right);
    assert_eq!(results[1].category, LaneCategory::RightMostLane);
    assert!(results.iter().all(|r| r.is_driving_lane));
}

/// Test that the lanes of consecutive sections report the same run.
#[test]
fn lane_runs_span_sections() {
    let world = World::import(two_section_road(), WorldConfig::default()).unwrap();
    let road = world.network().road_by_name("main").unwrap();
    let first = world.lane_id("main", -1, 10.0).unwrap();
    let second = world.lane_id("main", -1, 60.0).unwrap();

    let run = world.query_lane(second).unwrap();
    assert_eq!(run.stream_id, first);
    assert_approx_eq!(run.start, 0.0);
    assert_approx_eq!(run.end, 100.0);

    assert_eq!(world.query_lanes(road, 0.0, 100.0), vec![run]);
    assert_eq!(world.query_lanes(road, 60.0, 70.0), vec![run]);
    assert!(world.query_lanes(road, 120.0, 130.0).is_empty());
}
