//! Road networks shared by the integration tests.
#![allow(dead_code)]

use road_world::description::{
    ConnectionDescription, ContactPoint, GeometryDescription, JunctionDescription,
    LaneDescription, PriorityDescription, RoadDescription, RoadLinkDescription,
    RoadNetworkDescription, SectionDescription,
};
use road_world::math::{GeometryShape, Point2d};
use road_world::object::{Dimension, MovingObjectAttributes, MovingObjectState, MovingObjectType};
use std::f64::consts::FRAC_PI_2;

/// A straight road along a line with a single right-hand driving lane.
pub fn straight_road(
    id: &str,
    start: (f64, f64),
    hdg: f64,
    length: f64,
    width: f64,
) -> RoadDescription {
    straight_road_with_lanes(id, start, hdg, length, width, 1)
}

/// A straight road along a line with `count` right-hand driving lanes of equal width.
pub fn straight_road_with_lanes(
    id: &str,
    start: (f64, f64),
    hdg: f64,
    length: f64,
    width: f64,
    count: i32,
) -> RoadDescription {
    let mut lanes = vec![LaneDescription::centre()];
    lanes.extend((1..=count).map(|i| LaneDescription::driving(-i, width)));
    RoadDescription {
        id: id.into(),
        length,
        geometries: vec![GeometryDescription {
            s: 0.0,
            x: start.0,
            y: start.1,
            hdg,
            length,
            shape: GeometryShape::Line,
        }],
        sections: vec![SectionDescription { s: 0.0, lanes }],
        ..Default::default()
    }
}

/// A network made of one straight road along the x-axis.
pub fn single_road(length: f64) -> RoadNetworkDescription {
    RoadNetworkDescription {
        roads: vec![straight_road("main", (0.0, 0.0), 0.0, length, 3.0)],
        junctions: vec![],
    }
}

/// Two incoming roads feeding a junction whose connecting roads cross at right angles.
///
/// `c1` runs east from (0, 0) and `c2` runs north from (10, -10); both have one 3 m lane,
/// so their lanes overlap in the square x in [10, 13], y in [-3, 0]. `c1` has priority.
pub fn crossing_junction() -> RoadNetworkDescription {
    crossing_junction_with_lanes(1)
}

/// Like [crossing_junction], with `count` 3 m lanes on every road.
///
/// Lane -n of `c1` covers y in [-3n, -3n + 3] and lane -n of `c2` covers
/// x in [7 + 3n, 10 + 3n].
pub fn crossing_junction_with_lanes(count: i32) -> RoadNetworkDescription {
    let road = |id: &str, start: (f64, f64), hdg: f64, length: f64| {
        straight_road_with_lanes(id, start, hdg, length, 3.0, count)
    };
    let mut in1 = road("in1", (-10.0, 0.0), 0.0, 10.0);
    in1.successor = Some(RoadLinkDescription::Junction { id: "J".into() });
    let mut in2 = road("in2", (10.0, -20.0), FRAC_PI_2, 10.0);
    in2.successor = Some(RoadLinkDescription::Junction { id: "J".into() });

    let connecting = |id: &str, start: (f64, f64), hdg: f64, incoming: &str| {
        let mut connecting = road(id, start, hdg, 20.0);
        connecting.junction = Some("J".into());
        connecting.predecessor = Some(RoadLinkDescription::Road {
            id: incoming.into(),
            contact: ContactPoint::End,
        });
        for lane in connecting.sections[0].lanes.iter_mut().skip(1) {
            lane.predecessor = Some(lane.id);
        }
        connecting
    };
    let c1 = connecting("c1", (0.0, 0.0), 0.0, "in1");
    let c2 = connecting("c2", (10.0, -10.0), FRAC_PI_2, "in2");

    let connection = |incoming: &str, connecting: &str| ConnectionDescription {
        incoming_road: incoming.into(),
        connecting_road: connecting.into(),
        contact_point: ContactPoint::Start,
        lane_links: (1..=count).map(|i| (-i, -i)).collect(),
    };
    RoadNetworkDescription {
        roads: vec![in1, in2, c1, c2],
        junctions: vec![JunctionDescription {
            id: "J".into(),
            connections: vec![connection("in1", "c1"), connection("in2", "c2")],
            priorities: vec![PriorityDescription {
                high: "c1".into(),
                low: "c2".into(),
            }],
        }],
    }
}

/// A straight 100 m road along the x-axis split into two sections at s = 50.
pub fn two_section_road() -> RoadNetworkDescription {
    let mut road = straight_road("main", (0.0, 0.0), 0.0, 100.0, 3.0);
    let mut second = road.sections[0].clone();
    second.s = 50.0;
    road.sections[0].lanes[1].successor = Some(-1);
    second.lanes[1].predecessor = Some(-1);
    road.sections.push(second);
    RoadNetworkDescription {
        roads: vec![road],
        junctions: vec![],
    }
}

/// A straight road along the x-axis with one lane on each side of the reference line.
///
/// Lane 1 lies in y in [0, 3] and lane -1 in y in [-3, 0].
pub fn two_way_road(length: f64) -> RoadNetworkDescription {
    let mut road = straight_road("main", (0.0, 0.0), 0.0, length, 3.0);
    road.sections[0].lanes.insert(0, LaneDescription::driving(1, 3.0));
    RoadNetworkDescription {
        roads: vec![road],
        junctions: vec![],
    }
}

/// A 4 m by 2 m car at rest.
pub fn car_at(x: f64, y: f64, yaw: f64) -> MovingObjectAttributes {
    MovingObjectAttributes {
        kind: MovingObjectType::Car,
        dimension: Dimension {
            length: 4.0,
            width: 2.0,
            height: 1.5,
        },
        state: MovingObjectState::at(Point2d::new(x, y), yaw),
    }
}
