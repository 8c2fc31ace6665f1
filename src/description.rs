//! The parsed road network description a [World](crate::World) is built from.
//!
//! These types mirror the authoring format closely. Ids are the authoring-time
//! strings and signed lane indices; they are resolved into arena keys during import.

use crate::math::GeometryShape;
use crate::network::{LaneType, RoadMarkColor, RoadMarkType, RoadMarkWeight};
use serde::{Deserialize, Serialize};

/// A complete road network.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoadNetworkDescription {
    pub roads: Vec<RoadDescription>,
    #[serde(default)]
    pub junctions: Vec<JunctionDescription>,
}

/// A road with its reference line, lane sections and attached elements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoadDescription {
    pub id: String,
    pub length: f64,
    /// The junction this road belongs to, if it is a connecting road.
    #[serde(default)]
    pub junction: Option<String>,
    pub geometries: Vec<GeometryDescription>,
    #[serde(default)]
    pub lane_offsets: Vec<PolynomialDescription>,
    #[serde(default)]
    pub elevations: Vec<PolynomialDescription>,
    pub sections: Vec<SectionDescription>,
    #[serde(default)]
    pub predecessor: Option<RoadLinkDescription>,
    #[serde(default)]
    pub successor: Option<RoadLinkDescription>,
    #[serde(default)]
    pub signals: Vec<SignalDescription>,
    #[serde(default)]
    pub objects: Vec<StationaryObjectDescription>,
}

impl Default for RoadDescription {
    fn default() -> Self {
        Self {
            id: String::new(),
            length: 0.0,
            junction: None,
            geometries: vec![],
            lane_offsets: vec![],
            elevations: vec![],
            sections: vec![],
            predecessor: None,
            successor: None,
            signals: vec![],
            objects: vec![],
        }
    }
}

/// A reference line geometry starting at `s`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeometryDescription {
    pub s: f64,
    pub x: f64,
    pub y: f64,
    pub hdg: f64,
    pub length: f64,
    pub shape: GeometryShape,
}

/// A cubic `a + b*ds + c*ds^2 + d*ds^3` taking effect at `s`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PolynomialDescription {
    pub s: f64,
    pub a: f64,
    #[serde(default)]
    pub b: f64,
    #[serde(default)]
    pub c: f64,
    #[serde(default)]
    pub d: f64,
}

impl PolynomialDescription {
    /// A constant polynomial starting at `s`.
    pub fn constant(s: f64, a: f64) -> Self {
        Self { s, a, ..Default::default() }
    }
}

/// A lane section starting at `s`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SectionDescription {
    pub s: f64,
    pub lanes: Vec<LaneDescription>,
}

/// A lane within a section. Lane 0 is the centre lane.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaneDescription {
    pub id: i32,
    #[serde(default = "default_lane_type")]
    pub lane_type: LaneType,
    /// Width polynomials, with `s` relative to the section start.
    #[serde(default)]
    pub widths: Vec<PolynomialDescription>,
    #[serde(default)]
    pub road_marks: Vec<RoadMarkDescription>,
    #[serde(default)]
    pub predecessor: Option<i32>,
    #[serde(default)]
    pub successor: Option<i32>,
}

fn default_lane_type() -> LaneType {
    LaneType::Driving
}

impl LaneDescription {
    /// A driving lane with a constant width and no markings.
    pub fn driving(id: i32, width: f64) -> Self {
        Self {
            id,
            lane_type: LaneType::Driving,
            widths: vec![PolynomialDescription::constant(0.0, width)],
            road_marks: vec![],
            predecessor: None,
            successor: None,
        }
    }

    /// The centre lane.
    pub fn centre() -> Self {
        Self {
            id: 0,
            lane_type: LaneType::None,
            widths: vec![],
            road_marks: vec![],
            predecessor: None,
            successor: None,
        }
    }
}

/// A road marking on the outer edge of a lane, starting at `s_offset` from the section start.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RoadMarkDescription {
    pub s_offset: f64,
    #[serde(rename = "type")]
    pub kind: RoadMarkType,
    #[serde(default)]
    pub color: RoadMarkColor,
    #[serde(default)]
    pub weight: RoadMarkWeight,
}

/// Which end of a road a link attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPoint {
    Start,
    End,
}

/// A link from one end of a road to another road or a junction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoadLinkDescription {
    Road { id: String, contact: ContactPoint },
    Junction { id: String },
}

/// A junction with its connections and right-of-way rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JunctionDescription {
    pub id: String,
    pub connections: Vec<ConnectionDescription>,
    #[serde(default)]
    pub priorities: Vec<PriorityDescription>,
}

/// A connecting road leading traffic from an incoming road through a junction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionDescription {
    pub incoming_road: String,
    pub connecting_road: String,
    /// The end of the connecting road that touches the incoming road.
    pub contact_point: ContactPoint,
    /// Pairs of (incoming lane, connecting lane).
    #[serde(default)]
    pub lane_links: Vec<(i32, i32)>,
}

/// Traffic on `high` has right of way over traffic on `low`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityDescription {
    pub high: String,
    pub low: String,
}

/// What kind of element a signal is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    TrafficSign { code: String },
    TrafficLight,
    RoadMarking { code: String },
}

/// A signal placed at (s, t) along a road.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalDescription {
    pub id: String,
    pub s: f64,
    pub t: f64,
    #[serde(flatten)]
    pub kind: SignalKind,
    /// The value shown by the sign, such as a speed limit.
    #[serde(default)]
    pub value: Option<f64>,
    /// Lanes this signal applies to. Defaults to every lane on its side of the road.
    #[serde(default)]
    pub validity: Option<Vec<i32>>,
    /// Heading relative to the road, in rad.
    #[serde(default)]
    pub hdg: f64,
}

/// A static object placed at (s, t) along a road.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StationaryObjectDescription {
    pub id: String,
    pub s: f64,
    pub t: f64,
    #[serde(default)]
    pub z_offset: f64,
    /// Heading relative to the road, in rad.
    #[serde(default)]
    pub hdg: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}
