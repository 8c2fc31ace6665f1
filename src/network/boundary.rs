use crate::math::Point2d;
use crate::util::Interval;
use crate::BoundaryId;
use serde::{Deserialize, Serialize};

/// Width of a standard weight marking, in m.
pub const STANDARD_MARK_WIDTH: f64 = 0.15;

/// Width of a bold marking, in m.
pub const BOLD_MARK_WIDTH: f64 = 0.3;

/// The pattern of a road mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadMarkType {
    None,
    Solid,
    Broken,
    SolidSolid,
    SolidBroken,
    BrokenSolid,
    BrokenBroken,
    BottsDots,
    Grass,
    Curb,
}

impl RoadMarkType {
    /// Splits a double line into the patterns of its left and right lines.
    pub fn lines(self) -> Vec<(RoadMarkType, BoundarySide)> {
        use RoadMarkType::*;
        let double = |left, right| vec![(left, BoundarySide::Left), (right, BoundarySide::Right)];
        match self {
            SolidSolid => double(Solid, Solid),
            SolidBroken => double(Solid, Broken),
            BrokenSolid => double(Broken, Solid),
            BrokenBroken => double(Broken, Broken),
            single => vec![(single, BoundarySide::Single)],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadMarkColor {
    #[default]
    White,
    Yellow,
    Red,
    Blue,
    Green,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadMarkWeight {
    #[default]
    Standard,
    Bold,
}

impl RoadMarkWeight {
    /// The painted width of a line, in m.
    pub fn width(self) -> f64 {
        match self {
            RoadMarkWeight::Standard => STANDARD_MARK_WIDTH,
            RoadMarkWeight::Bold => BOLD_MARK_WIDTH,
        }
    }
}

/// Which line of a double line a boundary is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySide {
    Single,
    Left,
    Right,
}

/// A sampled point of a lane boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub s: f64,
    pub point: Point2d,
    pub heading: f64,
}

/// The marking between two laterally adjacent lanes, or along the centre line.
#[derive(Clone, Debug)]
pub struct LaneBoundary {
    id: BoundaryId,
    kind: RoadMarkType,
    color: RoadMarkColor,
    width: f64,
    /// The s-offsets along the road where the marking is valid.
    range: Interval<f64>,
    side: BoundarySide,
    points: Vec<BoundaryPoint>,
}

impl LaneBoundary {
    pub(crate) fn new(
        id: BoundaryId,
        kind: RoadMarkType,
        color: RoadMarkColor,
        width: f64,
        range: Interval<f64>,
        side: BoundarySide,
    ) -> Self {
        Self {
            id,
            kind,
            color,
            width,
            range,
            side,
            points: vec![],
        }
    }

    pub fn id(&self) -> BoundaryId {
        self.id
    }

    pub fn kind(&self) -> RoadMarkType {
        self.kind
    }

    pub fn color(&self) -> RoadMarkColor {
        self.color
    }

    /// The painted width, in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn range(&self) -> Interval<f64> {
        self.range
    }

    pub fn side(&self) -> BoundarySide {
        self.side
    }

    pub fn points(&self) -> &[BoundaryPoint] {
        &self.points
    }

    /// The lateral shift of this line from the sampled marking position.
    pub(crate) fn lateral_shift(&self) -> f64 {
        match self.side {
            BoundarySide::Single => 0.0,
            BoundarySide::Left => 0.5 * self.width,
            BoundarySide::Right => -0.5 * self.width,
        }
    }

    /// Appends a point, ignoring points that do not advance along the road.
    pub(crate) fn add_point(&mut self, point: BoundaryPoint) {
        if self.points.last().map_or(true, |last| point.s > last.s) {
            self.points.push(point);
        }
    }
}
