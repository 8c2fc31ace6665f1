use crate::math::{signed_distance_to_line, Point2d};
use serde::{Deserialize, Serialize};

/// How far an object reaches to either side of a line along a lane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstruction {
    /// False if the object could not be related to the lane.
    pub valid: bool,
    /// The furthest the object reaches to the left of the line, in m.
    /// Negative if the object lies entirely to the right.
    pub left: f64,
    /// The furthest the object reaches to the right of the line, as a signed offset in m.
    /// Positive if the object lies entirely to the left.
    pub right: f64,
}

impl Obstruction {
    /// An obstruction that could not be computed.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            left: f64::INFINITY,
            right: f64::INFINITY,
        }
    }

    /// The obstruction of a footprint relative to the directed line from `a` to `b`.
    pub fn from_corners(corners: &[Point2d], a: Point2d, b: Point2d) -> Self {
        if corners.is_empty() {
            return Self::invalid();
        }
        let (left, right) = corners
            .iter()
            .map(|c| signed_distance_to_line(*c, a, b))
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(l, r), d| (l.max(d), r.min(d)));
        Self {
            valid: true,
            left,
            right,
        }
    }

    /// Whether any part of the object lies within `half_width` either side of the line.
    pub fn blocks(&self, half_width: f64) -> bool {
        self.valid && self.left >= -half_width && self.right <= half_width
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn object_to_the_left() {
        let corners = [
            Point2d::new(4.0, 3.0),
            Point2d::new(0.0, 3.0),
            Point2d::new(0.0, 1.0),
            Point2d::new(4.0, 1.0),
        ];
        let obstruction =
            Obstruction::from_corners(&corners, Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0));
        assert!(obstruction.valid);
        assert_approx_eq!(obstruction.left, 3.0);
        assert_approx_eq!(obstruction.right, 1.0);
        assert!(!obstruction.blocks(0.5));
        assert!(obstruction.blocks(1.5));
    }

    #[test]
    fn reversed_line_swaps_sides() {
        let corners = [Point2d::new(2.0, -1.0), Point2d::new(2.0, 2.0)];
        let obstruction =
            Obstruction::from_corners(&corners, Point2d::new(10.0, 0.0), Point2d::new(0.0, 0.0));
        assert_approx_eq!(obstruction.left, 1.0);
        assert_approx_eq!(obstruction.right, -2.0);
    }

    #[test]
    fn invalid_never_blocks() {
        assert!(!Obstruction::invalid().blocks(100.0));
    }
}
