//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use cubic::{CubicFn, PiecewiseCubic};
pub use curve::{GeometryShape, GeometrySegment, ParametricCurve2d, ReferenceLine, ReferenceSample};
pub use polygon::{element_polygon, intersect, rectangle_corners, Aabb};
pub use util::*;

mod cubic;
mod curve;
mod polygon;
mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;
