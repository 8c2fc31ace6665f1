use super::{Point2d, Vector2d};
use cgmath::prelude::*;
use std::f64::consts::PI;

/// Rotates a vector 90 degrees anti-clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// The unit vector pointing along `heading`, measured anti-clockwise from the x-axis.
pub fn heading_vector(heading: f64) -> Vector2d {
    Vector2d::new(heading.cos(), heading.sin())
}

/// Rotates a vector anti-clockwise by `angle` radians.
pub fn rotate(vec: Vector2d, angle: f64) -> Vector2d {
    let (sin, cos) = angle.sin_cos();
    Vector2d::new(vec.x * cos - vec.y * sin, vec.x * sin + vec.y * cos)
}

/// Maps an angle onto `[-π, π]`. Both `π` and `-π` are returned unchanged.
pub fn normalize_angle(angle: f64) -> f64 {
    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI && angle > 0.0 {
        PI
    } else {
        wrapped
    }
}

/// The signed perpendicular distance of `point` from the directed line through `a` and `b`.
/// Positive values lie to the left of the line.
pub fn signed_distance_to_line(point: Point2d, a: Point2d, b: Point2d) -> f64 {
    let dir = b - a;
    let len = dir.magnitude();
    if len <= f64::EPSILON {
        return (point - a).magnitude();
    }
    dir.perp_dot(point - a) / len
}
