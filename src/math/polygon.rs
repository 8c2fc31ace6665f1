//! Polygon helpers built on the `geo` crate.

use super::{heading_vector, rot90, Point2d};
use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Coord, LineString, Polygon};

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point2d,
    pub max: Point2d,
}

impl Aabb {
    /// The bounding box of a set of points.
    pub fn from_points(points: &[Point2d]) -> Self {
        let mut min = Point2d::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2d::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }

    /// Returns true if the two boxes touch or overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

fn coord(p: Point2d) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

/// Builds a closed, anti-clockwise polygon from its corner points.
pub fn element_polygon(corners: &[Point2d]) -> Polygon<f64> {
    let ring = LineString::new(corners.iter().copied().map(coord).collect());
    Polygon::new(ring, vec![]).orient(Direction::Default)
}

/// Intersects two polygons.
///
/// Returns the vertices of the intersection, or `None` if its area does not exceed `min_area`.
pub fn intersect(a: &Polygon<f64>, b: &Polygon<f64>, min_area: f64) -> Option<Vec<Point2d>> {
    let shared = a.intersection(b);
    if shared.unsigned_area() <= min_area {
        return None;
    }
    let points = shared
        .iter()
        .flat_map(|poly| poly.exterior().coords())
        .map(|c| Point2d::new(c.x, c.y))
        .collect();
    Some(points)
}

/// The corners of a rectangle centred on `centre`, in anti-clockwise order
/// starting at the front left corner.
pub fn rectangle_corners(centre: Point2d, heading: f64, length: f64, width: f64) -> [Point2d; 4] {
    let fwd = heading_vector(heading) * (0.5 * length);
    let left = rot90(heading_vector(heading)) * (0.5 * width);
    [
        centre + fwd + left,
        centre - fwd + left,
        centre - fwd - left,
        centre + fwd - left,
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn overlapping_squares() {
        let a = element_polygon(&rectangle_corners(Point2d::new(0.0, 0.0), 0.0, 2.0, 2.0));
        let b = element_polygon(&rectangle_corners(Point2d::new(1.0, 1.0), 0.0, 2.0, 2.0));
        let points = intersect(&a, &b, 1e-3).unwrap();
        let bounds = Aabb::from_points(&points);
        assert_approx_eq!(bounds.min.x, 0.0);
        assert_approx_eq!(bounds.min.y, 0.0);
        assert_approx_eq!(bounds.max.x, 1.0);
        assert_approx_eq!(bounds.max.y, 1.0);
    }

    #[test]
    fn touching_squares_do_not_intersect() {
        let a = element_polygon(&rectangle_corners(Point2d::new(0.0, 0.0), 0.0, 2.0, 2.0));
        let b = element_polygon(&rectangle_corners(Point2d::new(2.0, 0.0), 0.0, 2.0, 2.0));
        assert!(intersect(&a, &b, 1e-3).is_none());
    }

    #[test]
    fn clockwise_input_is_reoriented() {
        let corners = [
            Point2d::new(0.0, 0.0),
            Point2d::new(0.0, 1.0),
            Point2d::new(1.0, 1.0),
            Point2d::new(1.0, 0.0),
        ];
        let poly = element_polygon(&corners);
        assert!(poly.signed_area() > 0.0);
        assert_approx_eq!(poly.unsigned_area(), 1.0);
    }
}
