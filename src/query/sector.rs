use crate::math::{normalize_angle, Point2d};
use cgmath::prelude::*;

/// Keeps the items whose position lies inside a circular sector.
///
/// The sector spans anti-clockwise from `right_angle` to `left_angle` and may wrap
/// through ±π. Points on its boundary are inside. Angles closer together than
/// `angle_epsilon`, or a non-positive radius, cover nothing; angles a whole number of
/// turns apart cover the full circle.
///
/// # Parameters
/// * `items` - The candidates
/// * `position` - Gets the position of a candidate
/// * `origin` - The apex of the sector
/// * `radius` - The radius of the sector, in m
/// * `left_angle` - The left edge of the sector, anti-clockwise from the x-axis, in rad
/// * `right_angle` - The right edge of the sector, in rad
/// * `angle_epsilon` - The smallest angle between distinct edges, in rad
pub fn apply_sector_filter<T>(
    items: impl IntoIterator<Item = T>,
    position: impl Fn(&T) -> Point2d,
    origin: Point2d,
    radius: f64,
    left_angle: f64,
    right_angle: f64,
    angle_epsilon: f64,
) -> Vec<T> {
    if (left_angle - right_angle).abs() <= angle_epsilon || radius <= 0.0 {
        return vec![];
    }
    let left = normalize_angle(left_angle);
    let right = normalize_angle(right_angle);
    let wrapped = left < right;
    let full_circle = (left - right).abs() <= angle_epsilon;

    items
        .into_iter()
        .filter(|item| {
            let rel = position(item) - origin;
            let distance = rel.magnitude();
            if distance > radius {
                return false;
            }
            if full_circle || distance == 0.0 {
                return true;
            }
            let bearing = rel.y.atan2(rel.x);
            if wrapped {
                !(bearing < right && bearing > left)
            } else {
                bearing >= right && bearing <= left
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    const EPS: f64 = 1e-9;

    fn filter(points: &[Point2d], radius: f64, left: f64, right: f64) -> Vec<Point2d> {
        apply_sector_filter(
            points.iter().copied(),
            |p| *p,
            Point2d::new(0.0, 0.0),
            radius,
            left,
            right,
            EPS,
        )
    }

    fn at_bearing(deg: f64, distance: f64) -> Point2d {
        let rad = deg.to_radians();
        Point2d::new(distance * rad.cos(), distance * rad.sin())
    }

    #[test]
    fn degenerate_sectors_are_empty() {
        let points = [Point2d::new(1.0, 0.0)];
        assert!(filter(&points, 10.0, 0.5, 0.5).is_empty());
        assert!(filter(&points, 0.0, FRAC_PI_4, -FRAC_PI_4).is_empty());
        assert!(filter(&points, -1.0, FRAC_PI_4, -FRAC_PI_4).is_empty());
    }

    #[test]
    fn forward_sector() {
        let points = [
            at_bearing(0.0, 5.0),
            at_bearing(44.0, 5.0),
            at_bearing(46.0, 5.0),
            at_bearing(-44.0, 5.0),
            at_bearing(0.0, 11.0),
            at_bearing(180.0, 5.0),
        ];
        let found = filter(&points, 10.0, FRAC_PI_4, -FRAC_PI_4);
        assert_eq!(found, vec![points[0], points[1], points[3]]);
    }

    #[test]
    fn boundary_is_inclusive() {
        let points = [Point2d::new(0.0, 5.0), Point2d::new(10.0, 0.0)];
        let found = filter(&points, 10.0, FRAC_PI_2, 0.0);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn sector_wrapping_through_pi() {
        let points = [
            at_bearing(180.0, 5.0),
            at_bearing(-170.0, 5.0),
            at_bearing(170.0, 5.0),
            at_bearing(0.0, 5.0),
            at_bearing(90.0, 5.0),
        ];
        let found = filter(&points, 10.0, (-150.0f64).to_radians(), 150.0f64.to_radians());
        assert_eq!(found, vec![points[0], points[1], points[2]]);
    }

    #[test]
    fn full_circle_accepts_everything_in_range() {
        let mut rng = StdRng::from_seed(*b"Vegemite sandwhich is not fun...");
        let points = (0..100)
            .map(|_| at_bearing(rng.gen_range(-180.0..180.0), rng.gen_range(0.0..9.9)))
            .collect::<Vec<_>>();
        assert_eq!(filter(&points, 10.0, PI, -PI).len(), points.len());
        assert_eq!(filter(&points, 10.0, 1.0 + 2.0 * PI, 1.0).len(), points.len());
    }

    #[test]
    fn origin_is_always_inside() {
        let points = [Point2d::new(0.0, 0.0)];
        assert_eq!(filter(&points, 1.0, 0.1, -0.1).len(), 1);
    }
}
