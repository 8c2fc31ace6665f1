use super::{heading_vector, rot90, rotate, Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};

/// Number of Simpson intervals used per arclength evaluation.
const SIMPSON_STEPS: usize = 32;

/// Maximum number of Newton iterations when inverting arclength.
const MAX_NEWTON_ITERATIONS: usize = 20;

/// A parametric curve in 2D space.
pub trait ParametricCurve2d {
    /// Samples the parametric curve.
    fn sample(&self, t: f64) -> Point2d;

    /// Returns the minimum and maximum t-values that define the bounds of the curve.
    fn bounds(&self) -> Interval<f64>;

    /// Samples the derivative of the parametric curve.
    ///
    /// The default implementation approximates the derivative by sampling
    /// two very nearby points along the curve.
    fn sample_dt(&self, t: f64) -> Vector2d {
        let delta = self.bounds().length() * 0.0001;
        let p1 = self.sample(t);
        let p2 = self.sample(t + delta);
        (p2 - p1) / delta
    }

    /// Samples the second derivative of the parametric curve.
    ///
    /// The default implementation approximates the derivative by sampling
    /// two very nearby points along the curve.
    fn sample_dt2(&self, t: f64) -> Vector2d {
        let delta = self.bounds().length() * 0.0001;
        let p1 = self.sample_dt(t);
        let p2 = self.sample_dt(t + delta);
        (p2 - p1) / delta
    }

    /// The arclength of the curve between the parameters `t0` and `t1`.
    fn arclength(&self, t0: f64, t1: f64) -> f64 {
        simpson(t0, t1, SIMPSON_STEPS, |t| self.sample_dt(t).magnitude())
    }

    /// Finds the parameter at which the arclength from the start of the curve equals `s`.
    fn param_at_arclength(&self, s: f64) -> f64 {
        let bounds = self.bounds();
        let total = self.arclength(bounds.min, bounds.max);
        if total <= 0.0 {
            return bounds.min;
        }
        let mut t = bounds.lerp((s / total).clamp(0.0, 1.0));
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let err = self.arclength(bounds.min, t) - s;
            if err.abs() < 1e-9 {
                break;
            }
            let speed = self.sample_dt(t).magnitude().max(1e-9);
            t = (t - err / speed).clamp(bounds.min, bounds.max);
        }
        t
    }
}

/// Integrates `f` over `[a, b]` with Simpson's rule using `n` intervals.
fn simpson(a: f64, b: f64, n: usize, f: impl Fn(f64) -> f64) -> f64 {
    let n = n.max(2) + n % 2;
    let h = (b - a) / n as f64;
    if h == 0.0 {
        return 0.0;
    }
    let inner: f64 = (1..n)
        .map(|i| {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            weight * f(a + i as f64 * h)
        })
        .sum();
    h / 3.0 * (f(a) + inner + f(b))
}

/// The shape of a single reference line geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryShape {
    Line,
    Arc {
        curvature: f64,
    },
    /// A clothoid whose curvature changes linearly along its length.
    Spiral {
        curv_start: f64,
        curv_end: f64,
    },
    /// A cubic `v(u)` in the local frame of the geometry.
    Poly3 {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    /// Independent cubics `u(p)` and `v(p)` in the local frame of the geometry.
    ParamPoly3 {
        au: f64,
        bu: f64,
        cu: f64,
        du: f64,
        av: f64,
        bv: f64,
        cv: f64,
        dv: f64,
        /// Whether `p` ranges over `[0, 1]` rather than `[0, length]`.
        normalized: bool,
    },
}

/// A position, heading and curvature sampled on a reference line.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceSample {
    pub point: Point2d,
    pub heading: f64,
    pub curvature: f64,
}

impl ReferenceSample {
    /// The point offset laterally by `t`, positive to the left.
    pub fn offset(&self, t: f64) -> Point2d {
        self.point + rot90(heading_vector(self.heading)) * t
    }
}

/// A geometry placed at a start s-offset, position and heading.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeometrySegment {
    /// The s-offset of the start of the segment along its road.
    pub s: f64,
    pub origin: Point2d,
    pub hdg: f64,
    pub length: f64,
    pub shape: GeometryShape,
}

/// The local cubic `(u, a + b*u + c*u^2 + d*u^3)`.
struct Poly3Curve {
    coeffs: [f64; 4],
    max_u: f64,
}

/// The local curve `(u(p), v(p))`.
struct ParamPoly3Curve {
    u: [f64; 4],
    v: [f64; 4],
    max_p: f64,
}

fn cubic(c: &[f64; 4], x: f64) -> f64 {
    c[0] + x * (c[1] + x * (c[2] + x * c[3]))
}

fn cubic_dx(c: &[f64; 4], x: f64) -> f64 {
    c[1] + x * (2.0 * c[2] + 3.0 * x * c[3])
}

fn cubic_dx2(c: &[f64; 4], x: f64) -> f64 {
    2.0 * c[2] + 6.0 * x * c[3]
}

impl ParametricCurve2d for Poly3Curve {
    fn sample(&self, t: f64) -> Point2d {
        Point2d::new(t, cubic(&self.coeffs, t))
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.max_u)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        Vector2d::new(1.0, cubic_dx(&self.coeffs, t))
    }

    fn sample_dt2(&self, t: f64) -> Vector2d {
        Vector2d::new(0.0, cubic_dx2(&self.coeffs, t))
    }
}

impl ParametricCurve2d for ParamPoly3Curve {
    fn sample(&self, t: f64) -> Point2d {
        Point2d::new(cubic(&self.u, t), cubic(&self.v, t))
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.max_p)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        Vector2d::new(cubic_dx(&self.u, t), cubic_dx(&self.v, t))
    }

    fn sample_dt2(&self, t: f64) -> Vector2d {
        Vector2d::new(cubic_dx2(&self.u, t), cubic_dx2(&self.v, t))
    }
}

/// Samples a parametric curve in its local frame at arclength `ds`.
/// Returns the local point, the local tangent angle and the curvature.
fn sample_parametric(curve: &impl ParametricCurve2d, ds: f64) -> (Point2d, f64, f64) {
    let t = curve.param_at_arclength(ds);
    let point = curve.sample(t);
    let d1 = curve.sample_dt(t);
    let d2 = curve.sample_dt2(t);
    let speed = d1.magnitude().max(1e-12);
    let curvature = d1.perp_dot(d2) / speed.powi(3);
    (point, d1.y.atan2(d1.x), curvature)
}

impl GeometrySegment {
    /// The range of s-offsets covered by this segment.
    pub fn range(&self) -> Interval<f64> {
        Interval::new(self.s, self.s + self.length)
    }

    /// Samples the segment at the road s-offset `s`.
    pub fn sample(&self, s: f64) -> ReferenceSample {
        let mut ds = s - self.s;
        if ds > self.length + 1e-6 || ds < -1e-6 {
            warn!(
                "Sampling geometry at s = {} outside of its range {:?}",
                s,
                self.range()
            );
        }
        ds = ds.clamp(0.0, self.length);

        let (local, local_hdg, curvature) = match self.shape {
            GeometryShape::Line => (Point2d::new(ds, 0.0), 0.0, 0.0),
            GeometryShape::Arc { curvature } => arc(ds, curvature),
            GeometryShape::Spiral {
                curv_start,
                curv_end,
            } => spiral(ds, self.length, curv_start, curv_end),
            GeometryShape::Poly3 { a, b, c, d } => {
                let curve = Poly3Curve {
                    coeffs: [a, b, c, d],
                    max_u: self.length,
                };
                sample_parametric(&curve, ds)
            }
            GeometryShape::ParamPoly3 {
                au,
                bu,
                cu,
                du,
                av,
                bv,
                cv,
                dv,
                normalized,
            } => {
                let curve = ParamPoly3Curve {
                    u: [au, bu, cu, du],
                    v: [av, bv, cv, dv],
                    max_p: if normalized { 1.0 } else { self.length },
                };
                sample_parametric(&curve, ds)
            }
        };

        ReferenceSample {
            point: self.origin + rotate(local.to_vec(), self.hdg),
            heading: self.hdg + local_hdg,
            curvature,
        }
    }
}

fn arc(ds: f64, curvature: f64) -> (Point2d, f64, f64) {
    if curvature.abs() < 1e-12 {
        return (Point2d::new(ds, 0.0), 0.0, 0.0);
    }
    let angle = ds * curvature;
    let point = Point2d::new(angle.sin() / curvature, (1.0 - angle.cos()) / curvature);
    (point, angle, curvature)
}

fn spiral(ds: f64, length: f64, curv_start: f64, curv_end: f64) -> (Point2d, f64, f64) {
    if (curv_start - curv_end).abs() < 1e-6 {
        return arc(ds, curv_start);
    }
    let rate = (curv_end - curv_start) / length;
    let angle = |x: f64| curv_start * x + 0.5 * rate * x * x;
    let steps = ((ds / 0.25).ceil() as usize).max(SIMPSON_STEPS);
    let x = simpson(0.0, ds, steps, |x| angle(x).cos());
    let y = simpson(0.0, ds, steps, |x| angle(x).sin());
    (Point2d::new(x, y), angle(ds), curv_start + rate * ds)
}

/// The full reference line of a road, made of consecutive geometry segments.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReferenceLine {
    segments: Vec<GeometrySegment>,
}

impl ReferenceLine {
    /// Creates a reference line, sorting the segments by s-offset.
    pub fn new(mut segments: Vec<GeometrySegment>) -> Self {
        segments.sort_by(|a, b| a.s.total_cmp(&b.s));
        Self { segments }
    }

    pub fn segments(&self) -> &[GeometrySegment] {
        &self.segments
    }

    /// Gets the segment in effect at `s`. Values beyond either end use the outermost segment.
    pub fn segment_at(&self, s: f64) -> Option<&GeometrySegment> {
        let idx = self.segments.partition_point(|g| g.s <= s);
        self.segments.get(idx.saturating_sub(1))
    }

    /// Samples the reference line at `s`.
    pub fn sample(&self, s: f64) -> Option<ReferenceSample> {
        self.segment_at(s).map(|g| g.sample(s))
    }
}
