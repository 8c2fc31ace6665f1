//! Cubic polynomials as used by road descriptions.

use serde::{Deserialize, Serialize};

/// A cubic function `a + b*dx + c*dx^2 + d*dx^3`, where `dx = x - start`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct CubicFn {
    coeffs: [f64; 4],
    start: f64,
}

impl CubicFn {
    /// Creates a cubic from its coefficients, starting at `start`.
    pub const fn new(start: f64, a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            coeffs: [a, b, c, d],
            start,
        }
    }

    pub fn y(&self, x: f64) -> f64 {
        self.y_and_dy(x).0
    }

    pub fn dy(&self, x: f64) -> f64 {
        self.y_and_dy(x).1
    }

    pub fn y_and_dy(&self, x: f64) -> (f64, f64) {
        let c = &self.coeffs;
        let x = x - self.start;

        let y = c[0] + c[1] * x + c[2] * x * x + c[3] * x * x * x;
        let dy = c[1] + 2. * c[2] * x + 3. * c[3] * x * x;

        (y, dy)
    }
}

/// A sequence of cubics, each valid from its own start until the next one begins.
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct PiecewiseCubic {
    pieces: Vec<CubicFn>,
}

impl PiecewiseCubic {
    /// Creates a piecewise cubic, sorting the pieces by their start.
    pub fn new(mut pieces: Vec<CubicFn>) -> Self {
        pieces.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { pieces }
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Gets the piece in effect at `x`, if any.
    pub fn piece_at(&self, x: f64) -> Option<&CubicFn> {
        let idx = self.pieces.partition_point(|p| p.start <= x);
        idx.checked_sub(1).map(|idx| &self.pieces[idx])
    }

    /// Evaluates the value and derivative at `x`, or `None` if no piece covers it.
    pub fn y_and_dy(&self, x: f64) -> Option<(f64, f64)> {
        self.piece_at(x).map(|p| p.y_and_dy(x))
    }

    /// Evaluates the value and derivative at `x`, falling back to zero.
    pub fn y_and_dy_or_zero(&self, x: f64) -> (f64, f64) {
        self.y_and_dy(x).unwrap_or((0.0, 0.0))
    }
}
