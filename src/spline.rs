//! Natural cubic spline through tabulated points.
//!
//! Second derivatives are solved once with the tridiagonal algorithm and
//! zero curvature at both ends; evaluation is then a bracket search plus a
//! cubic in the bracket.

/// Interpolating spline with precomputed second derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    y2: Vec<f64>,
}

impl NaturalSpline {
    /// Fit through `(xs[i], ys[i])`. Abscissas must be strictly increasing
    /// and there must be at least two points; `None` otherwise.
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n < 2 || ys.len() != n || xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let mut y2 = vec![0.0; n];
        let mut u = vec![0.0; n];
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2[i - 1] + 2.0;
            y2[i] = (sig - 1.0) / p;
            let slope_diff = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope_diff / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }
        // natural end: y2[n-1] = 0
        y2[n - 1] = 0.0;
        for k in (0..n - 1).rev() {
            y2[k] = y2[k] * y2[k + 1] + u[k];
        }

        Some(NaturalSpline {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            y2,
        })
    }

    /// Value at `x`. Outside the table the end cubic is extended.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        // first knot strictly above x, kept inside 1..n-1
        let hi = self.xs.partition_point(|&k| k <= x).clamp(1, n - 1);
        let lo = hi - 1;

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2[lo] + (b * b * b - b) * self.y2[hi]) * (h * h) / 6.0
    }

    /// Second derivatives at the knots.
    pub fn second_derivatives(&self) -> &[f64] {
        &self.y2
    }
}
