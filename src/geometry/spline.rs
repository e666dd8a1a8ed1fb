use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::math::intersect_2d::segment_segment_intersect_2d;
use crate::math::{Point2, Vector2, TOLERANCE};

/// Length reported when neither curve sampling nor the control polygon
/// yields a usable value.
pub const FALLBACK_SPLINE_LENGTH: f64 = 100.0;

/// Distance below which consecutive control points count as duplicates.
const DUPLICATE_POINT_EPS: f64 = 1e-9;

/// A non-uniform rational B-spline in the drawing plane.
///
/// An empty `knots` vector means a clamped uniform knot vector; an empty
/// `weights` vector means all weights are 1. `fit_points` are carried for
/// consumers that re-fit the curve and do not take part in evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spline {
    pub degree: usize,
    pub control_points: Vec<Point2>,
    #[serde(default)]
    pub knots: Vec<f64>,
    #[serde(default)]
    pub weights: Vec<f64>,
    #[serde(default)]
    pub fit_points: Vec<Point2>,
    #[serde(default)]
    pub closed: bool,
}

/// How a spline length was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthMethod {
    /// Chord sum over a dense curve sampling.
    Sampled,
    /// Length of the control polygon (upper bound of the curve length).
    ControlPolygon,
    /// [`FALLBACK_SPLINE_LENGTH`].
    Sentinel,
}

/// A spline length together with the tier of the fallback ladder that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthEstimate {
    pub value: f64,
    pub method: LengthMethod,
}

/// A structural defect found by [`Spline::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SplineIssue {
    TooFewControlPoints { count: usize },
    InvalidDegree { degree: usize, control_points: usize },
    KnotCountMismatch { expected: usize, actual: usize },
    DecreasingKnots,
    EmptyDomain,
    NonFiniteControlPoint { index: usize },
    WeightCountMismatch { expected: usize, actual: usize },
    InvalidWeight { index: usize },
    DuplicateControlPoints { index: usize },
    SelfIntersectingControlPolygon { first: usize, second: usize },
}

/// Result of [`Spline::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SplineValidation {
    pub valid: bool,
    pub issues: Vec<SplineIssue>,
}

/// Effective evaluation data: degree, knots and weights guaranteed consistent.
struct Basis {
    degree: usize,
    knots: Vec<f64>,
    weights: Vec<f64>,
}

/// Clamped uniform knot vector for `n` control points of degree `p`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn clamped_uniform_knots(n: usize, p: usize) -> Vec<f64> {
    let interior = n.saturating_sub(p + 1);
    let mut knots = Vec::with_capacity(n + p + 1);
    knots.extend(std::iter::repeat_n(0.0, p + 1));
    for i in 1..=interior {
        knots.push(i as f64 / (interior + 1) as f64);
    }
    knots.extend(std::iter::repeat_n(1.0, p + 1));
    knots
}

impl Spline {
    /// Creates a non-rational spline with a clamped uniform knot vector.
    #[must_use]
    pub fn new(degree: usize, control_points: Vec<Point2>) -> Self {
        let n = control_points.len();
        let p = degree.clamp(1, n.saturating_sub(1).max(1));
        Self {
            degree: p,
            knots: clamped_uniform_knots(n, p),
            weights: vec![1.0; n],
            control_points,
            fit_points: Vec::new(),
            closed: false,
        }
    }

    fn knots_usable(&self, p: usize) -> bool {
        let n = self.control_points.len();
        self.knots.len() == n + p + 1
            && self.knots.iter().all(|k| k.is_finite())
            && self.knots.windows(2).all(|w| w[0] <= w[1])
            && self.knots[p] < self.knots[n]
    }

    fn weights_usable(&self) -> bool {
        self.weights.len() == self.control_points.len()
            && self.weights.iter().all(|w| w.is_finite() && *w > 0.0)
    }

    fn basis(&self) -> Basis {
        let n = self.control_points.len();
        let p = self.degree.clamp(1, n.saturating_sub(1).max(1));
        let knots = if self.knots_usable(p) {
            self.knots.clone()
        } else {
            clamped_uniform_knots(n, p)
        };
        let weights = if self.weights_usable() {
            self.weights.clone()
        } else {
            vec![1.0; n]
        };
        Basis {
            degree: p,
            knots,
            weights,
        }
    }

    /// Parameter domain `[u_min, u_max]` of the curve.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        let n = self.control_points.len();
        if n < 2 {
            return (0.0, 1.0);
        }
        let basis = self.basis();
        (basis.knots[basis.degree], basis.knots[n])
    }

    /// Maps a normalized parameter to the knot domain.
    #[must_use]
    pub fn knot_param(&self, t: f64) -> f64 {
        let (lo, hi) = self.domain();
        lo + (hi - lo) * t
    }

    /// Maps a knot-domain parameter to `[0, 1]`.
    #[must_use]
    pub fn normalized_param(&self, u: f64) -> f64 {
        let (lo, hi) = self.domain();
        if hi - lo < TOLERANCE {
            0.0
        } else {
            (u - lo) / (hi - lo)
        }
    }

    /// Evaluates the curve at knot-domain parameter `u` (de Boor, homogeneous).
    #[must_use]
    pub fn evaluate(&self, u: f64) -> Point2 {
        let n = self.control_points.len();
        match n {
            0 => return Point2::origin(),
            1 => return self.control_points[0],
            _ => {}
        }
        let basis = self.basis();
        let p = basis.degree;
        let knots = &basis.knots;
        let u = u.clamp(knots[p], knots[n]);
        let k = find_span(knots, p, n, u);

        let mut d: Vec<Vector3<f64>> = (0..=p)
            .map(|j| homogeneous(&self.control_points[j + k - p], basis.weights[j + k - p]))
            .collect();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let i = j + k - p;
                let denom = knots[i + p + 1 - r] - knots[i];
                let alpha = if denom.abs() < TOLERANCE {
                    0.0
                } else {
                    (u - knots[i]) / denom
                };
                d[j] = d[j - 1] * (1.0 - alpha) + d[j] * alpha;
            }
        }
        from_homogeneous(&d[p])
    }

    /// Evaluates the curve at the normalized parameter `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.evaluate(self.knot_param(t.clamp(0.0, 1.0)))
    }

    /// Unit tangent at the normalized parameter `t` (central difference).
    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector2 {
        let h = 1e-6;
        let (a, b) = if t < h {
            (0.0, 2.0 * h)
        } else if t > 1.0 - h {
            (1.0 - 2.0 * h, 1.0)
        } else {
            (t - h, t + h)
        };
        let d = self.point_at(b) - self.point_at(a);
        d.try_normalize(TOLERANCE).unwrap_or_else(Vector2::zeros)
    }

    #[must_use]
    pub fn start_point(&self) -> Point2 {
        self.point_at(0.0)
    }

    #[must_use]
    pub fn end_point(&self) -> Point2 {
        self.point_at(1.0)
    }

    /// Samples the curve into a polyline.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn tessellate(&self, tolerance: f64) -> Vec<Point2> {
        let polygon = control_polygon_length(&self.control_points);
        let by_tolerance = if tolerance > 0.0 && polygon.is_finite() {
            (polygon / tolerance).sqrt().ceil() as usize
        } else {
            0
        };
        let samples = by_tolerance
            .max(self.control_points.len() * 8)
            .clamp(16, 2048);
        (0..=samples)
            .map(|i| self.point_at(i as f64 / samples as f64))
            .collect()
    }

    /// Spline length through the fallback ladder: curve sampling, then the
    /// control polygon, then [`FALLBACK_SPLINE_LENGTH`].
    #[must_use]
    pub fn length_estimate(&self) -> LengthEstimate {
        self.sampled_length()
            .map(|value| LengthEstimate {
                value,
                method: LengthMethod::Sampled,
            })
            .or_else(|_| {
                self.control_polygon_length().map(|value| LengthEstimate {
                    value,
                    method: LengthMethod::ControlPolygon,
                })
            })
            .unwrap_or(LengthEstimate {
                value: FALLBACK_SPLINE_LENGTH,
                method: LengthMethod::Sentinel,
            })
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.length_estimate().value
    }

    fn sampled_length(&self) -> Result<f64> {
        let validation = self.validate();
        if !validation.valid {
            return Err(GeometryError::Degenerate(format!(
                "cannot sample invalid spline: {:?}",
                validation.issues
            ))
            .into());
        }
        let points = self.tessellate(1e-3);
        let length: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        if length.is_finite() {
            Ok(length)
        } else {
            Err(GeometryError::Degenerate("non-finite sampled spline length".into()).into())
        }
    }

    fn control_polygon_length(&self) -> Result<f64> {
        let finite: Vec<Point2> = self
            .control_points
            .iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .copied()
            .collect();
        if finite.len() < 2 {
            return Err(GeometryError::Degenerate(
                "control polygon needs at least 2 finite points".into(),
            )
            .into());
        }
        Ok(control_polygon_length(&finite))
    }

    /// Normalized parameter of the curve point closest to `p`, and its distance.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn closest_param(&self, p: &Point2) -> (f64, f64) {
        let samples = (self.control_points.len() * 16).clamp(64, 1024);
        let mut best_t = 0.0;
        let mut best_d = f64::INFINITY;
        for i in 0..=samples {
            let t = i as f64 / samples as f64;
            let d = (self.point_at(t) - p).norm();
            if d < best_d {
                best_d = d;
                best_t = t;
            }
        }

        // Golden-section refinement around the best sample.
        let step = 1.0 / samples as f64;
        let (mut a, mut b) = ((best_t - step).max(0.0), (best_t + step).min(1.0));
        let ratio = 0.5 * (5.0_f64.sqrt() - 1.0);
        for _ in 0..60 {
            let c = b - ratio * (b - a);
            let d = a + ratio * (b - a);
            if (self.point_at(c) - p).norm() < (self.point_at(d) - p).norm() {
                b = d;
            } else {
                a = c;
            }
        }
        let t = 0.5 * (a + b);
        let d = (self.point_at(t) - p).norm();
        if d < best_d {
            (t, d)
        } else {
            (best_t, best_d)
        }
    }

    /// Greville abscissa (knot average) of control point `i`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn greville(&self, i: usize) -> f64 {
        let basis = self.basis();
        let p = basis.degree;
        let sum: f64 = basis.knots[i + 1..=i + p].iter().sum();
        sum / p as f64
    }

    /// Same curve traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let basis = self.basis();
        let (lo, hi) = self.domain();
        let mut control_points = self.control_points.clone();
        control_points.reverse();
        let mut weights = basis.weights;
        weights.reverse();
        let knots = basis.knots.iter().rev().map(|k| lo + hi - k).collect();
        let mut fit_points = self.fit_points.clone();
        fit_points.reverse();
        Self {
            degree: basis.degree,
            control_points,
            knots,
            weights,
            fit_points,
            closed: self.closed,
        }
    }

    /// Inserts knot `u` once (Boehm), leaving the curve unchanged.
    #[must_use]
    pub fn insert_knot(&self, u: f64) -> Self {
        let n = self.control_points.len();
        let basis = self.basis();
        let p = basis.degree;
        let knots = &basis.knots;
        let k = find_span(knots, p, n, u);
        let pw: Vec<Vector3<f64>> = self
            .control_points
            .iter()
            .zip(&basis.weights)
            .map(|(pt, w)| homogeneous(pt, *w))
            .collect();

        let mut q = Vec::with_capacity(n + 1);
        for i in 0..=n {
            let qi = if i + p <= k {
                pw[i]
            } else if i <= k {
                let denom = knots[i + p] - knots[i];
                let alpha = if denom.abs() < TOLERANCE {
                    0.0
                } else {
                    (u - knots[i]) / denom
                };
                pw[i - 1] * (1.0 - alpha) + pw[i] * alpha
            } else {
                pw[i - 1]
            };
            q.push(qi);
        }

        let mut new_knots = Vec::with_capacity(knots.len() + 1);
        new_knots.extend_from_slice(&knots[..=k]);
        new_knots.push(u);
        new_knots.extend_from_slice(&knots[k + 1..]);

        Self {
            degree: p,
            control_points: q.iter().map(from_homogeneous).collect(),
            weights: q.iter().map(|h| h.z).collect(),
            knots: new_knots,
            fit_points: Vec::new(),
            closed: false,
        }
    }

    /// Splits the curve at the normalized parameter `t` into two clamped
    /// splines. Returns `None` when `t` is at (or beyond) either end.
    #[must_use]
    pub fn split_at(&self, t: f64) -> Option<(Self, Self)> {
        if self.control_points.len() < 2 || t <= 1e-9 || t >= 1.0 - 1e-9 {
            return None;
        }
        let u = self.knot_param(t);
        let p = self.basis().degree;

        let mut curve = Self {
            degree: p,
            knots: self.basis().knots,
            weights: self.basis().weights,
            control_points: self.control_points.clone(),
            fit_points: Vec::new(),
            closed: false,
        };
        let multiplicity = curve.knots.iter().filter(|k| (*k - u).abs() < 1e-12).count();
        for _ in multiplicity..p {
            curve = curve.insert_knot(u);
        }

        let first = curve.knots.iter().position(|k| (*k - u).abs() < 1e-12)?;
        if first == 0 || first > curve.control_points.len() {
            return None;
        }

        let mut left_knots = curve.knots[..first + p].to_vec();
        left_knots.push(u);
        let left = Self {
            degree: p,
            control_points: curve.control_points[..first].to_vec(),
            weights: curve.weights[..first].to_vec(),
            knots: left_knots,
            fit_points: Vec::new(),
            closed: false,
        };

        let mut right_knots = vec![u];
        right_knots.extend_from_slice(&curve.knots[first..]);
        let right = Self {
            degree: p,
            control_points: curve.control_points[first - 1..].to_vec(),
            weights: curve.weights[first - 1..].to_vec(),
            knots: right_knots,
            fit_points: Vec::new(),
            closed: false,
        };
        Some((left, right))
    }

    /// Checks the structural validity of the spline.
    #[must_use]
    pub fn validate(&self) -> SplineValidation {
        let mut issues = Vec::new();
        let n = self.control_points.len();

        if n < 2 {
            issues.push(SplineIssue::TooFewControlPoints { count: n });
        }
        if self.degree == 0 || (n >= 2 && self.degree >= n) {
            issues.push(SplineIssue::InvalidDegree {
                degree: self.degree,
                control_points: n,
            });
        }
        for (index, p) in self.control_points.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite()) {
                issues.push(SplineIssue::NonFiniteControlPoint { index });
            }
        }
        if !self.knots.is_empty() {
            let expected = n + self.degree + 1;
            if self.knots.len() == expected {
                if self.knots.windows(2).any(|w| !(w[0] <= w[1])) {
                    issues.push(SplineIssue::DecreasingKnots);
                } else if self.degree < n && self.knots[self.degree] >= self.knots[n] {
                    issues.push(SplineIssue::EmptyDomain);
                }
            } else {
                issues.push(SplineIssue::KnotCountMismatch {
                    expected,
                    actual: self.knots.len(),
                });
            }
        }
        if !self.weights.is_empty() {
            if self.weights.len() == n {
                for (index, w) in self.weights.iter().enumerate() {
                    if !(w.is_finite() && *w > 0.0) {
                        issues.push(SplineIssue::InvalidWeight { index });
                    }
                }
            } else {
                issues.push(SplineIssue::WeightCountMismatch {
                    expected: n,
                    actual: self.weights.len(),
                });
            }
        }
        for (index, w) in self.control_points.windows(2).enumerate() {
            if (w[1] - w[0]).norm() < DUPLICATE_POINT_EPS {
                issues.push(SplineIssue::DuplicateControlPoints { index });
            }
        }
        if let Some((first, second, _)) = first_polygon_crossing(&self.control_points) {
            issues.push(SplineIssue::SelfIntersectingControlPolygon { first, second });
        }

        SplineValidation {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// Returns the nearest structurally valid spline.
    ///
    /// Drops non-finite and duplicate control points, cuts control-polygon
    /// loops at their crossing, clamps the degree, and rebuilds knots and
    /// weights when they no longer fit.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::Degenerate` if fewer than 2 usable control
    /// points remain.
    pub fn repaired(&self) -> Result<Self> {
        let weights_ok = self.weights_usable();
        let mut points: Vec<(Point2, f64)> = Vec::with_capacity(self.control_points.len());
        for (i, p) in self.control_points.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite()) {
                continue;
            }
            if points
                .last()
                .is_some_and(|(last, _)| (p - last).norm() < DUPLICATE_POINT_EPS)
            {
                continue;
            }
            let w = if weights_ok { self.weights[i] } else { 1.0 };
            points.push((*p, w));
        }

        // Cut loops out of the control polygon.
        for _ in 0..self.control_points.len() {
            let polygon: Vec<Point2> = points.iter().map(|(p, _)| *p).collect();
            let Some((first, second, crossing)) = first_polygon_crossing(&polygon) else {
                break;
            };
            let mut cut = points[..=first].to_vec();
            cut.push((crossing, 1.0));
            cut.extend_from_slice(&points[second + 1..]);
            cut.dedup_by(|b, a| (b.0 - a.0).norm() < DUPLICATE_POINT_EPS);
            points = cut;
        }

        if points.len() < 2 {
            return Err(GeometryError::Degenerate(
                "spline has fewer than 2 usable control points".into(),
            )
            .into());
        }

        let n = points.len();
        let degree = self.degree.clamp(1, n - 1);
        let mut repaired = Self {
            degree,
            control_points: points.iter().map(|(p, _)| *p).collect(),
            weights: points.iter().map(|(_, w)| *w).collect(),
            knots: self.knots.clone(),
            fit_points: self
                .fit_points
                .iter()
                .filter(|p| p.x.is_finite() && p.y.is_finite())
                .copied()
                .collect(),
            closed: self.closed,
        };
        if !repaired.knots_usable(degree) {
            repaired.knots = clamped_uniform_knots(n, degree);
        }
        Ok(repaired)
    }
}

/// Checks a spline for structural defects.
#[must_use]
pub fn validate_spline_geometry(spline: &Spline) -> SplineValidation {
    spline.validate()
}

/// Repairs a spline into the nearest structurally valid one.
///
/// # Errors
///
/// Returns `GeometryError::Degenerate` if fewer than 2 usable control
/// points remain.
pub fn repair_spline(spline: &Spline) -> Result<Spline> {
    spline.repaired()
}

/// Largest span index `k ∈ [p, n-1]` with `knots[k] <= u < knots[k+1]`.
fn find_span(knots: &[f64], p: usize, n: usize, u: f64) -> usize {
    let mut span = p;
    for k in p..n {
        if knots[k] <= u && knots[k] < knots[k + 1] {
            span = k;
        }
    }
    span
}

fn homogeneous(p: &Point2, w: f64) -> Vector3<f64> {
    Vector3::new(p.x * w, p.y * w, w)
}

fn from_homogeneous(h: &Vector3<f64>) -> Point2 {
    if h.z.abs() < TOLERANCE {
        Point2::new(h.x, h.y)
    } else {
        Point2::new(h.x / h.z, h.y / h.z)
    }
}

fn control_polygon_length(points: &[Point2]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

/// First proper crossing between non-adjacent edges of an open polygon.
fn first_polygon_crossing(points: &[Point2]) -> Option<(usize, usize, Point2)> {
    let edges = points.len().saturating_sub(1);
    let eps = 1e-9;
    for i in 0..edges {
        for j in (i + 2)..edges {
            if let Some((pt, t, u)) =
                segment_segment_intersect_2d(&points[i], &points[i + 1], &points[j], &points[j + 1])
            {
                let t_interior = t > eps && t < 1.0 - eps;
                let u_interior = u > eps && u < 1.0 - eps;
                if t_interior && u_interior {
                    return Some((i, j, pt));
                }
            }
        }
    }
    None
}
