mod arc;
mod chain;
mod circle;
mod ellipse;
mod line;
mod polyline;
mod spline;

pub use arc::Arc;
pub(crate) use arc::arc_subdivision_count;
pub(crate) use chain::boundary_contains;
pub use chain::{distance_to_chain, is_point_inside_chain, Chain};
pub use circle::Circle;
pub use ellipse::Ellipse;
pub use line::Line;
pub use polyline::{Polyline, PolylineVertex};
pub use spline::{
    clamped_uniform_knots, repair_spline, validate_spline_geometry, LengthEstimate, LengthMethod,
    Spline, SplineIssue, SplineValidation, FALLBACK_SPLINE_LENGTH,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::distance_2d::point_to_segment;
use crate::math::{Point2, Vector2};

/// Which end(s) of a shape an extension applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendEnd {
    Start,
    End,
    Both,
}

/// Discriminant of [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Line,
    Arc,
    Circle,
    Polyline,
    Spline,
    Ellipse,
}

/// Geometry of a drawing shape.
///
/// Every kind is parameterized over `[0, 1]` in its drawing direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geometry {
    Line(Line),
    Arc(Arc),
    Circle(Circle),
    Polyline(Polyline),
    Spline(Spline),
    Ellipse(Ellipse),
}

impl Geometry {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Line(_) => ShapeKind::Line,
            Self::Arc(_) => ShapeKind::Arc,
            Self::Circle(_) => ShapeKind::Circle,
            Self::Polyline(_) => ShapeKind::Polyline,
            Self::Spline(_) => ShapeKind::Spline,
            Self::Ellipse(_) => ShapeKind::Ellipse,
        }
    }

    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        match self {
            Self::Line(l) => l.point_at(t),
            Self::Arc(a) => a.point_at(t),
            Self::Circle(c) => c.point_at(t),
            Self::Polyline(p) => p.point_at(t),
            Self::Spline(s) => s.point_at(t),
            Self::Ellipse(e) => e.point_at(t),
        }
    }

    /// Unit tangent in the drawing direction (zero for degenerate shapes).
    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector2 {
        match self {
            Self::Line(l) => l.direction().unwrap_or_else(|_| Vector2::zeros()),
            Self::Arc(a) => a.tangent_at(t),
            Self::Circle(c) => c.tangent_at(t),
            Self::Polyline(p) => p.tangent_at(t),
            Self::Spline(s) => s.tangent_at(t),
            Self::Ellipse(e) => e.tangent_at(t),
        }
    }

    #[must_use]
    pub fn start_point(&self) -> Point2 {
        match self {
            Self::Line(l) => l.start,
            Self::Polyline(p) => p
                .vertices
                .first()
                .map_or_else(Point2::origin, PolylineVertex::point),
            _ => self.point_at(0.0),
        }
    }

    #[must_use]
    pub fn end_point(&self) -> Point2 {
        match self {
            Self::Line(l) => l.end,
            Self::Polyline(p) if p.closed => self.start_point(),
            Self::Polyline(p) => p
                .vertices
                .last()
                .map_or_else(Point2::origin, PolylineVertex::point),
            _ => self.point_at(1.0),
        }
    }

    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        self.point_at(0.5)
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        match self {
            Self::Line(l) => l.length(),
            Self::Arc(a) => a.length(),
            Self::Circle(c) => c.length(),
            Self::Polyline(p) => p.length(),
            Self::Spline(s) => s.length(),
            Self::Ellipse(e) => e.length(),
        }
    }

    /// Returns whether the shape is closed on its own.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Line(_) => false,
            Self::Arc(a) => a.is_full_circle(),
            Self::Circle(_) => true,
            Self::Polyline(p) => p.closed,
            Self::Spline(s) => s.closed,
            Self::Ellipse(e) => e.is_full(),
        }
    }

    /// Samples the shape in drawing direction. Both endpoints are included,
    /// so closed shapes repeat their first point at the end.
    #[must_use]
    pub fn tessellate(&self, tolerance: f64) -> Vec<Point2> {
        match self {
            Self::Line(l) => vec![l.start, l.end],
            Self::Arc(a) => {
                let n = a.subdivision_count(tolerance);
                (0..=n).map(|i| a.point_at(f64::from(i) / f64::from(n))).collect()
            }
            Self::Circle(c) => {
                let n = arc_subdivision_count(c.radius, std::f64::consts::TAU, tolerance).max(8);
                (0..=n).map(|i| c.point_at(f64::from(i) / f64::from(n))).collect()
            }
            Self::Polyline(p) => {
                let mut points = p.to_points(tolerance);
                if p.closed {
                    if let Some(first) = points.first().copied() {
                        points.push(first);
                    }
                }
                points
            }
            Self::Spline(s) => s.tessellate(tolerance),
            Self::Ellipse(e) => e.tessellate(tolerance),
        }
    }

    /// Same shape traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Line(l) => Self::Line(l.reversed()),
            Self::Arc(a) => Self::Arc(a.reversed()),
            Self::Circle(c) => Self::Arc(c.as_arc().reversed()),
            Self::Polyline(p) => Self::Polyline(p.reversed()),
            Self::Spline(s) => Self::Spline(s.reversed()),
            Self::Ellipse(e) => Self::Ellipse(e.reversed()),
        }
    }

    /// Parameter of the point on the shape closest to `p`, with its distance.
    #[must_use]
    pub fn closest_param(&self, p: &Point2) -> (f64, f64) {
        match self {
            Self::Line(l) => {
                let (d, t) = point_to_segment(p, &l.start, &l.end);
                (t, d)
            }
            Self::Arc(a) => {
                if let Some(t) = a.param_of(p, 0.0) {
                    (t, ((p - a.center).norm() - a.radius).abs())
                } else {
                    let ds = (a.start_point() - p).norm();
                    let de = (a.end_point() - p).norm();
                    if ds <= de {
                        (0.0, ds)
                    } else {
                        (1.0, de)
                    }
                }
            }
            Self::Circle(c) => (c.param_of(p), ((p - c.center).norm() - c.radius).abs()),
            Self::Polyline(pl) => {
                let mut best = (0.0, f64::INFINITY);
                for (i, seg) in pl.segments().iter().enumerate() {
                    let (t, d) = seg.closest_param(p);
                    if d < best.1 {
                        best = (pl.global_param(i, t), d);
                    }
                }
                best
            }
            Self::Spline(s) => s.closest_param(p),
            Self::Ellipse(_) => sampled_closest_param(self, p),
        }
    }

    /// Distance from `p` to the shape.
    #[must_use]
    pub fn distance_to(&self, p: &Point2) -> f64 {
        self.closest_param(p).1
    }
}

/// Closest parameter by dense sampling with a local golden-section refinement.
#[allow(clippy::cast_precision_loss)]
fn sampled_closest_param(geometry: &Geometry, p: &Point2) -> (f64, f64) {
    const SAMPLES: usize = 256;
    let dist = |t: f64| (geometry.point_at(t) - p).norm();
    let (mut best_t, mut best_d) = (0.0, f64::INFINITY);
    for i in 0..=SAMPLES {
        let t = i as f64 / SAMPLES as f64;
        let d = dist(t);
        if d < best_d {
            best_t = t;
            best_d = d;
        }
    }
    let step = 1.0 / SAMPLES as f64;
    let (mut a, mut b) = ((best_t - step).max(0.0), (best_t + step).min(1.0));
    let ratio = 0.5 * (5.0_f64.sqrt() - 1.0);
    for _ in 0..50 {
        let c = b - ratio * (b - a);
        let d = a + ratio * (b - a);
        if dist(c) < dist(d) {
            b = d;
        } else {
            a = c;
        }
    }
    let t = 0.5 * (a + b);
    let d = dist(t);
    if d < best_d {
        (t, d)
    } else {
        (best_t, best_d)
    }
}

/// A drawing shape: an identifier plus its geometry.
///
/// Shapes are values; offsetting and trimming produce new shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    pub geometry: Geometry,
}

impl Shape {
    /// Creates a shape with a fresh identifier.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            geometry,
        }
    }

    /// Creates a shape that keeps an existing identifier, e.g. when a
    /// trimmed or extended geometry replaces the original.
    #[must_use]
    pub fn with_id(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    #[must_use]
    pub fn start_point(&self) -> Point2 {
        self.geometry.start_point()
    }

    #[must_use]
    pub fn end_point(&self) -> Point2 {
        self.geometry.end_point()
    }

    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        self.geometry.midpoint()
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.geometry.length()
    }
}

impl From<Line> for Geometry {
    fn from(value: Line) -> Self {
        Self::Line(value)
    }
}

impl From<Arc> for Geometry {
    fn from(value: Arc) -> Self {
        Self::Arc(value)
    }
}

impl From<Circle> for Geometry {
    fn from(value: Circle) -> Self {
        Self::Circle(value)
    }
}

impl From<Polyline> for Geometry {
    fn from(value: Polyline) -> Self {
        Self::Polyline(value)
    }
}

impl From<Spline> for Geometry {
    fn from(value: Spline) -> Self {
        Self::Spline(value)
    }
}

impl From<Ellipse> for Geometry {
    fn from(value: Ellipse) -> Self {
        Self::Ellipse(value)
    }
}
