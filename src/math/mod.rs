pub mod arc_2d;
pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
///
/// This is the numerical epsilon used inside the math kernels. The
/// user-facing chain tolerance (drawing units) is configured separately.
pub const TOLERANCE: f64 = 1e-10;

/// Distance below which a line/circle or circle/circle contact is reported
/// as a single tangent point instead of two crossings.
pub const TANGENT_TOLERANCE: f64 = 1e-6;

/// Z-component of the cross product of two 2D vectors.
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: &Point2, b: &Point2) -> f64 {
    (b - a).norm()
}

/// Returns whether two points coincide within `tolerance`.
#[must_use]
pub fn points_equal(a: &Point2, b: &Point2, tolerance: f64) -> bool {
    distance(a, b) <= tolerance
}

/// Midpoint between two points.
#[must_use]
pub fn midpoint(a: &Point2, b: &Point2) -> Point2 {
    Point2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}
