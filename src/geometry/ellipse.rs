use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::math::arc_2d::{angle_to_arc_param, sweep_between};
use crate::math::polygon_2d::left_normal;
use crate::math::{Point2, Vector2, TOLERANCE};

/// An elliptical arc.
///
/// `major_axis` is the vector from the center to the end of the major axis;
/// the minor semi-axis is `minor_to_major_ratio` times its length, pointing
/// along the major axis' left normal. Points are
/// `center + major·cos θ + minor·sin θ` for `θ` running from `start_param`
/// to `end_param`. Coincident parameters describe the full ellipse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Point2,
    pub major_axis: Vector2,
    pub minor_to_major_ratio: f64,
    #[serde(default)]
    pub start_param: f64,
    #[serde(default = "full_turn")]
    pub end_param: f64,
    #[serde(default)]
    pub clockwise: bool,
}

fn full_turn() -> f64 {
    TAU
}

impl Ellipse {
    /// Full ellipse, counter-clockwise from the major-axis end.
    #[must_use]
    pub fn new(center: Point2, major_axis: Vector2, minor_to_major_ratio: f64) -> Self {
        Self {
            center,
            major_axis,
            minor_to_major_ratio,
            start_param: 0.0,
            end_param: TAU,
            clockwise: false,
        }
    }

    #[must_use]
    pub fn major_radius(&self) -> f64 {
        self.major_axis.norm()
    }

    #[must_use]
    pub fn minor_radius(&self) -> f64 {
        self.major_radius() * self.minor_to_major_ratio
    }

    #[must_use]
    pub fn minor_axis(&self) -> Vector2 {
        left_normal(self.major_axis) * self.minor_to_major_ratio
    }

    /// Unsigned parametric span, in `(0, 2π]`.
    #[must_use]
    pub fn sweep(&self) -> f64 {
        sweep_between(self.start_param, self.end_param, self.clockwise)
    }

    fn signed_sweep(&self) -> f64 {
        if self.clockwise {
            -self.sweep()
        } else {
            self.sweep()
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        (self.sweep() - TAU).abs() < 1e-9
    }

    /// Point at the eccentric angle `theta`.
    #[must_use]
    pub fn point_at_angle(&self, theta: f64) -> Point2 {
        self.center + self.major_axis * theta.cos() + self.minor_axis() * theta.sin()
    }

    /// Evaluates the arc at the normalized parameter `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.point_at_angle(self.start_param + self.signed_sweep() * t)
    }

    /// Unit tangent in the drawing direction.
    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector2 {
        let theta = self.start_param + self.signed_sweep() * t;
        let d = -self.major_axis * theta.sin() + self.minor_axis() * theta.cos();
        let d = if self.clockwise { -d } else { d };
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

    /// Samples the arc; the first and last points are the arc endpoints.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn tessellate(&self, tolerance: f64) -> Vec<Point2> {
        let r = self.major_radius();
        let max_angle = if tolerance <= 0.0 || tolerance >= r {
            std::f64::consts::FRAC_PI_4
        } else {
            2.0 * (1.0 - tolerance / r).acos()
        };
        let n = ((self.sweep() / max_angle).ceil() as usize).clamp(16, 4096);
        (0..=n).map(|i| self.point_at(i as f64 / n as f64)).collect()
    }

    /// Arc length by dense chord summation.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.tessellate(self.major_radius() * 1e-6)
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    /// Eccentric angle of the point on the ellipse closest in direction to `p`.
    #[must_use]
    pub fn angle_of(&self, p: &Point2) -> f64 {
        let v = p - self.center;
        let a = self.major_radius();
        let b = self.minor_radius();
        if a < TOLERANCE || b < TOLERANCE {
            return 0.0;
        }
        let u = self.major_axis / a;
        let w = left_normal(u);
        (v.dot(&w) / b).atan2(v.dot(&u) / a)
    }

    /// Normalized parameter of `p`, if its eccentric angle is inside the span.
    #[must_use]
    pub fn param_of(&self, p: &Point2, eps: f64) -> Option<f64> {
        angle_to_arc_param(self.angle_of(p), self.start_param, self.signed_sweep(), eps)
    }

    /// Same arc traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            start_param: self.end_param,
            end_param: self.start_param,
            clockwise: !self.clockwise,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn axes_and_points() {
        let e = Ellipse::new(Point2::origin(), Vector2::new(4.0, 0.0), 0.5);
        assert_abs_diff_eq!(e.minor_radius(), 2.0);
        let top = e.point_at(0.25);
        assert_abs_diff_eq!(top.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(top.y, 2.0, epsilon = 1e-12);
        assert!(e.is_full());
    }

    #[test]
    fn circle_length_matches() {
        let e = Ellipse::new(Point2::origin(), Vector2::new(3.0, 0.0), 1.0);
        assert_abs_diff_eq!(e.length(), TAU * 3.0, epsilon = 1e-6);
    }

    #[test]
    fn reversed_swaps_endpoints() {
        let mut e = Ellipse::new(Point2::origin(), Vector2::new(4.0, 0.0), 0.5);
        e.end_param = PI;
        let r = e.reversed();
        assert_abs_diff_eq!(r.start_point().x, -4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r.point_at(0.5).y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn param_of_inside_span() {
        let mut e = Ellipse::new(Point2::origin(), Vector2::new(4.0, 0.0), 0.5);
        e.end_param = PI;
        assert!(e.param_of(&Point2::new(0.0, 2.0), 1e-9).is_some());
        assert!(e.param_of(&Point2::new(0.0, -2.0), 1e-9).is_none());
    }
}
