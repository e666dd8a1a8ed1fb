use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use super::ExtendEnd;
use crate::error::{GeometryError, Result};
use crate::math::arc_2d::{angle_to_arc_param, arc_point_at, arc_tangent_at, sweep_between};
use crate::math::{Point2, Vector2, TOLERANCE};

/// A circular arc in the drawing plane.
///
/// The arc runs from `start_angle` to `end_angle` (radians), counter-clockwise
/// unless `clockwise` is set. Coincident angles describe a full turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    #[serde(default)]
    pub clockwise: bool,
}

impl Arc {
    /// Creates a new arc.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive and finite.
    pub fn new(
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    ) -> Result<Self> {
        if !(radius.is_finite() && radius > TOLERANCE) {
            return Err(GeometryError::Degenerate("arc radius must be positive".into()).into());
        }
        Ok(Self {
            center,
            radius,
            start_angle,
            end_angle,
            clockwise,
        })
    }

    /// Unsigned angular span travelled in the drawing direction, in `(0, 2π]`.
    #[must_use]
    pub fn sweep(&self) -> f64 {
        sweep_between(self.start_angle, self.end_angle, self.clockwise)
    }

    /// Sweep with the drawing direction as sign (negative when clockwise).
    #[must_use]
    pub fn signed_sweep(&self) -> f64 {
        if self.clockwise {
            -self.sweep()
        } else {
            self.sweep()
        }
    }

    /// Evaluates the arc at the normalized parameter `t`.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        arc_point_at(&self.center, self.radius, self.start_angle, self.signed_sweep(), t)
    }

    /// Unit tangent in the drawing direction at the normalized parameter `t`.
    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector2 {
        arc_tangent_at(self.start_angle, self.signed_sweep(), t)
    }

    #[must_use]
    pub fn start_point(&self) -> Point2 {
        self.point_at(0.0)
    }

    #[must_use]
    pub fn end_point(&self) -> Point2 {
        self.point_at(1.0)
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.radius * self.sweep()
    }

    /// Polar angle of `p` around the arc center.
    #[must_use]
    pub fn angle_of(&self, p: &Point2) -> f64 {
        (p.y - self.center.y).atan2(p.x - self.center.x)
    }

    /// Normalized parameter of the angular position of `p`, if that angle
    /// lies within the span (`eps` is an angular slack).
    #[must_use]
    pub fn param_of(&self, p: &Point2, eps: f64) -> Option<f64> {
        angle_to_arc_param(self.angle_of(p), self.start_angle, self.signed_sweep(), eps)
    }

    /// Returns whether `p` lies on the arc within `tolerance` (radially and angularly).
    #[must_use]
    pub fn is_point_on_arc(&self, p: &Point2, tolerance: f64) -> bool {
        let radial = ((p - self.center).norm() - self.radius).abs();
        radial <= tolerance && self.param_of(p, tolerance / self.radius).is_some()
    }

    /// Returns whether the arc covers a full revolution.
    #[must_use]
    pub fn is_full_circle(&self) -> bool {
        (self.sweep() - TAU).abs() < 1e-9
    }

    /// Same arc traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            center: self.center,
            radius: self.radius,
            start_angle: self.end_angle,
            end_angle: self.start_angle,
            clockwise: !self.clockwise,
        }
    }

    /// Same angular span on a different radius.
    #[must_use]
    pub fn with_radius(&self, radius: f64) -> Self {
        Self {
            radius,
            ..self.clone()
        }
    }

    /// Widens the angular span by `length / radius` at the requested end(s),
    /// never beyond a full revolution. `Both` splits the available widening
    /// symmetrically.
    #[must_use]
    pub fn extended(&self, length: f64, end: ExtendEnd) -> Self {
        let room = (TAU - self.sweep()).max(0.0) - 1e-9;
        if room <= 0.0 || length <= 0.0 {
            return self.clone();
        }
        let wanted = length / self.radius;
        let (grow_start, grow_end) = match end {
            ExtendEnd::Start => (wanted.min(room), 0.0),
            ExtendEnd::End => (0.0, wanted.min(room)),
            ExtendEnd::Both => {
                let each = wanted.min(room * 0.5);
                (each, each)
            }
        };
        let dir = if self.clockwise { -1.0 } else { 1.0 };
        Self {
            start_angle: self.start_angle - dir * grow_start,
            end_angle: self.end_angle + dir * grow_end,
            ..self.clone()
        }
    }

    /// Number of chords needed to stay within `tolerance` of the arc.
    #[must_use]
    pub fn subdivision_count(&self, tolerance: f64) -> u32 {
        arc_subdivision_count(self.radius, self.sweep(), tolerance)
    }
}

/// Computes the number of line segments needed to approximate an arc
/// within the given tolerance.
pub(crate) fn arc_subdivision_count(radius: f64, abs_sweep: f64, tolerance: f64) -> u32 {
    if radius < 1e-12 || abs_sweep < 1e-12 || tolerance <= 0.0 {
        return 1;
    }
    // From the sagitta formula: sagitta = r * (1 - cos(θ/2))
    // For a given tolerance: θ = 2 * acos(1 - tolerance/r)
    let max_angle = if tolerance >= radius {
        PI
    } else {
        2.0 * (1.0 - tolerance / radius).acos()
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = (abs_sweep / max_angle).ceil().min(4096.0) as u32;
    n.max(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn top_half() -> Arc {
        Arc::new(Point2::new(0.0, 0.0), 5.0, 0.0, PI, false).unwrap()
    }

    #[test]
    fn endpoints_and_length() {
        let arc = top_half();
        assert_abs_diff_eq!(arc.start_point().x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(arc.end_point().x, -5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(arc.length(), 5.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn clockwise_sweep_goes_the_other_way() {
        let arc = Arc::new(Point2::origin(), 1.0, 0.0, FRAC_PI_2, true).unwrap();
        assert_abs_diff_eq!(arc.sweep(), 1.5 * PI, epsilon = 1e-12);
        // Midpoint of the long way round sits in the third quadrant.
        let mid = arc.point_at(0.5);
        assert!(mid.x < 0.0 && mid.y < 0.0);
    }

    #[test]
    fn point_on_arc_checks_span() {
        let arc = top_half();
        assert!(arc.is_point_on_arc(&Point2::new(0.0, 5.0), 1e-6));
        assert!(!arc.is_point_on_arc(&Point2::new(0.0, -5.0), 1e-6));
    }

    #[test]
    fn reversed_keeps_geometry() {
        let arc = top_half();
        let rev = arc.reversed();
        assert_abs_diff_eq!(rev.start_point().x, arc.end_point().x, epsilon = 1e-12);
        assert_abs_diff_eq!(rev.sweep(), arc.sweep(), epsilon = 1e-12);
        assert_abs_diff_eq!(rev.point_at(0.5).y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn extension_caps_at_full_circle() {
        let ext = top_half().extended(1000.0, ExtendEnd::Both);
        assert!(ext.sweep() > 2.0 * PI - 1e-6);
        assert!(ext.is_point_on_arc(&Point2::new(0.0, -5.0), 1e-6));
    }

    #[test]
    fn extension_single_end() {
        let ext = top_half().extended(5.0 * FRAC_PI_2, ExtendEnd::End);
        assert_abs_diff_eq!(ext.sweep(), 1.5 * PI, epsilon = 1e-9);
        assert_abs_diff_eq!(ext.start_point().x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_radius_rejected() {
        assert!(Arc::new(Point2::origin(), 0.0, 0.0, PI, false).is_err());
    }
}
