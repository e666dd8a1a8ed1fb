/// 2D arc/bulge math utilities.
///
/// Bulge convention: `bulge = tan(sweep_angle / 4)`.
/// - `bulge = 0`: straight line
/// - `bulge > 0`: counter-clockwise arc
/// - `bulge < 0`: clockwise arc
/// - `|bulge| = 1`: semicircle
use std::f64::consts::TAU;

use super::{Point2, Vector2, TOLERANCE};

/// Center-radius-angle form of a bulge segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulgeArc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    /// Signed sweep: positive counter-clockwise, negative clockwise.
    pub sweep: f64,
}

/// Converts a bulge-defined arc segment to center-radius-angle form.
///
/// Returns a zero-radius arc at `p0` for zero-length chords.
#[must_use]
pub fn arc_from_bulge(p0: &Point2, p1: &Point2, bulge: f64) -> BulgeArc {
    let chord = p1 - p0;
    let chord_len = chord.norm();

    if chord_len < 1e-12 || bulge.abs() < 1e-12 {
        return BulgeArc {
            center: *p0,
            radius: 0.0,
            start_angle: 0.0,
            sweep: 0.0,
        };
    }

    // Distance from chord midpoint to center.
    let sagitta_ratio = (1.0 - bulge * bulge) / (2.0 * bulge);
    let mid = super::midpoint(p0, p1);

    // Normal to chord pointing toward center (for positive bulge, center is left of chord).
    let normal = Vector2::new(-chord.y, chord.x) / chord_len;
    let center = mid + normal * (sagitta_ratio * chord_len * 0.5);

    // r = d*(1+b²)/(4*|b|) derived from r = d/(2*sin(θ/2)) with θ=4*atan(b)
    let radius = (chord_len * 0.5) * (1.0 + bulge * bulge) / (2.0 * bulge.abs());
    let start_angle = (p0.y - center.y).atan2(p0.x - center.x);
    let sweep = 4.0 * bulge.atan();

    BulgeArc {
        center,
        radius,
        start_angle,
        sweep,
    }
}

/// Bulge value for a signed sweep angle.
#[must_use]
pub fn bulge_from_sweep(sweep: f64) -> f64 {
    (sweep / 4.0).tan()
}

/// Normalizes an angle into `[0, 2π)`.
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Unsigned sweep travelled from `start` to `end` in the given direction,
/// in `(0, 2π]`. Coincident angles are treated as a full turn.
#[must_use]
pub fn sweep_between(start: f64, end: f64, clockwise: bool) -> f64 {
    let raw = if clockwise { start - end } else { end - start };
    let sweep = normalize_angle(raw);
    if sweep < TOLERANCE {
        TAU
    } else {
        sweep
    }
}

/// Evaluates a point on an arc at parameter `t` in `[0, 1]`.
#[must_use]
pub fn arc_point_at(center: &Point2, radius: f64, start_angle: f64, sweep: f64, t: f64) -> Point2 {
    let angle = start_angle + sweep * t;
    Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

/// Computes the unit tangent direction on an arc at parameter `t` in `[0, 1]`.
///
/// The tangent points in the direction of increasing `t`.
#[must_use]
pub fn arc_tangent_at(start_angle: f64, sweep: f64, t: f64) -> Vector2 {
    let angle = start_angle + sweep * t;
    let sign = if sweep >= 0.0 { 1.0 } else { -1.0 };
    // Tangent to circle at angle θ is (-sin θ, cos θ) for CCW; negate for CW.
    Vector2::new(-sign * angle.sin(), sign * angle.cos())
}

/// Converts an absolute angle to an arc parameter `t` in `[0, 1]`.
///
/// `eps` is an angular slack applied at both ends of the sweep.
/// Returns `None` if the angle is not within the arc's angular range.
#[must_use]
pub fn angle_to_arc_param(angle: f64, start_angle: f64, sweep: f64, eps: f64) -> Option<f64> {
    if sweep.abs() < TOLERANCE {
        return None;
    }

    // Angular offset from start_angle to angle in the sweep direction, in [0, 2π).
    let delta = if sweep > 0.0 {
        normalize_angle(angle - start_angle)
    } else {
        normalize_angle(start_angle - angle)
    };
    let abs_sweep = sweep.abs();

    if delta <= abs_sweep + eps {
        return Some((delta / abs_sweep).clamp(0.0, 1.0));
    }
    // Just before the start, wrapped around to near 2π.
    if TAU - delta <= eps {
        return Some(0.0);
    }
    None
}

/// Offsets an arc segment defined by endpoints and bulge.
///
/// Positive distance offsets to the left of the travel direction: for a
/// CCW arc (bulge > 0) that is toward the center, for a CW arc outward.
/// Returns `None` if the offset radius would be ≤ 0 (arc collapses).
///
/// Returns `(start', end', bulge')`.
#[must_use]
pub fn offset_arc_segment(
    p0: &Point2,
    p1: &Point2,
    bulge: f64,
    distance: f64,
) -> Option<(Point2, Point2, f64)> {
    let arc = arc_from_bulge(p0, p1, bulge);

    if arc.radius < 1e-12 {
        return None;
    }

    let sign = if bulge > 0.0 { -1.0 } else { 1.0 };
    let new_radius = arc.radius + sign * distance;

    if new_radius <= 1e-12 {
        return None;
    }

    let start = arc_point_at(&arc.center, new_radius, arc.start_angle, arc.sweep, 0.0);
    let end = arc_point_at(&arc.center, new_radius, arc.start_angle, arc.sweep, 1.0);

    // Bulge is invariant to radius changes (same sweep angle).
    Some((start, end, bulge))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-10;

    #[test]
    fn semicircle_ccw() {
        // CCW semicircle from (0,0) to (2,0), bulge=1: goes through the bottom.
        let arc = arc_from_bulge(&Point2::new(0.0, 0.0), &Point2::new(2.0, 0.0), 1.0);
        assert_abs_diff_eq!(arc.center.x, 1.0, epsilon = TOL);
        assert_abs_diff_eq!(arc.center.y, 0.0, epsilon = TOL);
        assert_abs_diff_eq!(arc.radius, 1.0, epsilon = TOL);
        assert_abs_diff_eq!(arc.sweep, PI, epsilon = TOL);

        let pm = arc_point_at(&arc.center, arc.radius, arc.start_angle, arc.sweep, 0.5);
        assert_abs_diff_eq!(pm.x, 1.0, epsilon = TOL);
        assert_abs_diff_eq!(pm.y, -1.0, epsilon = TOL);
    }

    #[test]
    fn semicircle_cw_goes_through_top() {
        let arc = arc_from_bulge(&Point2::new(0.0, 0.0), &Point2::new(2.0, 0.0), -1.0);
        assert_abs_diff_eq!(arc.sweep, -PI, epsilon = TOL);
        let pm = arc_point_at(&arc.center, arc.radius, arc.start_angle, arc.sweep, 0.5);
        assert_abs_diff_eq!(pm.x, 1.0, epsilon = TOL);
        assert_abs_diff_eq!(pm.y, 1.0, epsilon = TOL);
    }

    #[test]
    fn sweep_between_directions() {
        assert_abs_diff_eq!(sweep_between(0.0, PI / 2.0, false), PI / 2.0, epsilon = TOL);
        assert_abs_diff_eq!(sweep_between(0.0, PI / 2.0, true), 1.5 * PI, epsilon = TOL);
        assert_abs_diff_eq!(sweep_between(1.0, 1.0, false), TAU, epsilon = TOL);
    }

    #[test]
    fn angle_param_inside_and_outside() {
        // Upper half, CCW from 0 to π.
        let t = angle_to_arc_param(PI / 2.0, 0.0, PI, 1e-9).unwrap();
        assert_abs_diff_eq!(t, 0.5, epsilon = TOL);
        assert!(angle_to_arc_param(-PI / 2.0, 0.0, PI, 1e-9).is_none());

        // Same half traversed clockwise from π to 0.
        let t = angle_to_arc_param(PI / 4.0, PI, -PI, 1e-9).unwrap();
        assert_abs_diff_eq!(t, 0.75, epsilon = TOL);
    }

    #[test]
    fn arc_tangent_is_unit() {
        let t0 = arc_tangent_at(PI, PI, 0.0);
        assert_abs_diff_eq!(t0.norm(), 1.0, epsilon = TOL);
        assert_abs_diff_eq!(t0.x, 0.0, epsilon = TOL);
        assert_abs_diff_eq!(t0.y, -1.0, epsilon = TOL);
    }

    #[test]
    fn offset_arc_left_of_ccw_shrinks() {
        // CCW semicircle radius 1: left is the center side.
        let (s, e, b) =
            offset_arc_segment(&Point2::new(0.0, 0.0), &Point2::new(2.0, 0.0), 1.0, 0.5)
                .unwrap();
        assert_abs_diff_eq!(b, 1.0, epsilon = TOL);
        assert_abs_diff_eq!(s.x, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(e.x, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn offset_arc_collapse() {
        let result = offset_arc_segment(&Point2::new(0.0, 0.0), &Point2::new(2.0, 0.0), 1.0, 1.5);
        assert!(result.is_none());
    }

    #[test]
    fn bulge_roundtrip_quarter() {
        let b = bulge_from_sweep(PI / 2.0);
        let arc = arc_from_bulge(&Point2::new(1.0, 0.0), &Point2::new(0.0, 1.0), b);
        assert_abs_diff_eq!(arc.radius, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(arc.sweep, PI / 2.0, epsilon = 1e-9);
    }
}
