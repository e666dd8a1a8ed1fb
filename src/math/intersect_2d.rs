use super::arc_2d::angle_to_arc_param;
use super::{cross_2d, Point2, Vector2, TANGENT_TOLERANCE, TOLERANCE};

/// A crossing between an unbounded line and a circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCircleHit {
    /// Parameter along the line, `p0 + t * (p1 - p0)`.
    pub t: f64,
    pub point: Point2,
    /// `true` when the discriminant is (numerically) zero.
    pub tangent: bool,
}

/// A crossing between two circles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleCircleHit {
    pub point: Point2,
    pub tangent: bool,
}

/// Parametric 2D line-line intersection.
///
/// Given lines `p1 + t * d1` and `p2 + u * d2`, returns `(t, u)` if not parallel.
#[must_use]
pub fn line_line_intersect_2d(
    p1: &Point2,
    d1: &Vector2,
    p2: &Point2,
    d2: &Vector2,
) -> Option<(f64, f64)> {
    let cross = cross_2d(d1, d2);
    if cross.abs() < TOLERANCE * d1.norm().max(1.0) * d2.norm().max(1.0) {
        return None;
    }
    let delta = p2 - p1;
    let t = cross_2d(&delta, d2) / cross;
    let u = cross_2d(&delta, d1) / cross;
    Some((t, u))
}

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` and `u` are in `[0, 1]`.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(Point2, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let (t, u) = line_line_intersect_2d(a0, &da, b0, &db)?;

    // Use a small epsilon to include endpoints.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t_clamped = t.clamp(0.0, 1.0);
        Some((a0 + da * t_clamped, t_clamped, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Intersection of the unbounded line through `p0`/`p1` with a circle.
///
/// Substitutes the parametric line into the circle equation and solves
/// `a·t² + b·t + c = 0`. The discriminant is classified in length units
/// (`disc / 4a` is the squared half-chord): beyond [`TANGENT_TOLERANCE`]
/// below zero there is no hit, near zero a single tangent point, otherwise
/// two crossings at `t = (-b ± √disc) / 2a`.
#[must_use]
pub fn line_circle_intersect_2d(
    p0: &Point2,
    p1: &Point2,
    center: &Point2,
    radius: f64,
) -> Vec<LineCircleHit> {
    let d = p1 - p0;
    let a = d.norm_squared();
    if a < TOLERANCE * TOLERANCE || radius < TOLERANCE {
        return Vec::new();
    }

    // Translate into the circle's local frame.
    let f = p0 - center;
    let b = 2.0 * f.dot(&d);
    let c = f.norm_squared() - radius * radius;
    let discriminant = b * b - 4.0 * a * c;

    // Signed gap between the line and the circle, in length units.
    let half_chord_sq = discriminant / (4.0 * a);
    let line_dist = (radius * radius - half_chord_sq).max(0.0).sqrt();
    let gap = line_dist - radius;

    if gap > TANGENT_TOLERANCE {
        return Vec::new();
    }
    if gap.abs() <= TANGENT_TOLERANCE || discriminant <= 0.0 {
        let t = -b / (2.0 * a);
        return vec![LineCircleHit {
            t,
            point: p0 + d * t,
            tangent: true,
        }];
    }

    let disc_sqrt = discriminant.sqrt();
    [(-b - disc_sqrt) / (2.0 * a), (-b + disc_sqrt) / (2.0 * a)]
        .into_iter()
        .map(|t| LineCircleHit {
            t,
            point: p0 + d * t,
            tangent: false,
        })
        .collect()
}

/// Intersection of two full circles in 2D.
///
/// Concentric circles report no points (coincident circles have infinitely many).
#[must_use]
pub fn circle_circle_intersect_2d(
    c1: &Point2,
    r1: f64,
    c2: &Point2,
    r2: f64,
) -> Vec<CircleCircleHit> {
    if r1 < TOLERANCE || r2 < TOLERANCE {
        return Vec::new();
    }

    let delta = c2 - c1;
    let dist_sq = delta.norm_squared();
    let dist = dist_sq.sqrt();
    if dist < TOLERANCE {
        return Vec::new();
    }

    let sum = r1 + r2;
    let diff = (r1 - r2).abs();
    if dist > sum + TANGENT_TOLERANCE || dist < diff - TANGENT_TOLERANCE {
        return Vec::new();
    }

    // Distance from c1 along the line c1→c2 to the radical line.
    let a = (r1 * r1 - r2 * r2 + dist_sq) / (2.0 * dist);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let dir = delta / dist;
    let mid = c1 + dir * a;

    if h < TANGENT_TOLERANCE
        || (dist - sum).abs() < TANGENT_TOLERANCE
        || (dist - diff).abs() < TANGENT_TOLERANCE
    {
        return vec![CircleCircleHit {
            point: mid,
            tangent: true,
        }];
    }

    let perp = Vector2::new(-dir.y, dir.x);
    vec![
        CircleCircleHit {
            point: mid + perp * h,
            tangent: false,
        },
        CircleCircleHit {
            point: mid - perp * h,
            tangent: false,
        },
    ]
}

/// Intersection of a line segment with a circular arc in 2D.
///
/// The arc has `center`, `radius`, `start_angle`, and signed `sweep`.
///
/// Returns a vector of `(point, t_seg, t_arc)` with both parameters in `[0, 1]`.
#[must_use]
pub fn line_arc_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    center: &Point2,
    radius: f64,
    start_angle: f64,
    sweep: f64,
) -> Vec<(Point2, f64, f64)> {
    if sweep.abs() < TOLERANCE {
        return Vec::new();
    }
    let eps = TOLERANCE * 100.0;
    line_circle_intersect_2d(a0, a1, center, radius)
        .into_iter()
        .filter(|hit| hit.t >= -eps && hit.t <= 1.0 + eps)
        .filter_map(|hit| {
            let angle = (hit.point.y - center.y).atan2(hit.point.x - center.x);
            angle_to_arc_param(angle, start_angle, sweep, eps)
                .map(|t_arc| (hit.point, hit.t.clamp(0.0, 1.0), t_arc))
        })
        .collect()
}

/// Intersection of two circular arcs in 2D.
///
/// Returns a vector of `(point, t1, t2)` where `t1` and `t2` are arc parameters in `[0, 1]`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn arc_arc_intersect_2d(
    c1: &Point2,
    r1: f64,
    start1: f64,
    sweep1: f64,
    c2: &Point2,
    r2: f64,
    start2: f64,
    sweep2: f64,
) -> Vec<(Point2, f64, f64)> {
    let eps = TOLERANCE * 100.0;
    circle_circle_intersect_2d(c1, r1, c2, r2)
        .into_iter()
        .filter_map(|hit| {
            let angle1 = (hit.point.y - c1.y).atan2(hit.point.x - c1.x);
            let angle2 = (hit.point.y - c2.y).atan2(hit.point.x - c2.x);
            let t1 = angle_to_arc_param(angle1, start1, sweep1, eps)?;
            let t2 = angle_to_arc_param(angle2, start2, sweep2, eps)?;
            Some((hit.point, t1, t2))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn line_line_perpendicular() {
        let (t, u) = line_line_intersect_2d(
            &Point2::new(0.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Point2::new(0.5, -1.0),
            &Vector2::new(0.0, 1.0),
        )
        .unwrap();
        assert_abs_diff_eq!(t, 0.5, epsilon = TOLERANCE);
        assert_abs_diff_eq!(u, 1.0, epsilon = TOLERANCE);
    }

    #[test]
    fn line_line_parallel_returns_none() {
        assert!(line_line_intersect_2d(
            &Point2::new(0.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Point2::new(0.0, 1.0),
            &Vector2::new(1.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn segment_segment_crossing() {
        let (pt, t, u) = segment_segment_intersect_2d(
            &Point2::new(0.0, 0.0),
            &Point2::new(2.0, 2.0),
            &Point2::new(0.0, 2.0),
            &Point2::new(2.0, 0.0),
        )
        .unwrap();
        assert_abs_diff_eq!(pt.x, 1.0, epsilon = TOLERANCE);
        assert_abs_diff_eq!(pt.y, 1.0, epsilon = TOLERANCE);
        assert_abs_diff_eq!(t, 0.5, epsilon = TOLERANCE);
        assert_abs_diff_eq!(u, 0.5, epsilon = TOLERANCE);
    }

    #[test]
    fn segment_segment_no_crossing() {
        assert!(segment_segment_intersect_2d(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(0.0, 1.0),
            &Point2::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn line_circle_secant() {
        let hits = line_circle_intersect_2d(
            &Point2::new(-2.0, 0.0),
            &Point2::new(2.0, 0.0),
            &Point2::origin(),
            1.0,
        );
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| !h.tangent));
        assert_abs_diff_eq!(hits[0].t, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(hits[1].t, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn line_circle_exact_tangent() {
        let hits = line_circle_intersect_2d(
            &Point2::new(-10.0, 5.0),
            &Point2::new(10.0, 5.0),
            &Point2::origin(),
            5.0,
        );
        assert_eq!(hits.len(), 1);
        assert!(hits[0].tangent);
        assert_abs_diff_eq!(hits[0].point.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].point.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn line_circle_miss() {
        let hits = line_circle_intersect_2d(
            &Point2::new(-10.0, 5.1),
            &Point2::new(10.0, 5.1),
            &Point2::origin(),
            5.0,
        );
        assert!(hits.is_empty());
    }

    #[test]
    fn line_arc_miss_outside_arc_range() {
        let hits = line_arc_intersect_2d(
            &Point2::new(-2.0, 0.0),
            &Point2::new(2.0, 0.0),
            &Point2::origin(),
            1.0,
            PI / 4.0,
            PI / 4.0,
        );
        assert!(hits.is_empty(), "hits={hits:?}");
    }

    #[test]
    fn arc_arc_two_crossings() {
        let hits = arc_arc_intersect_2d(
            &Point2::new(0.0, 0.0),
            1.0,
            -PI,
            2.0 * PI,
            &Point2::new(1.0, 0.0),
            1.0,
            0.0,
            2.0 * PI,
        );
        assert_eq!(hits.len(), 2, "hits={hits:?}");
        let sqrt3_2 = 3.0_f64.sqrt() / 2.0;
        let mut ys: Vec<f64> = hits.iter().map(|h| h.0.y).collect();
        ys.sort_by(f64::total_cmp);
        assert_abs_diff_eq!(ys[0], -sqrt3_2, epsilon = 1e-9);
        assert_abs_diff_eq!(ys[1], sqrt3_2, epsilon = 1e-9);
    }

    #[test]
    fn circle_circle_external_tangent() {
        let hits = circle_circle_intersect_2d(&Point2::origin(), 1.0, &Point2::new(2.0, 0.0), 1.0);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].tangent);
        assert_abs_diff_eq!(hits[0].point.x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn circle_circle_too_far() {
        assert!(
            circle_circle_intersect_2d(&Point2::origin(), 1.0, &Point2::new(5.0, 0.0), 1.0)
                .is_empty()
        );
    }
}
