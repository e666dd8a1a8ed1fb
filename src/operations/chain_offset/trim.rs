use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{GeometryError, OperationError, Result};
use crate::geometry::{Arc, Ellipse, Geometry, Line, Polyline, Shape, Spline};
use crate::math::{midpoint, Point2};
use crate::operations::intersect::{extended_param, IntersectionResult, IntersectionType};

/// Parameters closer than this to a shape end count as that end.
const END_PARAM_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerType {
    Sharp,
    Tangent,
}

/// A performed trim between two consecutive shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimPoint {
    pub point: Point2,
    pub shape1_index: usize,
    pub shape2_index: usize,
    /// Length removed from the first shape; negative when it was lengthened.
    pub trim_amount1: f64,
    pub trim_amount2: f64,
    pub corner_type: CornerType,
}

/// Outcome of moving one shape's endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTrimResult {
    pub success: bool,
    /// The trimmed shape, or the untouched input on failure.
    pub shape: Shape,
    pub trim_amount: f64,
    pub error: Option<String>,
}

/// Outcome of [`trim_consecutive_shapes`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrimPairResult {
    pub shape1_result: ShapeTrimResult,
    pub shape2_result: ShapeTrimResult,
    /// The intersection the pair was trimmed to.
    pub intersection: Option<IntersectionResult>,
}

impl TrimPairResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shape1_result.success && self.shape2_result.success
    }

    /// The trim record for this pair, when both sides were trimmed.
    #[must_use]
    pub fn trim_point(&self, shape1_index: usize, shape2_index: usize) -> Option<TrimPoint> {
        if !self.is_complete() {
            return None;
        }
        let hit = self.intersection.as_ref()?;
        Some(TrimPoint {
            point: hit.point,
            shape1_index,
            shape2_index,
            trim_amount1: self.shape1_result.trim_amount,
            trim_amount2: self.shape2_result.trim_amount,
            corner_type: match hit.intersection_type {
                IntersectionType::Exact => CornerType::Sharp,
                IntersectionType::Tangent => CornerType::Tangent,
            },
        })
    }
}

/// Trims two consecutive shapes to meet at one of `intersections`: the one
/// nearest to the current joint. The first shape's end and the second
/// shape's start move there. Either side may fail on its own, in which case
/// its result carries the untouched shape.
#[must_use]
pub fn trim_consecutive_shapes(
    shape1: &Shape,
    shape2: &Shape,
    intersections: &[IntersectionResult],
    tolerance: f64,
) -> TrimPairResult {
    let joint = midpoint(&shape1.end_point(), &shape2.start_point());
    let chosen = intersections
        .iter()
        .min_by(|a, b| (a.point - joint).norm().total_cmp(&(b.point - joint).norm()))
        .cloned();

    let Some(hit) = chosen else {
        let missing = |shape: &Shape| ShapeTrimResult {
            success: false,
            shape: shape.clone(),
            trim_amount: 0.0,
            error: Some("no intersection to trim to".to_owned()),
        };
        return TrimPairResult {
            shape1_result: missing(shape1),
            shape2_result: missing(shape2),
            intersection: None,
        };
    };

    let shape1_result = trim_result(shape1, with_end_at(&shape1.geometry, &hit.point, tolerance));
    let shape2_result =
        trim_result(shape2, with_start_at(&shape2.geometry, &hit.point, tolerance));
    trace!(
        point = ?hit.point,
        amount1 = shape1_result.trim_amount,
        amount2 = shape2_result.trim_amount,
        "trimmed pair"
    );
    TrimPairResult {
        shape1_result,
        shape2_result,
        intersection: Some(hit),
    }
}

fn trim_result(original: &Shape, trimmed: Result<Geometry>) -> ShapeTrimResult {
    match trimmed {
        Ok(geometry) => {
            let trim_amount = original.length() - geometry.length();
            ShapeTrimResult {
                success: true,
                shape: Shape::with_id(original.id.clone(), geometry),
                trim_amount,
                error: None,
            }
        }
        Err(e) => ShapeTrimResult {
            success: false,
            shape: original.clone(),
            trim_amount: 0.0,
            error: Some(e.to_string()),
        },
    }
}

fn unreachable_point(what: &str, point: &Point2) -> crate::error::KerflineError {
    OperationError::Failed(format!(
        "({:.6}, {:.6}) is not reachable by moving the {what}",
        point.x, point.y
    ))
    .into()
}

/// Moves the end of `geometry` to `point`, shortening or lengthening it
/// along its own curve. `point` must lie on the shape or its natural
/// extension within `tolerance`.
///
/// # Errors
///
/// Returns `OperationError::Unsupported` for circles and closed shapes, and
/// `OperationError::Failed` when `point` is off the curve or at or before
/// the shape's start.
pub fn with_end_at(geometry: &Geometry, point: &Point2, tolerance: f64) -> Result<Geometry> {
    match geometry {
        Geometry::Line(l) => line_end_at(l, point, tolerance).map(Geometry::Line),
        Geometry::Arc(a) => arc_end_at(a, point, tolerance).map(Geometry::Arc),
        Geometry::Polyline(p) => polyline_end_at(p, point, tolerance).map(Geometry::Polyline),
        Geometry::Spline(s) => spline_split_at(s, point, tolerance, true).map(Geometry::Spline),
        Geometry::Ellipse(e) => ellipse_cut_at(e, point, tolerance, true).map(Geometry::Ellipse),
        Geometry::Circle(_) => {
            Err(OperationError::Unsupported("circles have no end to trim".into()).into())
        }
    }
}

/// Moves the start of `geometry` to `point`; the mirror of [`with_end_at`].
///
/// # Errors
///
/// Same as [`with_end_at`], with `point` required past the shape's end-side
/// of its start.
pub fn with_start_at(geometry: &Geometry, point: &Point2, tolerance: f64) -> Result<Geometry> {
    match geometry {
        Geometry::Line(l) => {
            line_end_at(&l.reversed(), point, tolerance).map(|r| Geometry::Line(r.reversed()))
        }
        Geometry::Arc(a) => {
            arc_end_at(&a.reversed(), point, tolerance).map(|r| Geometry::Arc(r.reversed()))
        }
        Geometry::Polyline(p) => polyline_start_at(p, point, tolerance).map(Geometry::Polyline),
        Geometry::Spline(s) => spline_split_at(s, point, tolerance, false).map(Geometry::Spline),
        Geometry::Ellipse(e) => ellipse_cut_at(e, point, tolerance, false).map(Geometry::Ellipse),
        Geometry::Circle(_) => {
            Err(OperationError::Unsupported("circles have no start to trim".into()).into())
        }
    }
}

fn line_end_at(line: &Line, point: &Point2, tolerance: f64) -> Result<Line> {
    if line.distance_to_carrier(point) > tolerance {
        return Err(unreachable_point("line end", point));
    }
    if line.project(point) <= END_PARAM_EPS {
        return Err(unreachable_point("line end", point));
    }
    Ok(Line::new(line.start, *point))
}

fn arc_end_at(arc: &Arc, point: &Point2, tolerance: f64) -> Result<Arc> {
    if arc.is_full_circle() {
        return Err(
            OperationError::Unsupported("full-circle arcs have no end to trim".into()).into(),
        );
    }
    if ((point - arc.center).norm() - arc.radius).abs() > tolerance {
        return Err(unreachable_point("arc end", point));
    }
    let t = extended_param(&Geometry::Arc(arc.clone()), point);
    let new_sweep = arc.signed_sweep() * t;
    if t <= END_PARAM_EPS || new_sweep.abs() >= std::f64::consts::TAU {
        return Err(unreachable_point("arc end", point));
    }
    Ok(Arc {
        end_angle: arc.start_angle + new_sweep,
        ..arc.clone()
    })
}

fn polyline_end_at(pline: &Polyline, point: &Point2, tolerance: f64) -> Result<Polyline> {
    if pline.closed {
        return Err(
            OperationError::Unsupported("closed polylines have no end to trim".into()).into(),
        );
    }
    let count = pline.segment_count();
    if count == 0 {
        return Err(GeometryError::Degenerate("polyline has no segments".into()).into());
    }
    let geometry = Geometry::Polyline(pline.clone());
    let t = extended_param(&geometry, point);
    let (index, local) = if t >= 1.0 {
        let last = count - 1;
        (last, extended_param(&pline.segment(last), point))
    } else {
        pline.locate(t)
    };
    if carrier_distance(&pline.segment(index), point) > tolerance {
        return Err(unreachable_point("polyline end", point));
    }
    if index == 0 && local <= END_PARAM_EPS {
        return Err(unreachable_point("polyline end", point));
    }
    Ok(pline.truncated_after(index, local, *point))
}

fn polyline_start_at(pline: &Polyline, point: &Point2, tolerance: f64) -> Result<Polyline> {
    if pline.closed {
        return Err(
            OperationError::Unsupported("closed polylines have no start to trim".into()).into(),
        );
    }
    let count = pline.segment_count();
    if count == 0 {
        return Err(GeometryError::Degenerate("polyline has no segments".into()).into());
    }
    let geometry = Geometry::Polyline(pline.clone());
    let t = extended_param(&geometry, point);
    let (index, local) = if t <= 0.0 {
        (0, extended_param(&pline.segment(0), point))
    } else {
        pline.locate(t)
    };
    if carrier_distance(&pline.segment(index), point) > tolerance {
        return Err(unreachable_point("polyline start", point));
    }
    if index == count - 1 && local >= 1.0 - END_PARAM_EPS {
        return Err(unreachable_point("polyline start", point));
    }
    Ok(pline.truncated_before(index, local, *point))
}

fn spline_split_at(
    spline: &Spline,
    point: &Point2,
    tolerance: f64,
    keep_head: bool,
) -> Result<Spline> {
    if spline.closed {
        return Err(OperationError::Unsupported("closed splines cannot be trimmed".into()).into());
    }
    let (t, distance) = spline.closest_param(point);
    if distance > tolerance {
        return Err(unreachable_point("spline end", point));
    }
    if (keep_head && t >= 1.0 - END_PARAM_EPS) || (!keep_head && t <= END_PARAM_EPS) {
        return Ok(spline.clone());
    }
    let (head, tail) = spline
        .split_at(t)
        .ok_or_else(|| unreachable_point("spline end", point))?;
    Ok(if keep_head { head } else { tail })
}

fn ellipse_cut_at(
    ellipse: &Ellipse,
    point: &Point2,
    tolerance: f64,
    keep_head: bool,
) -> Result<Ellipse> {
    if ellipse.is_full() {
        return Err(OperationError::Unsupported("full ellipses cannot be trimmed".into()).into());
    }
    let (t, distance) = Geometry::Ellipse(ellipse.clone()).closest_param(point);
    if distance > tolerance
        || (keep_head && t <= END_PARAM_EPS)
        || (!keep_head && t >= 1.0 - END_PARAM_EPS)
    {
        return Err(unreachable_point("ellipse end", point));
    }
    let signed_sweep = if ellipse.clockwise {
        -ellipse.sweep()
    } else {
        ellipse.sweep()
    };
    let angle = ellipse.start_param + signed_sweep * t;
    Ok(if keep_head {
        Ellipse {
            end_param: angle,
            ..ellipse.clone()
        }
    } else {
        Ellipse {
            start_param: angle,
            ..ellipse.clone()
        }
    })
}

/// Distance to a line segment's carrier, an arc's circle, or the curve itself.
fn carrier_distance(segment: &Geometry, p: &Point2) -> f64 {
    match segment {
        Geometry::Line(l) => l.distance_to_carrier(p),
        Geometry::Arc(a) => ((p - a.center).norm() - a.radius).abs(),
        other => other.distance_to(p),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::PolylineVertex;
    use crate::operations::intersect::{find_shape_intersections, IntersectionMode};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI, SQRT_2};

    fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Shape {
        Shape::new(Geometry::Line(Line::new(Point2::new(ax, ay), Point2::new(bx, by))))
    }

    #[test]
    fn overlapping_lines_trim_to_sharp_corner() {
        let a = line(0.0, 1.0, 11.0, 1.0);
        let b = line(9.0, -1.0, 9.0, 10.0);
        let hits = find_shape_intersections(&a, &b, 0.01, true, 50.0, IntersectionMode::Bounded);
        let r = trim_consecutive_shapes(&a, &b, &hits, 0.01);
        assert!(r.is_complete());
        assert_abs_diff_eq!(r.shape1_result.shape.end_point().x, 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.shape2_result.shape.start_point().y, 1.0, epsilon = 1e-9);
        let tp = r.trim_point(0, 1).unwrap();
        assert_abs_diff_eq!(tp.trim_amount1, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tp.trim_amount2, 2.0, epsilon = 1e-9);
        assert_eq!(tp.corner_type, CornerType::Sharp);
        assert_eq!(r.shape1_result.shape.id, a.id);
    }

    #[test]
    fn extension_corner_has_negative_amounts() {
        let a = line(0.0, -1.0, 10.0, -1.0);
        let b = line(11.0, 0.0, 11.0, 10.0);
        let hits = find_shape_intersections(&a, &b, 0.01, true, 50.0, IntersectionMode::Bounded);
        let r = trim_consecutive_shapes(&a, &b, &hits, 0.01);
        assert!(r.is_complete());
        assert_abs_diff_eq!(r.shape1_result.trim_amount, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.shape2_result.trim_amount, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn no_intersections_fails_both() {
        let (a, b) = (line(0.0, 0.0, 1.0, 0.0), line(2.0, 0.0, 3.0, 0.0));
        let r = trim_consecutive_shapes(&a, &b, &[], 0.01);
        assert!(!r.shape1_result.success);
        assert!(!r.shape2_result.success);
        assert!(r.trim_point(0, 1).is_none());
    }

    #[test]
    fn arc_end_moves_along_circle() {
        let arc = Arc::new(Point2::origin(), 2.0, 0.0, PI, false).unwrap();
        let g = with_end_at(&Geometry::Arc(arc.clone()), &Point2::new(0.0, 2.0), 1e-6).unwrap();
        assert_abs_diff_eq!(g.length(), PI, epsilon = 1e-9);
        // Lengthen past the original end.
        let beyond = Point2::new(-SQRT_2, -SQRT_2);
        let g = with_end_at(&Geometry::Arc(arc.clone()), &beyond, 1e-6).unwrap();
        assert_abs_diff_eq!(g.length(), 2.5 * PI, epsilon = 1e-9);
        let g = with_start_at(&Geometry::Arc(arc), &Point2::new(0.0, 2.0), 1e-6).unwrap();
        let Geometry::Arc(a) = g else {
            panic!("expected an arc");
        };
        assert_abs_diff_eq!(a.start_angle, FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(a.sweep(), FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn off_carrier_point_is_rejected() {
        let l = Geometry::Line(Line::new(Point2::origin(), Point2::new(10.0, 0.0)));
        assert!(with_end_at(&l, &Point2::new(5.0, 1.0), 0.01).is_err());
        assert!(with_end_at(&l, &Point2::new(-1.0, 0.0), 0.01).is_err());
        assert!(with_start_at(&l, &Point2::new(11.0, 0.0), 0.01).is_err());
    }

    #[test]
    fn polyline_trims_inner_segment() {
        let p = Polyline::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
            ],
            false,
        );
        let g = with_end_at(&Geometry::Polyline(p.clone()), &Point2::new(10.0, 4.0), 1e-6).unwrap();
        assert_abs_diff_eq!(g.length(), 14.0, epsilon = 1e-9);
        let g =
            with_end_at(&Geometry::Polyline(p.clone()), &Point2::new(10.0, 12.0), 1e-6).unwrap();
        assert_abs_diff_eq!(g.length(), 22.0, epsilon = 1e-9);
        let g = with_start_at(&Geometry::Polyline(p), &Point2::new(-3.0, 0.0), 1e-6).unwrap();
        assert_abs_diff_eq!(g.length(), 23.0, epsilon = 1e-9);
    }

    #[test]
    fn polyline_arc_segment_keeps_curvature() {
        let p = Polyline {
            vertices: vec![PolylineVertex::new(0.0, 0.0, 1.0), PolylineVertex::line(10.0, 0.0)],
            closed: false,
        };
        // Bottom of the semicircle (center (5, 0), radius 5).
        let g = with_end_at(&Geometry::Polyline(p), &Point2::new(5.0, -5.0), 1e-6).unwrap();
        assert_abs_diff_eq!(g.length(), 2.5 * PI, epsilon = 1e-9);
    }

    #[test]
    fn spline_split_trim() {
        let s = Spline::new(
            2,
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(5.0, 10.0),
                Point2::new(10.0, 0.0),
            ],
        );
        let mid = s.point_at(0.5);
        let g = with_end_at(&Geometry::Spline(s.clone()), &mid, 1e-4).unwrap();
        assert_abs_diff_eq!(g.end_point().x, 5.0, epsilon = 1e-4);
        let g = with_start_at(&Geometry::Spline(s), &mid, 1e-4).unwrap();
        assert_abs_diff_eq!(g.start_point().y, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn circles_cannot_be_trimmed() {
        let c = Geometry::Circle(crate::geometry::Circle::new(Point2::origin(), 1.0));
        assert!(with_end_at(&c, &Point2::new(1.0, 0.0), 0.01).is_err());
    }
}
