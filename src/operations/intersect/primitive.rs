//! Shapes broken down into line and circular pieces, and the pairwise
//! intersection of those pieces.

use crate::geometry::Geometry;
use crate::math::arc_2d::angle_to_arc_param;
use crate::math::intersect_2d::{
    circle_circle_intersect_2d, line_circle_intersect_2d, line_line_intersect_2d,
};
use crate::math::Point2;

use super::IntersectionMode;

/// Angular slack when checking whether a hit lies on an arc span.
const ANGLE_EPS: f64 = 1e-8;

/// Parametric slack on line windows.
const PARAM_EPS: f64 = 1e-9;

/// A line or circular piece of a shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    /// `start + t * (end - start)` for `t` within `[lo, hi]`.
    Line {
        start: Point2,
        end: Point2,
        lo: f64,
        hi: f64,
    },
    /// A circle restricted to `(start_angle, signed sweep)`, or the whole circle.
    Circular {
        center: Point2,
        radius: f64,
        span: Option<(f64, f64)>,
    },
}

/// A raw hit between two pieces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PieceHit {
    pub point: Point2,
    pub tangent: bool,
}

/// Breaks `geometry` into pieces. In infinite mode lines and the outer
/// segments of open polylines become unbounded, and arcs become full circles.
pub(crate) fn pieces(geometry: &Geometry, mode: IntersectionMode, tolerance: f64) -> Vec<Piece> {
    let infinite = mode == IntersectionMode::Infinite;
    match geometry {
        Geometry::Line(l) => vec![line_piece(l.start, l.end, infinite, infinite)],
        Geometry::Arc(a) => vec![Piece::Circular {
            center: a.center,
            radius: a.radius,
            span: (!infinite).then_some((a.start_angle, a.signed_sweep())),
        }],
        Geometry::Circle(c) => vec![Piece::Circular {
            center: c.center,
            radius: c.radius,
            span: None,
        }],
        Geometry::Polyline(p) => {
            let segments = p.segments();
            let last = segments.len().saturating_sub(1);
            segments
                .iter()
                .enumerate()
                .flat_map(|(i, seg)| {
                    let open_start = infinite && !p.closed && i == 0;
                    let open_end = infinite && !p.closed && i == last;
                    match seg {
                        Geometry::Line(l) => vec![line_piece(l.start, l.end, open_start, open_end)],
                        other => pieces(other, IntersectionMode::Bounded, tolerance),
                    }
                })
                .collect()
        }
        Geometry::Spline(_) | Geometry::Ellipse(_) => geometry
            .tessellate(tolerance)
            .windows(2)
            .map(|w| line_piece(w[0], w[1], false, false))
            .collect(),
    }
}

fn line_piece(start: Point2, end: Point2, open_start: bool, open_end: bool) -> Piece {
    Piece::Line {
        start,
        end,
        lo: if open_start { f64::NEG_INFINITY } else { 0.0 },
        hi: if open_end { f64::INFINITY } else { 1.0 },
    }
}

fn in_window(t: f64, lo: f64, hi: f64) -> bool {
    t >= lo - PARAM_EPS && t <= hi + PARAM_EPS
}

fn on_span(center: &Point2, span: Option<(f64, f64)>, p: &Point2) -> bool {
    span.is_none_or(|(start, sweep)| {
        let angle = (p.y - center.y).atan2(p.x - center.x);
        angle_to_arc_param(angle, start, sweep, ANGLE_EPS).is_some()
    })
}

/// All hits between two pieces. Parallel lines report nothing.
pub(crate) fn intersect_pieces(a: &Piece, b: &Piece) -> Vec<PieceHit> {
    match (a, b) {
        (
            Piece::Line {
                start: s1,
                end: e1,
                lo: lo1,
                hi: hi1,
            },
            Piece::Line {
                start: s2,
                end: e2,
                lo: lo2,
                hi: hi2,
            },
        ) => {
            let d1 = e1 - s1;
            let d2 = e2 - s2;
            line_line_intersect_2d(s1, &d1, s2, &d2)
                .filter(|(t, u)| in_window(*t, *lo1, *hi1) && in_window(*u, *lo2, *hi2))
                .map(|(t, _)| PieceHit {
                    point: s1 + d1 * t,
                    tangent: false,
                })
                .into_iter()
                .collect()
        }
        (
            Piece::Line { start, end, lo, hi },
            Piece::Circular {
                center,
                radius,
                span,
            },
        )
        | (
            Piece::Circular {
                center,
                radius,
                span,
            },
            Piece::Line { start, end, lo, hi },
        ) => line_circle_intersect_2d(start, end, center, *radius)
            .into_iter()
            .filter(|hit| in_window(hit.t, *lo, *hi) && on_span(center, *span, &hit.point))
            .map(|hit| PieceHit {
                point: hit.point,
                tangent: hit.tangent,
            })
            .collect(),
        (
            Piece::Circular {
                center: c1,
                radius: r1,
                span: span1,
            },
            Piece::Circular {
                center: c2,
                radius: r2,
                span: span2,
            },
        ) => circle_circle_intersect_2d(c1, *r1, c2, *r2)
            .into_iter()
            .filter(|hit| on_span(c1, *span1, &hit.point) && on_span(c2, *span2, &hit.point))
            .map(|hit| PieceHit {
                point: hit.point,
                tangent: hit.tangent,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Arc, Line};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn infinite_line_reaches_beyond_segment() {
        let a = Geometry::Line(Line::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)));
        let b = Geometry::Line(Line::new(Point2::new(5.0, -1.0), Point2::new(5.0, 1.0)));
        let bounded = intersect_pieces(
            &pieces(&a, IntersectionMode::Bounded, 0.01)[0],
            &pieces(&b, IntersectionMode::Bounded, 0.01)[0],
        );
        assert!(bounded.is_empty());
        let infinite = intersect_pieces(
            &pieces(&a, IntersectionMode::Infinite, 0.01)[0],
            &pieces(&b, IntersectionMode::Bounded, 0.01)[0],
        );
        assert_eq!(infinite.len(), 1);
        assert_abs_diff_eq!(infinite[0].point.x, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn arc_span_filters_hits() {
        let line = Geometry::Line(Line::new(Point2::new(-10.0, 0.0), Point2::new(10.0, 0.0)));
        let arc = Geometry::Arc(Arc {
            center: Point2::new(0.0, 1.0),
            radius: 2.0,
            start_angle: PI,
            end_angle: 2.0 * PI,
            clockwise: false,
        });
        let hits = intersect_pieces(
            &pieces(&line, IntersectionMode::Bounded, 0.01)[0],
            &pieces(&arc, IntersectionMode::Bounded, 0.01)[0],
        );
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.point.y.abs() < 1e-12));
    }
}
