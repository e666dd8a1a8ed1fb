use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geometry::{Geometry, Polyline};
use crate::math::intersect_2d::{
    arc_arc_intersect_2d, line_arc_intersect_2d, segment_segment_intersect_2d,
};
use crate::math::{Point2, TOLERANCE};

/// A crossing between two non-adjacent segments of one polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineSelfIntersection {
    pub segment1: usize,
    /// Always greater than `segment1`.
    pub segment2: usize,
    pub t1: f64,
    pub t2: f64,
    pub point: Point2,
}

/// Finds all crossings between non-adjacent segments of `pline`.
///
/// Vertex touches (either parameter at a segment end) are not reported.
/// Results are ordered by first segment, then by parameter on it.
#[must_use]
pub fn find_polyline_self_intersections(pline: &Polyline) -> Vec<PolylineSelfIntersection> {
    let seg_count = pline.segment_count();
    if seg_count < 3 {
        return Vec::new();
    }

    let segments = pline.segments();
    let eps = TOLERANCE * 100.0;
    let mut results = Vec::new();

    for i in 0..seg_count {
        for j in (i + 2)..seg_count {
            if pline.closed && i == 0 && j == seg_count - 1 {
                continue;
            }
            for (point, t, u) in segment_hits(&segments[i], &segments[j]) {
                let t_at_end = t < eps || t > 1.0 - eps;
                let u_at_end = u < eps || u > 1.0 - eps;
                if t_at_end || u_at_end {
                    continue;
                }
                results.push(PolylineSelfIntersection {
                    segment1: i,
                    segment2: j,
                    t1: t,
                    t2: u,
                    point,
                });
            }
        }
    }

    results.sort_by(|a, b| {
        a.segment1
            .cmp(&b.segment1)
            .then(a.t1.partial_cmp(&b.t1).unwrap_or(Ordering::Equal))
    });
    results
}

/// Bounded hits between two polyline segments as `(point, t_first, t_second)`.
fn segment_hits(first: &Geometry, second: &Geometry) -> Vec<(Point2, f64, f64)> {
    match (first, second) {
        (Geometry::Line(a), Geometry::Line(b)) => {
            segment_segment_intersect_2d(&a.start, &a.end, &b.start, &b.end)
                .into_iter()
                .collect()
        }
        (Geometry::Line(l), Geometry::Arc(arc)) => line_arc_intersect_2d(
            &l.start,
            &l.end,
            &arc.center,
            arc.radius,
            arc.start_angle,
            arc.signed_sweep(),
        ),
        (Geometry::Arc(arc), Geometry::Line(l)) => line_arc_intersect_2d(
            &l.start,
            &l.end,
            &arc.center,
            arc.radius,
            arc.start_angle,
            arc.signed_sweep(),
        )
        .into_iter()
        .map(|(pt, t_line, t_arc)| (pt, t_arc, t_line))
        .collect(),
        (Geometry::Arc(a), Geometry::Arc(b)) => arc_arc_intersect_2d(
            &a.center,
            a.radius,
            a.start_angle,
            a.signed_sweep(),
            &b.center,
            b.radius,
            b.start_angle,
            b.signed_sweep(),
        ),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PolylineVertex;
    use approx::assert_abs_diff_eq;

    #[test]
    fn figure_eight_crosses_once() {
        let pline = Polyline::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(10.0, 0.0),
                Point2::new(0.0, 10.0),
            ],
            false,
        );
        let hits = find_polyline_self_intersections(&pline);
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].segment1, hits[0].segment2), (0, 2));
        assert_abs_diff_eq!(hits[0].point.x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].point.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn square_has_none() {
        let pline = Polyline::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            true,
        );
        assert!(find_polyline_self_intersections(&pline).is_empty());
    }

    #[test]
    fn arc_crossing_line() {
        // A semicircle bulging below y = 0, then back across it.
        let pline = Polyline {
            vertices: vec![
                PolylineVertex::new(0.0, 0.0, 1.0),
                PolylineVertex::line(10.0, 0.0),
                PolylineVertex::line(10.0, 5.0),
                PolylineVertex::line(5.0, -10.0),
            ],
            closed: false,
        };
        let hits = find_polyline_self_intersections(&pline);
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].segment1, hits[0].segment2), (0, 2));
        assert!(hits[0].point.y < 0.0);
    }
}
