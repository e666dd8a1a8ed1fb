//! Pairwise shape intersections with optional virtual extension.

mod extend;
mod primitive;
mod self_intersect;

pub use extend::{extend_shape, is_extendable};
pub use self_intersect::{find_polyline_self_intersections, PolylineSelfIntersection};

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::{Arc, ExtendEnd, Geometry, Line, Shape};
use crate::math::arc_2d::normalize_angle;
use crate::math::{points_equal, Point2};

use primitive::{intersect_pieces, pieces, PieceHit};

/// Confidence of a crossing hit.
const EXACT_CONFIDENCE: f64 = 1.0;

/// Confidence of a touching hit.
const TANGENT_CONFIDENCE: f64 = 0.5;

/// Whether hits are restricted to the shapes' nominal spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntersectionMode {
    /// Lines are segments and arcs keep their span.
    #[default]
    Bounded,
    /// Lines are unbounded and arcs are full circles.
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntersectionType {
    Exact,
    Tangent,
}

/// Where a shape sits within its chain; decides which line parameters
/// outside `[0, 1]` are acceptable in segment-aware queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentPosition {
    /// May extend before its start.
    First,
    /// May extend past its end.
    Last,
    Intermediate,
    /// Standalone; may extend both ways.
    Only,
}

impl SegmentPosition {
    fn window(self) -> (f64, f64) {
        match self {
            Self::First => (f64::NEG_INFINITY, 1.0),
            Self::Last => (0.0, f64::INFINITY),
            Self::Intermediate => (0.0, 1.0),
            Self::Only => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }
}

/// An intersection between two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionResult {
    pub point: Point2,
    /// Parameter on the first shape; outside `[0, 1]` on an extension.
    pub param1: f64,
    pub param2: f64,
    #[serde(rename = "type")]
    pub intersection_type: IntersectionType,
    pub confidence: f64,
    /// The point lies beyond the un-extended span of at least one shape.
    pub on_extension: bool,
}

/// Intersections between two shapes.
///
/// Without hits on the shapes as given, and with `allow_extensions`, the
/// first shape is extended by `max_extension`, then the second, then both;
/// everything found along that ladder is returned with `on_extension` set
/// for points off either original span.
#[must_use]
pub fn find_shape_intersections(
    shape1: &Shape,
    shape2: &Shape,
    tolerance: f64,
    allow_extensions: bool,
    max_extension: f64,
    mode: IntersectionMode,
) -> Vec<IntersectionResult> {
    find_geometry_intersections(
        &shape1.geometry,
        &shape2.geometry,
        tolerance,
        allow_extensions,
        max_extension,
        mode,
    )
}

/// [`find_shape_intersections`] on bare geometries.
#[must_use]
pub fn find_geometry_intersections(
    g1: &Geometry,
    g2: &Geometry,
    tolerance: f64,
    allow_extensions: bool,
    max_extension: f64,
    mode: IntersectionMode,
) -> Vec<IntersectionResult> {
    let direct = collect_hits(g1, g2, g1, g2, tolerance, max_extension, mode);
    if !direct.is_empty() || !allow_extensions || max_extension <= 0.0 {
        return direct;
    }

    let ext1 = extend_shape(g1, max_extension, ExtendEnd::Both);
    let ext2 = extend_shape(g2, max_extension, ExtendEnd::Both);
    let mut results = Vec::new();
    for (a, b) in [(&ext1, g2), (g1, &ext2), (&ext1, &ext2)] {
        let hits = collect_hits(g1, g2, a, b, tolerance, max_extension, mode);
        for hit in hits {
            push_unique(&mut results, hit, tolerance);
        }
    }
    trace!(hits = results.len(), "intersections via extension");
    results
}

/// Line/arc intersections, optionally extending both by `extension_length`.
#[must_use]
pub fn find_line_arc_intersections(
    line: &Line,
    arc: &Arc,
    allow_extensions: bool,
    extension_length: f64,
) -> Vec<IntersectionResult> {
    find_geometry_intersections(
        &Geometry::Line(line.clone()),
        &Geometry::Arc(arc.clone()),
        crate::math::TANGENT_TOLERANCE,
        allow_extensions,
        extension_length,
        IntersectionMode::Bounded,
    )
}

/// Line/arc intersections for a line that is one segment of a chain.
///
/// The acceptable line parameters depend on `position`; the arc span is
/// always enforced. Extension does not apply, so `on_extension` is false.
#[must_use]
pub fn find_line_arc_intersections_segment_aware(
    line: &Line,
    arc: &Arc,
    position: SegmentPosition,
    tolerance: f64,
) -> Vec<IntersectionResult> {
    let (lo, hi) = position.window();
    let line_piece = primitive::Piece::Line {
        start: line.start,
        end: line.end,
        lo,
        hi,
    };
    let arc_geometry = Geometry::Arc(arc.clone());
    let mut results = Vec::new();
    for piece in pieces(&arc_geometry, IntersectionMode::Bounded, tolerance) {
        for hit in intersect_pieces(&line_piece, &piece) {
            let mut result = to_result(
                &Geometry::Line(line.clone()),
                &arc_geometry,
                &hit,
                tolerance,
                f64::INFINITY,
            );
            result.on_extension = false;
            push_unique(&mut results, result, tolerance);
        }
    }
    results
}

fn collect_hits(
    original1: &Geometry,
    original2: &Geometry,
    g1: &Geometry,
    g2: &Geometry,
    tolerance: f64,
    max_extension: f64,
    mode: IntersectionMode,
) -> Vec<IntersectionResult> {
    let pieces1 = pieces(g1, mode, tolerance);
    let pieces2 = pieces(g2, mode, tolerance);
    let mut results = Vec::new();
    for a in &pieces1 {
        for b in &pieces2 {
            for hit in intersect_pieces(a, b) {
                let result = to_result(original1, original2, &hit, tolerance, max_extension);
                push_unique(&mut results, result, tolerance);
            }
        }
    }
    results
}

fn to_result(
    original1: &Geometry,
    original2: &Geometry,
    hit: &PieceHit,
    tolerance: f64,
    max_extension: f64,
) -> IntersectionResult {
    let gap1 = original1.distance_to(&hit.point);
    let gap2 = original2.distance_to(&hit.point);
    let reach = gap1.max(gap2);
    let on_extension = reach > tolerance;

    let base = if hit.tangent {
        TANGENT_CONFIDENCE
    } else {
        EXACT_CONFIDENCE
    };
    let confidence = if on_extension && max_extension.is_finite() && max_extension > 0.0 {
        base * (1.0 - reach / max_extension).clamp(0.0, 1.0)
    } else {
        base
    };

    IntersectionResult {
        point: hit.point,
        param1: extended_param(original1, &hit.point),
        param2: extended_param(original2, &hit.point),
        intersection_type: if hit.tangent {
            IntersectionType::Tangent
        } else {
            IntersectionType::Exact
        },
        confidence,
        on_extension,
    }
}

fn push_unique(
    results: &mut Vec<IntersectionResult>,
    candidate: IntersectionResult,
    tolerance: f64,
) {
    if let Some(existing) = results
        .iter_mut()
        .find(|r| points_equal(&r.point, &candidate.point, tolerance))
    {
        if candidate.confidence > existing.confidence {
            *existing = candidate;
        }
        return;
    }
    results.push(candidate);
}

/// Parameter of `p` on `geometry`, continued beyond `[0, 1]` along line and
/// arc extensions.
#[must_use]
pub fn extended_param(geometry: &Geometry, p: &Point2) -> f64 {
    match geometry {
        Geometry::Line(l) => l.project(p),
        Geometry::Arc(a) => {
            let sweep = a.sweep();
            let delta = if a.clockwise {
                normalize_angle(a.start_angle - a.angle_of(p))
            } else {
                normalize_angle(a.angle_of(p) - a.start_angle)
            };
            if delta <= sweep || delta - sweep < TAU - delta {
                delta / sweep
            } else {
                (delta - TAU) / sweep
            }
        }
        Geometry::Polyline(pl) if !pl.closed && pl.segment_count() > 0 => {
            let (t, _) = geometry.closest_param(p);
            let last = pl.segment_count() - 1;
            if t <= 0.0 {
                pl.global_param(0, extended_param(&pl.segment(0), p).min(0.0))
            } else if t >= 1.0 {
                pl.global_param(last, extended_param(&pl.segment(last), p).max(1.0))
            } else {
                t
            }
        }
        _ => geometry.closest_param(p).0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{Circle, Polyline};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Shape {
        Shape::new(Geometry::Line(Line::new(Point2::new(ax, ay), Point2::new(bx, by))))
    }

    #[test]
    fn crossing_lines() {
        let hits = find_shape_intersections(
            &line(0.0, 0.0, 10.0, 10.0),
            &line(0.0, 10.0, 10.0, 0.0),
            0.01,
            false,
            0.0,
            IntersectionMode::Bounded,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].intersection_type, IntersectionType::Exact);
        assert_abs_diff_eq!(hits[0].param1, 0.5, epsilon = 1e-12);
        assert!(!hits[0].on_extension);
        assert_abs_diff_eq!(hits[0].confidence, 1.0);
    }

    #[test]
    fn extension_ladder_reaches_gap() {
        let a = line(0.0, 0.0, 10.0, 0.0);
        let b = line(12.0, 1.0, 12.0, 10.0);
        let hits = find_shape_intersections(&a, &b, 0.01, false, 50.0, IntersectionMode::Bounded);
        assert!(hits.is_empty());
        let hits = find_shape_intersections(&a, &b, 0.01, true, 50.0, IntersectionMode::Bounded);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].on_extension);
        assert_abs_diff_eq!(hits[0].point.x, 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hits[0].param1, 1.2, epsilon = 1e-9);
        assert!(hits[0].param2 < 0.0);
        assert!(hits[0].confidence < 1.0);
    }

    #[test]
    fn infinite_mode_flags_extension() {
        let hits = find_shape_intersections(
            &line(0.0, 0.0, 10.0, 0.0),
            &line(12.0, 1.0, 12.0, 10.0),
            0.01,
            false,
            50.0,
            IntersectionMode::Infinite,
        );
        assert_eq!(hits.len(), 1);
        assert!(hits[0].on_extension);
    }

    #[test]
    fn line_arc_needs_extension() {
        let l = Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let arc = Arc::new(Point2::new(15.0, 5.0), 5.0, 0.0, PI, false).unwrap();
        assert!(find_line_arc_intersections(&l, &arc, false, 0.0).is_empty());
        let hits = find_line_arc_intersections(&l, &arc, true, 1000.0);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].on_extension);
        assert_eq!(hits[0].intersection_type, IntersectionType::Tangent);
        assert_abs_diff_eq!(hits[0].point.x, 15.0, epsilon = 1e-6);
    }

    #[test]
    fn tangent_line_and_circle() {
        let hits = find_shape_intersections(
            &line(-10.0, 5.0, 10.0, 5.0),
            &Shape::new(Geometry::Circle(Circle::new(Point2::origin(), 5.0))),
            0.01,
            false,
            0.0,
            IntersectionMode::Bounded,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].intersection_type, IntersectionType::Tangent);
        assert_abs_diff_eq!(hits[0].confidence, 0.5);
    }

    #[test]
    fn segment_positions_gate_line_params() {
        // The circle sits past the line's end.
        let l = Line::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let arc = Arc::new(Point2::new(20.0, 0.0), 5.0, PI / 2.0, 3.0 * PI / 2.0, false).unwrap();
        let count = |pos| find_line_arc_intersections_segment_aware(&l, &arc, pos, 1e-6).len();
        assert_eq!(count(SegmentPosition::Intermediate), 0);
        assert_eq!(count(SegmentPosition::First), 0);
        assert_eq!(count(SegmentPosition::Last), 1);
        assert_eq!(count(SegmentPosition::Only), 1);
        let hits = find_line_arc_intersections_segment_aware(&l, &arc, SegmentPosition::Last, 1e-6);
        assert!(!hits[0].on_extension);
        assert_abs_diff_eq!(hits[0].point.x, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn polyline_hits_are_deduplicated_at_vertices() {
        let pline = Shape::new(Geometry::Polyline(Polyline::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(5.0, 0.0),
                Point2::new(10.0, 0.0),
            ],
            false,
        )));
        let hits = find_shape_intersections(
            &pline,
            &line(5.0, -5.0, 5.0, 5.0),
            0.01,
            false,
            0.0,
            IntersectionMode::Bounded,
        );
        assert_eq!(hits.len(), 1);
        assert_abs_diff_eq!(hits[0].param1, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn arc_param_continues_past_ends() {
        let arc = Geometry::Arc(Arc::new(Point2::origin(), 1.0, 0.0, PI / 2.0, false).unwrap());
        let before = Point2::new((-0.1_f64).cos(), (-0.1_f64).sin());
        assert!(extended_param(&arc, &before) < 0.0);
        let after = Point2::new(-0.1, 1.0);
        assert!(extended_param(&arc, &after) > 1.0);
    }
}
