use std::f64::consts::{PI, TAU};

use crate::error::{OperationError, Result};
use crate::geometry::{Polyline, PolylineVertex};
use crate::math::arc_2d::{
    arc_from_bulge, arc_tangent_at, bulge_from_sweep, normalize_angle, offset_arc_segment,
};
use crate::math::intersect_2d::{
    circle_circle_intersect_2d, line_circle_intersect_2d, line_line_intersect_2d,
};
use crate::math::polygon_2d::{left_normal, segment_direction};
use crate::math::{distance as point_distance, midpoint, Point2, Vector2};

/// Maximum miter distance as a multiple of `|distance|`.
const MITER_LIMIT: f64 = 4.0;

/// Threshold for flat cap: `cos(angle) < this` → near-180° reversal.
const FLAT_CAP_COS: f64 = -0.98;

/// Endpoints closer than this already meet.
const JOIN_EPS: f64 = 1e-9;

/// Circle carrying an offset arc segment, with the untrimmed angular span.
#[derive(Clone, Copy)]
struct OffsetArc {
    center: Point2,
    radius: f64,
    start_angle: f64,
    sweep: f64,
}

/// An offset segment with endpoints and tangent directions.
struct OffsetSeg {
    start: Point2,
    end: Point2,
    start_dir: Vector2,
    end_dir: Vector2,
    arc: Option<OffsetArc>,
}

impl OffsetSeg {
    /// Signed sweep of the arc once its ends sit at `start`/`end`. Angles
    /// move by less than half a turn from the untrimmed ends.
    fn sweep_with(arc: &OffsetArc, start: &Point2, end: &Point2) -> f64 {
        let angle = |p: &Point2| (p.y - arc.center.y).atan2(p.x - arc.center.x);
        let wrap = |a: f64| normalize_angle(a + PI) - PI;
        let d_start = wrap(angle(start) - arc.start_angle);
        let d_end = wrap(angle(end) - (arc.start_angle + arc.sweep));
        arc.sweep - d_start + d_end
    }

    fn bulge(&self) -> f64 {
        self.arc
            .map_or(0.0, |arc| bulge_from_sweep(Self::sweep_with(&arc, &self.start, &self.end)))
    }

    /// Whether moving the ends to `start`/`end` keeps the segment running
    /// the same way.
    fn accepts(&self, start: &Point2, end: &Point2) -> bool {
        match &self.arc {
            Some(arc) => {
                let sweep = Self::sweep_with(arc, start, end);
                sweep * arc.sweep > 0.0 && sweep.abs() < TAU
            }
            None => (end - start).dot(&self.start_dir) > JOIN_EPS,
        }
    }
}

enum Join {
    /// Both segments end at this point.
    Meet(Point2),
    /// Segments keep their ends and a straight segment bridges the gap.
    Bridge,
}

/// Builds the untrimmed offset of `pline` at `distance` to the left of its
/// travel direction, offsetting every segment and re-joining neighbours
/// at corners.
///
/// Offset arcs stay concentric with their source arcs: a corner only moves
/// an arc end along its own circle.
///
/// # Errors
///
/// Returns `OperationError::InvalidInput` for zero-length segments or
/// `OperationError::Failed` when there is nothing to offset or an arc
/// segment collapses.
pub fn build(pline: &Polyline, distance: f64) -> Result<Polyline> {
    let n = pline.vertices.len();
    let seg_count = pline.segment_count();
    if seg_count == 0 {
        return Err(OperationError::Failed("no segments to offset".to_owned()).into());
    }

    let mut segs: Vec<OffsetSeg> = Vec::with_capacity(seg_count);
    for i in 0..seg_count {
        let v0 = &pline.vertices[i];
        let v1 = &pline.vertices[(i + 1) % n];
        let (p0, p1) = (v0.point(), v1.point());

        if v0.bulge.abs() < 1e-12 {
            let dir = segment_direction(&p0, &p1)?;
            let shift = left_normal(dir) * distance;
            segs.push(OffsetSeg {
                start: p0 + shift,
                end: p1 + shift,
                start_dir: dir,
                end_dir: dir,
                arc: None,
            });
        } else {
            let (start, end, bulge) = offset_arc_segment(&p0, &p1, v0.bulge, distance)
                .ok_or_else(|| {
                    OperationError::Failed("arc segment collapsed during offset".to_owned())
                })?;
            let arc = arc_from_bulge(&start, &end, bulge);
            segs.push(OffsetSeg {
                start,
                end,
                start_dir: arc_tangent_at(arc.start_angle, arc.sweep, 0.0),
                end_dir: arc_tangent_at(arc.start_angle, arc.sweep, 1.0),
                arc: Some(OffsetArc {
                    center: arc.center,
                    radius: arc.radius,
                    start_angle: arc.start_angle,
                    sweep: arc.sweep,
                }),
            });
        }
    }

    // joins[i] joins segment i - 1 (wrapping when closed) to segment i.
    let first_corner = usize::from(!pline.closed);
    let mut joins: Vec<Join> = (0..seg_count).map(|_| Join::Bridge).collect();
    for (i, join) in joins.iter_mut().enumerate().skip(first_corner) {
        let prev = if i == 0 { seg_count - 1 } else { i - 1 };
        *join = corner_join(&segs[prev], &segs[i], &pline.vertices[i].point(), distance);
        if let Join::Meet(p) = join {
            segs[prev].end = *p;
            segs[i].start = *p;
        }
    }

    let mut verts = Vec::with_capacity(seg_count * 2 + 1);
    for (i, join) in joins.iter().enumerate() {
        let seg = &segs[i];
        if i >= first_corner && matches!(join, Join::Bridge) {
            let prev = if i == 0 { seg_count - 1 } else { i - 1 };
            verts.push(PolylineVertex::line(segs[prev].end.x, segs[prev].end.y));
        }
        verts.push(PolylineVertex::new(seg.start.x, seg.start.y, seg.bulge()));
    }
    if !pline.closed {
        let last = &segs[seg_count - 1];
        verts.push(PolylineVertex::line(last.end.x, last.end.y));
    }

    Ok(Polyline {
        vertices: verts,
        closed: pline.closed,
    })
}

/// Chooses how two offset segments meet at a source corner.
///
/// Near reversals get a flat cap. Otherwise the carriers (offset lines or
/// circles) are intersected and the hit nearest the corner is used, unless
/// it lies beyond the miter limit or would turn a segment around.
fn corner_join(prev: &OffsetSeg, next: &OffsetSeg, corner: &Point2, distance: f64) -> Join {
    if prev.end_dir.dot(&next.start_dir) < FLAT_CAP_COS {
        return Join::Bridge;
    }
    if point_distance(&prev.end, &next.start) < JOIN_EPS {
        return Join::Meet(midpoint(&prev.end, &next.start));
    }

    let target = midpoint(&prev.end, &next.start);
    let Some(meet) = carrier_hits(prev, next).into_iter().min_by(|a, b| {
        point_distance(a, &target).total_cmp(&point_distance(b, &target))
    }) else {
        return Join::Bridge;
    };

    let limit = MITER_LIMIT * distance.abs();
    if point_distance(&meet, corner) > limit
        || !prev.accepts(&prev.start, &meet)
        || !next.accepts(&meet, &next.end)
    {
        return Join::Bridge;
    }
    Join::Meet(meet)
}

fn carrier_hits(prev: &OffsetSeg, next: &OffsetSeg) -> Vec<Point2> {
    let line_circle = |line: &OffsetSeg, arc: &OffsetArc| -> Vec<Point2> {
        line_circle_intersect_2d(&line.start, &line.end, &arc.center, arc.radius)
            .into_iter()
            .map(|hit| hit.point)
            .collect()
    };
    match (&prev.arc, &next.arc) {
        (None, None) => {
            line_line_intersect_2d(&prev.end, &prev.end_dir, &next.start, &next.start_dir)
                .map(|(t, _)| prev.end + prev.end_dir * t)
                .into_iter()
                .collect()
        }
        (None, Some(arc)) => line_circle(prev, arc),
        (Some(arc), None) => line_circle(next, arc),
        (Some(a), Some(b)) => circle_circle_intersect_2d(&a.center, a.radius, &b.center, b.radius)
            .into_iter()
            .map(|hit| hit.point)
            .collect(),
    }
}
