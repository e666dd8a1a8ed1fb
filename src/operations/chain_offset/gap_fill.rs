use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::trim::{with_end_at, with_start_at, ShapeTrimResult};
use crate::error::{OperationError, Result};
use crate::geometry::{Geometry, Shape};
use crate::math::{distance, midpoint, Point2};
use crate::operations::intersect::{find_shape_intersections, IntersectionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapFillMethod {
    /// One or both shapes were prolonged until they met.
    Extend,
    /// A tiny gap was closed by moving an endpoint.
    Snap,
}

/// Which shape of the pair may be extended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendDirection {
    #[default]
    Auto,
    First,
    Second,
}

/// Two consecutive shapes of an offset chain with a gap between the first
/// one's end and the second one's start.
#[derive(Debug, Clone, Copy)]
pub struct GapContext<'a> {
    pub shape1: &'a Shape,
    pub shape2: &'a Shape,
    pub shape1_index: usize,
    pub shape2_index: usize,
}

impl GapContext<'_> {
    #[must_use]
    pub fn gap_size(&self) -> f64 {
        distance(&self.shape1.end_point(), &self.shape2.start_point())
    }

    #[must_use]
    pub fn location(&self) -> Point2 {
        midpoint(&self.shape1.end_point(), &self.shape2.start_point())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapFillOptions {
    pub max_extension: f64,
    pub tolerance: f64,
    pub extend_direction: ExtendDirection,
}

/// A performed gap closure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapFillingResult {
    pub method: GapFillMethod,
    pub original_shape1: Shape,
    pub original_shape2: Shape,
    pub filled_shape1: Shape,
    pub filled_shape2: Shape,
    pub gap_size: f64,
    pub location: Point2,
    pub shape1_index: usize,
    pub shape2_index: usize,
}

/// Outcome of [`fill_gap_between_shapes`] and [`snap_gap`].
#[derive(Debug, Clone, PartialEq)]
pub struct GapFillOutcome {
    pub shape1_result: ShapeTrimResult,
    pub shape2_result: ShapeTrimResult,
    /// Present only when the gap was actually closed.
    pub filling: Option<GapFillingResult>,
}

impl GapFillOutcome {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.filling.is_some()
    }

    fn unresolved(ctx: &GapContext<'_>, reason: &str) -> Self {
        let failed = |shape: &Shape| ShapeTrimResult {
            success: false,
            shape: shape.clone(),
            trim_amount: 0.0,
            error: Some(reason.to_owned()),
        };
        Self {
            shape1_result: failed(ctx.shape1),
            shape2_result: failed(ctx.shape2),
            filling: None,
        }
    }

    fn filled(
        ctx: &GapContext<'_>,
        method: GapFillMethod,
        shape1: Geometry,
        shape2: Geometry,
    ) -> Self {
        let done = |original: &Shape, geometry: Geometry| {
            let trim_amount = original.length() - geometry.length();
            ShapeTrimResult {
                success: true,
                shape: Shape::with_id(original.id.clone(), geometry),
                trim_amount,
                error: None,
            }
        };
        let shape1_result = done(ctx.shape1, shape1);
        let shape2_result = done(ctx.shape2, shape2);
        let filling = GapFillingResult {
            method,
            original_shape1: ctx.shape1.clone(),
            original_shape2: ctx.shape2.clone(),
            filled_shape1: shape1_result.shape.clone(),
            filled_shape2: shape2_result.shape.clone(),
            gap_size: ctx.gap_size(),
            location: ctx.location(),
            shape1_index: ctx.shape1_index,
            shape2_index: ctx.shape2_index,
        };
        Self {
            shape1_result,
            shape2_result,
            filling: Some(filling),
        }
    }
}

/// Closes the gap between two consecutive shapes by extending them toward
/// each other.
///
/// Gaps wider than `max_extension` are left open. Otherwise the
/// intersection of the extended pair nearest to the gap is used as the new
/// joint; when the pair has none, a shape whose endpoint lies on the other
/// shape's extension is prolonged onto it. `extend_direction` restricts
/// which shape may move.
#[must_use]
pub fn fill_gap_between_shapes(ctx: &GapContext<'_>, options: &GapFillOptions) -> GapFillOutcome {
    let gap = ctx.gap_size();
    if gap > options.max_extension {
        debug!(
            shape1 = ctx.shape1_index,
            shape2 = ctx.shape2_index,
            gap,
            max_extension = options.max_extension,
            "gap exceeds extension limit"
        );
        return GapFillOutcome::unresolved(ctx, "gap exceeds the maximum extension");
    }

    if options.extend_direction == ExtendDirection::Auto {
        if let Some(outcome) = fill_by_intersection(ctx, options) {
            return outcome;
        }
    }

    let tolerance = options.tolerance;
    let end1 = ctx.shape1.end_point();
    let start2 = ctx.shape2.start_point();
    if options.extend_direction != ExtendDirection::Second {
        if let Ok(g1) = with_end_at(&ctx.shape1.geometry, &start2, tolerance) {
            trace!(shape = ctx.shape1_index, "extended first shape onto second");
            let g2 = ctx.shape2.geometry.clone();
            return GapFillOutcome::filled(ctx, GapFillMethod::Extend, g1, g2);
        }
    }
    if options.extend_direction != ExtendDirection::First {
        if let Ok(g2) = with_start_at(&ctx.shape2.geometry, &end1, tolerance) {
            trace!(shape = ctx.shape2_index, "extended second shape onto first");
            let g1 = ctx.shape1.geometry.clone();
            return GapFillOutcome::filled(ctx, GapFillMethod::Extend, g1, g2);
        }
    }
    GapFillOutcome::unresolved(ctx, "no extension closes the gap")
}

fn fill_by_intersection(ctx: &GapContext<'_>, options: &GapFillOptions) -> Option<GapFillOutcome> {
    let location = ctx.location();
    let hits = find_shape_intersections(
        ctx.shape1,
        ctx.shape2,
        options.tolerance,
        true,
        options.max_extension,
        IntersectionMode::Bounded,
    );
    let mut candidates: Vec<_> = hits
        .iter()
        .filter(|h| distance(&h.point, &location) <= options.max_extension)
        .collect();
    candidates.sort_by(|a, b| {
        distance(&a.point, &location).total_cmp(&distance(&b.point, &location))
    });

    for hit in candidates {
        let first = with_end_at(&ctx.shape1.geometry, &hit.point, options.tolerance);
        let second = with_start_at(&ctx.shape2.geometry, &hit.point, options.tolerance);
        if let (Ok(g1), Ok(g2)) = (first, second) {
            trace!(
                shape1 = ctx.shape1_index,
                shape2 = ctx.shape2_index,
                point = ?hit.point,
                "gap closed at intersection"
            );
            return Some(GapFillOutcome::filled(ctx, GapFillMethod::Extend, g1, g2));
        }
    }
    None
}

/// Makes a tiny gap vanish by moving the second shape's start onto the
/// first shape's end, or the first shape's end onto the second shape's
/// start when the second cannot be moved.
#[must_use]
pub fn snap_gap(ctx: &GapContext<'_>) -> GapFillOutcome {
    let end1 = ctx.shape1.end_point();
    let start2 = ctx.shape2.start_point();
    if let Ok(g2) = snap_start(&ctx.shape2.geometry, &end1) {
        return GapFillOutcome::filled(ctx, GapFillMethod::Snap, ctx.shape1.geometry.clone(), g2);
    }
    if let Ok(g1) = snap_end(&ctx.shape1.geometry, &start2) {
        return GapFillOutcome::filled(ctx, GapFillMethod::Snap, g1, ctx.shape2.geometry.clone());
    }
    GapFillOutcome::unresolved(ctx, "neither shape can be snapped")
}

/// Moves the start of `geometry` exactly onto `point` without re-fitting
/// the rest of the shape.
///
/// # Errors
///
/// Returns `OperationError::Unsupported` for closed shapes.
pub fn snap_start(geometry: &Geometry, point: &Point2) -> Result<Geometry> {
    let mut g = geometry.clone();
    match &mut g {
        Geometry::Line(l) => l.start = *point,
        Geometry::Arc(a) if !a.is_full_circle() => a.start_angle = a.angle_of(point),
        Geometry::Polyline(p) if !p.closed && !p.vertices.is_empty() => {
            p.vertices[0].x = point.x;
            p.vertices[0].y = point.y;
        }
        Geometry::Spline(s) if !s.closed && !s.control_points.is_empty() => {
            s.control_points[0] = *point;
            if let Some(f) = s.fit_points.first_mut() {
                *f = *point;
            }
        }
        Geometry::Ellipse(_) => return with_start_at(geometry, point, f64::INFINITY),
        _ => {
            return Err(OperationError::Unsupported(format!(
                "cannot snap the start of a closed {:?}",
                geometry.kind()
            ))
            .into())
        }
    }
    Ok(g)
}

/// Moves the end of `geometry` exactly onto `point`; the mirror of [`snap_start`].
///
/// # Errors
///
/// Returns `OperationError::Unsupported` for closed shapes.
pub fn snap_end(geometry: &Geometry, point: &Point2) -> Result<Geometry> {
    snap_start(&geometry.reversed(), point).map(|g| g.reversed())
}
