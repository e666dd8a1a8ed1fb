//! Per-shape offset generators.
//!
//! Each geometry kind has one offset rule. `OUTSET` moves lines to the left
//! of their drawing direction, grows arc and circle radii, and pushes closed
//! outlines away from their interior; `INSET` does the opposite.

mod raw_offset;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeometryError, OperationError, Result};
use crate::geometry::{
    validate_spline_geometry, Arc, Chain, Circle, Ellipse, Geometry, Line, Polyline, Shape,
    Spline,
};
use crate::math::polygon_2d::{left_normal, signed_area_2d};
use crate::math::{Point2, Vector2, TOLERANCE};

/// Sampling tolerance for ellipse offsets, relative to the major radius.
const ELLIPSE_OFFSET_RELATIVE_TOLERANCE: f64 = 1e-4;

/// Offset direction relative to a shape's curvature or interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetDirection {
    Inset,
    Outset,
}

impl OffsetDirection {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Inset => Self::Outset,
            Self::Outset => Self::Inset,
        }
    }

    /// `+1` for outset, `-1` for inset.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Inset => -1.0,
            Self::Outset => 1.0,
        }
    }
}

/// Result of offsetting one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeOffsetResult {
    pub success: bool,
    pub shapes: Vec<Shape>,
    pub error: Option<String>,
}

/// An offset shape tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOffset {
    pub shape: Shape,
    /// Index of the source shape in the chain.
    pub source_index: usize,
    /// `+distance` for outset, `-distance` for inset.
    pub signed_offset: f64,
    pub direction: OffsetDirection,
}

/// Offsets a single shape by `distance` (≥ 0) in `direction`.
///
/// Never fails hard: an impossible offset comes back with `success = false`
/// and the reason in `error`.
#[must_use]
pub fn offset_shape(shape: &Shape, distance: f64, direction: OffsetDirection) -> ShapeOffsetResult {
    match offset_geometry(&shape.geometry, distance, direction) {
        Ok(geometry) => ShapeOffsetResult {
            success: true,
            shapes: vec![Shape::new(geometry)],
            error: None,
        },
        Err(e) => ShapeOffsetResult {
            success: false,
            shapes: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

/// Offsets a geometry by `distance` in `direction`.
///
/// # Errors
///
/// Returns `OperationError::InvalidInput` for a negative or non-finite
/// distance, and a geometry or operation error when the shape degenerates
/// (zero-length line, collapsing radius, inset past an ellipse's minor radius).
pub fn offset_geometry(
    geometry: &Geometry,
    distance: f64,
    direction: OffsetDirection,
) -> Result<Geometry> {
    if !distance.is_finite() || distance < 0.0 {
        return Err(OperationError::InvalidInput(format!(
            "offset distance must be finite and non-negative, got {distance}"
        ))
        .into());
    }
    if distance == 0.0 {
        return Ok(geometry.clone());
    }
    let signed = direction.sign() * distance;
    match geometry {
        Geometry::Line(line) => offset_line(line, signed).map(Geometry::Line),
        Geometry::Arc(arc) => {
            offset_radius(arc.radius, signed).map(|r| Geometry::Arc(arc.with_radius(r)))
        }
        Geometry::Circle(circle) => offset_radius(circle.radius, signed)
            .map(|r| Geometry::Circle(Circle::new(circle.center, r))),
        Geometry::Polyline(pline) => offset_polyline(pline, signed).map(Geometry::Polyline),
        Geometry::Spline(spline) => offset_spline(spline, signed).map(Geometry::Spline),
        Geometry::Ellipse(ellipse) => offset_ellipse(ellipse, signed).map(Geometry::Polyline),
    }
}

fn offset_line(line: &Line, signed: f64) -> Result<Line> {
    line.offset(signed)
}

fn offset_radius(radius: f64, signed: f64) -> Result<f64> {
    let r = radius + signed;
    if r <= TOLERANCE {
        return Err(GeometryError::Degenerate(format!(
            "offset radius {r} is not positive (radius {radius}, offset {signed})"
        ))
        .into());
    }
    Ok(r)
}

/// Converts an outward offset into a left-of-travel offset for a closed
/// outline with the given signed area.
fn outward_to_left(signed: f64, area: f64) -> f64 {
    // Counter-clockwise outlines have their interior on the left.
    if area > 0.0 {
        -signed
    } else {
        signed
    }
}

fn offset_polyline(pline: &Polyline, signed: f64) -> Result<Polyline> {
    let left = if pline.closed {
        outward_to_left(signed, pline.signed_area(1e-3))
    } else {
        signed
    };
    raw_offset::build(pline, left)
}

fn offset_spline(spline: &Spline, signed: f64) -> Result<Spline> {
    if spline.control_points.len() < 2 {
        return Err(
            GeometryError::Degenerate("spline has fewer than 2 control points".into()).into(),
        );
    }
    let left = if spline.closed {
        outward_to_left(signed, signed_area_2d(&spline.tessellate(1e-3)))
    } else {
        signed
    };

    let mut offset = spline.clone();
    for (i, p) in offset.control_points.iter_mut().enumerate() {
        let t = spline.normalized_param(spline.greville(i));
        let tangent = spline.tangent_at(t.clamp(0.0, 1.0));
        if tangent.norm() < TOLERANCE {
            continue;
        }
        *p += left_normal(tangent) * left;
    }
    offset.fit_points.clear();

    let validation = validate_spline_geometry(&offset);
    if validation.valid {
        return Ok(offset);
    }
    debug!(issues = ?validation.issues, "repairing offset spline");
    offset.repaired()
}

#[allow(clippy::cast_precision_loss)]
fn offset_ellipse(ellipse: &Ellipse, signed: f64) -> Result<Polyline> {
    let minor = ellipse.minor_radius();
    if minor <= TOLERANCE {
        return Err(GeometryError::Degenerate("ellipse has no minor radius".into()).into());
    }
    if signed <= -minor {
        return Err(GeometryError::Degenerate(format!(
            "inset {} reaches the minor radius {minor}",
            -signed
        ))
        .into());
    }

    let closed = ellipse.is_full();
    let tolerance = ellipse.major_radius() * ELLIPSE_OFFSET_RELATIVE_TOLERANCE;
    let mut samples = ellipse.tessellate(tolerance);
    if closed {
        samples.pop();
    }
    let n = samples.len();
    let points: Vec<Point2> = samples
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let t = if closed {
                i as f64 / n as f64
            } else {
                i as f64 / (n - 1).max(1) as f64
            };
            *p + outward_normal(ellipse, t) * signed
        })
        .collect();
    Ok(Polyline::from_points(&points, closed))
}

/// Unit normal pointing away from the ellipse center.
fn outward_normal(ellipse: &Ellipse, t: f64) -> Vector2 {
    let n = -left_normal(ellipse.tangent_at(t));
    if ellipse.clockwise {
        -n
    } else {
        n
    }
}

/// Offsets every shape of `chain` both ways at `distance`.
///
/// Clockwise arcs are offset with the direction flipped so that outset and
/// inset follow the arc's curvature. Outputs are tagged with their source
/// index and signed offset; shapes that cannot be offset are skipped.
#[must_use]
pub fn generate_raw_offsets(chain: &Chain, distance: f64) -> Vec<RawOffset> {
    let mut offsets = Vec::with_capacity(chain.shapes.len() * 2);
    for (index, shape) in chain.shapes.iter().enumerate() {
        for direction in [OffsetDirection::Outset, OffsetDirection::Inset] {
            let effective = match &shape.geometry {
                Geometry::Arc(Arc { clockwise: true, .. }) => direction.opposite(),
                _ => direction,
            };
            let result = offset_shape(shape, distance.abs(), effective);
            if !result.success {
                debug!(
                    shape = %shape.id,
                    index,
                    ?direction,
                    error = result.error.as_deref().unwrap_or_default(),
                    "dropping offset"
                );
                continue;
            }
            offsets.extend(result.shapes.into_iter().map(|shape| RawOffset {
                shape,
                source_index: index,
                signed_offset: direction.sign() * distance.abs(),
                direction,
            }));
        }
    }
    debug!(
        chain = %chain.id,
        shapes = chain.shapes.len(),
        offsets = offsets.len(),
        "generated raw offsets"
    );
    offsets
}
