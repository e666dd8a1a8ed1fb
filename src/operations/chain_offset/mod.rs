//! Chain offsetting: side grouping, corner trimming and gap closing on top
//! of per-shape offsets.

mod connectivity;
mod gap_fill;
mod side;
mod trim;
mod types;

pub use connectivity::{validate_connectivity, ConnectivityGap, ConnectivityReport};
pub use gap_fill::{
    fill_gap_between_shapes, snap_end, snap_gap, snap_start, ExtendDirection, GapContext,
    GapFillMethod, GapFillOptions, GapFillOutcome, GapFillingResult,
};
pub use side::{
    detect_chain_side, group_offsets_by_side, SideDetection, SideGroup, SideMethod,
    SIDE_CONFIDENCE_MARGIN,
};
pub use trim::{
    trim_consecutive_shapes, with_end_at, with_start_at, CornerType, ShapeTrimResult,
    TrimPairResult, TrimPoint,
};
pub use types::{
    ChainOffsetMetrics, ChainOffsetParameters, ChainOffsetResult, ChainSide, OffsetChain,
    DEFAULT_MAX_EXTENSION, DEFAULT_SNAP_THRESHOLD, DEFAULT_TOLERANCE,
};

use std::time::Instant;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{OperationError, Result};
use crate::geometry::{Chain, Geometry, Shape};
use crate::math::{distance, midpoint, TOLERANCE};
use crate::operations::intersect::{
    find_polyline_self_intersections, find_shape_intersections, IntersectionResult,
    IntersectionType,
};
use crate::operations::offset::generate_raw_offsets;

/// Offsets `chain` by `distance` on both sides.
///
/// Every shape is offset both ways, the offsets are grouped by side, and
/// each side is post-processed: consecutive shapes are trimmed to their
/// intersection, remaining small gaps are snapped and larger ones are
/// closed by extension. A side whose post-processing fails falls back to
/// its raw offsets with `continuous = false`.
///
/// Only invalid parameters, an empty chain, or a chain where no shape can
/// be offset produce `success = false`.
#[must_use]
pub fn offset_chain(
    chain: &Chain,
    distance: f64,
    params: &ChainOffsetParameters,
) -> ChainOffsetResult {
    let started = Instant::now();
    let mut result = match run(chain, distance, params) {
        Ok(result) => result,
        Err(e) => {
            warn!(chain = %chain.id, error = %e, "chain offset failed");
            ChainOffsetResult::failure(e.to_string())
        }
    };
    result.metrics.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
    result
}

fn run(chain: &Chain, distance: f64, params: &ChainOffsetParameters) -> Result<ChainOffsetResult> {
    params.validate()?;
    if !distance.is_finite() || distance <= 0.0 {
        return Err(OperationError::InvalidInput(format!(
            "offset distance must be positive and finite, got {distance}"
        ))
        .into());
    }
    if chain.shapes.is_empty() {
        return Err(
            OperationError::InvalidInput(format!("chain {} has no shapes", chain.id)).into(),
        );
    }

    let offsets = generate_raw_offsets(chain, distance);
    if offsets.is_empty() {
        return Err(OperationError::Failed(format!(
            "no shape of chain {} could be offset by {distance}",
            chain.id
        ))
        .into());
    }

    let closed = chain.is_closed(params.tolerance);
    let groups = group_offsets_by_side(&offsets, chain, params.tolerance, closed);
    debug!(
        chain = %chain.id,
        closed,
        first = groups[0].offsets.len(),
        second = groups[1].offsets.len(),
        "grouped offsets"
    );

    let mut result = ChainOffsetResult {
        success: true,
        ..ChainOffsetResult::default()
    };
    let mut processed = Vec::with_capacity(2);
    for group in groups {
        if group.offsets.is_empty() {
            result
                .warnings
                .push(format!("no {} offset could be generated", group.side));
            continue;
        }
        let side = group.side;
        let raw: Vec<Shape> = group.offsets.into_iter().map(|o| o.shape).collect();
        let processed_side =
            process_side(chain, side, raw.clone(), closed, params, &mut result.warnings);
        let offset = match processed_side {
            Ok(offset) => offset,
            Err(e) => {
                warn!(
                    chain = %chain.id,
                    %side,
                    error = %e,
                    "side processing failed, keeping raw offsets"
                );
                result
                    .warnings
                    .push(format!("{side} offset left unprocessed: {e}"));
                OffsetChain {
                    id: Uuid::new_v4().to_string(),
                    original_chain_id: chain.id.clone(),
                    side,
                    shapes: raw,
                    closed,
                    continuous: false,
                    gap_fills: Vec::new(),
                    trim_points: Vec::new(),
                    intersection_points: Vec::new(),
                }
            }
        };
        processed.push(offset);
    }

    for offset in processed {
        result.metrics.shape_count += offset.shapes.len();
        result.metrics.intersections_found += offset.intersection_points.len();
        result.metrics.gaps_filled += offset.gap_fills.len();
        match offset.side {
            ChainSide::Inner | ChainSide::Left => result.inner_chain = Some(offset),
            ChainSide::Outer | ChainSide::Right => result.outer_chain = Some(offset),
        }
    }
    Ok(result)
}

/// Trims, snaps and gap-fills one side's offsets in chain order.
fn process_side(
    chain: &Chain,
    side: ChainSide,
    mut shapes: Vec<Shape>,
    closed: bool,
    params: &ChainOffsetParameters,
    warnings: &mut Vec<String>,
) -> Result<OffsetChain> {
    let n = shapes.len();
    let pair_count = if closed && n > 1 { n } else { n.saturating_sub(1) };

    let mut intersection_points = Vec::new();
    let mut trim_points = Vec::new();
    let mut gap_fills = Vec::new();
    let mut trim_failed = false;

    for i in 0..pair_count {
        let j = (i + 1) % n;
        let joint_gap = distance(&shapes[i].end_point(), &shapes[j].start_point());

        if joint_gap > params.tolerance {
            let joint = midpoint(&shapes[i].end_point(), &shapes[j].start_point());
            let hits: Vec<IntersectionResult> = find_shape_intersections(
                &shapes[i],
                &shapes[j],
                params.tolerance,
                true,
                params.max_extension,
                params.intersection_type,
            )
            .into_iter()
            .filter(|h| distance(&h.point, &joint) <= params.max_extension)
            .collect();

            if !hits.is_empty() {
                let trimmed =
                    trim_consecutive_shapes(&shapes[i], &shapes[j], &hits, params.tolerance);
                if let Some(trim_point) = trimmed.trim_point(i, j) {
                    shapes[i] = trimmed.shape1_result.shape;
                    shapes[j] = trimmed.shape2_result.shape;
                    trim_points.push(trim_point);
                } else {
                    trim_failed = true;
                    let reason = trimmed
                        .shape1_result
                        .error
                        .or(trimmed.shape2_result.error)
                        .unwrap_or_default();
                    debug!(%side, i, j, %reason, "trim failed");
                    warnings.push(format!(
                        "{side} offset: could not trim shapes {i} and {j}: {reason}"
                    ));
                }
                intersection_points.extend(hits);
            }
        }

        let ctx = GapContext {
            shape1: &shapes[i],
            shape2: &shapes[j],
            shape1_index: i,
            shape2_index: j,
        };
        let remaining = ctx.gap_size();
        let outcome = if remaining <= TOLERANCE {
            None
        } else if remaining <= params.snap_threshold {
            Some(snap_gap(&ctx))
        } else if remaining > params.tolerance {
            Some(fill_gap_between_shapes(
                &ctx,
                &GapFillOptions {
                    max_extension: params.max_extension,
                    tolerance: params.tolerance,
                    extend_direction: ExtendDirection::Auto,
                },
            ))
        } else {
            None
        };
        if let Some(GapFillOutcome {
            shape1_result,
            shape2_result,
            filling: Some(filling),
        }) = outcome
        {
            debug!(%side, i, j, method = ?filling.method, gap = filling.gap_size, "closed gap");
            shapes[i] = shape1_result.shape;
            shapes[j] = shape2_result.shape;
            gap_fills.push(filling);
        }
    }

    if params.polyline_intersections {
        for shape in &shapes {
            if let Geometry::Polyline(pline) = &shape.geometry {
                intersection_points.extend(find_polyline_self_intersections(pline).into_iter().map(
                    |x| IntersectionResult {
                        point: x.point,
                        param1: pline.global_param(x.segment1, x.t1),
                        param2: pline.global_param(x.segment2, x.t2),
                        intersection_type: IntersectionType::Exact,
                        confidence: 1.0,
                        on_extension: false,
                    },
                ));
            }
        }
    }

    for shape in &shapes {
        let (start, end) = (shape.start_point(), shape.end_point());
        if !(start.x.is_finite() && start.y.is_finite() && end.x.is_finite() && end.y.is_finite()) {
            return Err(OperationError::Failed(format!(
                "shape {} degenerated while processing",
                shape.id
            ))
            .into());
        }
    }

    let report = validate_connectivity(&shapes, closed, params.tolerance);
    for gap in &report.gaps {
        warnings.push(format!(
            "{side} offset: gap of {:.4} after shape {}",
            gap.distance, gap.after_index
        ));
    }
    let continuous = report.is_connected && !trim_failed;
    debug!(
        %side,
        shapes = shapes.len(),
        trims = trim_points.len(),
        fills = gap_fills.len(),
        continuous,
        "processed side"
    );

    Ok(OffsetChain {
        id: Uuid::new_v4().to_string(),
        original_chain_id: chain.id.clone(),
        side,
        shapes,
        closed,
        continuous,
        gap_fills,
        trim_points,
        intersection_points,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{Arc, Circle, Line};
    use crate::math::Point2;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Shape {
        Shape::new(Geometry::Line(Line::new(Point2::new(ax, ay), Point2::new(bx, by))))
    }

    fn square() -> Chain {
        Chain::new(vec![
            line(0.0, 0.0, 10.0, 0.0),
            line(10.0, 0.0, 10.0, 10.0),
            line(10.0, 10.0, 0.0, 10.0),
            line(0.0, 10.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn square_gets_sharp_inner_and_outer_corners() {
        let result = offset_chain(&square(), 1.0, &ChainOffsetParameters::default());
        assert!(result.success, "{:?}", result.errors);
        let inner = result.inner_chain.as_ref().unwrap();
        let outer = result.outer_chain.as_ref().unwrap();
        assert_eq!(inner.side, ChainSide::Inner);
        assert!(inner.closed && inner.continuous);
        assert!(outer.continuous);
        assert_eq!(inner.shapes.len(), 4);
        assert_abs_diff_eq!(inner.shapes[0].start_point().x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(inner.shapes[0].start_point().y, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(outer.shapes[0].end_point().x, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(outer.shapes[0].end_point().y, -1.0, epsilon = 1e-9);
        let inner_len: f64 = inner.shapes.iter().map(Shape::length).sum();
        assert_abs_diff_eq!(inner_len, 32.0, epsilon = 1e-9);
        assert_eq!(inner.trim_points.len(), 4);
        assert_eq!(result.metrics.shape_count, 8);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn circle_offsets_need_no_trimming() {
        let circle = Circle::new(Point2::origin(), 5.0);
        let chain = Chain::new(vec![Shape::new(Geometry::Circle(circle))]);
        let result = offset_chain(&chain, 1.0, &ChainOffsetParameters::default());
        let inner = result.inner_chain.unwrap();
        let Geometry::Circle(c) = &inner.shapes[0].geometry else {
            panic!("expected a circle");
        };
        assert_abs_diff_eq!(c.radius, 4.0);
        assert!(inner.continuous);
        let Geometry::Circle(c) = &result.outer_chain.unwrap().shapes[0].geometry else {
            panic!("expected a circle");
        };
        assert_abs_diff_eq!(c.radius, 6.0);
    }

    #[test]
    fn tangent_line_arc_joint_stays_smooth() {
        // Slot half: line then a CCW half circle back.
        let chain = Chain::new(vec![
            line(0.0, 0.0, 10.0, 0.0),
            Shape::new(Geometry::Arc(
                Arc::new(Point2::new(10.0, 5.0), 5.0, -FRAC_PI_2, FRAC_PI_2, false).unwrap(),
            )),
        ]);
        let result = offset_chain(&chain, 1.0, &ChainOffsetParameters::default());
        assert!(result.success);
        let left = result.left_chain().unwrap();
        assert!(left.continuous);
        assert!(left.trim_points.is_empty());
        assert!(left.gap_fills.is_empty());
    }

    #[test]
    fn invalid_inputs_fail() {
        let p = ChainOffsetParameters::default();
        assert!(!offset_chain(&square(), 0.0, &p).success);
        assert!(!offset_chain(&square(), f64::NAN, &p).success);
        assert!(!offset_chain(&Chain::new(Vec::new()), 1.0, &p).success);
        let bad = ChainOffsetParameters {
            tolerance: -1.0,
            ..p
        };
        let r = offset_chain(&square(), 1.0, &bad);
        assert!(!r.success);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn unoffsettable_chain_fails() {
        let chain = Chain::new(vec![line(1.0, 1.0, 1.0, 1.0)]);
        let r = offset_chain(&chain, 1.0, &ChainOffsetParameters::default());
        assert!(!r.success);
        assert!(r.inner_chain.is_none() && r.outer_chain.is_none());
    }

    #[test]
    fn wide_gap_marks_side_discontinuous() {
        let chain = Chain::new(vec![line(0.0, 0.0, 10.0, 0.0), line(100.0, 0.0, 110.0, 5.0)]);
        let params = ChainOffsetParameters {
            max_extension: 5.0,
            ..ChainOffsetParameters::default()
        };
        let r = offset_chain(&chain, 1.0, &params);
        assert!(r.success);
        let left = r.left_chain().unwrap();
        assert!(!left.continuous);
        assert!(!r.warnings.is_empty());
    }

    #[test]
    fn collinear_gap_is_closed_by_extension() {
        let chain = Chain::new(vec![line(0.0, 0.0, 10.0, 0.0), line(12.0, 0.0, 20.0, 0.0)]);
        let r = offset_chain(&chain, 1.0, &ChainOffsetParameters::default());
        assert!(r.success, "{:?}", r.errors);
        let left = r.left_chain().unwrap();
        assert!(left.continuous);
        assert_eq!(left.gap_fills.len(), 1);
        assert_eq!(left.gap_fills[0].method, GapFillMethod::Extend);
        assert_eq!(left.gap_fills[0].filled_shape1.id, left.gap_fills[0].original_shape1.id);
        assert_abs_diff_eq!(left.gap_fills[0].gap_size, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(left.shapes[0].end_point().x, 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(left.shapes[0].end_point().y, 1.0, epsilon = 1e-9);
        assert_eq!(r.metrics.gaps_filled, 2);
    }

    #[test]
    fn gap_within_snap_threshold_is_snapped() {
        let chain = Chain::new(vec![line(0.0, 0.0, 10.0, 0.0), line(10.05, 0.0, 20.0, 0.0)]);
        let r = offset_chain(&chain, 1.0, &ChainOffsetParameters::default());
        let left = r.left_chain().unwrap();
        assert!(left.continuous);
        assert!(left.trim_points.is_empty());
        assert_eq!(left.gap_fills.len(), 1);
        assert_eq!(left.gap_fills[0].method, GapFillMethod::Snap);
        assert_abs_diff_eq!(left.gap_fills[0].gap_size, 0.05, epsilon = 1e-9);
        // The second shape's start moves onto the first shape's end.
        assert_abs_diff_eq!(left.shapes[1].start_point().x, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(left.shapes[1].start_point().y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(left.shapes[0].end_point().x, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn failed_trim_keeps_shapes_and_breaks_continuity() {
        // A circle can be hit but never trimmed.
        let source = Chain::new(vec![line(0.0, 0.0, 10.0, 0.0)]);
        let shapes = vec![
            line(0.0, 1.0, 10.0, 1.0),
            Shape::new(Geometry::Circle(Circle::new(Point2::new(15.0, 0.0), 6.0))),
        ];
        let params = ChainOffsetParameters {
            max_extension: 8.0,
            ..ChainOffsetParameters::default()
        };
        let mut warnings = Vec::new();
        let side = process_side(
            &source,
            ChainSide::Left,
            shapes.clone(),
            false,
            &params,
            &mut warnings,
        )
        .unwrap();
        assert!(!side.continuous);
        assert!(side.trim_points.is_empty());
        assert!(side.gap_fills.is_empty());
        assert!(!side.intersection_points.is_empty());
        assert_eq!(side.shapes, shapes);
        assert!(warnings.iter().any(|w| w.contains("could not trim shapes 0 and 1")));
    }

    #[test]
    fn polyline_self_intersections_are_reported_on_request() {
        use crate::geometry::Polyline;
        // A bow-tie stays self-intersecting after offsetting.
        let bow = Polyline::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(10.0, 0.0),
                Point2::new(0.0, 10.0),
            ],
            false,
        );
        let chain = Chain::new(vec![Shape::new(Geometry::Polyline(bow))]);
        let params = ChainOffsetParameters {
            polyline_intersections: true,
            ..ChainOffsetParameters::default()
        };
        let r = offset_chain(&chain, 0.5, &params);
        let total: usize = [r.inner_chain.as_ref(), r.outer_chain.as_ref()]
            .into_iter()
            .flatten()
            .map(|c| c.intersection_points.len())
            .sum();
        assert!(total >= 1);
        assert_eq!(r.metrics.intersections_found, total);
    }
}
