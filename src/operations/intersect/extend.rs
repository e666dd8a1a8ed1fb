use crate::geometry::{ExtendEnd, Geometry, Polyline, PolylineVertex};
use crate::math::arc_2d::bulge_from_sweep;

/// Returns `geometry` prolonged by `length` at the requested end(s).
///
/// Lines grow along their direction and arcs widen their sweep (never past a
/// full turn). Open polylines extend their first and last segments. Circles,
/// closed polylines, splines and ellipses come back unchanged.
#[must_use]
pub fn extend_shape(geometry: &Geometry, length: f64, end: ExtendEnd) -> Geometry {
    if !(length.is_finite() && length > 0.0) {
        return geometry.clone();
    }
    match geometry {
        Geometry::Line(l) => Geometry::Line(l.extended(length, end)),
        Geometry::Arc(a) => Geometry::Arc(a.extended(length, end)),
        Geometry::Polyline(p) if !p.closed && p.segment_count() > 0 => {
            Geometry::Polyline(extend_polyline(p, length, end))
        }
        Geometry::Circle(_)
        | Geometry::Polyline(_)
        | Geometry::Spline(_)
        | Geometry::Ellipse(_) => geometry.clone(),
    }
}

/// Whether [`extend_shape`] can change this geometry.
#[must_use]
pub fn is_extendable(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Line(_) => true,
        Geometry::Arc(a) => !a.is_full_circle(),
        Geometry::Polyline(p) => !p.closed && p.segment_count() > 0,
        Geometry::Circle(_) | Geometry::Spline(_) | Geometry::Ellipse(_) => false,
    }
}

fn extend_polyline(pline: &Polyline, length: f64, end: ExtendEnd) -> Polyline {
    let mut result = pline.clone();
    let last_seg = pline.segment_count() - 1;

    if matches!(end, ExtendEnd::Start | ExtendEnd::Both) {
        match pline.segment(0) {
            Geometry::Line(l) => {
                let start = l.extended(length, ExtendEnd::Start).start;
                result.vertices[0].x = start.x;
                result.vertices[0].y = start.y;
            }
            Geometry::Arc(a) => {
                let ext = a.extended(length, ExtendEnd::Start);
                let start = ext.start_point();
                result.vertices[0] =
                    PolylineVertex::new(start.x, start.y, bulge_from_sweep(ext.signed_sweep()));
            }
            _ => {}
        }
    }

    // A single segment may already carry the start extension.
    if matches!(end, ExtendEnd::End | ExtendEnd::Both) {
        match result.segment(last_seg) {
            Geometry::Line(l) => {
                let end_pt = l.extended(length, ExtendEnd::End).end;
                let v = &mut result.vertices[last_seg + 1];
                v.x = end_pt.x;
                v.y = end_pt.y;
            }
            Geometry::Arc(a) => {
                let ext = a.extended(length, ExtendEnd::End);
                let end_pt = ext.end_point();
                result.vertices[last_seg].bulge = bulge_from_sweep(ext.signed_sweep());
                let v = &mut result.vertices[last_seg + 1];
                v.x = end_pt.x;
                v.y = end_pt.y;
            }
            _ => {}
        }
    }
    result
}
