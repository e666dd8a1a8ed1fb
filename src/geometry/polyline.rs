use serde::{Deserialize, Serialize};

use super::arc::{arc_subdivision_count, Arc};
use super::line::Line;
use super::Geometry;
use crate::math::arc_2d::{arc_from_bulge, arc_point_at, bulge_from_sweep};
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{Point2, Vector2};

/// Bulge-encoded polyline vertex for mixed line/arc segments.
///
/// `bulge = tan(sweep_angle / 4)`:
/// - `0` = straight line to next vertex
/// - `> 0` = counter-clockwise arc to next vertex
/// - `< 0` = clockwise arc to next vertex
/// - `|bulge| = 1` = semicircle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolylineVertex {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub bulge: f64,
}

impl PolylineVertex {
    /// Creates a new vertex with the given coordinates and bulge.
    #[must_use]
    pub fn new(x: f64, y: f64, bulge: f64) -> Self {
        Self { x, y, bulge }
    }

    /// Creates a line vertex (bulge = 0).
    #[must_use]
    pub fn line(x: f64, y: f64) -> Self {
        Self { x, y, bulge: 0.0 }
    }

    #[must_use]
    pub fn point(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// A polyline with mixed straight-line and circular-arc segments.
///
/// Each segment between consecutive vertices is either a line (bulge=0)
/// or a circular arc (bulge≠0). For closed polylines, the last vertex
/// connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub vertices: Vec<PolylineVertex>,
    #[serde(default)]
    pub closed: bool,
}

impl Polyline {
    /// Creates a `Polyline` from points with all-zero bulges (line segments only).
    #[must_use]
    pub fn from_points(points: &[Point2], closed: bool) -> Self {
        let vertices = points
            .iter()
            .map(|p| PolylineVertex::line(p.x, p.y))
            .collect();
        Self { vertices, closed }
    }

    /// Returns the number of segments in this polyline.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        let n = self.vertices.len();
        if n < 2 {
            return 0;
        }
        if self.closed {
            n
        } else {
            n - 1
        }
    }

    /// Returns segment `i` as a line or arc geometry.
    ///
    /// Degenerate arc segments (zero chord) come back as zero-length lines.
    #[must_use]
    pub fn segment(&self, i: usize) -> Geometry {
        let n = self.vertices.len();
        let v0 = &self.vertices[i];
        let v1 = &self.vertices[(i + 1) % n];
        let (p0, p1) = (v0.point(), v1.point());
        if v0.bulge.abs() < 1e-12 {
            return Geometry::Line(Line::new(p0, p1));
        }
        let arc = arc_from_bulge(&p0, &p1, v0.bulge);
        if arc.radius < 1e-12 {
            return Geometry::Line(Line::new(p0, p1));
        }
        Geometry::Arc(Arc {
            center: arc.center,
            radius: arc.radius,
            start_angle: arc.start_angle,
            end_angle: arc.start_angle + arc.sweep,
            clockwise: arc.sweep < 0.0,
        })
    }

    /// All segments in order.
    #[must_use]
    pub fn segments(&self) -> Vec<Geometry> {
        (0..self.segment_count()).map(|i| self.segment(i)).collect()
    }

    /// Maps a polyline parameter to `(segment index, local parameter)`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn locate(&self, t: f64) -> (usize, f64) {
        let count = self.segment_count();
        if count == 0 {
            return (0, 0.0);
        }
        let scaled = t.clamp(0.0, 1.0) * count as f64;
        let index = (scaled.floor() as usize).min(count - 1);
        (index, scaled - index as f64)
    }

    /// Maps `(segment index, local parameter)` back to a polyline parameter.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn global_param(&self, index: usize, local: f64) -> f64 {
        let count = self.segment_count().max(1);
        (index as f64 + local) / count as f64
    }

    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        if self.segment_count() == 0 {
            return self.vertices.first().map_or_else(Point2::origin, PolylineVertex::point);
        }
        let (i, local) = self.locate(t);
        self.segment(i).point_at(local)
    }

    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector2 {
        if self.segment_count() == 0 {
            return Vector2::zeros();
        }
        let (i, local) = self.locate(t);
        self.segment(i).tangent_at(local)
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.segments().iter().map(Geometry::length).sum()
    }

    /// Converts this polyline to points by tessellating arcs into line segments.
    ///
    /// `tolerance` controls the maximum deviation between the arc and its chord approximation.
    /// For closed polylines the closing vertex is not repeated.
    #[must_use]
    pub fn to_points(&self, tolerance: f64) -> Vec<Point2> {
        let n = self.vertices.len();
        if n == 0 {
            return Vec::new();
        }

        let seg_count = self.segment_count();
        let mut points = Vec::with_capacity(n * 2);
        points.push(self.vertices[0].point());

        for i in 0..seg_count {
            let v0 = &self.vertices[i];
            let v1 = &self.vertices[(i + 1) % n];

            if v0.bulge.abs() >= 1e-12 {
                let arc = arc_from_bulge(&v0.point(), &v1.point(), v0.bulge);
                if arc.radius >= 1e-12 {
                    let n_sub = arc_subdivision_count(arc.radius, arc.sweep.abs(), tolerance);
                    for j in 1..n_sub {
                        let t = f64::from(j) / f64::from(n_sub);
                        points.push(arc_point_at(
                            &arc.center,
                            arc.radius,
                            arc.start_angle,
                            arc.sweep,
                            t,
                        ));
                    }
                }
            }
            points.push(v1.point());
        }

        if self.closed && points.len() > 1 {
            points.pop();
        }
        points
    }

    /// Signed area of the tessellated outline (positive when counter-clockwise).
    #[must_use]
    pub fn signed_area(&self, tolerance: f64) -> f64 {
        signed_area_2d(&self.to_points(tolerance))
    }

    /// Returns a new polyline with vertices in reverse order and negated bulges.
    ///
    /// For a segment `v[i] → v[i+1]` with bulge `b`, the reversed segment
    /// `v[i+1] → v[i]` has bulge `-b` (arc direction flips).
    #[must_use]
    pub fn reversed(&self) -> Self {
        let m = self.vertices.len();
        if m == 0 {
            return self.clone();
        }
        let mut new_verts = Vec::with_capacity(m);
        for j in 0..m {
            let orig_idx = m - 1 - j;
            // In the reversed polyline, vertex j connects to vertex j+1,
            // which corresponds to the reverse of original segment (m-2-j).
            let bulge = if j < m - 1 {
                -self.vertices[m - 2 - j].bulge
            } else if self.closed {
                -self.vertices[m - 1].bulge
            } else {
                0.0
            };
            new_verts.push(PolylineVertex::new(
                self.vertices[orig_idx].x,
                self.vertices[orig_idx].y,
                bulge,
            ));
        }
        Self {
            vertices: new_verts,
            closed: self.closed,
        }
    }

    /// Keeps segments `0..=index`, with segment `index` cut at `local` and
    /// ending at `end`. Open polylines only.
    #[must_use]
    pub fn truncated_after(&self, index: usize, local: f64, end: Point2) -> Self {
        let mut vertices: Vec<PolylineVertex> = self.vertices[..=index].to_vec();
        let bulge = vertices[index].bulge;
        if bulge.abs() >= 1e-12 {
            vertices[index].bulge = bulge_from_sweep(4.0 * bulge.atan() * local.max(0.0));
        }
        vertices.push(PolylineVertex::line(end.x, end.y));
        Self {
            vertices,
            closed: false,
        }
    }

    /// Keeps segments `index..`, with segment `index` starting at `start`
    /// (the point at `local`). Open polylines only.
    #[must_use]
    pub fn truncated_before(&self, index: usize, local: f64, start: Point2) -> Self {
        let bulge = self.vertices[index].bulge;
        let new_bulge = if bulge.abs() >= 1e-12 {
            bulge_from_sweep(4.0 * bulge.atan() * (1.0 - local).max(0.0))
        } else {
            0.0
        };
        let mut vertices = Vec::with_capacity(self.vertices.len() - index);
        vertices.push(PolylineVertex::new(start.x, start.y, new_bulge));
        vertices.extend_from_slice(&self.vertices[index + 1..]);
        Self {
            vertices,
            closed: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn l_shape() -> Polyline {
        Polyline::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
            ],
            false,
        )
    }

    #[test]
    fn from_points_creates_line_only() {
        let pline = l_shape();
        assert_eq!(pline.vertices.len(), 3);
        assert_eq!(pline.segment_count(), 2);
        assert!(pline.vertices.iter().all(|v| v.bulge.abs() < 1e-12));
    }

    #[test]
    fn closed_segment_count() {
        let mut pline = l_shape();
        pline.closed = true;
        assert_eq!(pline.segment_count(), 3);
    }

    #[test]
    fn to_points_semicircle_arc() {
        let pline = Polyline {
            vertices: vec![
                PolylineVertex::new(0.0, 0.0, 1.0), // semicircle
                PolylineVertex::new(2.0, 0.0, 0.0),
            ],
            closed: false,
        };
        let pts = pline.to_points(0.01);
        assert!(pts.len() > 2, "expected more than 2 points, got {}", pts.len());
        assert_abs_diff_eq!(pts.last().unwrap().x, 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(pline.length(), std::f64::consts::PI, epsilon = 1e-9);
    }

    #[test]
    fn locate_maps_segments() {
        let pline = l_shape();
        let (i, local) = pline.locate(0.75);
        assert_eq!(i, 1);
        assert_abs_diff_eq!(local, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(pline.global_param(i, local), 0.75, epsilon = 1e-12);
        let p = pline.point_at(0.75);
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn reversed_with_arc() {
        let pline = Polyline {
            vertices: vec![
                PolylineVertex::line(0.0, 0.0),
                PolylineVertex::new(2.0, 0.0, 1.0),
                PolylineVertex::line(4.0, 0.0),
            ],
            closed: false,
        };
        let rev = pline.reversed();
        assert_abs_diff_eq!(rev.vertices[0].bulge, -1.0, epsilon = 1e-12);
        assert!(rev.vertices[1].bulge.abs() < 1e-12);
    }

    #[test]
    fn reversed_closed_keeps_closing_arc() {
        let pline = Polyline {
            vertices: vec![
                PolylineVertex::line(0.0, 0.0),
                PolylineVertex::line(2.0, 0.0),
                PolylineVertex::new(2.0, 2.0, 0.5),
            ],
            closed: true,
        };
        let rev = pline.reversed();
        assert_abs_diff_eq!(rev.vertices[2].bulge, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(rev.length(), pline.length(), epsilon = 1e-9);
    }

    #[test]
    fn truncation_keeps_partial_arc() {
        let pline = Polyline {
            vertices: vec![
                PolylineVertex::new(0.0, 0.0, 1.0),
                PolylineVertex::line(2.0, 0.0),
            ],
            closed: false,
        };
        let mid = pline.point_at(0.5);
        let half = pline.truncated_after(0, 0.5, mid);
        assert_abs_diff_eq!(half.length(), std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
        let tail = pline.truncated_before(0, 0.5, mid);
        assert_abs_diff_eq!(tail.length(), std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }
}
