use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Shape;
use crate::math::polygon_2d::point_in_polygon;
use crate::math::{points_equal, Point2};

/// Sampling tolerance used when a chain boundary is turned into a polygon.
const BOUNDARY_TESSELLATION_TOLERANCE: f64 = 1e-3;

/// An ordered sequence of shapes forming one path.
///
/// `closed` carries the explicit flag of chains that came from a closed
/// polyline; `None` leaves closure to the geometric test in [`Chain::is_closed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub closed: Option<bool>,
}

impl Chain {
    /// Creates a chain with a fresh identifier and geometric closure.
    #[must_use]
    pub fn new(shapes: Vec<Shape>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            shapes,
            closed: None,
        }
    }

    /// Sets the explicit closure flag.
    #[must_use]
    pub fn with_closed(mut self, closed: bool) -> Self {
        self.closed = Some(closed);
        self
    }

    #[must_use]
    pub fn start_point(&self) -> Option<Point2> {
        self.shapes.first().map(Shape::start_point)
    }

    #[must_use]
    pub fn end_point(&self) -> Option<Point2> {
        self.shapes.last().map(Shape::end_point)
    }

    /// Whether the chain is closed: the explicit flag when present, otherwise
    /// a single intrinsically closed shape or a last end meeting the first start.
    #[must_use]
    pub fn is_closed(&self, tolerance: f64) -> bool {
        if let Some(closed) = self.closed {
            return closed;
        }
        match self.shapes.as_slice() {
            [] => false,
            [only] => only.geometry.is_closed(),
            shapes => {
                let first = shapes[0].start_point();
                let last = shapes[shapes.len() - 1].end_point();
                points_equal(&first, &last, tolerance)
            }
        }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.shapes.iter().map(Shape::length).sum()
    }

    /// The chain outline as one point sequence, consecutive duplicates removed.
    #[must_use]
    pub fn boundary(&self, tolerance: f64) -> Vec<Point2> {
        let mut points: Vec<Point2> = Vec::new();
        for shape in &self.shapes {
            for p in shape.geometry.tessellate(tolerance) {
                if points.last().is_some_and(|last| points_equal(last, &p, 1e-12)) {
                    continue;
                }
                points.push(p);
            }
        }
        points
    }
}

/// Returns whether `point` lies inside the closed outline of `chain`
/// (non-zero winding number against the tessellated boundary).
///
/// Points within `tolerance` of the boundary count as outside; open chains
/// contain nothing.
#[must_use]
pub fn is_point_inside_chain(point: &Point2, chain: &Chain, tolerance: f64) -> bool {
    if chain.shapes.is_empty() || !chain.is_closed(tolerance) {
        return false;
    }
    if distance_to_chain(point, chain) <= tolerance {
        return false;
    }
    boundary_contains(point, chain)
}

/// Non-zero winding test against the tessellated outline, treating the
/// chain as closed whatever its endpoints say.
#[must_use]
pub(crate) fn boundary_contains(point: &Point2, chain: &Chain) -> bool {
    let boundary = chain.boundary(BOUNDARY_TESSELLATION_TOLERANCE);
    boundary.len() >= 3 && point_in_polygon(point, &boundary)
}

/// Smallest distance from `point` to any shape of `chain`.
#[must_use]
pub fn distance_to_chain(point: &Point2, chain: &Chain) -> f64 {
    chain
        .shapes
        .iter()
        .map(|s| s.geometry.distance_to(point))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Arc, Circle, Geometry, Line};
    use std::f64::consts::PI;

    fn square() -> Chain {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let shapes = (0..4)
            .map(|i| Shape::new(Geometry::Line(Line::new(corners[i], corners[(i + 1) % 4]))))
            .collect();
        Chain::new(shapes)
    }

    #[test]
    fn square_closure_is_geometric() {
        assert!(square().is_closed(0.1));
        let mut open = square();
        open.shapes.pop();
        assert!(!open.is_closed(0.1));
        assert!(open.clone().with_closed(true).is_closed(0.1));
    }

    #[test]
    fn square_containment() {
        let chain = square();
        for p in [(5.0, 5.0), (1.0, 1.0), (9.0, 9.0)] {
            assert!(is_point_inside_chain(&Point2::new(p.0, p.1), &chain, 0.01));
        }
        for p in [(-1.0, 5.0), (11.0, 5.0), (5.0, -1.0), (5.0, 11.0)] {
            assert!(!is_point_inside_chain(&Point2::new(p.0, p.1), &chain, 0.01));
        }
    }

    #[test]
    fn clockwise_outline_still_contains() {
        let mut chain = square();
        chain.shapes.reverse();
        for s in &mut chain.shapes {
            s.geometry = s.geometry.reversed();
        }
        assert!(is_point_inside_chain(&Point2::new(5.0, 5.0), &chain, 0.01));
    }

    #[test]
    fn circle_chain_containment() {
        let chain = Chain::new(vec![Shape::new(Geometry::Circle(Circle::new(
            Point2::origin(),
            5.0,
        )))]);
        assert!(chain.is_closed(0.1));
        assert!(is_point_inside_chain(&Point2::new(1.0, 1.0), &chain, 0.01));
        assert!(!is_point_inside_chain(&Point2::new(6.0, 0.0), &chain, 0.01));
    }

    #[test]
    fn arc_lens_containment() {
        // Upper half disc: top arc plus the diameter.
        let arc = Arc {
            center: Point2::origin(),
            radius: 5.0,
            start_angle: 0.0,
            end_angle: PI,
            clockwise: false,
        };
        let chain = Chain::new(vec![
            Shape::new(Geometry::Arc(arc)),
            Shape::new(Geometry::Line(Line::new(
                Point2::new(-5.0, 0.0),
                Point2::new(5.0, 0.0),
            ))),
        ]);
        assert!(is_point_inside_chain(&Point2::new(0.0, 4.0), &chain, 0.01));
        assert!(!is_point_inside_chain(&Point2::new(0.0, -1.0), &chain, 0.01));
    }
}
