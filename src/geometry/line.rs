use serde::{Deserialize, Serialize};

use super::ExtendEnd;
use crate::error::{GeometryError, Result};
use crate::math::polygon_2d::left_normal;
use crate::math::{Point2, Vector2, TOLERANCE};

/// A straight line segment from `start` to `end`.
///
/// The parametric form is `P(t) = start + t * (end - start)`, `t ∈ [0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    /// Creates a new line segment.
    #[must_use]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// Returns the (non-normalized) direction `end - start`.
    #[must_use]
    pub fn delta(&self) -> Vector2 {
        self.end - self.start
    }

    /// Returns the segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.delta().norm()
    }

    /// Returns the unit direction.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroVector` for a zero-length segment.
    pub fn direction(&self) -> Result<Vector2> {
        let d = self.delta();
        let len = d.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(d / len)
    }

    /// Evaluates the segment at `t` (not clamped, so `t` outside `[0, 1]`
    /// lands on the carrier line).
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.start + self.delta() * t
    }

    /// Unbounded parameter of the orthogonal projection of `p` onto the carrier line.
    #[must_use]
    pub fn project(&self, p: &Point2) -> f64 {
        let d = self.delta();
        let len_sq = d.norm_squared();
        if len_sq < TOLERANCE * TOLERANCE {
            return 0.0;
        }
        (p - self.start).dot(&d) / len_sq
    }

    /// Distance from `p` to the infinite carrier line.
    #[must_use]
    pub fn distance_to_carrier(&self, p: &Point2) -> f64 {
        (self.point_at(self.project(p)) - p).norm()
    }

    /// Returns the segment with swapped endpoints.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.end, self.start)
    }

    /// Shifts the segment by `distance` along its left normal.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroVector` for a zero-length segment.
    pub fn offset(&self, distance: f64) -> Result<Self> {
        let shift = left_normal(self.direction()?) * distance;
        Ok(Self::new(self.start + shift, self.end + shift))
    }

    /// Prolongs the segment by `length` at the requested end(s).
    ///
    /// Degenerate segments are returned unchanged.
    #[must_use]
    pub fn extended(&self, length: f64, end: ExtendEnd) -> Self {
        let Ok(dir) = self.direction() else {
            return self.clone();
        };
        let mut result = self.clone();
        if matches!(end, ExtendEnd::Start | ExtendEnd::Both) {
            result.start -= dir * length;
        }
        if matches!(end, ExtendEnd::End | ExtendEnd::Both) {
            result.end += dir * length;
        }
        result
    }
}
