use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::arc::Arc;
use crate::math::{Point2, Vector2};

/// A full circle. Parameter `t` maps to the polar angle `2π·t`, counter-clockwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    #[must_use]
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        let angle = TAU * t;
        Point2::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    #[must_use]
    pub fn tangent_at(&self, t: f64) -> Vector2 {
        let angle = TAU * t;
        Vector2::new(-angle.sin(), angle.cos())
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        TAU * self.radius
    }

    /// The circle as a counter-clockwise full-turn arc starting at angle 0.
    #[must_use]
    pub fn as_arc(&self) -> Arc {
        Arc {
            center: self.center,
            radius: self.radius,
            start_angle: 0.0,
            end_angle: TAU,
            clockwise: false,
        }
    }

    /// Normalized parameter of the angular position of `p`.
    #[must_use]
    pub fn param_of(&self, p: &Point2) -> f64 {
        let angle = (p.y - self.center.y).atan2(p.x - self.center.x);
        crate::math::arc_2d::normalize_angle(angle) / TAU
    }
}
