use std::fmt;

use serde::{Deserialize, Serialize};

use super::gap_fill::GapFillingResult;
use super::trim::TrimPoint;
use crate::error::{OperationError, Result};
use crate::geometry::Shape;
use crate::operations::intersect::{IntersectionMode, IntersectionResult};

/// Default joint tolerance, in drawing units.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Default limit on how far shapes may be extended, in drawing units.
pub const DEFAULT_MAX_EXTENSION: f64 = 50.0;

/// Default gap below which endpoints are simply snapped together.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 0.1;

/// Tuning for [`offset_chain`](super::offset_chain).
///
/// `max_extension` bounds both the intersection extension ladder and gap
/// filling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainOffsetParameters {
    pub tolerance: f64,
    pub max_extension: f64,
    pub snap_threshold: f64,
    /// Also report self-intersections inside polyline offsets.
    pub polyline_intersections: bool,
    pub intersection_type: IntersectionMode,
}

impl Default for ChainOffsetParameters {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_extension: DEFAULT_MAX_EXTENSION,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
            polyline_intersections: false,
            intersection_type: IntersectionMode::Bounded,
        }
    }
}

impl ChainOffsetParameters {
    /// Checks that every length is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("tolerance", self.tolerance),
            ("maxExtension", self.max_extension),
            ("snapThreshold", self.snap_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(OperationError::InvalidInput(format!(
                    "{name} must be finite and non-negative, got {value}"
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Which side of the source chain an offset chain lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainSide {
    Inner,
    Outer,
    Left,
    Right,
}

impl fmt::Display for ChainSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inner => "inner",
            Self::Outer => "outer",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

impl ChainSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Inner => Self::Outer,
            Self::Outer => Self::Inner,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// One processed side of an offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetChain {
    pub id: String,
    pub original_chain_id: String,
    pub side: ChainSide,
    pub shapes: Vec<Shape>,
    pub closed: bool,
    /// Every consecutive pair meets within tolerance.
    pub continuous: bool,
    pub gap_fills: Vec<GapFillingResult>,
    pub trim_points: Vec<TrimPoint>,
    pub intersection_points: Vec<IntersectionResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOffsetMetrics {
    /// Offset shapes across all returned sides.
    pub shape_count: usize,
    pub intersections_found: usize,
    pub gaps_filled: usize,
    pub processing_time_ms: f64,
}

/// Result of [`offset_chain`](super::offset_chain).
///
/// For open chains the `inner_chain` slot carries the left side and
/// `outer_chain` the right side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOffsetResult {
    pub success: bool,
    pub inner_chain: Option<OffsetChain>,
    pub outer_chain: Option<OffsetChain>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metrics: ChainOffsetMetrics,
}

impl ChainOffsetResult {
    pub(crate) fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    /// The offset chain on `side`, if it was produced.
    #[must_use]
    pub fn side(&self, side: ChainSide) -> Option<&OffsetChain> {
        [self.inner_chain.as_ref(), self.outer_chain.as_ref()]
            .into_iter()
            .flatten()
            .find(|c| c.side == side)
    }

    #[must_use]
    pub fn left_chain(&self) -> Option<&OffsetChain> {
        self.side(ChainSide::Left)
    }

    #[must_use]
    pub fn right_chain(&self) -> Option<&OffsetChain> {
        self.side(ChainSide::Right)
    }
}
