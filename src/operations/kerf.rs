//! Kerf compensation: pick the offset side a cut actually follows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OperationError, Result};
use crate::geometry::{Chain, Shape};
use crate::operations::chain_offset::{offset_chain, ChainOffsetParameters, ChainSide};
use crate::operations::offset::OffsetDirection;

/// Tag stored with every [`CalculatedOffset`]; a cached offset made by a
/// different version must be recomputed.
pub const ALGORITHM_VERSION: &str = concat!("chain-offset-", env!("CARGO_PKG_VERSION"));

/// A cutting tool's kerf applied on one side of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KerfCompensation {
    /// Full width of material removed by the cut.
    pub kerf_width: f64,
    pub direction: OffsetDirection,
}

/// Snapshot of a compensated tool path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedOffset {
    pub offset_shapes: Vec<Shape>,
    pub original_shapes: Vec<Shape>,
    pub direction: OffsetDirection,
    pub kerf_width: f64,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    /// Whether the selected side came out as one connected path.
    pub continuous: bool,
    pub warnings: Vec<String>,
}

impl CalculatedOffset {
    /// Whether this snapshot was produced by another algorithm version.
    #[must_use]
    pub fn is_stale(&self, current_version: &str) -> bool {
        self.version != current_version
    }
}

impl KerfCompensation {
    #[must_use]
    pub fn new(kerf_width: f64, direction: OffsetDirection) -> Self {
        Self {
            kerf_width,
            direction,
        }
    }

    /// Side of the offset the tool follows: inner/outer on closed chains,
    /// right/left on open ones.
    #[must_use]
    pub fn target_side(&self, closed: bool) -> ChainSide {
        match (closed, self.direction) {
            (true, OffsetDirection::Inset) => ChainSide::Inner,
            (true, OffsetDirection::Outset) => ChainSide::Outer,
            (false, OffsetDirection::Inset) => ChainSide::Right,
            (false, OffsetDirection::Outset) => ChainSide::Left,
        }
    }

    /// Offsets `chain` by half the kerf and keeps the side matching
    /// `direction`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for a non-positive or
    /// non-finite kerf width, and `OperationError::Failed` when the chain
    /// offset fails or does not produce the requested side.
    pub fn apply(&self, chain: &Chain, params: &ChainOffsetParameters) -> Result<CalculatedOffset> {
        if !self.kerf_width.is_finite() || self.kerf_width <= 0.0 {
            return Err(OperationError::InvalidInput(format!(
                "kerf width must be positive and finite, got {}",
                self.kerf_width
            ))
            .into());
        }

        let result = offset_chain(chain, self.kerf_width / 2.0, params);
        if !result.success {
            return Err(OperationError::Failed(result.errors.join("; ")).into());
        }

        let side = self.target_side(chain.is_closed(params.tolerance));
        let selected = result.side(side).ok_or_else(|| {
            OperationError::Failed(format!("chain {} has no {side} offset", chain.id))
        })?;
        debug!(
            chain = %chain.id,
            %side,
            shapes = selected.shapes.len(),
            continuous = selected.continuous,
            "kerf offset selected"
        );

        Ok(CalculatedOffset {
            offset_shapes: selected.shapes.clone(),
            original_shapes: chain.shapes.clone(),
            direction: self.direction,
            kerf_width: self.kerf_width,
            generated_at: Utc::now(),
            version: ALGORITHM_VERSION.to_owned(),
            continuous: selected.continuous,
            warnings: result.warnings,
        })
    }
}
