use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::types::ChainSide;
use crate::geometry::{boundary_contains, distance_to_chain, Chain, Shape};
use crate::math::{cross_2d, TOLERANCE};
use crate::operations::offset::{OffsetDirection, RawOffset};

/// Confidence difference under which two same-side classifications of one
/// source shape count as a tie. Tunable; ties go to the outset offset.
pub const SIDE_CONFIDENCE_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideMethod {
    /// Containment test against a closed chain.
    Winding,
    /// Cross product against the local chain direction.
    Orientation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideDetection {
    pub side: ChainSide,
    /// In `[0, 1]`; how decisively the offset falls on `side`.
    pub confidence: f64,
    pub method: SideMethod,
}

/// Offsets of one side, ordered by source index.
#[derive(Debug, Clone, PartialEq)]
pub struct SideGroup {
    pub side: ChainSide,
    pub offsets: Vec<RawOffset>,
}

/// Classifies an offset shape against the chain it was derived from.
///
/// Closed chains test the offset midpoint for containment. Open chains take
/// the chain shape nearest to the midpoint and use the sign of the cross
/// product between its tangent there and the vector towards the midpoint;
/// when that vector vanishes the chain's head-to-tail vector is used.
#[must_use]
pub fn detect_chain_side(
    offset_shape: &Shape,
    signed_offset: f64,
    chain: &Chain,
    tolerance: f64,
    is_closed: bool,
) -> SideDetection {
    let probe = offset_shape.midpoint();
    let scale = signed_offset.abs().max(tolerance).max(TOLERANCE);

    if is_closed {
        let inside = boundary_contains(&probe, chain);
        let margin = distance_to_chain(&probe, chain);
        return SideDetection {
            side: if inside { ChainSide::Inner } else { ChainSide::Outer },
            confidence: (margin / scale).clamp(0.0, 1.0),
            method: SideMethod::Winding,
        };
    }

    let nearest = chain
        .shapes
        .iter()
        .map(|s| (s, s.geometry.closest_param(&probe)))
        .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1));

    let mut cross = 0.0;
    if let Some((shape, (t, distance))) = nearest {
        if distance > TOLERANCE {
            let foot = shape.geometry.point_at(t);
            cross = cross_2d(&shape.geometry.tangent_at(t), &(probe - foot));
        }
    }
    if cross.abs() <= TOLERANCE {
        if let (Some(head), Some(tail)) = (chain.start_point(), chain.end_point()) {
            let axis = tail - head;
            if let Some(axis) = axis.try_normalize(TOLERANCE) {
                cross = cross_2d(&axis, &(probe - head));
            }
        }
    }

    SideDetection {
        side: if cross > 0.0 {
            ChainSide::Left
        } else {
            ChainSide::Right
        },
        confidence: (cross.abs() / scale).clamp(0.0, 1.0),
        method: SideMethod::Orientation,
    }
}

/// Classifies every offset and splits them into the two side groups
/// (`Inner`/`Outer` for closed chains, `Left`/`Right` for open ones).
///
/// When both offsets of one source shape land on the same side, the more
/// confident one keeps it and the other is moved to the opposite side.
#[must_use]
pub fn group_offsets_by_side(
    offsets: &[RawOffset],
    chain: &Chain,
    tolerance: f64,
    is_closed: bool,
) -> [SideGroup; 2] {
    let classified: Vec<(RawOffset, SideDetection)> = offsets
        .iter()
        .map(|o| {
            let detection =
                detect_chain_side(&o.shape, o.signed_offset, chain, tolerance, is_closed);
            trace!(
                source = o.source_index,
                direction = ?o.direction,
                side = ?detection.side,
                confidence = detection.confidence,
                "classified offset"
            );
            (o.clone(), detection)
        })
        .collect();

    let resolved = resolve_conflicts(classified);

    let (first_side, second_side) = if is_closed {
        (ChainSide::Inner, ChainSide::Outer)
    } else {
        (ChainSide::Left, ChainSide::Right)
    };
    let mut first = Vec::new();
    let mut second = Vec::new();
    for (offset, side) in resolved {
        if side == first_side {
            first.push(offset);
        } else {
            second.push(offset);
        }
    }
    first.sort_by_key(|o| o.source_index);
    second.sort_by_key(|o| o.source_index);

    [
        SideGroup {
            side: first_side,
            offsets: first,
        },
        SideGroup {
            side: second_side,
            offsets: second,
        },
    ]
}

fn resolve_conflicts(classified: Vec<(RawOffset, SideDetection)>) -> Vec<(RawOffset, ChainSide)> {
    let mut by_source: BTreeMap<usize, Vec<(RawOffset, SideDetection)>> = BTreeMap::new();
    for entry in classified {
        by_source.entry(entry.0.source_index).or_default().push(entry);
    }

    let mut resolved = Vec::new();
    for (source, entries) in by_source {
        if let [(a, da), (b, db)] = entries.as_slice() {
            if da.side == db.side {
                let a_wins = if (da.confidence - db.confidence).abs() < SIDE_CONFIDENCE_MARGIN {
                    // Tie: the outset offset keeps the outer (or left) side.
                    let outer_like = matches!(da.side, ChainSide::Outer | ChainSide::Left);
                    (a.direction == OffsetDirection::Outset) == outer_like
                } else {
                    da.confidence > db.confidence
                };
                debug!(
                    source,
                    side = ?da.side,
                    "both offsets on one side, flipping the weaker one"
                );
                let (keep, flip, side) = if a_wins {
                    (a.clone(), b.clone(), da.side)
                } else {
                    (b.clone(), a.clone(), db.side)
                };
                resolved.push((keep, side));
                resolved.push((flip, side.opposite()));
                continue;
            }
        }
        resolved.extend(entries.into_iter().map(|(o, d)| (o, d.side)));
    }
    resolved
}
