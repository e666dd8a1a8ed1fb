use serde::{Deserialize, Serialize};

use crate::geometry::Shape;
use crate::math::{distance, Point2};

/// A break between one shape's end and the next shape's start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityGap {
    /// Index of the shape the gap follows; the last index marks the closing
    /// gap of a closed chain.
    pub after_index: usize,
    pub distance: f64,
    pub from: Point2,
    pub to: Point2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    pub is_connected: bool,
    pub gaps: Vec<ConnectivityGap>,
}

/// Reports every consecutive pair whose joint is wider than `tolerance`,
/// including the wrap-around pair when `closed`.
#[must_use]
pub fn validate_connectivity(shapes: &[Shape], closed: bool, tolerance: f64) -> ConnectivityReport {
    let n = shapes.len();
    let pairs = if closed && n > 1 { n } else { n.saturating_sub(1) };

    let gaps: Vec<ConnectivityGap> = (0..pairs)
        .filter_map(|i| {
            let from = shapes[i].end_point();
            let to = shapes[(i + 1) % n].start_point();
            let d = distance(&from, &to);
            (d > tolerance).then_some(ConnectivityGap {
                after_index: i,
                distance: d,
                from,
                to,
            })
        })
        .collect();

    ConnectivityReport {
        is_connected: gaps.is_empty(),
        gaps,
    }
}
