use super::Point2;

/// Returns the minimum distance from point `p` to the segment `a`→`b`,
/// together with the clamped segment parameter of the closest point.
#[must_use]
pub fn point_to_segment(p: &Point2, a: &Point2, b: &Point2) -> (f64, f64) {
    let d = b - a;
    let len_sq = d.norm_squared();

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return ((p - a).norm(), 0.0);
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = a + d * t;
    ((p - closest).norm(), t)
}
