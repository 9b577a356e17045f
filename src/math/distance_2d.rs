use super::{Point2, TOLERANCE};

/// Returns the minimum distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();

    if len_sq < TOLERANCE * TOLERANCE {
        // Degenerate segment (zero length).
        return (p - a).norm();
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    (p - (a + d * t)).norm()
}

/// Returns the squared perpendicular distance from `p` to the infinite line
/// through `a` and `b`.
///
/// Falls back to the squared point distance when `a` and `b` coincide.
#[must_use]
pub fn point_to_line_dist_sq(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return (p - a).norm_squared();
    }
    let cross = d.x * (p.y - a.y) - d.y * (p.x - a.x);
    cross * cross / len_sq
}

/// Returns the unclamped parameter of the projection of `p` onto the line
/// `a + t * (b - a)`.
#[must_use]
pub fn project_param(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return 0.0;
    }
    (p - a).dot(&d) / len_sq
}
