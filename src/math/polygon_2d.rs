use spade::{DelaunayTriangulation, Point2 as SpadePoint2, Triangulation};

use super::{cross_2d, Point2, TOLERANCE};
use crate::error::{OperationError, Result};

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise in a y-up frame, which is clockwise on
/// screen because pixel rows grow downward.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns the area centroid of a simple polygon, or the vertex average when
/// the polygon is degenerate (fewer than 3 points or zero area).
#[must_use]
pub fn centroid(points: &[Point2]) -> Point2 {
    if points.is_empty() {
        return Point2::origin();
    }
    let area = signed_area(points);
    if area.abs() < TOLERANCE {
        let n = points.len() as f64;
        let (sx, sy) = points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Point2::new(sx / n, sy / n);
    }
    let n = points.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let w = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * w;
        cy += (p.y + q.y) * w;
    }
    Point2::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Tests whether `p` lies inside or on the boundary of a convex polygon,
/// independent of its winding.
#[must_use]
pub fn convex_contains(points: &[Point2], p: &Point2) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let eps = 1e-9;
    let (mut pos, mut neg) = (false, false);
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = cross_2d(&(b - a), &(p - a));
        if c > eps {
            pos = true;
        } else if c < -eps {
            neg = true;
        }
        if pos && neg {
            return false;
        }
    }
    true
}

/// Computes the convex hull of a point set.
///
/// Returns `None` when every point lies on a single line (including the
/// single-point case), since no polygon encloses such a set.
///
/// # Errors
///
/// Returns `OperationError::InvalidInput` if a point cannot be inserted
/// into the triangulation (non-finite coordinates).
pub fn convex_hull(points: &[Point2]) -> Result<Option<Vec<Point2>>> {
    let mut triangulation: DelaunayTriangulation<SpadePoint2<f64>> =
        DelaunayTriangulation::new();
    for p in points {
        triangulation
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e| OperationError::InvalidInput(format!("hull point {p}: {e:?}")))?;
    }

    if triangulation.num_vertices() < 3 || triangulation.all_vertices_on_line() {
        return Ok(None);
    }

    let hull = triangulation
        .convex_hull()
        .map(|edge| {
            let pos = edge.from().position();
            Point2::new(pos.x, pos.y)
        })
        .collect();
    Ok(Some(hull))
}
