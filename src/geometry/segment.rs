use std::f64::consts::PI;

use crate::math::distance_2d::point_to_segment_dist;
use crate::math::intersect_2d::segment_segment_intersect_2d;
use crate::math::{Point2, Vector2, TOLERANCE};

/// A straight line segment between two endpoints.
///
/// Segments are ephemeral geometry: stitched strokes, bond candidates, or
/// the projection of a graph edge onto its node coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Point2,
    pub b: Point2,
}

impl Segment {
    #[must_use]
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.length() < TOLERANCE
    }

    /// Unit direction from `a` to `b`, or `None` for a zero-length segment.
    #[must_use]
    pub fn direction(&self) -> Option<Vector2> {
        let d = self.b - self.a;
        let len = d.norm();
        (len >= TOLERANCE).then(|| d / len)
    }

    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        Point2::from((self.a.coords + self.b.coords) * 0.5)
    }

    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2 {
        self.a + (self.b - self.a) * t
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.b, self.a)
    }

    #[must_use]
    pub fn endpoints(&self) -> [Point2; 2] {
        [self.a, self.b]
    }

    /// Undirected orientation in `[0, π)`.
    #[must_use]
    pub fn angle(&self) -> f64 {
        let d = self.b - self.a;
        d.y.atan2(d.x).rem_euclid(PI)
    }

    /// Smallest angle between the two undirected lines, in `[0, π/2]`.
    #[must_use]
    pub fn angle_between(&self, other: &Self) -> f64 {
        let diff = (self.angle() - other.angle()).abs();
        diff.min(PI - diff)
    }

    #[must_use]
    pub fn distance_to_point(&self, p: &Point2) -> f64 {
        point_to_segment_dist(p, &self.a, &self.b)
    }

    /// Bounded intersection with `other`: `(point, t_self, t_other)`.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<(Point2, f64, f64)> {
        segment_segment_intersect_2d(&self.a, &self.b, &other.a, &other.b)
    }

    /// The segment spanning the two mutually farthest endpoints of `self`
    /// and `other`.
    #[must_use]
    pub fn spanning(&self, other: &Self) -> Self {
        let pts = [self.a, self.b, other.a, other.b];
        let mut best = (*self, self.length());
        for i in 0..4 {
            for j in (i + 1)..4 {
                let d = (pts[j] - pts[i]).norm();
                if d > best.1 {
                    best = (Self::new(pts[i], pts[j]), d);
                }
            }
        }
        best.0
    }

    /// Smallest endpoint-to-endpoint distance, with the endpoint indices
    /// (`0` = `a`, `1` = `b`) on each segment.
    #[must_use]
    pub fn closest_endpoints(&self, other: &Self) -> (f64, usize, usize) {
        let mut best = (f64::INFINITY, 0, 0);
        for (i, p) in self.endpoints().iter().enumerate() {
            for (j, q) in other.endpoints().iter().enumerate() {
                let d = (q - p).norm();
                if d < best.0 {
                    best = (d, i, j);
                }
            }
        }
        best
    }
}
