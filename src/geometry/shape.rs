use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::distance_2d::point_to_segment_dist;
use crate::math::polygon_2d::{centroid, convex_contains, convex_hull};
use crate::math::Point2;

/// Outline style for component shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Axis-aligned bounding box.
    #[default]
    Box,
    /// Convex hull of the member pixels.
    ConvexPolygon,
}

/// An axis-aligned box or convex polygon; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    kind: ShapeKind,
    points: Vec<Point2>,
}

impl Shape {
    /// Creates a box from two opposite corners.
    #[must_use]
    pub fn rect(min: Point2, max: Point2) -> Self {
        let (x0, x1) = (min.x.min(max.x), min.x.max(max.x));
        let (y0, y1) = (min.y.min(max.y), min.y.max(max.y));
        Self {
            kind: ShapeKind::Box,
            points: vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ],
        }
    }

    /// Creates the convex hull of `points`, or their bounding box when they
    /// are all collinear.
    ///
    /// # Errors
    ///
    /// Returns an error if a point has non-finite coordinates.
    pub fn hull_of(points: &[Point2]) -> Result<Self> {
        if let Some(hull) = convex_hull(points)? {
            return Ok(Self {
                kind: ShapeKind::ConvexPolygon,
                points: hull,
            });
        }
        let (min, max) = bounds_of(points);
        Ok(Self::rect(min, max))
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Axis-aligned `(min, max)` corners.
    #[must_use]
    pub fn bounds(&self) -> (Point2, Point2) {
        bounds_of(&self.points)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        let (min, max) = self.bounds();
        max.x - min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        let (min, max) = self.bounds();
        max.y - min.y
    }

    #[must_use]
    pub fn centroid(&self) -> Point2 {
        centroid(&self.points)
    }

    /// Inside-or-on-boundary test.
    #[must_use]
    pub fn contains(&self, p: &Point2) -> bool {
        match self.kind {
            ShapeKind::Box => {
                let (min, max) = self.bounds();
                p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
            }
            ShapeKind::ConvexPolygon => convex_contains(&self.points, p),
        }
    }

    /// Distance from `p` to the shape; zero inside.
    #[must_use]
    pub fn distance_to(&self, p: &Point2) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        let n = self.points.len();
        (0..n)
            .map(|i| point_to_segment_dist(p, &self.points[i], &self.points[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min)
    }
}

fn bounds_of(points: &[Point2]) -> (Point2, Point2) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_and_distance() {
        let s = Shape::rect(Point2::new(2.0, 2.0), Point2::new(0.0, 0.0));
        assert!(s.contains(&Point2::new(1.0, 1.0)));
        assert!(s.contains(&Point2::new(2.0, 0.0)));
        assert!(!s.contains(&Point2::new(3.0, 1.0)));
        assert!((s.distance_to(&Point2::new(5.0, 1.0)) - 3.0).abs() < 1e-12);
        assert!(s.distance_to(&Point2::new(1.5, 0.5)).abs() < 1e-12);
        let c = s.centroid();
        assert!((c.x - 1.0).abs() < 1e-12 && (c.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hull_shape_of_triangle() {
        let s = Shape::hull_of(&[
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 4.0),
            Point2::new(1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(s.kind(), ShapeKind::ConvexPolygon);
        assert_eq!(s.points().len(), 3);
        assert!(s.contains(&Point2::new(1.0, 1.0)));
        // Inside the bounding box but outside the hull.
        assert!(!s.contains(&Point2::new(3.0, 3.0)));
    }

    #[test]
    fn collinear_hull_falls_back_to_box() {
        let s = Shape::hull_of(&[Point2::new(0.0, 0.0), Point2::new(3.0, 3.0)]).unwrap();
        assert_eq!(s.kind(), ShapeKind::Box);
        assert!((s.width() - 3.0).abs() < 1e-12);
    }
}
