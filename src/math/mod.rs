pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;

/// 2D point type. Pixel centres sit on integer coordinates, y grows downward.
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Z-component of the cross product of two 2D vectors.
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}
