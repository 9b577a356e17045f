//! Drawing helpers shared by the unit tests.

use tracing_subscriber::EnvFilter;

use crate::geometry::{LabelGuess, LabelShape, Shape};
use crate::math::Point2;
use crate::raster::PixelGrid;

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Bresenham line, both ends inclusive.
pub(crate) fn draw_line(grid: &mut PixelGrid, from: (i32, i32), to: (i32, i32)) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        grid.set(x, y, true);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Short strokes perpendicular to `from -> to`, one every `spacing` pixels
/// starting at `from`, each reaching `half_len` pixels to either side.
pub(crate) fn draw_hash_marks(
    grid: &mut PixelGrid,
    from: (i32, i32),
    to: (i32, i32),
    spacing: i32,
    half_len: i32,
) {
    let (dx, dy) = (f64::from(to.0 - from.0), f64::from(to.1 - from.1));
    let len = dx.hypot(dy);
    if len == 0.0 || spacing <= 0 {
        return;
    }
    let (ux, uy) = (dx / len, dy / len);
    let (nx, ny) = (-uy * f64::from(half_len), ux * f64::from(half_len));
    let steps = (len / f64::from(spacing)).floor() as i32;
    for k in 0..=steps {
        let t = f64::from(k * spacing);
        let cx = f64::from(from.0) + ux * t;
        let cy = f64::from(from.1) + uy * t;
        let a = ((cx + nx).round() as i32, (cy + ny).round() as i32);
        let b = ((cx - nx).round() as i32, (cy - ny).round() as i32);
        draw_line(grid, a, b);
    }
}

/// 10 x 12 px label box centred on `(cx, cy)`.
pub(crate) fn label_box(cx: f64, cy: f64, symbol: &str) -> LabelShape {
    LabelShape::new(
        Shape::rect(Point2::new(cx - 5.0, cy - 6.0), Point2::new(cx + 5.0, cy + 6.0)),
        vec![LabelGuess::new(symbol, 0.95)],
    )
}

/// Three-membered ring fused to a five-membered ring, with three hashed
/// bonds and two N-H substituents. The label glyphs are not drawn; see
/// [`fused_ring_labels`].
pub(crate) fn fused_ring_raster() -> PixelGrid {
    let (c1, c2, c3, c4, c5) = ((100, 100), (140, 100), (100, 140), (140, 140), (120, 175));
    let mut grid = PixelGrid::new(240, 280);
    for (a, b) in [(c1, c2), (c1, (118, 70)), (c2, (122, 70)), (c3, c5), (c4, c5)] {
        draw_line(&mut grid, a, b);
    }
    draw_line(&mut grid, (120, 60), (120, 32));
    draw_line(&mut grid, (120, 221), (120, 249));
    draw_hash_marks(&mut grid, (100, 103), (100, 138), 5, 3);
    draw_hash_marks(&mut grid, (140, 103), (140, 138), 5, 3);
    draw_hash_marks(&mut grid, (120, 177), (120, 207), 5, 3);
    grid
}

pub(crate) fn fused_ring_labels() -> Vec<LabelShape> {
    vec![
        label_box(120.0, 66.0, "N"),
        label_box(120.0, 26.0, "H"),
        label_box(120.0, 215.0, "N"),
        label_box(120.0, 255.0, "H"),
    ]
}
