use super::grid::{PixelGrid, NEIGHBORS_8};
use crate::math::Point2;

/// Quantization factor: stored values are distances in quarter pixels.
pub const DISTANCE_SCALE: f64 = 4.0;

/// Clamp value; also returned for pixels the relaxation never reached.
pub const MAX_DISTANCE: u8 = u8::MAX;

const RELAXATION_PASSES: usize = 5;

/// Approximate distance-to-nearest-foreground map.
///
/// Every background pixel tracks the x and y offsets to its nearest known
/// foreground pixel separately, so diagonal steps do not accumulate the
/// bias a single chamfer scalar would. Only five relaxation passes run:
/// far from the ink the values are an approximation of the Euclidean
/// transform, close to it they are exact enough for line-fit scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceField {
    width: usize,
    height: usize,
    values: Vec<u8>,
}

impl DistanceField {
    pub(crate) fn compute(grid: &PixelGrid) -> Self {
        let (width, height) = (grid.width(), grid.height());
        let mut offsets: Vec<Option<(i32, i32)>> = (0..width * height)
            .map(|idx| grid.get((idx % width) as i32, (idx / width) as i32).then_some((0, 0)))
            .collect();

        for pass in 0..RELAXATION_PASSES {
            let forward = pass % 2 == 0;
            for step in 0..width * height {
                let idx = if forward { step } else { width * height - 1 - step };
                if offsets[idx] == Some((0, 0)) {
                    continue;
                }
                let (x, y) = ((idx % width) as i32, (idx / width) as i32);
                let mut best = offsets[idx].map_or(i64::MAX, len_sq);
                for &(dx, dy) in &NEIGHBORS_8 {
                    let (nx, ny) = (x + dx, y + dy);
                    if !grid.in_bounds(nx, ny) {
                        continue;
                    }
                    let Some((ox, oy)) = offsets[ny as usize * width + nx as usize] else {
                        continue;
                    };
                    let candidate = (ox + dx.abs(), oy + dy.abs());
                    let l = len_sq(candidate);
                    if l < best {
                        best = l;
                        offsets[idx] = Some(candidate);
                    }
                }
            }
        }

        let values = offsets
            .into_iter()
            .map(|o| {
                o.map_or(MAX_DISTANCE, |off| {
                    let d = (len_sq(off) as f64).sqrt() * DISTANCE_SCALE;
                    d.round().min(f64::from(MAX_DISTANCE)) as u8
                })
            })
            .collect();

        Self {
            width,
            height,
            values,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Quantized value at `(x, y)`; out-of-bounds is [`MAX_DISTANCE`].
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return MAX_DISTANCE;
        }
        self.values[y as usize * self.width + x as usize]
    }

    /// Distance in pixels at the pixel nearest to `p`.
    #[must_use]
    pub fn distance_at(&self, p: &Point2) -> f64 {
        f64::from(self.get(p.x.round() as i32, p.y.round() as i32)) / DISTANCE_SCALE
    }

    /// Root-mean-square distance sampled at ≤ 1 px spacing along `a`–`b`.
    ///
    /// Low values mean the segment runs along the ink.
    #[must_use]
    pub fn line_rms(&self, a: &Point2, b: &Point2) -> f64 {
        let len = (b - a).norm();
        let samples = (len.ceil() as usize).max(1) + 1;
        let sum_sq: f64 = (0..samples)
            .map(|i| {
                let t = i as f64 / (samples - 1) as f64;
                let d = self.distance_at(&(a + (b - a) * t));
                d * d
            })
            .sum();
        (sum_sq / samples as f64).sqrt()
    }
}

fn len_sq((x, y): (i32, i32)) -> i64 {
    i64::from(x) * i64::from(x) + i64::from(y) * i64::from(y)
}
