use std::cell::OnceCell;
use std::fmt;

use super::distance_field::DistanceField;
use crate::error::GridError;

const WORD_BITS: usize = 64;

/// Offsets of the 8-neighbourhood, clockwise from north on screen.
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Packed binary raster.
///
/// Bits are stored row-major, 64 pixels per word. The foreground density and
/// the distance field are derived lazily and cached; every mutating method
/// drops both caches.
#[derive(Clone)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    words: Vec<u64>,
    fraction_on: OnceCell<f64>,
    distance: OnceCell<DistanceField>,
}

impl PixelGrid {
    /// Creates an all-background grid.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let len = (width * height).div_ceil(WORD_BITS);
        Self {
            width,
            height,
            words: vec![0; len],
            fraction_on: OnceCell::new(),
            distance: OnceCell::new(),
        }
    }

    /// Creates a grid from a foreground predicate evaluated at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut grid = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    grid.set_index(y * width + x, true);
                }
            }
        }
        grid
    }

    /// Creates a grid from row-major booleans.
    ///
    /// # Errors
    ///
    /// Returns `GridError::SizeMismatch` if `pixels.len() != width * height`.
    pub fn from_bools(width: usize, height: usize, pixels: &[bool]) -> Result<Self, GridError> {
        let expected = width * height;
        if pixels.len() != expected {
            return Err(GridError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self::from_fn(width, height, |x, y| pixels[y * width + x]))
    }

    /// Parses rows of text where `#` or `1` is foreground and anything else
    /// is background.
    ///
    /// # Errors
    ///
    /// Returns `GridError::SizeMismatch` if the rows have different lengths.
    pub fn from_ascii(rows: &[&str]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut pixels = Vec::with_capacity(width * height);
        for row in rows {
            let before = pixels.len();
            pixels.extend(row.chars().map(|c| c == '#' || c == '1'));
            let got = pixels.len() - before;
            if got != width {
                return Err(GridError::SizeMismatch {
                    expected: width * height,
                    actual: before + got,
                });
            }
        }
        Self::from_bools(width, height, &pixels)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` if the grid has no pixels at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Returns the pixel at `(x, y)`; out-of-bounds reads are background.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = y as usize * self.width + x as usize;
        (self.words[idx / WORD_BITS] >> (idx % WORD_BITS)) & 1 == 1
    }

    /// Sets the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, on: bool) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.set_index(idx, on);
    }

    fn set_index(&mut self, idx: usize, on: bool) {
        let mask = 1u64 << (idx % WORD_BITS);
        let word = &mut self.words[idx / WORD_BITS];
        let before = *word;
        if on {
            *word |= mask;
        } else {
            *word &= !mask;
        }
        if *word != before {
            self.invalidate();
        }
    }

    /// Turns every pixel off.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.fraction_on.take();
        self.distance.take();
    }

    /// Returns a new grid with foreground and background swapped.
    #[must_use]
    pub fn invert(&self) -> Self {
        let mut out = Self::new(self.width, self.height);
        for (dst, src) in out.words.iter_mut().zip(&self.words) {
            *dst = !src;
        }
        let tail = (self.width * self.height) % WORD_BITS;
        if tail != 0 {
            if let Some(last) = out.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        out
    }

    /// Copies the `width × height` region whose top-left pixel is `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns `GridError::EmptyRegion` for a zero-sized region and
    /// `GridError::RegionOutOfBounds` if the region leaves the grid.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyRegion);
        }
        if x + width > self.width || y + height > self.height {
            return Err(GridError::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                grid_width: self.width,
                grid_height: self.height,
            });
        }
        Ok(Self::from_fn(width, height, |cx, cy| {
            self.get((x + cx) as i32, (y + cy) as i32)
        }))
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn count_on(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Fraction of pixels that are foreground; `0.0` for an empty grid.
    #[must_use]
    pub fn fraction_on(&self) -> f64 {
        *self.fraction_on.get_or_init(|| {
            let total = self.width * self.height;
            if total == 0 {
                0.0
            } else {
                self.count_on() as f64 / total as f64
            }
        })
    }

    /// Approximate distance from each pixel to the nearest foreground pixel.
    pub fn distance_field(&self) -> &DistanceField {
        self.distance.get_or_init(|| DistanceField::compute(self))
    }

    /// Number of foreground pixels among the 8 neighbours of `(x, y)`.
    #[must_use]
    pub fn neighbor_count(&self, x: i32, y: i32) -> usize {
        NEIGHBORS_8
            .iter()
            .filter(|(dx, dy)| self.get(x + dx, y + dy))
            .count()
    }

    /// Iterates over foreground pixels in raster order.
    pub fn iter_on(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.width;
        self.words.iter().enumerate().flat_map(move |(wi, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let idx = wi * WORD_BITS + bit;
                Some(((idx % width) as i32, (idx / width) as i32))
            })
        })
    }

    /// Returns the first foreground pixel in raster order.
    #[must_use]
    pub fn first_on(&self) -> Option<(i32, i32)> {
        self.iter_on().next()
    }
}

impl PartialEq for PixelGrid {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.words == other.words
    }
}

impl Eq for PixelGrid {}

impl fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PixelGrid {}x{}", self.width, self.height)?;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                f.write_str(if self.get(x, y) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
