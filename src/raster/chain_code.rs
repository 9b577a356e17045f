use tracing::debug;

use super::grid::{PixelGrid, NEIGHBORS_8};
use crate::math::Point2;

/// One of the eight pixel-step directions.
///
/// `0` is east and codes increase counter-clockwise as seen on screen
/// (`2` is north, i.e. one row up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainCode(u8);

impl ChainCode {
    const OFFSETS: [(i32, i32); 8] = [
        (1, 0),
        (1, -1),
        (0, -1),
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Returns `None` for values outside `0..8`.
    #[must_use]
    pub fn new(code: u8) -> Option<Self> {
        (code < 8).then_some(Self(code))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn offset(self) -> (i32, i32) {
        Self::OFFSETS[self.0 as usize]
    }

    #[must_use]
    pub fn from_offset(dx: i32, dy: i32) -> Option<Self> {
        Self::OFFSETS
            .iter()
            .position(|&o| o == (dx, dy))
            .map(|i| Self(i as u8))
    }

    /// Number of 45° steps between two directions, in `0..=4`.
    #[must_use]
    pub fn turn(self, other: Self) -> u8 {
        let d = self.0.abs_diff(other.0);
        d.min(8 - d)
    }

    fn all() -> impl Iterator<Item = Self> {
        (0..8).map(Self)
    }
}

/// A traced pixel path: a start pixel and the steps taken from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCodeSequence {
    pub start: (i32, i32),
    pub codes: Vec<ChainCode>,
}

impl ChainCodeSequence {
    /// Pixel positions visited, starting with `start`.
    #[must_use]
    pub fn pixels(&self) -> Vec<(i32, i32)> {
        let mut out = Vec::with_capacity(self.codes.len() + 1);
        let mut cur = self.start;
        out.push(cur);
        for code in &self.codes {
            let (dx, dy) = code.offset();
            cur = (cur.0 + dx, cur.1 + dy);
            out.push(cur);
        }
        out
    }

    /// Pixel centres of the path as points.
    #[must_use]
    pub fn points(&self) -> Vec<Point2> {
        self.pixels()
            .into_iter()
            .map(|(x, y)| Point2::new(f64::from(x), f64::from(y)))
            .collect()
    }

    /// `true` when the path ends next to where it started.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        if self.codes.len() < 3 {
            return false;
        }
        let end = self.pixels()[self.codes.len()];
        (end.0 - self.start.0).abs() <= 1 && (end.1 - self.start.1).abs() <= 1
    }
}

/// Consuming skeleton tracer.
///
/// Every traced pixel is cleared from the grid; when [`trace_all`] returns
/// the grid is empty.
///
/// [`trace_all`]: ChainTracer::trace_all
#[derive(Debug, Default)]
pub struct ChainTracer;

impl ChainTracer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Traces every remaining foreground pixel into chain-code sequences.
    pub fn trace_all(&self, grid: &mut PixelGrid) -> Vec<ChainCodeSequence> {
        let mut sequences = Vec::new();
        let mut dropped = 0usize;
        while let Some(start) = grid.first_on() {
            let seq = trace_one(grid, start);
            let path = seq.pixels();
            dropped += clear_orphans(grid, &path);
            if seq.codes.is_empty() {
                dropped += 1;
            } else {
                sequences.push(seq);
            }
        }
        debug!(sequences = sequences.len(), dropped, "traced skeleton");
        sequences
    }
}

/// Follows the path from `start`, preferring the neighbour with the fewest
/// remaining neighbours of its own, then the smallest turn.
fn trace_one(grid: &mut PixelGrid, start: (i32, i32)) -> ChainCodeSequence {
    grid.set(start.0, start.1, false);
    let mut cur = start;
    let mut heading: Option<ChainCode> = None;
    let mut codes = Vec::new();

    loop {
        let mut best: Option<(usize, u8, ChainCode)> = None;
        for code in ChainCode::all() {
            let (dx, dy) = code.offset();
            let (nx, ny) = (cur.0 + dx, cur.1 + dy);
            // Visited pixels are already cleared, so the path never revisits one.
            if !grid.get(nx, ny) {
                continue;
            }
            let key = (
                grid.neighbor_count(nx, ny),
                heading.map_or(0, |h| h.turn(code)),
                code,
            );
            if best.is_none_or(|b| key < b) {
                best = Some(key);
            }
        }
        let Some((_, _, code)) = best else { break };
        let (dx, dy) = code.offset();
        cur = (cur.0 + dx, cur.1 + dy);
        grid.set(cur.0, cur.1, false);
        codes.push(code);
        heading = Some(code);
    }

    ChainCodeSequence { start, codes }
}

/// Clears pixels next to `path` that were left without any neighbour.
fn clear_orphans(grid: &mut PixelGrid, path: &[(i32, i32)]) -> usize {
    let mut cleared = 0;
    for &(x, y) in path {
        for &(dx, dy) in &NEIGHBORS_8 {
            let (nx, ny) = (x + dx, y + dy);
            if grid.get(nx, ny) && grid.neighbor_count(nx, ny) == 0 {
                grid.set(nx, ny, false);
                cleared += 1;
            }
        }
    }
    cleared
}
