use serde::{Deserialize, Serialize};
use tracing::debug;

use super::grid::{PixelGrid, NEIGHBORS_8};

/// Which contour-removal rule set the [`Skeletonizer`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThinningRule {
    /// Zhang–Suen two-sub-iteration thinning.
    #[default]
    Classic,
    /// Zhang–Suen plus corner preservation: keeps the north-west pixel of an
    /// isolated 2×2 block and the end pixel of a two-pixel-thick stroke.
    Improved,
}

/// Iterative thinning to a one-pixel-wide skeleton.
///
/// Pixels are only marked during a sub-pass and removed once the sub-pass
/// has finished, so the result does not depend on scan order. The loop ends
/// after a full round (both sub-iterations) removes nothing, which makes the
/// output a fixed point of the operator.
#[derive(Debug, Default)]
pub struct Skeletonizer {
    rule: ThinningRule,
}

impl Skeletonizer {
    #[must_use]
    pub fn new(rule: ThinningRule) -> Self {
        Self { rule }
    }

    /// Returns the skeleton of `grid` as a new grid.
    #[must_use]
    pub fn execute(&self, grid: &PixelGrid) -> PixelGrid {
        let mut out = grid.clone();
        let mut rounds = 0usize;
        loop {
            let mut removed = 0usize;
            for sub in [SubIteration::SouthEast, SubIteration::NorthWest] {
                let marked: Vec<(i32, i32)> = out
                    .iter_on()
                    .filter(|&(x, y)| self.deletable(&out, x, y, sub))
                    .collect();
                for &(x, y) in &marked {
                    out.set(x, y, false);
                }
                removed += marked.len();
            }
            if removed == 0 {
                break;
            }
            rounds += 1;
        }
        debug!(
            rounds,
            before = grid.count_on(),
            after = out.count_on(),
            rule = ?self.rule,
            "thinned grid"
        );
        out
    }

    fn deletable(&self, grid: &PixelGrid, x: i32, y: i32, sub: SubIteration) -> bool {
        let n = neighbourhood(grid, x, y);
        let b = n.iter().filter(|&&v| v).count();
        if !(2..=6).contains(&b) {
            return false;
        }
        let a = (0..8).filter(|&i| !n[i] && n[(i + 1) % 8]).count();
        if a != 1 {
            return false;
        }

        let [p2, _, p4, _, p6, _, p8, _] = n;
        let products_clear = match sub {
            SubIteration::SouthEast => !(p2 && p4 && p6) && !(p4 && p6 && p8),
            SubIteration::NorthWest => !(p2 && p4 && p8) && !(p2 && p6 && p8),
        };
        if !products_clear {
            return false;
        }

        match self.rule {
            ThinningRule::Classic => true,
            ThinningRule::Improved => !preserves_corner(&n, b),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SubIteration {
    SouthEast,
    NorthWest,
}

/// Neighbour values P2..P9: N, NE, E, SE, S, SW, W, NW.
fn neighbourhood(grid: &PixelGrid, x: i32, y: i32) -> [bool; 8] {
    let mut n = [false; 8];
    for (slot, &(dx, dy)) in n.iter_mut().zip(&NEIGHBORS_8) {
        *slot = grid.get(x + dx, y + dy);
    }
    n
}

fn preserves_corner(n: &[bool; 8], b: usize) -> bool {
    let [_, _, p4, p5, p6, _, _, _] = *n;
    // North-west pixel of an isolated 2×2 block.
    if b == 3 && p4 && p5 && p6 {
        return true;
    }
    // End of a two-pixel-thick stroke: both neighbours adjacent on the ring.
    if b == 2 {
        let set: Vec<usize> = (0..8).filter(|&i| n[i]).collect();
        return set[1] == set[0] + 1 || (set[0] == 0 && set[1] == 7);
    }
    false
}
