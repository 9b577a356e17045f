use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ensure_non_negative;
use super::group::BondLine;
use crate::error::Result;
use crate::geometry::{LabelShape, Segment};
use crate::math::Point2;
use crate::raster::Labeling;

/// Parameters for [`DashDetector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashParams {
    /// Components whose bounding box is larger than this on either side
    /// (px) are not hash marks.
    pub max_dash_size: i32,
    /// Largest distance (px) between consecutive mark centres.
    pub max_dash_gap: f64,
    /// Largest change of direction along a chain.
    pub max_turn_deg: f64,
    /// Fewest marks that make a hashed bond.
    pub min_dashes: usize,
}

impl Default for DashParams {
    fn default() -> Self {
        Self {
            max_dash_size: 8,
            max_dash_gap: 10.0,
            max_turn_deg: 15.0,
            min_dashes: 3,
        }
    }
}

impl DashParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for negative or non-finite
    /// values.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("dashes.max_dash_gap", self.max_dash_gap)?;
        ensure_non_negative("dashes.max_turn_deg", self.max_turn_deg)?;
        ensure_non_negative("dashes.max_dash_size", f64::from(self.max_dash_size))
    }
}

/// A hashed bond found among small components.
#[derive(Debug, Clone, PartialEq)]
pub struct DashedCandidate {
    pub bond: BondLine,
    /// Component ids of the marks, in chain order.
    pub components: Vec<u32>,
}

/// Finds rows of small, evenly spaced marks that form hashed bonds.
///
/// Thinning turns every hash mark into a short stub that the tracer would
/// report as a tiny segment; detecting the row up front keeps the bond in
/// one piece.
#[derive(Debug, Default)]
pub struct DashDetector {
    params: DashParams,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    id: u32,
    centre: Point2,
}

impl DashDetector {
    #[must_use]
    pub fn new(params: DashParams) -> Self {
        Self { params }
    }

    /// Chains small components outside `labels` into hashed bond candidates.
    #[must_use]
    pub fn execute(&self, labeling: &Labeling, labels: &[LabelShape]) -> Vec<DashedCandidate> {
        let marks: Vec<Mark> = labeling
            .components()
            .iter()
            .filter(|c| c.width().max(c.height()) <= self.params.max_dash_size)
            .filter_map(|c| {
                let pixels = labeling.pixels(c.id);
                let n = pixels.len() as f64;
                let (sx, sy) = pixels.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| {
                    (sx + f64::from(x), sy + f64::from(y))
                });
                let centre = Point2::new(sx / n, sy / n);
                (!labels.iter().any(|l| l.shape.contains(&centre))).then_some(Mark {
                    id: c.id,
                    centre,
                })
            })
            .collect();

        let mut used = vec![false; marks.len()];
        let mut out = Vec::new();
        for start in 0..marks.len() {
            if used[start] {
                continue;
            }
            let chain = self.grow_chain(&marks, &used, start);
            if chain.len() < self.params.min_dashes {
                continue;
            }
            for &k in &chain {
                used[k] = true;
            }
            let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
                continue;
            };
            out.push(DashedCandidate {
                bond: BondLine::dashed(Segment::new(marks[first].centre, marks[last].centre)),
                components: chain.iter().map(|&k| marks[k].id).collect(),
            });
        }

        debug!(marks = marks.len(), dashed = out.len(), "detected hashed bonds");
        out
    }

    /// Greedy chain through `start`, extended at both ends.
    fn grow_chain(&self, marks: &[Mark], used: &[bool], start: usize) -> Vec<usize> {
        let mut chain = vec![start];
        let Some(second) = self.next_mark(marks, used, &chain, None) else {
            return chain;
        };
        chain.push(second);
        while let Some(k) = self.next_mark(marks, used, &chain, chain.len().checked_sub(2)) {
            chain.push(k);
        }
        chain.reverse();
        while let Some(k) = self.next_mark(marks, used, &chain, chain.len().checked_sub(2)) {
            chain.push(k);
        }
        chain
    }

    /// Nearest unused mark continuing `chain` from its last element.
    fn next_mark(
        &self,
        marks: &[Mark],
        used: &[bool],
        chain: &[usize],
        prev: Option<usize>,
    ) -> Option<usize> {
        let &tail = chain.last()?;
        let heading = prev.map(|p| marks[tail].centre - marks[chain[p]].centre);
        let max_turn = self.params.max_turn_deg.to_radians();
        let mut best: Option<(f64, usize)> = None;
        for (k, m) in marks.iter().enumerate() {
            if used[k] || chain.contains(&k) {
                continue;
            }
            let step = m.centre - marks[tail].centre;
            let gap = step.norm();
            if gap > self.params.max_dash_gap || gap == 0.0 {
                continue;
            }
            if let Some(h) = heading {
                let cos = h.dot(&step) / (h.norm() * gap);
                if cos.clamp(-1.0, 1.0).acos() > max_turn {
                    continue;
                }
            }
            if best.is_none_or(|(d, _)| gap < d) {
                best = Some((gap, k));
            }
        }
        best.map(|(_, k)| k)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::raster::{ComponentLabeler, PixelGrid};
    use crate::test_support::{draw_hash_marks, draw_line};

    #[test]
    fn row_of_marks_becomes_dashed_bond() {
        let mut grid = PixelGrid::new(80, 40);
        draw_hash_marks(&mut grid, (10, 20), (40, 20), 5, 3);
        draw_line(&mut grid, (50, 5), (75, 35));
        let labeling = ComponentLabeler::default().execute(&grid);
        let found = DashDetector::default().execute(&labeling, &[]);
        assert_eq!(found.len(), 1);
        let bond = found[0].bond;
        assert!(bond.dash_hint);
        assert_eq!(bond.order, 1);
        approx::assert_relative_eq!(bond.segment.length(), 30.0, epsilon = 1e-9);
        assert_eq!(found[0].components.len(), 7);
    }

    #[test]
    fn scattered_dots_are_not_a_bond() {
        let dots = [(5, 5), (12, 30), (40, 8)];
        let grid = PixelGrid::from_fn(60, 60, |x, y| dots.contains(&(x, y)));
        let labeling = ComponentLabeler::default().execute(&grid);
        assert!(DashDetector::default().execute(&labeling, &[]).is_empty());
    }

    #[test]
    fn marks_under_labels_are_ignored() {
        let mut grid = PixelGrid::new(80, 40);
        draw_hash_marks(&mut grid, (10, 20), (40, 20), 5, 3);
        let labeling = ComponentLabeler::default().execute(&grid);
        let label = LabelShape::new(
            Shape::rect(Point2::new(0.0, 0.0), Point2::new(80.0, 40.0)),
            Vec::new(),
        );
        assert!(DashDetector::default().execute(&labeling, &[label]).is_empty());
    }
}
