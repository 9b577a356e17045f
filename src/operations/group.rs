use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ensure_non_negative;
use crate::error::Result;
use crate::geometry::Segment;
use crate::graph::MAX_ORDER;
use crate::math::distance_2d::{point_to_line_dist_sq, project_param};
use crate::union_find::UnionFind;

/// Parameters for [`BondGrouper`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupParams {
    pub angle_tolerance_deg: f64,
    /// Largest offset of the shorter line's midpoint from the longer line,
    /// as a fraction of the longer line's length.
    pub max_rejection_ratio: f64,
    /// Smallest shared extent, as a fraction of the shorter line's length.
    pub min_overlap: f64,
}

impl Default for GroupParams {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: 10.0,
            max_rejection_ratio: 0.35,
            min_overlap: 0.5,
        }
    }
}

impl GroupParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for negative or non-finite
    /// values.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("group.angle_tolerance_deg", self.angle_tolerance_deg)?;
        ensure_non_negative("group.max_rejection_ratio", self.max_rejection_ratio)?;
        ensure_non_negative("group.min_overlap", self.min_overlap)
    }
}

/// A bond candidate: representative geometry plus an order estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondLine {
    pub segment: Segment,
    pub order: u8,
    /// Drawn as a row of short hash marks.
    pub dash_hint: bool,
}

impl BondLine {
    #[must_use]
    pub fn single(segment: Segment) -> Self {
        Self {
            segment,
            order: 1,
            dash_hint: false,
        }
    }

    #[must_use]
    pub fn dashed(segment: Segment) -> Self {
        Self {
            dash_hint: true,
            ..Self::single(segment)
        }
    }
}

/// Collapses parallel strokes of double and triple bonds.
#[derive(Debug, Default, Clone)]
pub struct BondGrouper {
    params: GroupParams,
}

impl BondGrouper {
    #[must_use]
    pub fn new(params: GroupParams) -> Self {
        Self { params }
    }

    /// `true` when `a` and `b` look like two strokes of one bond: nearly
    /// parallel, close to each other and overlapping along their length.
    #[must_use]
    pub fn is_parallel_pair(&self, a: &Segment, b: &Segment) -> bool {
        let (long, short) = if a.length() >= b.length() { (a, b) } else { (b, a) };
        let (Some(dl), Some(ds)) = (long.direction(), short.direction()) else {
            return false;
        };
        if dl.dot(&ds).abs() < self.params.angle_tolerance_deg.to_radians().cos() {
            return false;
        }

        let ref_len = long.length();
        let rejection = point_to_line_dist_sq(&short.midpoint(), &long.a, &long.b).sqrt();
        if rejection >= self.params.max_rejection_ratio * ref_len {
            return false;
        }

        let t0 = project_param(&short.a, &long.a, &long.b);
        let t1 = project_param(&short.b, &long.a, &long.b);
        let shared = (t0.max(t1).min(1.0) - t0.min(t1).max(0.0)).max(0.0) * ref_len;
        shared >= self.params.min_overlap * short.length()
    }

    /// Groups `segments` and returns one bond line per group, in order of
    /// each group's first member.
    #[must_use]
    pub fn execute(&self, segments: &[Segment]) -> Vec<BondLine> {
        let mut uf = UnionFind::new(segments.len());
        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                if self.is_parallel_pair(&segments[i], &segments[j]) {
                    uf.union(i, j);
                }
            }
        }

        let bonds: Vec<BondLine> = uf
            .groups()
            .into_iter()
            .filter_map(|members| {
                let longest = members
                    .iter()
                    .map(|&m| segments[m])
                    .reduce(|best, s| if s.length() > best.length() { s } else { best })?;
                let order = u8::try_from(members.len()).unwrap_or(MAX_ORDER).min(MAX_ORDER);
                Some(BondLine {
                    segment: longest,
                    order,
                    dash_hint: false,
                })
            })
            .collect();

        debug!(
            segments = segments.len(),
            bonds = bonds.len(),
            multiple = bonds.iter().filter(|b| b.order > 1).count(),
            "grouped bond strokes"
        );
        bonds
    }
}
