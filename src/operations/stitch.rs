use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::ensure_non_negative;
use crate::error::{OperationError, Result};
use crate::geometry::Segment;
use crate::math::Point2;
use crate::raster::DistanceField;

/// Parameters for [`LineStitcher`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchParams {
    /// Largest endpoint gap (px) bridged by a merge.
    pub max_gap: f64,
    /// Largest direction difference between two long segments.
    pub angle_tolerance_deg: f64,
    /// Segments shorter than this (px) skip the direction check.
    pub min_angle_length: f64,
    /// Largest RMS distance-field value (px) along the merged line.
    pub fit_threshold: f64,
    /// Endpoints closer than this (px) count as shared.
    pub junction_radius: f64,
    /// Cap on the number of merges.
    pub max_iterations: usize,
    /// Shorter segments are dropped as degenerate.
    pub min_segment_length: f64,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            max_gap: 4.0,
            angle_tolerance_deg: 10.0,
            min_angle_length: 8.0,
            fit_threshold: 1.5,
            junction_radius: 1.0,
            max_iterations: 200,
            min_segment_length: 0.5,
        }
    }
}

impl StitchParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for negative or non-finite
    /// tolerances or a zero iteration cap.
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("stitch.max_gap", self.max_gap)?;
        ensure_non_negative("stitch.angle_tolerance_deg", self.angle_tolerance_deg)?;
        ensure_non_negative("stitch.min_angle_length", self.min_angle_length)?;
        ensure_non_negative("stitch.fit_threshold", self.fit_threshold)?;
        ensure_non_negative("stitch.junction_radius", self.junction_radius)?;
        ensure_non_negative("stitch.min_segment_length", self.min_segment_length)?;
        if self.max_iterations == 0 {
            return Err(
                OperationError::InvalidInput("stitch.max_iterations must be positive".into())
                    .into(),
            );
        }
        Ok(())
    }
}

/// Joins fragments of one stroke back into single segments.
///
/// Segments are processed longest first. A segment merges with its nearest
/// neighbour when the endpoint gap is small, neither touching endpoint is a
/// junction, the directions agree (for long segments), and the spanning
/// segment runs along ink. Merging repeats until a full pass changes nothing
/// or the merge cap is reached.
#[derive(Debug, Default)]
pub struct LineStitcher {
    params: StitchParams,
}

impl LineStitcher {
    #[must_use]
    pub fn new(params: StitchParams) -> Self {
        Self { params }
    }

    /// Stitches `segments`, measuring fit against `field`.
    #[must_use]
    pub fn execute(&self, segments: &[Segment], field: &DistanceField) -> Vec<Segment> {
        let p = &self.params;
        let mut segs: Vec<Segment> = segments
            .iter()
            .filter(|s| s.length() >= p.min_segment_length)
            .copied()
            .collect();
        let dropped = segments.len() - segs.len();
        if dropped > 0 {
            debug!(dropped, "dropped degenerate segments");
        }
        segs.sort_by(|a, b| b.length().total_cmp(&a.length()));

        let mut merges = 0usize;
        'passes: loop {
            let mut merged_in_pass = false;
            let mut i = 0;
            while i < segs.len() {
                let Some((j, merged)) = self.find_merge(&segs, i, field) else {
                    i += 1;
                    continue;
                };
                trace!(i, j, length = merged.length(), "stitched segments");
                segs[i] = merged;
                segs.remove(j);
                if j < i {
                    i -= 1;
                }
                merged_in_pass = true;
                merges += 1;
                if merges >= p.max_iterations {
                    warn!(merges, "stitching stopped at iteration cap");
                    break 'passes;
                }
            }
            if !merged_in_pass {
                break;
            }
        }

        debug!(input = segments.len(), output = segs.len(), merges, "stitched lines");
        segs
    }

    /// Nearest admissible partner of `segs[i]` and the merged segment.
    fn find_merge(
        &self,
        segs: &[Segment],
        i: usize,
        field: &DistanceField,
    ) -> Option<(usize, Segment)> {
        let p = &self.params;
        let tolerance = p.angle_tolerance_deg.to_radians();
        let seg = &segs[i];

        let mut candidates: Vec<(f64, usize)> = Vec::new();
        for (j, other) in segs.iter().enumerate() {
            if j == i {
                continue;
            }
            let (gap, ei, ej) = seg.closest_endpoints(other);
            if gap > p.max_gap {
                continue;
            }
            if is_junction(segs, &seg.endpoints()[ei], p.junction_radius)
                || is_junction(segs, &other.endpoints()[ej], p.junction_radius)
            {
                continue;
            }
            let both_long =
                seg.length() > p.min_angle_length && other.length() > p.min_angle_length;
            if both_long && seg.angle_between(other) > tolerance {
                continue;
            }
            candidates.push((gap, j));
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        candidates.into_iter().find_map(|(_, j)| {
            let other = &segs[j];
            let merged = seg.spanning(other);
            if field.line_rms(&merged.a, &merged.b) >= p.fit_threshold {
                return None;
            }
            let extends = merged.length() > seg.length().max(other.length());
            (extends || seg.intersection(other).is_some()).then_some((j, merged))
        })
    }
}

/// `true` when three or more segments end within `radius` of `point`.
fn is_junction(segs: &[Segment], point: &Point2, radius: f64) -> bool {
    segs.iter()
        .filter(|s| s.endpoints().iter().any(|e| (e - point).norm() <= radius))
        .count()
        >= 3
}
