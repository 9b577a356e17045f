use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{OperationError, Result};
use crate::geometry::Segment;
use crate::graph::ConnectionTable;
use crate::math::{Point2, Vector2};
use crate::operations::ensure_non_negative;
use crate::raster::PixelGrid;

/// Parameters for wedge and hash detection along edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StereoParams {
    /// Part of the edge that is sampled, as `(from, to)` parameters; the ends
    /// are left out because they run into neighbouring strokes.
    pub sample_range: (f64, f64),
    /// Half width (px) of the strip searched for ink at each sample.
    pub strip_half_width: i32,
    /// Largest distance (px) from a strip point to ink that still counts as
    /// ink. Rounded samples on diagonal strokes land up to one pixel off.
    pub ink_tolerance: f64,
    /// Fewest separate ink runs along a hashed bond.
    pub min_dash_runs: usize,
    /// Smallest share of empty samples along a hashed bond.
    pub min_dash_gap_fraction: f64,
    /// Widest half width (px) measured across a wedge.
    pub max_wedge_half_width: i32,
    /// Smallest wide-to-narrow width ratio of a wedge.
    pub min_wedge_ratio: f64,
    /// Smallest width difference (px) between the wedge ends.
    pub min_wedge_growth: f64,
}

impl Default for StereoParams {
    fn default() -> Self {
        Self {
            sample_range: (0.2, 0.8),
            strip_half_width: 2,
            ink_tolerance: 1.0,
            min_dash_runs: 3,
            min_dash_gap_fraction: 0.2,
            max_wedge_half_width: 10,
            min_wedge_ratio: 2.0,
            min_wedge_growth: 2.0,
        }
    }
}

impl StereoParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for an empty or reversed
    /// sample range, or negative or non-finite values.
    pub fn validate(&self) -> Result<()> {
        let (from, to) = self.sample_range;
        if !(0.0..=1.0).contains(&from) || !(0.0..=1.0).contains(&to) || from >= to {
            return Err(OperationError::InvalidInput(format!(
                "stereo.sample_range {from}..{to} must be an increasing range within 0..1"
            ))
            .into());
        }
        ensure_non_negative("stereo.strip_half_width", f64::from(self.strip_half_width))?;
        ensure_non_negative("stereo.ink_tolerance", self.ink_tolerance)?;
        ensure_non_negative("stereo.min_dash_gap_fraction", self.min_dash_gap_fraction)?;
        ensure_non_negative("stereo.max_wedge_half_width", f64::from(self.max_wedge_half_width))?;
        ensure_non_negative("stereo.min_wedge_ratio", self.min_wedge_ratio)?;
        ensure_non_negative("stereo.min_wedge_growth", self.min_wedge_growth)
    }
}

/// Stereo style read off the raster along one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stereo {
    Plain,
    Hashed,
    /// Solid wedge; `narrow_at_a` tells which end is the point.
    Wedge { narrow_at_a: bool },
}

/// Samples the raster along `seg` and classifies its stereo style.
///
/// Hashes are checked first: ink that comes and goes along the edge in at
/// least the configured number of runs. Otherwise the ink width across the
/// edge is compared between quarters of the sampled range.
#[must_use]
pub fn classify(grid: &PixelGrid, seg: &Segment, params: &StereoParams) -> Stereo {
    let Some(dir) = seg.direction() else {
        return Stereo::Plain;
    };
    let normal = Vector2::new(-dir.y, dir.x);
    let (from, to) = params.sample_range;
    let count = ((seg.length() * (to - from)).ceil() as usize).max(1) + 1;
    let samples: Vec<Point2> = (0..count)
        .map(|i| seg.point_at(from + (to - from) * i as f64 / (count - 1) as f64))
        .collect();

    let field = grid.distance_field();
    let on: Vec<bool> = samples
        .iter()
        .map(|p| {
            (-params.strip_half_width..=params.strip_half_width).any(|k| {
                field.distance_at(&(p + normal * f64::from(k))) <= params.ink_tolerance
            })
        })
        .collect();
    let runs = on
        .iter()
        .enumerate()
        .filter(|&(i, &v)| v && (i == 0 || !on[i - 1]))
        .count();
    let gap_fraction = on.iter().filter(|&&v| !v).count() as f64 / count as f64;
    if runs >= params.min_dash_runs && gap_fraction >= params.min_dash_gap_fraction {
        return Stereo::Hashed;
    }

    if count < 4 {
        return Stereo::Plain;
    }
    let widths: Vec<f64> = samples
        .iter()
        .map(|p| {
            width_across(params.max_wedge_half_width, |t| {
                let q = p + normal * t;
                grid.get(q.x.round() as i32, q.y.round() as i32)
            })
        })
        .collect();
    let quarter = count / 4;
    let means: Vec<f64> = (0..4)
        .map(|q| {
            let end = if q == 3 { count } else { (q + 1) * quarter };
            let chunk = &widths[q * quarter..end];
            chunk.iter().sum::<f64>() / chunk.len() as f64
        })
        .collect();

    let growing = means.windows(2).all(|w| w[1] >= w[0]);
    let shrinking = means.windows(2).all(|w| w[1] <= w[0]);
    let (narrow, wide) = (means[0].min(means[3]), means[0].max(means[3]));
    if (growing || shrinking)
        && narrow > 0.0
        && wide / narrow >= params.min_wedge_ratio
        && wide - narrow >= params.min_wedge_growth
    {
        return Stereo::Wedge {
            narrow_at_a: means[0] <= means[3],
        };
    }
    Stereo::Plain
}

/// Step (px) along the normal when measuring widths.
const WIDTH_STEP: f64 = 0.5;

/// Width (px) of the run of ink across the edge through the sample, or
/// through a point up to a pixel beside it. `ink` takes the offset in px.
fn width_across(max_half: i32, ink: impl Fn(f64) -> bool) -> f64 {
    let at = |s: i32| ink(f64::from(s) * WIDTH_STEP);
    let Some(start) = [0, -1, 1, -2, 2].into_iter().find(|&s| at(s)) else {
        return 0.0;
    };
    let limit = (f64::from(max_half) / WIDTH_STEP) as i32;
    let mut hi = start;
    while hi < limit && at(hi + 1) {
        hi += 1;
    }
    let mut lo = start;
    while lo > -limit && at(lo - 1) {
        lo -= 1;
    }
    f64::from(hi - lo + 1) * WIDTH_STEP
}

/// Tags hashed and wedge edges from the original raster.
///
/// Existing flags are never cleared. Wedge edges are reoriented so that
/// `a` is the narrow end.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn tag_stereo(
    table: &mut ConnectionTable,
    grid: &PixelGrid,
    params: &StereoParams,
) -> Result<(usize, usize)> {
    let mut updates = Vec::new();
    for (id, e) in table.edges() {
        if e.dash || e.wedge {
            continue;
        }
        match classify(grid, &table.edge_segment(id)?, params) {
            Stereo::Plain => {}
            style => updates.push((id, style)),
        }
    }

    let (mut hashed, mut wedges) = (0, 0);
    for (id, style) in updates {
        let edge = table.edge_mut(id)?;
        match style {
            Stereo::Hashed => {
                edge.dash = true;
                hashed += 1;
            }
            Stereo::Wedge { narrow_at_a } => {
                edge.wedge = true;
                if !narrow_at_a {
                    std::mem::swap(&mut edge.a, &mut edge.b);
                }
                wedges += 1;
            }
            Stereo::Plain => {}
        }
    }
    if hashed + wedges > 0 {
        trace!(hashed, wedges, "tagged stereo bonds");
    }
    Ok((hashed, wedges))
}
