use serde::{Deserialize, Serialize};

use super::chain_code::ChainCodeSequence;
use crate::geometry::Segment;
use crate::math::distance_2d::point_to_line_dist_sq;
use crate::math::Point2;

/// Parameters for [`DominantPoints`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominantPointParams {
    /// Candidates whose associated error (squared perpendicular distance,
    /// px²) stays below this value are discarded.
    pub aev_threshold: f64,
}

impl Default for DominantPointParams {
    fn default() -> Self {
        Self { aev_threshold: 2.0 }
    }
}

/// Polygonal approximation of a traced path.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point2>,
    pub closed: bool,
}

impl Polyline {
    /// Consecutive point pairs, plus the closing pair for closed polylines
    /// with at least three points.
    #[must_use]
    pub fn segments(&self) -> Vec<Segment> {
        let mut out: Vec<Segment> = self
            .points
            .windows(2)
            .map(|w| Segment::new(w[0], w[1]))
            .collect();
        if self.closed && self.points.len() >= 3 {
            if let (Some(&first), Some(&last)) = (self.points.first(), self.points.last()) {
                out.push(Segment::new(last, first));
            }
        }
        out
    }
}

/// Associated-error-value dominant point selection.
#[derive(Debug, Default)]
pub struct DominantPoints {
    params: DominantPointParams,
}

impl DominantPoints {
    #[must_use]
    pub fn new(params: DominantPointParams) -> Self {
        Self { params }
    }

    /// Break points of a chain: every pixel where the direction changes,
    /// plus the first and last pixel.
    #[must_use]
    pub fn break_points(seq: &ChainCodeSequence) -> Vec<Point2> {
        let points = seq.points();
        let mut out = Vec::new();
        if let Some(&first) = points.first() {
            out.push(first);
        }
        for i in 1..seq.codes.len() {
            if seq.codes[i] != seq.codes[i - 1] {
                out.push(points[i]);
            }
        }
        if points.len() > 1 {
            out.push(points[points.len() - 1]);
        }
        out
    }

    /// Simplifies a traced chain into a polyline.
    #[must_use]
    pub fn execute(&self, seq: &ChainCodeSequence) -> Polyline {
        let closed = seq.is_closed();
        Polyline {
            points: self.reduce(&Self::break_points(seq), closed),
            closed,
        }
    }

    /// Repeatedly drops the candidate with the smallest associated error
    /// while that error is below the threshold.
    ///
    /// Open curves always keep their first and last candidate; closed curves
    /// treat the list cyclically and keep at least a triangle.
    #[must_use]
    pub fn reduce(&self, candidates: &[Point2], closed: bool) -> Vec<Point2> {
        let mut pts = candidates.to_vec();
        if pts.len() <= 2 {
            return pts;
        }
        loop {
            let m = pts.len();
            if m < 3 || (closed && m <= 3) {
                break;
            }
            let range = if closed { 0..m } else { 1..m - 1 };
            let mut best: Option<(usize, f64)> = None;
            for i in range {
                let prev = pts[(i + m - 1) % m];
                let next = pts[(i + 1) % m];
                let err = point_to_line_dist_sq(&pts[i], &prev, &next);
                if best.is_none_or(|(_, e)| err < e) {
                    best = Some((i, err));
                }
            }
            match best {
                Some((i, err)) if err < self.params.aev_threshold => {
                    pts.remove(i);
                }
                _ => break,
            }
        }
        pts
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::raster::chain_code::ChainTracer;
    use crate::raster::grid::PixelGrid;

    fn trace(rows: &[&str]) -> Vec<ChainCodeSequence> {
        let mut grid = PixelGrid::from_ascii(rows).unwrap();
        ChainTracer::new().trace_all(&mut grid)
    }

    #[test]
    fn two_or_fewer_points_are_unchanged() {
        let dp = DominantPoints::default();
        let pts = vec![Point2::new(0.0, 0.0), Point2::new(3.0, 1.0)];
        assert_eq!(dp.reduce(&pts, false), pts);
        assert_eq!(dp.reduce(&pts[..1], false), pts[..1].to_vec());
        assert!(dp.reduce(&[], true).is_empty());
    }

    #[test]
    fn reduction_never_adds_points() {
        let dp = DominantPoints::default();
        let pts: Vec<Point2> = (0..12)
            .map(|i| Point2::new(f64::from(i), f64::from(i % 3)))
            .collect();
        for closed in [false, true] {
            assert!(dp.reduce(&pts, closed).len() <= pts.len());
        }
    }

    #[test]
    fn digital_straight_line_keeps_only_endpoints() {
        let seqs = trace(&["##.......", "..###....", ".....###.", "........#"]);
        assert_eq!(seqs.len(), 1);
        let poly = DominantPoints::default().execute(&seqs[0]);
        assert!(!poly.closed);
        assert_eq!(poly.points, vec![Point2::new(0.0, 0.0), Point2::new(8.0, 3.0)]);
    }

    #[test]
    fn l_shape_keeps_corner() {
        let seqs = trace(&[
            "#.......",
            "#.......",
            "#.......",
            "#.......",
            "#.......",
            "########",
        ]);
        let poly = DominantPoints::default().execute(&seqs[0]);
        assert_eq!(
            poly.points,
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 5.0),
                Point2::new(7.0, 5.0)
            ]
        );
        assert_eq!(poly.segments().len(), 2);
    }

    #[test]
    fn closed_square_outline_keeps_four_corners() {
        let seqs = trace(&[
            "########",
            "#......#",
            "#......#",
            "#......#",
            "#......#",
            "########",
        ]);
        assert_eq!(seqs.len(), 1);
        let poly = DominantPoints::default().execute(&seqs[0]);
        assert!(poly.closed);
        assert_eq!(poly.points.len(), 4);
        assert_eq!(poly.segments().len(), 4);
    }
}
