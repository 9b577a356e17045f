//! End-to-end reconstruction: raster in, connection table out.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OperationError, Result};
use crate::geometry::{LabelShape, Segment};
use crate::graph::{ConnectionTable, TableSnapshot};
use crate::math::Point2;
use crate::operations::{
    ensure_non_negative, BondGrouper, BuildParams, ConnectionTableBuilder, DashDetector,
    DashParams, GroupParams, LineStitcher, StitchParams,
};
use crate::raster::{
    ChainTracer, ComponentLabeler, DominantPointParams, DominantPoints, Labeling, LabelingParams,
    PixelGrid, Skeletonizer, ThinningRule,
};
use crate::recognition::RecognizerChain;

/// Parameters for every stage of the [`Pipeline`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineParams {
    pub labeling: LabelingParams,
    pub thinning: ThinningRule,
    pub dominant: DominantPointParams,
    pub dashes: DashParams,
    pub stitch: StitchParams,
    pub group: GroupParams,
    pub build: BuildParams,
}

impl PipelineParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.labeling.max_labels == 0 {
            return Err(
                OperationError::InvalidInput("labeling.max_labels must be positive".into()).into(),
            );
        }
        ensure_non_negative("dominant.aev_threshold", self.dominant.aev_threshold)?;
        self.dashes.validate()?;
        self.stitch.validate()?;
        self.group.validate()?;
        self.build.validate()
    }
}

/// Runs labeling, thinning, tracing, stitching, grouping and table
/// construction in order.
#[derive(Debug, Default)]
pub struct Pipeline {
    params: PipelineParams,
}

impl Pipeline {
    #[must_use]
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Reconstructs the connection table of `grid` with externally
    /// recognized `labels`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for invalid parameters.
    pub fn run(&self, grid: &PixelGrid, labels: &[LabelShape]) -> Result<TableSnapshot> {
        Ok(self.build_table(grid, labels)?.snapshot())
    }

    /// Like [`run`](Self::run), with labels found by `recognizer` among the
    /// components of `grid`.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for invalid parameters.
    pub fn run_with_recognizer(
        &self,
        grid: &PixelGrid,
        recognizer: &RecognizerChain,
    ) -> Result<TableSnapshot> {
        self.params.validate()?;
        if grid.is_empty() || grid.count_on() == 0 {
            return Ok(TableSnapshot::default());
        }
        let labeling = ComponentLabeler::new(self.params.labeling.clone()).execute(grid);
        let labels = recognizer.label_shapes(grid, &labeling)?;
        Ok(self.reconstruct(grid, &labeling, &labels)?.snapshot())
    }

    /// Same as [`run`](Self::run) but returns the live table.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for invalid parameters.
    pub fn build_table(&self, grid: &PixelGrid, labels: &[LabelShape]) -> Result<ConnectionTable> {
        self.params.validate()?;
        if grid.is_empty() || grid.count_on() == 0 {
            debug!(
                width = grid.width(),
                height = grid.height(),
                "blank raster, nothing to trace"
            );
            return Ok(ConnectionTable::new());
        }
        let labeling = ComponentLabeler::new(self.params.labeling.clone()).execute(grid);
        self.reconstruct(grid, &labeling, labels)
    }

    fn reconstruct(
        &self,
        grid: &PixelGrid,
        labeling: &Labeling,
        labels: &[LabelShape],
    ) -> Result<ConnectionTable> {
        let p = &self.params;
        let dashed = DashDetector::new(p.dashes.clone()).execute(labeling, labels);
        let dash_ids: HashSet<u32> = dashed
            .iter()
            .flat_map(|d| d.components.iter().copied())
            .collect();

        let mut skeleton = Skeletonizer::new(p.thinning).execute(grid);
        let masked: Vec<(i32, i32)> = skeleton
            .iter_on()
            .filter(|&(x, y)| {
                let centre = Point2::new(f64::from(x), f64::from(y));
                dash_ids.contains(&labeling.label(x, y))
                    || labels.iter().any(|l| l.shape.contains(&centre))
            })
            .collect();
        for &(x, y) in &masked {
            skeleton.set(x, y, false);
        }

        let dominant = DominantPoints::new(p.dominant.clone());
        let segments: Vec<Segment> = ChainTracer::new()
            .trace_all(&mut skeleton)
            .iter()
            .flat_map(|seq| dominant.execute(seq).segments())
            .collect();
        let stitched = LineStitcher::new(p.stitch.clone()).execute(&segments, grid.distance_field());
        let mut bonds = BondGrouper::new(p.group.clone()).execute(&stitched);
        bonds.extend(dashed.into_iter().map(|d| d.bond));
        debug!(
            masked = masked.len(),
            segments = segments.len(),
            stitched = stitched.len(),
            bonds = bonds.len(),
            "vectorized raster"
        );

        ConnectionTableBuilder::new(p.build.clone()).execute(&bonds, labels, grid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ChemtraceError;
    use crate::recognition::{RecognitionParams, TemplateRecognizer};
    use crate::test_support::{draw_line, fused_ring_labels, fused_ring_raster, init_tracing};

    const HEXAGON: [(i32, i32); 6] = [
        (140, 100),
        (120, 135),
        (80, 135),
        (60, 100),
        (80, 65),
        (120, 65),
    ];

    /// Benzene drawn as a hexagon with three inner strokes on alternating
    /// sides.
    fn benzene_raster() -> PixelGrid {
        let mut grid = PixelGrid::new(200, 200);
        for i in 0..6 {
            draw_line(&mut grid, HEXAGON[i], HEXAGON[(i + 1) % 6]);
        }
        let centre = Point2::new(100.0, 100.0);
        for i in [0, 2, 4] {
            let (a, b) = (HEXAGON[i], HEXAGON[(i + 1) % 6]);
            let pa = Point2::new(f64::from(a.0), f64::from(a.1));
            let pb = Point2::new(f64::from(b.0), f64::from(b.1));
            let along = (pb - pa).normalize();
            let mid = Point2::from((pa.coords + pb.coords) * 0.5);
            let inward = (centre - mid).normalize() * 7.0;
            let from = pa + along * 8.0 + inward;
            let to = pb - along * 8.0 + inward;
            draw_line(
                &mut grid,
                (from.x.round() as i32, from.y.round() as i32),
                (to.x.round() as i32, to.y.round() as i32),
            );
        }
        grid
    }

    #[test]
    fn benzene_raster_end_to_end() {
        init_tracing();
        let snapshot = Pipeline::default().run(&benzene_raster(), &[]).unwrap();
        assert_eq!(snapshot.atoms.len(), 6);
        assert_eq!(snapshot.bonds.len(), 6);
        assert_eq!(snapshot.count_order(2), 3);
        assert_eq!(snapshot.count_order(1), 3);
        assert_eq!(snapshot.count_symbol("C"), 6);
        assert!(snapshot.bonds.iter().all(|b| !b.dash && !b.wedge));
    }

    #[test]
    fn fused_ring_raster_end_to_end() {
        init_tracing();
        let snapshot = Pipeline::default()
            .run(&fused_ring_raster(), &fused_ring_labels())
            .unwrap();
        assert_eq!(snapshot.atoms.len(), 9);
        assert_eq!(snapshot.bonds.len(), 10);
        assert!(snapshot.bonds.iter().all(|b| b.order == 1));
        assert_eq!(snapshot.bonds.iter().filter(|b| b.dash).count(), 3);
        assert!(snapshot.bonds.iter().all(|b| !b.wedge));
        assert_eq!(snapshot.count_symbol("C"), 5);
        assert_eq!(snapshot.count_symbol("N"), 2);
        assert_eq!(snapshot.count_symbol("H"), 2);
    }

    #[test]
    fn pipeline_is_deterministic() {
        let grid = benzene_raster();
        let pipeline = Pipeline::default();
        assert_eq!(pipeline.run(&grid, &[]).unwrap(), pipeline.run(&grid, &[]).unwrap());
    }

    #[test]
    fn blank_rasters_give_empty_tables() {
        let pipeline = Pipeline::default();
        assert!(pipeline.run(&PixelGrid::new(0, 0), &[]).unwrap().is_empty());
        assert!(pipeline.run(&PixelGrid::new(64, 64), &[]).unwrap().is_empty());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut params = PipelineParams::default();
        params.stitch.max_gap = f64::NAN;
        let err = Pipeline::new(params).run(&benzene_raster(), &[]).unwrap_err();
        assert!(matches!(err, ChemtraceError::Operation(OperationError::InvalidInput(_))));

        let mut params = PipelineParams::default();
        params.labeling.max_labels = 0;
        assert!(Pipeline::new(params).run(&PixelGrid::new(4, 4), &[]).is_err());
    }

    #[test]
    fn recognized_label_becomes_heteroatom() {
        init_tracing();
        let glyph = PixelGrid::from_ascii(&[
            ".###.", "#...#", "#...#", "#...#", "#...#", ".###.",
        ])
        .unwrap();
        let mut grid = PixelGrid::new(120, 80);
        draw_line(&mut grid, (20, 60), (55, 40));
        draw_line(&mut grid, (55, 40), (97, 60));
        for (x, y) in glyph.iter_on() {
            grid.set(x + 100, y + 57, true);
        }
        let recognizer = RecognizerChain::new(RecognitionParams::default())
            .with(TemplateRecognizer::new().with_template("O", glyph));

        let snapshot = Pipeline::default()
            .run_with_recognizer(&grid, &recognizer)
            .unwrap();
        assert_eq!(snapshot.atoms.len(), 3);
        assert_eq!(snapshot.bonds.len(), 2);
        assert_eq!(snapshot.count_symbol("O"), 1);
        assert_eq!(snapshot.count_symbol("C"), 2);
        assert_eq!(snapshot.count_order(1), 2);
    }
}
