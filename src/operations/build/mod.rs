//! Connection table construction and refinement.
//!
//! The builder seeds a table from bond lines and label shapes and then runs
//! a bounded sequence of refinement passes. Each pass merges close nodes,
//! absorbs nodes under labels, folds multi-stroke bonds, cleans duplicate
//! and self edges, splits true crossings, snaps dangling ends onto labels,
//! drops orphans and reads stereo styles off the raster. Passes repeat
//! while some bond is much longer than average and the previous pass still
//! changed the table.

mod clean;
mod crossing;
mod labels;
mod merge;
mod stereo;

pub use clean::{dedup_edges, remove_orphans, remove_self_loops};
pub use crossing::{split_crossings, split_long_edges};
pub use labels::{absorb_labels, flag_spurious, label_node, snap_extensions};
pub use merge::{merge_close_nodes, merge_parallel_edges};
pub use stereo::{classify, tag_stereo, Stereo, StereoParams};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::group::{BondGrouper, BondLine, GroupParams};
use super::ensure_non_negative;
use crate::error::{OperationError, Result};
use crate::geometry::LabelShape;
use crate::graph::{ConnectionTable, EdgeData, NodeData};
use crate::raster::PixelGrid;

/// Parameters for [`ConnectionTableBuilder`].
///
/// Ratios are relative to the average bond length of the current table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildParams {
    pub max_refinements: usize,
    /// Nodes closer than `avg × merge_ratio` merge.
    pub merge_ratio: f64,
    /// Dangling ends within `avg × snap_ratio` of a label join it.
    pub snap_ratio: f64,
    /// Bonds longer than `avg × max_bond_ratio` trigger another pass.
    pub max_bond_ratio: f64,
    /// Distance (px) within which a node splits an over-long bond.
    pub split_tolerance: f64,
    /// Crossings closer than this (px) to an endpoint are shared vertices.
    pub crossing_tolerance: f64,
    /// Bonds between two labels with a smaller share outside the labels
    /// are flagged spurious.
    pub spurious_ratio: f64,
    pub parallel: GroupParams,
    pub stereo: StereoParams,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            max_refinements: 5,
            merge_ratio: 0.2,
            snap_ratio: 0.5,
            max_bond_ratio: 2.0,
            split_tolerance: 2.0,
            crossing_tolerance: 1.0,
            spurious_ratio: 0.25,
            parallel: GroupParams::default(),
            stereo: StereoParams::default(),
        }
    }
}

impl BuildParams {
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for negative or non-finite
    /// values or a zero refinement cap.
    pub fn validate(&self) -> Result<()> {
        if self.max_refinements == 0 {
            return Err(
                OperationError::InvalidInput("build.max_refinements must be positive".into())
                    .into(),
            );
        }
        ensure_non_negative("build.merge_ratio", self.merge_ratio)?;
        ensure_non_negative("build.snap_ratio", self.snap_ratio)?;
        ensure_non_negative("build.max_bond_ratio", self.max_bond_ratio)?;
        ensure_non_negative("build.split_tolerance", self.split_tolerance)?;
        ensure_non_negative("build.crossing_tolerance", self.crossing_tolerance)?;
        ensure_non_negative("build.spurious_ratio", self.spurious_ratio)?;
        self.parallel.validate()?;
        self.stereo.validate()
    }
}

/// Turns bond lines and label shapes into a refined connection table.
#[derive(Debug, Default)]
pub struct ConnectionTableBuilder {
    params: BuildParams,
}

impl ConnectionTableBuilder {
    #[must_use]
    pub fn new(params: BuildParams) -> Self {
        Self { params }
    }

    /// Builds the table.
    ///
    /// `grid` is the original (unthinned) raster, used for stereo tagging.
    ///
    /// # Errors
    ///
    /// Returns an error only if the table's handles become inconsistent,
    /// which indicates a bug in a refinement step.
    pub fn execute(
        &self,
        bonds: &[BondLine],
        labels: &[LabelShape],
        grid: &PixelGrid,
    ) -> Result<ConnectionTable> {
        let p = &self.params;
        let mut table = ConnectionTable::new();
        seed(&mut table, bonds, labels)?;
        if table.edge_count() == 0 {
            debug!(labels = labels.len(), "no bonds to refine");
            return Ok(ConnectionTable::new());
        }

        let grouper = BondGrouper::new(p.parallel.clone());
        let mut pass = 0;
        loop {
            pass += 1;
            let start = table.version();
            let avg = table.average_bond_length();

            if pass > 1 {
                split_long_edges(&mut table, avg * p.max_bond_ratio, p.split_tolerance)?;
            }
            let merge_distance = avg * p.merge_ratio;
            merge_close_nodes(&mut table, merge_distance)?;
            absorb_labels(&mut table, labels)?;
            merge_parallel_edges(&mut table, &grouper)?;
            clean(&mut table)?;
            split_crossings(&mut table, p.crossing_tolerance)?;
            merge_close_nodes(&mut table, merge_distance)?;
            clean(&mut table)?;
            snap_extensions(&mut table, labels, avg * p.snap_ratio)?;
            clean(&mut table)?;
            remove_orphans(&mut table)?;
            tag_stereo(&mut table, grid, &p.stereo)?;
            debug_assert!(table.validate().is_ok(), "{:?}", table.validate());

            let cap = table.average_bond_length() * p.max_bond_ratio;
            let too_long = table
                .edge_ids()
                .into_iter()
                .filter_map(|id| table.edge_segment(id).ok())
                .filter(|s| s.length() > cap)
                .count();
            let changed = table.version() != start;
            debug!(
                pass,
                nodes = table.node_count(),
                edges = table.edge_count(),
                too_long,
                changed,
                "refinement pass"
            );
            if too_long == 0 || !changed {
                break;
            }
            if pass >= p.max_refinements {
                warn!(pass, too_long, "refinement stopped at iteration cap");
                break;
            }
        }

        flag_spurious(&mut table, labels, p.spurious_ratio)?;
        Ok(table)
    }
}

/// Two nodes and one edge per bond line, one node per label.
fn seed(table: &mut ConnectionTable, bonds: &[BondLine], labels: &[LabelShape]) -> Result<()> {
    for bond in bonds.iter().filter(|b| !b.segment.is_degenerate()) {
        let a = table.add_node(NodeData::new(bond.segment.a));
        let b = table.add_node(NodeData::new(bond.segment.b));
        let mut edge = EdgeData::with_order(a, b, bond.order);
        edge.dash = bond.dash_hint;
        table.add_edge(edge)?;
    }
    for label in labels {
        table.add_node(NodeData::with_symbol(label.shape.centroid(), label.symbol()));
    }
    Ok(())
}

fn clean(table: &mut ConnectionTable) -> Result<()> {
    remove_self_loops(table)?;
    dedup_edges(table)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::Segment;
    use crate::math::Point2;
    use crate::test_support::{fused_ring_labels, fused_ring_raster, init_tracing, label_box};

    fn line(a: (f64, f64), b: (f64, f64), order: u8) -> BondLine {
        BondLine {
            segment: Segment::new(Point2::new(a.0, a.1), Point2::new(b.0, b.1)),
            order,
            dash_hint: false,
        }
    }

    /// Flat-topped hexagon, centre (100, 100), circumradius 40.
    fn hexagon() -> Vec<(f64, f64)> {
        (0..6)
            .map(|k| {
                let a = f64::from(k) * std::f64::consts::FRAC_PI_3;
                (100.0 + 40.0 * a.cos(), 100.0 + 40.0 * a.sin())
            })
            .collect()
    }

    #[test]
    fn benzene_ring() {
        init_tracing();
        let v = hexagon();
        // Stroke ends wobble by a pixel around each vertex.
        let jitter = [(0.6, -0.4), (-0.5, 0.7), (0.3, 0.3), (-0.8, 0.1), (0.2, -0.9), (0.7, 0.5)];
        let bonds: Vec<BondLine> = (0..6)
            .map(|k| {
                let (a, b) = (v[k], v[(k + 1) % 6]);
                let (j0, j1) = (jitter[k], jitter[(k + 1) % 6]);
                line(
                    (a.0 + j0.0, a.1 + j0.1),
                    (b.0 - j1.1, b.1 + j1.0),
                    if k % 2 == 0 { 2 } else { 1 },
                )
            })
            .collect();

        let table = ConnectionTableBuilder::default()
            .execute(&bonds, &[], &PixelGrid::new(200, 200))
            .unwrap();
        let snap = table.snapshot();
        assert_eq!(snap.atoms.len(), 6);
        assert_eq!(snap.bonds.len(), 6);
        assert_eq!(snap.count_order(2), 3);
        assert_eq!(snap.count_order(1), 3);
        assert_eq!(snap.count_symbol("C"), 6);
        assert!(table.validate().is_ok());
    }

    /// Bond lines as vectorization would find them in [`fused_ring_raster`].
    fn aziridine_fixture() -> (Vec<BondLine>, Vec<LabelShape>, PixelGrid) {
        let (c1, c2, c3, c4, c5) = (
            (100.0, 100.0),
            (140.0, 100.0),
            (100.0, 140.0),
            (140.0, 140.0),
            (120.0, 175.0),
        );
        let bonds = vec![
            line(c1, c2, 1),
            line(c1, (118.0, 70.0), 1),
            line(c2, (122.0, 70.0), 1),
            line(c1, c3, 1),
            line(c2, c4, 1),
            line(c3, c5, 1),
            line(c4, c5, 1),
            line(c5, (120.0, 210.0), 1),
            line((120.0, 61.0), (120.0, 31.0), 1),
            line((120.0, 220.0), (120.0, 250.0), 1),
        ];
        (bonds, fused_ring_labels(), fused_ring_raster())
    }

    #[test]
    fn fused_ring_with_hashed_bonds() {
        init_tracing();
        let (bonds, labels, grid) = aziridine_fixture();
        let table = ConnectionTableBuilder::default()
            .execute(&bonds, &labels, &grid)
            .unwrap();
        let snap = table.snapshot();
        assert_eq!(snap.atoms.len(), 9);
        assert_eq!(snap.bonds.len(), 10);
        assert!(snap.bonds.iter().all(|b| b.order == 1));
        assert_eq!(snap.bonds.iter().filter(|b| b.dash).count(), 3);
        assert_eq!(snap.bonds.iter().filter(|b| b.wedge || b.spurious).count(), 0);
        assert_eq!(snap.count_symbol("C"), 5);
        assert_eq!(snap.count_symbol("N"), 2);
        assert_eq!(snap.count_symbol("H"), 2);
    }

    #[test]
    fn building_is_deterministic() {
        let (bonds, labels, grid) = aziridine_fixture();
        let builder = ConnectionTableBuilder::default();
        let first = builder.execute(&bonds, &labels, &grid).unwrap().snapshot();
        let second = builder.execute(&bonds, &labels, &grid).unwrap().snapshot();
        assert_eq!(first, second);
    }

    #[test]
    fn no_bonds_gives_empty_table() {
        let labels = [label_box(10.0, 10.0, "Cl")];
        let table = ConnectionTableBuilder::default()
            .execute(&[], &labels, &PixelGrid::new(20, 20))
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.edge_count(), 0);
    }

    #[test]
    fn long_bond_through_atom_is_split_on_next_pass() {
        // A stitched line ran straight through the ring atom at (40, 0).
        let bonds = vec![
            line((0.0, 0.0), (80.0, 0.0), 1),
            line((40.0, 0.0), (40.0, 10.0), 1),
            line((40.0, 10.0), (50.0, 17.0), 1),
            line((50.0, 17.0), (60.0, 10.0), 1),
        ];
        let table = ConnectionTableBuilder::default()
            .execute(&bonds, &[], &PixelGrid::new(100, 40))
            .unwrap();
        assert_eq!(table.edge_count(), 5);
        assert_eq!(table.node_count(), 6);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = BuildParams {
            merge_ratio: f64::NAN,
            ..BuildParams::default()
        };
        assert!(params.validate().is_err());
        assert!(BuildParams::default().validate().is_ok());
    }
}
