//! Reconstruction of chemical structure diagrams from binary rasters.
//!
//! A [`Pipeline`] labels components, thins them to a skeleton, traces and
//! simplifies the skeleton into segments, stitches and groups those into
//! bond lines and refines the result into a [`ConnectionTable`] of atoms
//! and bonds.

pub mod error;
pub mod geometry;
pub mod graph;
pub mod math;
pub mod operations;
pub mod pipeline;
pub mod raster;
pub mod recognition;
pub mod union_find;

#[cfg(test)]
mod test_support;

pub use error::{ChemtraceError, Result};
pub use graph::{ConnectionTable, TableSnapshot};
pub use pipeline::{Pipeline, PipelineParams};
pub use raster::PixelGrid;
