pub mod chain_code;
pub mod distance_field;
pub mod dominant;
pub mod grid;
pub mod labeling;
pub mod thinning;

pub use chain_code::{ChainCode, ChainCodeSequence, ChainTracer};
pub use distance_field::DistanceField;
pub use dominant::{DominantPointParams, DominantPoints, Polyline};
pub use grid::PixelGrid;
pub use labeling::{Component, ComponentLabeler, Labeling, LabelingParams};
pub use thinning::{Skeletonizer, ThinningRule};
