pub mod label;
pub mod segment;
pub mod shape;

pub use label::{LabelGuess, LabelShape};
pub use segment::Segment;
pub use shape::{Shape, ShapeKind};
