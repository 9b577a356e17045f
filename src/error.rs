use thiserror::Error;

/// Top-level error type for the chemtrace reconstruction core.
#[derive(Debug, Error)]
pub enum ChemtraceError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors related to pixel grid construction and slicing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("size mismatch: expected {expected} pixels, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("region {x},{y} {width}x{height} exceeds grid bounds {grid_width}x{grid_height}")]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        grid_width: usize,
        grid_height: usize,
    },

    #[error("empty region")]
    EmptyRegion,
}

/// Errors related to the connection table arena.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors related to pipeline operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for results using [`ChemtraceError`].
pub type Result<T> = std::result::Result<T, ChemtraceError>;
