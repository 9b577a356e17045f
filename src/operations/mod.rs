pub mod build;
mod dashes;
mod group;
mod stitch;

pub use build::{BuildParams, ConnectionTableBuilder, StereoParams};
pub use dashes::{DashDetector, DashParams, DashedCandidate};
pub use group::{BondGrouper, BondLine, GroupParams};
pub use stitch::{LineStitcher, StitchParams};

use crate::error::{OperationError, Result};

/// Rejects negative, NaN and infinite parameter values.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(OperationError::InvalidInput(format!(
            "{name} must be finite and non-negative, got {value}"
        ))
        .into())
    }
}
