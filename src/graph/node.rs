use crate::math::Point2;

slotmap::new_key_type! {
    /// Handle of an atom node in a [`ConnectionTable`](super::ConnectionTable).
    pub struct NodeId;
}

/// Symbol given to nodes that no label shape claims.
pub const CARBON: &str = "C";

/// An inferred atom.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub point: Point2,
    pub symbol: String,
}

impl NodeData {
    /// Creates a carbon node at `point`.
    #[must_use]
    pub fn new(point: Point2) -> Self {
        Self {
            point,
            symbol: CARBON.to_owned(),
        }
    }

    #[must_use]
    pub fn with_symbol(point: Point2, symbol: impl Into<String>) -> Self {
        Self {
            point,
            symbol: symbol.into(),
        }
    }

    #[must_use]
    pub fn is_carbon(&self) -> bool {
        self.symbol == CARBON
    }
}
