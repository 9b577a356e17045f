use super::node::NodeId;

slotmap::new_key_type! {
    /// Handle of a bond edge in a [`ConnectionTable`](super::ConnectionTable).
    pub struct EdgeId;
}

/// Highest bond order the builder assigns.
pub const MAX_ORDER: u8 = 3;

/// An inferred bond between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    pub a: NodeId,
    pub b: NodeId,
    /// Bond order in `1..=3`.
    pub order: u8,
    /// Solid wedge; `a` is the narrow end.
    pub wedge: bool,
    /// Hashed bond.
    pub dash: bool,
    /// Set by the final pass on bonds that mostly lie under label shapes.
    pub spurious: bool,
}

impl EdgeData {
    /// Creates a plain single bond.
    #[must_use]
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self::with_order(a, b, 1)
    }

    #[must_use]
    pub fn with_order(a: NodeId, b: NodeId, order: u8) -> Self {
        Self {
            a,
            b,
            order: order.clamp(1, MAX_ORDER),
            wedge: false,
            dash: false,
            spurious: false,
        }
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }

    /// `true` if `node` is one of the two endpoints.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }

    /// The endpoint opposite `node`.
    #[must_use]
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.a == node {
            Some(self.b)
        } else if self.b == node {
            Some(self.a)
        } else {
            None
        }
    }

    /// Endpoint pair in a canonical order, for per-pair bookkeeping.
    #[must_use]
    pub fn key(&self) -> (NodeId, NodeId) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }
}
