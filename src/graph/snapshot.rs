use serde::{Deserialize, Serialize};

/// Exported atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomRecord {
    pub x: f64,
    pub y: f64,
    pub symbol: String,
}

/// Exported bond; `a` and `b` index into [`TableSnapshot::atoms`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondRecord {
    pub a: usize,
    pub b: usize,
    pub order: u8,
    pub wedge: bool,
    pub dash: bool,
    pub spurious: bool,
}

/// Immutable, index-based copy of a connection table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub atoms: Vec<AtomRecord>,
    pub bonds: Vec<BondRecord>,
}

impl TableSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty() && self.bonds.is_empty()
    }

    /// Number of bonds of the given order.
    #[must_use]
    pub fn count_order(&self, order: u8) -> usize {
        self.bonds.iter().filter(|b| b.order == order).count()
    }

    /// Number of atoms carrying `symbol`.
    #[must_use]
    pub fn count_symbol(&self, symbol: &str) -> usize {
        self.atoms.iter().filter(|a| a.symbol == symbol).count()
    }
}
