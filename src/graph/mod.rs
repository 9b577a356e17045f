pub mod edge;
pub mod node;
pub mod snapshot;

pub use edge::{EdgeData, EdgeId, MAX_ORDER};
pub use node::{NodeData, NodeId, CARBON};
pub use snapshot::{AtomRecord, BondRecord, TableSnapshot};

use std::cell::OnceCell;
use std::collections::HashSet;

use slotmap::{SecondaryMap, SlotMap};

use crate::error::GraphError;
use crate::geometry::Segment;

/// Arena that owns the nodes and edges of an inferred molecule graph.
///
/// Nodes and edges are addressed by generation-checked handles, so a handle
/// to a removed or merged entity fails loudly instead of aliasing a new one.
/// The node-to-edge incidence map is derived on demand and dropped by every
/// structural edit; [`version`](Self::version) increases with each edit.
#[derive(Debug, Default, Clone)]
pub struct ConnectionTable {
    nodes: SlotMap<NodeId, NodeData>,
    edges: SlotMap<EdgeId, EdgeData>,
    version: u64,
    incidence: OnceCell<SecondaryMap<NodeId, Vec<EdgeId>>>,
}

impl ConnectionTable {
    /// Creates a new, empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit counter; changes whenever nodes or edges are added, removed or
    /// modified through this table.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    fn touch(&mut self) {
        self.version += 1;
        self.incidence.take();
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // --- Node operations ---

    /// Inserts a node and returns its ID.
    pub fn add_node(&mut self, data: NodeData) -> NodeId {
        self.touch();
        self.nodes.insert(data)
    }

    /// Returns a reference to the node data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::EntityNotFound("node".into()))
    }

    /// Returns a mutable reference to the node data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, GraphError> {
        self.version += 1;
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::EntityNotFound("node".into()))
    }

    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node handles in arena order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }

    /// Removes a node together with every edge incident to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeData, GraphError> {
        let data = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::EntityNotFound("node".into()))?;
        self.edges.retain(|_, e| !e.touches(id));
        self.touch();
        Ok(data)
    }

    /// Folds `absorb` into `keep`: every edge of `absorb` is re-attached to
    /// `keep` and `absorb` is removed. Edges between the two become
    /// self-loops, left for the cleanup step.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is stale.
    pub fn merge_nodes(&mut self, keep: NodeId, absorb: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(keep) {
            return Err(GraphError::EntityNotFound("node".into()));
        }
        if keep == absorb {
            return Ok(());
        }
        self.nodes
            .remove(absorb)
            .ok_or_else(|| GraphError::EntityNotFound("node".into()))?;
        for (_, e) in &mut self.edges {
            if e.a == absorb {
                e.a = keep;
            }
            if e.b == absorb {
                e.b = keep;
            }
        }
        self.touch();
        Ok(())
    }

    // --- Edge operations ---

    /// Inserts an edge and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if either endpoint handle is stale.
    pub fn add_edge(&mut self, data: EdgeData) -> Result<EdgeId, GraphError> {
        if !self.nodes.contains_key(data.a) || !self.nodes.contains_key(data.b) {
            return Err(GraphError::EntityNotFound("edge endpoint".into()));
        }
        self.touch();
        Ok(self.edges.insert(data))
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, GraphError> {
        self.edges
            .get(id)
            .ok_or_else(|| GraphError::EntityNotFound("edge".into()))
    }

    /// Returns a mutable reference to the edge data, or an error if not found.
    ///
    /// Endpoint changes made through this reference must keep both handles
    /// live; [`validate`](Self::validate) checks that.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut EdgeData, GraphError> {
        self.touch();
        self.edges
            .get_mut(id)
            .ok_or_else(|| GraphError::EntityNotFound("edge".into()))
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is stale.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<EdgeData, GraphError> {
        let data = self
            .edges
            .remove(id)
            .ok_or_else(|| GraphError::EntityNotFound("edge".into()))?;
        self.touch();
        Ok(data)
    }

    /// Edge handles in arena order.
    #[must_use]
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.keys().collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edges.iter()
    }

    /// Geometry of an edge from its endpoint positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge or one of its nodes is missing.
    pub fn edge_segment(&self, id: EdgeId) -> Result<Segment, GraphError> {
        let e = self.edge(id)?;
        Ok(Segment::new(self.node(e.a)?.point, self.node(e.b)?.point))
    }

    // --- Derived queries ---

    fn incidence(&self) -> &SecondaryMap<NodeId, Vec<EdgeId>> {
        self.incidence.get_or_init(|| {
            let mut map: SecondaryMap<NodeId, Vec<EdgeId>> = SecondaryMap::new();
            for id in self.nodes.keys() {
                map.insert(id, Vec::new());
            }
            for (eid, e) in &self.edges {
                for n in [e.a, e.b] {
                    if let Some(list) = map.get_mut(n) {
                        if !list.contains(&eid) {
                            list.push(eid);
                        }
                    }
                }
            }
            map
        })
    }

    /// Edges touching `node`, in arena order.
    #[must_use]
    pub fn incident_edges(&self, node: NodeId) -> &[EdgeId] {
        self.incidence().get(node).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.incident_edges(node).len()
    }

    /// Mean edge length, `0.0` for a table without edges.
    #[must_use]
    pub fn average_bond_length(&self) -> f64 {
        let lengths: Vec<f64> = self
            .edges
            .keys()
            .filter_map(|id| self.edge_segment(id).ok())
            .map(|s| s.length())
            .collect();
        if lengths.is_empty() {
            return 0.0;
        }
        lengths.iter().sum::<f64>() / lengths.len() as f64
    }

    /// Checks the structural invariants: every edge references live nodes,
    /// carries an order in `1..=3`, is not a self-loop, and no node pair
    /// has two edges.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::InvalidTopology` describing the first violation.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut pairs = HashSet::new();
        for (_, e) in &self.edges {
            if !self.nodes.contains_key(e.a) || !self.nodes.contains_key(e.b) {
                return Err(GraphError::InvalidTopology(
                    "edge references a removed node".into(),
                ));
            }
            if e.is_self_loop() {
                return Err(GraphError::InvalidTopology("self-loop edge".into()));
            }
            if !(1..=MAX_ORDER).contains(&e.order) {
                return Err(GraphError::InvalidTopology(format!(
                    "bond order {} out of range",
                    e.order
                )));
            }
            if !pairs.insert(e.key()) {
                return Err(GraphError::InvalidTopology(
                    "duplicate edge between one node pair".into(),
                ));
            }
        }
        Ok(())
    }

    /// Index-based export with nodes and edges in arena order.
    #[must_use]
    pub fn snapshot(&self) -> TableSnapshot {
        let mut index: SecondaryMap<NodeId, usize> = SecondaryMap::new();
        let atoms = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, (id, n))| {
                index.insert(id, i);
                AtomRecord {
                    x: n.point.x,
                    y: n.point.y,
                    symbol: n.symbol.clone(),
                }
            })
            .collect();
        let bonds = self
            .edges
            .values()
            .filter_map(|e| {
                Some(BondRecord {
                    a: *index.get(e.a)?,
                    b: *index.get(e.b)?,
                    order: e.order,
                    wedge: e.wedge,
                    dash: e.dash,
                    spurious: e.spurious,
                })
            })
            .collect();
        TableSnapshot { atoms, bonds }
    }
}
