use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::trace;

use crate::error::Result;
use crate::graph::{ConnectionTable, EdgeId, NodeId};

/// Removes edges whose two ends are the same node.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn remove_self_loops(table: &mut ConnectionTable) -> Result<usize> {
    let loops: Vec<EdgeId> = table
        .edges()
        .filter(|(_, e)| e.is_self_loop())
        .map(|(id, _)| id)
        .collect();
    for &id in &loops {
        table.remove_edge(id)?;
    }
    Ok(loops.len())
}

/// Keeps one edge per node pair.
///
/// Preference: higher order, then not dashed, then wedge, then the edge
/// created first.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn dedup_edges(table: &mut ConnectionTable) -> Result<usize> {
    let mut by_pair: BTreeMap<(NodeId, NodeId), Vec<(usize, EdgeId)>> = BTreeMap::new();
    for (idx, (id, e)) in table.edges().enumerate() {
        by_pair.entry(e.key()).or_default().push((idx, id));
    }

    let mut losers = Vec::new();
    for group in by_pair.values().filter(|g| g.len() > 1) {
        let mut ranked = Vec::with_capacity(group.len());
        for &(idx, id) in group {
            let e = table.edge(id)?;
            ranked.push(((Reverse(e.order), e.dash, !e.wedge, idx), id));
        }
        ranked.sort_by_key(|&(rank, _)| rank);
        losers.extend(ranked.into_iter().skip(1).map(|(_, id)| id));
    }

    for &id in &losers {
        table.remove_edge(id)?;
    }
    if !losers.is_empty() {
        trace!(removed = losers.len(), "removed duplicate edges");
    }
    Ok(losers.len())
}

/// Removes nodes without edges.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn remove_orphans(table: &mut ConnectionTable) -> Result<usize> {
    let orphans: Vec<NodeId> = table
        .node_ids()
        .into_iter()
        .filter(|&id| table.degree(id) == 0)
        .collect();
    for &id in &orphans {
        table.remove_node(id)?;
    }
    Ok(orphans.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graph::{EdgeData, NodeData};
    use crate::math::Point2;

    fn pair() -> (ConnectionTable, NodeId, NodeId) {
        let mut t = ConnectionTable::new();
        let a = t.add_node(NodeData::new(Point2::new(0.0, 0.0)));
        let b = t.add_node(NodeData::new(Point2::new(10.0, 0.0)));
        (t, a, b)
    }

    #[test]
    fn higher_order_wins() {
        let (mut t, a, b) = pair();
        t.add_edge(EdgeData::new(a, b)).unwrap();
        let double = t.add_edge(EdgeData::with_order(b, a, 2)).unwrap();
        assert_eq!(dedup_edges(&mut t).unwrap(), 1);
        assert_eq!(t.edge_ids(), vec![double]);
    }

    #[test]
    fn plain_beats_dashed_and_wedge_beats_plain() {
        let (mut t, a, b) = pair();
        let mut dashed = EdgeData::new(a, b);
        dashed.dash = true;
        t.add_edge(dashed).unwrap();
        let plain = t.add_edge(EdgeData::new(a, b)).unwrap();
        let mut wedge = EdgeData::new(a, b);
        wedge.wedge = true;
        let wedge = t.add_edge(wedge).unwrap();
        dedup_edges(&mut t).unwrap();
        assert_eq!(t.edge_ids(), vec![wedge]);
        assert!(t.edge(plain).is_err());
    }

    #[test]
    fn at_most_one_edge_per_pair_after_cleanup() {
        let mut t = ConnectionTable::new();
        let ids: Vec<NodeId> = (0..4)
            .map(|i| t.add_node(NodeData::new(Point2::new(f64::from(i), 0.0))))
            .collect();
        for &(x, y) in &[(0, 1), (1, 0), (1, 2), (2, 2), (2, 3), (3, 2), (0, 1)] {
            t.add_edge(EdgeData::new(ids[x], ids[y])).unwrap();
        }
        remove_self_loops(&mut t).unwrap();
        dedup_edges(&mut t).unwrap();
        assert_eq!(t.edge_count(), 3);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn orphans_are_removed() {
        let (mut t, a, b) = pair();
        let lonely = t.add_node(NodeData::new(Point2::new(50.0, 50.0)));
        t.add_edge(EdgeData::new(a, b)).unwrap();
        assert_eq!(remove_orphans(&mut t).unwrap(), 1);
        assert!(t.node(lonely).is_err());
        assert_eq!(t.node_count(), 2);
    }
}
