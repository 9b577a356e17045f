use tracing::trace;

use crate::error::Result;
use crate::graph::{ConnectionTable, EdgeId, NodeId, MAX_ORDER};
use crate::math::distance_2d::project_param;
use crate::math::Point2;
use crate::operations::BondGrouper;

/// Merges node pairs closer than `distance` until none remain.
///
/// The scan restarts after every merge. The surviving node moves to the
/// midpoint and takes the other node's symbol if its own is carbon.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn merge_close_nodes(table: &mut ConnectionTable, distance: f64) -> Result<usize> {
    let mut merged = 0;
    while let Some((keep, absorb)) = first_close_pair(table, distance) {
        let other = table.node(absorb)?.clone();
        let node = table.node_mut(keep)?;
        node.point = Point2::from((node.point.coords + other.point.coords) * 0.5);
        if node.is_carbon() && !other.is_carbon() {
            node.symbol = other.symbol;
        }
        table.merge_nodes(keep, absorb)?;
        merged += 1;
    }
    if merged > 0 {
        trace!(merged, distance, "merged close nodes");
    }
    Ok(merged)
}

fn first_close_pair(table: &ConnectionTable, distance: f64) -> Option<(NodeId, NodeId)> {
    let nodes: Vec<_> = table.nodes().collect();
    for (i, (a, na)) in nodes.iter().enumerate() {
        for (b, nb) in &nodes[i + 1..] {
            if (nb.point - na.point).norm() < distance {
                return Some((*a, *b));
            }
        }
    }
    None
}

/// Collapses edges that are strokes of one multiple bond.
///
/// The longer edge survives with the summed order (capped at three); the
/// shorter edge's endpoints are folded into the longer edge's endpoints on
/// the same side.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn merge_parallel_edges(table: &mut ConnectionTable, grouper: &BondGrouper) -> Result<usize> {
    let mut merged = 0;
    while let Some((long, short)) = first_parallel_pair(table, grouper) {
        let ls = table.edge_segment(long)?;
        let ss = table.edge_segment(short)?;
        let removed = table.remove_edge(short)?;
        let forward = project_param(&ss.a, &ls.a, &ls.b) <= project_param(&ss.b, &ls.a, &ls.b);
        let (near_a, near_b) = if forward {
            (removed.a, removed.b)
        } else {
            (removed.b, removed.a)
        };
        let edge = table.edge_mut(long)?;
        edge.order = (edge.order + removed.order).min(MAX_ORDER);
        let (a, b) = (edge.a, edge.b);
        table.merge_nodes(a, near_a)?;
        table.merge_nodes(b, near_b)?;
        merged += 1;
    }
    if merged > 0 {
        trace!(merged, "merged parallel edges");
    }
    Ok(merged)
}

/// First pair of disjoint edges passing the stroke test, longer one first.
fn first_parallel_pair(
    table: &ConnectionTable,
    grouper: &BondGrouper,
) -> Option<(EdgeId, EdgeId)> {
    let edges: Vec<_> = table
        .edges()
        .filter(|(_, e)| !e.is_self_loop())
        .filter_map(|(id, e)| Some((id, e.clone(), table.edge_segment(id).ok()?)))
        .collect();
    for (i, (ia, ea, sa)) in edges.iter().enumerate() {
        for (ib, eb, sb) in &edges[i + 1..] {
            if ea.touches(eb.a) || ea.touches(eb.b) {
                continue;
            }
            if grouper.is_parallel_pair(sa, sb) {
                return Some(if sa.length() >= sb.length() {
                    (*ia, *ib)
                } else {
                    (*ib, *ia)
                });
            }
        }
    }
    None
}
