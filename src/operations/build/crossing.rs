use tracing::trace;

use crate::error::Result;
use crate::graph::{ConnectionTable, EdgeData, EdgeId, NodeData, NodeId};
use crate::math::distance_2d::project_param;
use crate::math::Point2;

/// Splits pairs of edges that cross away from their endpoints.
///
/// A crossing within `tolerance` of any of the four endpoints is a shared
/// vertex and is left alone. Each split adds one node and replaces the two
/// edges with four that keep the original orders; stereo flags are not
/// carried over.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn split_crossings(table: &mut ConnectionTable, tolerance: f64) -> Result<usize> {
    let mut splits = 0;
    while let Some((e1, e2, at)) = first_crossing(table, tolerance) {
        let d1 = table.remove_edge(e1)?;
        let d2 = table.remove_edge(e2)?;
        let node = table.add_node(NodeData::new(at));
        for d in [d1, d2] {
            table.add_edge(EdgeData::with_order(d.a, node, d.order))?;
            table.add_edge(EdgeData::with_order(node, d.b, d.order))?;
        }
        splits += 1;
    }
    if splits > 0 {
        trace!(splits, "split crossing edges");
    }
    Ok(splits)
}

fn first_crossing(table: &ConnectionTable, tolerance: f64) -> Option<(EdgeId, EdgeId, Point2)> {
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
            let Some((at, _, _)) = sa.intersection(sb) else {
                continue;
            };
            let clear = [sa.a, sa.b, sb.a, sb.b]
                .iter()
                .all(|p| (p - at).norm() > tolerance);
            if clear {
                return Some((*ia, *ib, at));
            }
        }
    }
    None
}

/// Splits edges longer than `max_length` at nodes lying on them.
///
/// A node qualifies when it is within `tolerance` of the edge and projects
/// strictly inside it; the node nearest the edge's `a` end is used first.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn split_long_edges(
    table: &mut ConnectionTable,
    max_length: f64,
    tolerance: f64,
) -> Result<usize> {
    let mut splits = 0;
    while let Some((edge, node)) = first_node_on_long_edge(table, max_length, tolerance) {
        let d = table.remove_edge(edge)?;
        table.add_edge(EdgeData::with_order(d.a, node, d.order))?;
        table.add_edge(EdgeData::with_order(node, d.b, d.order))?;
        splits += 1;
    }
    if splits > 0 {
        trace!(splits, "split over-long edges at nodes");
    }
    Ok(splits)
}

fn first_node_on_long_edge(
    table: &ConnectionTable,
    max_length: f64,
    tolerance: f64,
) -> Option<(EdgeId, NodeId)> {
    for (id, e) in table.edges() {
        let Ok(seg) = table.edge_segment(id) else {
            continue;
        };
        let len = seg.length();
        if len <= max_length {
            continue;
        }
        let margin = tolerance / len;
        let best = table
            .nodes()
            .filter(|(n, _)| !e.touches(*n))
            .filter(|(_, data)| seg.distance_to_point(&data.point) <= tolerance)
            .map(|(n, data)| (project_param(&data.point, &seg.a, &seg.b), n))
            .filter(|&(t, _)| t > margin && t < 1.0 - margin)
            .min_by(|x, y| x.0.total_cmp(&y.0));
        if let Some((_, node)) = best {
            return Some((id, node));
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn add(t: &mut ConnectionTable, x: f64, y: f64) -> NodeId {
        t.add_node(NodeData::new(Point2::new(x, y)))
    }

    #[test]
    fn crossing_edges_split_into_four() {
        let mut t = ConnectionTable::new();
        let (a, b) = (add(&mut t, 0.0, 0.0), add(&mut t, 20.0, 20.0));
        let (c, d) = (add(&mut t, 0.0, 20.0), add(&mut t, 20.0, 0.0));
        t.add_edge(EdgeData::with_order(a, b, 2)).unwrap();
        t.add_edge(EdgeData::new(c, d)).unwrap();

        assert_eq!(split_crossings(&mut t, 1.0).unwrap(), 1);
        assert_eq!(t.node_count(), 5);
        assert_eq!(t.edge_count(), 4);
        let centre = t
            .nodes()
            .find(|(id, _)| t.degree(*id) == 4)
            .map(|(_, n)| n.point)
            .unwrap();
        approx::assert_relative_eq!(centre.x, 10.0, epsilon = 1e-9);
        approx::assert_relative_eq!(centre.y, 10.0, epsilon = 1e-9);
        assert_eq!(t.edges().filter(|(_, e)| e.order == 2).count(), 2);
    }

    #[test]
    fn touching_near_endpoint_is_not_a_crossing() {
        let mut t = ConnectionTable::new();
        let (a, b) = (add(&mut t, 0.0, 0.0), add(&mut t, 20.0, 0.0));
        let (c, d) = (add(&mut t, 10.0, -0.5), add(&mut t, 10.0, 20.0));
        t.add_edge(EdgeData::new(a, b)).unwrap();
        t.add_edge(EdgeData::new(c, d)).unwrap();
        assert_eq!(split_crossings(&mut t, 1.0).unwrap(), 0);
        assert_eq!(t.edge_count(), 2);
    }

    #[test]
    fn edges_sharing_a_node_are_not_split() {
        let mut t = ConnectionTable::new();
        let (a, b, c) = (add(&mut t, 0.0, 0.0), add(&mut t, 20.0, 0.0), add(&mut t, 20.0, 20.0));
        t.add_edge(EdgeData::new(a, b)).unwrap();
        t.add_edge(EdgeData::new(a, c)).unwrap();
        assert_eq!(split_crossings(&mut t, 1.0).unwrap(), 0);
    }

    #[test]
    fn long_edge_splits_at_node_on_it() {
        let mut t = ConnectionTable::new();
        let (a, b) = (add(&mut t, 0.0, 0.0), add(&mut t, 80.0, 0.0));
        let mid = add(&mut t, 40.0, 0.8);
        let short = add(&mut t, 40.0, 30.0);
        t.add_edge(EdgeData::new(a, b)).unwrap();
        t.add_edge(EdgeData::new(mid, short)).unwrap();

        assert_eq!(split_long_edges(&mut t, 50.0, 2.0).unwrap(), 1);
        assert_eq!(t.degree(mid), 3);
        assert_eq!(t.edge_count(), 3);
        assert_eq!(split_long_edges(&mut t, 50.0, 2.0).unwrap(), 0);
    }
}
