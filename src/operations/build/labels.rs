use std::collections::HashSet;

use tracing::trace;

use crate::error::Result;
use crate::geometry::{LabelShape, Shape};
use crate::graph::{ConnectionTable, NodeId};
use crate::math::Point2;

/// First node, in arena order, lying inside `shape`.
#[must_use]
pub fn label_node(table: &ConnectionTable, shape: &Shape) -> Option<NodeId> {
    table
        .nodes()
        .find(|(_, n)| shape.contains(&n.point))
        .map(|(id, _)| id)
}

/// Collapses every node under a label onto one node at the label's centre
/// carrying the label's symbol.
///
/// A node claimed by one label is not moved again by a later, overlapping
/// label.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn absorb_labels(table: &mut ConnectionTable, labels: &[LabelShape]) -> Result<usize> {
    let mut claimed: HashSet<NodeId> = HashSet::new();
    let mut absorbed = 0;
    for label in labels {
        let inside: Vec<NodeId> = table
            .nodes()
            .filter(|(id, n)| !claimed.contains(id) && label.shape.contains(&n.point))
            .map(|(id, _)| id)
            .collect();
        let Some((&keep, rest)) = inside.split_first() else {
            continue;
        };
        let centre = label.shape.centroid();
        let symbol = label.symbol();
        let current = table.node(keep)?;
        if current.point != centre || current.symbol != symbol {
            let node = table.node_mut(keep)?;
            node.point = centre;
            symbol.clone_into(&mut node.symbol);
        }
        for &other in rest {
            table.merge_nodes(keep, other)?;
        }
        absorbed += rest.len();
        claimed.insert(keep);
    }
    if absorbed > 0 {
        trace!(absorbed, "absorbed nodes into labels");
    }
    Ok(absorbed)
}

/// Joins dangling bond ends that stop just short of a label.
///
/// A node qualifies when it has exactly one edge, lies outside every label,
/// is within `max_distance` of a label's outline, and its edge points
/// toward that label. It is merged into the label's node.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn snap_extensions(
    table: &mut ConnectionTable,
    labels: &[LabelShape],
    max_distance: f64,
) -> Result<usize> {
    let mut snapped = 0;
    while let Some((node, target)) = first_extension(table, labels, max_distance) {
        table.merge_nodes(target, node)?;
        snapped += 1;
    }
    if snapped > 0 {
        trace!(snapped, "snapped bond ends onto labels");
    }
    Ok(snapped)
}

fn first_extension(
    table: &ConnectionTable,
    labels: &[LabelShape],
    max_distance: f64,
) -> Option<(NodeId, NodeId)> {
    for (id, n) in table.nodes() {
        if table.degree(id) != 1 || labels.iter().any(|l| l.shape.contains(&n.point)) {
            continue;
        }
        let edge = table.edge(table.incident_edges(id)[0]).ok()?;
        let other = edge.other(id)?;
        let from = table.node(other).ok()?.point;
        let heading = n.point - from;
        for label in labels {
            let Some(target) = label_node(table, &label.shape) else {
                continue;
            };
            if target == other || label.shape.distance_to(&n.point) > max_distance {
                continue;
            }
            if (label.shape.centroid() - n.point).dot(&heading) > 0.0 {
                return Some((id, target));
            }
        }
    }
    None
}

/// Flags bonds between two different labels that are almost entirely
/// covered by the labels themselves.
///
/// The outside fraction is the share of samples along the bond that fall
/// in neither label; bonds below `min_outside` are marked spurious.
///
/// # Errors
///
/// Propagates arena errors; none occur on a consistent table.
pub fn flag_spurious(
    table: &mut ConnectionTable,
    labels: &[LabelShape],
    min_outside: f64,
) -> Result<usize> {
    let containing = |p: &Point2| labels.iter().position(|l| l.shape.contains(p));
    let mut flagged = Vec::new();
    for (id, e) in table.edges() {
        if e.spurious {
            continue;
        }
        let seg = table.edge_segment(id)?;
        let (Some(la), Some(lb)) = (containing(&seg.a), containing(&seg.b)) else {
            continue;
        };
        if la == lb {
            continue;
        }
        let samples = (seg.length().ceil() as usize).max(1) + 1;
        let outside = (0..samples)
            .map(|i| seg.point_at(i as f64 / (samples - 1) as f64))
            .filter(|p| !labels[la].shape.contains(p) && !labels[lb].shape.contains(p))
            .count();
        if (outside as f64 / samples as f64) < min_outside {
            flagged.push(id);
        }
    }
    for &id in &flagged {
        table.edge_mut(id)?.spurious = true;
    }
    if !flagged.is_empty() {
        trace!(flagged = flagged.len(), "flagged spurious bonds");
    }
    Ok(flagged.len())
}
