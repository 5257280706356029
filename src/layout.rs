use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::*;

/// Assigns every node reachable from a root a level and a fixed-size slot.
///
/// Pure function of the node order and orientation. Nodes that cannot be
/// reached from any root are left out.
pub fn layout(nodes: &[Node], orientation: Orientation) -> Vec<PositionedNode> {
    let levels = compute_levels(nodes);

    let mut positioned = Vec::with_capacity(nodes.len());
    for (level, members) in levels.iter().enumerate() {
        let count = members.len();
        for (slot, &index) in members.iter().enumerate() {
            let origin = slot_origin(orientation, level, slot, count);
            positioned.push(PositionedNode::new(nodes[index].clone(), origin.x, origin.y));
        }
    }

    let dropped = nodes.len() - positioned.len();
    debug!(
        orientation = orientation.as_str(),
        levels = levels.len(),
        placed = positioned.len(),
        dropped,
        "computed flowchart layout"
    );

    positioned
}

/// Breadth-first layering from the root set, as node indices.
///
/// A node is placed on the level where it is first discovered and never
/// moved afterwards, which keeps cycles and re-converging branches finite.
pub fn compute_levels(nodes: &[Node]) -> Vec<Vec<usize>> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(idx);
    }

    let incoming: HashSet<&str> = nodes
        .iter()
        .flat_map(|node| node.connections.iter().map(String::as_str))
        .collect();

    let mut roots: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(idx, node)| {
            index.get(node.id.as_str()) == Some(idx) && !incoming.contains(node.id.as_str())
        })
        .map(|(idx, _)| idx)
        .collect();

    if roots.is_empty() {
        debug!(root = %nodes[0].id, "no node without incoming connections; using the first node");
        roots.push(0);
    }

    let mut visited: HashSet<usize> = roots.iter().copied().collect();
    let mut levels = vec![roots];

    loop {
        let mut next = Vec::new();
        for &idx in &levels[levels.len() - 1] {
            for target in &nodes[idx].connections {
                let Some(&target_idx) = index.get(target.as_str()) else {
                    debug!(source = %nodes[idx].id, %target, "skipping connection to unknown node");
                    continue;
                };
                if visited.insert(target_idx) {
                    next.push(target_idx);
                }
            }
        }

        if next.is_empty() {
            break;
        }

        next.sort_by_cached_key(|&idx| sorted_connections(&nodes[idx]));
        levels.push(next);
    }

    levels
}

fn sorted_connections(node: &Node) -> Vec<&str> {
    let mut connections: Vec<&str> = node.connections.iter().map(String::as_str).collect();
    connections.sort_unstable();
    connections
}

/// Top-left corner for slot `slot` of `count` on level `level`.
pub fn slot_origin(orientation: Orientation, level: usize, slot: usize, count: usize) -> Point {
    let level = level as f32;
    let spread = |span: f32| span / (count as f32 + 1.0) * (slot as f32 + 1.0) - SLOT_CENTER_OFFSET;

    match orientation {
        Orientation::Landscape => Point {
            x: START_OFFSET + spread(LANDSCAPE_SPAN),
            y: START_OFFSET + level * LEVEL_HEIGHT,
        },
        Orientation::Portrait => Point {
            x: START_OFFSET + level * LEVEL_WIDTH,
            y: START_OFFSET + spread(PORTRAIT_SPAN),
        },
    }
}
