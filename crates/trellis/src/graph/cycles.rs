//! Cycle prevention and detection.
//!
//! - [`would_create_cycle`] answers "may `source` depend on `target`?" before
//!   anything is committed. It builds a throwaway graph and runs a BFS, so it
//!   never touches committed state.
//! - [`find_all_cycles`] sweeps a built graph with DFS and reports every
//!   cycle closed by a back edge. It is an audit tool: a store that only
//!   accepted declarations through [`would_create_cycle`] has none.

use super::DependencyGraph;
use crate::domain::{DependencyRecord, ItemId};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Returns `true` if recording "`source` depends on `target`" would close
/// a cycle over `records`.
///
/// The candidate edge `target -> source` is added to a temporary graph, then
/// a breadth-first search runs from `source` along dependency -> dependent
/// edges. Reaching `target` means `target` already (transitively) depends on
/// `source`. A self-dependency is trivially a cycle. O(V + E).
pub fn would_create_cycle<'a>(
    source: &ItemId,
    target: &ItemId,
    records: impl IntoIterator<Item = &'a DependencyRecord>,
) -> bool {
    if source == target {
        return true;
    }

    let mut temp: DiGraphMap<&str, ()> = DiGraphMap::new();
    for record in records {
        temp.add_edge(
            record.target_item_id().as_str(),
            record.source_item_id.as_str(),
            (),
        );
    }
    temp.add_edge(target.as_str(), source.as_str(), ());

    let mut bfs = Bfs::new(&temp, source.as_str());
    while let Some(node) = bfs.next(&temp) {
        if node == target.as_str() {
            debug!(source = %source, target = %target, "Candidate dependency closes a cycle");
            return true;
        }
    }
    false
}

/// Find every cycle in `graph` reachable by a DFS back edge.
///
/// Each node is used as a DFS root at most once. When the walk reaches a
/// node that is still on the current path, the slice of the path from that
/// node to the current one is a cycle. Cycles are rotated so their smallest
/// item comes first and deduplicated; the result is sorted. O(V + E) for the
/// walk itself.
///
/// The walk is iterative, so deep chains cannot overflow the stack.
#[must_use]
pub fn find_all_cycles(graph: &DependencyGraph) -> Vec<Vec<ItemId>> {
    let mut visited: HashSet<&ItemId> = HashSet::new();
    let mut on_path: HashSet<&ItemId> = HashSet::new();
    let mut path: Vec<&ItemId> = Vec::new();
    let mut cycles: Vec<Vec<ItemId>> = Vec::new();

    debug!(
        node_count = graph.node_count(),
        edge_count = graph.edge_count(),
        "Starting cycle detection with DFS"
    );

    for root in graph.nodes() {
        if visited.contains(root) {
            continue;
        }

        // Frames are (node, its dependents, index of the next one to visit).
        let mut stack: Vec<(&ItemId, Vec<&ItemId>, usize)> = Vec::new();
        visited.insert(root);
        on_path.insert(root);
        path.push(root);
        stack.push((root, graph.dependents(root).collect(), 0));

        while let Some((node, next, cursor)) = stack.last_mut() {
            let Some(&neighbor) = next.get(*cursor) else {
                on_path.remove(*node);
                path.pop();
                stack.pop();
                continue;
            };
            *cursor += 1;

            if on_path.contains(neighbor) {
                // Back edge: the path from `neighbor` to here is a cycle.
                if let Some(start) = path.iter().position(|&n| n == neighbor) {
                    cycles.push(path[start..].iter().map(|&n| n.clone()).collect());
                }
            } else if visited.insert(neighbor) {
                on_path.insert(neighbor);
                path.push(neighbor);
                stack.push((neighbor, graph.dependents(neighbor).collect(), 0));
            }
        }
    }

    let raw = cycles.len();
    let unique = deduplicate_cycles(cycles);
    debug!(raw_cycles = raw, unique_cycles = unique.len(), "Cycle detection complete");
    unique
}

/// Cycles passing through `item`.
#[must_use]
pub fn cycles_involving(cycles: &[Vec<ItemId>], item: &ItemId) -> Vec<Vec<ItemId>> {
    cycles
        .iter()
        .filter(|cycle| cycle.contains(item))
        .cloned()
        .collect()
}

/// Deduplicate cycles by rotating each so its smallest id comes first.
///
/// Direction is kept: in a directed graph `A -> B -> C -> A` and
/// `A -> C -> B -> A` are different cycles.
fn deduplicate_cycles(cycles: Vec<Vec<ItemId>>) -> Vec<Vec<ItemId>> {
    let unique: BTreeSet<Vec<ItemId>> = cycles
        .into_iter()
        .filter(|cycle| !cycle.is_empty())
        .map(|cycle| normalize_cycle(&cycle))
        .collect();
    unique.into_iter().collect()
}

/// Rotate a cycle so its smallest id is first.
fn normalize_cycle(cycle: &[ItemId]) -> Vec<ItemId> {
    let min_idx = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);

    let mut normalized = Vec::with_capacity(cycle.len());
    normalized.extend_from_slice(&cycle[min_idx..]);
    normalized.extend_from_slice(&cycle[..min_idx]);
    normalized
}
