//! Dependency graph construction and queries.
//!
//! ## Edge Direction Convention
//!
//! The graph uses a **dependency -> dependent** edge direction: if `A`
//! depends on `B`, the edge is `B -> A`. `B` is "earlier" and `A` runs
//! after it.
//!
//! - `edges[B]` holds B's **dependents** (`{A}`)
//! - `reverse_edges[A]` holds A's **dependencies** (`{B}`)
//!
//! The two maps are exact transposes of each other. Graphs are never
//! mutated after construction; a new graph is built whenever the store
//! changes.
//!
//! Submodules hold the algorithms that run over a built graph:
//! [`cycles`] (reachability checks and cycle sweeps) and [`critical_path`].

pub mod critical_path;
pub mod cycles;

use crate::domain::{DependencyRecord, ItemId};
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// An immutable directed graph over item identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    nodes: BTreeSet<ItemId>,
    /// dependency -> its dependents
    edges: BTreeMap<ItemId, BTreeSet<ItemId>>,
    /// dependent -> its dependencies
    reverse_edges: BTreeMap<ItemId, BTreeSet<ItemId>>,
}

impl DependencyGraph {
    /// Build a graph from dependency records.
    ///
    /// Malformed records (blank item ids or a self-dependency) are skipped
    /// with a warning rather than failing the build.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a DependencyRecord>) -> Self {
        Self::build_with_items(std::iter::empty(), records)
    }

    /// Build a graph from dependency records plus standalone items.
    ///
    /// Items that appear in no record become isolated nodes.
    pub fn build_with_items<'a>(
        items: impl IntoIterator<Item = &'a ItemId>,
        records: impl IntoIterator<Item = &'a DependencyRecord>,
    ) -> Self {
        let mut graph = Self::default();

        for item in items {
            if item.is_blank() {
                warn!("Skipping blank item id while building graph");
                continue;
            }
            graph.nodes.insert(item.clone());
        }

        let mut skipped = 0usize;
        for record in records {
            let source = &record.source_item_id;
            let target = record.target_item_id();
            if source.is_blank() || target.is_blank() || source == target {
                warn!(
                    dependency_id = record.dependency_id(),
                    source = %source,
                    target = %target,
                    "Skipping malformed dependency record"
                );
                skipped += 1;
                continue;
            }
            graph.add_edge(target, source);
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped,
            "Built dependency graph"
        );
        graph
    }

    /// Record that `dependent` depends on `dependency`.
    fn add_edge(&mut self, dependency: &ItemId, dependent: &ItemId) {
        self.nodes.insert(dependency.clone());
        self.nodes.insert(dependent.clone());
        self.edges
            .entry(dependency.clone())
            .or_default()
            .insert(dependent.clone());
        self.reverse_edges
            .entry(dependent.clone())
            .or_default()
            .insert(dependency.clone());
    }

    /// All nodes.
    #[must_use]
    pub fn nodes(&self) -> &BTreeSet<ItemId> {
        &self.nodes
    }

    /// dependency -> dependents adjacency. Nodes without dependents are absent.
    #[must_use]
    pub fn edges(&self) -> &BTreeMap<ItemId, BTreeSet<ItemId>> {
        &self.edges
    }

    /// dependent -> dependencies adjacency. Nodes without dependencies are absent.
    #[must_use]
    pub fn reverse_edges(&self) -> &BTreeMap<ItemId, BTreeSet<ItemId>> {
        &self.reverse_edges
    }

    /// Returns `true` if `item` is a node.
    #[must_use]
    pub fn contains(&self, item: &ItemId) -> bool {
        self.nodes.contains(item)
    }

    /// Items that depend directly on `item`.
    pub fn dependents(&self, item: &ItemId) -> impl Iterator<Item = &ItemId> {
        self.edges.get(item).into_iter().flatten()
    }

    /// Items `item` depends on directly.
    pub fn dependencies(&self, item: &ItemId) -> impl Iterator<Item = &ItemId> {
        self.reverse_edges.get(item).into_iter().flatten()
    }

    /// Number of direct dependents of `item`.
    #[must_use]
    pub fn dependent_count(&self, item: &ItemId) -> usize {
        self.edges.get(item).map_or(0, BTreeSet::len)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes with no dependencies, in sorted order.
    pub fn roots(&self) -> impl Iterator<Item = &ItemId> {
        self.nodes
            .iter()
            .filter(|node| !self.reverse_edges.contains_key(*node))
    }

    /// Nodes with neither dependencies nor dependents, in sorted order.
    #[must_use]
    pub fn orphans(&self) -> Vec<ItemId> {
        self.nodes
            .iter()
            .filter(|node| {
                !self.edges.contains_key(*node) && !self.reverse_edges.contains_key(*node)
            })
            .cloned()
            .collect()
    }

    /// The subgraph induced by `keep`: nodes in both, and the edges whose
    /// endpoints are both kept.
    #[must_use]
    pub fn restricted_to(&self, keep: &BTreeSet<ItemId>) -> Self {
        let mut sub = Self::default();
        for node in self.nodes.intersection(keep) {
            sub.nodes.insert(node.clone());
        }
        for (dependency, dependents) in &self.edges {
            if !keep.contains(dependency) {
                continue;
            }
            for dependent in dependents.iter().filter(|d| keep.contains(*d)) {
                sub.add_edge(dependency, dependent);
            }
        }
        sub
    }

    /// The connected component containing `item`, following edges in both
    /// directions. Returns `None` if `item` is not a node.
    ///
    /// Uses BFS, so cost is proportional to the size of the component.
    #[must_use]
    pub fn connected_component(&self, item: &ItemId) -> Option<Self> {
        if !self.contains(item) {
            return None;
        }

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(item.clone());
        queue.push_back(item);

        while let Some(current) = queue.pop_front() {
            for next in self.dependents(current).chain(self.dependencies(current)) {
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }

        Some(self.restricted_to(&seen))
    }

    /// A petgraph view for algorithms that need one (topological sort,
    /// traversal). Edges follow the dependency -> dependent direction.
    #[must_use]
    pub fn as_graphmap(&self) -> DiGraphMap<&str, ()> {
        let mut g = DiGraphMap::with_capacity(self.node_count(), self.edge_count());
        for node in &self.nodes {
            g.add_node(node.as_str());
        }
        for (dependency, dependents) in &self.edges {
            for dependent in dependents {
                g.add_edge(dependency.as_str(), dependent.as_str(), ());
            }
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencySpec;

    fn id(s: &str) -> ItemId {
        ItemId::new(s)
    }

    /// `source` depends on `target`.
    fn dep(source: &str, target: &str) -> DependencyRecord {
        DependencyRecord::new(
            id(source),
            DependencySpec::new(format!("{source}_depends_on_{target}"), target, "done"),
        )
        .unwrap()
    }

    /// Checks the transpose invariant between `edges` and `reverse_edges`.
    fn assert_transposed(graph: &DependencyGraph) {
        for (from, tos) in graph.edges() {
            for to in tos {
                assert!(graph.reverse_edges()[to].contains(from));
            }
        }
        for (to, froms) in graph.reverse_edges() {
            for from in froms {
                assert!(graph.edges()[from].contains(to));
            }
        }
    }

    #[test]
    fn edge_points_from_dependency_to_dependent() {
        let graph = DependencyGraph::build(&[dep("A", "B")]);

        assert_eq!(graph.dependents(&id("B")).collect::<Vec<_>>(), vec![&id("A")]);
        assert_eq!(graph.dependencies(&id("A")).collect::<Vec<_>>(), vec![&id("B")]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_transposed(&graph);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut self_loop = dep("A", "B");
        self_loop.spec.target_item_id = id("A");
        let mut blank = dep("C", "D");
        blank.source_item_id = id(" ");

        let graph = DependencyGraph::build(&[self_loop, blank, dep("E", "F")]);

        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains(&id("A")));
        assert!(graph.contains(&id("E")));
    }

    #[test]
    fn duplicate_pairs_collapse_to_one_edge() {
        let mut second = dep("A", "B");
        second.spec.dependency_id = "another".into();

        let graph = DependencyGraph::build(&[dep("A", "B"), second]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn standalone_items_are_orphans() {
        let items = [id("lonely")];
        let records = [dep("A", "B")];
        let graph = DependencyGraph::build_with_items(&items, &records);

        assert_eq!(graph.orphans(), vec![id("lonely")]);
        assert_eq!(graph.roots().cloned().collect::<Vec<_>>(), vec![id("B"), id("lonely")]);
    }

    #[test]
    fn connected_component_follows_both_directions() {
        // B <- A -> ... : A depends on B and C; D depends on C; X depends on Y.
        let graph = DependencyGraph::build(&[
            dep("A", "B"),
            dep("A", "C"),
            dep("D", "C"),
            dep("X", "Y"),
        ]);

        let component = graph.connected_component(&id("B")).unwrap();
        let nodes: Vec<&str> = component.nodes().iter().map(ItemId::as_str).collect();
        assert_eq!(nodes, vec!["A", "B", "C", "D"]);
        assert_eq!(component.edge_count(), 3);
        assert_transposed(&component);

        assert!(graph.connected_component(&id("missing")).is_none());
    }

    #[test]
    fn restricted_to_drops_edges_leaving_the_set() {
        let graph = DependencyGraph::build(&[dep("B", "A"), dep("C", "B")]);
        let keep: BTreeSet<ItemId> = [id("A"), id("B")].into_iter().collect();

        let sub = graph.restricted_to(&keep);
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 1);
        assert_transposed(&sub);
    }

    #[test]
    fn graphmap_view_mirrors_edges() {
        let graph = DependencyGraph::build(&[dep("B", "A"), dep("C", "B")]);
        let view = graph.as_graphmap();

        assert_eq!(view.node_count(), 3);
        assert!(view.contains_edge("A", "B"));
        assert!(view.contains_edge("B", "C"));
        assert!(!view.contains_edge("B", "A"));
    }
}
