//! Critical path analysis.
//!
//! The critical path is the longest duration-weighted chain through the
//! graph. It is computed as a longest-path over a topological order: each
//! root (a node with no dependencies) starts a chain of length zero, and
//! each node keeps the duration and length of the best chain ending at it
//! plus a link to its predecessor on that chain. Only the winning chain is
//! materialized, by following those links back from its last node, so the
//! pass is O(V + E) in both time and memory.
//!
//! ## Edge Durations
//!
//! The edge `a -> b` (b depends on a) weighs the time until `a` is expected
//! to be done: `estimated_completion - now` of the record declaring it.
//! Records without an estimate use the configured default (one day unless
//! overridden). Estimates already in the past count as zero. When several
//! records connect the same pair, the longest duration wins.
//!
//! ## Tie-Breaking
//!
//! Chains are compared by total duration, then by number of items, then
//! lexicographically by their item sequence (smaller wins). This makes the
//! result deterministic regardless of map iteration order. The sequence
//! comparison only runs on a tie in both duration and length, and walks the
//! two predecessor chains back only as far as the point where they merge.

use super::DependencyGraph;
use crate::domain::{CriticalPathAnalysis, DependencyRecord, ItemId, RiskLevel};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use petgraph::{Direction, algo};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tracing::debug;

/// Fallback duration for an edge whose record has no estimate.
pub const DEFAULT_EDGE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Default dependent count above which a path node is a bottleneck.
pub const DEFAULT_BOTTLENECK_THRESHOLD: usize = 2;

/// Inputs to the analyzer that are not part of the graph itself.
#[derive(Debug, Clone)]
pub struct CriticalPathOptions {
    /// Reference instant for `estimated_completion - now`.
    pub now: DateTime<Utc>,
    /// Duration used for edges without an estimate.
    pub default_edge_duration: Duration,
    /// Nodes with more dependents than this are bottlenecks.
    pub bottleneck_threshold: usize,
}

impl CriticalPathOptions {
    /// Options using the default duration and threshold.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            default_edge_duration: DEFAULT_EDGE_DURATION,
            bottleneck_threshold: DEFAULT_BOTTLENECK_THRESHOLD,
        }
    }
}

/// Best chain ending at a node, kept as a link to the previous node.
#[derive(Debug, Clone, Copy)]
struct Step {
    duration: Duration,
    len: usize,
    prev: Option<usize>,
}

/// Longest-path table. Index `i` of `steps` belongs to `names[i]`, and
/// indices follow topological order.
#[derive(Debug)]
struct Chains<'g> {
    names: &'g [&'g str],
    steps: Vec<Step>,
}

impl Chains<'_> {
    /// Lexicographic order of the chains ending at `a` and `b`, which have
    /// the same length. The last difference seen walking back is the first
    /// one from the front; once the walks meet the prefixes are shared.
    fn cmp_paths(&self, mut a: usize, mut b: usize) -> Ordering {
        let mut ordering = Ordering::Equal;
        while a != b {
            ordering = self.names[a].cmp(self.names[b]);
            match (self.steps[a].prev, self.steps[b].prev) {
                (Some(prev_a), Some(prev_b)) => {
                    a = prev_a;
                    b = prev_b;
                }
                _ => break,
            }
        }
        ordering
    }

    /// `Greater` means the chain ending at `a` beats the one ending at `b`.
    fn rank(&self, a: usize, b: usize) -> Ordering {
        let (x, y) = (&self.steps[a], &self.steps[b]);
        x.duration
            .cmp(&y.duration)
            .then_with(|| x.len.cmp(&y.len))
            .then_with(|| self.cmp_paths(b, a))
    }

    /// Whether `candidate` beats `current`, both ending at the same node.
    fn improves(&self, candidate: &Step, current: &Step) -> bool {
        let ordering = candidate
            .duration
            .cmp(&current.duration)
            .then_with(|| candidate.len.cmp(&current.len))
            .then_with(|| match (candidate.prev, current.prev) {
                (Some(a), Some(b)) => self.cmp_paths(b, a),
                _ => Ordering::Equal,
            });
        ordering == Ordering::Greater
    }

    /// Items on the chain ending at `last`, first to last.
    fn path(&self, last: usize) -> Vec<ItemId> {
        let mut path = Vec::with_capacity(self.steps[last].len);
        let mut cursor = Some(last);
        while let Some(index) = cursor {
            path.push(ItemId::new(self.names[index]));
            cursor = self.steps[index].prev;
        }
        path.reverse();
        path
    }
}

/// Compute the critical path through `graph`, optionally restricted to the
/// nodes in `node_filter`.
///
/// `records` supply edge durations and risk levels; records whose edge is
/// not in the (filtered) graph are ignored. An empty or edgeless graph
/// yields an empty path with zero duration.
///
/// # Errors
///
/// Returns `Error::CycleDetected` if the (filtered) graph is not acyclic.
pub fn calculate_critical_path<'a>(
    graph: &DependencyGraph,
    records: impl IntoIterator<Item = &'a DependencyRecord>,
    node_filter: Option<&BTreeSet<ItemId>>,
    options: &CriticalPathOptions,
) -> Result<CriticalPathAnalysis> {
    let started = Instant::now();
    let filtered;
    let graph = match node_filter {
        Some(keep) => {
            filtered = graph.restricted_to(keep);
            &filtered
        }
        None => graph,
    };

    if graph.edge_count() == 0 {
        return Ok(CriticalPathAnalysis::empty(elapsed_ms(started)));
    }

    let mut weights: HashMap<(&str, &str), Duration> = HashMap::new();
    let mut risks: BTreeMap<&ItemId, RiskLevel> = BTreeMap::new();
    for record in records {
        let dependency = record.target_item_id();
        let dependent = &record.source_item_id;
        let in_graph = graph
            .edges()
            .get(dependency)
            .is_some_and(|dependents| dependents.contains(dependent));
        if !in_graph {
            continue;
        }

        let duration = edge_duration(record, options);
        weights
            .entry((dependency.as_str(), dependent.as_str()))
            .and_modify(|w| *w = (*w).max(duration))
            .or_insert(duration);

        for item in [dependency, dependent] {
            risks
                .entry(item)
                .and_modify(|r| *r = (*r).max(record.spec.risk_level))
                .or_insert(record.spec.risk_level);
        }
    }

    let view = graph.as_graphmap();
    let order = algo::toposort(&view, None).map_err(|cycle| {
        debug!(node = cycle.node_id(), "Critical path requested on a cyclic graph");
        Error::CycleDetected
    })?;

    let index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(position, node)| (*node, position))
        .collect();
    let mut chains = Chains {
        names: &order,
        steps: Vec::with_capacity(order.len()),
    };

    for &node in &order {
        let mut chosen: Option<Step> = None;

        for dependency in view.neighbors_directed(node, Direction::Incoming) {
            let Some(&prev) = index.get(dependency) else {
                continue;
            };
            let prior = chains.steps[prev];
            let weight = weights
                .get(&(dependency, node))
                .copied()
                .unwrap_or(options.default_edge_duration);
            let candidate = Step {
                duration: prior.duration + weight,
                len: prior.len + 1,
                prev: Some(prev),
            };
            if chosen
                .as_ref()
                .is_none_or(|current| chains.improves(&candidate, current))
            {
                chosen = Some(candidate);
            }
        }

        chains.steps.push(chosen.unwrap_or(Step {
            duration: Duration::ZERO,
            len: 1,
            prev: None,
        }));
    }

    let Some(last) = (0..chains.steps.len()).max_by(|&a, &b| chains.rank(a, b)) else {
        return Ok(CriticalPathAnalysis::empty(elapsed_ms(started)));
    };
    let total_duration = chains.steps[last].duration;
    let critical_path = chains.path(last);

    let bottlenecks: Vec<ItemId> = critical_path
        .iter()
        .filter(|item| graph.dependent_count(item) > options.bottleneck_threshold)
        .cloned()
        .collect();

    let risk_factors: BTreeMap<ItemId, RiskLevel> = critical_path
        .iter()
        .map(|item| (item.clone(), risks.get(item).copied().unwrap_or_default()))
        .collect();

    let calculation_time_ms = elapsed_ms(started);
    debug!(
        length = critical_path.len(),
        total_secs = total_duration.as_secs(),
        bottlenecks = bottlenecks.len(),
        calculation_time_ms,
        "Computed critical path"
    );

    Ok(CriticalPathAnalysis {
        critical_path,
        total_duration,
        bottlenecks,
        risk_factors,
        calculation_time_ms,
    })
}

/// Remaining time until the record's target is expected to be done.
fn edge_duration(record: &DependencyRecord, options: &CriticalPathOptions) -> Duration {
    match record.spec.estimated_completion {
        Some(at) => (at - options.now).to_std().unwrap_or(Duration::ZERO),
        None => options.default_edge_duration,
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
