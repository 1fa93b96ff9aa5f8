//! The resolver facade.
//!
//! [`Resolver`] owns the [`DependencyStore`], a graph cache keyed by the
//! store version, and a [`HealthRecorder`]. It is `Send + Sync` and meant to
//! be shared behind an `Arc`.
//!
//! ## Locking
//!
//! - Declarations, removals and item registration take the store's write
//!   lock. The cycle check, the store update and cache invalidation all
//!   happen under that one lock, so two concurrent declarations cannot each
//!   pass a check that together would close a cycle.
//! - Queries take the read lock for as long as they look at the store,
//!   including building and caching a graph. A query therefore sees the store
//!   either before or after any write, never halfway through one.
//!
//! Cache keys embed the store version (`graph:v7`, `cycles:v7`), so a stale
//! entry can never be served even if invalidation were skipped. Invalidation
//! only reclaims the memory early.
//!
//! ## Expiry
//!
//! Every resolver starts a cache sweeper when it is constructed, running at
//! `cache.sweep-interval-secs`. Expired graphs are dropped by the sweeper
//! whether or not anything reads them. [`Resolver::shutdown`] stops it, and
//! dropping the resolver stops it too.

use crate::config::ResolverConfig;
use crate::domain::{
    CircularDependencyReport, CriticalPathAnalysis, DependencyRecord, DependencyResult,
    DependencySpec, GraphValidationResult, ImportWarning, ItemId, RejectionReason, Track,
};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::graph::critical_path::{self, CriticalPathOptions, elapsed_ms};
use crate::graph::cycles;
use crate::health::{HealthRecorder, HealthReport};
use crate::store::DependencyStore;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use trellis_cache::{Cache, CacheStats, Clock, SweepHandle, SystemClock};

/// Cache tag carried by every cached graph.
const GRAPH_TAG: &str = "graph";

/// Cache tag carried by every cached cycle list.
const CYCLES_TAG: &str = "cycles";

/// Values stored in the resolver's cache.
#[derive(Debug, Clone)]
enum CachedValue {
    Graph(Arc<DependencyGraph>),
    Cycles(Arc<Vec<Vec<ItemId>>>),
}

/// Validates and records dependency declarations and answers graph queries.
pub struct Resolver {
    store: RwLock<DependencyStore>,
    cache: Cache<CachedValue>,
    health: Mutex<HealthRecorder>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver that reads time from the system clock.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` fails validation and
    /// `Error::Internal` if the cache sweeper cannot be started.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a resolver that reads time from `clock`.
    ///
    /// The same clock drives cache expiry and critical path durations. The
    /// cache sweeper is started before this returns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` fails validation and
    /// `Error::Internal` if the cache sweeper cannot be started.
    pub fn with_clock(config: ResolverConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let health = HealthRecorder::new(
            config.latency_window,
            config.latency_budget(),
            config.degraded_ratio,
        );
        let resolver = Self {
            store: RwLock::new(DependencyStore::new()),
            cache: Cache::with_clock(config.cache.clone(), Arc::clone(&clock)),
            health: Mutex::new(health),
            clock,
            config,
            sweeper: Mutex::new(None),
        };
        resolver.start_sweeper()?;
        Ok(resolver)
    }

    /// The configuration this resolver was built with.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Start the background cache sweeper at the configured interval.
    ///
    /// Constructors already call this, so it is only needed to restart the
    /// sweeper after [`shutdown`](Self::shutdown). Calling it while a sweeper
    /// is running does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the sweeper thread cannot be spawned.
    pub fn start_sweeper(&self) -> Result<()> {
        let mut slot = self.sweeper_slot()?;
        if slot.is_some() {
            return Ok(());
        }
        let handle = self
            .cache
            .spawn_sweeper(self.config.cache.sweep_interval())
            .map_err(|e| Error::Internal(format!("failed to start cache sweeper: {e}")))?;
        *slot = Some(handle);
        Ok(())
    }

    /// Stop the background sweeper, if one is running, and wait for it.
    pub fn shutdown(&self) {
        let handle = match self.sweeper_slot() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            handle.shutdown();
            info!("Resolver shut down");
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Declare that `item_id` depends on `spec.target_item_id`.
    ///
    /// The declaration is validated (required fields, no self-dependency),
    /// checked against the committed graph for cycles and then committed.
    /// A declaration reusing an existing `dependency_id` replaces that
    /// record. Rejections leave the store and cache untouched.
    pub fn declare_dependency(
        &self,
        item_id: impl Into<ItemId>,
        spec: DependencySpec,
    ) -> DependencyResult {
        let item_id = item_id.into();
        self.timed("declare_dependency", || {
            let dependency_id = spec.dependency_id.clone();
            match self.commit(item_id, spec) {
                Ok(message) => DependencyResult::committed(&dependency_id, message),
                Err(err) => {
                    warn!(
                        dependency_id = %dependency_id,
                        reason = %err.rejection_reason(),
                        error = %err,
                        "Rejected dependency declaration"
                    );
                    DependencyResult::rejected(&dependency_id, &err)
                }
            }
        })
    }

    fn commit(&self, item_id: ItemId, spec: DependencySpec) -> Result<String> {
        let record = DependencyRecord::new(item_id, spec)?;
        let mut store = self.write_store()?;

        // The record being replaced, if any, must not count against its replacement.
        let closes_cycle = cycles::would_create_cycle(
            &record.source_item_id,
            record.target_item_id(),
            store
                .records()
                .filter(|existing| existing.dependency_id() != record.dependency_id()),
        );
        if closes_cycle {
            return Err(Error::CycleConflict {
                from: record.source_item_id.clone(),
                to: record.target_item_id().clone(),
            });
        }

        let dependency_id = record.dependency_id().to_string();
        let source = record.source_item_id.clone();
        let target = record.target_item_id().clone();
        let replaced = store.upsert(record).is_some();
        self.invalidate_derived();

        info!(
            dependency_id = %dependency_id,
            source = %source,
            target = %target,
            replaced,
            version = store.version(),
            "Committed dependency"
        );

        let verb = if replaced { "replaced" } else { "committed" };
        Ok(format!(
            "dependency {dependency_id} {verb}: {source} depends on {target}"
        ))
    }

    /// Retire a dependency. The record is replaced by a tombstone and
    /// disappears from every graph.
    ///
    /// Unknown or already removed ids yield an unsuccessful result.
    pub fn remove_dependency(&self, dependency_id: &str) -> DependencyResult {
        self.timed("remove_dependency", || match self.retire(dependency_id) {
            Ok(message) => DependencyResult::committed(dependency_id, message),
            Err(err) => {
                warn!(dependency_id, error = %err, "Could not remove dependency");
                DependencyResult::rejected(dependency_id, &err)
            }
        })
    }

    fn retire(&self, dependency_id: &str) -> Result<String> {
        let mut store = self.write_store()?;
        let retired = store
            .retire(dependency_id, self.clock.now())
            .ok_or_else(|| Error::DependencyNotFound(dependency_id.to_string()))?;
        self.invalidate_derived();

        info!(
            dependency_id,
            source = %retired.source_item_id,
            target = %retired.target_item_id(),
            version = store.version(),
            "Removed dependency"
        );
        Ok(format!(
            "dependency {dependency_id} removed: {} no longer depends on {}",
            retired.source_item_id,
            retired.target_item_id()
        ))
    }

    /// Make an item known without declaring any relationship for it.
    ///
    /// Known items with no dependencies and no dependents are reported as
    /// orphaned by [`validate_dependency_graph`](Self::validate_dependency_graph).
    /// Returns `true` if the item was new.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a blank id and `Error::Internal` if the
    /// store lock is poisoned.
    pub fn register_item(&self, item_id: impl Into<ItemId>) -> Result<bool> {
        let item_id = item_id.into();
        self.timed("register_item", || -> Result<bool> {
            if item_id.is_blank() {
                return Err(Error::empty_field("item_id"));
            }
            let mut store = self.write_store()?;
            let added = store.register_item(item_id.clone());
            if added {
                self.invalidate_derived();
                debug!(item = %item_id, "Registered item");
            }
            Ok(added)
        })
    }

    /// Declare each record in order, skipping (and reporting) rejections.
    ///
    /// Each record is checked against everything committed before it,
    /// including earlier records from the same batch.
    pub fn import_dependencies(
        &self,
        records: impl IntoIterator<Item = DependencyRecord>,
    ) -> Vec<ImportWarning> {
        let mut imported = 0usize;
        let mut warnings = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let result = self.declare_dependency(record.source_item_id, record.spec);
            if result.success {
                imported += 1;
                continue;
            }
            warnings.push(ImportWarning {
                index,
                dependency_id: result.dependency_id,
                reason: result
                    .rejection_reason
                    .unwrap_or(RejectionReason::InternalError),
                message: result.message,
            });
        }

        info!(imported, skipped = warnings.len(), "Imported dependency records");
        warnings
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Check the committed graph for cycles and orphaned items.
    ///
    /// The graph is valid when it has no cycles; orphans are informational.
    pub fn validate_dependency_graph(&self) -> GraphValidationResult {
        self.timed("validate_dependency_graph", || {
            let started = Instant::now();
            let analysis = self.read_store().map(|store| {
                let graph = self.graph(&store);
                let cycles = self.cycles(&store, &graph);
                (graph, cycles)
            });

            match analysis {
                Ok((graph, cycles)) => {
                    let error_messages: Vec<String> = cycles
                        .iter()
                        .map(|cycle| format!("circular dependency: {}", format_cycle(cycle)))
                        .collect();
                    let result = GraphValidationResult {
                        is_valid: cycles.is_empty(),
                        circular_dependencies: cycles.to_vec(),
                        orphaned_nodes: graph.orphans(),
                        validation_time_ms: elapsed_ms(started),
                        error_messages,
                    };
                    debug!(
                        is_valid = result.is_valid,
                        cycles = result.circular_dependencies.len(),
                        orphans = result.orphaned_nodes.len(),
                        "Validated dependency graph"
                    );
                    result
                }
                Err(err) => GraphValidationResult {
                    is_valid: false,
                    circular_dependencies: Vec::new(),
                    orphaned_nodes: Vec::new(),
                    validation_time_ms: elapsed_ms(started),
                    error_messages: vec![err.to_string()],
                },
            }
        })
    }

    /// Find every cycle in the committed graph, with the items affected and
    /// one suggested fix per cycle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the store lock is poisoned.
    pub fn detect_circular_dependencies(&self) -> Result<CircularDependencyReport> {
        self.timed("detect_circular_dependencies", || -> Result<_> {
            let started = Instant::now();
            let store = self.read_store()?;
            let graph = self.graph(&store);
            let cycles = self.cycles(&store, &graph);

            let mut affected_items: BTreeMap<ItemId, usize> = BTreeMap::new();
            for item in cycles.iter().flatten() {
                *affected_items.entry(item.clone()).or_default() += 1;
            }

            let records: Vec<&DependencyRecord> = store.records().collect();
            let resolution_suggestions = cycles
                .iter()
                .map(|cycle| suggest_resolution(cycle, &records))
                .collect();

            Ok(CircularDependencyReport {
                cycles_found: cycles.to_vec(),
                affected_items,
                resolution_suggestions,
                detection_time_ms: elapsed_ms(started),
            })
        })
    }

    /// Longest duration-weighted chain through the committed graph.
    ///
    /// With a `track`, the analysis is limited to the items touched by
    /// dependencies whose target is on that track.
    ///
    /// # Errors
    ///
    /// Returns `Error::CycleDetected` if the analyzed graph has a cycle and
    /// `Error::Internal` if the store lock is poisoned.
    pub fn calculate_critical_path(&self, track: Option<Track>) -> Result<CriticalPathAnalysis> {
        self.timed("calculate_critical_path", || -> Result<_> {
            let store = self.read_store()?;
            let graph = self.graph(&store);
            let filter = track.map(|track| track_items(&store, track));
            let options = CriticalPathOptions {
                now: self.clock.now(),
                default_edge_duration: self.config.default_edge_duration(),
                bottleneck_threshold: self.config.bottleneck_threshold,
            };
            critical_path::calculate_critical_path(
                &graph,
                store.records(),
                filter.as_ref(),
                &options,
            )
        })
    }

    /// A copy of the committed graph, or of the connected component
    /// containing `item_id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ItemNotFound` if `item_id` is not in the graph and
    /// `Error::Internal` if the store lock is poisoned.
    pub fn get_dependency_graph(&self, item_id: Option<&ItemId>) -> Result<DependencyGraph> {
        self.timed("get_dependency_graph", || -> Result<_> {
            let store = self.read_store()?;
            let graph = self.graph(&store);
            match item_id {
                None => Ok(DependencyGraph::clone(&graph)),
                Some(item) => graph
                    .connected_component(item)
                    .ok_or_else(|| Error::ItemNotFound(item.clone())),
            }
        })
    }

    /// Live records in which `item_id` is the dependent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the store lock is poisoned.
    pub fn get_dependencies(&self, item_id: &ItemId) -> Result<Vec<DependencyRecord>> {
        self.timed("get_dependencies", || -> Result<_> {
            let store = self.read_store()?;
            Ok(store
                .records()
                .filter(|r| &r.source_item_id == item_id)
                .cloned()
                .collect())
        })
    }

    /// Live records in which `item_id` is depended upon.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the store lock is poisoned.
    pub fn get_dependents(&self, item_id: &ItemId) -> Result<Vec<DependencyRecord>> {
        self.timed("get_dependents", || -> Result<_> {
            let store = self.read_store()?;
            Ok(store
                .records()
                .filter(|r| r.target_item_id() == item_id)
                .cloned()
                .collect())
        })
    }

    /// Every live record in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the store lock is poisoned.
    pub fn list_dependencies(&self) -> Result<Vec<DependencyRecord>> {
        self.timed("list_dependencies", || -> Result<_> {
            Ok(self.read_store()?.records().cloned().collect())
        })
    }

    /// Whether declaring "`source` depends on `target`" would be rejected
    /// as a cycle. Nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the store lock is poisoned.
    pub fn would_create_cycle(&self, source: &ItemId, target: &ItemId) -> Result<bool> {
        self.timed("would_create_cycle", || -> Result<_> {
            let store = self.read_store()?;
            Ok(cycles::would_create_cycle(source, target, store.records()))
        })
    }

    /// Latency window summary and derived status.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        self.health_recorder().report()
    }

    /// Statistics for the graph cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// The graph for the store's current version, from cache when possible.
    fn graph(&self, store: &DependencyStore) -> Arc<DependencyGraph> {
        let key = format!("graph:v{}", store.version());
        if let Some(CachedValue::Graph(graph)) = self.cache.get(&key) {
            return graph;
        }

        let graph = Arc::new(DependencyGraph::build_with_items(
            store.items(),
            store.records(),
        ));
        self.cache
            .set(key, CachedValue::Graph(Arc::clone(&graph)), None, &[GRAPH_TAG]);
        graph
    }

    /// Cycles in `graph`, cached under the same version as the graph.
    fn cycles(&self, store: &DependencyStore, graph: &DependencyGraph) -> Arc<Vec<Vec<ItemId>>> {
        let key = format!("cycles:v{}", store.version());
        if let Some(CachedValue::Cycles(cycles)) = self.cache.get(&key) {
            return cycles;
        }

        let cycles = Arc::new(cycles::find_all_cycles(graph));
        if !cycles.is_empty() {
            warn!(count = cycles.len(), "Dependency graph contains cycles");
        }
        self.cache
            .set(key, CachedValue::Cycles(Arc::clone(&cycles)), None, &[CYCLES_TAG]);
        cycles
    }

    /// Drop every cached derivation of the store. Called with the store's
    /// write lock held.
    fn invalidate_derived(&self) {
        let removed =
            self.cache.invalidate_by_tag(GRAPH_TAG) + self.cache.invalidate_by_tag(CYCLES_TAG);
        debug!(removed, "Invalidated cached graphs");
    }

    fn timed<T>(&self, operation: &'static str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record_latency(operation, started.elapsed());
        out
    }

    fn record_latency(&self, operation: &'static str, elapsed: Duration) {
        self.health_recorder().record(operation, elapsed);
    }

    /// The recorder holds only samples, so a poisoned lock is recovered.
    fn health_recorder(&self) -> MutexGuard<'_, HealthRecorder> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, DependencyStore>> {
        self.store.read().map_err(|_| {
            warn!("Dependency store lock poisoned");
            Error::Internal("dependency store lock poisoned".to_string())
        })
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, DependencyStore>> {
        self.store.write().map_err(|_| {
            warn!("Dependency store lock poisoned");
            Error::Internal("dependency store lock poisoned".to_string())
        })
    }

    fn sweeper_slot(&self) -> Result<MutexGuard<'_, Option<SweepHandle>>> {
        self.sweeper
            .lock()
            .map_err(|_| Error::Internal("sweeper lock poisoned".to_string()))
    }
}

/// Items at either end of a live dependency whose target is on `track`.
fn track_items(store: &DependencyStore, track: Track) -> BTreeSet<ItemId> {
    store
        .records()
        .filter(|r| r.spec.target_track == Some(track))
        .flat_map(|r| [r.source_item_id.clone(), r.target_item_id().clone()])
        .collect()
}

/// `A -> B -> C -> A`
fn format_cycle(cycle: &[ItemId]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(ItemId::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

/// Suggest the lowest-risk dependency on `cycle` as the one to drop.
/// Ties go to the smallest dependency id.
fn suggest_resolution(cycle: &[ItemId], records: &[&DependencyRecord]) -> String {
    let len = cycle.len();
    let candidate = (0..len)
        .flat_map(move |i| {
            let dependency = &cycle[i];
            let dependent = &cycle[(i + 1) % len];
            records.iter().copied().filter(move |r| {
                r.target_item_id() == dependency && &r.source_item_id == dependent
            })
        })
        .min_by(|a, b| {
            a.spec
                .risk_level
                .cmp(&b.spec.risk_level)
                .then_with(|| a.dependency_id().cmp(b.dependency_id()))
        });

    match candidate {
        Some(record) => format!(
            "remove dependency {} ({} depends on {}, risk {}) to break cycle {}",
            record.dependency_id(),
            record.source_item_id,
            record.target_item_id(),
            record.spec.risk_level,
            format_cycle(cycle)
        ),
        None => format!("review the dependencies along cycle {}", format_cycle(cycle)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RiskLevel;
    use trellis_cache::clock::ManualClock;

    fn id(s: &str) -> ItemId {
        ItemId::new(s)
    }

    fn spec(dependency_id: &str, target: &str) -> DependencySpec {
        DependencySpec::new(dependency_id, target, "done")
    }

    fn resolver() -> Resolver {
        Resolver::with_clock(ResolverConfig::default(), Arc::new(ManualClock::default())).unwrap()
    }

    /// Unvalidated record, so cyclic fixtures can be assembled directly.
    fn raw(dependency_id: &str, source: &str, target: &str, risk: RiskLevel) -> DependencyRecord {
        DependencyRecord {
            source_item_id: id(source),
            spec: spec(dependency_id, target).with_risk(risk),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ResolverConfig {
            latency_window: 0,
            ..ResolverConfig::default()
        };
        assert!(matches!(Resolver::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn format_cycle_closes_the_loop() {
        assert_eq!(format_cycle(&[id("A"), id("B")]), "A -> B -> A");
    }

    #[test]
    fn suggestion_picks_lowest_risk_edge() {
        // Cycle A -> B -> C -> A (each arrow: dependency -> dependent).
        let records = [
            raw("b_on_a", "B", "A", RiskLevel::High),
            raw("c_on_b", "C", "B", RiskLevel::Low),
            raw("a_on_c", "A", "C", RiskLevel::Critical),
        ];
        let refs: Vec<&DependencyRecord> = records.iter().collect();

        let suggestion = suggest_resolution(&[id("A"), id("B"), id("C")], &refs);
        assert!(suggestion.starts_with("remove dependency c_on_b"));
        assert!(suggestion.contains("risk LOW"));
        assert!(suggestion.ends_with("A -> B -> C -> A"));
    }

    #[test]
    fn suggestion_ties_go_to_smallest_id() {
        let records = [
            raw("z_edge", "B", "A", RiskLevel::Medium),
            raw("m_edge", "A", "B", RiskLevel::Medium),
        ];
        let refs: Vec<&DependencyRecord> = records.iter().collect();

        let suggestion = suggest_resolution(&[id("A"), id("B")], &refs);
        assert!(suggestion.starts_with("remove dependency m_edge"));
    }

    #[test]
    fn graph_is_cached_per_version() {
        let resolver = resolver();
        resolver.declare_dependency("B", spec("b_on_a", "A"));

        resolver.get_dependency_graph(None).unwrap();
        resolver.get_dependency_graph(None).unwrap();
        let stats = resolver.cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);

        resolver.declare_dependency("C", spec("c_on_b", "B"));
        assert_eq!(resolver.cache_stats().size, 0);
        let graph = resolver.get_dependency_graph(None).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn rejection_keeps_cached_graph() {
        let resolver = resolver();
        resolver.declare_dependency("A", spec("a_on_b", "B"));
        resolver.get_dependency_graph(None).unwrap();
        let before = resolver.cache_stats();

        let result = resolver.declare_dependency("B", spec("b_on_a", "A"));
        assert!(!result.success);

        let after = resolver.cache_stats();
        assert_eq!(after.size, before.size);
        assert_eq!(after.invalidations, before.invalidations);
    }

    #[test]
    fn every_call_is_recorded_for_health() {
        let resolver = resolver();
        resolver.declare_dependency("A", spec("a_on_b", "B"));
        resolver.validate_dependency_graph();
        resolver.list_dependencies().unwrap();

        let report = resolver.health();
        assert_eq!(report.samples, 3);
        assert!((report.budget_ms - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejected_registration_is_recorded_for_health() {
        let resolver = resolver();
        assert!(matches!(resolver.register_item("  "), Err(Error::Validation { .. })));
        assert!(resolver.register_item("A").unwrap());

        assert_eq!(resolver.health().samples, 2);
    }

    #[test]
    fn sweeper_runs_from_construction_until_shutdown() {
        let resolver = resolver();
        assert!(resolver.sweeper_slot().unwrap().as_ref().is_some_and(SweepHandle::is_running));

        resolver.start_sweeper().unwrap();
        resolver.shutdown();
        assert!(resolver.sweeper_slot().unwrap().is_none());
        resolver.shutdown();

        resolver.start_sweeper().unwrap();
        assert!(resolver.sweeper_slot().unwrap().is_some());
    }
}
