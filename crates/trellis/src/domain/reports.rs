//! Result structures handed to collaborators.
//!
//! All reports are plain data: cycles and orphaned nodes are expected,
//! actionable states and are reported here rather than raised as errors.

use super::{ItemId, RejectionReason, RiskLevel};
use crate::error::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome of declaring (or removing) a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyResult {
    /// `true` once the record is committed
    pub success: bool,
    /// The dependency the result refers to
    pub dependency_id: String,
    /// Human-readable summary
    pub message: String,
    /// Why the declaration was rejected, if it was
    pub rejection_reason: Option<RejectionReason>,
    /// Individual validation failures
    pub validation_errors: Vec<String>,
}

impl DependencyResult {
    /// A committed declaration.
    pub(crate) fn committed(dependency_id: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            dependency_id: dependency_id.to_string(),
            message: message.into(),
            rejection_reason: None,
            validation_errors: Vec::new(),
        }
    }

    /// A rejected declaration, described by the error that stopped it.
    pub(crate) fn rejected(dependency_id: &str, error: &Error) -> Self {
        let reason = error.rejection_reason();
        let validation_errors = match error {
            Error::Validation { message, .. } => vec![message.clone()],
            _ => Vec::new(),
        };
        Self {
            success: false,
            dependency_id: dependency_id.to_string(),
            message: error.to_string(),
            rejection_reason: Some(reason),
            validation_errors,
        }
    }
}

/// Outcome of a whole-graph validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphValidationResult {
    /// `true` when the graph has no cycles
    pub is_valid: bool,
    /// Every cycle found, each rotated so its smallest item comes first
    pub circular_dependencies: Vec<Vec<ItemId>>,
    /// Known items with neither dependencies nor dependents
    pub orphaned_nodes: Vec<ItemId>,
    /// Wall-clock time spent validating
    pub validation_time_ms: f64,
    /// One message per problem found
    pub error_messages: Vec<String>,
}

/// Outcome of a cycle detection sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularDependencyReport {
    /// Every cycle found, each rotated so its smallest item comes first
    pub cycles_found: Vec<Vec<ItemId>>,
    /// For each item on at least one cycle, how many cycles it is on
    pub affected_items: BTreeMap<ItemId, usize>,
    /// One suggestion per cycle naming a dependency whose removal breaks it
    pub resolution_suggestions: Vec<String>,
    /// Wall-clock time spent detecting
    pub detection_time_ms: f64,
}

impl CircularDependencyReport {
    /// Returns `true` when no cycles were found.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.cycles_found.is_empty()
    }
}

/// Longest duration-weighted chain through the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPathAnalysis {
    /// Items in execution order, earliest first
    pub critical_path: Vec<ItemId>,
    /// Sum of edge durations along the path
    pub total_duration: Duration,
    /// Items on the path whose dependent count exceeds the threshold
    pub bottlenecks: Vec<ItemId>,
    /// Highest risk among the dependencies touching each item on the path
    pub risk_factors: BTreeMap<ItemId, RiskLevel>,
    /// Wall-clock time spent calculating
    pub calculation_time_ms: f64,
}

impl CriticalPathAnalysis {
    /// An empty analysis: no path, zero duration.
    #[must_use]
    pub fn empty(calculation_time_ms: f64) -> Self {
        Self {
            critical_path: Vec::new(),
            total_duration: Duration::ZERO,
            bottlenecks: Vec::new(),
            risk_factors: BTreeMap::new(),
            calculation_time_ms,
        }
    }
}

/// A record skipped during bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportWarning {
    /// Position of the record in the import batch
    pub index: usize,
    /// The skipped record's id
    pub dependency_id: String,
    /// Why it was skipped
    pub reason: RejectionReason,
    /// Human-readable detail
    pub message: String,
}
