//! Error types for trellis operations.
//!
//! Errors fall into three groups that map onto [`RejectionReason`]:
//!
//! - **Input problems**: `Validation` (empty fields, self-dependency)
//! - **Graph conflicts**: `CycleConflict` (the declaration would close a cycle)
//! - **Internal problems**: everything else (poisoned locks, a cyclic graph
//!   reaching the analyzer, configuration and I/O failures)
//!
//! The resolver's write operations never surface these directly: they are
//! folded into a [`DependencyResult`](crate::domain::DependencyResult).

use crate::domain::{ItemId, RejectionReason};
use std::io;
use thiserror::Error;

/// The error type for trellis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A dependency record failed field validation.
    #[error("validation failed ({reason}): {message}")]
    Validation {
        /// Which rule was violated.
        reason: RejectionReason,
        /// Human-readable detail.
        message: String,
    },

    /// Adding the dependency would introduce a cycle.
    #[error("circular dependency: {from} -> {to} would create a cycle")]
    CycleConflict {
        /// The item declaring the dependency.
        from: ItemId,
        /// The item it would depend on.
        to: ItemId,
    },

    /// The item does not appear in the dependency graph.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// No live dependency record has this id.
    #[error("dependency not found: {0}")]
    DependencyNotFound(String),

    /// An analysis that requires an acyclic graph found a cycle.
    #[error("dependency graph contains a cycle")]
    CycleDetected,

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an empty-field validation error.
    pub(crate) fn empty_field(field: &str) -> Self {
        Self::Validation {
            reason: RejectionReason::EmptyField,
            message: format!("{field} must not be empty"),
        }
    }

    /// The rejection reason reported for this error.
    #[must_use]
    pub fn rejection_reason(&self) -> RejectionReason {
        match self {
            Self::Validation { reason, .. } => *reason,
            Self::CycleConflict { .. } => RejectionReason::WouldCreateCycle,
            Self::ItemNotFound(_)
            | Self::DependencyNotFound(_)
            | Self::CycleDetected
            | Self::Config(_)
            | Self::Io(_)
            | Self::Internal(_) => RejectionReason::InternalError,
        }
    }
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
