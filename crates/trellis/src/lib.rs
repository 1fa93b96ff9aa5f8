//! Dependency graph resolution for backlog items.
//!
//! Items declare "depends on" relationships through a [`Resolver`], which
//! rejects any declaration that would close a cycle, keeps a versioned store
//! of the committed records, and answers graph questions over them: cycle
//! audits, orphaned items, the critical path and connected subgraphs.
//!
//! # Example
//!
//! ```
//! use trellis::{DependencySpec, RejectionReason, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(ResolverConfig::default()).unwrap();
//!
//! let ok = resolver.declare_dependency("A", DependencySpec::new("A_on_B", "B", "B shipped"));
//! assert!(ok.success);
//!
//! let back_edge = DependencySpec::new("B_on_A", "A", "A shipped");
//! let rejected = resolver.declare_dependency("B", back_edge);
//! assert_eq!(rejected.rejection_reason, Some(RejectionReason::WouldCreateCycle));
//!
//! let path = resolver.calculate_critical_path(None).unwrap();
//! assert_eq!(path.critical_path.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod health;
pub mod resolver;
pub mod store;

pub use config::ResolverConfig;
pub use domain::{
    CircularDependencyReport, CriticalPathAnalysis, DependencyRecord, DependencyResult,
    DependencySpec, DependencyType, GraphValidationResult, ImportWarning, ItemId,
    RejectionReason, RiskLevel, Track,
};
pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use health::{HealthReport, HealthStatus};
pub use resolver::Resolver;
pub use trellis_cache::{CacheStats, Clock, SystemClock};
