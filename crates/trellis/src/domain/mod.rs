//! Domain types for dependency resolution.
//!
//! This module contains the value types that flow into the resolver
//! ([`DependencySpec`]) and the records it commits ([`DependencyRecord`]).
//! Output reports live in [`reports`].

pub mod reports;

pub use reports::{
    CircularDependencyReport, CriticalPathAnalysis, DependencyResult, GraphValidationResult,
    ImportWarning,
};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a backlog item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new item ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the ID is empty or whitespace only
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Type of dependency relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyType {
    /// Hard blocker - prevents work
    #[default]
    Blocks,

    /// Soft link - informational
    Related,

    /// Hierarchical - epic to task
    ParentChild,

    /// Found during work
    DiscoveredFrom,
}

/// Delivery track an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Build, deploy and runtime plumbing
    Infrastructure,

    /// Product functionality
    Development,

    /// Verification and quality gates
    Testing,

    /// Guides, references and specs
    Documentation,

    /// Spikes and experiments
    Research,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Infrastructure => "infrastructure",
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
            Self::Research => "research",
        };
        f.write_str(name)
    }
}

impl FromStr for Track {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "infrastructure" => Ok(Self::Infrastructure),
            "development" => Ok(Self::Development),
            "testing" => Ok(Self::Testing),
            "documentation" => Ok(Self::Documentation),
            "research" => Ok(Self::Research),
            other => Err(Error::Config(format!("unknown track: {other}"))),
        }
    }
}

/// How risky a dependency is to the dependent item's delivery.
///
/// Ordered so that `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Unlikely to slip
    #[default]
    Low,

    /// Some uncertainty
    Medium,

    /// Likely to slip without attention
    High,

    /// Threatens the dependent's delivery
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Why a declaration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    /// A required field was empty
    EmptyField,

    /// The item would depend on itself
    SelfDependency,

    /// The dependency would close a cycle
    WouldCreateCycle,

    /// Unexpected failure inside the resolver
    InternalError,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EmptyField => "EMPTY_FIELD",
            Self::SelfDependency => "SELF_DEPENDENCY",
            Self::WouldCreateCycle => "WOULD_CREATE_CYCLE",
            Self::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(name)
    }
}

/// A declared "depends on" relationship, as supplied by the caller.
///
/// The declaring (source) item is not part of the spec; it is supplied to
/// [`Resolver::declare_dependency`](crate::Resolver::declare_dependency) and
/// stored alongside the spec in a [`DependencyRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Unique key. Declaring the same id again replaces the earlier record.
    pub dependency_id: String,

    /// Kind of relationship
    #[serde(default)]
    pub dependency_type: DependencyType,

    /// The item being depended upon
    pub target_item_id: ItemId,

    /// Track of the target item, used for track-filtered analysis
    #[serde(default)]
    pub target_track: Option<Track>,

    /// What must be true for the dependency to count as satisfied
    pub satisfaction_criteria: String,

    /// When the target is expected to be done
    #[serde(default)]
    pub estimated_completion: Option<DateTime<Utc>>,

    /// Delivery risk carried by this dependency
    #[serde(default)]
    pub risk_level: RiskLevel,

    /// Plan for when the risk materializes
    #[serde(default)]
    pub mitigation_strategy: Option<String>,
}

impl DependencySpec {
    /// Create a spec with the required fields; everything else defaults.
    pub fn new(
        dependency_id: impl Into<String>,
        target_item_id: impl Into<ItemId>,
        satisfaction_criteria: impl Into<String>,
    ) -> Self {
        Self {
            dependency_id: dependency_id.into(),
            dependency_type: DependencyType::default(),
            target_item_id: target_item_id.into(),
            target_track: None,
            satisfaction_criteria: satisfaction_criteria.into(),
            estimated_completion: None,
            risk_level: RiskLevel::default(),
            mitigation_strategy: None,
        }
    }

    /// Set the relationship kind.
    #[must_use]
    pub fn with_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    /// Set the target's track.
    #[must_use]
    pub fn with_track(mut self, track: Track) -> Self {
        self.target_track = Some(track);
        self
    }

    /// Set the expected completion of the target.
    #[must_use]
    pub fn with_estimated_completion(mut self, at: DateTime<Utc>) -> Self {
        self.estimated_completion = Some(at);
        self
    }

    /// Set the risk level.
    #[must_use]
    pub fn with_risk(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    /// Set the mitigation strategy.
    #[must_use]
    pub fn with_mitigation(mut self, strategy: impl Into<String>) -> Self {
        self.mitigation_strategy = Some(strategy.into());
        self
    }

    /// Validate the spec's own fields.
    ///
    /// Checks that `dependency_id`, `target_item_id` and
    /// `satisfaction_criteria` are non-blank. Self-dependency needs the
    /// source item and is checked by [`DependencyRecord::new`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` with reason `EmptyField`, listing every
    /// blank field.
    pub fn validate(&self) -> Result<()> {
        let mut empty = Vec::new();
        if self.dependency_id.trim().is_empty() {
            empty.push("dependency_id");
        }
        if self.target_item_id.is_blank() {
            empty.push("target_item_id");
        }
        if self.satisfaction_criteria.trim().is_empty() {
            empty.push("satisfaction_criteria");
        }

        match empty.as_slice() {
            [] => Ok(()),
            [field] => Err(Error::empty_field(field)),
            fields => Err(Error::empty_field(&fields.join(", "))),
        }
    }
}

/// A committed dependency: `source_item_id` depends on
/// `spec.target_item_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// The dependent item (runs after the target)
    pub source_item_id: ItemId,

    /// The declared relationship
    pub spec: DependencySpec,
}

impl DependencyRecord {
    /// Pair a spec with its source item, validating both.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` / `EmptyField` if the source or any required
    ///   spec field is blank
    /// - `Error::Validation` / `SelfDependency` if source and target are the
    ///   same item
    pub fn new(source_item_id: ItemId, spec: DependencySpec) -> Result<Self> {
        if source_item_id.is_blank() {
            return Err(Error::empty_field("item_id"));
        }
        spec.validate()?;
        if source_item_id == spec.target_item_id {
            return Err(Error::Validation {
                reason: RejectionReason::SelfDependency,
                message: format!("{source_item_id} cannot depend on itself"),
            });
        }
        Ok(Self {
            source_item_id,
            spec,
        })
    }

    /// The record's unique key.
    #[must_use]
    pub fn dependency_id(&self) -> &str {
        &self.spec.dependency_id
    }

    /// The item being depended upon.
    #[must_use]
    pub fn target_item_id(&self) -> &ItemId {
        &self.spec.target_item_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn spec() -> DependencySpec {
        DependencySpec::new("B_blocks_A", "B", "B merged")
    }

    #[test]
    fn valid_record_is_accepted() {
        let record = DependencyRecord::new(ItemId::new("A"), spec()).unwrap();
        assert_eq!(record.dependency_id(), "B_blocks_A");
        assert_eq!(record.target_item_id().as_str(), "B");
    }

    #[rstest]
    #[case::blank_id(DependencySpec::new("  ", "B", "done"), "dependency_id")]
    #[case::blank_target(DependencySpec::new("d1", "", "done"), "target_item_id")]
    #[case::blank_criteria(DependencySpec::new("d1", "B", ""), "satisfaction_criteria")]
    fn blank_fields_are_rejected(#[case] spec: DependencySpec, #[case] field: &str) {
        let err = DependencyRecord::new(ItemId::new("A"), spec).unwrap_err();
        assert_eq!(err.rejection_reason(), RejectionReason::EmptyField);
        assert!(err.to_string().contains(field));
    }

    #[test]
    fn all_blank_fields_are_listed() {
        let err = DependencySpec::new("", "", "").validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("dependency_id"));
        assert!(msg.contains("target_item_id"));
        assert!(msg.contains("satisfaction_criteria"));
    }

    #[test]
    fn blank_source_is_rejected() {
        let err = DependencyRecord::new(ItemId::new(""), spec()).unwrap_err();
        assert_eq!(err.rejection_reason(), RejectionReason::EmptyField);
    }

    #[test]
    fn self_dependency_is_rejected() {
        let err = DependencyRecord::new(ItemId::new("B"), spec()).unwrap_err();
        assert_eq!(err.rejection_reason(), RejectionReason::SelfDependency);
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[rstest]
    #[case("testing", Track::Testing)]
    #[case(" Research ", Track::Research)]
    #[case("INFRASTRUCTURE", Track::Infrastructure)]
    fn track_parses_case_insensitively(#[case] input: &str, #[case] expected: Track) {
        assert_eq!(input.parse::<Track>().unwrap(), expected);
    }

    #[test]
    fn unknown_track_is_an_error() {
        assert!("marketing".parse::<Track>().is_err());
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: DependencySpec = serde_json::from_str(
            r#"{"dependency_id":"d1","target_item_id":"B","satisfaction_criteria":"ok"}"#,
        )
        .unwrap();
        assert_eq!(spec.dependency_type, DependencyType::Blocks);
        assert_eq!(spec.risk_level, RiskLevel::Low);
        assert!(spec.target_track.is_none());
    }
}
