//! Cleanup rules - declarative retention policy
//!
//! A rule names a target entity, a matching condition, a threshold and an
//! action. The retention engine dispatches on the `(target, condition,
//! action)` triple; anything it does not execute is reported, not silently
//! dropped.

use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Entity type a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleTarget {
    Post,
    FilteredPost,
    DiscoveryResult,
}

impl RuleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTarget::Post => "Post",
            RuleTarget::FilteredPost => "FilteredPost",
            RuleTarget::DiscoveryResult => "DiscoveryResult",
        }
    }

    pub fn all() -> &'static [RuleTarget] {
        &[
            RuleTarget::Post,
            RuleTarget::FilteredPost,
            RuleTarget::DiscoveryResult,
        ]
    }
}

impl FromStr for RuleTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Post" => Ok(RuleTarget::Post),
            "FilteredPost" => Ok(RuleTarget::FilteredPost),
            "DiscoveryResult" => Ok(RuleTarget::DiscoveryResult),
            _ => Err(Error::Validation(format!("Unknown rule target: {}", s))),
        }
    }
}

impl std::fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Condition a rule evaluates against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    /// Days since `scraped_at` (posts) or record creation
    AgeDays,
    /// `relevance_score` strictly below the threshold
    RelevanceBelow,
}

impl RuleCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCondition::AgeDays => "age_days",
            RuleCondition::RelevanceBelow => "relevance_below",
        }
    }

    pub fn all() -> &'static [RuleCondition] {
        &[RuleCondition::AgeDays, RuleCondition::RelevanceBelow]
    }
}

impl FromStr for RuleCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "age_days" => Ok(RuleCondition::AgeDays),
            "relevance_below" => Ok(RuleCondition::RelevanceBelow),
            _ => Err(Error::Validation(format!("Unknown rule condition: {}", s))),
        }
    }
}

impl std::fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happens to matched records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Copy into the archive store, then delete the original
    Archive,
    /// Permanent removal, no trace
    Delete,
    /// Declared in the schema; the engine reports it as a recognized no-op
    Export,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Archive => "archive",
            RuleAction::Delete => "delete",
            RuleAction::Export => "export",
        }
    }

    pub fn all() -> &'static [RuleAction] {
        &[RuleAction::Archive, RuleAction::Delete, RuleAction::Export]
    }
}

impl FromStr for RuleAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive" => Ok(RuleAction::Archive),
            "delete" => Ok(RuleAction::Delete),
            "export" => Ok(RuleAction::Export),
            _ => Err(Error::Validation(format!("Unknown rule action: {}", s))),
        }
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A retention policy row. Seeded at first startup, configuration-managed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRule {
    pub id: String,
    #[serde(rename = "targetType")]
    pub target: RuleTarget,
    pub condition: RuleCondition,
    /// Days for `age_days`, score floor for `relevance_below`
    pub threshold: i64,
    pub action: RuleAction,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
}

impl CleanupRule {
    pub fn new(
        id: impl Into<String>,
        target: RuleTarget,
        condition: RuleCondition,
        threshold: i64,
        action: RuleAction,
    ) -> Self {
        Self {
            id: id.into(),
            target,
            condition,
            threshold,
            action,
            enabled: true,
            last_run: None,
        }
    }

    /// The three baseline rules seeded once at first startup
    pub fn defaults() -> Vec<CleanupRule> {
        vec![
            CleanupRule::new(
                "rule_001",
                RuleTarget::Post,
                RuleCondition::AgeDays,
                90,
                RuleAction::Archive,
            ),
            CleanupRule::new(
                "rule_002",
                RuleTarget::FilteredPost,
                RuleCondition::RelevanceBelow,
                3,
                RuleAction::Delete,
            ),
            CleanupRule::new(
                "rule_003",
                RuleTarget::DiscoveryResult,
                RuleCondition::AgeDays,
                365,
                RuleAction::Export,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_roundtrip() {
        for target in RuleTarget::all() {
            let parsed: RuleTarget = target.as_str().parse().unwrap();
            assert_eq!(*target, parsed);
        }
    }

    #[test]
    fn test_condition_roundtrip() {
        for condition in RuleCondition::all() {
            let parsed: RuleCondition = condition.as_str().parse().unwrap();
            assert_eq!(*condition, parsed);
        }
    }

    #[test]
    fn test_action_roundtrip() {
        for action in RuleAction::all() {
            let parsed: RuleAction = action.as_str().parse().unwrap();
            assert_eq!(*action, parsed);
        }
    }

    #[test]
    fn test_unknown_strings_rejected() {
        assert!(RuleTarget::from_str("Event").is_err());
        assert!(RuleCondition::from_str("size_bytes").is_err());
        assert!(RuleAction::from_str("compress").is_err());
    }

    #[test]
    fn test_default_rules() {
        let rules = CleanupRule::defaults();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].id, "rule_001");
        assert_eq!(rules[0].target, RuleTarget::Post);
        assert_eq!(rules[0].threshold, 90);
        assert_eq!(rules[1].action, RuleAction::Delete);
        assert_eq!(rules[2].threshold, 365);
        assert!(rules.iter().all(|r| r.enabled && r.last_run.is_none()));
    }

    #[test]
    fn test_rule_wire_format() {
        let rule = &CleanupRule::defaults()[0];
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["targetType"], "Post");
        assert_eq!(json["condition"], "age_days");
        assert_eq!(json["action"], "archive");
    }
}
