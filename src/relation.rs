//! Relations - directed, kind-tagged edges between entity records
//!
//! Three relationship kinds connect the graph:
//! - `FILTERED_FROM`: FilteredPost -> Post
//! - `ANALYZED`: DiscoveryResult -> Post
//! - `ARCHIVED_FROM`: ArchivedPost -> Post (survives the post's deletion as
//!   an audit edge to the tombstone id)

use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Relationship kinds between entity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    /// FilteredPost -> its source Post
    FilteredFrom,
    /// DiscoveryResult -> its source Post
    Analyzed,
    /// ArchivedPost -> the Post it replaced
    ArchivedFrom,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::FilteredFrom => "FILTERED_FROM",
            RelationKind::Analyzed => "ANALYZED",
            RelationKind::ArchivedFrom => "ARCHIVED_FROM",
        }
    }

    pub fn all() -> &'static [RelationKind] {
        &[
            RelationKind::FilteredFrom,
            RelationKind::Analyzed,
            RelationKind::ArchivedFrom,
        ]
    }

    /// Kinds removed together with their target post; ARCHIVED_FROM is kept
    /// as the audit trail
    pub fn cascades_on_post_delete(&self) -> bool {
        matches!(self, RelationKind::FilteredFrom | RelationKind::Analyzed)
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FILTERED_FROM" => Ok(RelationKind::FilteredFrom),
            "ANALYZED" => Ok(RelationKind::Analyzed),
            "ARCHIVED_FROM" => Ok(RelationKind::ArchivedFrom),
            _ => Err(Error::Validation(format!("Unknown relation kind: {}", s))),
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge from a derived record to the post it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from_id: String,
    pub to_id: String,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in RelationKind::all() {
            let parsed: RelationKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_cascade_discipline() {
        assert!(RelationKind::FilteredFrom.cascades_on_post_delete());
        assert!(RelationKind::Analyzed.cascades_on_post_delete());
        assert!(!RelationKind::ArchivedFrom.cascades_on_post_delete());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(RelationKind::from_str("CONTAINS_POST").is_err());
    }
}
