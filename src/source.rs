//! Source - scraping channel configuration
//!
//! Configuration-managed only; the ingestion path never writes these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A configured scraping channel (a platform feed, a subreddit, a list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    /// Channel type, e.g. "timeline", "subreddit", "search"
    #[serde(rename = "type")]
    pub kind: String,
    /// Channel-specific settings, passed through untouched
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub last_fetched: Option<DateTime<Utc>>,
    /// Seconds between fetches
    #[serde(default)]
    pub fetch_interval: i64,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_wire_name() {
        let src: Source = serde_json::from_str(
            r#"{"id": "s_1", "name": "rustlang", "type": "subreddit"}"#,
        )
        .unwrap();
        assert_eq!(src.kind, "subreddit");
        assert!(src.enabled);
        assert!(src.last_fetched.is_none());
    }
}
