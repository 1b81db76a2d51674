//! DiscoveryResult - deeper analysis over a single post
//!
//! Sentiment, KOL profiling, trend detection and keyword alerting, each an
//! optional typed payload. Links to exactly one `Post` via an `ANALYZED`
//! relation created with the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment assigned to a post's content.
///
/// `sentiment` stays a free string on purpose: analyzers emit variants like
/// "strongly positive", and the histogram matches by substring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentiment {
    pub sentiment: String,
    #[serde(default)]
    pub confidence: f64,
    /// -1.0 (negative) to 1.0 (positive)
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Sentiment {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            sentiment: label.into(),
            confidence: 0.0,
            score,
            keywords: Vec::new(),
        }
    }
}

/// Engagement metrics backing a KOL score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KolMetrics {
    #[serde(default)]
    pub avg_engagement: f64,
    #[serde(default)]
    pub post_frequency: f64,
    #[serde(default)]
    pub reach_score: f64,
    #[serde(default)]
    pub consistency_score: f64,
}

/// A tracked influential author inferred by discovery analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KolProfile {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub platform: String,
    /// 0-100
    #[serde(default)]
    pub kol_score: f64,
    /// "rising" | "notable" | "influential" | "top"
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub metrics: KolMetrics,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub recent_posts: i64,
}

/// A detected trending topic around the analyzed post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendData {
    pub topic: String,
    #[serde(default)]
    pub category: String,
    /// 0-100
    #[serde(default)]
    pub heat_score: f64,
    /// Growth over the previous window, percent
    #[serde(default)]
    pub growth_rate: f64,
    #[serde(default)]
    pub post_count: i64,
    /// "1h" | "6h" | "24h"
    #[serde(default)]
    pub time_window: String,
    #[serde(default)]
    pub related_topics: Vec<String>,
    #[serde(default)]
    pub sentiment: String,
}

/// A keyword alert that fired for this post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTrigger {
    pub alert_id: String,
    pub post_id: String,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default = "Utc::now")]
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub platform: String,
}

/// The output of discovery analysis over a single post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub id: String,
    /// Id of the source `Post`
    pub post_id: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub kol_profile: Option<KolProfile>,
    #[serde(default)]
    pub trend_data: Option<TrendData>,
    /// Wire name is the singular `alertTrigger`
    #[serde(default, rename = "alertTrigger")]
    pub alert_triggers: Vec<AlertTrigger>,
    #[serde(default = "Utc::now")]
    pub analyzed_at: DateTime<Utc>,
}

impl DiscoveryResult {
    pub fn new(id: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            post_id: post_id.into(),
            sentiment: None,
            kol_profile: None,
            trend_data: None,
            alert_triggers: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_trend(mut self, trend: TrendData) -> Self {
        self.trend_data = Some(trend);
        self
    }

    pub fn with_kol(mut self, kol: KolProfile) -> Self {
        self.kol_profile = Some(kol);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_payloads_optional() {
        let dr: DiscoveryResult =
            serde_json::from_str(r#"{"id": "d_1", "postId": "t_1"}"#).unwrap();
        assert!(dr.sentiment.is_none());
        assert!(dr.kol_profile.is_none());
        assert!(dr.trend_data.is_none());
        assert!(dr.alert_triggers.is_empty());
    }

    #[test]
    fn test_sentiment_payload_roundtrip() {
        let dr = DiscoveryResult::new("d_2", "t_1")
            .with_sentiment(Sentiment::new("strongly positive", 0.9));
        let json = serde_json::to_string(&dr).unwrap();
        let back: DiscoveryResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sentiment.unwrap().sentiment, "strongly positive");
    }

    #[test]
    fn test_alert_trigger_wire_name() {
        let raw = r#"{
            "id": "d_3",
            "postId": "t_1",
            "alertTrigger": [
                {"alertId": "a_1", "postId": "t_1", "matchedKeywords": ["rust"]}
            ]
        }"#;
        let dr: DiscoveryResult = serde_json::from_str(raw).unwrap();
        assert_eq!(dr.alert_triggers.len(), 1);
        assert_eq!(dr.alert_triggers[0].matched_keywords, vec!["rust"]);
    }
}
