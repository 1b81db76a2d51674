//! FilteredPost - relevance-filtered view of a post
//!
//! Produced by the filtering step of the scraping pipeline. Each record
//! links to exactly one `Post` via a `FILTERED_FROM` relation created in the
//! same logical operation as the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of relevance filtering over a single post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredPost {
    pub id: String,
    /// Id of the source `Post`
    pub post_id: String,
    /// Topical relevance, conventionally 0-10; the retention engine purges
    /// below a rule-configured floor
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub summary: String,
    /// Ordered keyword list extracted by the filter
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "Utc::now")]
    pub filtered_at: DateTime<Utc>,
}

fn default_category() -> String {
    "other".to_string()
}

impl FilteredPost {
    pub fn new(id: impl Into<String>, post_id: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            id: id.into(),
            post_id: post_id.into(),
            relevance_score,
            category: default_category(),
            sub_category: String::new(),
            reason: String::new(),
            summary: String::new(),
            keywords: Vec::new(),
            filtered_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_wire_record() {
        let fp: FilteredPost =
            serde_json::from_str(r#"{"id": "f_1", "postId": "t_1", "relevanceScore": 7.5}"#)
                .unwrap();
        assert_eq!(fp.post_id, "t_1");
        assert_eq!(fp.relevance_score, 7.5);
        assert_eq!(fp.category, "other");
        assert!(fp.keywords.is_empty());
    }

    #[test]
    fn test_keywords_keep_order() {
        let fp = FilteredPost::new("f_2", "t_1", 5.0)
            .with_keywords(vec!["rust".into(), "graph".into(), "retention".into()]);
        let json = serde_json::to_string(&fp).unwrap();
        let back: FilteredPost = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keywords, vec!["rust", "graph", "retention"]);
    }
}
