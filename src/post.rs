//! Post entities - raw scraped content and its archived terminal form
//!
//! A `Post` is created only by ingestion and terminated only by the
//! retention engine (archived and deleted) or never. An `ArchivedPost` is
//! the immutable tombstone left behind by archival; `original_id` keeps the
//! deleted post's id for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque per-post key-value annotations carried through scrape and archive.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A curated scraped post - the root entity of the graph.
///
/// The wire format is permissive: every field except `id` is default-filled
/// when absent, matching the scraping client's sparse payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Globally unique opaque id (no auto-increment anywhere)
    pub id: String,
    /// Source platform, e.g. "twitter" or "reddit"
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub author_display_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// When the post was published on its platform
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub replies: i64,
    /// Marks un-curated raw ingest
    #[serde(default)]
    pub raw: bool,
    /// When the scraping client captured the post
    #[serde(default = "Utc::now")]
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_platform() -> String {
    "twitter".to_string()
}

impl Post {
    /// Create a post with the permissive defaults the boundary applies
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform: default_platform(),
            author: String::new(),
            author_display_name: String::new(),
            content: String::new(),
            title: String::new(),
            url: String::new(),
            timestamp: Utc::now(),
            score: 0,
            replies: 0,
            raw: false,
            scraped_at: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_scraped_at(mut self, at: DateTime<Utc>) -> Self {
        self.scraped_at = at;
        self
    }
}

/// Terminal state of an archived `Post`. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedPost {
    /// `"archived_"` + the original post id
    pub id: String,
    /// Id the source post held before deletion
    pub original_id: String,
    pub platform: String,
    pub author: String,
    pub content: String,
    pub archived_at: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ArchivedPost {
    /// Derive the tombstone record for a post about to be deleted
    pub fn from_post(post: &Post, reason: impl Into<String>, archived_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("archived_{}", post.id),
            original_id: post.id.clone(),
            platform: post.platform.clone(),
            author: post.author.clone(),
            content: post.content.clone(),
            archived_at,
            reason: reason.into(),
            metadata: post.metadata.clone(),
        }
    }
}
