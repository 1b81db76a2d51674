//! Batch ingestion - the write boundary of the scraping pipeline
//!
//! One batch carries raw posts plus the filtered and discovery records
//! derived from them. Records are applied sequentially, posts first, so
//! derived records can link to posts arriving in the same batch, and so no
//! two multi-step writes ever interleave. A batch never fails wholesale;
//! each record succeeds or fails on its own and the report carries both the
//! counts and the per-record errors.

use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveryResult;
use crate::filtered::FilteredPost;
use crate::post::Post;
use crate::storage::GraphStore;
use crate::Error;

/// One sync payload from the scraping client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestBatch {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub filtered: Vec<FilteredPost>,
    #[serde(default)]
    pub discovery: Vec<DiscoveryResult>,
}

impl IngestBatch {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.filtered.is_empty() && self.discovery.is_empty()
    }

    pub fn len(&self) -> usize {
        self.posts.len() + self.filtered.len() + self.discovery.len()
    }
}

/// A single record that did not make it into the store.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    /// Id of the failed record
    pub id: String,
    /// "post" | "filtered" | "discovery"
    pub record: &'static str,
    /// Stable error kind tag
    pub kind: &'static str,
    pub error: String,
}

impl IngestFailure {
    fn new(record: &'static str, id: String, err: &Error) -> Self {
        Self {
            id,
            record,
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

/// Outcome of one batch: success counts plus every per-record failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub posts_stored: usize,
    pub filtered_stored: usize,
    pub discovery_stored: usize,
    pub failures: Vec<IngestFailure>,
}

/// Applies ingestion batches against a store.
pub struct IngestService<'a> {
    store: &'a GraphStore,
}

impl<'a> IngestService<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Store a batch. Partial success is the normal case and is reported
    /// through counts, never as an error.
    pub fn ingest(&self, batch: &IngestBatch) -> IngestReport {
        tracing::info!(
            "Received batch: {} posts, {} filtered, {} discovery",
            batch.posts.len(),
            batch.filtered.len(),
            batch.discovery.len()
        );

        let mut report = IngestReport::default();

        let posts = self.store.insert_posts_batch(&batch.posts);
        report.posts_stored = posts.stored;
        for (id, err) in &posts.failures {
            report
                .failures
                .push(IngestFailure::new("post", id.clone(), err));
        }

        for fp in &batch.filtered {
            match self.store.insert_filtered(fp) {
                Ok(()) => report.filtered_stored += 1,
                Err(e) => {
                    tracing::warn!("Failed to add filtered post {}: {}", fp.id, e);
                    report
                        .failures
                        .push(IngestFailure::new("filtered", fp.id.clone(), &e));
                }
            }
        }

        for dr in &batch.discovery {
            match self.store.insert_discovery(dr) {
                Ok(()) => report.discovery_stored += 1,
                Err(e) => {
                    tracing::warn!("Failed to add discovery result {}: {}", dr.id, e);
                    report
                        .failures
                        .push(IngestFailure::new("discovery", dr.id.clone(), &e));
                }
            }
        }

        tracing::info!(
            "Batch stored: {} posts, {} filtered, {} discovery ({} failures)",
            report.posts_stored,
            report.filtered_stored,
            report.discovery_stored,
            report.failures.len()
        );
        report
    }
}
