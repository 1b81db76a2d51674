//! Aggregate statistics - read-only rollups over the stores
//!
//! Nothing here is cached or incrementally maintained; every call recomputes
//! from current store state. The sentiment histogram is a full scan of all
//! discovery results, O(n) per call.

use serde::Serialize;

use crate::storage::{GraphStore, StoreCounts};
use crate::Result;

/// Sentiment histogram over all discovery results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// Rollup of the discovery analyses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub sentiments: SentimentBreakdown,
    /// Results carrying a KOL profile
    pub kols: usize,
    /// Results carrying trend data
    pub trends: usize,
}

/// Entity counts merged with the discovery rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverallStats {
    #[serde(flatten)]
    pub counts: StoreCounts,
    #[serde(flatten)]
    pub discovery: DiscoveryStats,
}

/// Computes read-only rollups against a store.
pub struct StatsAggregator<'a> {
    store: &'a GraphStore,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Scan all discovery results and bucket them.
    ///
    /// A row counts as positive/negative when its sentiment label contains
    /// that word, case-insensitively; everything else (including rows with
    /// no sentiment at all) is neutral.
    pub fn discovery_stats(&self) -> Result<DiscoveryStats> {
        let mut sentiments = SentimentBreakdown::default();
        for result in self.store.discovery_results()? {
            let label = result
                .sentiment
                .as_ref()
                .map(|s| s.sentiment.to_lowercase())
                .unwrap_or_default();
            if label.contains("positive") {
                sentiments.positive += 1;
            } else if label.contains("negative") {
                sentiments.negative += 1;
            } else {
                sentiments.neutral += 1;
            }
        }

        Ok(DiscoveryStats {
            sentiments,
            kols: self.store.count_discovery_with_kol()?,
            trends: self.store.count_discovery_with_trend()?,
        })
    }

    /// Entity counts across all stores merged with the discovery rollup
    pub fn overall_stats(&self) -> Result<OverallStats> {
        Ok(OverallStats {
            counts: self.store.counts()?,
            discovery: self.discovery_stats()?,
        })
    }
}
