//! # Socialkg - Social Intelligence Knowledge Graph
//!
//! Typed graph storage and retention for a social-media scraping pipeline.
//!
//! Socialkg provides:
//! - Entity stores for raw posts and their derived analyses (relevance
//!   filtering, sentiment/KOL/trend discovery)
//! - Directed relationship linking between derived records and their posts
//! - Aggregate statistics recomputed from live store state
//! - A rule-driven retention engine (archive, delete, export) with dry-run
//! - SQLite-backed persistence behind a single connection

pub mod post;
pub mod filtered;
pub mod discovery;
pub mod source;
pub mod rule;
pub mod relation;
pub mod storage;
pub mod ingest;
pub mod stats;
pub mod retention;
pub mod server;
pub mod config;

// Re-exports for convenient access
pub use post::{ArchivedPost, Post};
pub use filtered::FilteredPost;
pub use discovery::DiscoveryResult;
pub use relation::{Relation, RelationKind};
pub use rule::{CleanupRule, RuleAction, RuleCondition, RuleTarget};
pub use storage::GraphStore;

/// Result type alias for Socialkg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Socialkg operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record with the given id already exists
    #[error("Duplicate id: {0}")]
    Constraint(String),

    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A required field is missing or malformed
    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A cleanup rule names an action the engine does not execute
    #[error("Unsupported cleanup action: {0}")]
    UnsupportedAction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Stable kind tag for per-item failure reporting at the boundary
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Constraint(_) => "constraint",
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation",
            Error::Storage(_) => "storage",
            Error::UnsupportedAction(_) => "unsupported_action",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
        }
    }
}
