//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with one table per entity:
//! - posts, filtered_posts, discovery_results, sources, cleanup_rules,
//!   archived_posts
//! - relations(from_id, to_id, kind) for the directed edges between them
//!
//! A single connection serves the whole process; callers serialize access.

pub mod schema;
pub mod sqlite;

pub use sqlite::{BatchReport, GraphStore, StoreCounts};
