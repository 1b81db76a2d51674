//! SQLite storage implementation

use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::schema;
use crate::discovery::DiscoveryResult;
use crate::filtered::FilteredPost;
use crate::post::{ArchivedPost, Post};
use crate::relation::{Relation, RelationKind};
use crate::rule::{CleanupRule, RuleAction, RuleCondition, RuleTarget};
use crate::source::Source;
use crate::{Error, Result};

/// SQLite-backed storage for the social knowledge graph.
///
/// Owns the process's single connection. All multi-step writes (derived
/// record + relation, archive + delete) run on this one handle; callers
/// serialize access around it.
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema();
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema();
        Ok(store)
    }

    /// Apply all schema statements. Safe to run on every startup; a failing
    /// statement (e.g. a definition that already exists in an older shape)
    /// is logged and skipped, not fatal.
    fn initialize_schema(&self) {
        for stmt in schema::all_schema_statements() {
            if let Err(e) = self.conn.execute(stmt, []) {
                tracing::warn!("schema statement skipped: {}", e);
            }
        }
    }

    /// Insert the baseline cleanup rules if absent. Keyed on rule id, so
    /// re-seeding never duplicates. Returns how many rows were newly written.
    pub fn seed_default_rules(&self) -> Result<usize> {
        let mut seeded = 0;
        for rule in CleanupRule::defaults() {
            let changed = self.conn.execute(
                r#"
                INSERT OR IGNORE INTO cleanup_rules (id, target_type, condition, threshold, action, enabled, last_run)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
                "#,
                params![
                    rule.id,
                    rule.target.as_str(),
                    rule.condition.as_str(),
                    rule.threshold,
                    rule.action.as_str(),
                    rule.enabled,
                ],
            )?;
            seeded += changed;
        }
        if seeded > 0 {
            tracing::info!("Seeded {} default cleanup rules", seeded);
        }
        Ok(seeded)
    }

    // ========== Post Operations ==========

    /// Insert a post. Duplicate id is a constraint error, not an upsert.
    pub fn insert_post(&self, post: &Post) -> Result<()> {
        if post.id.is_empty() {
            return Err(Error::Validation("post id must not be empty".into()));
        }
        self.conn
            .execute(
                r#"
                INSERT INTO posts (id, platform, author, author_display_name, content, title, url,
                                   timestamp, score, replies, raw, scraped_at, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
                params![
                    post.id,
                    post.platform,
                    post.author,
                    post.author_display_name,
                    post.content,
                    post.title,
                    post.url,
                    encode_ts(&post.timestamp),
                    post.score,
                    post.replies,
                    post.raw,
                    encode_ts(&post.scraped_at),
                    encode_json(&post.metadata)?,
                ],
            )
            .map_err(|e| map_insert_err(&post.id, e))?;
        tracing::debug!("Added post: {}", post.id);
        Ok(())
    }

    /// Insert each post independently; one failure never aborts the batch.
    pub fn insert_posts_batch(&self, posts: &[Post]) -> BatchReport {
        let mut report = BatchReport::default();
        for post in posts {
            match self.insert_post(post) {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    tracing::warn!("Failed to add post {}: {}", post.id, e);
                    report.failures.push((post.id.clone(), e));
                }
            }
        }
        tracing::info!("Batch added {}/{} posts", report.stored, posts.len());
        report
    }

    /// Get a post by id; absent is `None`, not an error
    pub fn get_post(&self, id: &str) -> Result<Option<Post>> {
        self.conn
            .query_row(
                "SELECT id, platform, author, author_display_name, content, title, url,
                        timestamp, score, replies, raw, scraped_at, metadata
                 FROM posts WHERE id = ?1",
                [id],
                row_to_post,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Posts scraped within the last `max_age_hours`, newest first, capped
    /// at `limit`
    pub fn recent_posts(&self, max_age_hours: i64, limit: usize) -> Result<Vec<Post>> {
        let cutoff = encode_ts(&(Utc::now() - Duration::hours(max_age_hours)));
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, author, author_display_name, content, title, url,
                    timestamp, score, replies, raw, scraped_at, metadata
             FROM posts WHERE scraped_at > ?1
             ORDER BY scraped_at DESC
             LIMIT ?2",
        )?;

        let posts = stmt
            .query_map(params![cutoff, limit as i64], row_to_post)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(posts)
    }

    /// Posts whose `scraped_at` is more than `days` days old
    pub fn posts_older_than(&self, days: i64) -> Result<Vec<Post>> {
        let cutoff = encode_ts(&(Utc::now() - Duration::days(days)));
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, author, author_display_name, content, title, url,
                    timestamp, score, replies, raw, scraped_at, metadata
             FROM posts WHERE scraped_at < ?1",
        )?;

        let posts = stmt
            .query_map([cutoff], row_to_post)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(posts)
    }

    /// Would-be-affected count for an age-based post rule (dry run)
    pub fn count_posts_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = encode_ts(&(Utc::now() - Duration::days(days)));
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE scraped_at < ?1",
            [cutoff],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete a post, cascading its ingest-derived relations. The
    /// ARCHIVED_FROM relation survives as the audit edge to the tombstone.
    /// Returns whether a row was removed.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        let cascade_kinds: Vec<String> = RelationKind::all()
            .iter()
            .filter(|k| k.cascades_on_post_delete())
            .map(|k| format!("'{}'", k.as_str()))
            .collect();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            &format!(
                "DELETE FROM relations
                 WHERE kind IN ({}) AND (to_id = ?1 OR from_id = ?1)",
                cascade_kinds.join(", ")
            ),
            [id],
        )?;
        let removed = tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    pub fn count_posts(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== FilteredPost Operations ==========

    /// Insert a filtered post and its FILTERED_FROM relation as one unit.
    ///
    /// Rejects up front with `NotFound` when the referenced post is absent,
    /// so a failed link never leaves an orphaned row behind.
    pub fn insert_filtered(&self, fp: &FilteredPost) -> Result<()> {
        if fp.id.is_empty() {
            return Err(Error::Validation("filtered post id must not be empty".into()));
        }
        if !self.post_exists(&fp.post_id)? {
            return Err(Error::NotFound(format!("post {}", fp.post_id)));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO filtered_posts (id, post_id, relevance_score, category, sub_category,
                                        reason, summary, keywords, filtered_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                fp.id,
                fp.post_id,
                fp.relevance_score,
                fp.category,
                fp.sub_category,
                fp.reason,
                fp.summary,
                encode_json(&fp.keywords)?,
                encode_ts(&fp.filtered_at),
            ],
        )
        .map_err(|e| map_insert_err(&fp.id, e))?;
        tx.execute(
            "INSERT INTO relations (from_id, to_id, kind) VALUES (?1, ?2, ?3)",
            params![fp.id, fp.post_id, RelationKind::FilteredFrom.as_str()],
        )?;
        tx.commit()?;

        tracing::debug!("Added filtered post: {}", fp.id);
        Ok(())
    }

    /// List filtered posts. With a category: exact match, best relevance
    /// first. Without: newest first. Both capped at `limit`.
    pub fn filtered_posts(&self, category: Option<&str>, limit: usize) -> Result<Vec<FilteredPost>> {
        const COLUMNS: &str = "id, post_id, relevance_score, category, sub_category,
                               reason, summary, keywords, filtered_at";

        let rows = if let Some(category) = category {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {COLUMNS} FROM filtered_posts WHERE category = ?1
                 ORDER BY relevance_score DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![category, limit as i64], row_to_filtered)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {COLUMNS} FROM filtered_posts
                 ORDER BY filtered_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], row_to_filtered)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        Ok(rows)
    }

    /// Remove every filtered post with relevance strictly below `threshold`,
    /// together with their FILTERED_FROM relations. Source posts are never
    /// touched. Returns the number of rows removed.
    pub fn delete_below_relevance(&self, threshold: f64) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM relations
             WHERE kind = 'FILTERED_FROM'
               AND from_id IN (SELECT id FROM filtered_posts WHERE relevance_score < ?1)",
            params![threshold],
        )?;
        let removed = tx.execute(
            "DELETE FROM filtered_posts WHERE relevance_score < ?1",
            params![threshold],
        )?;
        tx.commit()?;
        tracing::info!("Deleted {} low relevance posts", removed);
        Ok(removed)
    }

    /// Would-be-affected count for a relevance rule (dry run)
    pub fn count_below_relevance(&self, threshold: f64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM filtered_posts WHERE relevance_score < ?1",
            params![threshold],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_filtered(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM filtered_posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== DiscoveryResult Operations ==========

    /// Insert a discovery result and its ANALYZED relation as one unit.
    /// Same contract as `insert_filtered`.
    pub fn insert_discovery(&self, dr: &DiscoveryResult) -> Result<()> {
        if dr.id.is_empty() {
            return Err(Error::Validation("discovery result id must not be empty".into()));
        }
        if !self.post_exists(&dr.post_id)? {
            return Err(Error::NotFound(format!("post {}", dr.post_id)));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO discovery_results (id, post_id, sentiment, kol_profile, trend_data,
                                           alert_triggers, analyzed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                dr.id,
                dr.post_id,
                encode_json_opt(&dr.sentiment)?,
                encode_json_opt(&dr.kol_profile)?,
                encode_json_opt(&dr.trend_data)?,
                encode_json(&dr.alert_triggers)?,
                encode_ts(&dr.analyzed_at),
            ],
        )
        .map_err(|e| map_insert_err(&dr.id, e))?;
        tx.execute(
            "INSERT INTO relations (from_id, to_id, kind) VALUES (?1, ?2, ?3)",
            params![dr.id, dr.post_id, RelationKind::Analyzed.as_str()],
        )?;
        tx.commit()?;

        tracing::debug!("Added discovery result: {}", dr.id);
        Ok(())
    }

    /// Full scan of all discovery results, oldest first
    pub fn discovery_results(&self) -> Result<Vec<DiscoveryResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, post_id, sentiment, kol_profile, trend_data, alert_triggers, analyzed_at
             FROM discovery_results ORDER BY analyzed_at",
        )?;

        let rows = stmt
            .query_map([], row_to_discovery)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Rows with a present, non-empty KOL profile
    pub fn count_discovery_with_kol(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovery_results WHERE kol_profile IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Rows with present, non-empty trend data
    pub fn count_discovery_with_trend(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovery_results WHERE trend_data IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_discovery(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM discovery_results",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== ArchivedPost Operations ==========

    /// Insert an archive tombstone. There is no update path; archived posts
    /// are immutable once written.
    pub fn insert_archived(&self, archived: &ArchivedPost) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO archived_posts (id, original_id, platform, author, content,
                                            archived_at, reason, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    archived.id,
                    archived.original_id,
                    archived.platform,
                    archived.author,
                    archived.content,
                    encode_ts(&archived.archived_at),
                    archived.reason,
                    encode_json(&archived.metadata)?,
                ],
            )
            .map_err(|e| map_insert_err(&archived.id, e))?;
        tracing::debug!("Archived post: {}", archived.original_id);
        Ok(())
    }

    pub fn get_archived(&self, id: &str) -> Result<Option<ArchivedPost>> {
        self.conn
            .query_row(
                "SELECT id, original_id, platform, author, content, archived_at, reason, metadata
                 FROM archived_posts WHERE id = ?1",
                [id],
                row_to_archived,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Look up a tombstone by the id its post held before deletion
    pub fn find_archived_by_original(&self, original_id: &str) -> Result<Option<ArchivedPost>> {
        self.conn
            .query_row(
                "SELECT id, original_id, platform, author, content, archived_at, reason, metadata
                 FROM archived_posts WHERE original_id = ?1",
                [original_id],
                row_to_archived,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn count_archived(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM archived_posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== CleanupRule Operations ==========

    pub fn insert_rule(&self, rule: &CleanupRule) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO cleanup_rules (id, target_type, condition, threshold, action, enabled, last_run)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    rule.id,
                    rule.target.as_str(),
                    rule.condition.as_str(),
                    rule.threshold,
                    rule.action.as_str(),
                    rule.enabled,
                    rule.last_run.as_ref().map(encode_ts),
                ],
            )
            .map_err(|e| map_insert_err(&rule.id, e))?;
        Ok(())
    }

    pub fn cleanup_rules(&self, enabled_only: bool) -> Result<Vec<CleanupRule>> {
        const COLUMNS: &str = "id, target_type, condition, threshold, action, enabled, last_run";

        let rows = if enabled_only {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {COLUMNS} FROM cleanup_rules WHERE enabled = 1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([], row_to_rule)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        } else {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {COLUMNS} FROM cleanup_rules ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_rule)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        Ok(rows)
    }

    /// Record that the retention engine evaluated a rule
    pub fn touch_rule_last_run(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE cleanup_rules SET last_run = ?1 WHERE id = ?2",
            params![encode_ts(&at), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("cleanup rule {}", id)));
        }
        Ok(())
    }

    // ========== Source Operations ==========

    pub fn insert_source(&self, source: &Source) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO sources (id, name, kind, config, enabled, last_fetched, fetch_interval)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    source.id,
                    source.name,
                    source.kind,
                    encode_json(&source.config)?,
                    source.enabled,
                    source.last_fetched.as_ref().map(encode_ts),
                    source.fetch_interval,
                ],
            )
            .map_err(|e| map_insert_err(&source.id, e))?;
        Ok(())
    }

    pub fn sources(&self) -> Result<Vec<Source>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, kind, config, enabled, last_fetched, fetch_interval
             FROM sources ORDER BY id",
        )?;

        let rows = stmt
            .query_map([], row_to_source)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    // ========== Relation Operations ==========

    pub fn insert_relation(&self, relation: &Relation) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO relations (from_id, to_id, kind) VALUES (?1, ?2, ?3)",
            params![relation.from_id, relation.to_id, relation.kind.as_str()],
        )?;
        Ok(())
    }

    /// Outgoing relations of a record (derived record -> its post)
    pub fn relations_from(&self, from_id: &str) -> Result<Vec<Relation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT from_id, to_id, kind FROM relations WHERE from_id = ?1")?;

        let rows = stmt
            .query_map([from_id], row_to_relation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Incoming relations of a post (who was derived from it)
    pub fn relations_to(&self, to_id: &str) -> Result<Vec<Relation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT from_id, to_id, kind FROM relations WHERE to_id = ?1")?;

        let rows = stmt
            .query_map([to_id], row_to_relation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    // ========== Aggregate Counts ==========

    /// Entity counts, recomputed from live table state on every call
    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            posts: self.count_posts()?,
            filtered_posts: self.count_filtered()?,
            discovery_results: self.count_discovery()?,
            archived_posts: self.count_archived()?,
        })
    }

    fn post_exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM posts WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }
}

/// Per-batch insertion summary: success count plus the specific error each
/// failed record hit.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub stored: usize,
    pub failures: Vec<(String, Error)>,
}

/// Entity counts across the whole store
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreCounts {
    pub posts: usize,
    pub filtered_posts: usize,
    pub discovery_results: usize,
    pub archived_posts: usize,
}

impl std::fmt::Display for StoreCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Counts:")?;
        writeln!(f, "  Posts: {}", self.posts)?;
        writeln!(f, "  Filtered posts: {}", self.filtered_posts)?;
        writeln!(f, "  Discovery results: {}", self.discovery_results)?;
        write!(f, "  Archived posts: {}", self.archived_posts)
    }
}

// ========== Row/Value Conversion ==========

/// Fixed-width RFC 3339 UTC text; lexicographic order equals chronological
fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn decode_ts_opt(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| decode_ts(idx, s)).transpose()
}

fn encode_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Validation(format!("unserializable field: {}", e)))
}

fn encode_json_opt<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value.as_ref().map(encode_json).transpose()
}

fn decode_json<T: DeserializeOwned>(idx: usize, raw: String) -> rusqlite::Result<T> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn decode_json_opt<T: DeserializeOwned>(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<T>> {
    raw.map(|s| decode_json(idx, s)).transpose()
}

/// Duplicate primary key surfaces as a constraint error carrying the id
fn map_insert_err(id: &str, err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Constraint(id.to_string())
        }
        other => Error::Storage(other),
    }
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        platform: row.get(1)?,
        author: row.get(2)?,
        author_display_name: row.get(3)?,
        content: row.get(4)?,
        title: row.get(5)?,
        url: row.get(6)?,
        timestamp: decode_ts(7, row.get(7)?)?,
        score: row.get(8)?,
        replies: row.get(9)?,
        raw: row.get(10)?,
        scraped_at: decode_ts(11, row.get(11)?)?,
        metadata: decode_json(12, row.get(12)?)?,
    })
}

fn row_to_filtered(row: &rusqlite::Row) -> rusqlite::Result<FilteredPost> {
    Ok(FilteredPost {
        id: row.get(0)?,
        post_id: row.get(1)?,
        relevance_score: row.get(2)?,
        category: row.get(3)?,
        sub_category: row.get(4)?,
        reason: row.get(5)?,
        summary: row.get(6)?,
        keywords: decode_json(7, row.get(7)?)?,
        filtered_at: decode_ts(8, row.get(8)?)?,
    })
}

fn row_to_discovery(row: &rusqlite::Row) -> rusqlite::Result<DiscoveryResult> {
    Ok(DiscoveryResult {
        id: row.get(0)?,
        post_id: row.get(1)?,
        sentiment: decode_json_opt(2, row.get(2)?)?,
        kol_profile: decode_json_opt(3, row.get(3)?)?,
        trend_data: decode_json_opt(4, row.get(4)?)?,
        alert_triggers: decode_json(5, row.get(5)?)?,
        analyzed_at: decode_ts(6, row.get(6)?)?,
    })
}

fn row_to_archived(row: &rusqlite::Row) -> rusqlite::Result<ArchivedPost> {
    Ok(ArchivedPost {
        id: row.get(0)?,
        original_id: row.get(1)?,
        platform: row.get(2)?,
        author: row.get(3)?,
        content: row.get(4)?,
        archived_at: decode_ts(5, row.get(5)?)?,
        reason: row.get(6)?,
        metadata: decode_json(7, row.get(7)?)?,
    })
}

fn row_to_rule(row: &rusqlite::Row) -> rusqlite::Result<CleanupRule> {
    let target: String = row.get(1)?;
    let condition: String = row.get(2)?;
    let action: String = row.get(4)?;

    Ok(CleanupRule {
        id: row.get(0)?,
        target: target.parse::<RuleTarget>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        condition: condition.parse::<RuleCondition>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        threshold: row.get(3)?,
        action: action.parse::<RuleAction>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        enabled: row.get(5)?,
        last_run: decode_ts_opt(6, row.get(6)?)?,
    })
}

fn row_to_source(row: &rusqlite::Row) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        config: decode_json(3, row.get(3)?)?,
        enabled: row.get(4)?,
        last_fetched: decode_ts_opt(5, row.get(5)?)?,
        fetch_interval: row.get(6)?,
    })
}

fn row_to_relation(row: &rusqlite::Row) -> rusqlite::Result<Relation> {
    let kind: String = row.get(2)?;
    Ok(Relation {
        from_id: row.get(0)?,
        to_id: row.get(1)?,
        kind: kind.parse::<RelationKind>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Sentiment;

    fn sample_post(id: &str) -> Post {
        let mut post = Post::new(id)
            .with_author("alice")
            .with_content("a post about rust");
        post.url = format!("https://example.com/{}", id);
        post.score = 42;
        // stored timestamps carry millisecond precision
        post.timestamp = "2026-08-01T12:00:00.000Z".parse().unwrap();
        post.scraped_at = "2026-08-01T12:05:00.000Z".parse().unwrap();
        post.metadata
            .insert("lang".to_string(), serde_json::json!("en"));
        post
    }

    #[test]
    fn test_post_roundtrip() {
        let store = GraphStore::open_in_memory().unwrap();

        let post = sample_post("t_1");
        store.insert_post(&post).unwrap();

        let retrieved = store.get_post("t_1").unwrap().unwrap();
        assert_eq!(retrieved, post);
    }

    #[test]
    fn test_duplicate_post_is_constraint_error() {
        let store = GraphStore::open_in_memory().unwrap();

        store.insert_post(&sample_post("t_1")).unwrap();
        let err = store.insert_post(&sample_post("t_1")).unwrap_err();
        assert!(matches!(err, Error::Constraint(ref id) if id == "t_1"));
        assert_eq!(store.count_posts().unwrap(), 1);
    }

    #[test]
    fn test_empty_id_rejected() {
        let store = GraphStore::open_in_memory().unwrap();
        let err = store.insert_post(&Post::new("")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_missing_post_is_none() {
        let store = GraphStore::open_in_memory().unwrap();
        assert!(store.get_post("nope").unwrap().is_none());
    }

    #[test]
    fn test_batch_skips_duplicates() {
        let store = GraphStore::open_in_memory().unwrap();
        store.insert_post(&sample_post("t_1")).unwrap();

        let batch = vec![sample_post("t_1"), sample_post("t_2"), sample_post("t_3")];
        let report = store.insert_posts_batch(&batch);

        assert_eq!(report.stored, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "t_1");
        assert!(matches!(report.failures[0].1, Error::Constraint(_)));
        assert_eq!(store.count_posts().unwrap(), 3);
    }

    #[test]
    fn test_recent_posts_window_and_order() {
        let store = GraphStore::open_in_memory().unwrap();
        let now = Utc::now();

        store
            .insert_post(&sample_post("old").with_scraped_at(now - Duration::hours(48)))
            .unwrap();
        store
            .insert_post(&sample_post("mid").with_scraped_at(now - Duration::hours(2)))
            .unwrap();
        store
            .insert_post(&sample_post("new").with_scraped_at(now - Duration::minutes(5)))
            .unwrap();

        let recent = store.recent_posts(24, 100).unwrap();
        let ids: Vec<&str> = recent.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);

        let capped = store.recent_posts(24, 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, "new");
    }

    #[test]
    fn test_filtered_creates_exactly_one_relation() {
        let store = GraphStore::open_in_memory().unwrap();
        store.insert_post(&sample_post("t_1")).unwrap();

        let fp = FilteredPost::new("f_1", "t_1", 7.0).with_category("ai");
        store.insert_filtered(&fp).unwrap();

        let relations = store.relations_from("f_1").unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, RelationKind::FilteredFrom);
        assert_eq!(relations[0].to_id, "t_1");
    }

    #[test]
    fn test_filtered_missing_post_leaves_no_orphan() {
        let store = GraphStore::open_in_memory().unwrap();

        let err = store
            .insert_filtered(&FilteredPost::new("f_1", "ghost", 5.0))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.count_filtered().unwrap(), 0);
        assert!(store.relations_from("f_1").unwrap().is_empty());
    }

    #[test]
    fn test_filtered_listing_paths() {
        let store = GraphStore::open_in_memory().unwrap();
        store.insert_post(&sample_post("t_1")).unwrap();

        for (id, score, category) in [
            ("f_1", 2.0, "ai"),
            ("f_2", 9.0, "ai"),
            ("f_3", 5.0, "web3"),
        ] {
            store
                .insert_filtered(&FilteredPost::new(id, "t_1", score).with_category(category))
                .unwrap();
        }

        let by_category = store.filtered_posts(Some("ai"), 50).unwrap();
        let ids: Vec<&str> = by_category.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f_2", "f_1"]);

        let all = store.filtered_posts(None, 2).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_delete_below_relevance_boundary_and_idempotence() {
        let store = GraphStore::open_in_memory().unwrap();
        store.insert_post(&sample_post("t_1")).unwrap();

        for (id, score) in [("f_1", 1.5), ("f_2", 2.9), ("f_3", 3.0), ("f_4", 8.0)] {
            store
                .insert_filtered(&FilteredPost::new(id, "t_1", score))
                .unwrap();
        }

        assert_eq!(store.count_below_relevance(3.0).unwrap(), 2);
        assert_eq!(store.delete_below_relevance(3.0).unwrap(), 2);
        assert_eq!(store.count_filtered().unwrap(), 2);
        assert!(store.relations_from("f_1").unwrap().is_empty());
        assert_eq!(store.relations_from("f_3").unwrap().len(), 1);
        // source post untouched
        assert!(store.get_post("t_1").unwrap().is_some());

        assert_eq!(store.delete_below_relevance(3.0).unwrap(), 0);
    }

    #[test]
    fn test_discovery_roundtrip_and_counts() {
        let store = GraphStore::open_in_memory().unwrap();
        store.insert_post(&sample_post("t_1")).unwrap();

        let dr = DiscoveryResult::new("d_1", "t_1")
            .with_sentiment(Sentiment::new("positive", 0.8));
        store.insert_discovery(&dr).unwrap();
        store
            .insert_discovery(&DiscoveryResult::new("d_2", "t_1"))
            .unwrap();

        let all = store.discovery_results().unwrap();
        assert_eq!(all.len(), 2);
        let back = all.iter().find(|d| d.id == "d_1").unwrap();
        assert_eq!(back.sentiment.as_ref().unwrap().sentiment, "positive");

        assert_eq!(store.count_discovery_with_kol().unwrap(), 0);
        let relations = store.relations_to("t_1").unwrap();
        assert_eq!(relations.len(), 2);
        assert!(relations.iter().all(|r| r.kind == RelationKind::Analyzed));
    }

    #[test]
    fn test_discovery_missing_post_rejected() {
        let store = GraphStore::open_in_memory().unwrap();
        let err = store
            .insert_discovery(&DiscoveryResult::new("d_1", "ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.count_discovery().unwrap(), 0);
    }

    #[test]
    fn test_delete_post_cascades_ingest_relations_only() {
        let store = GraphStore::open_in_memory().unwrap();
        let post = sample_post("t_1");
        store.insert_post(&post).unwrap();
        store
            .insert_filtered(&FilteredPost::new("f_1", "t_1", 5.0))
            .unwrap();

        let archived = ArchivedPost::from_post(&post, "test", Utc::now());
        store.insert_archived(&archived).unwrap();
        store
            .insert_relation(&Relation::new(
                archived.id.clone(),
                "t_1",
                RelationKind::ArchivedFrom,
            ))
            .unwrap();

        assert!(store.delete_post("t_1").unwrap());
        assert!(store.get_post("t_1").unwrap().is_none());
        // the filtered row dangles; its relation does not
        assert_eq!(store.count_filtered().unwrap(), 1);
        assert!(store.relations_from("f_1").unwrap().is_empty());
        // the audit edge survives
        let remaining = store.relations_to("t_1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, RelationKind::ArchivedFrom);

        assert!(!store.delete_post("t_1").unwrap());
    }

    #[test]
    fn test_archived_immutable_duplicate_rejected() {
        let store = GraphStore::open_in_memory().unwrap();
        let post = sample_post("t_1");
        let archived = ArchivedPost::from_post(&post, "first", Utc::now());
        store.insert_archived(&archived).unwrap();

        let again = ArchivedPost::from_post(&post, "second", Utc::now());
        let err = store.insert_archived(&again).unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));

        let kept = store.find_archived_by_original("t_1").unwrap().unwrap();
        assert_eq!(kept.reason, "first");
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let store = GraphStore::open_in_memory().unwrap();

        assert_eq!(store.seed_default_rules().unwrap(), 3);
        assert_eq!(store.seed_default_rules().unwrap(), 0);

        let rules = store.cleanup_rules(false).unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].id, "rule_001");
        assert_eq!(rules[1].threshold, 3);
    }

    #[test]
    fn test_rules_enabled_filter_and_last_run() {
        let store = GraphStore::open_in_memory().unwrap();
        store.seed_default_rules().unwrap();

        let mut disabled = CleanupRule::new(
            "rule_900",
            RuleTarget::Post,
            RuleCondition::AgeDays,
            30,
            RuleAction::Archive,
        );
        disabled.enabled = false;
        store.insert_rule(&disabled).unwrap();

        assert_eq!(store.cleanup_rules(true).unwrap().len(), 3);
        assert_eq!(store.cleanup_rules(false).unwrap().len(), 4);

        let at = Utc::now();
        store.touch_rule_last_run("rule_001", at).unwrap();
        let rules = store.cleanup_rules(true).unwrap();
        let touched = rules.iter().find(|r| r.id == "rule_001").unwrap();
        assert_eq!(touched.last_run, Some(at_millis(at)));

        assert!(matches!(
            store.touch_rule_last_run("rule_999", at),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_source_roundtrip() {
        let store = GraphStore::open_in_memory().unwrap();

        let source: Source = serde_json::from_str(
            r#"{"id": "s_1", "name": "rustlang", "type": "subreddit", "fetchInterval": 600}"#,
        )
        .unwrap();
        store.insert_source(&source).unwrap();

        let sources = store.sources().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0], source);
    }

    #[test]
    fn test_counts() {
        let store = GraphStore::open_in_memory().unwrap();
        store.insert_post(&sample_post("t_1")).unwrap();
        store
            .insert_filtered(&FilteredPost::new("f_1", "t_1", 5.0))
            .unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.posts, 1);
        assert_eq!(counts.filtered_posts, 1);
        assert_eq!(counts.discovery_results, 0);
        assert_eq!(counts.archived_posts, 0);
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socialkg.db");

        {
            let store = GraphStore::open(&path).unwrap();
            store.insert_post(&sample_post("t_1")).unwrap();
        }

        let reopened = GraphStore::open(&path).unwrap();
        assert_eq!(reopened.count_posts().unwrap(), 1);
    }

    /// Stored timestamps truncate to millisecond precision
    fn at_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
        decode_ts(0, encode_ts(&ts)).unwrap()
    }
}
