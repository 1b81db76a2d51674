//! Retention engine - rule-driven archival and purging
//!
//! Each run is a stateless pass: load the enabled rules, dispatch each on
//! its `(target, condition, action)` triple, report a per-rule outcome.
//! Archival is two separate writes per post (archive row, then delete) with
//! no rollback in either direction; a crash between them leaves either an
//! extra archive copy or an un-archived post, both tolerated shapes.

use chrono::Utc;
use serde::Serialize;

use crate::post::ArchivedPost;
use crate::relation::{Relation, RelationKind};
use crate::rule::{CleanupRule, RuleAction, RuleCondition, RuleTarget};
use crate::storage::GraphStore;
use crate::{Error, Result};

/// What one rule evaluation did (or would do, under dry run).
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    #[serde(rename = "targetType")]
    pub target: RuleTarget,
    pub condition: RuleCondition,
    pub action: RuleAction,
    /// Records affected, or would-be-affected under dry run
    pub affected: usize,
    /// False under dry run and for recognized no-op actions
    pub executed: bool,
}

/// Evaluates cleanup rules against a store.
pub struct RetentionEngine<'a> {
    store: &'a GraphStore,
}

impl<'a> RetentionEngine<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Run every enabled rule. A dry run computes real would-be-affected
    /// counts without mutating any store. Execute runs also stamp each
    /// evaluated rule's `last_run`.
    pub fn run(&self, dry_run: bool) -> Result<Vec<RuleOutcome>> {
        let rules = self.store.cleanup_rules(true)?;
        tracing::info!("Running cleanup with {} rules (dry_run: {})", rules.len(), dry_run);

        let mut outcomes = Vec::with_capacity(rules.len());
        for rule in rules {
            let outcome = self.apply(&rule, dry_run)?;
            if !dry_run {
                self.store.touch_rule_last_run(&rule.id, Utc::now())?;
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn apply(&self, rule: &CleanupRule, dry_run: bool) -> Result<RuleOutcome> {
        let mut outcome = RuleOutcome {
            rule_id: rule.id.clone(),
            target: rule.target,
            condition: rule.condition,
            action: rule.action,
            affected: 0,
            executed: false,
        };

        match self.execute(rule, dry_run) {
            Ok(affected) => {
                outcome.affected = affected;
                outcome.executed = !dry_run;
            }
            Err(Error::UnsupportedAction(what)) => {
                // recognized no-op: reported in the outcome, never silently
                // accepted and never a failure of the whole pass
                tracing::warn!("Cleanup rule {} skipped: unsupported action {}", rule.id, what);
            }
            Err(e) => return Err(e),
        }

        Ok(outcome)
    }

    fn execute(&self, rule: &CleanupRule, dry_run: bool) -> Result<usize> {
        match (rule.target, rule.condition, rule.action) {
            (RuleTarget::Post, RuleCondition::AgeDays, RuleAction::Archive) => {
                if dry_run {
                    self.store.count_posts_older_than(rule.threshold)
                } else {
                    self.archive_expired_posts(rule.threshold)
                }
            }
            (RuleTarget::FilteredPost, RuleCondition::RelevanceBelow, RuleAction::Delete) => {
                if dry_run {
                    self.store.count_below_relevance(rule.threshold as f64)
                } else {
                    self.store.delete_below_relevance(rule.threshold as f64)
                }
            }
            (target, condition, action) => Err(Error::UnsupportedAction(format!(
                "{}/{}/{}",
                target, condition, action
            ))),
        }
    }

    /// Archive every post older than `days`, then delete the original.
    ///
    /// Per post: write the tombstone, write the ARCHIVED_FROM audit edge,
    /// delete the source (cascading its ingest-derived relations). The three
    /// writes are deliberately not one transaction; see module docs.
    fn archive_expired_posts(&self, days: i64) -> Result<usize> {
        let expired = self.store.posts_older_than(days)?;
        let mut archived_count = 0;

        for post in expired {
            let archived = ArchivedPost::from_post(
                &post,
                format!("Auto-archive after {} days", days),
                Utc::now(),
            );
            self.store.insert_archived(&archived)?;
            self.store.insert_relation(&Relation::new(
                archived.id.clone(),
                post.id.clone(),
                RelationKind::ArchivedFrom,
            ))?;
            self.store.delete_post(&post.id)?;
            archived_count += 1;
        }

        if archived_count > 0 {
            tracing::info!("Archived {} old posts", archived_count);
        }
        Ok(archived_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtered::FilteredPost;
    use crate::post::Post;
    use crate::stats::StatsAggregator;
    use chrono::Duration;

    fn aged_post(id: &str, days_old: i64) -> Post {
        Post::new(id)
            .with_author("alice")
            .with_content("content")
            .with_scraped_at(Utc::now() - Duration::days(days_old))
    }

    fn store_with_defaults() -> GraphStore {
        let store = GraphStore::open_in_memory().unwrap();
        store.seed_default_rules().unwrap();
        store
    }

    #[test]
    fn test_archive_pass_moves_expired_post() {
        let store = store_with_defaults();
        store.insert_post(&aged_post("old", 120)).unwrap();
        store.insert_post(&aged_post("fresh", 5)).unwrap();

        let outcomes = RetentionEngine::new(&store).run(false).unwrap();
        let archive_outcome = outcomes.iter().find(|o| o.rule_id == "rule_001").unwrap();
        assert_eq!(archive_outcome.affected, 1);
        assert!(archive_outcome.executed);

        assert!(store.get_post("old").unwrap().is_none());
        assert!(store.get_post("fresh").unwrap().is_some());

        let tombstone = store.find_archived_by_original("old").unwrap().unwrap();
        assert_eq!(tombstone.id, "archived_old");
        assert_eq!(tombstone.author, "alice");
        assert_eq!(tombstone.content, "content");

        // audit edge survives the delete
        let relations = store.relations_from("archived_old").unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, RelationKind::ArchivedFrom);
        assert_eq!(relations[0].to_id, "old");
    }

    #[test]
    fn test_dry_run_counts_without_mutation() {
        let store = store_with_defaults();
        store.insert_post(&aged_post("old_1", 120)).unwrap();
        store.insert_post(&aged_post("old_2", 200)).unwrap();
        store
            .insert_filtered(&FilteredPost::new("f_low", "old_1", 1.0))
            .unwrap();

        let outcomes = RetentionEngine::new(&store).run(true).unwrap();

        let by_id = |id: &str| outcomes.iter().find(|o| o.rule_id == id).unwrap();
        assert_eq!(by_id("rule_001").affected, 2);
        assert_eq!(by_id("rule_002").affected, 1);
        assert!(outcomes.iter().all(|o| !o.executed));

        assert_eq!(store.count_posts().unwrap(), 2);
        assert_eq!(store.count_filtered().unwrap(), 1);
        assert_eq!(store.count_archived().unwrap(), 0);
        // dry run leaves last_run untouched
        assert!(store
            .cleanup_rules(true)
            .unwrap()
            .iter()
            .all(|r| r.last_run.is_none()));
    }

    #[test]
    fn test_export_rule_is_recognized_noop() {
        let store = store_with_defaults();

        let outcomes = RetentionEngine::new(&store).run(false).unwrap();
        let export = outcomes.iter().find(|o| o.rule_id == "rule_003").unwrap();
        assert_eq!(export.action, RuleAction::Export);
        assert_eq!(export.affected, 0);
        assert!(!export.executed);
    }

    #[test]
    fn test_execute_stamps_last_run() {
        let store = store_with_defaults();

        RetentionEngine::new(&store).run(false).unwrap();
        let rules = store.cleanup_rules(true).unwrap();
        assert!(rules.iter().all(|r| r.last_run.is_some()));
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let store = GraphStore::open_in_memory().unwrap();
        let mut rule = CleanupRule::new(
            "rule_off",
            RuleTarget::Post,
            RuleCondition::AgeDays,
            1,
            RuleAction::Archive,
        );
        rule.enabled = false;
        store.insert_rule(&rule).unwrap();
        store.insert_post(&aged_post("old", 30)).unwrap();

        let outcomes = RetentionEngine::new(&store).run(false).unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(store.count_posts().unwrap(), 1);
    }

    /// End-to-end default pass: aged post with a low-relevance analysis
    #[test]
    fn test_default_pass_scenario() {
        let store = store_with_defaults();
        store.insert_post(&aged_post("p1", 100)).unwrap();
        store
            .insert_filtered(&FilteredPost::new("f1", "p1", 1.5))
            .unwrap();

        RetentionEngine::new(&store).run(false).unwrap();

        assert!(store.get_post("p1").unwrap().is_none());
        let tombstone = store.find_archived_by_original("p1").unwrap().unwrap();
        assert_eq!(tombstone.original_id, "p1");

        let stats = StatsAggregator::new(&store).overall_stats().unwrap();
        assert_eq!(stats.counts.posts, 0);
        assert_eq!(stats.counts.filtered_posts, 0);
        assert_eq!(stats.counts.archived_posts, 1);
    }
}
