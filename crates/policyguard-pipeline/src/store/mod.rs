//! Persistence collaborator for the analysis pipeline.
//!
//! The pipeline needs a narrow set of operations: site upsert keyed by
//! domain, wholesale classification replacement, rule reads, and violation
//! audit inserts. Everything is expressed against the [`PolicyStore`] trait
//! so tests can run against an in-memory database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use policyguard_core::{Classification, Fingerprint, Practice, UserRule, Verdict};

mod sqlite;

pub use sqlite::SqliteStore;

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// One analyzed site. At most one row per domain; the fingerprint is the
/// cache-validity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub domain: String,
    pub policy_url: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub last_analyzed: Option<DateTime<Utc>>,
}

/// A classification as persisted, with its row identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredClassification {
    pub id: i64,
    pub site_id: i64,
    pub classification: Classification,
    pub analyzed_at: DateTime<Utc>,
}

/// Violation audit record tying user, site, classification, and rule to the
/// aggregate outcome of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    pub user_id: i64,
    pub site_id: i64,
    pub classification_id: i64,
    pub rule_id: i64,
    pub risk_score: u32,
    pub verdict: Verdict,
}

/// Storage operations the orchestrator depends on.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn find_site(&self, domain: &str) -> Result<Option<Site>, StoreError>;

    /// Insert or refresh the site row for `domain`, stamping the new
    /// fingerprint and a fresh last-analyzed time.
    async fn upsert_site(
        &self,
        domain: &str,
        policy_url: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Site, StoreError>;

    /// Replace the site's classification set wholesale. Classifications are
    /// never updated in place; the new set supersedes the old one entirely.
    async fn replace_classifications(
        &self,
        site_id: i64,
        classifications: &[Classification],
    ) -> Result<(), StoreError>;

    async fn classifications_for_site(
        &self,
        site_id: i64,
    ) -> Result<Vec<StoredClassification>, StoreError>;

    /// One persisted classification for (site, practice), if any.
    async fn classification_for_practice(
        &self,
        site_id: i64,
        practice: Practice,
    ) -> Result<Option<StoredClassification>, StoreError>;

    async fn rules_for_user(&self, user_id: i64) -> Result<Vec<UserRule>, StoreError>;

    /// Create or overwrite the user's rule for a practice. One active rule
    /// per (user, practice) is enforced here, at write time.
    async fn upsert_rule(
        &self,
        user_id: i64,
        practice: Practice,
        allowed: bool,
        priority: i64,
    ) -> Result<UserRule, StoreError>;

    async fn insert_violation(&self, record: &ViolationRecord) -> Result<(), StoreError>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
