//! SQLite storage backend.
//!
//! Backed by a sqlx connection pool with embedded migrations. Timestamps are
//! bound explicitly (RFC 3339 via chrono) rather than left to SQL defaults,
//! so values read back exactly what was written.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{ConnectOptions, Row};
use std::str::FromStr;
use tracing::info;

use policyguard_core::{Classification, Fingerprint, Practice, Status, UserRule};

use super::{PolicyStore, Site, StoreError, StoredClassification, ViolationRecord};

/// SQLite-backed [`PolicyStore`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` (e.g. `sqlite://policyguard.db`), creating
    /// the file if missing, and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!(database_url, "connecting to SQLite database");

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30))
            .disable_statement_logging();

        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// In-memory database for tests. Pinned to a single connection so every
    /// statement sees the same schema.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_site(row: &SqliteRow) -> Result<Site, StoreError> {
        Ok(Site {
            id: row.try_get("id")?,
            domain: row.try_get("domain")?,
            policy_url: row.try_get("policy_url")?,
            fingerprint: row
                .try_get::<Option<String>, _>("fingerprint")?
                .map(Fingerprint::from_hex),
            last_analyzed: row.try_get("last_analyzed")?,
        })
    }

    fn row_to_classification(row: &SqliteRow) -> Result<StoredClassification, StoreError> {
        let practice: String = row.try_get("practice")?;
        let status: String = row.try_get("status")?;

        Ok(StoredClassification {
            id: row.try_get("id")?,
            site_id: row.try_get("site_id")?,
            classification: Classification {
                section_id: row.try_get("section_id")?,
                practice: Practice::from_str(&practice)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                status: Status::from_str(&status)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                evidence: row.try_get("evidence")?,
            },
            analyzed_at: row.try_get("analyzed_at")?,
        })
    }

    fn row_to_rule(row: &SqliteRow) -> Result<UserRule, StoreError> {
        let practice: String = row.try_get("practice")?;

        Ok(UserRule {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            practice: Practice::from_str(&practice)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            allowed: row.try_get("allowed")?,
            priority: row.try_get("priority")?,
        })
    }
}

#[async_trait]
impl PolicyStore for SqliteStore {
    async fn find_site(&self, domain: &str) -> Result<Option<Site>, StoreError> {
        let row = sqlx::query("SELECT * FROM sites WHERE domain = ?")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_site).transpose()
    }

    async fn upsert_site(
        &self,
        domain: &str,
        policy_url: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Site, StoreError> {
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO sites (domain, policy_url, fingerprint, last_analyzed, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(domain) DO UPDATE SET \
                 policy_url = excluded.policy_url, \
                 fingerprint = excluded.fingerprint, \
                 last_analyzed = excluded.last_analyzed, \
                 updated_at = excluded.updated_at \
             RETURNING *",
        )
        .bind(domain)
        .bind(policy_url)
        .bind(fingerprint.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_site(&row)
    }

    async fn replace_classifications(
        &self,
        site_id: i64,
        classifications: &[Classification],
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM policy_classifications WHERE site_id = ?")
            .bind(site_id)
            .execute(&mut *tx)
            .await?;

        for classification in classifications {
            sqlx::query(
                "INSERT INTO policy_classifications \
                 (site_id, section_id, practice, status, evidence, analyzed_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(&classification.section_id)
            .bind(classification.practice.as_str())
            .bind(classification.status.as_str())
            .bind(&classification.evidence)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn classifications_for_site(
        &self,
        site_id: i64,
    ) -> Result<Vec<StoredClassification>, StoreError> {
        let rows = sqlx::query("SELECT * FROM policy_classifications WHERE site_id = ? ORDER BY id")
            .bind(site_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_classification).collect()
    }

    async fn classification_for_practice(
        &self,
        site_id: i64,
        practice: Practice,
    ) -> Result<Option<StoredClassification>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM policy_classifications \
             WHERE site_id = ? AND practice = ? LIMIT 1",
        )
        .bind(site_id)
        .bind(practice.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_classification).transpose()
    }

    async fn rules_for_user(&self, user_id: i64) -> Result<Vec<UserRule>, StoreError> {
        let rows = sqlx::query("SELECT * FROM user_rules WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_rule).collect()
    }

    async fn upsert_rule(
        &self,
        user_id: i64,
        practice: Practice,
        allowed: bool,
        priority: i64,
    ) -> Result<UserRule, StoreError> {
        let row = sqlx::query(
            "INSERT INTO user_rules (user_id, practice, allowed, priority) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id, practice) DO UPDATE SET \
                 allowed = excluded.allowed, \
                 priority = excluded.priority \
             RETURNING *",
        )
        .bind(user_id)
        .bind(practice.as_str())
        .bind(allowed)
        .bind(priority)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_rule(&row)
    }

    async fn insert_violation(&self, record: &ViolationRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO violations \
             (user_id, site_id, classification_id, rule_id, risk_score, verdict, detected_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.site_id)
        .bind(record.classification_id)
        .bind(record.rule_id)
        .bind(record.risk_score as i64)
        .bind(record.verdict.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
