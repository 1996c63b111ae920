//! Analysis orchestrator.
//!
//! Sequences one analysis request end to end:
//! fetch → fingerprint → cache check → (chunk → classify → persist) →
//! evaluate → persist violations → report.
//!
//! The fingerprint is the sole staleness signal: a request is a cache hit
//! iff the stored site fingerprint equals the digest of the freshly fetched
//! document. On a hit the stored classifications are re-evaluated against
//! the user's current rules, with no chunking and no classifier calls, so a
//! rule change flips the verdict without re-analysis.
//!
//! Chunks are classified strictly in sequence. This bounds concurrent load
//! on the classification service and keeps `chunk_N` section identifiers
//! stable in input order.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use policyguard_core::{evaluate, AnalysisReport, ChunkerConfig, Classification, Fingerprint};

use crate::classifier::{Classifier, ClassifierError};
use crate::fetcher::{FetchError, PolicyFetcher};
use crate::store::{PolicyStore, StoreError, ViolationRecord};

/// Errors from the analysis pipeline. All are terminal for the current
/// request; nothing is retried and no partial report is ever returned.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to fetch policy: {0}")]
    Fetch(#[from] FetchError),

    #[error("classification failed: {0}")]
    Classification(#[from] ClassifierError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("orchestrator not configured: {0}")]
    NotConfigured(String),
}

impl AnalysisError {
    /// Whether the failure was the caller's fault (maps to a client error
    /// at the API boundary).
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::InvalidRequest(_))
    }
}

/// Orchestrates the policy analysis pipeline over its three collaborators.
///
/// Holds no per-request state: every call to [`analyze`](Self::analyze) is
/// an independent sequential pipeline, safe to run concurrently with others.
pub struct AnalysisOrchestrator {
    fetcher: Arc<dyn PolicyFetcher>,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn PolicyStore>,
    chunker: ChunkerConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PolicyFetcher>,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn PolicyStore>,
        chunker: ChunkerConfig,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            store,
            chunker,
        }
    }

    pub fn builder() -> AnalysisOrchestratorBuilder {
        AnalysisOrchestratorBuilder::new()
    }

    /// Run one full analysis for `policy_url` on behalf of `user_id`.
    pub async fn analyze(
        &self,
        policy_url: &str,
        user_id: i64,
    ) -> Result<AnalysisReport, AnalysisError> {
        // Validation happens before any I/O.
        let domain = resolve_domain(policy_url)?;

        let existing = self.store.find_site(&domain).await?;

        let text = self.fetcher.fetch(policy_url).await?;
        let fingerprint = Fingerprint::of(&text);

        // Cache hit: stored fingerprint matches the fresh document.
        if let Some(site) = existing
            .filter(|site| site.fingerprint.as_ref() == Some(&fingerprint))
        {
            tracing::info!(domain = %domain, "policy unchanged, reusing stored classifications");

            let stored = self.store.classifications_for_site(site.id).await?;
            let classifications: Vec<Classification> =
                stored.into_iter().map(|s| s.classification).collect();
            let rules = self.store.rules_for_user(user_id).await?;
            let evaluation = evaluate(&classifications, &rules);

            return Ok(AnalysisReport {
                domain,
                verdict: evaluation.verdict,
                risk_score: evaluation.risk_score,
                violations: evaluation.violations,
                analyzed_at: site.last_analyzed.unwrap_or_else(Utc::now),
            });
        }

        // Cache miss: refresh the site record, then re-chunk and re-classify.
        let site = self
            .store
            .upsert_site(&domain, policy_url, &fingerprint)
            .await?;

        let chunks = self.chunker.chunk(&text);
        tracing::info!(
            domain = %domain,
            chunks = chunks.len(),
            classifier = self.classifier.name(),
            "policy changed, classifying"
        );

        let mut classifications = Vec::new();
        for (index, chunk) in chunks.iter().enumerate() {
            let section_id = format!("chunk_{index}");
            let mut found = self.classifier.classify(chunk, &section_id).await?;
            classifications.append(&mut found);
        }

        self.store
            .replace_classifications(site.id, &classifications)
            .await?;

        let rules = self.store.rules_for_user(user_id).await?;
        let evaluation = evaluate(&classifications, &rules);

        // Audit trail: one violation row per violation, each carrying the
        // aggregate risk score and verdict of this analysis.
        for violation in &evaluation.violations {
            let stored = self
                .store
                .classification_for_practice(site.id, violation.practice)
                .await?;
            let rule = rules.iter().find(|r| r.practice == violation.practice);

            if let (Some(stored), Some(rule)) = (stored, rule) {
                self.store
                    .insert_violation(&ViolationRecord {
                        user_id,
                        site_id: site.id,
                        classification_id: stored.id,
                        rule_id: rule.id,
                        risk_score: evaluation.risk_score,
                        verdict: evaluation.verdict,
                    })
                    .await?;
            }
        }

        tracing::info!(
            domain = %domain,
            verdict = %evaluation.verdict,
            risk_score = evaluation.risk_score,
            violations = evaluation.violations.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            domain,
            verdict: evaluation.verdict,
            risk_score: evaluation.risk_score,
            violations: evaluation.violations,
            analyzed_at: Utc::now(),
        })
    }
}

fn resolve_domain(policy_url: &str) -> Result<String, AnalysisError> {
    let url = Url::parse(policy_url)
        .map_err(|e| AnalysisError::InvalidRequest(format!("invalid policy URL: {e}")))?;

    url.host_str()
        .map(|host| host.to_string())
        .ok_or_else(|| AnalysisError::InvalidRequest("policy URL has no host".to_string()))
}

/// Builder for [`AnalysisOrchestrator`].
pub struct AnalysisOrchestratorBuilder {
    fetcher: Option<Arc<dyn PolicyFetcher>>,
    classifier: Option<Arc<dyn Classifier>>,
    store: Option<Arc<dyn PolicyStore>>,
    chunker: ChunkerConfig,
}

impl AnalysisOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            fetcher: None,
            classifier: None,
            store: None,
            chunker: ChunkerConfig::default(),
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn PolicyFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn store(mut self, store: Arc<dyn PolicyStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn build(self) -> Result<AnalysisOrchestrator, AnalysisError> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| AnalysisError::NotConfigured("no fetcher set".to_string()))?;
        let classifier = self
            .classifier
            .ok_or_else(|| AnalysisError::NotConfigured("no classifier set".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| AnalysisError::NotConfigured("no store set".to_string()))?;

        Ok(AnalysisOrchestrator::new(
            fetcher, classifier, store, self.chunker,
        ))
    }
}

impl Default for AnalysisOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
