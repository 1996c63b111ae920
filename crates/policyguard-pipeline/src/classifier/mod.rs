//! Classification gateway abstractions.
//!
//! A [`Classifier`] turns one chunk of policy text into structured practice
//! classifications. The pipeline ships two implementations:
//!
//! - [`HttpClassifier`]: gateway to the external classification service
//! - [`PatternClassifier`]: built-in deterministic fallback, also used by
//!   tests
//!
//! No retries and no caching happen at this layer. A failed classification
//! aborts the whole analysis; caching is fingerprint-based at the
//! orchestrator.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use policyguard_core::Classification;

mod http;
mod patterns;

pub use http::{HttpClassifier, HttpClassifierConfig};
pub use patterns::PatternClassifier;

/// Errors from the classification gateway.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("classification service error: {detail} (status {status})")]
    Service { status: u16, detail: String },

    #[error("invalid response from classification service: {0}")]
    MalformedResponse(String),
}

/// Classifies one chunk of policy text.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`, tagging every finding with `section_id`.
    async fn classify(
        &self,
        text: &str,
        section_id: &str,
    ) -> Result<Vec<Classification>, ClassifierError>;

    /// Implementation name for logs.
    fn name(&self) -> &str;
}
