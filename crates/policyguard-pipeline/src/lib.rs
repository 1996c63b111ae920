//! # policyguard-pipeline
//!
//! Async analysis pipeline over the deterministic core.
//!
//! The pipeline owns everything that touches the outside world: fetching
//! policy pages, calling the classification service, and persisting sites,
//! classifications, rules, and violation audit records. Sequencing and
//! cache-invalidation policy live in the [`AnalysisOrchestrator`]; the rule
//! evaluation itself stays pure in `policyguard-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use policyguard_pipeline::{
//!     AnalysisOrchestrator, HttpFetcher, PatternClassifier, SqliteStore,
//! };
//!
//! let store = Arc::new(SqliteStore::connect("sqlite://policyguard.db").await?);
//! let orchestrator = AnalysisOrchestrator::builder()
//!     .fetcher(Arc::new(HttpFetcher::default()))
//!     .classifier(Arc::new(PatternClassifier::new()))
//!     .store(store)
//!     .build()?;
//!
//! let report = orchestrator
//!     .analyze("https://example.com/privacy", 1)
//!     .await?;
//! println!("{}: {}", report.domain, report.verdict);
//! ```

pub mod classifier;
pub mod fetcher;
pub mod orchestrator;
pub mod store;

// Re-export main types at crate root
pub use classifier::{
    Classifier, ClassifierError, HttpClassifier, HttpClassifierConfig, PatternClassifier,
};
pub use fetcher::{FetchError, FetcherConfig, HttpFetcher, PolicyFetcher};
pub use orchestrator::{AnalysisError, AnalysisOrchestrator, AnalysisOrchestratorBuilder};
pub use store::{PolicyStore, Site, SqliteStore, StoreError, StoredClassification, ViolationRecord};
