//! # policyguard-core
//!
//! Deterministic core of the policy analysis pipeline.
//!
//! This crate holds every part of the system with no I/O: the domain model,
//! content fingerprinting, text chunking, and rule evaluation.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No network calls**: Classification and persistence live in
//!    `policyguard-pipeline`; nothing here suspends
//! 3. **Total**: The evaluator terminates and returns a verdict for any
//!    classification set and rule set
//!
//! ## Example
//!
//! ```rust
//! use policyguard_core::{evaluate, Classification, Practice, Status, UserRule, Verdict};
//!
//! let classifications = vec![Classification {
//!     section_id: "chunk_0".into(),
//!     practice: Practice::DataSelling,
//!     status: Status::Allows,
//!     evidence: "we may sell your data".into(),
//! }];
//! let rules = vec![UserRule {
//!     id: 1,
//!     user_id: 1,
//!     practice: Practice::DataSelling,
//!     allowed: false,
//!     priority: 10,
//! }];
//!
//! let result = evaluate(&classifications, &rules);
//! assert_eq!(result.verdict, Verdict::Warning);
//! assert_eq!(result.risk_score, 60);
//! ```

pub mod chunker;
pub mod evaluator;
pub mod fingerprint;
pub mod types;

// Re-export main types at crate root
pub use chunker::ChunkerConfig;
pub use evaluator::evaluate;
pub use fingerprint::Fingerprint;
pub use types::{
    AnalysisReport, Classification, Evaluation, ParseEnumError, Practice, Status, UserRule,
    Verdict, Violation,
};
