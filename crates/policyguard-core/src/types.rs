//! Domain types shared across the analysis pipeline.
//!
//! Everything that crosses a wire or a store boundary lives here, with serde
//! spellings matching the external contract (`data_selling`, `ALLOWS`,
//! `SAFE`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A category of data handling behavior a policy can take a position on.
///
/// The set is closed: the classifier contract only ever emits these five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Practice {
    DataSelling,
    ThirdPartySharing,
    Advertising,
    Retention,
    SensitiveData,
}

impl Practice {
    /// All practices, in a stable order.
    pub const ALL: [Practice; 5] = [
        Practice::DataSelling,
        Practice::ThirdPartySharing,
        Practice::Advertising,
        Practice::Retention,
        Practice::SensitiveData,
    ];

    /// Wire spelling of this practice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Practice::DataSelling => "data_selling",
            Practice::ThirdPartySharing => "third_party_sharing",
            Practice::Advertising => "advertising",
            Practice::Retention => "retention",
            Practice::SensitiveData => "sensitive_data",
        }
    }

    /// Risk weight of this practice.
    ///
    /// The table is data over a closed enumeration; the match is exhaustive,
    /// so every practice has a weight by construction.
    pub fn weight(&self) -> f64 {
        match self {
            Practice::DataSelling => 2.0,
            Practice::SensitiveData => 2.0,
            Practice::ThirdPartySharing => 1.8,
            Practice::Retention => 1.2,
            Practice::Advertising => 1.0,
        }
    }
}

impl fmt::Display for Practice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown practice or status spelling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Practice {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data_selling" => Ok(Practice::DataSelling),
            "third_party_sharing" => Ok(Practice::ThirdPartySharing),
            "advertising" => Ok(Practice::Advertising),
            "retention" => Ok(Practice::Retention),
            "sensitive_data" => Ok(Practice::SensitiveData),
            other => Err(ParseEnumError {
                kind: "practice",
                value: other.to_string(),
            }),
        }
    }
}

/// A policy's stated position on a practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Allows,
    Forbids,
    Conditional,
    Unclear,
}

impl Status {
    /// Wire spelling of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Allows => "ALLOWS",
            Status::Forbids => "FORBIDS",
            Status::Conditional => "CONDITIONAL",
            Status::Unclear => "UNCLEAR",
        }
    }

    /// Base severity contribution of this status when it violates a rule.
    ///
    /// FORBIDS and UNCLEAR never produce violations, so their base is zero.
    pub fn base_severity(&self) -> u32 {
        match self {
            Status::Allows => 30,
            Status::Conditional => 20,
            Status::Forbids | Status::Unclear => 0,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOWS" => Ok(Status::Allows),
            "FORBIDS" => Ok(Status::Forbids),
            "CONDITIONAL" => Ok(Status::Conditional),
            "UNCLEAR" => Ok(Status::Unclear),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Final three-level risk verdict for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Warning,
    Blocked,
}

impl Verdict {
    /// Wire spelling of this verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Warning => "WARNING",
            Verdict::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAFE" => Ok(Verdict::Safe),
            "WARNING" => Ok(Verdict::Warning),
            "BLOCKED" => Ok(Verdict::Blocked),
            other => Err(ParseEnumError {
                kind: "verdict",
                value: other.to_string(),
            }),
        }
    }
}

/// One practice finding emitted by the classifier for one chunk.
///
/// Multiple classifications may exist per practice (one per chunk that
/// discusses it); the evaluator consumes all of them, the store persists all
/// of them keyed by site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Chunk-derived section identifier, e.g. `chunk_3`.
    pub section_id: String,
    pub practice: Practice,
    pub status: Status,
    /// Verbatim snippet of the policy text supporting the finding.
    pub evidence: String,
}

/// A user's standing rule for one practice.
///
/// At most one active rule per (user, practice); the store enforces this at
/// write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRule {
    pub id: i64,
    pub user_id: i64,
    pub practice: Practice,
    pub allowed: bool,
    /// Arbitrary positive weight; 10 is the baseline (observed range 1-10).
    pub priority: i64,
}

/// One rule violation derived from a classification during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub practice: Practice,
    pub status: Status,
    pub evidence: String,
    /// Always true: a violation only exists where a user rule matched.
    pub user_rule: bool,
    pub severity: u32,
}

/// Output of one rule evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub risk_score: u32,
    pub violations: Vec<Violation>,
}

/// The externally visible result of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub domain: String,
    pub verdict: Verdict,
    pub risk_score: u32,
    pub violations: Vec<Violation>,
    pub analyzed_at: DateTime<Utc>,
}
