//! Built-in deterministic classifier.
//!
//! Pattern tables stand in for the external classification service when none
//! is configured: each practice has a set of trigger patterns, and the text
//! surrounding a hit decides whether the policy forbids, conditions, or
//! plainly allows the practice. Evidence is a short snippet around the
//! match.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use policyguard_core::{Classification, Practice, Status};

use super::{Classifier, ClassifierError};

/// How far around a hit to look for forbidding/conditioning language.
const STATUS_WINDOW: usize = 200;

/// How much surrounding text to keep as evidence.
const EVIDENCE_WINDOW: usize = 100;

fn pattern(source: &str) -> Regex {
    Regex::new(&format!("(?i){source}")).expect("invalid regex")
}

lazy_static! {
    static ref PRACTICE_PATTERNS: Vec<(Practice, Vec<Regex>)> = vec![
        (
            Practice::DataSelling,
            vec![
                pattern(r"sell.*data"),
                pattern(r"sell.*information"),
                pattern(r"monetize.*data"),
                pattern(r"revenue.*personal"),
                pattern(r"sell to third parties"),
            ],
        ),
        (
            Practice::ThirdPartySharing,
            vec![
                pattern(r"share.*third[\s-]part"),
                pattern(r"disclose.*third[\s-]part"),
                pattern(r"provide.*third[\s-]part"),
                pattern(r"transfer.*third[\s-]part"),
                pattern(r"third[\s-]part.*access"),
            ],
        ),
        (
            Practice::Advertising,
            vec![
                pattern(r"advertis"),
                pattern(r"target.*ads"),
                pattern(r"personalized ads"),
                pattern(r"marketing purposes"),
                pattern(r"promotional"),
            ],
        ),
        (
            Practice::Retention,
            vec![
                pattern(r"retain.*data"),
                pattern(r"keep.*information"),
                pattern(r"store.*\d+\s*(year|month|day)"),
                pattern(r"retention period"),
                pattern(r"delete.*after"),
            ],
        ),
        (
            Practice::SensitiveData,
            vec![
                pattern(r"health.*information"),
                pattern(r"medical.*data"),
                pattern(r"financial.*data"),
                pattern(r"credit card"),
                pattern(r"social security"),
                pattern(r"biometric"),
                pattern(r"genetic"),
            ],
        ),
    ];

    static ref FORBID_PATTERNS: Vec<Regex> = vec![
        pattern(r"do not sell"),
        pattern(r"will not sell"),
        pattern(r"never sell"),
        pattern(r"do not share"),
        pattern(r"will not share"),
        pattern(r"prohibit"),
        pattern(r"forbidden"),
        pattern(r"not allow"),
    ];

    static ref CONDITIONAL_PATTERNS: Vec<Regex> = vec![
        pattern(r"may share"),
        pattern(r"might share"),
        pattern(r"can share"),
        pattern(r"under certain"),
        pattern(r"in some cases"),
        pattern(r"with consent"),
        pattern(r"if you"),
        pattern(r"unless"),
    ];
}

/// Deterministic pattern-table classifier.
#[derive(Debug, Default)]
pub struct PatternClassifier;

impl PatternClassifier {
    pub fn new() -> Self {
        Self
    }

    fn classify_text(text: &str, section_id: &str) -> Vec<Classification> {
        let mut classifications = Vec::new();

        for (practice, patterns) in PRACTICE_PATTERNS.iter() {
            for regex in patterns {
                let Some(hit) = regex.find(text) else {
                    continue;
                };

                let status = status_from_context(text, hit.start(), hit.end());
                let evidence = extract_context(text, hit.start(), EVIDENCE_WINDOW);

                classifications.push(Classification {
                    section_id: section_id.to_string(),
                    practice: *practice,
                    status,
                    evidence,
                });
            }
        }

        if classifications.is_empty() {
            classifications.push(Classification {
                section_id: section_id.to_string(),
                practice: Practice::Advertising,
                status: Status::Unclear,
                evidence: "No specific privacy practices detected in this section".to_string(),
            });
        }

        classifications
    }
}

#[async_trait]
impl Classifier for PatternClassifier {
    async fn classify(
        &self,
        text: &str,
        section_id: &str,
    ) -> Result<Vec<Classification>, ClassifierError> {
        Ok(Self::classify_text(text, section_id))
    }

    fn name(&self) -> &str {
        "patterns"
    }
}

/// Decide the status from the language surrounding a practice hit:
/// forbidding keywords win over conditioning ones; otherwise the policy
/// is taken to allow the practice outright.
fn status_from_context(text: &str, start: usize, end: usize) -> Status {
    let window_start = floor_boundary(text, start.saturating_sub(STATUS_WINDOW));
    let window_end = ceil_boundary(text, end.saturating_add(STATUS_WINDOW));
    let context = &text[window_start..window_end];

    if FORBID_PATTERNS.iter().any(|r| r.is_match(context)) {
        return Status::Forbids;
    }
    if CONDITIONAL_PATTERNS.iter().any(|r| r.is_match(context)) {
        return Status::Conditional;
    }
    Status::Allows
}

/// Ellipsized snippet around `pos`.
fn extract_context(text: &str, pos: usize, window: usize) -> String {
    let start = floor_boundary(text, pos.saturating_sub(window));
    let end = ceil_boundary(text, pos.saturating_add(window));

    let mut snippet = text[start..end].trim().to_string();
    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < text.len() {
        snippet = format!("{snippet}...");
    }
    snippet
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
