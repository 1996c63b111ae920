//! Rule evaluation: matching classifications against a user's rule set.
//!
//! The evaluator applies strict, non-configurable policy rules:
//! 1. UNCLEAR classifications never violate (insufficient evidence is not
//!    penalized).
//! 2. ALLOWS or CONDITIONAL against a disallowing rule is a violation.
//! 3. Risk is the clamped sum of per-violation severities.
//! 4. Verdict thresholds are evaluated in strict order, first match wins.
//!
//! This is a pure, total function over its inputs: no I/O, no hidden state,
//! identical inputs always produce identical output.

use std::collections::HashMap;

use crate::types::{Classification, Evaluation, Practice, Status, UserRule, Verdict, Violation};

/// Risk score ceiling; the sum of severities is hard-clamped here.
const MAX_RISK_SCORE: u32 = 100;

/// Priority value at which a rule carries its full base severity.
const PRIORITY_BASELINE: f64 = 10.0;

/// Evaluate a classification set against a user's rules.
///
/// Practices the user has no rule for never contribute. When the input
/// carries several rules for one practice (which the store forbids at write
/// time), the last one wins, deterministically.
pub fn evaluate(classifications: &[Classification], rules: &[UserRule]) -> Evaluation {
    let rule_map: HashMap<Practice, &UserRule> =
        rules.iter().map(|rule| (rule.practice, rule)).collect();

    let mut violations = Vec::new();
    let mut total_risk: u32 = 0;

    for classification in classifications {
        let Some(rule) = rule_map.get(&classification.practice).copied() else {
            continue;
        };

        if !is_violation(classification, rule) {
            continue;
        }

        let severity = severity(classification, rule);
        total_risk = total_risk.saturating_add(severity);
        violations.push(Violation {
            practice: classification.practice,
            status: classification.status,
            evidence: classification.evidence.clone(),
            user_rule: true,
            severity,
        });
    }

    let risk_score = total_risk.min(MAX_RISK_SCORE);
    let verdict = determine_verdict(risk_score, violations.len());

    tracing::debug!(
        classifications = classifications.len(),
        violations = violations.len(),
        risk_score,
        verdict = %verdict,
        "evaluated rule set"
    );

    Evaluation {
        verdict,
        risk_score,
        violations,
    }
}

/// A classification violates a rule iff the policy engages in a practice
/// the rule disallows. FORBIDS satisfies any rule; UNCLEAR never violates.
fn is_violation(classification: &Classification, rule: &UserRule) -> bool {
    match classification.status {
        Status::Unclear | Status::Forbids => false,
        Status::Allows | Status::Conditional => !rule.allowed,
    }
}

/// `severity = round(base(status) * (priority / 10) * practice_weight)`.
fn severity(classification: &Classification, rule: &UserRule) -> u32 {
    let base = classification.status.base_severity() as f64;
    let priority_multiplier = rule.priority as f64 / PRIORITY_BASELINE;
    let weight = classification.practice.weight();

    (base * priority_multiplier * weight).round() as u32
}

/// Verdict thresholds, first match wins.
fn determine_verdict(risk_score: u32, violation_count: usize) -> Verdict {
    if risk_score >= 70 || violation_count >= 3 {
        return Verdict::Blocked;
    }
    if risk_score >= 40 || violation_count >= 1 {
        return Verdict::Warning;
    }
    Verdict::Safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(practice: Practice, allowed: bool, priority: i64) -> UserRule {
        UserRule {
            id: 0,
            user_id: 1,
            practice,
            allowed,
            priority,
        }
    }

    fn classification(practice: Practice, status: Status) -> Classification {
        Classification {
            section_id: "chunk_0".to_string(),
            practice,
            status,
            evidence: format!("the policy {} {}", status, practice),
        }
    }

    #[test]
    fn test_worked_example_single_violation_warns() {
        // round(30 * 1.0 * 2.0) = 60 -> one violation, risk 60 -> WARNING.
        let result = evaluate(
            &[classification(Practice::DataSelling, Status::Allows)],
            &[rule(Practice::DataSelling, false, 10)],
        );

        assert_eq!(result.risk_score, 60);
        assert_eq!(result.verdict, Verdict::Warning);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].severity, 60);
        assert!(result.violations[0].user_rule);
    }

    #[test]
    fn test_no_rules_is_safe() {
        let result = evaluate(
            &[classification(Practice::DataSelling, Status::Allows)],
            &[],
        );

        assert_eq!(result.verdict, Verdict::Safe);
        assert_eq!(result.risk_score, 0);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_practices_without_rules_are_skipped() {
        let result = evaluate(
            &[
                classification(Practice::DataSelling, Status::Allows),
                classification(Practice::Advertising, Status::Allows),
            ],
            &[rule(Practice::Advertising, false, 10)],
        );

        // Only the advertising classification had a matching rule.
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].practice, Practice::Advertising);
        assert_eq!(result.risk_score, 30);
    }

    #[test]
    fn test_unclear_never_contributes() {
        let result = evaluate(
            &[
                classification(Practice::DataSelling, Status::Unclear),
                classification(Practice::SensitiveData, Status::Unclear),
            ],
            &[
                rule(Practice::DataSelling, false, 10),
                rule(Practice::SensitiveData, false, 10),
            ],
        );

        assert_eq!(result.verdict, Verdict::Safe);
        assert_eq!(result.risk_score, 0);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_forbids_satisfies_disallowing_rule() {
        let result = evaluate(
            &[classification(Practice::DataSelling, Status::Forbids)],
            &[rule(Practice::DataSelling, false, 10)],
        );

        assert_eq!(result.verdict, Verdict::Safe);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_allowing_rule_never_violates() {
        let result = evaluate(
            &[
                classification(Practice::Advertising, Status::Allows),
                classification(Practice::Advertising, Status::Conditional),
            ],
            &[rule(Practice::Advertising, true, 10)],
        );

        assert_eq!(result.verdict, Verdict::Safe);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_conditional_uses_lower_base() {
        let result = evaluate(
            &[classification(Practice::Advertising, Status::Conditional)],
            &[rule(Practice::Advertising, false, 10)],
        );

        // round(20 * 1.0 * 1.0) = 20.
        assert_eq!(result.violations[0].severity, 20);
        assert_eq!(result.verdict, Verdict::Warning);
    }

    #[test]
    fn test_risk_69_with_two_violations_warns() {
        // advertising: round(30 * 1.1 * 1.0) = 33
        // retention:   round(30 * 1.0 * 1.2) = 36
        let result = evaluate(
            &[
                classification(Practice::Advertising, Status::Allows),
                classification(Practice::Retention, Status::Allows),
            ],
            &[
                rule(Practice::Advertising, false, 11),
                rule(Practice::Retention, false, 10),
            ],
        );

        assert_eq!(result.risk_score, 69);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.verdict, Verdict::Warning);
    }

    #[test]
    fn test_risk_70_blocks_with_two_violations() {
        // third_party_sharing: round(30 * 1.0 * 1.8) = 54
        // advertising:         round(20 * 0.8 * 1.0) = 16
        let result = evaluate(
            &[
                classification(Practice::ThirdPartySharing, Status::Allows),
                classification(Practice::Advertising, Status::Conditional),
            ],
            &[
                rule(Practice::ThirdPartySharing, false, 10),
                rule(Practice::Advertising, false, 8),
            ],
        );

        assert_eq!(result.risk_score, 70);
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.verdict, Verdict::Blocked);
    }

    #[test]
    fn test_three_violations_block_regardless_of_risk() {
        assert_eq!(determine_verdict(0, 3), Verdict::Blocked);
    }

    #[test]
    fn test_verdict_threshold_boundaries() {
        assert_eq!(determine_verdict(39, 0), Verdict::Safe);
        assert_eq!(determine_verdict(40, 0), Verdict::Warning);
        assert_eq!(determine_verdict(69, 2), Verdict::Warning);
        assert_eq!(determine_verdict(70, 0), Verdict::Blocked);
        assert_eq!(determine_verdict(0, 1), Verdict::Warning);
        assert_eq!(determine_verdict(0, 0), Verdict::Safe);
    }

    #[test]
    fn test_risk_score_is_clamped_at_100() {
        // Three chunks all flag data selling: 3 * 60 = 180, clamped.
        let classifications: Vec<_> = (0..3)
            .map(|_| classification(Practice::DataSelling, Status::Allows))
            .collect();
        let result = evaluate(&classifications, &[rule(Practice::DataSelling, false, 10)]);

        assert_eq!(result.risk_score, 100);
        assert_eq!(result.verdict, Verdict::Blocked);
    }

    #[test]
    fn test_duplicate_rules_last_one_wins() {
        // The store forbids this shape; fed directly, the later rule governs.
        let result = evaluate(
            &[classification(Practice::DataSelling, Status::Allows)],
            &[
                rule(Practice::DataSelling, true, 10),
                rule(Practice::DataSelling, false, 10),
            ],
        );

        assert_eq!(result.violations.len(), 1);
    }

    fn arb_practice() -> impl Strategy<Value = Practice> {
        proptest::sample::select(Practice::ALL.to_vec())
    }

    fn arb_status() -> impl Strategy<Value = Status> {
        proptest::sample::select(vec![
            Status::Allows,
            Status::Forbids,
            Status::Conditional,
            Status::Unclear,
        ])
    }

    fn arb_classification() -> impl Strategy<Value = Classification> {
        (arb_practice(), arb_status(), "[a-z ]{0,40}").prop_map(|(practice, status, evidence)| {
            Classification {
                section_id: "chunk_0".to_string(),
                practice,
                status,
                evidence,
            }
        })
    }

    fn arb_rule() -> impl Strategy<Value = UserRule> {
        (arb_practice(), any::<bool>(), 1i64..=20).prop_map(|(practice, allowed, priority)| {
            UserRule {
                id: 0,
                user_id: 1,
                practice,
                allowed,
                priority,
            }
        })
    }

    proptest! {
        #[test]
        fn prop_evaluation_is_deterministic(
            classifications in proptest::collection::vec(arb_classification(), 0..20),
            rules in proptest::collection::vec(arb_rule(), 0..8),
        ) {
            let first = evaluate(&classifications, &rules);
            let second = evaluate(&classifications, &rules);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_risk_never_exceeds_ceiling(
            classifications in proptest::collection::vec(arb_classification(), 0..40),
            rules in proptest::collection::vec(arb_rule(), 0..8),
        ) {
            let result = evaluate(&classifications, &rules);
            prop_assert!(result.risk_score <= 100);
        }

        #[test]
        fn prop_unclear_only_input_is_always_safe(
            practices in proptest::collection::vec(arb_practice(), 0..20),
            rules in proptest::collection::vec(arb_rule(), 0..8),
        ) {
            let classifications: Vec<_> = practices
                .into_iter()
                .map(|practice| Classification {
                    section_id: "chunk_0".to_string(),
                    practice,
                    status: Status::Unclear,
                    evidence: String::new(),
                })
                .collect();

            let result = evaluate(&classifications, &rules);
            prop_assert_eq!(result.verdict, Verdict::Safe);
            prop_assert_eq!(result.risk_score, 0);
        }
    }
}
