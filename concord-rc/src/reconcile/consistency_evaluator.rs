// Stage 3: Consistency Evaluator
//
// Concept: Decide Reinforcement, Contradiction, or Silence for one equivalence class
// Synchronization: Accepts &EquivalenceClass, outputs Evaluation
//
// Algorithm:
// 1. Partition members by normalized assertion text; each partition has one outcome token
// 2. Relate the distinct outcome tokens: agree, same-class variants, mutually
//    exclusive, or merely divergent
// 3. One artifact kind only → Silence (nothing to cross-check against)
// 4. Low-precision class with exclusive or divergent outcomes → abstain as Silence
// 5. Otherwise: agree → Reinforcement, exclusive → Contradiction,
//    variants → per policy, divergent → Silence
//
// Status classes (2xx, 4xx, 5xx) never mix: a 200 and a 404 are always exclusive.
// Within one class the EvaluationPolicy decides whether different codes are
// variants or exclusive. A negated code ("is not 200") only excludes the same
// code asserted positively; against anything else it is divergent.

use super::types::{
    ConsistencyOutcome, EquivalenceClass, Evaluation, EvaluationNote, OutcomeToken, StatusClass,
};
use concord_common::config::{EvaluationPolicy, VariantPolicy};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// How the distinct outcome tokens of one class relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeRelation {
    /// Exactly one outcome token
    Agree,
    /// Only same-class status codes that policy treats as variants
    Variants,
    /// At least one pair cannot both hold
    Exclusive,
    /// Different, but not comparable as opposites
    Divergent,
}

/// Relation of a single pair of distinct outcome tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairRelation {
    Variant,
    Exclusive,
    Divergent,
}

/// Stage 3 of the pipeline
pub struct ConsistencyEvaluator {
    policy: EvaluationPolicy,
}

impl ConsistencyEvaluator {
    pub fn new(policy: EvaluationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EvaluationPolicy {
        &self.policy
    }

    /// Evaluate one class; total over every well-formed class
    pub fn evaluate(&self, class: &EquivalenceClass) -> Evaluation {
        let outcomes: BTreeSet<&OutcomeToken> = class
            .members()
            .iter()
            .map(|m| &m.assertion.outcome)
            .collect();
        let relation = self.relate(&outcomes);
        let sources = class.artifacts().len();

        let mut notes = BTreeSet::new();
        if class.low_precision() {
            notes.insert(EvaluationNote::AmbiguousCondition);
        }
        match relation {
            OutcomeRelation::Variants => {
                notes.insert(EvaluationNote::StatusVariants);
            }
            OutcomeRelation::Divergent => {
                notes.insert(EvaluationNote::DivergentAssertions);
            }
            OutcomeRelation::Exclusive if sources == 1 => {
                notes.insert(EvaluationNote::DivergentAssertions);
            }
            _ => {}
        }

        let (outcome, abstained) = if sources == 1 {
            (ConsistencyOutcome::Silence, false)
        } else {
            match relation {
                OutcomeRelation::Agree | OutcomeRelation::Variants => {
                    (ConsistencyOutcome::Reinforcement, false)
                }
                OutcomeRelation::Exclusive if class.low_precision() => {
                    (ConsistencyOutcome::Silence, true)
                }
                OutcomeRelation::Exclusive => (ConsistencyOutcome::Contradiction, false),
                OutcomeRelation::Divergent => (ConsistencyOutcome::Silence, true),
            }
        };

        if abstained {
            warn!(key = %class.key(), ?relation, "Abstained: reporting Silence");
        }
        debug!(
            key = %class.key(),
            members = class.members().len(),
            sources,
            ?relation,
            %outcome,
            abstained,
            "Evaluated class"
        );

        Evaluation {
            outcome,
            abstained,
            notes,
        }
    }

    /// Relate all distinct outcome tokens of a class
    pub fn relate(&self, outcomes: &BTreeSet<&OutcomeToken>) -> OutcomeRelation {
        if outcomes.len() <= 1 {
            return OutcomeRelation::Agree;
        }

        let tokens: Vec<&OutcomeToken> = outcomes.iter().copied().collect();
        let mut all_variants = true;
        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                match self.relate_pair(a, b) {
                    PairRelation::Exclusive => return OutcomeRelation::Exclusive,
                    PairRelation::Divergent => all_variants = false,
                    PairRelation::Variant => {}
                }
            }
        }

        if all_variants {
            OutcomeRelation::Variants
        } else {
            OutcomeRelation::Divergent
        }
    }

    fn relate_pair(&self, a: &OutcomeToken, b: &OutcomeToken) -> PairRelation {
        match (a, b) {
            (
                OutcomeToken::Status {
                    code: x,
                    negated: n1,
                },
                OutcomeToken::Status {
                    code: y,
                    negated: n2,
                },
            ) if x == y && n1 != n2 => PairRelation::Exclusive,
            (OutcomeToken::Status { negated: true, .. }, _)
            | (_, OutcomeToken::Status { negated: true, .. }) => PairRelation::Divergent,
            (OutcomeToken::Status { code: x, .. }, OutcomeToken::Status { code: y, .. }) => {
                let (class_x, class_y) = (StatusClass::of(*x), StatusClass::of(*y));
                if class_x != class_y {
                    return PairRelation::Exclusive;
                }
                let policy = match class_x {
                    Some(StatusClass::Success) => self.policy.success_variants,
                    _ => self.policy.error_variants,
                };
                match policy {
                    VariantPolicy::Warn => PairRelation::Variant,
                    VariantPolicy::Contradict => PairRelation::Exclusive,
                }
            }
            (
                OutcomeToken::Stated {
                    statement: s1,
                    negated: n1,
                },
                OutcomeToken::Stated {
                    statement: s2,
                    negated: n2,
                },
            ) if s1 == s2 && n1 != n2 => PairRelation::Exclusive,
            _ => PairRelation::Divergent,
        }
    }
}

impl Default for ConsistencyEvaluator {
    fn default() -> Self {
        Self::new(EvaluationPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::canonicalizer::normalize_assertion;
    use crate::reconcile::types::{CanonicalClaim, IdentityKey};
    use concord_common::claims::{
        ArtifactKind, Authority, ClaimCategory, ConditionBucket, Confidence, HttpMethod,
        LineRange, RawClaim, SourceRef,
    };

    fn key(condition: ConditionBucket) -> IdentityKey {
        IdentityKey {
            endpoint: "/users/{param}".to_string(),
            method: HttpMethod::Get,
            condition,
            category: ClaimCategory::ErrorSemantics,
        }
    }

    fn member(condition: ConditionBucket, artifact: ArtifactKind, assertion: &str) -> CanonicalClaim {
        CanonicalClaim {
            key: key(condition),
            assertion: normalize_assertion(assertion),
            authority: Authority::for_artifact(artifact),
            raw: RawClaim {
                category: "ErrorSemantics".to_string(),
                endpoint: "GET /users/1".to_string(),
                method: None,
                condition: String::new(),
                assertion: assertion.to_string(),
                authority: None,
                source: SourceRef {
                    artifact,
                    file: "f".to_string(),
                    lines: LineRange::single(1),
                    excerpt: assertion.to_string(),
                },
                confidence: Confidence::High,
            },
        }
    }

    fn evaluate(condition: ConditionBucket, members: &[(ArtifactKind, &str)]) -> Evaluation {
        let members = members
            .iter()
            .map(|(a, text)| member(condition, *a, text))
            .collect();
        let class = EquivalenceClass::new(key(condition), members).unwrap();
        ConsistencyEvaluator::default().evaluate(&class)
    }

    #[test]
    fn test_agreement_across_sources_reinforces() {
        let eval = evaluate(
            ConditionBucket::NotFound,
            &[
                (ArtifactKind::Readme, "Returns 404"),
                (ArtifactKind::ApiSpec, "returns 404 not found"),
                (ArtifactKind::Test, "status 404"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Reinforcement);
        assert!(!eval.abstained);
        assert!(eval.notes.is_empty());
    }

    #[test]
    fn test_different_status_classes_contradict() {
        let eval = evaluate(
            ConditionBucket::NotFound,
            &[
                (ArtifactKind::Readme, "returns 200 with empty body"),
                (ArtifactKind::Test, "returns 404"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Contradiction);
    }

    #[test]
    fn test_error_codes_in_same_class_contradict_by_default() {
        let eval = evaluate(
            ConditionBucket::InvalidInput,
            &[
                (ArtifactKind::ApiSpec, "responds 400"),
                (ArtifactKind::Test, "responds 422"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Contradiction);
    }

    #[test]
    fn test_success_variants_warn_by_default() {
        let eval = evaluate(
            ConditionBucket::Success,
            &[
                (ArtifactKind::ApiSpec, "returns 200"),
                (ArtifactKind::Test, "returns 201"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Reinforcement);
        assert!(eval.notes.contains(&EvaluationNote::StatusVariants));
    }

    #[test]
    fn test_policy_can_flip_success_variants() {
        let evaluator = ConsistencyEvaluator::new(EvaluationPolicy {
            success_variants: VariantPolicy::Contradict,
            error_variants: VariantPolicy::Warn,
        });
        let class = EquivalenceClass::new(
            key(ConditionBucket::Success),
            vec![
                member(ConditionBucket::Success, ArtifactKind::ApiSpec, "returns 200"),
                member(ConditionBucket::Success, ArtifactKind::Test, "returns 201"),
            ],
        )
        .unwrap();
        assert_eq!(evaluator.evaluate(&class).outcome, ConsistencyOutcome::Contradiction);
    }

    #[test]
    fn test_single_source_is_silence() {
        let eval = evaluate(ConditionBucket::NotFound, &[(ArtifactKind::Test, "returns 404")]);
        assert_eq!(eval.outcome, ConsistencyOutcome::Silence);
        assert!(!eval.abstained);

        // Several claims from one artifact kind still have nothing to cross-check
        let eval = evaluate(
            ConditionBucket::NotFound,
            &[
                (ArtifactKind::Test, "returns 404"),
                (ArtifactKind::Test, "status is 404"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Silence);
    }

    #[test]
    fn test_single_source_disagreement_is_noted() {
        let eval = evaluate(
            ConditionBucket::NotFound,
            &[
                (ArtifactKind::Test, "returns 404"),
                (ArtifactKind::Test, "returns 410"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Silence);
        assert!(eval.notes.contains(&EvaluationNote::DivergentAssertions));
    }

    #[test]
    fn test_low_precision_never_contradicts() {
        let eval = evaluate(
            ConditionBucket::Unknown,
            &[
                (ArtifactKind::Readme, "returns 200"),
                (ArtifactKind::Test, "returns 500"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Silence);
        assert!(eval.abstained);
        assert!(eval.notes.contains(&EvaluationNote::AmbiguousCondition));
    }

    #[test]
    fn test_negated_statement_contradicts() {
        let eval = evaluate(
            ConditionBucket::Success,
            &[
                (ArtifactKind::Readme, "is idempotent"),
                (ArtifactKind::Test, "is not idempotent"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Contradiction);
    }

    #[test]
    fn test_divergent_statements_are_silence() {
        let eval = evaluate(
            ConditionBucket::Success,
            &[
                (ArtifactKind::Readme, "returns the user profile"),
                (ArtifactKind::Test, "returns 200"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Silence);
        assert!(eval.abstained);
        assert!(eval.notes.contains(&EvaluationNote::DivergentAssertions));
    }

    #[test]
    fn test_low_precision_agreement_reinforces_with_note() {
        let eval = evaluate(
            ConditionBucket::Unknown,
            &[
                (ArtifactKind::Readme, "returns 200"),
                (ArtifactKind::Test, "Returns 200"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Reinforcement);
        assert!(!eval.abstained);
        assert!(eval.notes.contains(&EvaluationNote::AmbiguousCondition));
    }

    #[test]
    fn test_negated_status_excludes_same_code() {
        let eval = evaluate(
            ConditionBucket::Success,
            &[
                (ArtifactKind::Readme, "returns 200"),
                (ArtifactKind::Test, "asserts status is not 200"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Contradiction);

        // "not 404" says nothing definite about a 200
        let eval = evaluate(
            ConditionBucket::Success,
            &[
                (ArtifactKind::Readme, "returns 200"),
                (ArtifactKind::Test, "does not return 404"),
            ],
        );
        assert_eq!(eval.outcome, ConsistencyOutcome::Silence);
        assert!(eval.abstained);
        assert!(eval.notes.contains(&EvaluationNote::DivergentAssertions));
    }

    #[test]
    fn test_page_size_is_not_a_status_code() {
        let eval = evaluate(
            ConditionBucket::Success,
            &[
                (ArtifactKind::Readme, "returns 200 with the user list"),
                (ArtifactKind::Test, "returns at most 100 users per page"),
            ],
        );
        assert_ne!(eval.outcome, ConsistencyOutcome::Contradiction);
        assert!(eval.notes.contains(&EvaluationNote::DivergentAssertions));
    }
}
