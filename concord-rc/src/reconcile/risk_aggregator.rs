// Stage 5: Risk Aggregator
//
// Concept: Reduce the full findings set to one release-readiness signal
// Synchronization: Accepts &[Finding], outputs ReleaseSignal
//
// Ordered rules, first match wins:
//   any Contradiction                     → High
//   MODERATE_SILENCE_THRESHOLD+ Silences  → Moderate
//   otherwise                             → Low
//
// Thresholds are fixed constants. Coverage and confidence scores are never read.

use super::types::{ConsistencyOutcome, Finding, ReleaseSignal, RiskLevel};
use tracing::info;

/// Silence findings needed for a Moderate signal
pub const MODERATE_SILENCE_THRESHOLD: usize = 2;

/// Stage 5 of the pipeline
pub struct RiskAggregator;

impl RiskAggregator {
    pub fn aggregate(findings: &[Finding]) -> ReleaseSignal {
        let count = |outcome: ConsistencyOutcome| {
            findings.iter().filter(|f| f.outcome == outcome).count()
        };
        let contradictions = count(ConsistencyOutcome::Contradiction);
        let silences = count(ConsistencyOutcome::Silence);
        let reinforcements = count(ConsistencyOutcome::Reinforcement);

        let level = if contradictions > 0 {
            RiskLevel::High
        } else if silences >= MODERATE_SILENCE_THRESHOLD {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        };

        info!(
            ?level,
            contradictions, silences, reinforcements, "Release signal computed"
        );

        ReleaseSignal {
            level,
            contradictions,
            silences,
            reinforcements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::types::SourceCoverage;
    use concord_common::claims::{ClaimCategory, ConditionBucket, Confidence, HttpMethod};

    fn finding(outcome: ConsistencyOutcome) -> Finding {
        Finding {
            endpoint: "/x".to_string(),
            method: HttpMethod::Get,
            condition: ConditionBucket::Success,
            category: ClaimCategory::OutputGuarantee,
            outcome,
            low_precision: false,
            assertions: vec![],
            source_coverage: SourceCoverage::default(),
            coverage_score: 0.0,
            confidence_score: Confidence::Low,
            warnings: vec![],
            evidence: vec![],
        }
    }

    fn level(outcomes: &[ConsistencyOutcome]) -> RiskLevel {
        let findings: Vec<Finding> = outcomes.iter().copied().map(finding).collect();
        RiskAggregator::aggregate(&findings).level
    }

    #[test]
    fn test_empty_findings_is_low() {
        assert_eq!(level(&[]), RiskLevel::Low);
    }

    #[test]
    fn test_silence_threshold() {
        use ConsistencyOutcome::*;
        assert_eq!(level(&[Silence, Reinforcement]), RiskLevel::Low);
        assert_eq!(level(&[Silence, Silence]), RiskLevel::Moderate);
        assert_eq!(level(&[Reinforcement, Reinforcement, Reinforcement]), RiskLevel::Low);
    }

    #[test]
    fn test_any_contradiction_is_high() {
        use ConsistencyOutcome::*;
        assert_eq!(level(&[Contradiction]), RiskLevel::High);
        assert_eq!(
            level(&[Reinforcement, Silence, Silence, Silence, Contradiction]),
            RiskLevel::High
        );
    }

    #[test]
    fn test_counts() {
        use ConsistencyOutcome::*;
        let findings: Vec<Finding> = [Contradiction, Silence, Reinforcement, Reinforcement]
            .into_iter()
            .map(finding)
            .collect();
        let signal = RiskAggregator::aggregate(&findings);
        assert_eq!(signal.contradictions, 1);
        assert_eq!(signal.silences, 1);
        assert_eq!(signal.reinforcements, 2);
    }
}
