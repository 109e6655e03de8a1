// Reconciliation pipeline
//
// Concept: Run the five stages over one submitted claim set
// Synchronization: Accepts (RunMetadata, Vec<ClaimInput>), outputs ResultDocument
//
// Each run builds its own stage instances from explicit configuration and
// owns all intermediate data. Two runs never share mutable state, so any
// number of runs may execute concurrently.
//
// Rejections are recovered locally and listed in the output, including
// elements that could not be read as claims at all. An invariant
// violation aborts the run with an error; no partial document is produced.

use super::canonicalizer::{Canonicalizer, ConditionRules};
use super::consistency_evaluator::ConsistencyEvaluator;
use super::findings_builder::FindingsBuilder;
use super::identity_matcher::IdentityMatcher;
use super::risk_aggregator::RiskAggregator;
use super::types::{
    AnalysisRequest, ClaimInput, RejectedClaim, ResultDocument, RunMetadata, SubmittedClaim,
    SummaryCounts,
};
use concord_common::claims::RawClaim;
use concord_common::config::EvaluationPolicy;
use concord_common::{Error, Result};
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Explicit configuration of a run
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
    pub policy: EvaluationPolicy,
    pub rules: ConditionRules,
}

impl ReconcileConfig {
    pub fn with_policy(policy: EvaluationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

/// Entry point of the reconciliation engine
///
/// **Legible Software Principle:** one call, one run, one document. The
/// reconciler holds configuration only; it is safe to share and reuse.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Analyze a request as received by the CLI or the HTTP API
    pub fn analyze(&self, request: AnalysisRequest) -> Result<ResultDocument> {
        let run = request.run_metadata();
        self.run_inputs(&run, request.claims)
    }

    /// Execute one analysis run over claims that are already readable
    pub fn run(&self, run: &RunMetadata, claims: Vec<RawClaim>) -> Result<ResultDocument> {
        self.run_inputs(run, claims.into_iter().map(ClaimInput::from).collect())
    }

    /// Execute one analysis run over submitted elements, unreadable ones included
    pub fn run_inputs(&self, run: &RunMetadata, claims: Vec<ClaimInput>) -> Result<ResultDocument> {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconcile", %run_id);
        let _guard = span.enter();

        let submitted = claims.len();
        let supplied: Vec<_> = run.supplied().collect();
        info!(claims = submitted, ?supplied, "Starting reconciliation run");

        // Stage 1: canonicalize or reject
        let canonicalizer = Canonicalizer::new(&self.config.rules, run);
        let mut accepted = Vec::with_capacity(submitted);
        let mut rejected_claims = Vec::new();
        for (input_index, input) in claims.into_iter().enumerate() {
            let (reason, claim) = match input {
                ClaimInput::Parsed(raw) => match canonicalizer.canonicalize(raw) {
                    Ok(canonical) => {
                        accepted.push(canonical);
                        continue;
                    }
                    Err(rejection) => (rejection.reason, SubmittedClaim::Parsed(rejection.claim)),
                },
                ClaimInput::Malformed { value, reason } => (reason, SubmittedClaim::Verbatim(value)),
            };
            warn!(input_index, reason = %reason, "Claim rejected");
            rejected_claims.push(RejectedClaim {
                input_index,
                reason,
                claim,
            });
        }
        let accepted_count = accepted.len();

        // Stage 2: group
        let classes = IdentityMatcher::group(accepted).into_classes()?;

        // Stages 3 and 4: evaluate and build findings
        let evaluator = ConsistencyEvaluator::new(self.config.policy);
        let builder = FindingsBuilder::new(run);
        let mut findings: Vec<_> = classes
            .into_iter()
            .map(|class| {
                let evaluation = evaluator.evaluate(&class);
                builder.build(class, &evaluation)
            })
            .collect();

        // Every accepted claim must surface in exactly one finding
        let evidenced: usize = findings.iter().map(|f| f.evidence.len()).sum();
        if evidenced != accepted_count {
            return Err(Error::Invariant(format!(
                "{} accepted claims but {} carried as evidence",
                accepted_count, evidenced
            )));
        }
        if accepted_count + rejected_claims.len() != submitted {
            return Err(Error::Invariant(format!(
                "{} claims submitted but {} accepted and {} rejected",
                submitted,
                accepted_count,
                rejected_claims.len()
            )));
        }

        findings.sort_by(|a, b| {
            a.outcome
                .presentation_rank()
                .cmp(&b.outcome.presentation_rank())
                .then_with(|| a.key().cmp(&b.key()))
        });

        // Stage 5: aggregate
        let signal = RiskAggregator::aggregate(&findings);

        info!(
            findings = findings.len(),
            rejected = rejected_claims.len(),
            "Reconciliation run complete"
        );

        Ok(ResultDocument {
            release_signal: signal.level,
            summary_counts: SummaryCounts {
                contradictions: signal.contradictions,
                silences: signal.silences,
                reinforcements: signal.reinforcements,
                rejected_claims: rejected_claims.len(),
            },
            findings,
            rejected_claims,
        })
    }
}
