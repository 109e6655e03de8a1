// Stage 4: Findings Builder
//
// Concept: Turn an evaluated class into a self-contained, presentable Finding
// Synchronization: Accepts (EquivalenceClass, Evaluation), outputs Finding
//
// Every member claim's evidence is carried verbatim: no truncation, no
// summarization, no dropped members. Scores are advisory and never feed the
// consistency outcome or the release signal.

use super::types::{
    AssertionGroup, ClaimEvidence, ConsistencyOutcome, EquivalenceClass, Evaluation,
    EvaluationNote, Finding, SourceCoverage, WarningTag,
};
use super::RunMetadata;
use concord_common::claims::{ArtifactKind, Confidence};
use std::collections::{BTreeMap, BTreeSet};

/// Stage 4 of the pipeline
pub struct FindingsBuilder<'a> {
    run: &'a RunMetadata,
}

impl<'a> FindingsBuilder<'a> {
    pub fn new(run: &'a RunMetadata) -> Self {
        Self { run }
    }

    pub fn build(&self, class: EquivalenceClass, evaluation: &Evaluation) -> Finding {
        let key = class.key().clone();
        let low_precision = class.low_precision();
        let artifacts = class.artifacts();
        let coverage = SourceCoverage::from_artifacts(&artifacts);
        let warnings = self.warnings(&artifacts, evaluation);

        let members = class.into_members();

        // Distinct normalized assertions, each with the kinds asserting it
        let mut groups: BTreeMap<&str, (String, BTreeSet<ArtifactKind>)> = BTreeMap::new();
        for member in &members {
            groups
                .entry(member.assertion.text.as_str())
                .or_insert_with(|| (member.assertion.outcome.to_string(), BTreeSet::new()))
                .1
                .insert(member.artifact());
        }
        let assertions = groups
            .into_iter()
            .map(|(text, (outcome, kinds))| AssertionGroup {
                assertion: text.to_string(),
                outcome,
                artifacts: kinds.into_iter().collect(),
            })
            .collect();

        let confidence_score = members
            .iter()
            .map(|m| m.confidence())
            .min()
            .unwrap_or(Confidence::Low);

        let evidence = members
            .into_iter()
            .map(|m| ClaimEvidence {
                artifact: m.raw.source.artifact,
                file: m.raw.source.file,
                lines: m.raw.source.lines,
                excerpt: m.raw.source.excerpt,
                endpoint: m.raw.endpoint,
                condition: m.raw.condition,
                assertion: m.raw.assertion,
                authority: m.authority,
                confidence: m.raw.confidence,
            })
            .collect();

        Finding {
            endpoint: key.endpoint,
            method: key.method,
            condition: key.condition,
            category: key.category,
            outcome: evaluation.outcome,
            low_precision,
            assertions,
            source_coverage: coverage,
            coverage_score: coverage.count() as f64 / ArtifactKind::ALL.len() as f64,
            confidence_score,
            warnings,
            evidence,
        }
    }

    /// Structural warnings, sorted and deduplicated
    fn warnings(
        &self,
        artifacts: &BTreeSet<ArtifactKind>,
        evaluation: &Evaluation,
    ) -> Vec<WarningTag> {
        let mut tags = BTreeSet::new();

        if evaluation.outcome == ConsistencyOutcome::Contradiction {
            tags.insert(WarningTag::Contradiction);
        }
        for note in &evaluation.notes {
            tags.insert(match note {
                EvaluationNote::AmbiguousCondition => WarningTag::AmbiguousCondition,
                EvaluationNote::StatusVariants => WarningTag::StatusVariants,
                EvaluationNote::DivergentAssertions => WarningTag::DivergentAssertions,
            });
        }

        // Kinds absent from this class; a kind absent from the run is absent everywhere
        for kind in ArtifactKind::ALL {
            if !artifacts.contains(&kind) || !self.run.is_supplied(kind) {
                tags.insert(WarningTag::missing(kind));
            }
        }

        let has_test = artifacts.contains(&ArtifactKind::Test);
        let has_docs = artifacts.contains(&ArtifactKind::Readme)
            || artifacts.contains(&ArtifactKind::ApiSpec);
        if has_test && !has_docs {
            tags.insert(WarningTag::ImplementationOnly);
        }
        if has_docs && !has_test {
            tags.insert(WarningTag::DocumentationOnly);
        }

        tags.into_iter().collect()
    }
}
