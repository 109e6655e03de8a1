//! Presentation-ready views derived from a result document
//!
//! Pure projections: they read a finished `ResultDocument` and never change
//! findings, outcomes, or the release signal.

use super::types::{ConsistencyOutcome, IdentityKey, ResultDocument, WarningTag};
use concord_common::claims::{ArtifactKind, HttpMethod};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-endpoint rollup of all behaviors found for one `METHOD path`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub method: HttpMethod,
    pub endpoint: String,
    pub behaviors: usize,
    pub contradictions: usize,
    pub silences: usize,
    pub reinforcements: usize,
    /// Worst outcome among the endpoint's findings
    pub most_severe: ConsistencyOutcome,
}

/// Behaviors lacking each kind of artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageView {
    pub without_readme: Vec<IdentityKey>,
    pub without_spec: Vec<IdentityKey>,
    pub without_tests: Vec<IdentityKey>,
    pub fully_covered: Vec<IdentityKey>,
}

/// A warning tag present in the run, how often, and what to do about it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecommendation {
    pub tag: WarningTag,
    pub findings: usize,
    pub actions: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayViews {
    pub endpoints: Vec<EndpointSummary>,
    pub coverage: CoverageView,
    pub recommendations: Vec<TagRecommendation>,
}

/// Suggested follow-up actions for a warning tag
pub fn recommendations(tag: WarningTag) -> &'static [&'static str] {
    match tag {
        WarningTag::Contradiction => &[
            "Decide which artifact states the intended behavior",
            "Align the other artifacts with it before release",
        ],
        WarningTag::AmbiguousCondition => &[
            "State the triggering condition explicitly in every artifact",
        ],
        WarningTag::MissingReadme => &["Document this behavior in the README"],
        WarningTag::MissingSpec => &["Describe this behavior in the API specification"],
        WarningTag::MissingTests => &["Add a test that asserts this behavior"],
        WarningTag::StatusVariants => &[
            "Pick one status code and use it consistently",
        ],
        WarningTag::DivergentAssertions => &[
            "Review the differing assertions; they may describe different behaviors",
        ],
        WarningTag::ImplementationOnly => &[
            "Tested but undocumented: add it to the README or API specification",
        ],
        WarningTag::DocumentationOnly => &[
            "Documented but untested: add a test before relying on it",
        ],
    }
}

pub fn build_views(doc: &ResultDocument) -> DisplayViews {
    DisplayViews {
        endpoints: endpoint_summaries(doc),
        coverage: coverage_view(doc),
        recommendations: tag_recommendations(doc),
    }
}

pub fn endpoint_summaries(doc: &ResultDocument) -> Vec<EndpointSummary> {
    let mut by_endpoint: BTreeMap<(String, HttpMethod), EndpointSummary> = BTreeMap::new();

    for finding in &doc.findings {
        let summary = by_endpoint
            .entry((finding.endpoint.clone(), finding.method))
            .or_insert_with(|| EndpointSummary {
                method: finding.method,
                endpoint: finding.endpoint.clone(),
                behaviors: 0,
                contradictions: 0,
                silences: 0,
                reinforcements: 0,
                most_severe: finding.outcome,
            });

        summary.behaviors += 1;
        match finding.outcome {
            ConsistencyOutcome::Contradiction => summary.contradictions += 1,
            ConsistencyOutcome::Silence => summary.silences += 1,
            ConsistencyOutcome::Reinforcement => summary.reinforcements += 1,
        }
        if finding.outcome.presentation_rank() < summary.most_severe.presentation_rank() {
            summary.most_severe = finding.outcome;
        }
    }

    by_endpoint.into_values().collect()
}

pub fn coverage_view(doc: &ResultDocument) -> CoverageView {
    let mut view = CoverageView::default();
    for finding in &doc.findings {
        let key = finding.key();
        let coverage = finding.source_coverage;
        for kind in coverage.missing() {
            let list = match kind {
                ArtifactKind::Readme => &mut view.without_readme,
                ArtifactKind::ApiSpec => &mut view.without_spec,
                ArtifactKind::Test => &mut view.without_tests,
            };
            list.push(key.clone());
        }
        if coverage.count() == ArtifactKind::ALL.len() {
            view.fully_covered.push(key);
        }
    }
    view
}

pub fn tag_recommendations(doc: &ResultDocument) -> Vec<TagRecommendation> {
    let mut counts: BTreeMap<WarningTag, usize> = BTreeMap::new();
    for tag in doc.findings.iter().flat_map(|f| f.warnings.iter()) {
        *counts.entry(*tag).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(tag, findings)| TagRecommendation {
            tag,
            findings,
            actions: recommendations(tag).to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Reconciler, RunMetadata};
    use concord_common::claims::{Confidence, LineRange, RawClaim, SourceRef};

    fn claim(artifact: ArtifactKind, endpoint: &str, condition: &str, assertion: &str) -> RawClaim {
        RawClaim {
            category: "ErrorSemantics".to_string(),
            endpoint: endpoint.to_string(),
            method: None,
            condition: condition.to_string(),
            assertion: assertion.to_string(),
            authority: None,
            source: SourceRef {
                artifact,
                file: "f".to_string(),
                lines: LineRange::single(1),
                excerpt: assertion.to_string(),
            },
            confidence: Confidence::High,
        }
    }

    fn sample() -> ResultDocument {
        Reconciler::default()
            .run(
                &RunMetadata::new(ArtifactKind::ALL),
                vec![
                    claim(ArtifactKind::Readme, "GET /users/1", "not found", "returns 200"),
                    claim(ArtifactKind::Test, "GET /users/2", "not found", "returns 404"),
                    claim(ArtifactKind::Readme, "GET /users/1", "on success", "returns 200"),
                    claim(ArtifactKind::ApiSpec, "GET /users/1", "on success", "returns 200"),
                    claim(ArtifactKind::Test, "GET /users/1", "on success", "returns 200"),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_endpoint_summary_rollup() {
        let summaries = endpoint_summaries(&sample());
        assert_eq!(summaries.len(), 1);
        let users = &summaries[0];
        assert_eq!(users.endpoint, "/users/{param}");
        assert_eq!(users.behaviors, 2);
        assert_eq!(users.contradictions, 1);
        assert_eq!(users.reinforcements, 1);
        assert_eq!(users.most_severe, ConsistencyOutcome::Contradiction);
    }

    #[test]
    fn test_coverage_view() {
        let view = coverage_view(&sample());
        assert_eq!(view.fully_covered.len(), 1);
        assert_eq!(view.without_spec.len(), 1);
        assert!(view.without_tests.is_empty());
    }

    #[test]
    fn test_every_tag_has_recommendations() {
        let doc = sample();
        let recs = tag_recommendations(&doc);
        assert!(recs.iter().any(|r| r.tag == WarningTag::Contradiction));
        assert!(recs.iter().all(|r| !r.actions.is_empty()));
    }
}
