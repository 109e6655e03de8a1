//! Claim reconciliation engine
//!
//! Cross-checks behavioral claims extracted from a README, an API spec, and a
//! test suite, and reports where they reinforce, contradict, or stay silent on
//! each other.
//!
//! # Pipeline
//!
//! - **Canonicalizer**: raw claim → canonical claim with an identity key, or rejection
//! - **Identity Matcher**: canonical claims → equivalence classes (exact key match)
//! - **Consistency Evaluator**: class → Reinforcement / Contradiction / Silence
//! - **Findings Builder**: evaluated class → finding with full evidence
//! - **Risk Aggregator**: findings → release-readiness signal
//!
//! [`Reconciler`] drives one run end to end.

pub mod canonicalizer;
pub mod consistency_evaluator;
pub mod findings_builder;
pub mod identity_matcher;
pub mod pipeline;
pub mod risk_aggregator;
pub mod types;
pub mod views;

pub use pipeline::{ReconcileConfig, Reconciler};
pub use types::{
    AnalysisRequest, ClaimInput, ConsistencyOutcome, Finding, RejectedClaim, RejectionReason,
    ResultDocument, RiskLevel, RunMetadata, SubmittedClaim, WarningTag,
};
