// Reconciliation data contracts
//
// The explicit contracts between the five engine stages:
//   RawClaim → CanonicalClaim → EquivalenceClass → Evaluation → Finding → ResultDocument
//
// Everything here is created fresh per run and owned by that run. Nothing is
// cached or shared between runs.

use concord_common::claims::{
    ArtifactKind, Authority, ClaimCategory, ConditionBucket, Confidence, HttpMethod, LineRange,
    RawClaim,
};
use concord_common::artifact::detect_artifact_kind;
use concord_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

// ============================================================================
// Canonicalizer Output
// ============================================================================

/// Grouping key: two claims describe the same behavior iff their keys are equal
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IdentityKey {
    /// Placeholder-normalized path, e.g. `/users/{param}`
    pub endpoint: String,
    pub method: HttpMethod,
    pub condition: ConditionBucket,
    pub category: ClaimCategory,
}

impl IdentityKey {
    /// A key whose condition could not be resolved
    pub fn is_low_precision(&self) -> bool {
        self.condition == ConditionBucket::Unknown
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {}",
            self.method, self.endpoint, self.condition, self.category
        )
    }
}

/// HTTP status class (first digit of the code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn of(code: u16) -> Option<Self> {
        match code / 100 {
            1 => Some(Self::Informational),
            2 => Some(Self::Success),
            3 => Some(Self::Redirection),
            4 => Some(Self::ClientError),
            5 => Some(Self::ServerError),
            _ => None,
        }
    }
}

/// The load-bearing part of an assertion
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeToken {
    /// An HTTP status code, kept verbatim, with the polarity of the claim
    Status { code: u16, negated: bool },
    /// A behavior statement with negations stripped out and recorded
    Stated { statement: String, negated: bool },
}

impl OutcomeToken {
    pub fn status_class(&self) -> Option<StatusClass> {
        match self {
            Self::Status { code, .. } => StatusClass::of(*code),
            Self::Stated { .. } => None,
        }
    }
}

impl fmt::Display for OutcomeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { code, negated: false } => write!(f, "HTTP {}", code),
            Self::Status { code, negated: true } => write!(f, "NOT HTTP {}", code),
            Self::Stated { statement, negated: false } => f.write_str(statement),
            Self::Stated { statement, negated: true } => write!(f, "NOT {}", statement),
        }
    }
}

/// Assertion text after normalization plus its outcome token
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedAssertion {
    /// Trimmed, lowercased, whitespace-collapsed assertion text
    pub text: String,
    pub outcome: OutcomeToken,
}

/// A claim in comparable form; immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalClaim {
    pub key: IdentityKey,
    pub assertion: NormalizedAssertion,
    pub authority: Authority,
    /// Every field of the original claim, untouched
    pub raw: RawClaim,
}

impl CanonicalClaim {
    pub fn artifact(&self) -> ArtifactKind {
        self.raw.source.artifact
    }

    pub fn confidence(&self) -> Confidence {
        self.raw.confidence
    }
}

/// Why a raw claim never entered the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    EmptyAssertion,
    EmptyEndpoint,
    UnrecognizedCategory(String),
    MissingMethod,
    UnrecognizedMethod(String),
    MalformedEndpoint(String),
    AuthorityMismatch {
        artifact: ArtifactKind,
        expected: Authority,
    },
    ArtifactNotSupplied(ArtifactKind),
    MissingSource,
    UnrecognizedArtifact(String),
    MissingConfidence,
    UnrecognizedConfidence(String),
    MalformedClaim(String),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAssertion => f.write_str("empty assertion"),
            Self::EmptyEndpoint => f.write_str("empty endpoint"),
            Self::UnrecognizedCategory(text) => write!(f, "unrecognized category: {}", text),
            Self::MissingMethod => f.write_str("missing http method"),
            Self::UnrecognizedMethod(text) => write!(f, "unrecognized http method: {}", text),
            Self::MalformedEndpoint(text) => write!(f, "malformed endpoint: {}", text),
            Self::AuthorityMismatch { artifact, expected } => write!(
                f,
                "authority mismatch: {} claims must be {}",
                artifact, expected
            ),
            Self::ArtifactNotSupplied(kind) => write!(f, "artifact not supplied to run: {}", kind),
            Self::MissingSource => f.write_str("missing source"),
            Self::UnrecognizedArtifact(text) => write!(f, "unrecognized artifact: {}", text),
            Self::MissingConfidence => f.write_str("missing confidence"),
            Self::UnrecognizedConfidence(text) => write!(f, "unrecognized confidence: {}", text),
            Self::MalformedClaim(text) => write!(f, "malformed claim: {}", text),
        }
    }
}

impl Serialize for RejectionReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonicalizer rejection, carrying the claim back so nothing is lost
#[derive(Debug, Clone)]
pub struct Rejection {
    pub claim: RawClaim,
    pub reason: RejectionReason,
}

/// Entry of the result document's `rejected_claims` list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedClaim {
    /// Position of the claim in the submitted sequence
    pub input_index: usize,
    pub reason: RejectionReason,
    pub claim: SubmittedClaim,
}

/// A rejected claim as it is echoed back: parsed when it could be, verbatim otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubmittedClaim {
    Parsed(RawClaim),
    Verbatim(serde_json::Value),
}

impl SubmittedClaim {
    pub fn parsed(&self) -> Option<&RawClaim> {
        match self {
            Self::Parsed(claim) => Some(claim),
            Self::Verbatim(_) => None,
        }
    }
}

/// One element of the submitted `claims` sequence
///
/// Elements are read one at a time. An element whose source or confidence
/// cannot be read is kept verbatim next to the reason, so it is rejected on
/// its own and the rest of the request still runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimInput {
    Parsed(RawClaim),
    Malformed {
        value: serde_json::Value,
        reason: RejectionReason,
    },
}

impl ClaimInput {
    pub fn from_value(value: serde_json::Value) -> Self {
        match RawClaim::deserialize(&value) {
            Ok(claim) => Self::Parsed(claim),
            Err(e) => {
                let reason = malformed_reason(&value, &e);
                Self::Malformed { value, reason }
            }
        }
    }

    pub fn parsed(&self) -> Option<&RawClaim> {
        match self {
            Self::Parsed(claim) => Some(claim),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<RawClaim> for ClaimInput {
    fn from(claim: RawClaim) -> Self {
        Self::Parsed(claim)
    }
}

impl<'de> Deserialize<'de> for ClaimInput {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from_value)
    }
}

impl Serialize for ClaimInput {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Parsed(claim) => claim.serialize(serializer),
            Self::Malformed { value, .. } => value.serialize(serializer),
        }
    }
}

/// Name the field that made an element unreadable, most specific first
fn malformed_reason(value: &serde_json::Value, error: &serde_json::Error) -> RejectionReason {
    use serde_json::Value;

    let Some(fields) = value.as_object() else {
        return RejectionReason::MalformedClaim(error.to_string());
    };
    match fields.get("source") {
        None | Some(Value::Null) => return RejectionReason::MissingSource,
        Some(source) => {
            if let Some(artifact) = source.get("artifact") {
                if ArtifactKind::deserialize(artifact).is_err() {
                    return RejectionReason::UnrecognizedArtifact(value_text(artifact));
                }
            }
        }
    }
    match fields.get("confidence") {
        None | Some(Value::Null) => RejectionReason::MissingConfidence,
        Some(confidence) if Confidence::deserialize(confidence).is_err() => {
            RejectionReason::UnrecognizedConfidence(value_text(confidence))
        }
        Some(_) => RejectionReason::MalformedClaim(error.to_string()),
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

// ============================================================================
// Identity Matcher Output
// ============================================================================

/// All canonical claims sharing one identity key
///
/// Invariant: never empty, and every member carries the class key. Members are
/// kept in evidence order so the class looks the same whatever order the
/// claims arrived in.
#[derive(Debug, Clone)]
pub struct EquivalenceClass {
    key: IdentityKey,
    members: Vec<CanonicalClaim>,
}

impl EquivalenceClass {
    pub fn new(key: IdentityKey, mut members: Vec<CanonicalClaim>) -> Result<Self> {
        if members.is_empty() {
            return Err(Error::Invariant(format!(
                "equivalence class {} has no members",
                key
            )));
        }
        if let Some(stray) = members.iter().find(|m| m.key != key) {
            return Err(Error::Invariant(format!(
                "claim keyed {} grouped under {}",
                stray.key, key
            )));
        }

        members.sort_by(|a, b| {
            a.raw
                .source
                .cmp(&b.raw.source)
                .then_with(|| a.raw.cmp(&b.raw))
        });

        Ok(Self { key, members })
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn members(&self) -> &[CanonicalClaim] {
        &self.members
    }

    pub fn into_members(self) -> Vec<CanonicalClaim> {
        self.members
    }

    pub fn low_precision(&self) -> bool {
        self.key.is_low_precision()
    }

    /// Distinct artifact kinds asserting this behavior
    pub fn artifacts(&self) -> BTreeSet<ArtifactKind> {
        self.members.iter().map(CanonicalClaim::artifact).collect()
    }
}

// ============================================================================
// Consistency Evaluator Output
// ============================================================================

/// The three mutually exclusive consistency outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConsistencyOutcome {
    Reinforcement,
    Contradiction,
    Silence,
}

impl ConsistencyOutcome {
    /// Presentation rank: contradictions, then silences, then reinforcements
    pub fn presentation_rank(self) -> u8 {
        match self {
            Self::Contradiction => 0,
            Self::Silence => 1,
            Self::Reinforcement => 2,
        }
    }
}

impl fmt::Display for ConsistencyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Side observations the evaluator records next to the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvaluationNote {
    /// The condition is unresolved (`unknown` bucket)
    AmbiguousCondition,
    /// Same-class status codes differ and policy said warn
    StatusVariants,
    /// Assertions differ without being comparable as opposites
    DivergentAssertions,
}

/// Evaluator verdict for one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub outcome: ConsistencyOutcome,
    /// True when a would-be verdict was withheld and Silence reported instead
    pub abstained: bool,
    pub notes: BTreeSet<EvaluationNote>,
}

// ============================================================================
// Findings Builder Output
// ============================================================================

/// Structural warning tags attached to findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningTag {
    Contradiction,
    AmbiguousCondition,
    MissingReadme,
    MissingSpec,
    MissingTests,
    StatusVariants,
    DivergentAssertions,
    ImplementationOnly,
    DocumentationOnly,
}

impl WarningTag {
    /// Tag raised when the given artifact kind does not assert a behavior
    pub fn missing(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Readme => Self::MissingReadme,
            ArtifactKind::ApiSpec => Self::MissingSpec,
            ArtifactKind::Test => Self::MissingTests,
        }
    }
}

/// One distinct normalized assertion and who made it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionGroup {
    pub assertion: String,
    pub outcome: String,
    pub artifacts: Vec<ArtifactKind>,
}

/// Which artifact kinds assert a behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceCoverage {
    pub readme: bool,
    pub api_spec: bool,
    pub test: bool,
}

impl SourceCoverage {
    pub fn from_artifacts(artifacts: &BTreeSet<ArtifactKind>) -> Self {
        Self {
            readme: artifacts.contains(&ArtifactKind::Readme),
            api_spec: artifacts.contains(&ArtifactKind::ApiSpec),
            test: artifacts.contains(&ArtifactKind::Test),
        }
    }

    pub fn contains(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::Readme => self.readme,
            ArtifactKind::ApiSpec => self.api_spec,
            ArtifactKind::Test => self.test,
        }
    }

    pub fn count(&self) -> usize {
        ArtifactKind::ALL.iter().filter(|k| self.contains(**k)).count()
    }

    pub fn missing(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|k| !self.contains(*k))
            .collect()
    }
}

/// Verbatim evidence of one member claim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimEvidence {
    pub artifact: ArtifactKind,
    pub file: String,
    pub lines: LineRange,
    pub excerpt: String,
    /// Endpoint exactly as the source wrote it
    pub endpoint: String,
    pub condition: String,
    pub assertion: String,
    pub authority: Authority,
    pub confidence: Confidence,
}

/// Presentable unit: one class, its outcome, and all of its evidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub endpoint: String,
    pub method: HttpMethod,
    pub condition: ConditionBucket,
    pub category: ClaimCategory,
    pub outcome: ConsistencyOutcome,
    pub low_precision: bool,
    pub assertions: Vec<AssertionGroup>,
    pub source_coverage: SourceCoverage,
    /// Advisory only: represented artifact kinds / all artifact kinds
    pub coverage_score: f64,
    /// Advisory only: lowest member confidence
    pub confidence_score: Confidence,
    pub warnings: Vec<WarningTag>,
    pub evidence: Vec<ClaimEvidence>,
}

impl Finding {
    pub fn key(&self) -> IdentityKey {
        IdentityKey {
            endpoint: self.endpoint.clone(),
            method: self.method,
            condition: self.condition,
            category: self.category,
        }
    }

    pub fn has_warning(&self, tag: WarningTag) -> bool {
        self.warnings.contains(&tag)
    }
}

// ============================================================================
// Risk Aggregator Output
// ============================================================================

/// Release-readiness risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Aggregated verdict for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSignal {
    pub level: RiskLevel,
    pub contradictions: usize,
    pub silences: usize,
    pub reinforcements: usize,
}

/// `summary_counts` block of the result document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SummaryCounts {
    pub contradictions: usize,
    pub silences: usize,
    pub reinforcements: usize,
    pub rejected_claims: usize,
}

// ============================================================================
// Run Boundary
// ============================================================================

/// The single output document of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDocument {
    pub release_signal: RiskLevel,
    pub summary_counts: SummaryCounts,
    pub findings: Vec<Finding>,
    pub rejected_claims: Vec<RejectedClaim>,
}

/// Which artifact kinds the ingest side supplied to this run
///
/// Claims from kinds outside this set are rejected; kinds absent from it show
/// up as MISSING_* warnings on every finding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunMetadata {
    supplied: BTreeSet<ArtifactKind>,
}

impl RunMetadata {
    pub fn new(kinds: impl IntoIterator<Item = ArtifactKind>) -> Self {
        Self {
            supplied: kinds.into_iter().collect(),
        }
    }

    /// Detect supplied kinds from artifact file names; unrecognized names are skipped
    pub fn from_files<S: AsRef<str>>(files: &[S]) -> Self {
        let mut supplied = BTreeSet::new();
        for file in files {
            let name: &str = file.as_ref();
            match detect_artifact_kind(name) {
                Some(kind) => {
                    supplied.insert(kind);
                }
                None => warn!("Unrecognized artifact file skipped: {}", name),
            }
        }
        Self { supplied }
    }

    /// Fallback when the caller names no artifacts: trust the kinds the claims carry
    pub fn inferred_from<'a>(claims: impl IntoIterator<Item = &'a RawClaim>) -> Self {
        Self::new(claims.into_iter().map(|c| c.source.artifact))
    }

    pub fn is_supplied(&self, kind: ArtifactKind) -> bool {
        self.supplied.contains(&kind)
    }

    pub fn supplied(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        self.supplied.iter().copied()
    }

    /// Kinds of the artifact universe that were not supplied
    pub fn missing(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|k| !self.supplied.contains(k))
            .collect()
    }
}

/// Request shape accepted by the CLI and the HTTP API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisRequest {
    /// Artifact kinds the ingest side actually supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplied_artifacts: Option<Vec<ArtifactKind>>,

    /// File names the ingest side received (kinds are detected from them)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifact_files: Vec<String>,

    #[serde(default)]
    pub claims: Vec<ClaimInput>,
}

impl AnalysisRequest {
    /// Parse a JSON request; a body that is not a request at all is invalid input
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_slice(text.as_bytes())
    }

    /// Parse a JSON request body as received over HTTP
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::InvalidInput(format!("Malformed analysis request: {}", e)))
    }

    /// Run metadata: explicit kinds plus detected file kinds, else inferred from claims
    pub fn run_metadata(&self) -> RunMetadata {
        let mut supplied: BTreeSet<ArtifactKind> = self
            .supplied_artifacts
            .iter()
            .flatten()
            .copied()
            .collect();
        supplied.extend(RunMetadata::from_files(&self.artifact_files).supplied());

        if self.supplied_artifacts.is_none() && self.artifact_files.is_empty() {
            warn!("No supplied artifacts named; inferring them from the claims");
            return RunMetadata::inferred_from(self.claims.iter().filter_map(ClaimInput::parsed));
        }
        RunMetadata { supplied }
    }
}
