//! Raw claims as handed over by the extraction collaborator

use serde::{Deserialize, Serialize};
use std::fmt;

use super::taxonomy::{ArtifactKind, Authority, Confidence};

/// 1-based inclusive line span inside a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn single(line: u32) -> Self {
        Self { start: line, end: line }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "line {}", self.start)
        } else {
            write!(f, "lines {}-{}", self.start, self.end)
        }
    }
}

/// Verbatim evidence anchoring a claim to its artifact
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Artifact kind the claim was extracted from
    pub artifact: ArtifactKind,
    /// Path of the file inside the analyzed repository
    pub file: String,
    /// Where in the file the excerpt lives
    pub lines: LineRange,
    /// Exact source text; never truncated or paraphrased
    pub excerpt: String,
}

/// One behavioral assertion, not yet canonicalized
///
/// Text fields default to empty so that a claim with missing fields still
/// deserializes and gets rejected with a reason instead of failing the whole
/// request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawClaim {
    /// Category name as produced by extraction (parsed into `ClaimCategory`)
    #[serde(default)]
    pub category: String,

    /// Endpoint as asserted, e.g. `GET /users/123`
    #[serde(default)]
    pub endpoint: String,

    /// HTTP method, when the endpoint text does not carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Triggering circumstance, e.g. "user not found" (may be empty)
    #[serde(default)]
    pub condition: String,

    /// The behavioral statement, e.g. "returns HTTP 404"
    #[serde(default)]
    pub assertion: String,

    pub source: SourceRef,

    /// Trust tier; derived from the artifact when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<Authority>,

    /// Extraction confidence; the engine never upgrades it
    pub confidence: Confidence,
}

impl RawClaim {
    /// Authority the claim carries, falling back to its artifact's tier
    pub fn effective_authority(&self) -> Authority {
        self.authority
            .unwrap_or_else(|| Authority::for_artifact(self.source.artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_text_fields_deserialize_empty() {
        let json = r#"{
            "source": {
                "artifact": "TEST",
                "file": "tests/test_users.py",
                "lines": { "start": 10, "end": 12 },
                "excerpt": "assert r.status_code == 404"
            },
            "confidence": "high"
        }"#;
        let claim: RawClaim = serde_json::from_str(json).unwrap();
        assert!(claim.assertion.is_empty());
        assert!(claim.category.is_empty());
        assert_eq!(claim.effective_authority(), Authority::Enforced);
    }

    #[test]
    fn test_line_range_display() {
        assert_eq!(LineRange::single(7).to_string(), "line 7");
        assert_eq!(LineRange::new(3, 9).to_string(), "lines 3-9");
    }
}
