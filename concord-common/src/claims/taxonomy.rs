//! Closed taxonomy shared by every stage of a reconciliation run

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of behavior a claim talks about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClaimCategory {
    EndpointExistence,
    InputPrecondition,
    OutputGuarantee,
    ErrorSemantics,
    Idempotency,
}

impl ClaimCategory {
    pub const ALL: [ClaimCategory; 5] = [
        Self::EndpointExistence,
        Self::InputPrecondition,
        Self::OutputGuarantee,
        Self::ErrorSemantics,
        Self::Idempotency,
    ];

    /// Parse the category text an extractor produced
    ///
    /// Accepts the PascalCase name, the snake_case name, and the legacy
    /// `endpoint_exists` spelling. Surrounding whitespace and case are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let folded: String = text
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "endpointexistence" | "endpointexists" => Some(Self::EndpointExistence),
            "inputprecondition" => Some(Self::InputPrecondition),
            "outputguarantee" => Some(Self::OutputGuarantee),
            "errorsemantics" => Some(Self::ErrorSemantics),
            "idempotency" => Some(Self::Idempotency),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which artifact a claim was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    #[serde(rename = "README", alias = "readme")]
    Readme,
    #[serde(rename = "API_SPEC", alias = "api_spec")]
    ApiSpec,
    #[serde(rename = "TEST", alias = "test")]
    Test,
}

impl ArtifactKind {
    /// The full artifact universe; coverage is always measured against it
    pub const ALL: [ArtifactKind; 3] = [Self::Readme, Self::ApiSpec, Self::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Readme => "README",
            Self::ApiSpec => "API_SPEC",
            Self::Test => "TEST",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust tier of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    Informal,
    Formal,
    Enforced,
}

impl Authority {
    /// README is informal, the API spec is formal, tests are enforced
    pub fn for_artifact(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Readme => Self::Informal,
            ArtifactKind::ApiSpec => Self::Formal,
            ArtifactKind::Test => Self::Enforced,
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Informal => "informal",
            Self::Formal => "formal",
            Self::Enforced => "enforced",
        };
        f.write_str(name)
    }
}

/// Extraction confidence; ordered so `min` is the conservative combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// HTTP method of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse of a method token
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed set of triggering-circumstance buckets
///
/// `Unknown` is the total fallback: condition mapping never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionBucket {
    Success,
    NotFound,
    Unauthenticated,
    InvalidInput,
    Conflict,
    Unknown,
}

impl fmt::Display for ConditionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_accepts_spellings() {
        assert_eq!(ClaimCategory::parse("ErrorSemantics"), Some(ClaimCategory::ErrorSemantics));
        assert_eq!(ClaimCategory::parse("error_semantics"), Some(ClaimCategory::ErrorSemantics));
        assert_eq!(ClaimCategory::parse("  Idempotency "), Some(ClaimCategory::Idempotency));
        assert_eq!(
            ClaimCategory::parse("endpoint_exists"),
            Some(ClaimCategory::EndpointExistence)
        );
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        assert_eq!(ClaimCategory::parse("performance"), None);
        assert_eq!(ClaimCategory::parse(""), None);
    }

    #[test]
    fn test_authority_follows_artifact() {
        assert_eq!(Authority::for_artifact(ArtifactKind::Readme), Authority::Informal);
        assert_eq!(Authority::for_artifact(ArtifactKind::ApiSpec), Authority::Formal);
        assert_eq!(Authority::for_artifact(ArtifactKind::Test), Authority::Enforced);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn test_artifact_kind_wire_names() {
        assert_eq!(serde_json::to_string(&ArtifactKind::ApiSpec).unwrap(), "\"API_SPEC\"");
        let kind: ArtifactKind = serde_json::from_str("\"readme\"").unwrap();
        assert_eq!(kind, ArtifactKind::Readme);
    }

    #[test]
    fn test_condition_bucket_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConditionBucket::NotFound).unwrap(),
            "\"not_found\""
        );
        assert_eq!(ConditionBucket::InvalidInput.to_string(), "invalid_input");
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("DELETE"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("FETCH"), None);
    }
}
