// Stage 1: Canonicalizer
//
// Concept: Turn each raw claim into a canonical claim with a stable identity key,
//          or reject it with a reason. Never guesses a different behavior.
// Synchronization: Accepts RawClaim, outputs CanonicalClaim | Rejection
//
// Algorithm:
// 1. Validate assertion and category
// 2. Split the endpoint into HTTP method and path; normalize path parameters
// 3. Map the condition text to a bucket via the ordered condition rules
// 4. Normalize the assertion and extract its outcome token
// 5. Check the claim's artifact was supplied and its authority matches the artifact

use super::types::{
    CanonicalClaim, IdentityKey, NormalizedAssertion, OutcomeToken, Rejection, RejectionReason,
    RunMetadata,
};
use concord_common::claims::{
    Authority, ClaimCategory, ConditionBucket, HttpMethod, RawClaim,
};
use tracing::debug;

/// Placeholder substituted for every parameter-like path segment
pub const PARAM_PLACEHOLDER: &str = "{param}";

/// Words that flip the polarity of a stated assertion
const NEGATION_WORDS: &[&str] = &[
    "not", "never", "no", "non", "cannot", "can't", "doesn't", "don't", "isn't", "aren't",
    "won't", "shouldn't", "mustn't",
];

/// Words that put a following number in status position ("returns 404", "status == 404")
const STATUS_CUE_WORDS: &[&str] = &[
    "status", "http", "code", "response", "return", "returns", "returned", "returning",
    "respond", "responds", "responded", "responding", "assert", "asserts", "asserted", "expect",
    "expects", "expected", "equal", "equals", "fail", "fails", "raise", "raises", "yields",
    "==", "!=",
];

/// Words allowed between a status cue and the code
const STATUS_SKIP_WORDS: &[&str] = &[
    "a", "an", "the", "with", "is", "be", "of", "to", "are", "was", "should", "must", "will",
];

/// Reason phrases that mark a number as a status code wherever it appears ("404 not found")
const REASON_PHRASES: &[(u16, &str)] = &[
    (100, "continue"),
    (200, "ok"),
    (201, "created"),
    (202, "accepted"),
    (204, "no content"),
    (301, "moved permanently"),
    (302, "found"),
    (304, "not modified"),
    (400, "bad request"),
    (401, "unauthorized"),
    (403, "forbidden"),
    (404, "not found"),
    (405, "method not allowed"),
    (409, "conflict"),
    (410, "gone"),
    (415, "unsupported media type"),
    (422, "unprocessable entity"),
    (429, "too many requests"),
    (500, "internal server error"),
    (502, "bad gateway"),
    (503, "service unavailable"),
    (504, "gateway timeout"),
];

/// Filler dropped from statements so that phrasing differences do not split groups
const FILLER_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "be", "it", "its", "this", "that", "does", "do", "should",
    "must", "will", "always", "to",
];

// ============================================================================
// Condition Rules
// ============================================================================

/// One entry of the ordered condition rule table
#[derive(Debug, Clone)]
pub struct ConditionRule {
    pub bucket: ConditionBucket,
    /// Any matching phrase selects the bucket
    pub phrases: Vec<&'static str>,
    /// Any matching phrase vetoes the rule
    pub excluded: Vec<&'static str>,
}

impl ConditionRule {
    fn matches(&self, words: &[String]) -> bool {
        self.phrases.iter().any(|p| contains_phrase(words, p))
            && !self.excluded.iter().any(|p| contains_phrase(words, p))
    }
}

/// Ordered first-match condition rules
///
/// **Legible Software Principle:** one explicit table, evaluated top to bottom.
/// The first rule that matches wins; no match maps to `unknown`.
#[derive(Debug, Clone)]
pub struct ConditionRules {
    rules: Vec<ConditionRule>,
}

impl ConditionRules {
    pub fn new(rules: Vec<ConditionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ConditionRule] {
        &self.rules
    }

    /// Map free-text condition to its bucket
    pub fn classify(&self, condition: &str) -> ConditionBucket {
        let words = words(condition);
        if words.is_empty() {
            return ConditionBucket::Unknown;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(&words))
            .map(|rule| rule.bucket)
            .unwrap_or(ConditionBucket::Unknown)
    }
}

impl Default for ConditionRules {
    fn default() -> Self {
        Self::new(vec![
            ConditionRule {
                bucket: ConditionBucket::NotFound,
                phrases: vec![
                    "not found",
                    "404",
                    "does not exist",
                    "doesn't exist",
                    "do not exist",
                    "nonexistent",
                    "non existent",
                    "no such",
                    "unknown id",
                ],
                excluded: vec![],
            },
            ConditionRule {
                bucket: ConditionBucket::Unauthenticated,
                phrases: vec![
                    "unauthorized",
                    "unauthenticated",
                    "401",
                    "must authenticate",
                    "not authenticated",
                    "not logged in",
                    "without authentication",
                    "without credentials",
                    "no credentials",
                    "missing token",
                    "no token",
                    "without token",
                    "invalid token",
                    "expired token",
                ],
                excluded: vec![],
            },
            ConditionRule {
                bucket: ConditionBucket::InvalidInput,
                phrases: vec![
                    "invalid",
                    "malformed",
                    "400",
                    "422",
                    "bad request",
                    "validation",
                    "missing required",
                    "required field",
                    "wrong type",
                ],
                excluded: vec![],
            },
            ConditionRule {
                bucket: ConditionBucket::Conflict,
                phrases: vec![
                    "already exists",
                    "409",
                    "conflict",
                    "conflicts",
                    "duplicate",
                    "already taken",
                    "already registered",
                ],
                excluded: vec![],
            },
            ConditionRule {
                bucket: ConditionBucket::Success,
                phrases: vec![
                    "success",
                    "successful",
                    "successfully",
                    "succeeds",
                    "succeed",
                    "ok",
                    "created",
                    "exists",
                    "valid",
                    "200",
                    "201",
                    "202",
                    "204",
                    "happy path",
                ],
                excluded: vec![
                    "error", "fail", "fails", "failure", "not", "missing", "forbidden",
                    "denied", "500",
                ],
            },
        ])
    }
}

/// Lowercased word tokens; apostrophes stay inside words
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if the phrase's words appear contiguously in `words`
fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

// ============================================================================
// Endpoint Canonicalization
// ============================================================================

/// Method and placeholder-normalized path of a claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEndpoint {
    pub method: HttpMethod,
    pub path: String,
}

/// Split `METHOD /path` into method and canonical path
///
/// The method may come from the endpoint text or from the separate `method`
/// hint; the endpoint text wins when both are present. Full URLs lose their
/// scheme and host; query strings and fragments are dropped.
pub fn canonicalize_endpoint(
    endpoint: &str,
    method_hint: Option<&str>,
) -> Result<CanonicalEndpoint, RejectionReason> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(RejectionReason::EmptyEndpoint);
    }

    let (method_token, path_text) = match endpoint.split_once(char::is_whitespace) {
        Some((first, rest)) if !looks_like_path(first) => (Some(first), rest.trim()),
        _ if !looks_like_path(endpoint) => {
            // Bare word with no path after it
            return match HttpMethod::parse(endpoint) {
                Some(_) => Err(RejectionReason::EmptyEndpoint),
                None => Err(RejectionReason::MalformedEndpoint(endpoint.to_string())),
            };
        }
        _ => (None, endpoint),
    };

    let method = match method_token {
        Some(token) => HttpMethod::parse(token)
            .ok_or_else(|| RejectionReason::UnrecognizedMethod(token.to_string()))?,
        None => match method_hint.map(str::trim).filter(|m| !m.is_empty()) {
            Some(hint) => HttpMethod::parse(hint)
                .ok_or_else(|| RejectionReason::UnrecognizedMethod(hint.to_string()))?,
            None => return Err(RejectionReason::MissingMethod),
        },
    };

    if path_text.is_empty() {
        return Err(RejectionReason::EmptyEndpoint);
    }
    let path = canonical_path(path_text)
        .ok_or_else(|| RejectionReason::MalformedEndpoint(endpoint.to_string()))?;

    Ok(CanonicalEndpoint { method, path })
}

fn looks_like_path(token: &str) -> bool {
    token.starts_with('/') || token.starts_with("http://") || token.starts_with("https://")
}

fn canonical_path(text: &str) -> Option<String> {
    let text = strip_origin(text)?;
    let text = text
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();

    if !text.starts_with('/') || text.chars().any(char::is_whitespace) {
        return None;
    }

    let segments: Vec<String> = text
        .split('/')
        .filter(|s| !s.is_empty())
        .map(canonical_segment)
        .collect();

    Some(format!("/{}", segments.join("/")))
}

/// Drop `scheme://host[:port]` from absolute URLs
fn strip_origin(text: &str) -> Option<&str> {
    let rest = match text
        .strip_prefix("https://")
        .or_else(|| text.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return Some(text),
    };
    match rest.find('/') {
        Some(idx) => Some(&rest[idx..]),
        None if rest.is_empty() => None,
        None => Some("/"),
    }
}

fn canonical_segment(segment: &str) -> String {
    if is_parameter(segment) {
        PARAM_PLACEHOLDER.to_string()
    } else {
        segment.to_lowercase()
    }
}

/// Parameter-like segments: templates, numeric ids, UUIDs, long hex ids
pub fn is_parameter(segment: &str) -> bool {
    let templated = (segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}'))
        || (segment.len() > 2 && segment.starts_with('<') && segment.ends_with('>'))
        || (segment.len() > 1 && segment.starts_with(':'));

    templated
        || segment.chars().all(|c| c.is_ascii_digit())
        || is_uuid(segment)
        || is_hex_id(segment)
}

fn is_uuid(segment: &str) -> bool {
    segment.len() == 36
        && segment.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn is_hex_id(segment: &str) -> bool {
    segment.len() >= 8
        && segment.chars().all(|c| c.is_ascii_hexdigit())
        && segment.chars().any(|c| c.is_ascii_digit())
}

// ============================================================================
// Assertion Normalization
// ============================================================================

/// Normalize assertion text and extract the outcome token
///
/// The outcome is the first three-digit number in 100..=599 that sits in status
/// position: after a status cue, alone, or followed by its reason phrase. An odd
/// number of negations ahead of it flips its polarity. Without such a number the
/// outcome is the statement with negations removed plus a polarity flag.
pub fn normalize_assertion(assertion: &str) -> NormalizedAssertion {
    let text = assertion
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace('\u{2019}', "'");

    let outcome = match status_code(&text) {
        Some((code, negated)) => OutcomeToken::Status { code, negated },
        None => stated_outcome(&text),
    };

    NormalizedAssertion { text, outcome }
}

/// First code in status position, with its polarity
fn status_code(text: &str) -> Option<(u16, bool)> {
    let tokens = assertion_tokens(text);

    tokens.iter().enumerate().find_map(|(i, token)| {
        let code = parse_code(token)?;
        if !in_status_position(&tokens, i, code) {
            return None;
        }
        let negations = tokens[..i].iter().filter(|t| is_negation(t)).count();
        Some((code, negations % 2 == 1))
    })
}

fn parse_code(token: &str) -> Option<u16> {
    if token.len() != 3 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse::<u16>().ok().filter(|code| (100..=599).contains(code))
}

fn in_status_position(tokens: &[String], i: usize, code: u16) -> bool {
    if tokens.len() == 1 || followed_by_reason(&tokens[i + 1..], code) {
        return true;
    }
    for token in tokens[..i].iter().rev() {
        if STATUS_CUE_WORDS.contains(&token.as_str()) {
            return true;
        }
        if !STATUS_SKIP_WORDS.contains(&token.as_str()) && !is_negation(token) {
            return false;
        }
    }
    false
}

fn followed_by_reason(rest: &[String], code: u16) -> bool {
    REASON_PHRASES
        .iter()
        .filter(|(c, _)| *c == code)
        .any(|(_, phrase)| {
            let needle: Vec<&str> = phrase.split_whitespace().collect();
            needle.len() <= rest.len() && needle.iter().zip(rest).all(|(n, w)| *n == w.as_str())
        })
}

fn is_negation(token: &str) -> bool {
    token == "!=" || NEGATION_WORDS.contains(&token)
}

/// Words of the text plus the comparison operators `==` and `!=` as their own tokens
fn assertion_tokens(text: &str) -> Vec<String> {
    fn flush(current: &mut String, tokens: &mut Vec<String>) {
        let word = current.trim_matches('\'');
        if !word.is_empty() {
            tokens.push(word.to_string());
        }
        current.clear();
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '\'' {
            current.push(c);
            continue;
        }
        flush(&mut current, &mut tokens);
        if (c == '=' || c == '!') && chars.peek() == Some(&'=') {
            chars.next();
            tokens.push(format!("{}=", c));
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

fn stated_outcome(text: &str) -> OutcomeToken {
    let mut negations = 0usize;
    let mut kept = Vec::new();

    for word in words(text) {
        if NEGATION_WORDS.contains(&word.as_str()) {
            negations += 1;
        } else if !FILLER_WORDS.contains(&word.as_str()) {
            kept.push(word);
        }
    }

    OutcomeToken::Stated {
        statement: kept.join(" "),
        negated: negations % 2 == 1,
    }
}

// ============================================================================
// Canonicalizer
// ============================================================================

/// Stage 1 of the pipeline
///
/// Holds only borrowed, read-only run inputs; canonicalizing one claim never
/// depends on any other claim.
pub struct Canonicalizer<'a> {
    rules: &'a ConditionRules,
    run: &'a RunMetadata,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(rules: &'a ConditionRules, run: &'a RunMetadata) -> Self {
        Self { rules, run }
    }

    /// Canonicalize one claim or reject it with a reason
    pub fn canonicalize(&self, raw: RawClaim) -> Result<CanonicalClaim, Rejection> {
        match self.check(&raw) {
            Ok((key, assertion, authority)) => Ok(CanonicalClaim {
                key,
                assertion,
                authority,
                raw,
            }),
            Err(reason) => {
                debug!(reason = %reason, file = %raw.source.file, "Claim rejected");
                Err(Rejection { claim: raw, reason })
            }
        }
    }

    fn check(
        &self,
        raw: &RawClaim,
    ) -> Result<(IdentityKey, NormalizedAssertion, Authority), RejectionReason> {
        if raw.assertion.trim().is_empty() {
            return Err(RejectionReason::EmptyAssertion);
        }

        let category = ClaimCategory::parse(&raw.category)
            .ok_or_else(|| RejectionReason::UnrecognizedCategory(raw.category.clone()))?;

        let endpoint = canonicalize_endpoint(&raw.endpoint, raw.method.as_deref())?;

        let artifact = raw.source.artifact;
        if !self.run.is_supplied(artifact) {
            return Err(RejectionReason::ArtifactNotSupplied(artifact));
        }

        let expected = Authority::for_artifact(artifact);
        if raw.effective_authority() != expected {
            return Err(RejectionReason::AuthorityMismatch { artifact, expected });
        }

        let key = IdentityKey {
            endpoint: endpoint.path,
            method: endpoint.method,
            condition: self.rules.classify(&raw.condition),
            category,
        };

        Ok((key, normalize_assertion(&raw.assertion), expected))
    }
}
