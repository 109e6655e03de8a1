// Stage 2: Identity Matcher
//
// Concept: Partition canonical claims into equivalence classes by identity key
// Synchronization: Accepts CanonicalClaim stream, outputs Vec<EquivalenceClass>
//
// Grouping is by exact key equality only. No fuzzy or similarity matching
// happens here; all normalization already happened in the canonicalizer.
// Partial groupings merge associatively and commutatively, so claims can be
// grouped in chunks and combined in any order.

use super::types::{CanonicalClaim, EquivalenceClass, IdentityKey};
use concord_common::Result;
use std::collections::BTreeMap;
use tracing::debug;

/// Partial grouping of canonical claims, keyed deterministically
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    classes: BTreeMap<IdentityKey, Vec<CanonicalClaim>>,
}

impl Grouping {
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total number of grouped claims
    pub fn claim_count(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    fn insert(&mut self, claim: CanonicalClaim) {
        self.classes.entry(claim.key.clone()).or_default().push(claim);
    }

    /// Finalize into classes, in key order
    pub fn into_classes(self) -> Result<Vec<EquivalenceClass>> {
        self.classes
            .into_iter()
            .map(|(key, members)| EquivalenceClass::new(key, members))
            .collect()
    }
}

/// Stage 2 of the pipeline
pub struct IdentityMatcher;

impl IdentityMatcher {
    /// Group claims by identity key
    pub fn group(claims: impl IntoIterator<Item = CanonicalClaim>) -> Grouping {
        let mut grouping = Grouping::default();
        for claim in claims {
            grouping.insert(claim);
        }
        debug!(
            classes = grouping.len(),
            claims = grouping.claim_count(),
            "Grouped canonical claims"
        );
        grouping
    }

    /// Combine two partial groupings
    pub fn merge(mut a: Grouping, b: Grouping) -> Grouping {
        for (key, members) in b.classes {
            a.classes.entry(key).or_default().extend(members);
        }
        a
    }
}
