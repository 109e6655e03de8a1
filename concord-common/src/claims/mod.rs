//! Claim data model
//!
//! Raw claims arrive from the extraction collaborator already anchored to one
//! artifact (README, API spec, or test) with verbatim evidence. Everything the
//! engine compares on is a closed enumeration, so an unhandled category or
//! condition bucket is a compile error rather than a runtime surprise.

pub mod raw;
pub mod taxonomy;

pub use raw::{LineRange, RawClaim, SourceRef};
pub use taxonomy::{
    ArtifactKind, Authority, ClaimCategory, ConditionBucket, Confidence, HttpMethod,
};
