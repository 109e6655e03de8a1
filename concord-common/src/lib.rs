//! # Concord Common Library
//!
//! Shared code for the Concord reconciliation crates:
//! - Claim data model (closed taxonomy enums, raw claims, source evidence)
//! - Artifact kind detection from supplied file names
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Common error type

pub mod artifact;
pub mod claims;
pub mod config;
pub mod error;

pub use error::{Error, Result};
