//! `idbridge-connector` — reconciliation passes over the governance platform.
//!
//! Three drivers share one plumbing layer:
//! - merging: dedupe new joiners against existing identities, with human
//!   review of near matches
//! - orphan: assign uncorrelated accounts to identities, with human review
//! - authoritative: mint unique identifiers for a source of record
//!
//! Drivers run against the [`api::IdentityPlatform`] seam so tests can
//! substitute an in-memory platform.

pub mod api;
pub mod authoritative;
pub mod config;
pub mod error;
pub mod merging;
pub mod notify;
pub mod orphan;
pub mod pass;
pub mod reviews;
pub mod schema;

pub use config::ConnectorConfig;
pub use error::ConnectorError;
