//! `idbridge-platform` — HTTP client for the identity governance platform.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! Covers the full surface the reconciliation drivers need: identity search,
//! accounts, form definitions and instances, workflows, transforms.

pub mod client;
pub mod error;
pub mod types;

pub use client::PlatformClient;
pub use error::PlatformError;
