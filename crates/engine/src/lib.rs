//! `idbridge-engine` — identity matching and review engine.
//!
//! Pure engine crate: receives pre-loaded identity and account snapshots,
//! returns classifications, form specifications and folded output records.
//! No HTTP or IO dependencies.

pub mod error;
pub mod extract;
pub mod form;
pub mod matching;
pub mod model;
pub mod outcome;
pub mod review;
pub mod similarity;

pub use error::EngineError;
pub use matching::{find_account_similar_matches, find_identical_match, find_similar_matches};
pub use model::{Account, FormDefinition, FormInstance, Identity, Source};
pub use review::{ReviewKind, ReviewState};
pub use similarity::lig3;
