//! Output account records.
//!
//! Every entity a reconciliation pass touches is reported back to the
//! platform as an account record on the virtual source: fused identities,
//! reviewed accounts, reviewer bookkeeping records. Records accumulate an
//! audit history and a set of status tags across passes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Account, Identity};

/// Status tag attached to an output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Fused without review: identical attribute match.
    Auto,
    /// Fused after an explicit reviewer decision.
    Manual,
    /// Confirmed as a standalone identity by a reviewer.
    Authorized,
    /// Seen on the first run, before reviews were possible.
    Initial,
    /// A review for this entity is open.
    Pending,
    /// Confirmed orphan account.
    Orphan,
    /// Account already linked to an identity.
    Correlated,
    /// Bookkeeping record for a configured reviewer.
    Reviewer,
}

/// How incoming statuses combine with the ones already on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFold {
    /// Keep existing tags, add the new ones.
    Union,
    /// Discard existing tags; a decision supersedes interim states.
    Replace,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordAttributes {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<RecordStatus>,
    /// URLs of reviews this entity is (or was) subject to.
    #[serde(default)]
    pub reviews: Vec<String>,
}

/// One account on the virtual reconciliation source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Native identity key on the virtual source.
    pub identity: String,
    pub uuid: String,
    pub attributes: RecordAttributes,
}

fn history_line(message: &str, now: DateTime<Utc>) -> String {
    format!("[{}] {message}", now.to_rfc3339_opts(SecondsFormat::Secs, true))
}

impl AccountRecord {
    pub fn new(
        id: &str,
        name: &str,
        message: &str,
        status: RecordStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            identity: id.to_string(),
            uuid: id.to_string(),
            attributes: RecordAttributes {
                id: id.to_string(),
                name: name.to_string(),
                source: None,
                history: vec![history_line(message, now)],
                statuses: vec![status],
                reviews: Vec::new(),
            },
        }
    }

    /// Bookkeeping record for a configured reviewer; it exists so that
    /// outstanding reviews can be listed against the person deciding them.
    pub fn reviewer(identity: &Identity) -> Self {
        Self {
            identity: identity.id.clone(),
            uuid: identity.id.clone(),
            attributes: RecordAttributes {
                id: identity.id.clone(),
                name: identity.display_or_name().to_string(),
                source: None,
                history: Vec::new(),
                statuses: vec![RecordStatus::Reviewer],
                reviews: Vec::new(),
            },
        }
    }

    /// Rebuild a record previously written to the virtual source, history
    /// and status tags intact. Unknown stored tags are dropped.
    pub fn from_stored(account: &Account) -> Self {
        let strings = |key: &str| -> Vec<String> {
            account
                .attributes
                .get(key)
                .and_then(Value::as_array)
                .map(|items| {
                    items.iter().filter_map(Value::as_str).map(String::from).collect()
                })
                .unwrap_or_default()
        };
        let statuses = account
            .attributes
            .get("statuses")
            .cloned()
            .map(|v| serde_json::from_value::<Vec<RecordStatus>>(v).unwrap_or_default())
            .unwrap_or_default();

        Self {
            identity: account.native_identity.clone(),
            uuid: account.display_name().to_string(),
            attributes: RecordAttributes {
                id: account
                    .attr_str("id")
                    .unwrap_or(&account.native_identity)
                    .to_string(),
                name: account
                    .attr_str("name")
                    .unwrap_or_else(|| account.display_name())
                    .to_string(),
                source: account.attr_str("source").map(String::from),
                history: strings("history"),
                statuses,
                reviews: strings("reviews"),
            },
        }
    }

}
