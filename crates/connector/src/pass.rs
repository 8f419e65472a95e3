//! Shared plumbing for the merging and orphan passes.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use idbridge_engine::model::Identity;
use idbridge_engine::outcome::{AccountRecord, RecordStatus, StatusFold};

use crate::error::ConnectorError;

/// Result of one merging or orphan pass.
#[derive(Debug, Default)]
pub struct PassOutcome {
    /// Account records for the virtual source.
    pub records: Vec<AccountRecord>,
    /// Reviews currently open, for the entitlement surface.
    pub reviews: Vec<idbridge_engine::review::ReviewRef>,
    /// Non-fatal problems hit along the way; also emailed to the source
    /// owner when non-empty.
    pub errors: Vec<String>,
}

/// Partition the tenant's identities for a pass, dropping protected ones
/// first: protected identities are never matching candidates.
pub fn partition_unprotected(
    identities: Vec<Identity>,
    source_id: &str,
) -> idbridge_engine::matching::IdentitySets {
    let identities = identities.into_iter().filter(|i| !i.protected).collect();
    idbridge_engine::matching::partition_identities(identities, source_id)
}

// ---------------------------------------------------------------------------
// Reviewers
// ---------------------------------------------------------------------------

/// Resolve configured reviewer uids against the loaded identities.
///
/// No resolvable reviewer is fatal: a pass without anyone to decide reviews
/// must not silently run. A partial match only degrades to a warning.
pub fn resolve_reviewers(
    identities: &[Identity],
    configured: &[String],
    errors: &mut Vec<String>,
) -> Result<Vec<Identity>, ConnectorError> {
    let found: Vec<Identity> = identities
        .iter()
        .filter(|i| i.uid().is_some_and(|uid| configured.iter().any(|c| c == uid)))
        .cloned()
        .collect();

    if found.is_empty() {
        let error = "No reviewers were found".to_string();
        log::error!("{error}");
        errors.push(error);
        return Err(ConnectorError::NoReviewers);
    }
    if found.len() < configured.len() {
        let error = "Some reviewers were not found".to_string();
        log::warn!("{error}");
        errors.push(error);
    }
    Ok(found)
}

/// Email addresses of the resolved reviewers.
pub fn reviewer_emails(reviewers: &[Identity]) -> Vec<String> {
    reviewers.iter().filter_map(|r| r.attr_str("email").map(String::from)).collect()
}

/// Email address of the identity owning the virtual source, for error
/// reports.
pub fn owner_email(identities: &[Identity], owner_id: &str) -> Option<String> {
    identities
        .iter()
        .find(|i| i.id == owner_id)
        .and_then(|i| i.attr_str("email"))
        .map(String::from)
}

/// Review expiration timestamp, `days` from `now`.
pub fn expiration(now: DateTime<Utc>, days: u32) -> String {
    (now + Duration::days(i64::from(days))).to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// Accumulates output records for one pass, merging repeated updates to the
/// same entity instead of emitting duplicates.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: Vec<AccountRecord>,
}

impl RecordSet {
    /// Insert a record, or merge it into an existing one with the same
    /// native identity: history always appends, statuses fold per `mode`.
    pub fn upsert(&mut self, record: AccountRecord, mode: StatusFold) {
        match self.records.iter_mut().find(|r| r.identity == record.identity) {
            Some(existing) => {
                existing.attributes.history.extend(record.attributes.history);
                match mode {
                    StatusFold::Replace => {
                        existing.attributes.statuses = record.attributes.statuses;
                    }
                    StatusFold::Union => {
                        for status in record.attributes.statuses {
                            if !existing.attributes.statuses.contains(&status) {
                                existing.attributes.statuses.push(status);
                            }
                        }
                    }
                }
            }
            None => self.records.push(record),
        }
    }

    /// Attach the pass's outstanding review URLs to every reviewer record.
    pub fn attach_reviews(&mut self, reviews: &[String]) {
        for record in &mut self.records {
            if record.attributes.statuses.contains(&RecordStatus::Reviewer) {
                record.attributes.reviews = reviews.to_vec();
            }
        }
    }

    pub fn into_vec(self) -> Vec<AccountRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashMap;

    fn identity(id: &str, uid: &str, email: Option<&str>) -> Identity {
        let mut attributes = HashMap::from([("uid".to_string(), json!(uid))]);
        if let Some(email) = email {
            attributes.insert("email".into(), json!(email));
        }
        Identity {
            id: id.into(),
            name: uid.into(),
            display_name: None,
            protected: false,
            attributes,
            accounts: vec![],
            source: None,
        }
    }

    #[test]
    fn missing_all_reviewers_is_fatal() {
        let identities = vec![identity("id-1", "someone", None)];
        let mut errors = Vec::new();
        let result = resolve_reviewers(&identities, &["admin".into()], &mut errors);
        assert!(matches!(result, Err(ConnectorError::NoReviewers)));
        assert_eq!(errors, vec!["No reviewers were found"]);
    }

    #[test]
    fn partial_reviewers_warn_but_continue() {
        let identities = vec![identity("id-1", "admin", Some("a@corp.example"))];
        let mut errors = Vec::new();
        let found =
            resolve_reviewers(&identities, &["admin".into(), "auditor".into()], &mut errors)
                .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(errors, vec!["Some reviewers were not found"]);
        assert_eq!(reviewer_emails(&found), vec!["a@corp.example".to_string()]);
    }

    #[test]
    fn expiration_is_days_ahead() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(expiration(now, 7), "2024-03-08T12:00:00Z");
    }

    #[test]
    fn upsert_merges_history_and_unions_statuses() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut set = RecordSet::default();
        set.upsert(AccountRecord::new("u1", "jane", "created", RecordStatus::Initial, now), StatusFold::Union);
        set.upsert(AccountRecord::new("u1", "jane", "review opened", RecordStatus::Pending, now), StatusFold::Union);

        let records = set.into_vec();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attributes.history.len(), 2);
        assert_eq!(
            records[0].attributes.statuses,
            vec![RecordStatus::Initial, RecordStatus::Pending]
        );
    }

    #[test]
    fn upsert_replace_supersedes_statuses() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut set = RecordSet::default();
        set.upsert(AccountRecord::new("u1", "jane", "seen", RecordStatus::Pending, now), StatusFold::Union);
        set.upsert(AccountRecord::new("u1", "jane", "approved", RecordStatus::Correlated, now), StatusFold::Replace);

        let records = set.into_vec();
        assert_eq!(records[0].attributes.statuses, vec![RecordStatus::Correlated]);
    }

    #[test]
    fn reviews_attach_only_to_reviewer_records() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut set = RecordSet::default();
        set.upsert(
            AccountRecord::reviewer(&identity("rev-1", "admin", None)),
            StatusFold::Union,
        );
        set.upsert(AccountRecord::new("u1", "jane", "seen", RecordStatus::Initial, now), StatusFold::Union);

        set.attach_reviews(&["https://forms/fi-1".into()]);
        let records = set.into_vec();
        let reviewer = records.iter().find(|r| r.identity == "rev-1").unwrap();
        let entity = records.iter().find(|r| r.identity == "u1").unwrap();
        assert_eq!(reviewer.attributes.reviews.len(), 1);
        assert!(entity.attributes.reviews.is_empty());
    }
}
