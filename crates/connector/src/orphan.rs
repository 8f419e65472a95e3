//! Orphan account pass.
//!
//! Uncorrelated accounts from other sources are matched against the whole
//! identity population. Qualifying near matches open a review; the reviewer
//! either assigns the account to an identity (it gets correlated) or
//! confirms it as an orphan. Either way the verdict is mirrored onto the
//! virtual source.

use chrono::{DateTime, Utc};

use idbridge_engine::form;
use idbridge_engine::matching::find_account_similar_matches;
use idbridge_engine::model::Account;
use idbridge_engine::outcome::{AccountRecord, RecordStatus, StatusFold};
use idbridge_engine::review::{ReviewKind, ReviewRef, Selection};
use idbridge_platform::PlatformError;

use crate::api::IdentityPlatform;
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::notify;
use crate::pass::{self, PassOutcome, RecordSet};
use crate::reviews::{ReviewRunner, ReviewStep};

/// Review key for one account: native identity plus source name, since the
/// same native identity can exist on several sources.
fn entity_label(account: &Account) -> String {
    format!("{} ({})", account.native_identity, account.source_name)
}

fn record(account: &Account, message: &str, status: RecordStatus, now: DateTime<Utc>) -> AccountRecord {
    let mut record =
        AccountRecord::new(&account.native_identity, account.display_name(), message, status, now);
    record.attributes.source = Some(account.source_name.clone());
    record
}

/// Run one orphan pass.
pub fn run<P: IdentityPlatform + ?Sized>(
    platform: &P,
    config: &ConnectorConfig,
    now: DateTime<Utc>,
) -> Result<PassOutcome, ConnectorError> {
    let cfg = config.orphan()?;
    let source = platform.get_source(&config.connection.source_id).map_err(|e| match e {
        PlatformError::NotFound(_) => {
            ConnectorError::SourceNotFound(config.connection.source_id.clone())
        }
        other => other.into(),
    })?;
    let workflow = notify::ensure_email_workflow(platform, &source)?;

    let sets = pass::partition_unprotected(platform.list_identities()?, &source.id);

    let mut errors = Vec::new();
    let mut records = RecordSet::default();

    let virtual_accounts = platform.list_accounts_on_source(&source.id)?;
    for account in &virtual_accounts {
        records.upsert(AccountRecord::from_stored(account), StatusFold::Union);
    }

    let reviewers = match pass::resolve_reviewers(&sets.all, &cfg.reviewers, &mut errors) {
        Ok(reviewers) => reviewers,
        Err(err) => {
            notify::send_error_report(
                platform,
                &workflow,
                &source,
                pass::owner_email(&sets.all, &source.owner.id),
                &errors,
            );
            return Err(err);
        }
    };
    for reviewer in &reviewers {
        records.upsert(AccountRecord::reviewer(reviewer), StatusFold::Union);
    }

    let mut outstanding: Vec<String> = Vec::new();
    let mut reviews: Vec<ReviewRef> = Vec::new();

    let expire = pass::expiration(now, cfg.expiration_days);
    let mut runner =
        ReviewRunner::load(platform, &sets.all, &reviewers, &workflow, &source.id, expire)?;

    // Accounts whose mirrored record already reached a verdict need no new
    // review. Creation-only guard: an open review for the account must still
    // be stepped to resolution, whatever the mirror says.
    let settled = |account: &Account| {
        virtual_accounts
            .iter()
            .filter(|v| {
                v.native_identity == account.native_identity
                    && v.attr_str("source") == Some(account.source_name.as_str())
            })
            .any(|v| {
                AccountRecord::from_stored(v).attributes.statuses.iter().any(|s| {
                    matches!(s, RecordStatus::Correlated | RecordStatus::Orphan)
                })
            })
    };

    for account in platform.list_uncorrelated_accounts()? {
        if account.name.is_none() || account.source_id == source.id {
            continue;
        }

        let step = runner.step(ReviewKind::OrphanAssignment, &entity_label(&account), |name| {
            if settled(&account) {
                return Ok(None);
            }
            let matches =
                find_account_similar_matches(&account, &sets.all, &cfg.attributes, cfg.score);
            if matches.is_empty() {
                return Ok(None);
            }
            Ok(Some(form::orphan_form(
                name,
                source.owner.clone(),
                &account,
                &matches,
                &cfg.attributes,
            )))
        });

        let step = match step {
            Ok(step) => step,
            // One broken account must not sink the pass.
            Err(err) => {
                log::error!("{err}");
                errors.push(err.to_string());
                continue;
            }
        };

        match step {
            ReviewStep::NotNeeded => {}
            ReviewStep::Outstanding { review, newly_notified } => {
                if newly_notified {
                    records.upsert(
                        record(&account, "Review notification sent", RecordStatus::Pending, now),
                        StatusFold::Replace,
                    );
                }
                outstanding.push(review.url.clone());
                reviews.push(review);
            }
            ReviewStep::Resolved { decision, definition_id } => {
                if let Some(warning) = &decision.warning {
                    log::error!("{warning}");
                    errors.push(warning.clone());
                }
                let matched = match &decision.selection {
                    Selection::Candidate(id) => sets.all.iter().find(|i| &i.id == id),
                    Selection::Sentinel { .. } => None,
                };
                let status = match matched {
                    Some(identity) => {
                        if let Err(err) = platform.correlate_account(&account.id, &identity.id) {
                            log::error!("{err}");
                            errors.push(err.to_string());
                            runner.finish(&definition_id, &mut errors);
                            continue;
                        }
                        RecordStatus::Correlated
                    }
                    None => RecordStatus::Orphan,
                };
                records.upsert(record(&account, &decision.message, status, now), StatusFold::Replace);
                runner.finish(&definition_id, &mut errors);
            }
            ReviewStep::Cancelled { definition_id } => {
                runner.finish(&definition_id, &mut errors);
            }
        }
    }

    records.attach_reviews(&outstanding);

    if !errors.is_empty() {
        notify::send_error_report(
            platform,
            &workflow,
            &source,
            pass::owner_email(&sets.all, &source.owner.id),
            &errors,
        );
    }

    Ok(PassOutcome { records: records.into_vec(), reviews, errors })
}
