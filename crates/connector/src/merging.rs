//! Identity merging pass.
//!
//! New joiners land as identities anchored to an authoritative source but
//! not yet linked to the reconciliation source. Each pass classifies them
//! against the already-linked population: an exact attribute match fuses
//! silently, near matches open a review, and completed reviews are applied
//! and torn down. The first pass ever (nothing linked yet) just registers
//! everyone as-is.

use chrono::{DateTime, Utc};

use idbridge_engine::matching::{find_identical_match, find_similar_matches, IdentitySets};
use idbridge_engine::model::{Account, Identity, OwnerRef};
use idbridge_engine::outcome::{AccountRecord, RecordStatus, StatusFold};
use idbridge_engine::review::{ReviewKind, ReviewRef, Selection};
use idbridge_engine::{form, EngineError};
use idbridge_platform::PlatformError;

use crate::api::IdentityPlatform;
use crate::config::{ConnectorConfig, ReconciliationConfig};
use crate::error::ConnectorError;
use crate::pass::{self, PassOutcome, RecordSet};
use crate::notify;
use crate::reviews::{ReviewRunner, ReviewStep};

/// Run one merging pass.
pub fn run<P: IdentityPlatform + ?Sized>(
    platform: &P,
    config: &ConnectorConfig,
    now: DateTime<Utc>,
) -> Result<PassOutcome, ConnectorError> {
    let cfg = config.merging()?;
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

    if sets.processed.is_empty() {
        log::info!("first run: registering {} identities as-is", sets.unprocessed.len());
        for identity in &sets.unprocessed {
            let uid = identity.uid().unwrap_or(&identity.name);
            records.upsert(
                AccountRecord::new(uid, uid, "Found on first run", RecordStatus::Initial, now),
                StatusFold::Union,
            );
        }
    } else {
        let expire = pass::expiration(now, cfg.expiration_days);
        let mut runner =
            ReviewRunner::load(platform, &sets.all, &reviewers, &workflow, &source.id, expire)?;
        let ctx = MergeCtx {
            platform,
            cfg,
            owner: source.owner.clone(),
            sets: &sets,
            virtual_accounts: &virtual_accounts,
            now,
        };

        for identity in &sets.unprocessed {
            let result = ctx.process(
                identity,
                &mut runner,
                &mut records,
                &mut outstanding,
                &mut reviews,
                &mut errors,
            );
            // One broken identity must not sink the pass.
            if let Err(err) = result {
                log::error!("{err}");
                errors.push(err.to_string());
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

struct MergeCtx<'a, P: IdentityPlatform + ?Sized> {
    platform: &'a P,
    cfg: &'a ReconciliationConfig,
    owner: OwnerRef,
    sets: &'a IdentitySets,
    virtual_accounts: &'a [Account],
    now: DateTime<Utc>,
}

impl<'a, P: IdentityPlatform + ?Sized> MergeCtx<'a, P> {
    fn process(
        &self,
        identity: &Identity,
        runner: &mut ReviewRunner<'a, P>,
        records: &mut RecordSet,
        outstanding: &mut Vec<String>,
        reviews: &mut Vec<ReviewRef>,
        errors: &mut Vec<String>,
    ) -> Result<(), ConnectorError> {
        let native = identity
            .authoritative_source()
            .and_then(|source_id| identity.account_on(source_id))
            .ok_or_else(|| {
                ConnectorError::Engine(EngineError::FormBuild(format!(
                    "identity {} has no account on its authoritative source",
                    identity.name
                )))
            })?;

        if let Some(matched) =
            find_identical_match(identity, &self.sets.processed, &self.cfg.attributes)
        {
            self.platform.correlate_account(&native.id, &matched.id)?;
            let name = self.virtual_name(&matched.id).unwrap_or_else(|| matched.name.clone());
            records.upsert(
                AccountRecord::new(
                    &name,
                    &name,
                    "Identical match found",
                    RecordStatus::Auto,
                    self.now,
                ),
                StatusFold::Union,
            );
            return Ok(());
        }

        let step = runner.step(ReviewKind::IdentityMerge, &identity.name, |name| {
            let similar =
                find_similar_matches(identity, &self.sets.processed, &self.cfg.attributes, self.cfg.score);
            if similar.is_empty() {
                return Ok(None);
            }
            let spec =
                form::merge_form(name, self.owner.clone(), identity, &similar, &self.cfg.attributes)?;
            Ok(Some(spec))
        })?;

        match step {
            ReviewStep::NotNeeded => {}
            ReviewStep::Outstanding { review, .. } => {
                outstanding.push(review.url.clone());
                reviews.push(review);
            }
            ReviewStep::Resolved { decision, definition_id } => {
                if let Some(warning) = &decision.warning {
                    log::error!("{warning}");
                    errors.push(warning.clone());
                }
                let matched = match &decision.selection {
                    Selection::Candidate(id) => self.sets.processed.iter().find(|p| &p.id == id),
                    Selection::Sentinel { .. } => None,
                };
                let record = match matched {
                    Some(target) => {
                        self.platform.correlate_account(&native.id, &target.id)?;
                        let name =
                            self.virtual_name(&target.id).unwrap_or_else(|| target.name.clone());
                        AccountRecord::new(
                            &name,
                            &name,
                            &decision.message,
                            RecordStatus::Manual,
                            self.now,
                        )
                    }
                    // Sentinel, or a selection pointing at an identity that
                    // no longer exists: stands alone.
                    None => {
                        let uid = identity.uid().unwrap_or(&identity.name);
                        AccountRecord::new(
                            uid,
                            uid,
                            &decision.message,
                            RecordStatus::Authorized,
                            self.now,
                        )
                    }
                };
                records.upsert(record, StatusFold::Union);
                runner.finish(&definition_id, errors);
            }
            ReviewStep::Cancelled { definition_id } => {
                runner.finish(&definition_id, errors);
            }
        }
        Ok(())
    }

    /// Name of the virtual-source account already linked to an identity.
    fn virtual_name(&self, identity_id: &str) -> Option<String> {
        self.virtual_accounts
            .iter()
            .find(|a| a.identity_id.as_deref() == Some(identity_id))
            .map(|a| a.display_name().to_string())
    }
}
