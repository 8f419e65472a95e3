//! Review lifecycle stepper.
//!
//! One pass advances each entity's review by at most one step: open a form
//! when near matches need a decision, notify reviewers once the instance is
//! assigned, and hand back the decision when it completes. The form name is
//! the review key, so repeated passes converge on the same review instead of
//! stacking duplicates.

use idbridge_engine::form::FormSpec;
use idbridge_engine::model::{FormDefinition, FormInstance, Identity, Workflow};
use idbridge_engine::review::{self, Decision, ReviewKind, ReviewRef, ReviewState};
use idbridge_platform::types::FormInstanceRequest;

use crate::api::IdentityPlatform;
use crate::error::ConnectorError;
use crate::{notify, pass};

/// Where one entity's review stands after a pass touched it.
#[derive(Debug)]
pub enum ReviewStep {
    /// No review open and none needed (no qualifying candidates).
    NotNeeded,
    /// A review is open and waiting on a human.
    Outstanding { review: ReviewRef, newly_notified: bool },
    /// The reviewer decided; the caller applies the decision and finishes
    /// the review.
    Resolved { decision: Decision, definition_id: String },
    /// The review was cancelled on the platform; the caller finishes it.
    Cancelled { definition_id: String },
}

pub struct ReviewRunner<'a, P: IdentityPlatform + ?Sized> {
    platform: &'a P,
    definitions: Vec<FormDefinition>,
    instances: Vec<FormInstance>,
    /// Full identity set, for resolving the deciding reviewer.
    identities: &'a [Identity],
    reviewers: &'a [Identity],
    workflow: &'a Workflow,
    source_id: &'a str,
    expire: String,
}

impl<'a, P: IdentityPlatform + ?Sized> ReviewRunner<'a, P> {
    pub fn load(
        platform: &'a P,
        identities: &'a [Identity],
        reviewers: &'a [Identity],
        workflow: &'a Workflow,
        source_id: &'a str,
        expire: String,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            definitions: platform.list_form_definitions()?,
            instances: platform.list_form_instances()?,
            platform,
            identities,
            reviewers,
            workflow,
            source_id,
            expire,
        })
    }

    /// Advance the review keyed by `kind` + `entity_label` one step.
    ///
    /// `build_form` is called only when no form exists yet; returning `None`
    /// means the entity has no qualifying candidates and needs no review.
    pub fn step<F>(
        &mut self,
        kind: ReviewKind,
        entity_label: &str,
        build_form: F,
    ) -> Result<ReviewStep, ConnectorError>
    where
        F: FnOnce(&str) -> Result<Option<FormSpec>, ConnectorError>,
    {
        let form_name = kind.form_name(entity_label);

        let definition = match self.definitions.iter().find(|d| d.name == form_name) {
            Some(existing) => existing.clone(),
            None => {
                let Some(spec) = build_form(&form_name)? else {
                    return Ok(ReviewStep::NotNeeded);
                };
                log::info!("creating form '{form_name}'");
                let created = self.platform.create_form_definition(&spec)?;
                self.definitions.push(created.clone());
                created
            }
        };

        // Prefer an open instance; fall back to a terminal one so completed
        // and cancelled reviews still resolve.
        let found = self
            .instances
            .iter()
            .find(|i| i.form_definition_id == definition.id && !i.state.is_terminal())
            .or_else(|| self.instances.iter().find(|i| i.form_definition_id == definition.id))
            .cloned();

        let instance = match found {
            Some(existing) => {
                log::debug!("existing form instance found for '{form_name}'");
                existing
            }
            None => {
                let reviewer_ids: Vec<String> =
                    self.reviewers.iter().map(|r| r.id.clone()).collect();
                let request = FormInstanceRequest::new(
                    &definition,
                    &reviewer_ids,
                    self.source_id,
                    self.expire.clone(),
                );
                let created = self.platform.create_form_instance(&request)?;
                log::info!(
                    "form URL for '{form_name}': {}",
                    created.stand_alone_form_url.as_deref().unwrap_or("<none>")
                );
                self.instances.push(created.clone());
                created
            }
        };

        let review = ReviewRef {
            id: definition.id.clone(),
            name: form_name.clone(),
            entity: entity_label.to_string(),
            url: instance.stand_alone_form_url.clone().unwrap_or_default(),
        };

        match instance.state {
            ReviewState::Completed => {
                let reviewer = instance
                    .recipients
                    .first()
                    .and_then(|r| self.identities.iter().find(|i| i.id == r.id));
                let decision = review::decide(kind, &instance, reviewer)?;
                Ok(ReviewStep::Resolved { decision, definition_id: definition.id })
            }
            ReviewState::Cancelled => {
                log::info!("'{form_name}' was cancelled");
                Ok(ReviewStep::Cancelled { definition_id: definition.id })
            }
            ReviewState::Assigned => {
                log::info!("sending email notifications for '{form_name}'");
                notify::send_review_email(
                    self.platform,
                    self.workflow,
                    &form_name,
                    &instance,
                    pass::reviewer_emails(self.reviewers),
                )?;
                debug_assert!(instance.state.can_advance(ReviewState::InProgress));
                self.platform.set_form_instance_state(&instance.id, ReviewState::InProgress)?;
                Ok(ReviewStep::Outstanding { review, newly_notified: true })
            }
            ReviewState::Pending | ReviewState::InProgress => {
                log::info!("no decision made yet for '{form_name}'");
                Ok(ReviewStep::Outstanding { review, newly_notified: false })
            }
        }
    }

    /// Tear down a finished review's form. Failure to delete is reported but
    /// never aborts the pass.
    pub fn finish(&mut self, definition_id: &str, errors: &mut Vec<String>) {
        log::info!("deleting form {definition_id}");
        match self.platform.delete_form_definition(definition_id) {
            Ok(()) => self.definitions.retain(|d| d.id != definition_id),
            Err(err) => {
                let error = format!("Error deleting form with ID {definition_id}");
                log::error!("{error}: {err}");
                errors.push(error);
            }
        }
    }
}
