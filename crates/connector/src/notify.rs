//! Email notifications through the platform's workflow engine.
//!
//! The platform has no direct send-mail API; instead each virtual source
//! owns an externally-triggered workflow with a single send-email step, and
//! notifications fire it with test input.

use idbridge_engine::model::{FormInstance, Source, Workflow};
use idbridge_platform::types::Email;

use crate::api::IdentityPlatform;
use crate::error::ConnectorError;

pub const WORKFLOW_NAME: &str = "Email Sender";

/// Workflow name for one virtual source; the source id prefix keeps parallel
/// deployments from sharing a workflow.
pub fn workflow_name(source_id: &str) -> String {
    format!("{source_id} - {WORKFLOW_NAME}")
}

/// Find the source's email workflow, creating it on first use.
pub fn ensure_email_workflow<P: IdentityPlatform + ?Sized>(
    platform: &P,
    source: &Source,
) -> Result<Workflow, ConnectorError> {
    let name = workflow_name(&source.id);
    if let Some(workflow) = platform.list_workflows()?.into_iter().find(|w| w.name == name) {
        return Ok(workflow);
    }
    log::info!("creating email workflow '{name}'");
    let request =
        idbridge_platform::types::WorkflowRequest::email_sender(&name, source.owner.clone());
    Ok(platform.create_workflow(&request)?)
}

/// Notify reviewers that a form awaits their decision.
pub fn send_review_email<P: IdentityPlatform + ?Sized>(
    platform: &P,
    workflow: &Workflow,
    form_name: &str,
    instance: &FormInstance,
    recipients: Vec<String>,
) -> Result<(), ConnectorError> {
    let url = instance.stand_alone_form_url.as_deref().unwrap_or_default();
    let email = Email::review(form_name, url, recipients);
    platform.send_email(&workflow.id, &email)?;
    Ok(())
}

/// Report accumulated pass errors to the source owner. Best effort: a
/// missing owner email only logs.
pub fn send_error_report<P: IdentityPlatform + ?Sized>(
    platform: &P,
    workflow: &Workflow,
    source: &Source,
    recipient: Option<String>,
    errors: &[String],
) {
    let Some(recipient) = recipient else {
        log::warn!("source owner has no email address, skipping error report");
        return;
    };
    let mut lines = vec!["Errors:".to_string()];
    lines.extend(errors.iter().cloned());
    let email = Email::error_report(&source.name, recipient, &lines.join("\n"));
    if let Err(err) = platform.send_email(&workflow.id, &email) {
        log::error!("failed to send error report: {err}");
    }
}
