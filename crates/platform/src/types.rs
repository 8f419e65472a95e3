//! Request payloads for the platform API.
//!
//! Read-side models (identities, accounts, forms) live in `idbridge-engine`;
//! this module only carries the write-side shapes the client sends.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use idbridge_engine::model::{FormDefinition, OwnerRef, Recipient};

// ---------------------------------------------------------------------------
// Form instances
// ---------------------------------------------------------------------------

/// Body for launching a form instance from a persisted definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInstanceRequest {
    pub form_definition_id: String,
    pub recipients: Vec<Recipient>,
    pub created_by: CreatedBy,
    /// RFC 3339 expiration timestamp.
    pub expire: String,
    pub form_input: HashMap<String, Value>,
    pub stand_alone_form: bool,
}

/// Instances are created on behalf of the reconciliation source.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedBy {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FormInstanceRequest {
    pub fn new(
        definition: &FormDefinition,
        recipient_ids: &[String],
        source_id: &str,
        expire: String,
    ) -> Self {
        Self {
            form_definition_id: definition.id.clone(),
            recipients: recipient_ids
                .iter()
                .map(|id| Recipient { id: id.clone(), kind: "IDENTITY".into() })
                .collect(),
            created_by: CreatedBy { id: source_id.into(), kind: "SOURCE".into() },
            expire,
            form_input: definition.instance_input(),
            stand_alone_form: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// Test-workflow input that drives the email sender workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Email {
    /// Review notification: subject is the review key, body carries the
    /// standalone form URL.
    pub fn review(form_name: &str, form_url: &str, recipients: Vec<String>) -> Self {
        Self { recipients, subject: form_name.into(), body: form_url.into() }
    }

    /// Fatal-condition report sent to the source owner.
    pub fn error_report(source_name: &str, recipient: String, error: &str) -> Self {
        Self {
            recipients: vec![recipient],
            subject: format!("Identity reconciliation [{source_name}] error report"),
            body: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// Body for registering a workflow.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRequest {
    pub name: String,
    pub owner: OwnerRef,
    pub definition: Value,
    pub enabled: bool,
    pub trigger: Value,
}

impl WorkflowRequest {
    /// Externally-triggered workflow with a single send-email step. Test
    /// invocations feed it an [`Email`] as trigger input.
    pub fn email_sender(name: &str, owner: OwnerRef) -> Self {
        Self {
            name: name.into(),
            owner,
            definition: json!({
                "start": "Send Email",
                "steps": {
                    "Send Email": {
                        "actionId": "sp:send-email",
                        "attributes": {
                            "body.$": "$.trigger.body",
                            "recipientEmailList.$": "$.trigger.recipients",
                            "subject.$": "$.trigger.subject",
                        },
                        "nextStep": "success",
                        "type": "action",
                    },
                    "success": {
                        "type": "success",
                    },
                },
            }),
            enabled: true,
            trigger: json!({
                "type": "EXTERNAL",
                "attributes": {
                    "id": "idn:external:http",
                    "validation": null,
                },
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Body for registering a transform.
#[derive(Debug, Clone, Serialize)]
pub struct TransformSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Value,
}

impl TransformSpec {
    /// Static transform composing a candidate unique identifier from the
    /// identity's first and last name.
    pub fn unique_id(source_name: &str) -> Self {
        Self {
            name: format!("{source_name} ID"),
            kind: "static".into(),
            attributes: json!({
                "value": "$firstname.$lastname",
                "firstname": {
                    "type": "identityAttribute",
                    "attributes": { "name": "firstname" },
                },
                "lastname": {
                    "type": "identityAttribute",
                    "attributes": { "name": "lastname" },
                },
            }),
        }
    }
}

/// Transform record as listed by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformRead {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Identity preview
// ---------------------------------------------------------------------------

/// Body for previewing an identity attribute through a transform.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub identity_id: String,
    pub identity_attribute_config: Value,
}

impl PreviewRequest {
    pub fn transform(identity_id: &str, attribute: &str, transform_id: &str) -> Self {
        Self {
            identity_id: identity_id.into(),
            identity_attribute_config: json!({
                "enabled": true,
                "attributeTransforms": [{
                    "identityAttributeName": attribute,
                    "transformDefinition": {
                        "type": "reference",
                        "attributes": { "id": transform_id },
                    },
                }],
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    #[serde(default)]
    pub preview_attributes: Vec<PreviewAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewAttribute {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl PreviewResponse {
    /// String value of a previewed attribute by name.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.preview_attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_ref())
            .and_then(Value::as_str)
    }
}
