use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::review::ReviewState;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Attribute name that links an identity to its authoritative source.
pub const AUTHORITATIVE_SOURCE_ATTR: &str = "authoritativeSource";

/// Attribute name carrying the unique identifier of an identity.
pub const UID_ATTR: &str = "uid";

/// Canonical person record owned by the governance platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub accounts: Vec<AccountRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

impl Identity {
    /// String value of a named attribute, if present and string-typed.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// The identity's unique identifier attribute.
    pub fn uid(&self) -> Option<&str> {
        self.attr_str(UID_ATTR)
    }

    /// The authoritative source this identity is anchored to, if any.
    pub fn authoritative_source(&self) -> Option<&str> {
        self.attr_str(AUTHORITATIVE_SOURCE_ATTR)
    }

    /// The identity's account on the given source, if one is linked.
    pub fn account_on(&self, source_id: &str) -> Option<&AccountRef> {
        self.accounts
            .iter()
            .find(|a| a.source.as_ref().is_some_and(|s| s.id == source_id))
    }

    /// Display name when set, account name otherwise.
    pub fn display_or_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// An account linked to an identity, as nested in identity records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceRef>,
}

/// Shorthand source reference nested in identities and accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// An account record on some source, possibly uncorrelated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub native_identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_id: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
    #[serde(default)]
    pub uncorrelated: bool,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Account {
    /// String value of a named attribute, if present and string-typed.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Display name when set, native identity otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.native_identity)
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// A source registered on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    pub owner: OwnerRef,
    #[serde(default)]
    pub connector_attributes: Value,
}

/// Owner reference (`{"type": "IDENTITY", "id": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl OwnerRef {
    pub fn identity(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: "IDENTITY".into() }
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// A persisted form definition, as returned by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub form_input: Vec<FormInputRef>,
}

impl FormDefinition {
    /// Input map to freeze into a new instance of this definition: every
    /// declared input keyed by id, carrying the value recorded at build time.
    pub fn instance_input(&self) -> HashMap<String, Value> {
        self.form_input
            .iter()
            .filter_map(|i| Some((i.id.clone(), Value::String(i.description.clone()?))))
            .collect()
    }
}

/// Input declared on a persisted form definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormInputRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A live instance of a form, assigned to reviewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInstance {
    pub id: String,
    pub form_definition_id: String,
    pub state: ReviewState,
    #[serde(default)]
    pub form_data: HashMap<String, Value>,
    #[serde(default)]
    pub form_input: HashMap<String, Value>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stand_alone_form_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<String>,
}

impl FormInstance {
    /// String value of a form input by id.
    pub fn input_str(&self, id: &str) -> Option<&str> {
        self.form_input.get(id).and_then(Value::as_str)
    }
}

/// Identity assigned to decide a form instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// Workflow registered on the platform (notification channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_deserializes_platform_payload() {
        let raw = json!({
            "id": "2c91808a",
            "name": "jane.doe",
            "displayName": "Jane Doe",
            "protected": false,
            "attributes": {
                "uid": "jane.doe",
                "firstname": "Jane",
                "authoritativeSource": "src-hr"
            },
            "accounts": [
                { "id": "acc-1", "name": "jdoe", "source": { "id": "src-hr", "name": "HR" } }
            ]
        });
        let identity: Identity = serde_json::from_value(raw).unwrap();
        assert_eq!(identity.uid(), Some("jane.doe"));
        assert_eq!(identity.authoritative_source(), Some("src-hr"));
        assert_eq!(identity.display_or_name(), "Jane Doe");
        assert!(identity.account_on("src-hr").is_some());
        assert!(identity.account_on("src-it").is_none());
    }

    #[test]
    fn account_defaults_tolerate_sparse_payloads() {
        let raw = json!({
            "id": "acc-9",
            "nativeIdentity": "u123",
            "sourceId": "src-ad"
        });
        let account: Account = serde_json::from_value(raw).unwrap();
        assert!(account.uncorrelated == false);
        assert_eq!(account.display_name(), "u123");
        assert!(account.identity_id.is_none());
    }

    #[test]
    fn form_instance_state_parses_platform_strings() {
        let raw = json!({
            "id": "fi-1",
            "formDefinitionId": "fd-1",
            "state": "IN_PROGRESS",
            "formData": {},
            "recipients": [{ "id": "rev-1", "type": "IDENTITY" }]
        });
        let instance: FormInstance = serde_json::from_value(raw).unwrap();
        assert_eq!(instance.state, ReviewState::InProgress);
    }
}
