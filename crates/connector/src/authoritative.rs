//! Authoritative source pass.
//!
//! Mints a stable unique identifier for every identity that does not hold
//! an account on the source of record yet. Identifier candidates come from
//! a platform transform previewed against the identity; collisions get a
//! numeric suffix.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use idbridge_engine::model::{Identity, UID_ATTR};
use idbridge_platform::types::{PreviewRequest, TransformSpec};
use idbridge_platform::PlatformError;

use crate::api::IdentityPlatform;
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::{notify, pass};

/// Account on the source of record.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueAccount {
    pub identity: String,
    pub uuid: String,
    pub attributes: HashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct AuthoritativeOutcome {
    pub accounts: Vec<UniqueAccount>,
    pub errors: Vec<String>,
}

/// Run one authoritative pass.
pub fn run<P: IdentityPlatform + ?Sized>(
    platform: &P,
    config: &ConnectorConfig,
) -> Result<AuthoritativeOutcome, ConnectorError> {
    let source = platform.get_source(&config.connection.source_id).map_err(|e| match e {
        PlatformError::NotFound(_) => {
            ConnectorError::SourceNotFound(config.connection.source_id.clone())
        }
        other => other.into(),
    })?;
    let workflow = notify::ensure_email_workflow(platform, &source)?;

    let mut identities = platform.list_identities()?;
    identities.retain(|i| !i.protected);

    let accounts = platform.list_accounts_on_source(&source.id)?;
    let mut current_ids: Vec<String> = accounts
        .iter()
        .filter(|a| !a.uncorrelated)
        .map(|a| a.native_identity.clone())
        .collect();

    let transform_name = ensure_transform(platform, config, &source.name)?;

    let mut outcome = AuthoritativeOutcome::default();
    for identity in &identities {
        match accounts.iter().find(|a| a.identity_id.as_deref() == Some(&identity.id)) {
            Some(existing) => outcome.accounts.push(UniqueAccount {
                identity: existing.native_identity.clone(),
                uuid: existing.display_name().to_string(),
                attributes: existing.attributes.clone(),
            }),
            None => match mint_unique_id(platform, identity, &current_ids, &transform_name) {
                Ok(Some(unique_id)) => {
                    current_ids.push(unique_id.clone());
                    let uid = identity.uid().unwrap_or(&identity.name);
                    let mut attributes = HashMap::from([
                        ("id".to_string(), json!(unique_id)),
                        ("name".to_string(), json!(uid)),
                    ]);
                    if let Some(email) = identity.attr_str("email") {
                        attributes.insert("email".into(), json!(email));
                    }
                    outcome.accounts.push(UniqueAccount {
                        identity: unique_id,
                        uuid: uid.to_string(),
                        attributes,
                    });
                }
                Ok(None) => {
                    let error = format!(
                        "Failed to generate unique ID for {}",
                        identity.uid().unwrap_or(&identity.name)
                    );
                    log::error!("{error}");
                    outcome.errors.push(error);
                }
                Err(err) => {
                    log::error!("{err}");
                    outcome.errors.push(err.to_string());
                }
            },
        }
    }

    if !outcome.errors.is_empty() {
        notify::send_error_report(
            platform,
            &workflow,
            &source,
            pass::owner_email(&identities, &source.owner.id),
            &outcome.errors,
        );
    }

    Ok(outcome)
}

/// Find the identifier transform, creating the default one on first use.
/// Returns the transform name previews reference.
fn ensure_transform<P: IdentityPlatform + ?Sized>(
    platform: &P,
    config: &ConnectorConfig,
    source_name: &str,
) -> Result<String, ConnectorError> {
    let spec = TransformSpec::unique_id(source_name);
    let name = config
        .authoritative
        .as_ref()
        .and_then(|a| a.transform.clone())
        .unwrap_or_else(|| spec.name.clone());

    if platform.list_transforms()?.iter().any(|t| t.name == name) {
        return Ok(name);
    }
    log::info!("creating transform '{}'", spec.name);
    let created = platform.create_transform(&spec)?;
    Ok(created.name)
}

/// Preview the transform for one identity and de-collide with a numeric
/// suffix. `None` means the transform produced nothing for this identity.
fn mint_unique_id<P: IdentityPlatform + ?Sized>(
    platform: &P,
    identity: &Identity,
    current_ids: &[String],
    transform_name: &str,
) -> Result<Option<String>, ConnectorError> {
    let request = PreviewRequest::transform(&identity.id, UID_ATTR, transform_name);
    let preview = platform.preview_identity(&request)?;
    let Some(base) = preview.attribute_str(UID_ATTR) else {
        return Ok(None);
    };
    if base.is_empty() {
        return Ok(None);
    }

    let mut candidate = base.to_string();
    let mut counter = 1;
    while current_ids.iter().any(|id| id == &candidate) {
        candidate = format!("{base}{counter}");
        counter += 1;
    }
    Ok(Some(candidate))
}
