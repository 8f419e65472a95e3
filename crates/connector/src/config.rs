use serde::Deserialize;

use crate::error::ConnectorError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ConnectorConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub merging: Option<ReconciliationConfig>,
    #[serde(default)]
    pub orphan: Option<ReconciliationConfig>,
    #[serde(default)]
    pub authoritative: Option<AuthoritativeConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Tenant API base URL.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Id of the virtual source the passes write their records to.
    pub source_id: String,
}

/// Shared shape of the merging and orphan pass sections.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Identity attributes compared when matching.
    pub attributes: Vec<String>,
    /// Unique identifiers of the identities deciding reviews.
    pub reviewers: Vec<String>,
    /// Days until an open review form expires.
    #[serde(default = "default_expiration_days")]
    pub expiration_days: u32,
    /// Similarity threshold in percent; candidates at or above it go to review.
    pub score: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthoritativeConfig {
    /// Name of an existing transform to generate identifiers with. When
    /// absent a default transform is created from the source name.
    #[serde(default)]
    pub transform: Option<String>,
}

fn default_expiration_days() -> u32 {
    7
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl ConnectorConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConnectorError> {
        let config: ConnectorConfig =
            toml::from_str(raw).map_err(|e| ConnectorError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConnectorError> {
        let conn = &self.connection;
        for (field, value) in [
            ("connection.base_url", &conn.base_url),
            ("connection.client_id", &conn.client_id),
            ("connection.client_secret", &conn.client_secret),
            ("connection.source_id", &conn.source_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConnectorError::ConfigValidation(format!("{field} must not be empty")));
            }
        }

        if let Some(merging) = &self.merging {
            merging.validate("merging")?;
        }
        if let Some(orphan) = &self.orphan {
            orphan.validate("orphan")?;
        }
        Ok(())
    }

    /// The `[merging]` section, required for the merging pass.
    pub fn merging(&self) -> Result<&ReconciliationConfig, ConnectorError> {
        self.merging
            .as_ref()
            .ok_or_else(|| ConnectorError::ConfigValidation("missing [merging] section".into()))
    }

    /// The `[orphan]` section, required for the orphan pass.
    pub fn orphan(&self) -> Result<&ReconciliationConfig, ConnectorError> {
        self.orphan
            .as_ref()
            .ok_or_else(|| ConnectorError::ConfigValidation("missing [orphan] section".into()))
    }
}

impl ReconciliationConfig {
    fn validate(&self, section: &str) -> Result<(), ConnectorError> {
        if self.attributes.is_empty() {
            return Err(ConnectorError::ConfigValidation(format!(
                "{section}.attributes must list at least one attribute"
            )));
        }
        if self.reviewers.is_empty() {
            return Err(ConnectorError::ConfigValidation(format!(
                "{section}.reviewers must list at least one reviewer"
            )));
        }
        if self.expiration_days == 0 {
            return Err(ConnectorError::ConfigValidation(format!(
                "{section}.expiration_days must be at least 1"
            )));
        }
        if self.score > 100 {
            return Err(ConnectorError::ConfigValidation(format!(
                "{section}.score must be between 0 and 100"
            )));
        }
        Ok(())
    }
}
