//! Governance platform API client.
//!
//! Blocking reqwest client (no Tokio runtime required).
//! Authenticates once with client credentials, then exposes the identity,
//! account, form, workflow and transform operations the drivers run on.
//! Transient failures (429, 5xx, network) are retried with exponential
//! backoff before surfacing.

use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;

use idbridge_engine::model::{Account, FormDefinition, FormInstance, Identity, Source, Workflow};
use idbridge_engine::review::ReviewState;

use crate::error::PlatformError;
use crate::types::{
    Email, FormInstanceRequest, PreviewRequest, PreviewResponse, TransformRead, TransformSpec,
    WorkflowRequest,
};

const PAGE_LIMIT: usize = 250;
const MAX_RETRIES: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Platform API client (blocking).
#[derive(Clone, Debug)]
pub struct PlatformClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: String,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(serde::Deserialize)]
struct FormDefinitionPage {
    #[serde(default)]
    results: Vec<FormDefinition>,
}

impl PlatformClient {
    /// Authenticate with client credentials and return a ready client.
    pub fn connect(
        base_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self, PlatformError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("idbridge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let response = http
            .post(format!("{base_url}/oauth/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(PlatformError::Auth(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse =
            response.json().map_err(|e| PlatformError::Parse(e.to_string()))?;

        Ok(Self { http, base_url, token: token.access_token })
    }

    // ---------- Identities ----------

    /// All identities on the tenant, accounts nested.
    pub fn list_identities(&self) -> Result<Vec<Identity>, PlatformError> {
        self.search_identities("*")
    }

    /// Run an identity search query, following `searchAfter` pagination.
    pub fn search_identities(&self, query: &str) -> Result<Vec<Identity>, PlatformError> {
        log::debug!("searching identities: {query}");
        let mut all: Vec<Identity> = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut body = json!({
                "indices": ["identities"],
                "query": { "query": query },
                "sort": ["id"],
                "includeNested": true,
            });
            if let Some(last) = &after {
                body["searchAfter"] = json!([last]);
            }
            let response = self.send(|| {
                self.http
                    .post(self.url("/v3/search"))
                    .query(&[("limit", PAGE_LIMIT.to_string())])
                    .json(&body)
            })?;
            let page: Vec<Identity> = Self::parse(response)?;
            let n = page.len();
            after = page.last().map(|i| i.id.clone());
            all.extend(page);
            if n < PAGE_LIMIT {
                return Ok(all);
            }
        }
    }

    // ---------- Sources ----------

    pub fn get_source(&self, id: &str) -> Result<Source, PlatformError> {
        let response = self.send(|| self.http.get(self.url(&format!("/v3/sources/{id}"))))?;
        Self::parse(response)
    }

    // ---------- Accounts ----------

    /// Accounts matching a filter expression, offset-paginated.
    pub fn list_accounts(&self, filters: Option<&str>) -> Result<Vec<Account>, PlatformError> {
        let mut extra = Vec::new();
        if let Some(f) = filters {
            extra.push(("filters", f.to_string()));
        }
        self.get_paged("/v3/accounts", &extra)
    }

    /// All uncorrelated accounts on the tenant.
    pub fn list_uncorrelated_accounts(&self) -> Result<Vec<Account>, PlatformError> {
        self.list_accounts(Some("uncorrelated eq true"))
    }

    /// Link an account to an identity.
    pub fn correlate_account(
        &self,
        account_id: &str,
        identity_id: &str,
    ) -> Result<Account, PlatformError> {
        log::debug!("correlating account {account_id} to identity {identity_id}");
        let body = json!([{ "op": "replace", "path": "/identityId", "value": identity_id }]);
        let response = self.send(|| {
            self.http
                .patch(self.url(&format!("/v3/accounts/{account_id}")))
                .header("Content-Type", "application/json-patch+json")
                .json(&body)
        })?;
        Self::parse(response)
    }

    // ---------- Form definitions ----------

    pub fn list_form_definitions(&self) -> Result<Vec<FormDefinition>, PlatformError> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let response = self.send(|| {
                self.http.get(self.url("/beta/form-definitions")).query(&[
                    ("limit", PAGE_LIMIT.to_string()),
                    ("offset", offset.to_string()),
                ])
            })?;
            let page: FormDefinitionPage = Self::parse(response)?;
            let n = page.results.len();
            all.extend(page.results);
            if n < PAGE_LIMIT {
                return Ok(all);
            }
            offset += n;
        }
    }

    pub fn create_form_definition(
        &self,
        form: &idbridge_engine::form::FormSpec,
    ) -> Result<FormDefinition, PlatformError> {
        let response = self.send(|| self.http.post(self.url("/beta/form-definitions")).json(form))?;
        Self::parse(response)
    }

    pub fn delete_form_definition(&self, id: &str) -> Result<(), PlatformError> {
        log::debug!("deleting form definition {id}");
        self.send(|| self.http.delete(self.url(&format!("/beta/form-definitions/{id}"))))?;
        Ok(())
    }

    // ---------- Form instances ----------

    pub fn list_form_instances(&self) -> Result<Vec<FormInstance>, PlatformError> {
        self.get_paged("/beta/form-instances", &[])
    }

    pub fn create_form_instance(
        &self,
        request: &FormInstanceRequest,
    ) -> Result<FormInstance, PlatformError> {
        let response =
            self.send(|| self.http.post(self.url("/beta/form-instances")).json(request))?;
        Self::parse(response)
    }

    pub fn set_form_instance_state(
        &self,
        id: &str,
        state: ReviewState,
    ) -> Result<FormInstance, PlatformError> {
        log::debug!("setting form instance {id} state to {state}");
        let body = json!([{ "op": "replace", "path": "/state", "value": state }]);
        let response = self.send(|| {
            self.http
                .patch(self.url(&format!("/beta/form-instances/{id}")))
                .header("Content-Type", "application/json-patch+json")
                .json(&body)
        })?;
        Self::parse(response)
    }

    // ---------- Workflows ----------

    pub fn list_workflows(&self) -> Result<Vec<Workflow>, PlatformError> {
        let response = self.send(|| self.http.get(self.url("/beta/workflows")))?;
        Self::parse(response)
    }

    pub fn create_workflow(&self, workflow: &WorkflowRequest) -> Result<Workflow, PlatformError> {
        let response = self.send(|| self.http.post(self.url("/beta/workflows")).json(workflow))?;
        Self::parse(response)
    }

    /// Fire a workflow once with test input. Used to send notification email
    /// through the email sender workflow.
    pub fn test_workflow(&self, id: &str, email: &Email) -> Result<(), PlatformError> {
        let body = json!({ "input": email });
        self.send(|| {
            self.http.post(self.url(&format!("/beta/workflows/{id}/test"))).json(&body)
        })?;
        Ok(())
    }

    // ---------- Transforms ----------

    pub fn list_transforms(&self) -> Result<Vec<TransformRead>, PlatformError> {
        self.get_paged("/v3/transforms", &[])
    }

    pub fn create_transform(&self, spec: &TransformSpec) -> Result<TransformRead, PlatformError> {
        let response = self.send(|| self.http.post(self.url("/v3/transforms")).json(spec))?;
        Self::parse(response)
    }

    // ---------- Identity preview ----------

    /// Preview identity attributes through a transform without applying it.
    pub fn preview_identity(
        &self,
        request: &PreviewRequest,
    ) -> Result<PreviewResponse, PlatformError> {
        let response = self.send(|| {
            self.http.post(self.url("/beta/identity-profiles/identity-preview")).json(request)
        })?;
        Self::parse(response)
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<T>, PlatformError> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let mut query: Vec<(&str, String)> =
                vec![("limit", PAGE_LIMIT.to_string()), ("offset", offset.to_string())];
            query.extend(extra.iter().map(|(k, v)| (*k, v.clone())));
            let response = self.send(|| self.http.get(self.url(path)).query(&query))?;
            let page: Vec<T> = Self::parse(response)?;
            let n = page.len();
            all.extend(page);
            if n < PAGE_LIMIT {
                return Ok(all);
            }
            offset += n;
        }
    }

    /// Send a request, retrying transient failures with exponential backoff.
    fn send<F>(&self, build: F) -> Result<reqwest::blocking::Response, PlatformError>
    where
        F: Fn() -> reqwest::blocking::RequestBuilder,
    {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 0;
        loop {
            let result = build().bearer_auth(&self.token).send();
            let error = match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().unwrap_or_default();
                    match status {
                        400 | 422 => return Err(PlatformError::Validation(body)),
                        404 => return Err(PlatformError::NotFound(body)),
                        _ => PlatformError::Http(status, body),
                    }
                }
                Err(e) => PlatformError::Network(e.to_string()),
            };

            if !error.is_retryable() || attempt >= MAX_RETRIES {
                return Err(error);
            }
            attempt += 1;
            log::warn!("retrying after transient failure (attempt {attempt}): {error}");
            thread::sleep(delay);
            delay *= 2;
        }
    }

    fn parse<T: DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<T, PlatformError> {
        response.json::<T>().map_err(|e| PlatformError::Parse(e.to_string()))
    }
}
