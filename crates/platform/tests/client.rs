//! Wire-level tests for `PlatformClient` against a mock server.

use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

use idbridge_platform::types::{Email, FormInstanceRequest};
use idbridge_platform::{PlatformClient, PlatformError};

use idbridge_engine::model::{FormDefinition, FormInputRef};
use idbridge_engine::review::ReviewState;

fn connected(server: &MockServer) -> PlatformClient {
    server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(200).json_body(json!({ "access_token": "tok-1", "token_type": "bearer" }));
    });
    PlatformClient::connect(&server.base_url(), "client-id", "client-secret").unwrap()
}

#[test]
fn connect_exchanges_client_credentials() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .body_contains("grant_type=client_credentials")
            .body_contains("client_id=client-id");
        then.status(200).json_body(json!({ "access_token": "tok-1" }));
    });

    PlatformClient::connect(&server.base_url(), "client-id", "client-secret").unwrap();
    token.assert();
}

#[test]
fn connect_maps_rejection_to_auth_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/oauth/token");
        then.status(401).body("invalid_client");
    });

    let err = PlatformClient::connect(&server.base_url(), "bad", "creds").unwrap_err();
    assert!(matches!(err, PlatformError::Auth(_)));
}

#[test]
fn search_sends_bearer_token_and_query() {
    let server = MockServer::start();
    let client = connected(&server);

    let search = server.mock(|when, then| {
        when.method(POST)
            .path("/v3/search")
            .header("authorization", "Bearer tok-1")
            .json_body_partial(r#"{ "indices": ["identities"], "query": { "query": "*" } }"#);
        then.status(200).json_body(json!([
            { "id": "id-1", "name": "jane.doe", "attributes": { "uid": "jane.doe" } },
            { "id": "id-2", "name": "john.roe" },
        ]));
    });

    let identities = client.list_identities().unwrap();
    search.assert();
    assert_eq!(identities.len(), 2);
    assert_eq!(identities[0].uid(), Some("jane.doe"));
}

#[test]
fn uncorrelated_accounts_use_a_filter() {
    let server = MockServer::start();
    let client = connected(&server);

    let accounts = server.mock(|when, then| {
        when.method(GET)
            .path("/v3/accounts")
            .query_param("filters", "uncorrelated eq true");
        then.status(200).json_body(json!([
            { "id": "acc-1", "nativeIdentity": "u1", "sourceId": "src-ad", "uncorrelated": true },
        ]));
    });

    let found = client.list_uncorrelated_accounts().unwrap();
    accounts.assert();
    assert_eq!(found.len(), 1);
    assert!(found[0].uncorrelated);
}

#[test]
fn correlate_patches_identity_id() {
    let server = MockServer::start();
    let client = connected(&server);

    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/v3/accounts/acc-1")
            .json_body(json!([{ "op": "replace", "path": "/identityId", "value": "id-9" }]));
        then.status(200).json_body(json!({
            "id": "acc-1",
            "nativeIdentity": "u1",
            "sourceId": "src-ad",
            "identityId": "id-9",
            "uncorrelated": false,
        }));
    });

    let account = client.correlate_account("acc-1", "id-9").unwrap();
    patch.assert();
    assert_eq!(account.identity_id.as_deref(), Some("id-9"));
}

#[test]
fn form_instance_lifecycle() {
    let server = MockServer::start();
    let client = connected(&server);

    let definition = FormDefinition {
        id: "fd-1".into(),
        name: "Identity merge - jane.doe".into(),
        form_input: vec![FormInputRef { id: "id".into(), description: Some("entity-1".into()) }],
    };
    let request = FormInstanceRequest::new(
        &definition,
        &["rev-1".into()],
        "src-virtual",
        "2024-03-08T12:00:00Z".into(),
    );

    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/beta/form-instances")
            .json_body_partial(r#"{ "formDefinitionId": "fd-1", "standAloneForm": true }"#);
        then.status(200).json_body(json!({
            "id": "fi-1",
            "formDefinitionId": "fd-1",
            "state": "ASSIGNED",
            "standAloneFormUrl": "https://forms/fi-1",
        }));
    });
    let cancel = server.mock(|when, then| {
        when.method(PATCH)
            .path("/beta/form-instances/fi-1")
            .json_body(json!([{ "op": "replace", "path": "/state", "value": "CANCELLED" }]));
        then.status(200).json_body(json!({
            "id": "fi-1",
            "formDefinitionId": "fd-1",
            "state": "CANCELLED",
        }));
    });

    let instance = client.create_form_instance(&request).unwrap();
    assert_eq!(instance.state, ReviewState::Assigned);

    let cancelled = client.set_form_instance_state("fi-1", ReviewState::Cancelled).unwrap();
    assert_eq!(cancelled.state, ReviewState::Cancelled);

    create.assert();
    cancel.assert();
}

#[test]
fn workflow_test_carries_email_input() {
    let server = MockServer::start();
    let client = connected(&server);

    let test = server.mock(|when, then| {
        when.method(POST).path("/beta/workflows/wf-1/test").json_body(json!({
            "input": {
                "recipients": ["rev@corp.example"],
                "subject": "Identity merge - jane.doe",
                "body": "https://forms/fi-1",
            }
        }));
        then.status(200).json_body(json!({ "workflowExecutionId": "we-1" }));
    });

    let email = Email::review(
        "Identity merge - jane.doe",
        "https://forms/fi-1",
        vec!["rev@corp.example".into()],
    );
    client.test_workflow("wf-1", &email).unwrap();
    test.assert();
}

#[test]
fn validation_errors_do_not_retry() {
    let server = MockServer::start();
    let client = connected(&server);

    let bad = server.mock(|when, then| {
        when.method(GET).path("/v3/sources/src-x");
        then.status(400).body("bad filter");
    });

    let err = client.get_source("src-x").unwrap_err();
    assert!(matches!(err, PlatformError::Validation(_)));
    bad.assert_hits(1);
}
