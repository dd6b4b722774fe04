//! Wire-level tests for the Bitwarden client against a mocked vault:
//! token exchange, list/get/create round-trips, and error mapping.

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bwsm::config::{Scope, VaultConfig};
use bwsm::errors::Error;
use bwsm::vault::{BitwardenClient, VaultApi};

const ORG_ID: &str = "11111111-1111-1111-1111-111111111111";
const PROJECT_ID: &str = "22222222-2222-2222-2222-222222222222";

fn client_for(server: &MockServer) -> BitwardenClient {
    let config = VaultConfig {
        access_token: "0.machine-client-id.machine-client-secret".to_string(),
        api_url: server.uri(),
        identity_url: server.uri(),
        timeout: Duration::from_secs(5),
    };
    let scope = Scope {
        organization_id: Uuid::parse_str(ORG_ID).unwrap(),
        project_id: Uuid::parse_str(PROJECT_ID).unwrap(),
    };
    BitwardenClient::new(config, scope).unwrap()
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=machine-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "test-bearer",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

async fn mount_identifier_list(server: &MockServer, entries: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/organizations/{}/secrets", ORG_ID)))
        .and(header("Authorization", "Bearer test-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "secrets": entries })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn list_secrets_fetches_details_for_each_identifier() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_identifier_list(
        &server,
        json!([
            {"id": "aaa", "key": "DB_PASS"},
            {"id": "bbb", "key": "API_KEY"}
        ]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/secrets/aaa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "aaa", "key": "DB_PASS", "value": "s3cr3t", "note": "prod db"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secrets/bbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "bbb", "key": "API_KEY", "value": "sk-123", "note": ""
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let secrets = client.list_secrets().await.unwrap();

    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets[0].key, "DB_PASS");
    assert_eq!(secrets[0].value, "s3cr3t");
    assert_eq!(secrets[0].note.as_deref(), Some("prod db"));
    assert_eq!(secrets[1].key, "API_KEY");
    assert!(secrets[1].note.is_none(), "empty notes are dropped");
}

#[tokio::test]
async fn get_secret_resolves_key_to_detail() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_identifier_list(&server, json!([{"id": "aaa", "key": "DB_PASS"}])).await;

    Mock::given(method("GET"))
        .and(path("/secrets/aaa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "aaa", "key": "DB_PASS", "value": "s3cr3t"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let secret = client.get_secret("DB_PASS").await.unwrap();
    assert_eq!(secret.id, "aaa");
    assert_eq!(secret.value, "s3cr3t");
}

#[tokio::test]
async fn get_secret_absent_key_is_not_found() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_identifier_list(&server, json!([])).await;

    let client = client_for(&server);
    let err = client.get_secret("MISSING").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn rejected_access_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_secrets().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn create_secret_posts_scope_and_returns_created() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_identifier_list(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path(format!("/organizations/{}/secrets", ORG_ID)))
        .and(header("Authorization", "Bearer test-bearer"))
        .and(body_partial_json(json!({
            "key": "DB_PASS",
            "value": "s3cr3t",
            "note": "prod db",
            "projectIds": [PROJECT_ID]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-id", "key": "DB_PASS", "value": "s3cr3t", "note": "prod db"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let secret = client.create_secret("DB_PASS", "s3cr3t", Some("prod db")).await.unwrap();
    assert_eq!(secret.id, "new-id");
    assert_eq!(secret.key, "DB_PASS");
}

#[tokio::test]
async fn create_existing_key_is_conflict_without_posting() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;
    mount_identifier_list(&server, json!([{"id": "aaa", "key": "DB_PASS"}])).await;

    // No POST mock mounted: a create attempt would 404 and surface as a
    // different error, so a Conflict proves the pre-check fired.
    let client = client_for(&server);
    let err = client.create_secret("DB_PASS", "new-value", None).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn create_empty_value_is_validation_error_without_any_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let err = client.create_secret("DB_PASS", "", None).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_bearer_token_is_refreshed_once() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    // First identifier call gets a 401; the retry after re-auth succeeds.
    Mock::given(method("GET"))
        .and(path(format!("/organizations/{}/secrets", ORG_ID)))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_identifier_list(&server, json!([])).await;

    let client = client_for(&server);
    let secrets = client.list_secrets().await.unwrap();
    assert!(secrets.is_empty());
}

#[tokio::test]
async fn persistent_401_after_refresh_is_auth_error() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server).await;

    // The vault rejects the bearer token on the first call and on the one
    // retry after refresh; that second 401 must surface as an auth error.
    Mock::given(method("GET"))
        .and(path(format!("/organizations/{}/secrets", ORG_ID)))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_secrets().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn unreachable_vault_is_transport_error() {
    // Nothing listens on this port.
    let config = VaultConfig {
        access_token: "0.machine-client-id.machine-client-secret".to_string(),
        api_url: "http://127.0.0.1:1".to_string(),
        identity_url: "http://127.0.0.1:1".to_string(),
        timeout: Duration::from_secs(1),
    };
    let scope = Scope {
        organization_id: Uuid::parse_str(ORG_ID).unwrap(),
        project_id: Uuid::parse_str(PROJECT_ID).unwrap(),
    };
    let client = BitwardenClient::new(config, scope).unwrap();

    let err = client.list_secrets().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
