//! Bitwarden Secrets Manager HTTP client.
//!
//! Talks to the two Bitwarden endpoints directly instead of going through
//! the vendor SDK: the identity service exchanges the machine account access
//! token for a bearer token, and the Secrets Manager API serves the actual
//! list/get/create calls.
//!
//! The bearer token is acquired lazily on first use and cached for the
//! process lifetime; a 401 from the API invalidates it and triggers exactly
//! one re-authentication before the call is surfaced as an error.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Scope, VaultConfig};
use crate::errors::{Error, Result};

use super::client::VaultApi;
use super::types::Secret;

/// HTTP client for the Bitwarden Secrets Manager API.
pub struct BitwardenClient {
    http: reqwest::Client,
    config: VaultConfig,
    scope: Scope,
    bearer: RwLock<Option<String>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SecretIdentifiersResponse {
    #[serde(default)]
    secrets: Vec<SecretIdentifier>,
}

#[derive(Deserialize)]
struct SecretIdentifier {
    id: String,
    key: String,
}

#[derive(Deserialize)]
struct SecretDetail {
    id: String,
    key: String,
    value: String,
    #[serde(default)]
    note: Option<String>,
}

impl From<SecretDetail> for Secret {
    fn from(detail: SecretDetail) -> Self {
        let note = detail.note.filter(|n| !n.is_empty());
        Secret { id: detail.id, key: detail.key, value: detail.value, note }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSecretRequest<'a> {
    key: &'a str,
    value: &'a str,
    note: &'a str,
    project_ids: Vec<Uuid>,
}

impl BitwardenClient {
    /// Create a new client for the given credentials and scope.
    pub fn new(config: VaultConfig, scope: Scope) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, scope, bearer: RwLock::new(None) })
    }

    /// Split a machine account access token into its client credentials.
    ///
    /// Tokens look like `0.<client_id>.<client_secret>`; the secret part may
    /// carry a `:<encryption_key>` suffix that the token exchange does not
    /// want.
    fn client_credentials(&self) -> Result<(String, String)> {
        let token = self.config.access_token.trim();
        let mut parts = token.splitn(3, '.');
        let (version, client_id, client_secret) =
            match (parts.next(), parts.next(), parts.next()) {
                (Some(v), Some(id), Some(secret)) => (v, id, secret),
                _ => {
                    return Err(Error::auth(
                        "Access token is malformed, expected '0.<client_id>.<client_secret>'",
                    ))
                }
            };

        if version != "0" || client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::auth(
                "Access token is malformed, expected '0.<client_id>.<client_secret>'",
            ));
        }

        let client_secret = client_secret.split(':').next().unwrap_or(client_secret);
        Ok((client_id.to_string(), client_secret.to_string()))
    }

    /// Exchange the access token for a bearer token at the identity service.
    async fn authenticate(&self) -> Result<String> {
        let (client_id, client_secret) = self.client_credentials()?;
        let url = format!("{}/connect/token", self.config.identity_url);
        debug!(url = %url, "Authenticating with identity service");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", "api.secrets"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The identity service reports bad credentials as 400/401.
            return Err(Error::auth(format!(
                "Identity service rejected the access token (status {})",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("Malformed token response: {}", e)))?;
        Ok(token.access_token)
    }

    /// Return the cached bearer token, authenticating if necessary.
    async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.bearer.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut guard = self.bearer.write().await;
        // Another task may have authenticated while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn invalidate_token(&self) {
        *self.bearer.write().await = None;
        debug!("Invalidated cached bearer token");
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.bearer_token().await?;
        let mut response = self.http.get(url).bearer_auth(&token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let token = self.refreshed_token().await?;
            response = self.http.get(url).bearer_auth(&token).send().await?;
        }
        handle_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let token = self.bearer_token().await?;
        let mut response = self.http.post(url).bearer_auth(&token).json(body).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let token = self.refreshed_token().await?;
            response = self.http.post(url).bearer_auth(&token).json(body).send().await?;
        }
        handle_response(response).await
    }

    /// Drop the cached bearer token and acquire a fresh one.
    ///
    /// Called on a 401 from the API; the follow-up request is the one and
    /// only retry, and a second 401 surfaces through [`handle_response`].
    async fn refreshed_token(&self) -> Result<String> {
        warn!("Vault returned 401, refreshing bearer token");
        self.invalidate_token().await;
        self.bearer_token().await
    }

    /// List the key/id pairs visible in the organization.
    async fn list_identifiers(&self) -> Result<Vec<SecretIdentifier>> {
        let url = format!(
            "{}/organizations/{}/secrets",
            self.config.api_url, self.scope.organization_id
        );
        let response: SecretIdentifiersResponse = self.get_json(&url).await?;
        Ok(response.secrets)
    }

    /// Fetch the full record for one secret id.
    async fn fetch_detail(&self, id: &str) -> Result<Secret> {
        let url = format!("{}/secrets/{}", self.config.api_url, id);
        let detail: SecretDetail = self.get_json(&url).await?;
        Ok(detail.into())
    }
}

/// Map a vault response to a result, translating error statuses into the
/// crate taxonomy.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| Error::transport(format!("Malformed vault response: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        format!("Vault returned status {}", status.as_u16())
    } else {
        format!("Vault returned status {}: {}", status.as_u16(), truncate(&body, 200))
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT => Error::conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::validation(message),
        _ => Error::transport(message),
    })
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl VaultApi for BitwardenClient {
    async fn list_secrets(&self) -> Result<Vec<Secret>> {
        let identifiers = self.list_identifiers().await?;
        debug!(count = identifiers.len(), "Listed secret identifiers");

        // The list endpoint only returns identifiers; values require one
        // detail call per secret.
        let mut secrets = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            secrets.push(self.fetch_detail(&identifier.id).await?);
        }
        Ok(secrets)
    }

    async fn get_secret(&self, key: &str) -> Result<Secret> {
        let identifiers = self.list_identifiers().await?;
        let identifier = identifiers
            .into_iter()
            .find(|s| s.key == key)
            .ok_or_else(|| Error::not_found(key))?;
        self.fetch_detail(&identifier.id).await
    }

    async fn create_secret(&self, key: &str, value: &str, note: Option<&str>) -> Result<Secret> {
        if value.is_empty() {
            return Err(Error::validation("Secret value cannot be empty"));
        }

        // The vault does not enforce key uniqueness itself, so check the
        // identifier list first to honor the no-duplicates contract.
        let identifiers = self.list_identifiers().await?;
        if identifiers.iter().any(|s| s.key == key) {
            return Err(Error::conflict(format!("Secret with key '{}' already exists", key)));
        }

        let url = format!(
            "{}/organizations/{}/secrets",
            self.config.api_url, self.scope.organization_id
        );
        let request = CreateSecretRequest {
            key,
            value,
            note: note.unwrap_or(""),
            project_ids: vec![self.scope.project_id],
        };
        let detail: SecretDetail = self.post_json(&url, &request).await?;
        debug!(key = %key, "Created secret in vault");
        Ok(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client_with_token(token: &str) -> BitwardenClient {
        let config = VaultConfig {
            access_token: token.to_string(),
            api_url: "https://api.bitwarden.com".to_string(),
            identity_url: "https://identity.bitwarden.com".to_string(),
            timeout: Duration::from_secs(10),
        };
        let scope = Scope {
            organization_id: Uuid::nil(),
            project_id: Uuid::nil(),
        };
        BitwardenClient::new(config, scope).unwrap()
    }

    #[test]
    fn test_client_credentials_parsing() {
        let client = client_with_token("0.client-id.client-secret");
        let (id, secret) = client.client_credentials().unwrap();
        assert_eq!(id, "client-id");
        assert_eq!(secret, "client-secret");
    }

    #[test]
    fn test_client_credentials_strips_encryption_key() {
        let client = client_with_token("0.client-id.client-secret:enc-key");
        let (_, secret) = client.client_credentials().unwrap();
        assert_eq!(secret, "client-secret");
    }

    #[test]
    fn test_client_credentials_rejects_malformed() {
        for token in ["", "garbage", "1.id.secret", "0..secret", "0.id."] {
            let client = client_with_token(token);
            let err = client.client_credentials().unwrap_err();
            assert!(matches!(err, Error::Auth(_)), "token '{}' should be rejected", token);
        }
    }

    #[test]
    fn test_detail_conversion_drops_empty_note() {
        let detail = SecretDetail {
            id: "abc".to_string(),
            key: "K".to_string(),
            value: "v".to_string(),
            note: Some(String::new()),
        };
        let secret: Secret = detail.into();
        assert!(secret.note.is_none());
    }
}
