use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use validator::Validate;

use crate::vault::Secret;
use crate::VERSION;

use super::error::ApiError;
use super::routes::ApiState;

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SecretResponse {
    pub id: String,
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<Secret> for SecretResponse {
    fn from(secret: Secret) -> Self {
        Self { id: secret.id, key: secret.key, value: secret.value, note: secret.note }
    }
}

#[derive(Debug, Serialize)]
pub struct SecretListResponse {
    pub secrets: Vec<SecretResponse>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSecretItem {
    #[validate(length(min = 1, message = "key cannot be empty"))]
    pub key: String,

    #[validate(length(min = 1, message = "value cannot be empty"))]
    pub value: String,

    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSecretsBody {
    #[validate(length(min = 1, message = "secrets cannot be empty"), nested)]
    pub secrets: Vec<CreateSecretItem>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct LocalSecretsResponse {
    pub secrets: BTreeMap<String, SecretResponse>,
}

/// `GET /` — service info, no auth.
pub async fn root_handler() -> Json<InfoResponse> {
    Json(InfoResponse { message: "Bitwarden Secrets Manager bridge", version: VERSION })
}

/// `GET /health` — liveness probe, no auth.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// `GET /secrets` — list everything from the vault.
pub async fn list_secrets_handler(
    State(state): State<ApiState>,
) -> Result<Json<SecretListResponse>, ApiError> {
    let secrets = state.service.list().await?;
    Ok(Json(SecretListResponse { secrets: secrets.into_iter().map(Into::into).collect() }))
}

/// `GET /secrets/{name}` — fetch one secret, snapshot fallback included.
pub async fn get_secret_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<SecretResponse>, ApiError> {
    let secret = state.service.get(&name).await?;
    Ok(Json(secret.into()))
}

/// `POST /secrets` — create each secret in the batch, in order, fail-fast.
pub async fn create_secrets_handler(
    State(state): State<ApiState>,
    Json(payload): Json<CreateSecretsBody>,
) -> Result<(StatusCode, Json<SecretListResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::validation(e.to_string()))?;

    let mut created = Vec::with_capacity(payload.secrets.len());
    for item in &payload.secrets {
        let secret =
            state.service.create(&item.key, &item.value, item.note.as_deref()).await?;
        created.push(secret.into());
    }

    info!(count = created.len(), "Created secrets via API");
    Ok((StatusCode::CREATED, Json(SecretListResponse { secrets: created })))
}

/// `POST /sync` — pull all vault secrets into the local snapshot.
pub async fn sync_handler(State(state): State<ApiState>) -> Result<Json<SyncResponse>, ApiError> {
    let count = state.service.sync().await?;
    Ok(Json(SyncResponse {
        message: "Successfully synced secrets to local snapshot".to_string(),
        count,
    }))
}

/// `GET /local-secrets` — read the snapshot only, no vault call.
pub async fn local_secrets_handler(
    State(state): State<ApiState>,
) -> Result<Json<LocalSecretsResponse>, ApiError> {
    let snapshot = state.service.local().await?;
    let secrets = snapshot
        .iter()
        .map(|s| (s.key.clone(), SecretResponse::from(s.clone())))
        .collect();
    Ok(Json(LocalSecretsResponse { secrets }))
}
