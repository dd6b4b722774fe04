use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::service::SecretService;

use super::error::ApiError;
use super::handlers::{
    create_secrets_handler, get_secret_handler, health_handler, list_secrets_handler,
    local_secrets_handler, root_handler, sync_handler,
};

/// Header carrying the static API key on protected routes.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ApiState {
    pub service: SecretService,
    pub api_key: Arc<String>,
}

impl ApiState {
    pub fn new(service: SecretService, api_key: impl Into<String>) -> Self {
        Self { service, api_key: Arc::new(api_key.into()) }
    }
}

/// Reject requests whose `X-API-Key` header is missing or wrong before they
/// reach any handler.
async fn require_api_key(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing X-API-Key header"))?;

    if presented != state.api_key.as_str() {
        return Err(ApiError::unauthorized("Invalid API key"));
    }

    Ok(next.run(request).await)
}

/// Build the full router: open info/health routes plus the protected
/// secret routes behind the API-key middleware.
pub fn build_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/secrets", get(list_secrets_handler).post(create_secrets_handler))
        .route("/secrets/{name}", get(get_secret_handler))
        .route("/sync", post(sync_handler))
        .route("/local-secrets", get(local_secrets_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
