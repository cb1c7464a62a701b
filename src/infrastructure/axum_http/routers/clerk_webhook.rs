use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::{
    clerk,
    config::config_model::DotEnvyConfig,
    domain::repositories::users::UserRepository,
    infrastructure::{
        axum_http::error_responses::error_response,
        postgres::{postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
    },
    usecases::clerk_webhook::ClerkWebhookUseCase,
};

pub struct ClerkWebhookState<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    usecase: ClerkWebhookUseCase<U>,
    webhook_secret: Option<String>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_repo = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));

    let state = Arc::new(ClerkWebhookState {
        usecase: ClerkWebhookUseCase::new(user_repo),
        webhook_secret: config.clerk.webhook_secret.clone(),
    });

    Router::new()
        .route("/clerk", post(receive::<UserPostgres>))
        .with_state(state)
}

/// Svix-signed delivery endpoint. The raw body is needed for signature
/// verification, so the payload is taken as bytes and parsed afterwards.
pub async fn receive<U>(
    State(state): State<Arc<ClerkWebhookState<U>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
{
    let Some(secret) = state.webhook_secret.as_deref() else {
        warn!("clerk webhook router: CLERK_WEBHOOK_SECRET is not configured");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "webhook is not configured",
            None,
        );
    };

    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());
    let (Some(message_id), Some(timestamp), Some(signature)) = (
        header("svix-id"),
        header("svix-timestamp"),
        header("svix-signature"),
    ) else {
        warn!("clerk webhook router: missing svix headers");
        return error_response(StatusCode::BAD_REQUEST, "missing svix headers", None);
    };

    let event = match clerk::verify_webhook_signature(secret, message_id, timestamp, signature, &body)
    {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "clerk webhook router: verification failed");
            return error_response(StatusCode::BAD_REQUEST, "invalid webhook signature", None);
        }
    };

    match state.usecase.handle(event).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => {
            error!(error = %err, "clerk webhook router: event handling failed");
            error_response(err.status_code(), "Internal server error", None)
        }
    }
}
