use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    domain::repositories::{
        payments::PaymentRepository, subscriptions::SubscriptionRepository, users::UserRepository,
    },
    infrastructure::{
        axum_http::error_responses::error_response,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{
                payments::PaymentPostgres, subscriptions::SubscriptionPostgres,
                users::UserPostgres,
            },
        },
    },
    payments::toss_client::TossClient,
    usecases::{
        billing_sweep::BillingSweepUseCase,
        subscriptions::{BillingGateway, SubscriptionError, SubscriptionUseCase},
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub auth_key: String,
    pub customer_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub billing_key: String,
    pub customer_key: String,
    pub user_id: String,
    pub amount: Option<i32>,
    /// Known by some service callers; spares the billing-key lookup.
    pub subscription_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    pub success: bool,
    pub payment_key: String,
    pub order_id: String,
}

pub struct SweepRouterState<U, S, P, B>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    usecase: BillingSweepUseCase<U, S, P, B>,
    cron_secret: Option<String>,
}

type SubscriptionUseCasePostgres =
    SubscriptionUseCase<UserPostgres, SubscriptionPostgres, PaymentPostgres, TossClient>;
type SweepStatePostgres =
    SweepRouterState<UserPostgres, SubscriptionPostgres, PaymentPostgres, TossClient>;

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_repo = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let subscription_repo = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let payment_repo = Arc::new(PaymentPostgres::new(Arc::clone(&db_pool)));
    let billing = Arc::new(TossClient::new(config.toss.secret_key.clone()));

    let subscription_usecase: Arc<SubscriptionUseCasePostgres> =
        Arc::new(SubscriptionUseCase::new(
            user_repo,
            Arc::clone(&subscription_repo),
            payment_repo,
            Arc::clone(&billing),
        ));

    let sweep_state: Arc<SweepStatePostgres> = Arc::new(SweepRouterState {
        usecase: BillingSweepUseCase::new(
            Arc::clone(&subscription_usecase),
            subscription_repo,
            billing,
        ),
        cron_secret: config.billing.cron_secret.clone(),
    });

    Router::new()
        .route("/", get(subscription_info))
        .route("/confirm", post(confirm))
        .route("/charge", post(charge))
        .route("/cancel", post(cancel))
        .route("/resume", post(resume))
        .with_state(subscription_usecase)
        .merge(
            Router::new()
                .route("/process", post(process))
                .with_state(sweep_state),
        )
}

fn subscription_error_response(err: SubscriptionError) -> axum::response::Response {
    let status = err.status_code();
    let code = err.provider_code().map(|code| code.to_string());
    if status.is_server_error() {
        error!(error = %err, "subscriptions router: request failed");
        return error_response(status, "Internal server error", None);
    }
    error_response(status, err.to_string(), code.as_deref())
}

pub async fn confirm<U, S, P, B>(
    State(usecase): State<Arc<SubscriptionUseCase<U, S, P, B>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(payload): Json<ConfirmRequest>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    match usecase
        .create_subscription(&user_id, &payload.auth_key, &payload.customer_key)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => subscription_error_response(err),
    }
}

// Internal billing endpoint; callers hold the billing key itself, so there
// is no session here.
pub async fn charge<U, S, P, B>(
    State(usecase): State<Arc<SubscriptionUseCase<U, S, P, B>>>,
    Json(payload): Json<ChargeRequest>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    let amount = payload
        .amount
        .unwrap_or(crate::domain::value_objects::subscriptions::SUBSCRIPTION_PRICE_KRW);

    match usecase
        .charge_subscription(
            &payload.billing_key,
            &payload.customer_key,
            amount,
            &payload.user_id,
            payload.subscription_id,
        )
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ChargeResponse {
                success: true,
                payment_key: outcome.payment_key,
                order_id: outcome.order_id,
            }),
        )
            .into_response(),
        Err(err) => subscription_error_response(err),
    }
}

pub async fn cancel<U, S, P, B>(
    State(usecase): State<Arc<SubscriptionUseCase<U, S, P, B>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    match usecase.cancel_subscription(&user_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => subscription_error_response(err),
    }
}

pub async fn resume<U, S, P, B>(
    State(usecase): State<Arc<SubscriptionUseCase<U, S, P, B>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    match usecase.resume_subscription(&user_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => subscription_error_response(err),
    }
}

pub async fn subscription_info<U, S, P, B>(
    State(usecase): State<Arc<SubscriptionUseCase<U, S, P, B>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    match usecase.get_subscription_info(&user_id).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(err) => subscription_error_response(err),
    }
}

/// Cron entry point for the daily sweep, guarded by a shared secret header.
pub async fn process<U, S, P, B>(
    State(state): State<Arc<SweepRouterState<U, S, P, B>>>,
    headers: HeaderMap,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    B: BillingGateway + Send + Sync + 'static,
{
    let Some(expected) = state.cron_secret.as_deref() else {
        warn!("subscriptions router: CRON_SECRET is not configured");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "billing sweep is not configured",
            None,
        );
    };

    let provided = headers
        .get("x-cron-secret")
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        warn!("subscriptions router: cron secret mismatch");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized", None);
    }

    match state.usecase.run(Utc::now().date_naive()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => {
            error!(error = ?err, "subscriptions router: billing sweep failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
        }
    }
}
