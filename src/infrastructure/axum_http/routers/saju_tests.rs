use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{saju_tests::SajuTestRepository, users::UserRepository},
        value_objects::saju::SajuInput,
    },
    generation::gemini_client::GeminiClient,
    infrastructure::{
        axum_http::error_responses::error_response,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{saju_tests::SajuTestPostgres, users::UserPostgres},
        },
    },
    usecases::saju_tests::{GenerationGateway, SajuTestError, SajuTestUseCase},
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_repo = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let saju_test_repo = Arc::new(SajuTestPostgres::new(Arc::clone(&db_pool)));
    let generation = Arc::new(GeminiClient::new(config.gemini.api_key.clone()));

    let usecase = Arc::new(SajuTestUseCase::new(user_repo, saju_test_repo, generation));

    Router::new()
        .route(
            "/",
            get(list::<UserPostgres, SajuTestPostgres, GeminiClient>)
                .post(create::<UserPostgres, SajuTestPostgres, GeminiClient>),
        )
        .route(
            "/:test_id",
            get(get_one::<UserPostgres, SajuTestPostgres, GeminiClient>)
                .delete(delete_one::<UserPostgres, SajuTestPostgres, GeminiClient>),
        )
        .with_state(usecase)
}

fn saju_test_error_response(err: SajuTestError) -> axum::response::Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "saju tests router: request failed");
        return error_response(status, "Internal server error", None);
    }
    error_response(status, err.to_string(), err.error_code())
}

pub async fn create<U, T, G>(
    State(usecase): State<Arc<SajuTestUseCase<U, T, G>>>,
    AuthUser { user_id, email }: AuthUser,
    Json(input): Json<SajuInput>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    T: SajuTestRepository + Send + Sync + 'static,
    G: GenerationGateway + Send + Sync + 'static,
{
    match usecase
        .create_test(&user_id, email.as_deref(), input)
        .await
    {
        Ok(dto) => (StatusCode::CREATED, Json(dto)).into_response(),
        Err(err) => saju_test_error_response(err),
    }
}

pub async fn list<U, T, G>(
    State(usecase): State<Arc<SajuTestUseCase<U, T, G>>>,
    AuthUser { user_id, .. }: AuthUser,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    T: SajuTestRepository + Send + Sync + 'static,
    G: GenerationGateway + Send + Sync + 'static,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    match usecase.list_tests(&user_id, limit, offset).await {
        Ok(tests) => (StatusCode::OK, Json(tests)).into_response(),
        Err(err) => saju_test_error_response(err),
    }
}

pub async fn get_one<U, T, G>(
    State(usecase): State<Arc<SajuTestUseCase<U, T, G>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(test_id): Path<Uuid>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    T: SajuTestRepository + Send + Sync + 'static,
    G: GenerationGateway + Send + Sync + 'static,
{
    match usecase.get_test(test_id, &user_id).await {
        Ok(dto) => (StatusCode::OK, Json(dto)).into_response(),
        Err(err) => saju_test_error_response(err),
    }
}

pub async fn delete_one<U, T, G>(
    State(usecase): State<Arc<SajuTestUseCase<U, T, G>>>,
    AuthUser { user_id, .. }: AuthUser,
    Path(test_id): Path<Uuid>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    T: SajuTestRepository + Send + Sync + 'static,
    G: GenerationGateway + Send + Sync + 'static,
{
    match usecase.delete_test(test_id, &user_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => saju_test_error_response(err),
    }
}
