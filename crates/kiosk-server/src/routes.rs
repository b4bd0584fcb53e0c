use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use kiosk_core::TracingCycleReporter;

use crate::auth::require_api_key;
use crate::dto::{
    CreateSourceRequest, CreateSourceResponse, ErrorResponse, HealthResponse, PutSettingRequest,
    SettingResponse, SnapshotResponse, SourceListResponse, SourceResponse, SourceSummaryResponse,
    StatusResponse, UpdateSourceRequest,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/snapshot", get(get_snapshot))
        .route("/v1/status", get(get_status))
        .route("/v1/refresh", post(refresh))
        .route("/v1/sources", get(list_sources))
        .route("/v1/sources", post(create_source))
        .route("/v1/sources/{id}", get(get_source))
        .route("/v1/sources/{id}", put(update_source))
        .route("/v1/sources/{id}", delete(delete_source))
        .route("/v1/settings/{key}", get(get_setting))
        .route("/v1/settings/{key}", put(put_setting))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Snapshot & status
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/snapshot",
    responses(
        (status = 200, description = "Latest published snapshot", body = SnapshotResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "feed"
)]
pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.scheduler.cycle().snapshot().load();
    axum::Json(SnapshotResponse::from((*snapshot).clone()))
}

#[utoipa::path(
    get,
    path = "/v1/status",
    responses(
        (status = 200, description = "Current cycle status", body = StatusResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "feed"
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.scheduler.cycle().status();
    axum::Json(StatusResponse::new(status.current(), status.indicator()))
}

#[utoipa::path(
    post,
    path = "/v1/refresh",
    responses(
        (status = 200, description = "Cycle ran; returns the fresh snapshot", body = SnapshotResponse),
        (status = 409, description = "A cycle is already running", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "feed"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    match state.scheduler.run_now(&TracingCycleReporter).await? {
        Some(snapshot) => Ok(axum::Json(SnapshotResponse::from(snapshot)).into_response()),
        None => {
            let body = ErrorResponse {
                error: "conflict".to_string(),
                message: "An update cycle is already running".to_string(),
            };
            Ok((StatusCode::CONFLICT, axum::Json(body)).into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/sources",
    responses(
        (status = 200, description = "All sources, scripts omitted", body = SourceListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn list_sources(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.db.source_repo().list_summaries().await?;
    let total = summaries.len();

    let response = SourceListResponse {
        sources: summaries
            .into_iter()
            .map(SourceSummaryResponse::from)
            .collect(),
        total,
    };

    Ok(axum::Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/sources",
    request_body = CreateSourceRequest,
    responses(
        (status = 201, description = "Source created", body = CreateSourceResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn create_source(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CreateSourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.db.source_repo().create(&body.into()).await?;
    Ok((
        StatusCode::CREATED,
        axum::Json(CreateSourceResponse { id }),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/sources/{id}",
    params(("id" = Uuid, Path, description = "Source ID")),
    responses(
        (status = 200, description = "Source details including its script", body = SourceResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn get_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.source_repo().read(id).await? {
        Some(source) => Ok(axum::Json(SourceResponse::from(source)).into_response()),
        None => {
            let body = ErrorResponse {
                error: "not_found".to_string(),
                message: format!("Source not found: {id}"),
            };
            Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response())
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/sources/{id}",
    params(("id" = Uuid, Path, description = "Source ID")),
    request_body = UpdateSourceRequest,
    responses(
        (status = 204, description = "Source replaced"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn update_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<UpdateSourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.source_repo().update(id, &body.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/v1/sources/{id}",
    params(("id" = Uuid, Path, description = "Source ID")),
    responses(
        (status = 204, description = "Source deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "sources"
)]
pub async fn delete_source(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.source_repo().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting value", body = SettingResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.settings_repo().get(&key).await? {
        Some(value) => Ok(axum::Json(SettingResponse { key, value }).into_response()),
        None => {
            let body = ErrorResponse {
                error: "not_found".to_string(),
                message: format!("Setting not found: {key}"),
            };
            Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response())
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = PutSettingRequest,
    responses(
        (status = 204, description = "Setting stored"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "settings"
)]
pub async fn put_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    axum::Json(body): axum::Json<PutSettingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.settings_repo().set(&key, body.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_status = match state.db.health_check().await {
        Ok(()) => "ok",
        Err(_) => "error",
    };

    let status = if db_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if db_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        },
        database: db_status,
    };

    (status, axum::Json(response))
}
