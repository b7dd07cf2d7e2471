use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRef, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::{
    archive::{ArchiveError, ArchiveUpload, ArchiveUploadRequest, ArchiveUploader},
    auth::{AuthenticatedUser, IdentityClient, OAuthProvider, User},
    config::AppConfig,
    error::{ApiError, ApiResult},
    generation::{GenerationRequest, GenerationResponse, ImageOrchestrator},
    providers::build_http_client,
    publish::{PublishRequest, Publisher},
    status::StatusReport,
    store::{ImageRecord, LocalRecordStore, Page, RecordStore},
};

/// Request body cap for routes carrying inline image data.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub orchestrator: Arc<ImageOrchestrator>,
    pub archive: Arc<ArchiveUploader>,
    pub records: Arc<dyn RecordStore>,
    pub publisher: Arc<Publisher>,
    pub identity: IdentityClient,
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let records: Arc<dyn RecordStore> = Arc::new(LocalRecordStore::new(config.data_dir.clone()));
        Self::with_records(config, records)
    }

    pub fn with_records(config: AppConfig, records: Arc<dyn RecordStore>) -> Self {
        let orchestrator = Arc::new(ImageOrchestrator::from_config(&config.providers));
        let archive = Arc::new(ArchiveUploader::new(config.archive.clone()));
        let publisher = Arc::new(Publisher::new(
            build_http_client(config.providers.timeout),
            archive.clone(),
            records.clone(),
        ));
        let identity = IdentityClient::new(config.identity.clone());
        // Never flips unless a shutdown signal is wired in.
        let (_, shutdown) = watch::channel(false);
        Self {
            config: Arc::new(config),
            orchestrator,
            archive,
            records,
            publisher,
            identity,
            shutdown,
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn production(&self) -> bool {
        self.config.is_production()
    }

    fn store_failure(&self, err: anyhow::Error) -> ApiError {
        ApiError::internal("Record store failure", err, self.production())
    }
}

impl FromRef<AppState> for IdentityClient {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/status", get(status))
        .route("/api/test", get(test_get).post(test_post))
        .route(
            "/api/upload-to-archive",
            post(upload_to_archive).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/images",
            get(list_images)
                .post(publish_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/images/public", get(list_public_images))
        .route("/api/images/{id}", delete(delete_image))
        .route("/api/images/{id}/likes", put(update_likes))
        .route("/api/me", get(me))
        .route("/auth/login/{provider}", get(login))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|err| ApiError::Validation(format!("Invalid request body: {err}")))
}

/// Malformed JSON is an internal fault here, not a validation error.
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<GenerationResponse>> {
    let value: Value = serde_json::from_slice(&body).map_err(|err| {
        ApiError::internal("Failed to generate image", anyhow!(err), state.production())
    })?;
    let request =
        GenerationRequest::from_json(&value).map_err(|err| ApiError::Validation(err.0))?;
    let response = state
        .orchestrator
        .generate_until(&request, &state.shutdown)
        .await;
    Ok(Json(response))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport::from_config(&state.config))
}

pub async fn test_get(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "API is working",
        "timestamp": Utc::now(),
        "environment": state.config.environment,
    }))
}

pub async fn test_post(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let received: Value = serde_json::from_slice(&body).map_err(|err| {
        ApiError::internal("Failed to read request body", anyhow!(err), state.production())
    })?;
    Ok(Json(json!({
        "success": true,
        "message": "POST request received",
        "receivedData": received,
        "timestamp": Utc::now(),
    })))
}

pub async fn upload_to_archive(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ArchiveUpload>> {
    if !state.archive.is_configured() {
        return Err(ArchiveError::NotConfigured.into());
    }
    let request: ArchiveUploadRequest = parse_json(&body)?;
    Ok(Json(state.archive.upload(request).await?))
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NotConfigured => ApiError::NotConfigured(err.to_string()),
            ArchiveError::InvalidInput(_) => ApiError::Validation(err.to_string()),
            ArchiveError::Upstream { .. } | ArchiveError::Transport(_) => {
                ApiError::Upstream(err.to_string())
            }
            ArchiveError::Signing(_) => ApiError::Internal {
                message: err.to_string(),
                details: None,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.limit, query.offset)
    }
}

pub async fn list_images(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<ImageRecord>>> {
    let records = state
        .records
        .list_for_user(&user.id, query.into())
        .await
        .map_err(|err| state.store_failure(err))?;
    Ok(Json(records))
}

pub async fn list_public_images(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<ImageRecord>>> {
    let records = state
        .records
        .list_public(query.into())
        .await
        .map_err(|err| state.store_failure(err))?;
    Ok(Json(records))
}

pub async fn publish_image(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ImageRecord>)> {
    let request: PublishRequest = parse_json(&body)?;
    request
        .validate()
        .map_err(|err| ApiError::Validation(err.0))?;
    let record = state
        .publisher
        .publish(&user, request)
        .await
        .map_err(|err| state.store_failure(err))?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
pub struct LikesUpdate {
    pub likes: u64,
}

async fn owned_record(state: &AppState, user: &User, id: &str) -> ApiResult<ImageRecord> {
    match state.records.get(id).await.map_err(|err| state.store_failure(err))? {
        Some(record) if record.user_id == user.id => Ok(record),
        _ => Err(ApiError::NotFound("Image not found".to_string())),
    }
}

pub async fn update_likes(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ImageRecord>> {
    let update: LikesUpdate = parse_json(&body)?;
    owned_record(&state, &user, &id).await?;
    state
        .records
        .update_likes(&id, update.likes)
        .await
        .map_err(|err| state.store_failure(err))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
    pub id: String,
}

pub async fn delete_image(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Deleted>> {
    owned_record(&state, &user, &id).await?;
    let removed = state
        .records
        .delete(&id)
        .await
        .map_err(|err| state.store_failure(err))?;
    if !removed {
        return Err(ApiError::NotFound("Image not found".to_string()));
    }
    Ok(Json(Deleted { success: true, id }))
}

pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

pub async fn login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let provider: OAuthProvider = provider.parse()?;
    let url = state.identity.login_url(provider)?;
    Ok(Redirect::to(url.as_str()))
}
