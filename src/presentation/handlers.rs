// HTTP request handlers
use crate::application::reading_manager::{ReadingKey, ReadingManager};
use crate::domain::reading::WaterReading;
use crate::domain::summary::Summary;
use crate::domain::validation::{
    validate_new_reading, validate_profile_reading, validate_registration, Measurements,
    ReadingEdit, ReadingInput,
};
use crate::domain::warning::{classify, worst, Severity, Warning};
use crate::infrastructure::http_response::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// A stored reading with its warnings re-derived for display.
#[derive(Debug, Serialize)]
pub struct ReadingView {
    #[serde(flatten)]
    pub reading: WaterReading,
    pub warnings: [Warning; 3],
    pub status: Severity,
}

impl From<&WaterReading> for ReadingView {
    fn from(reading: &WaterReading) -> Self {
        let warnings = classify(reading.ph, reading.temperature, reading.ammonia);
        Self {
            status: worst(&warnings),
            warnings,
            reading: reading.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub profile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyQuery {
    pub ph: f64,
    pub temperature: f64,
    pub ammonia: f64,
}

/// Runs `f` against the reading manager of the session named in the
/// `Authorization: Bearer <token>` header, on the blocking pool since every
/// manager call may touch the file.
async fn with_manager<T, F>(state: &AppState, headers: &HeaderMap, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut ReadingManager) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let token = bearer_token(headers)?;
    let manager = state
        .sessions
        .get(&token)
        .ok_or_else(|| ApiError::Unauthorized("Session expired. Please log in again.".to_string()))?;
    blocking(move || {
        let mut guard = manager.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    })
    .await
}

/// File I/O and password hashing stay off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Worker task failed: {}", e)))?
}

fn bearer_token(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
        .ok_or_else(|| ApiError::Unauthorized("Please log in first.".to_string()))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if let Some(confirm) = &request.confirm_password {
        validate_registration(request.username.trim(), &request.password, confirm)?;
    }
    let service = state.user_service.clone();
    blocking(move || Ok(service.register(&request.username, &request.password)?)).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful!".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, username) = blocking(move || {
        let service = &state.user_service;
        let username = service.authenticate(&request.username, &request.password)?;
        let token = state
            .sessions
            .open(&username, || service.open_manager(&username))?;
        tracing::debug!(
            "{} active session(s) across {} user(s)",
            state.sessions.len(),
            state.sessions.users()
        );
        Ok((token, username))
    })
    .await?;

    Ok(Json(LoginResponse {
        token,
        username,
        message: "Login successful!".to_string(),
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;
    if state.sessions.close(&token) {
        tracing::debug!("Session closed, {} remaining", state.sessions.len());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// History table, optionally narrowed to one profile.
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Vec<ReadingView>>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let profile = query.profile.as_deref().unwrap_or_default();
        Ok(Json(
            manager
                .readings_for(profile)
                .into_iter()
                .map(ReadingView::from)
                .collect(),
        ))
    })
    .await
}

/// First reading of a new profile.
pub async fn create_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<ReadingInput>,
) -> Result<(StatusCode, Json<ReadingView>), ApiError> {
    with_manager(&state, &headers, move |manager| {
        let validated = validate_new_reading(&input, &manager.profile_names())?;
        let added = manager.add(validated.into_reading())?;
        Ok((StatusCode::CREATED, Json(ReadingView::from(added))))
    })
    .await
}

/// Follow-up reading for a profile that already exists.
pub async fn append_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(profile): Path<String>,
    Json(measurements): Json<Measurements>,
) -> Result<(StatusCode, Json<ReadingView>), ApiError> {
    with_manager(&state, &headers, move |manager| {
        let validated =
            validate_profile_reading(&profile, &measurements, &manager.profile_names())?;
        let added = manager.add(validated.into_reading())?;
        Ok((StatusCode::CREATED, Json(ReadingView::from(added))))
    })
    .await
}

pub async fn update_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(edit): Json<ReadingEdit>,
) -> Result<Json<ReadingView>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let updated = manager.update(&ReadingKey::Id(id), edit)?;
        Ok(Json(ReadingView::from(updated)))
    })
    .await
}

pub async fn delete_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<RemovedResponse>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let removed = manager.delete(&ReadingKey::Id(id))?;
        Ok(Json(RemovedResponse { removed }))
    })
    .await
}

/// `?timestamp=` deletes every row with that exact timestamp; without it the
/// whole history is cleared.
pub async fn delete_readings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<RemovedResponse>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let removed = match query.timestamp {
            Some(timestamp) => manager.delete(&ReadingKey::Timestamp(timestamp))?,
            None => {
                let count = manager.get_all().len();
                manager.clear()?;
                count
            }
        };
        Ok(Json(RemovedResponse { removed }))
    })
    .await
}

pub async fn reading_warnings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<[Warning; 3]>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let key = ReadingKey::Id(id);
        let reading = manager
            .find(&key)
            .ok_or_else(|| ApiError::NotFound(format!("No reading found for {}", key)))?;
        Ok(Json(classify(reading.ph, reading.temperature, reading.ammonia)))
    })
    .await
}

pub async fn classify_values(Query(query): Query<ClassifyQuery>) -> Json<[Warning; 3]> {
    Json(classify(query.ph, query.temperature, query.ammonia))
}

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<String>>, ApiError> {
    with_manager(&state, &headers, move |manager| Ok(Json(manager.profile_names())))
    .await
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Summary>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let summary = match query.profile.as_deref() {
            Some(profile) => {
                let readings: Vec<WaterReading> =
                    manager.readings_for(profile).into_iter().cloned().collect();
                Summary::of(&readings)
            }
            None => Summary::of(manager.get_all()),
        };
        Ok(Json(summary))
    })
    .await
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CountResponse>, ApiError> {
    with_manager(&state, &headers, move |manager| {
        let count = manager.refresh()?;
        Ok(Json(CountResponse { count }))
    })
    .await
}
