// HTTP response utilities - JSON error bodies and status mapping
use crate::application::reading_manager::ManagerError;
use crate::application::reading_repository::StoreError;
use crate::application::user_service::AuthError;
use crate::domain::validation::ValidationErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation(errors) => ErrorBody {
                // Forms surface the first problem; the rest ride along.
                error: errors
                    .first()
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                details: errors.messages(),
            },
            ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::Internal(message) => ErrorBody {
                error: message.clone(),
                details: Vec::new(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(message) = &self {
            tracing::error!("Request failed: {}", message);
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<ManagerError> for ApiError {
    fn from(error: ManagerError) -> Self {
        match error {
            ManagerError::Validation(errors) => ApiError::Validation(errors),
            ManagerError::NotFound(_) => ApiError::NotFound(error.to_string()),
            ManagerError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(errors) => ApiError::Validation(errors),
            AuthError::UsernameExists => ApiError::Conflict(error.to_string()),
            AuthError::UserNotFound | AuthError::IncorrectPassword => {
                ApiError::Unauthorized(error.to_string())
            }
            AuthError::Hash(_) => ApiError::Internal(error.to_string()),
            AuthError::Store(e) => e.into(),
        }
    }
}
