// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::services::CatalogueError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    InvalidCredential(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict {
        message: String,
        game_id: Option<i64>,
    },

    // 500 Internal Server Error
    InternalError(String),

    // 502 Bad Gateway (external service issues)
    UpstreamUnavailable(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidCredential(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict { message, .. } => message,
            ApiError::InternalError(msg) => msg,
            ApiError::UpstreamUnavailable(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Stable machine-readable kind for client handling
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::InvalidCredential(_) => "invalid_credential",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::InternalError(_) => "internal_error",
            ApiError::UpstreamUnavailable(_) => "upstream_unavailable",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::Conflict {
                message,
                game_id: Some(game_id),
            } => json!({
                "error": self.kind(),
                "message": message,
                "game_id": game_id
            }),
            _ => json!({
                "error": self.kind(),
                "message": self.message()
            }),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_credential(message: impl Into<String>) -> Self {
        ApiError::InvalidCredential(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>, game_id: Option<i64>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            game_id,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        ApiError::InternalError(message.into())
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        ApiError::UpstreamUnavailable(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(permission) => {
                ApiError::forbidden(format!("Permission '{}' is required", permission))
            }
            AuthError::KeyMaterial(msg) => {
                tracing::error!("Signing key material unavailable: {}", msg);
                ApiError::service_unavailable("Identity verification is unavailable")
            }
            other => ApiError::invalid_credential(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => ApiError::not_found(msg),
            StoreError::Conflict { message, game_id } => ApiError::conflict(message, game_id),
            StoreError::Database(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_error("An error occurred while processing your request")
            }
            StoreError::Unavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<CatalogueError> for ApiError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::NotFound(id) => ApiError::not_found(format!("Game {} not found", id)),
            CatalogueError::MissingCredentials => {
                tracing::error!("Game catalogue credentials are not configured");
                ApiError::upstream_unavailable("Game catalogue is not available")
            }
            CatalogueError::Upstream(msg) => {
                tracing::warn!("Game catalogue request failed: {}", msg);
                ApiError::upstream_unavailable("Game catalogue is not available")
            }
            CatalogueError::Decode(msg) => {
                tracing::warn!("Game catalogue returned an unexpected payload: {}", msg);
                ApiError::upstream_unavailable("Game catalogue returned an unexpected response")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_body_carries_existing_game_id() {
        let err = ApiError::conflict("Game already exists", Some(7));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_json()["error"], "conflict");
        assert_eq!(err.to_json()["game_id"], 7);
    }

    #[test]
    fn database_errors_are_masked() {
        let err: ApiError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("pool"));
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let err: ApiError = AuthError::MissingPermission("delete:games".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.kind(), "forbidden");
    }
}
