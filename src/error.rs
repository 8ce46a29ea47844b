use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy for the HTTP API. Every handler failure is converted
/// into one of these and rendered as `{success:false, error, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Duplicate email or account already verified.
    #[error("{0}")]
    Conflict(String),

    /// No user record for the given identity.
    #[error("{0}")]
    NotFound(String),

    /// Bad credentials, bad session token or OTP mismatch.
    #[error("{0}")]
    Auth(String),

    /// OTP past its stored expiry.
    #[error("{0}")]
    Expired(String),

    /// Anything unexpected: hashing, signing, database, mail delivery.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
    pub fn expired(msg: impl Into<String>) -> Self {
        Self::Expired(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Auth(_) => "auth",
            Self::Expired(_) => "expired",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Expired(_) => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            // Internal causes are logged, not leaked to the client.
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = json!({
            "success": false,
            "error": self.kind(),
            "message": message,
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(
            ApiError::validation("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::auth("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::expired("x").status(), StatusCode::GONE);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_carries_kind_and_message() {
        let resp = ApiError::conflict("Email already registered").into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_hides_cause_from_message() {
        let err = ApiError::Internal(anyhow::anyhow!("secret db dsn"));
        assert_eq!(err.kind(), "internal");
        // IntoResponse replaces the message; the Display impl still shows it
        // for logs.
        assert!(err.to_string().contains("secret"));
    }
}
