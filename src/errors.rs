use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Wrong credentials")]
    WrongCredentials,

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Password too short")]
    WeakPassword,

    #[error("Token creation error")]
    TokenCreation,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "A user with this email already exists",
            ),
            AuthError::WrongCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password"),
            AuthError::MissingCredentials => {
                (StatusCode::BAD_REQUEST, "Email and password are required")
            }
            AuthError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 8 characters",
            ),
            AuthError::TokenCreation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate session",
            ),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired session"),
            AuthError::AccountDisabled => (StatusCode::FORBIDDEN, "This account is disabled"),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to do this",
            ),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred",
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Errors returned by the JSON API and the redirect endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// Expired or exhausted resources.
    #[error("{0}")]
    Gone(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Unique violations become 409 and foreign key violations 400; anything
    /// else is an internal error.
    pub fn from_write(e: anyhow::Error, conflict: &str) -> Self {
        match e.downcast_ref::<sqlx::Error>() {
            Some(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Self::Conflict(conflict.to_string())
            }
            Some(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Self::Validation("referenced resource does not exist".into())
            }
            _ => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(e) => return e.into_response(),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound { resource } => {
                (StatusCode::NOT_FOUND, format!("{resource} not found"))
            }
            ApiError::Gone(reason) => (StatusCode::GONE, reason.to_string()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_is_400_with_message() {
        let response = ApiError::validation("name must not be empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "name must not be empty"
        );
    }

    #[tokio::test]
    async fn not_found_and_gone() {
        let response = ApiError::not_found("QR code").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "QR code not found");

        let response = ApiError::Gone("QR code has expired").into_response();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "An unexpected error occurred"
        );
    }

    #[tokio::test]
    async fn auth_errors_keep_their_status() {
        let response = ApiError::from(AuthError::Forbidden).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ApiError::from(AuthError::InvalidToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn non_constraint_write_errors_are_internal() {
        let err = ApiError::from_write(sqlx::Error::RowNotFound.into(), "taken");
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
