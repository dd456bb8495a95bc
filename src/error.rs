use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Request-scoped failures. Nothing here is fatal to the process; each
/// variant maps to the status code the presentation layer should see.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("This username is already taken. Please choose another.")]
    UsernameTaken,
    #[error("{0}")]
    Validation(String),
    #[error("Not found.")]
    NotFound,
    #[error("Not authenticated.")]
    Unauthorized,
    #[error("Too many messages. Please wait a moment.")]
    RateLimited,
    #[error("Your IP has been blocked due to spam.")]
    Blocked,
    #[error("{0}")]
    RejectedContent(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UsernameTaken | Self::Validation(_) | Self::RejectedContent(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::Blocked => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Internal(err) = &self {
            tracing::error!("internal error: {err:?}");
            return (status, Json(json!({ "success": false, "error": "Internal error." })))
                .into_response();
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
