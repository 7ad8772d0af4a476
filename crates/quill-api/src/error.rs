use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use quill_types::api::ApiMessage;

/// Session verification failures. All of them surface as 401; the split
/// exists so logs (and tests) can tell an expired token from a forged one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing session token")]
    Missing,
    #[error("invalid session token")]
    Invalid,
    #[error("session token expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Post,
    Comment,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Resource::User => "user",
            Resource::Post => "post",
            Resource::Comment => "comment",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("you are not the owner of this {0}")]
    NotOwner(Resource),
    #[error("you have already liked this post")]
    AlreadyLiked,
    #[error("signup failed: username already taken")]
    UsernameTaken,
    #[error("{0}")]
    BadRequest(String),
    #[error("storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::InvalidCredentials => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::NotOwner(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::AlreadyLiked => (StatusCode::BAD_REQUEST, self.to_string()),
            // Signup reports duplicate usernames as a server error; clients
            // treat any signup failure uniformly.
            ApiError::UsernameTaken => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Store(e) => {
                tracing::error!("storage error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiMessage { message })).into_response()
    }
}
