use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session claims --

/// JWT claims shared between the session authority (issuance) and the
/// auth middleware (verification). Canonical definition lives here in
/// quill-types to eliminate duplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
}

// -- Posts --

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub cover: String,
    pub author: AuthorInfo,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub likes: u64,
    pub liked_by: Vec<Uuid>,
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Serialize)]
pub struct AuthorInfo {
    pub id: Uuid,
    pub username: String,
}

// -- Likes --

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub likes: u64,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Generic message body (logout, errors) --

#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub message: String,
}
