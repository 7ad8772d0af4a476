use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::header, response::IntoResponse};
use uuid::Uuid;

use quill_db::Database;
use quill_types::api::{
    ApiMessage, Claims, LoginRequest, LoginResponse, ProfileResponse, SignupRequest,
    SignupResponse, UserResponse,
};

use crate::error::ApiError;
use crate::session::{self, SessionAuthority};
use crate::uploads::UploadStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionAuthority,
    pub uploads: UploadStore,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    // Pre-check for a stable message; the UNIQUE constraint still backs this
    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::UsernameTaken);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), &req.username, &password_hash)?;

    Ok(Json(SignupResponse {
        user: UserResponse {
            id: user_id,
            username: req.username,
            created_at: chrono::Utc::now(),
        },
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for '{}': {}", user.username, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = state.sessions.issue(user_id, &user.username)?;
    let cookie = session::create_cookie(token.clone());

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse {
            id: user_id,
            username: user.username,
            token,
        }),
    ))
}

/// Echoes the verified claims; deliberately no store lookup.
pub async fn profile(Extension(claims): Extension<Claims>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        id: claims.sub,
        username: claims.username,
    })
}

/// The authority has no revoke operation; logout just tells the client to
/// drop the cookie.
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, session::clear_cookie().to_string())],
        Json(ApiMessage {
            message: "Logged out successfully".to_string(),
        }),
    )
}
