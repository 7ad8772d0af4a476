use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use quill_db::models::LikeOutcome;
use quill_types::api::{Claims, LikeResponse};

use crate::auth::AppState;
use crate::error::{ApiError, Resource};

/// The like transition. Any authenticated user may like any post, at most
/// once; there is deliberately no unlike.
pub async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    match state
        .db
        .like_post(&id.to_string(), &claims.sub.to_string())?
    {
        LikeOutcome::Liked { likes } => Ok(Json(LikeResponse { likes })),
        LikeOutcome::AlreadyLiked => Err(ApiError::AlreadyLiked),
        LikeOutcome::PostMissing => Err(ApiError::NotFound(Resource::Post)),
    }
}
