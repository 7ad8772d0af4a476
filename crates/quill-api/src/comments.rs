use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use quill_db::models::CommentDelete;
use quill_types::api::{AddCommentRequest, Claims, CommentResponse};

use crate::auth::AppState;
use crate::error::{ApiError, Resource};
use crate::posts::{comment_response, fetch_post_response};

/// Appends a comment from any authenticated user and responds with the
/// updated post document.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest(
            "comment text must not be empty".to_string(),
        ));
    }

    let comment_id = Uuid::new_v4();
    let appended = state.db.add_comment(
        &comment_id.to_string(),
        &id.to_string(),
        &claims.sub.to_string(),
        text,
    )?;

    if !appended {
        return Err(ApiError::NotFound(Resource::Post));
    }

    let post = fetch_post_response(&state, &id.to_string())?
        .ok_or(ApiError::NotFound(Resource::Post))?;
    Ok(Json(post))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .get_comments(&id.to_string())?
        .ok_or(ApiError::NotFound(Resource::Post))?;

    let comments: Vec<CommentResponse> = rows.into_iter().map(comment_response).collect();
    Ok(Json(comments))
}

/// Removes a comment; only its author may do so. Responds with the updated
/// post document.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    match state.db.delete_comment(
        &id.to_string(),
        &comment_id.to_string(),
        &claims.sub.to_string(),
    )? {
        CommentDelete::Deleted => {
            let post = fetch_post_response(&state, &id.to_string())?
                .ok_or(ApiError::NotFound(Resource::Post))?;
            Ok(Json(post))
        }
        CommentDelete::PostMissing => Err(ApiError::NotFound(Resource::Post)),
        CommentDelete::CommentMissing => Err(ApiError::NotFound(Resource::Comment)),
        CommentDelete::NotOwner => Err(ApiError::NotOwner(Resource::Comment)),
    }
}
