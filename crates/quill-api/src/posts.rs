use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use quill_db::models::{CommentRow, PostPatch, PostRow};
use quill_types::api::{ApiMessage, AuthorInfo, Claims, CommentResponse, PostResponse};

use crate::auth::AppState;
use crate::error::{ApiError, Resource};
use crate::middleware::require_ownership;

/// The most-recent listing is capped at this many posts.
const LIST_LIMIT: u32 = 20;

/// Fields collected from a multipart post form. Creation requires the file
/// and title; updates treat every field as optional (merge-patch).
#[derive(Default)]
struct PostForm {
    title: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("cover").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read file: {}", e)))?;
                form.file = Some((filename, data.to_vec()));
            }
            "title" | "summary" | "content" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read {} field: {}", name, e))
                })?;
                match name.as_str() {
                    "title" => form.title = Some(value),
                    "summary" => form.summary = Some(value),
                    _ => form.content = Some(value),
                }
            }
            // unknown fields are ignored
            _ => {}
        }
    }

    Ok(form)
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_post_form(multipart).await?;

    let (filename, data) = form
        .file
        .ok_or_else(|| ApiError::BadRequest("cover file is required".to_string()))?;
    let title = form
        .title
        .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?;
    let summary = form.summary.unwrap_or_default();
    let content = form.content.unwrap_or_default();

    let cover = state.uploads.store(&filename, &data).await?;

    let post_id = Uuid::new_v4();
    state.db.create_post(
        &post_id.to_string(),
        &title,
        &summary,
        &content,
        &cover,
        &claims.sub.to_string(),
    )?;

    let post = fetch_post_response(&state, &post_id.to_string())?
        .ok_or(ApiError::NotFound(Resource::Post))?;
    Ok(Json(post))
}

pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // Run the blocking DB queries off the async runtime
    let db = state.clone();
    let (rows, like_rows, comment_rows) = tokio::task::spawn_blocking(move || {
        let rows = db.db.list_recent_posts(LIST_LIMIT)?;

        let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let like_rows = db.db.likes_for_posts(&post_ids)?;
        let comment_rows = db.db.comments_for_posts(&post_ids)?;

        Ok::<_, anyhow::Error>((rows, like_rows, comment_rows))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    // Group likes and comments by post id (cheap in-memory work)
    let mut likes_by_post: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in like_rows {
        likes_by_post
            .entry(like.post_id)
            .or_default()
            .push(parse_id(&like.user_id, "liker user_id"));
    }

    let mut comments_by_post: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for row in comment_rows {
        comments_by_post
            .entry(row.post_id.clone())
            .or_default()
            .push(comment_response(row));
    }

    let posts: Vec<PostResponse> = rows
        .into_iter()
        .map(|row| {
            let liked_by = likes_by_post.remove(&row.id).unwrap_or_default();
            let comments = comments_by_post.remove(&row.id).unwrap_or_default();
            post_response(row, liked_by, comments)
        })
        .collect();

    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = fetch_post_response(&state, &id.to_string())?
        .ok_or(ApiError::NotFound(Resource::Post))?;
    Ok(Json(post))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = id.to_string();

    // Both checks must pass before anything is written
    let existing = state
        .db
        .get_post(&post_id)?
        .ok_or(ApiError::NotFound(Resource::Post))?;
    require_ownership(&claims, &existing.author_id, Resource::Post)?;

    let form = read_post_form(multipart).await?;

    let cover = match form.file {
        Some((filename, data)) => Some(state.uploads.store(&filename, &data).await?),
        None => None,
    };

    let patch = PostPatch {
        title: form.title,
        summary: form.summary,
        content: form.content,
        cover,
    };

    if !state.db.update_post(&post_id, &patch)? {
        return Err(ApiError::NotFound(Resource::Post));
    }

    let post =
        fetch_post_response(&state, &post_id)?.ok_or(ApiError::NotFound(Resource::Post))?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = id.to_string();

    let existing = state
        .db
        .get_post(&post_id)?
        .ok_or(ApiError::NotFound(Resource::Post))?;
    require_ownership(&claims, &existing.author_id, Resource::Post)?;

    if !state.db.delete_post(&post_id)? {
        return Err(ApiError::NotFound(Resource::Post));
    }

    Ok(Json(ApiMessage {
        message: "Post deleted successfully".to_string(),
    }))
}

/// Assembles the full post document (author, like-set, comments) the way
/// clients expect it. None if the post does not exist.
pub(crate) fn fetch_post_response(
    state: &AppState,
    post_id: &str,
) -> Result<Option<PostResponse>, ApiError> {
    let Some(row) = state.db.get_post(post_id)? else {
        return Ok(None);
    };

    let ids = vec![row.id.clone()];
    let liked_by: Vec<Uuid> = state
        .db
        .likes_for_posts(&ids)?
        .into_iter()
        .map(|like| parse_id(&like.user_id, "liker user_id"))
        .collect();
    let comments: Vec<CommentResponse> = state
        .db
        .comments_for_posts(&ids)?
        .into_iter()
        .map(comment_response)
        .collect();

    Ok(Some(post_response(row, liked_by, comments)))
}

fn post_response(row: PostRow, liked_by: Vec<Uuid>, comments: Vec<CommentResponse>) -> PostResponse {
    PostResponse {
        id: parse_id(&row.id, "post id"),
        title: row.title,
        summary: row.summary,
        content: row.content,
        cover: row.cover,
        author: AuthorInfo {
            id: parse_id(&row.author_id, "author_id"),
            username: row.author_username,
        },
        created_at: parse_timestamp(&row.created_at),
        likes: row.like_count.max(0) as u64,
        liked_by,
        comments,
    }
}

pub(crate) fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_id(&row.id, "comment id"),
        author_id: parse_id(&row.author_id, "comment author_id"),
        author_username: row.author_username,
        text: row.text,
        created_at: parse_timestamp(&row.created_at),
    }
}

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without a
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            chrono::DateTime::default()
        })
}
