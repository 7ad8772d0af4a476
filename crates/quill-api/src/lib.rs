pub mod auth;
pub mod comments;
pub mod error;
pub mod likes;
pub mod middleware;
pub mod posts;
pub mod session;
pub mod uploads;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{delete, get, post, put},
};

use quill_types::api::ApiMessage;

pub use auth::{AppState, AppStateInner};

/// Builds the full application router. Mutating routes sit behind the
/// session middleware; reads are public.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/allposts", get(posts::list_posts))
        .route("/post/{id}", get(posts::get_post))
        .route("/post/{id}/comments", get(comments::get_comments))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/profile", get(auth::profile))
        .route("/post", post(posts::create_post))
        .route("/post/{id}", put(posts::update_post).delete(posts::delete_post))
        .route("/post/{id}/like", post(likes::like_post))
        .route("/post/{id}/comment", post(comments::add_comment))
        .route(
            "/post/{id}/comment/{comment_id}",
            delete(comments::delete_comment),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
}

async fn not_found() -> (StatusCode, Json<ApiMessage>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiMessage {
            message: "Endpoint not found".to_string(),
        }),
    )
}
