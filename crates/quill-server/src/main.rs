use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_api::session::SessionAuthority;
use quill_api::uploads::UploadStore;
use quill_api::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .init();

    // Config. A missing signing secret is fatal; there is no fallback.
    let jwt_secret =
        std::env::var("QUILL_JWT_SECRET").context("QUILL_JWT_SECRET must be set")?;
    let db_path = std::env::var("QUILL_DB_PATH").unwrap_or_else(|_| "quill.db".into());
    let upload_dir = std::env::var("QUILL_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let host = std::env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("QUILL_PORT")
        .unwrap_or_else(|_| "4000".into())
        .parse()?;

    // Init database and upload storage
    let db = quill_db::Database::open(&PathBuf::from(&db_path))?;
    let uploads = UploadStore::new(PathBuf::from(&upload_dir)).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions: SessionAuthority::new(&jwt_secret),
        uploads,
    });

    let app = quill_api::router(state)
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Quill server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
