use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use gunaso_api::auth::{self, AppState, AppStateInner};
use gunaso_api::complaints;
use gunaso_api::middleware::{jwt_secret_from_env, require_auth, require_authority};
use gunaso_api::uploads::{self, ImageHost};
use gunaso_api::verifications;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gunaso=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = jwt_secret_from_env();
    let db_path = std::env::var("GUNASO_DB_PATH").unwrap_or_else(|_| "gunaso.db".into());
    let host = std::env::var("GUNASO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("GUNASO_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;
    let upload_url = std::env::var("GUNASO_UPLOAD_URL")
        .unwrap_or_else(|_| "http://localhost:9000/upload".into());
    let upload_key = std::env::var("GUNASO_UPLOAD_KEY").unwrap_or_default();

    // Init database
    let db = gunaso_db::Database::open(&db_path)?;

    // Shared state
    let uploader = ImageHost::new(upload_url, upload_key);
    let app_state: AppState = Arc::new(AppStateInner { db, jwt_secret, uploader });

    // Routes
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/api/users/register", post(auth::register))
        .route("/api/users/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/api/users/profile", get(auth::profile))
        .route("/api/complaints", post(complaints::create_complaint))
        .route("/api/complaints/city/{city}", get(complaints::list_by_city))
        .route("/api/complaints/nearby", get(complaints::nearby))
        .route("/api/complaints/{id}", get(complaints::get_complaint))
        .route("/api/complaints/{id}/upvote", post(complaints::upvote))
        .route("/api/verifications", post(verifications::create_verification))
        .route(
            "/api/verifications/complaint/{complaint_id}",
            get(verifications::list_verifications),
        )
        .route(
            "/api/verifications/check/{complaint_id}",
            get(verifications::check_verification),
        )
        .route("/api/upload", post(uploads::upload_images))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state.clone());

    // Authority gate layered inside the auth gate
    let authority_routes = Router::new()
        .route("/api/complaints/{id}/status", patch(complaints::update_status))
        .layer(middleware::from_fn(require_authority))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(authority_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gunaso server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Gunaso API is running" }))
}
