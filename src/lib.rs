pub mod auth;
pub mod cli;
pub mod composition;
pub mod config;
pub mod db;
pub mod deadline;
pub mod error;
pub mod media;
pub mod models;
pub mod pagination;
pub mod recipes;
pub mod relations;
pub mod routes;
pub mod shopping_list;
pub mod views;

use axum::http::{header, HeaderValue};
use axum::{middleware::from_fn_with_state, routing::get, Router};
use sqlx::SqlitePool;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Level;

use crate::config::Config;
use crate::media::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub images: ImageStore,
    pub page_size: i64,
}

async fn health() -> &'static str {
    "ok"
}

/// Assembles the API router over an already-migrated pool.
///
/// The session table lives in the same database and is created here.
pub async fn build_app(pool: SqlitePool, config: &Config) -> Result<Router, sqlx::Error> {
    let session_store = SqliteStore::new(pool.clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(30)))
        .with_secure(config.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax);

    let images = ImageStore::new(&config.media_root);
    let media_service = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400"),
        ))
        .service(ServeDir::new(images.root()));

    let state = AppState {
        db: pool,
        images,
        page_size: config.page_size,
    };

    Ok(Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::tags::router())
        .merge(routes::ingredients::router())
        .merge(routes::shopping_list::router())
        .merge(routes::recipes::router())
        .nest_service(ImageStore::URL_PREFIX, media_service)
        .layer(session_layer)
        .layer(from_fn_with_state(
            std::time::Duration::from_secs(config.request_timeout_secs),
            deadline::enforce,
        ))
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state))
}
