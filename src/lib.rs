pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod state;
pub mod validate;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::identity::google::GoogleProvider;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};

/// Build the application with the Google identity provider from `config`.
pub fn build_app(pool: PgPool, config: Config) -> Result<(Router, SharedState), String> {
    let google = GoogleProvider::new(&config.google)?;
    Ok(build_app_with_identity(pool, config, Arc::new(google)))
}

pub fn build_app_with_identity(
    pool: PgPool,
    config: Config,
    identity: Arc<dyn IdentityProvider>,
) -> (Router, SharedState) {
    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        identity,
        login_limiter: LoginRateLimiter::new(),
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http())
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
