//! Bob HTTP server
//!
//! Routes:
//! - `GET /health`
//! - `POST /docker-build`, `POST /jobs` (JSON job spec)
//! - `POST /docker-build/github` (push events, HMAC signature when a secret is set)
//! - `POST /docker-build/travis` (build completion, form field `payload`)
//! - `GET /jobs`, `GET /jobs/{id}`, `GET /jobs/{id}/tail?n=`

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::time::Instant;

/// ルーターを構築
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut protected = Router::new()
        .route("/docker-build", post(handlers::docker_build))
        .route("/jobs", get(handlers::list_jobs).post(handlers::docker_build))
        .route("/jobs/{id}", get(handlers::get_job))
        .route("/jobs/{id}/tail", get(handlers::tail_job));
    // シークレット未設定時は Basic 認証で保護
    if config.github_enabled && config.github_secret().is_none() {
        protected = protected.route("/docker-build/github", post(handlers::github));
    }
    let protected =
        protected.route_layer(middleware::from_fn_with_state(state.clone(), auth::basic_auth));

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected);

    if config.github_enabled && config.github_secret().is_some() {
        app = app.merge(
            Router::new()
                .route("/docker-build/github", post(handlers::github))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::github_auth,
                )),
        );
    }

    if config.travis_enabled {
        app = app.merge(
            Router::new()
                .route("/docker-build/travis", post(handlers::travis))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::travis_auth,
                )),
        );
    }

    app.layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    if path != "/health" {
        tracing::info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request handled"
        );
    }
    response
}

/// サーバーを起動（終了シグナルまでブロック）
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr = state.config.bind_addr();
    for warning in state.config.warnings() {
        tracing::warn!("{}", warning);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %addr,
        github = state.config.github_enabled,
        travis = state.config.travis_enabled,
        "Server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
}
