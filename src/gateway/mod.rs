pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::middleware::session_auth_middleware;
use state::AppState;

/// Build the HTTP router.
///
/// | Route | Auth |
/// |---|---|
/// | `GET /health` | no |
/// | `POST /auth/register`, `POST /auth/login` | no |
/// | `POST /auth/logout`, `GET /me`, `GET /wallet`, `POST /wallet/transfer` | bearer + session |
pub fn create_app(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public Routes (no auth required)
    // ==========================================================================
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/register", post(crate::user_auth::handlers::register))
        .route("/auth/login", post(crate::user_auth::handlers::login));

    // ==========================================================================
    // Private Routes (bearer token + live session)
    // ==========================================================================
    let private_routes = Router::new()
        .route("/auth/logout", post(crate::user_auth::handlers::logout))
        .route("/me", get(crate::user_auth::handlers::me))
        .route("/wallet", get(handlers::get_wallet))
        .route("/wallet/transfer", post(handlers::transfer))
        .layer(from_fn_with_state(state.clone(), session_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the process is stopped.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_app(state);

    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind to {addr}: {e} (port {port} may already be in use)")
    })?;

    tracing::info!(%addr, "Gateway listening");
    tracing::info!("API Docs: http://{addr}/docs");

    axum::serve(listener, app).await?;
    Ok(())
}
