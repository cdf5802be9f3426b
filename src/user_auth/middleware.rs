use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::{state::AppState, types::ApiError};

/// Bearer token + sliding session check for protected routes.
///
/// On success the [`CallerIdentity`](super::CallerIdentity) is inserted into
/// the request extensions.
pub async fn session_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let caller = state.gate.authenticate(auth_header).await.map_err(|e| {
        tracing::debug!(error = %e, "Authentication failed");
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
