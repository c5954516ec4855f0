use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use blog_shared::AppError;

use super::ClientIp;
use crate::AppState;

/// Global limiter in front of every `/api` route, keyed by client IP.
pub async fn api_rate_limit(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.api_limiter.hit(&client_ip.0) {
        tracing::warn!(ip = %client_ip.0, path = %req.uri().path(), "api rate limit exceeded");
        return AppError::rate_limited().into_response();
    }
    next.run(req).await
}
