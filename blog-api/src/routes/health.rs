use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::prelude::*;
use std::sync::Arc;

use blog_shared::clients::db;
use blog_shared::{ApiResponse, AppResult, HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Probes the database and the media bucket. A dead database makes the
/// service unhealthy; unreachable storage only degrades it.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let database = match db::run(&state.db, |conn| -> AppResult<()> {
        diesel::sql_query("SELECT 1").execute(conn)?;
        Ok(())
    })
    .await
    {
        Ok(()) => HealthCheck::up("database"),
        Err(e) => HealthCheck::failed("database", HealthStatus::Unhealthy, e.to_string()),
    };

    let storage = match state.storage.check().await {
        Ok(()) => HealthCheck::up("storage"),
        Err(e) => HealthCheck::failed("storage", HealthStatus::Degraded, e.to_string()),
    };

    let response = HealthResponse::healthy("blog-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database, storage]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(ApiResponse::ok(response))).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
