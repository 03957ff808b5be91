//! # API Handlers
//!
//! JSON endpoints served alongside the console: service info, health and a
//! read-only view of vendors.

pub mod vendors;

use axum::{extract::State, http::StatusCode, response::Json};

use crate::db;
use crate::models::{HealthStatus, ServiceInfo};
use crate::server::AppState;

/// Basic service information
#[utoipa::path(
    get,
    path = "/api/v1",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness plus a database ping
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthStatus),
        (status = 503, description = "Database is unreachable", body = HealthStatus)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let (status, database) = match db::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, "ok".to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
        }
    };

    (
        status,
        Json(HealthStatus {
            service: ServiceInfo::default(),
            database,
        }),
    )
}
