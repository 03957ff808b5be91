//! # Server Configuration
//!
//! Router assembly and the serve loop for the Vendor Console.

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::get,
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::console::{self, Views};
use crate::services::VendorService;
use crate::{handlers, telemetry};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub sessions: Arc<SessionStore>,
    pub vendors: VendorService,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        sessions: SessionStore,
        vendors: VendorService,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            config: Arc::new(config),
            db,
            sessions: Arc::new(sessions),
            vendors,
            views: Arc::new(Views::new()?),
        })
    }
}

impl FromRef<AppState> for Arc<SessionStore> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.sessions)
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/v1/vendors", get(handlers::vendors::list_vendors))
        .route("/api/v1/vendors/{id}", get(handlers::vendors::get_vendor))
        .route("/api/v1/vendors/{id}/ddl", get(handlers::vendors::vendor_ddl))
        .merge(console::router())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
}

/// Serve `state` until `shutdown` is cancelled
pub async fn run_server(state: AppState, shutdown: CancellationToken) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %profile, "Vendor console listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::vendors::list_vendors,
        crate::handlers::vendors::get_vendor,
        crate::handlers::vendors::vendor_ddl,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::HealthStatus,
            crate::models::Vendor,
            crate::models::Schema,
            crate::models::Table,
            crate::models::Column,
            crate::handlers::vendors::VendorListResponse,
            crate::handlers::vendors::VendorDdlResponse,
            crate::handlers::vendors::TableDdl,
            crate::error::ApiError,
        )
    ),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "vendors", description = "Read-only vendor access for signed-in operators")
    ),
    info(
        title = "Vendor Console API",
        description = "Vendor tenants with JSON-schema-provisioned tables",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
