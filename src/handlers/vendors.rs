//! # Vendor API Handlers
//!
//! Read-only JSON access to vendors for scripting against the console.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::ApiUser;
use crate::error::ApiError;
use crate::models::Vendor;
use crate::provisioning::schema_ddl;
use crate::server::AppState;

/// Vendor list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VendorListResponse {
    /// Vendors, newest first
    pub vendors: Vec<Vendor>,
}

/// DDL for one provisioned table
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TableDdl {
    /// Physical table name
    #[schema(example = "helpdesk_tickets")]
    pub table: String,
    /// Statements submitted to `exec_sql` for this table
    pub sql: String,
}

/// DDL preview response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VendorDdlResponse {
    pub vendor_id: Uuid,
    #[schema(example = "helpdesk")]
    pub slug: String,
    pub tables: Vec<TableDdl>,
}

/// List vendors
#[utoipa::path(
    get,
    path = "/api/v1/vendors",
    responses(
        (status = 200, description = "All vendors, newest first", body = VendorListResponse),
        (status = 401, description = "No signed-in session", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    _user: ApiUser,
) -> Result<Json<VendorListResponse>, ApiError> {
    let vendors = state.vendors.list_vendors().await?;
    Ok(Json(VendorListResponse { vendors }))
}

/// Get a vendor by ID
#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor UUID")
    ),
    responses(
        (status = 200, description = "Vendor", body = Vendor),
        (status = 401, description = "No signed-in session", body = ApiError),
        (status = 404, description = "Vendor not found", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    _user: ApiUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<Json<Vendor>, ApiError> {
    Ok(Json(state.vendors.get_vendor(vendor_id).await?))
}

/// Preview the DDL generated for a vendor's schema
#[utoipa::path(
    get,
    path = "/api/v1/vendors/{id}/ddl",
    params(
        ("id" = Uuid, Path, description = "Vendor UUID")
    ),
    responses(
        (status = 200, description = "Per-table DDL", body = VendorDdlResponse),
        (status = 401, description = "No signed-in session", body = ApiError),
        (status = 404, description = "Vendor not found", body = ApiError)
    ),
    tag = "vendors"
)]
pub async fn vendor_ddl(
    State(state): State<AppState>,
    _user: ApiUser,
    Path(vendor_id): Path<Uuid>,
) -> Result<Json<VendorDdlResponse>, ApiError> {
    let vendor = state.vendors.get_vendor(vendor_id).await?;
    let tables = schema_ddl(&vendor.slug, &vendor.schema)
        .into_iter()
        .map(|(table, sql)| TableDdl { table, sql })
        .collect();

    Ok(Json(VendorDdlResponse {
        vendor_id,
        slug: vendor.slug,
        tables,
    }))
}
