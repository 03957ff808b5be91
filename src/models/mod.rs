//! # Data Models
//!
//! This module contains all the data models used throughout the Vendor Console.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod schema;
pub mod vendor;

pub use schema::{Column, ColumnType, Schema, SchemaError, Table};
pub use vendor::{Entity as VendorEntity, Vendor};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "vendor-console".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health report returned by `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    #[serde(flatten)]
    pub service: ServiceInfo,
    /// `ok` when the database answered a ping
    #[schema(example = "ok")]
    pub database: String,
}
