//! Vendor entity model
//!
//! This module contains the SeaORM entity model for the vendors table, which
//! stores one row per tenant together with the schema its tables were built from.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use super::schema::{Schema, SchemaError};

/// Vendor entity representing one tenant
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vendors")]
pub struct Model {
    /// Unique identifier for the vendor (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique slug, used as the physical table prefix
    #[sea_orm(unique)]
    pub slug: String,

    /// Display name
    pub name: String,

    /// Declared schema as stored JSON
    pub schema: JsonValue,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Vendor with its schema decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Vendor {
    pub id: Uuid,
    #[schema(example = "helpdesk")]
    pub slug: String,
    #[schema(example = "Helpdesk")]
    pub name: String,
    pub schema: Schema,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    /// Number of tables provisioned for this vendor
    pub fn table_count(&self) -> usize {
        self.schema.table_count()
    }
}

impl TryFrom<Model> for Vendor {
    type Error = SchemaError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let schema: Schema = serde_json::from_value(model.schema)?;
        Ok(Vendor {
            id: model.id,
            slug: model.slug,
            name: model.name,
            schema,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

/// Whether `slug` consists of lowercase letters, digits and single hyphens
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE
        .get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern is valid"))
        .is_match(slug)
}
