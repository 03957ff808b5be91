//! # Vendor Repository
//!
//! This module contains the repository implementation for Vendor entities,
//! providing CRUD operations on the `vendors` table.

use crate::error::RepositoryError;
use crate::models::schema::Schema;
use crate::models::vendor::{
    ActiveModel as VendorActiveModel, Column as VendorColumn, Entity as VendorEntity,
    Model as VendorModel, is_valid_slug,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait, QueryOrder,
    Set,
};
use uuid::Uuid;

/// Request data for creating a new vendor
#[derive(Debug, Clone)]
pub struct CreateVendorRequest {
    pub slug: String,
    pub name: String,
    pub schema: Schema,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateVendorRequest {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub schema: Option<Schema>,
}

impl UpdateVendorRequest {
    pub fn is_empty(&self) -> bool {
        self.slug.is_none() && self.name.is_none() && self.schema.is_none()
    }
}

/// Repository for Vendor database operations
pub struct VendorRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VendorRepository<'a> {
    /// Create a new VendorRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a new vendor row
    pub async fn create_vendor(
        &self,
        request: CreateVendorRequest,
    ) -> Result<VendorModel, RepositoryError> {
        validate_slug(&request.slug)?;
        validate_name(&request.name)?;

        let now = Utc::now();
        let schema = serde_json::to_value(&request.schema)
            .map_err(|e| RepositoryError::validation_error(format!("Invalid schema: {e}")))?;

        let vendor = VendorActiveModel {
            id: Set(Uuid::new_v4()),
            slug: Set(request.slug),
            name: Set(request.name.trim().to_string()),
            schema: Set(schema),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        vendor
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Get vendor by ID
    pub async fn get_vendor_by_id(
        &self,
        vendor_id: Uuid,
    ) -> Result<Option<VendorModel>, RepositoryError> {
        VendorEntity::find_by_id(vendor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// List all vendors, newest first
    pub async fn list_vendors(&self) -> Result<Vec<VendorModel>, RepositoryError> {
        VendorEntity::find()
            .order_by_desc(VendorColumn::CreatedAt)
            .order_by_desc(VendorColumn::Id)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Apply a partial update and bump `updated_at`
    pub async fn update_vendor(
        &self,
        vendor_id: Uuid,
        request: UpdateVendorRequest,
    ) -> Result<VendorModel, RepositoryError> {
        let vendor = self
            .get_vendor_by_id(vendor_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Vendor not found".to_string()))?;

        let mut active_vendor = vendor.into_active_model();

        if let Some(slug) = request.slug {
            validate_slug(&slug)?;
            active_vendor.slug = Set(slug);
        }
        if let Some(name) = request.name {
            validate_name(&name)?;
            active_vendor.name = Set(name.trim().to_string());
        }
        if let Some(schema) = request.schema {
            let schema = serde_json::to_value(&schema)
                .map_err(|e| RepositoryError::validation_error(format!("Invalid schema: {e}")))?;
            active_vendor.schema = Set(schema);
        }
        active_vendor.updated_at = Set(Utc::now().into());

        active_vendor
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Delete a vendor row
    pub async fn delete_vendor(&self, vendor_id: Uuid) -> Result<(), RepositoryError> {
        let vendor = self
            .get_vendor_by_id(vendor_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("Vendor not found".to_string()))?;

        vendor
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }
}

fn validate_slug(slug: &str) -> Result<(), RepositoryError> {
    if !is_valid_slug(slug) {
        return Err(RepositoryError::validation_error(
            "Slug may only contain lowercase letters, digits and single hyphens",
        ));
    }
    if slug.len() > 48 {
        return Err(RepositoryError::validation_error(
            "Slug cannot exceed 48 characters",
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), RepositoryError> {
    if name.trim().is_empty() {
        return Err(RepositoryError::validation_error(
            "Vendor name cannot be empty",
        ));
    }
    if name.len() > 255 {
        return Err(RepositoryError::validation_error(
            "Vendor name cannot exceed 255 characters",
        ));
    }
    Ok(())
}
