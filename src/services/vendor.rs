//! Vendor lifecycle: row CRUD plus table provisioning.
//!
//! Creation and deletion each span two backend calls with no transaction
//! around them. A failed provisioning run is compensated by deleting the
//! just-inserted row; nothing else is rolled back.

use metrics::counter;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::schema::{Schema, SchemaError};
use crate::models::vendor::Vendor;
use crate::provisioning::{ProvisioningError, TableProvisioner, check_identifier_lengths};
use crate::repositories::{CreateVendorRequest, UpdateVendorRequest, VendorRepository};

/// Errors surfaced by vendor operations
#[derive(Debug, Error)]
pub enum VendorServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Vendor not found")]
    NotFound,
}

/// Input for creating a vendor
#[derive(Debug, Clone)]
pub struct NewVendor {
    pub slug: String,
    pub name: String,
    pub schema: Schema,
}

/// Vendor CRUD backed by the `vendors` table and the table provisioner
#[derive(Clone)]
pub struct VendorService {
    db: DatabaseConnection,
    provisioner: TableProvisioner,
}

impl VendorService {
    pub fn new(db: DatabaseConnection, provisioner: TableProvisioner) -> Self {
        Self { db, provisioner }
    }

    fn repository(&self) -> VendorRepository<'_> {
        VendorRepository::new(&self.db)
    }

    /// All vendors, newest first
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, VendorServiceError> {
        self.repository()
            .list_vendors()
            .await?
            .into_iter()
            .map(|model| Vendor::try_from(model).map_err(VendorServiceError::from))
            .collect()
    }

    pub async fn get_vendor(&self, vendor_id: Uuid) -> Result<Vendor, VendorServiceError> {
        let model = self
            .repository()
            .get_vendor_by_id(vendor_id)
            .await?
            .ok_or(VendorServiceError::NotFound)?;
        Ok(Vendor::try_from(model)?)
    }

    /// Insert the vendor row, then provision its tables.
    ///
    /// If provisioning fails the row is deleted again (best effort) and the
    /// provisioning error is returned.
    #[instrument(skip_all, fields(vendor_slug = %new_vendor.slug))]
    pub async fn create_vendor(&self, new_vendor: NewVendor) -> Result<Vendor, VendorServiceError> {
        new_vendor.schema.validate()?;
        check_identifier_lengths(&new_vendor.slug, &new_vendor.schema)?;

        let model = self
            .repository()
            .create_vendor(CreateVendorRequest {
                slug: new_vendor.slug,
                name: new_vendor.name,
                schema: new_vendor.schema,
            })
            .await?;
        let vendor = Vendor::try_from(model)?;

        if let Err(err) = self
            .provisioner
            .create_vendor_tables(&vendor.slug, &vendor.schema)
            .await
        {
            counter!("vendor_compensations_total").increment(1);
            warn!(vendor_id = %vendor.id, error = %err, "Provisioning failed, removing vendor row");
            if let Err(cleanup_err) = self.repository().delete_vendor(vendor.id).await {
                error!(
                    vendor_id = %vendor.id,
                    error = %cleanup_err,
                    "Compensating delete failed; vendor row is orphaned"
                );
            }
            return Err(err.into());
        }

        info!(vendor_id = %vendor.id, tables = vendor.table_count(), "Vendor created");
        Ok(vendor)
    }

    /// Partial update. Existing tables are not re-provisioned or altered.
    #[instrument(skip_all, fields(vendor_id = %vendor_id))]
    pub async fn update_vendor(
        &self,
        vendor_id: Uuid,
        update: UpdateVendorRequest,
    ) -> Result<Vendor, VendorServiceError> {
        if let Some(schema) = update.schema.as_ref() {
            schema.validate()?;
        }

        let model = self
            .repository()
            .update_vendor(vendor_id, update)
            .await
            .map_err(not_found_as_service_error)?;

        info!("Vendor updated");
        Ok(Vendor::try_from(model)?)
    }

    /// Drop every provisioned table, then delete the row.
    ///
    /// Drop failures are logged by the provisioner and do not stop the delete.
    #[instrument(skip_all, fields(vendor_id = %vendor_id))]
    pub async fn delete_vendor(&self, vendor_id: Uuid) -> Result<(), VendorServiceError> {
        let vendor = self.get_vendor(vendor_id).await?;

        self.provisioner
            .drop_vendor_tables(&vendor.slug, &vendor.schema)
            .await;

        self.repository()
            .delete_vendor(vendor_id)
            .await
            .map_err(not_found_as_service_error)?;

        info!(vendor_slug = %vendor.slug, "Vendor deleted");
        Ok(())
    }
}

fn not_found_as_service_error(err: RepositoryError) -> VendorServiceError {
    match err {
        RepositoryError::NotFound(_) => VendorServiceError::NotFound,
        other => VendorServiceError::Repository(other),
    }
}
