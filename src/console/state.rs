//! Console page state and its transitions.
//!
//! Every page is rendered from one of these structs. Handlers build the
//! state from the incoming request or backend response, move it through the
//! transition methods below, and hand the result to the views.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::User;
use crate::models::schema::Schema;
use crate::models::vendor::{Vendor, is_valid_slug};
use crate::provisioning::{check_identifier_lengths, physical_table_name};

/// Whether the login page signs in or registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

/// Posted login form
#[derive(Debug, Clone, Deserialize)]
pub struct LoginSubmission {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub mode: AuthMode,
}

/// Login/sign-up page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginFormState {
    pub mode: AuthMode,
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl LoginFormState {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Keep what the user typed (never the password) for re-rendering
    pub fn from_submission(submission: &LoginSubmission) -> Self {
        Self {
            mode: submission.mode,
            email: submission.email.trim().to_string(),
            ..Default::default()
        }
    }

    /// Local checks performed before contacting the auth service
    pub fn check(&self, submission: &LoginSubmission) -> Result<(), String> {
        if self.email.is_empty() || !self.email.contains('@') {
            return Err("Enter a valid email address".to_string());
        }
        if submission.password.is_empty() {
            return Err("Enter your password".to_string());
        }
        Ok(())
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.notice = None;
        self
    }

    pub fn confirmation_pending(mut self) -> Self {
        self.error = None;
        self.notice = Some(format!(
            "Check {} for a confirmation link, then sign in.",
            self.email
        ));
        self.mode = AuthMode::SignIn;
        self
    }
}

/// Posted vendor form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorSubmission {
    #[serde(default)]
    pub slug: String,
    pub name: String,
    pub schema: String,
}

/// Validated vendor form contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorDraft {
    pub slug: String,
    pub name: String,
    pub schema: Schema,
}

/// Create/edit vendor modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorFormState {
    /// Set when editing an existing vendor
    pub vendor_id: Option<Uuid>,
    pub slug: String,
    pub name: String,
    pub schema_json: String,
    pub error: Option<String>,
}

impl VendorFormState {
    /// Empty form pre-filled with the starter schema
    pub fn for_new() -> Self {
        Self {
            vendor_id: None,
            slug: String::new(),
            name: String::new(),
            schema_json: Schema::example().to_pretty_json(),
            error: None,
        }
    }

    pub fn for_edit(vendor: &Vendor) -> Self {
        Self {
            vendor_id: Some(vendor.id),
            slug: vendor.slug.clone(),
            name: vendor.name.clone(),
            schema_json: vendor.schema.to_pretty_json(),
            error: None,
        }
    }

    pub fn from_submission(vendor_id: Option<Uuid>, submission: VendorSubmission) -> Self {
        Self {
            vendor_id,
            slug: submission.slug.trim().to_string(),
            name: submission.name,
            schema_json: submission.schema,
            error: None,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.vendor_id.is_some()
    }

    /// Parse the schema text and check the fields. Runs before any backend call.
    pub fn validate(&self) -> Result<VendorDraft, String> {
        if !self.is_edit() && !is_valid_slug(&self.slug) {
            return Err(
                "Slug may only contain lowercase letters, digits and single hyphens".to_string(),
            );
        }
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        let schema = Schema::parse(&self.schema_json).map_err(|err| err.to_string())?;
        if !self.is_edit() {
            check_identifier_lengths(&self.slug, &schema).map_err(|err| err.to_string())?;
        }

        Ok(VendorDraft {
            slug: self.slug.clone(),
            name: self.name.trim().to_string(),
            schema,
        })
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }
}

/// One card on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorCard {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub table_count: usize,
    pub tables: Vec<String>,
    pub created_at: String,
}

impl From<&Vendor> for VendorCard {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id,
            slug: vendor.slug.clone(),
            name: vendor.name.clone(),
            table_count: vendor.table_count(),
            tables: vendor
                .schema
                .tables
                .iter()
                .map(|table| physical_table_name(&vendor.slug, &table.name))
                .collect(),
            created_at: vendor.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

/// Dashboard page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardState {
    pub user_email: Option<String>,
    pub vendors: Vec<VendorCard>,
    /// Blocking error, rendered as an alert dialog
    pub alert: Option<String>,
}

impl DashboardState {
    pub fn loaded(user: &User, vendors: &[Vendor]) -> Self {
        Self {
            user_email: user.email.clone(),
            vendors: vendors.iter().map(VendorCard::from).collect(),
            alert: None,
        }
    }

    pub fn with_alert(mut self, message: impl Into<String>) -> Self {
        self.alert = Some(message.into());
        self
    }
}
