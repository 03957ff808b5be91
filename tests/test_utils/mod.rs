//! Test utilities shared by the integration tests.
//!
//! Provides an in-memory SQLite database with migrations applied and a
//! scripted stand-in for the backend's remote procedures.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};
use vendor_console::models::Schema;
use vendor_console::procedures::RemoteProcedures;
use vendor_console::provisioning::TableProvisioner;
use vendor_console::services::VendorService;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// One call made against [`FakeProcedures`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureCall {
    SetTenantContext(String),
    ExecSql(String),
}

/// Records every procedure call; `exec_sql` fails when the SQL contains any
/// of the configured needles.
#[derive(Default)]
pub struct FakeProcedures {
    calls: Mutex<Vec<ProcedureCall>>,
    fail_when_sql_contains: Mutex<Vec<String>>,
}

impl FakeProcedures {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(needle: &str) -> Arc<Self> {
        let fake = Self::default();
        fake.fail_when_sql_contains
            .lock()
            .unwrap()
            .push(needle.to_string());
        Arc::new(fake)
    }

    pub fn calls(&self) -> Vec<ProcedureCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProcedureCall::ExecSql(sql) => Some(sql),
                ProcedureCall::SetTenantContext(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl RemoteProcedures for FakeProcedures {
    async fn set_tenant_context(&self, slug: &str) -> Result<(), DbErr> {
        self.calls
            .lock()
            .unwrap()
            .push(ProcedureCall::SetTenantContext(slug.to_string()));
        Ok(())
    }

    async fn exec_sql(&self, sql: &str) -> Result<(), DbErr> {
        self.calls
            .lock()
            .unwrap()
            .push(ProcedureCall::ExecSql(sql.to_string()));

        let needles = self.fail_when_sql_contains.lock().unwrap();
        if needles.iter().any(|needle| sql.contains(needle.as_str())) {
            return Err(DbErr::Custom("permission denied for schema public".to_string()));
        }
        Ok(())
    }
}

/// Vendor service over `db` whose provisioning goes to `procedures`
pub fn vendor_service(db: &DatabaseConnection, procedures: Arc<FakeProcedures>) -> VendorService {
    VendorService::new(db.clone(), TableProvisioner::new(procedures))
}

/// The single-table helpdesk schema
pub fn helpdesk_schema() -> Schema {
    Schema::parse(
        r#"{"tables":[{"name":"tickets","columns":[
            {"name":"title","type":"text","required":true},
            {"name":"status","type":"text","enum":["open","closed"]}
        ]}]}"#,
    )
    .expect("helpdesk schema parses")
}

/// A two-table schema used for multi-table provisioning
pub fn shop_schema() -> Schema {
    Schema::parse(
        r#"{"tables":[
            {"name":"orders","columns":[{"name":"total","type":"integer","required":true}]},
            {"name":"items","columns":[{"name":"sku","type":"text"},{"name":"shipped","type":"boolean"}]}
        ]}"#,
    )
    .expect("shop schema parses")
}

/// Mounts a successful password grant for `email` on a mock auth server
pub async fn mount_password_grant(server: &wiremock::MockServer, email: &str) {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-token-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-token-1",
            "user": { "id": "user-1", "email": email }
        })))
        .mount(server)
        .await;
}
