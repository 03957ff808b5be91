//! Remote procedures exposed by the hosted database.
//!
//! Tenant provisioning talks to the backend through exactly two procedures:
//! `set_tenant_context(slug)` and `exec_sql(sql)`. Both are opaque to this
//! crate; [`RemoteProcedures`] is the seam that lets tests substitute them.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement};

/// The two backend procedures used by tenant provisioning
#[async_trait]
pub trait RemoteProcedures: Send + Sync {
    /// Scope subsequent calls to the given vendor slug
    async fn set_tenant_context(&self, slug: &str) -> Result<(), DbErr>;

    /// Execute an arbitrary SQL string
    async fn exec_sql(&self, sql: &str) -> Result<(), DbErr>;
}

/// Calls the procedures installed by the migrations over a SeaORM connection
#[derive(Clone)]
pub struct DatabaseProcedures {
    db: DatabaseConnection,
}

impl DatabaseProcedures {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn call(&self, procedure: &str, argument: &str) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        if backend != DatabaseBackend::Postgres {
            return Err(DbErr::Custom(format!(
                "remote procedure {procedure} requires Postgres, connected to {backend:?}"
            )));
        }

        let stmt = Statement::from_sql_and_values(
            backend,
            format!("SELECT {procedure}($1)"),
            [argument.into()],
        );
        self.db.execute(stmt).await.map(|_| ())
    }
}

#[async_trait]
impl RemoteProcedures for DatabaseProcedures {
    async fn set_tenant_context(&self, slug: &str) -> Result<(), DbErr> {
        tracing::debug!(vendor_slug = %slug, "Setting tenant context");
        self.call("set_tenant_context", slug).await
    }

    async fn exec_sql(&self, sql: &str) -> Result<(), DbErr> {
        tracing::debug!(bytes = sql.len(), "Executing SQL through exec_sql");
        self.call("exec_sql", sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    #[tokio::test]
    async fn non_postgres_backends_are_rejected() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let procedures = DatabaseProcedures::new(db);

        let err = procedures.exec_sql("SELECT 1").await.unwrap_err();
        assert!(err.to_string().contains("requires Postgres"));

        let err = procedures.set_tenant_context("helpdesk").await.unwrap_err();
        assert!(err.to_string().contains("set_tenant_context"));
    }
}
