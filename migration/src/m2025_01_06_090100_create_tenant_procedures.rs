//! Installs the `set_tenant_context` and `exec_sql` remote procedures.
//!
//! Both only exist on Postgres; other backends (SQLite in tests) skip them.
//! They run as their owner, so EXECUTE is revoked from PUBLIC and granted
//! only to the role applying the migration. `search_path` is pinned to
//! `public` (where vendor tables are created) with `pg_temp` searched last;
//! `pg_catalog` is implicitly searched first.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DatabaseBackend, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

const SET_TENANT_CONTEXT: &str = "CREATE OR REPLACE FUNCTION set_tenant_context(vendor_slug text)
RETURNS void
LANGUAGE plpgsql
SECURITY DEFINER
SET search_path = public, pg_temp
AS $$
BEGIN
    PERFORM set_config('app.current_vendor', vendor_slug, false);
END
$$;";

const EXEC_SQL: &str = "CREATE OR REPLACE FUNCTION exec_sql(sql text)
RETURNS void
LANGUAGE plpgsql
SECURITY DEFINER
SET search_path = public, pg_temp
AS $$
BEGIN
    EXECUTE sql;
END
$$;";

const REVOKE_PUBLIC: &str =
    "REVOKE EXECUTE ON FUNCTION set_tenant_context(text), exec_sql(text) FROM PUBLIC";

const GRANT_MIGRATOR: &str =
    "GRANT EXECUTE ON FUNCTION set_tenant_context(text), exec_sql(text) TO CURRENT_USER";

const UP: [&str; 4] = [SET_TENANT_CONTEXT, EXEC_SQL, REVOKE_PUBLIC, GRANT_MIGRATOR];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        if backend != DatabaseBackend::Postgres {
            return Ok(());
        }

        for sql in UP {
            manager
                .get_connection()
                .execute(Statement::from_string(backend, sql.to_string()))
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        if backend != DatabaseBackend::Postgres {
            return Ok(());
        }

        for sql in [
            "DROP FUNCTION IF EXISTS exec_sql(text)",
            "DROP FUNCTION IF EXISTS set_tenant_context(text)",
        ] {
            manager
                .get_connection()
                .execute(Statement::from_string(backend, sql.to_string()))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definer_functions_pin_search_path() {
        for sql in [SET_TENANT_CONTEXT, EXEC_SQL] {
            assert!(sql.contains("SECURITY DEFINER"));
            assert!(sql.contains("SET search_path = public, pg_temp"));
        }
    }

    #[test]
    fn public_execute_is_revoked_after_creation() {
        let revoke = UP.iter().position(|sql| *sql == REVOKE_PUBLIC).unwrap();
        let grant = UP.iter().position(|sql| *sql == GRANT_MIGRATOR).unwrap();
        let exec = UP.iter().position(|sql| *sql == EXEC_SQL).unwrap();

        assert!(exec < revoke);
        assert!(revoke < grant);
        assert!(REVOKE_PUBLIC.contains("exec_sql(text)"));
        assert!(REVOKE_PUBLIC.ends_with("FROM PUBLIC"));
    }
}
