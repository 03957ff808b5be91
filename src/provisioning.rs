//! Per-vendor table provisioning.
//!
//! Turns a vendor [`Schema`] into DDL for tables named `<slug>_<table>`, each
//! guarded by a row-level-security policy on its `vendor_slug` column, and
//! submits it through the `exec_sql` remote procedure one table at a time.

use std::sync::Arc;

use metrics::counter;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::models::schema::{Column, MAX_IDENTIFIER_BYTES, Schema, SchemaError, Table};
use crate::procedures::RemoteProcedures;

/// Session setting the row-level-security policies compare `vendor_slug` against.
/// `set_tenant_context` writes this setting.
pub const TENANT_SETTING: &str = "app.current_vendor";

/// Errors raised while provisioning vendor tables
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("Failed to set tenant context for '{slug}': {source}")]
    TenantContext {
        slug: String,
        #[source]
        source: DbErr,
    },

    #[error("Failed to create table {table}: {source}")]
    TableCreation {
        table: String,
        #[source]
        source: DbErr,
    },
}

/// Physical table name for a vendor table
pub fn physical_table_name(slug: &str, table: &str) -> String {
    format!("{slug}_{table}")
}

fn isolation_policy_name(physical: &str) -> String {
    format!("{physical}_vendor_isolation")
}

fn vendor_slug_index_name(physical: &str) -> String {
    format!("idx_{physical}_vendor_slug")
}

/// Reject schemas whose table, policy or index names would be truncated by
/// Postgres for this slug.
pub fn check_identifier_lengths(slug: &str, schema: &Schema) -> Result<(), SchemaError> {
    for table in &schema.tables {
        let physical = physical_table_name(slug, &table.name);
        for name in [
            vendor_slug_index_name(&physical),
            isolation_policy_name(&physical),
            physical,
        ] {
            if name.len() > MAX_IDENTIFIER_BYTES {
                return Err(SchemaError::DerivedNameTooLong {
                    table: table.name.clone(),
                    name,
                });
            }
        }
    }
    Ok(())
}

/// Postgres reserved key words (including those reserved for function and
/// type names). These cannot appear unquoted as table or column names.
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group",
    "having", "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull",
    "join", "lateral", "leading", "left", "like", "limit", "localtime", "localtimestamp",
    "natural", "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "system_user", "table", "tablesample",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "verbose", "when", "where", "window", "with",
];

/// Quote an identifier when it is not a plain lowercase SQL name.
///
/// Slugs may contain hyphens, which Postgres only accepts inside double quotes.
/// Reserved key words are quoted as well.
pub fn quote_ident(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED_KEYWORDS.contains(&name);

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Definition of one declared column: name, mapped type, optional NOT NULL
/// and optional CHECK ... IN constraint.
pub fn column_definition(column: &Column) -> String {
    let name = quote_ident(&column.name);
    let mut definition = format!("{} {}", name, column.column_type.sql_type());

    if column.required {
        definition.push_str(" NOT NULL");
    }

    if let Some(values) = column.allowed_values.as_ref().filter(|v| !v.is_empty()) {
        let allowed = values
            .iter()
            .map(|value| quote_literal(value))
            .collect::<Vec<_>>()
            .join(", ");
        definition.push_str(&format!(" CHECK ({name} IN ({allowed}))"));
    }

    definition
}

/// All column definitions of a provisioned table, system columns included.
///
/// Order: `id`, `vendor_slug`, the declared columns in schema order,
/// `created_at`, `updated_at`.
pub fn table_column_definitions(slug: &str, table: &Table) -> Vec<String> {
    let slug_literal = quote_literal(slug);
    let mut definitions = Vec::with_capacity(table.columns.len() + 4);

    definitions.push("id BIGSERIAL PRIMARY KEY".to_string());
    definitions.push(format!(
        "vendor_slug TEXT NOT NULL DEFAULT {slug_literal} CHECK (vendor_slug = {slug_literal})"
    ));
    definitions.extend(table.columns.iter().map(column_definition));
    definitions.push("created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());
    definitions.push("updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());

    definitions
}

/// Full provisioning statement for one table: the table itself, row-level
/// security, the isolation policy and the `vendor_slug` index.
pub fn create_table_sql(slug: &str, table: &Table) -> String {
    let raw_name = physical_table_name(slug, &table.name);
    let table_name = quote_ident(&raw_name);
    let policy_name = quote_ident(&isolation_policy_name(&raw_name));
    let index_name = quote_ident(&vendor_slug_index_name(&raw_name));
    let claim = format!("current_setting({}, true)", quote_literal(TENANT_SETTING));

    let columns = table_column_definitions(slug, table).join(",\n  ");

    format!(
        "CREATE TABLE IF NOT EXISTS {table_name} (\n  {columns}\n);\n\
         ALTER TABLE {table_name} ENABLE ROW LEVEL SECURITY;\n\
         DROP POLICY IF EXISTS {policy_name} ON {table_name};\n\
         CREATE POLICY {policy_name} ON {table_name} FOR ALL \
         USING (vendor_slug = {claim}) WITH CHECK (vendor_slug = {claim});\n\
         CREATE INDEX IF NOT EXISTS {index_name} ON {table_name} (vendor_slug);"
    )
}

/// Cascading drop for one vendor table
pub fn drop_table_sql(slug: &str, table: &Table) -> String {
    format!(
        "DROP TABLE IF EXISTS {} CASCADE;",
        quote_ident(&physical_table_name(slug, &table.name))
    )
}

/// Provisioning statements for every table of a schema, keyed by physical name
pub fn schema_ddl(slug: &str, schema: &Schema) -> Vec<(String, String)> {
    schema
        .tables
        .iter()
        .map(|table| {
            (
                physical_table_name(slug, &table.name),
                create_table_sql(slug, table),
            )
        })
        .collect()
}

/// Creates and drops vendor tables through the backend's remote procedures
#[derive(Clone)]
pub struct TableProvisioner {
    procedures: Arc<dyn RemoteProcedures>,
}

impl TableProvisioner {
    pub fn new(procedures: Arc<dyn RemoteProcedures>) -> Self {
        Self { procedures }
    }

    /// Set the tenant context, then create every table in schema order.
    ///
    /// The first failure stops the loop; tables created before it are left in place.
    #[instrument(skip_all, fields(vendor_slug = %slug, tables = schema.tables.len()))]
    pub async fn create_vendor_tables(
        &self,
        slug: &str,
        schema: &Schema,
    ) -> Result<(), ProvisioningError> {
        self.procedures
            .set_tenant_context(slug)
            .await
            .map_err(|source| ProvisioningError::TenantContext {
                slug: slug.to_string(),
                source,
            })?;

        for table in &schema.tables {
            let table_name = physical_table_name(slug, &table.name);
            let sql = create_table_sql(slug, table);

            if let Err(source) = self.procedures.exec_sql(&sql).await {
                error!(table = %table_name, error = %source, "Table provisioning failed");
                return Err(ProvisioningError::TableCreation {
                    table: table_name,
                    source,
                });
            }

            counter!("vendor_tables_provisioned_total").increment(1);
            info!(table = %table_name, "Provisioned vendor table");
        }

        Ok(())
    }

    /// Drop every table of the schema. Failures are logged and skipped so
    /// that each table gets a drop attempt.
    #[instrument(skip_all, fields(vendor_slug = %slug, tables = schema.tables.len()))]
    pub async fn drop_vendor_tables(&self, slug: &str, schema: &Schema) {
        for table in &schema.tables {
            let table_name = physical_table_name(slug, &table.name);

            match self.procedures.exec_sql(&drop_table_sql(slug, table)).await {
                Ok(()) => info!(table = %table_name, "Dropped vendor table"),
                Err(err) => {
                    counter!("vendor_table_drop_failures_total").increment(1);
                    warn!(table = %table_name, error = %err, "Failed to drop vendor table");
                }
            }
        }
    }
}
