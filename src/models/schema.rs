//! Vendor schema definitions
//!
//! A vendor declares its tables as JSON. This module holds the typed shape of
//! that document together with the structural checks applied before any DDL
//! is generated from it.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Columns every provisioned table carries in addition to the declared ones.
pub const SYSTEM_COLUMNS: [&str; 4] = ["id", "vendor_slug", "created_at", "updated_at"];

/// Longest identifier Postgres keeps; longer names are silently truncated.
pub const MAX_IDENTIFIER_BYTES: usize = 63;

static IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();

fn identifier_re() -> &'static Regex {
    IDENTIFIER_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

/// Errors raised while parsing or checking a vendor schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid JSON schema: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Schema must declare at least one table")]
    NoTables,

    #[error("Table '{table}' must declare at least one column")]
    NoColumns { table: String },

    #[error("Invalid {kind} name '{name}': use letters, digits and underscores")]
    InvalidIdentifier { kind: &'static str, name: String },

    #[error("{kind} name '{name}' exceeds 63 bytes")]
    IdentifierTooLong { kind: &'static str, name: String },

    #[error(
        "Table '{table}' needs the database object name '{name}', which exceeds 63 bytes; shorten the slug or table name"
    )]
    DerivedNameTooLong { table: String, name: String },

    #[error("Table '{table}' is declared more than once")]
    DuplicateTable { table: String },

    #[error("Column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Column '{column}' in table '{table}' collides with a system column")]
    ReservedColumn { table: String, column: String },

    #[error("Column '{column}' in table '{table}' has an empty enum")]
    EmptyEnum { table: String, column: String },
}

/// Ordered list of tables a vendor owns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Schema {
    pub tables: Vec<Table>,
}

/// A single logical table, provisioned as `<slug>_<name>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

/// A declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Column {
    pub name: String,

    /// One of `text`, `integer`, `boolean`, `timestamp`
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "text")]
    pub column_type: ColumnType,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    /// Allowed values, rendered as a CHECK constraint
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

/// Primitive column types.
///
/// Unrecognised type names are kept verbatim in `Other` so the document
/// round-trips; they provision as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Timestamp,
    Other(String),
}

impl ColumnType {
    /// SQL type the column is created with
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Other(_) => "TEXT",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Other(raw) => raw,
        }
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => ColumnType::Text,
            "integer" => ColumnType::Integer,
            "boolean" => ColumnType::Boolean,
            "timestamp" => ColumnType::Timestamp,
            _ => ColumnType::Other(value),
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Schema {
    /// Parse and validate a schema from the raw JSON entered in the console
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let schema: Schema = serde_json::from_str(raw)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check table and column names, duplicates and reserved names
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.tables.is_empty() {
            return Err(SchemaError::NoTables);
        }

        let mut table_names = HashSet::new();
        for table in &self.tables {
            if !identifier_re().is_match(&table.name) {
                return Err(SchemaError::InvalidIdentifier {
                    kind: "table",
                    name: table.name.clone(),
                });
            }
            if table.name.len() > MAX_IDENTIFIER_BYTES {
                return Err(SchemaError::IdentifierTooLong {
                    kind: "Table",
                    name: table.name.clone(),
                });
            }
            if !table_names.insert(table.name.to_lowercase()) {
                return Err(SchemaError::DuplicateTable {
                    table: table.name.clone(),
                });
            }
            table.validate()?;
        }

        Ok(())
    }

    /// Number of physical tables this schema provisions
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Pretty JSON used to pre-fill the console form
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{\"tables\": []}".to_string())
    }

    /// Starter schema shown when creating a vendor
    pub fn example() -> Self {
        Schema {
            tables: vec![Table {
                name: "tickets".to_string(),
                columns: vec![
                    Column {
                        name: "title".to_string(),
                        column_type: ColumnType::Text,
                        required: true,
                        allowed_values: None,
                    },
                    Column {
                        name: "status".to_string(),
                        column_type: ColumnType::Text,
                        required: false,
                        allowed_values: Some(vec!["open".to_string(), "closed".to_string()]),
                    },
                ],
            }],
        }
    }
}

impl Table {
    fn validate(&self) -> Result<(), SchemaError> {
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns {
                table: self.name.clone(),
            });
        }

        let mut column_names = HashSet::new();
        for column in &self.columns {
            if !identifier_re().is_match(&column.name) {
                return Err(SchemaError::InvalidIdentifier {
                    kind: "column",
                    name: column.name.clone(),
                });
            }
            if column.name.len() > MAX_IDENTIFIER_BYTES {
                return Err(SchemaError::IdentifierTooLong {
                    kind: "Column",
                    name: column.name.clone(),
                });
            }
            let lowered = column.name.to_lowercase();
            if SYSTEM_COLUMNS.contains(&lowered.as_str()) {
                return Err(SchemaError::ReservedColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
            if !column_names.insert(lowered) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
            if column.allowed_values.as_ref().is_some_and(Vec::is_empty) {
                return Err(SchemaError::EmptyEnum {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        Ok(())
    }
}
