//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: SQLite connection wrapper, the query executor
//! - `SchemaManager`: provisioning catalog initialization and versioning
//! - `SchemaProvisioner`: idempotent table and field provisioning

mod connection;
mod provision;
mod schema;

pub use connection::DatabaseConn;
pub use provision::{
    validate_identifier, yes_no_values, FieldDef, FieldSubType, FieldType, ProvisioningError,
    SchemaProvisioner, SqliteProvisioner, TableDef, TableKind, UserTable, DEFAULT_FIELD_SIZE,
    MAX_IDENTIFIER_LEN,
};
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
