//! Database module
//!
//! All storage goes through SQLite:
//!
//! ```text
//! database/
//! └── core/
//!     ├── connection  # DatabaseConn, the query executor
//!     ├── schema      # provisioning catalog tables and versioning
//!     └── provision   # idempotent user tables and fields
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use addonkit::database::{DatabaseConn, FieldDef, SqliteProvisioner, TableDef, UserTable};
//!
//! let db = DatabaseConn::open_path("settings.sqlite3")?;
//! let provisioner = SqliteProvisioner::new();
//!
//! UserTable::create(&provisioner, &db, &TableDef::new("pos_terminals", "POS terminals"))?
//!     .create_field(&FieldDef::new("location", "Location"))?;
//! ```

pub mod core;

pub use core::{
    validate_identifier, yes_no_values, DatabaseConn, FieldDef, FieldSubType, FieldType,
    ProvisioningError, SchemaDefinitions, SchemaManager, SchemaProvisioner, SchemaStatus,
    SqliteProvisioner, TableDef, TableKind, UserTable, SCHEMA_VERSION,
};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
