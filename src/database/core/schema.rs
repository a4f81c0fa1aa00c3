//! Provisioning catalog schema management
//!
//! The SQLite provisioner keeps a small catalog next to the user tables it
//! creates: table descriptions and kinds, field metadata and the valid values
//! attached to a field. This module owns the catalog tables and their version.

use anyhow::{anyhow, Result};
use rusqlite::{Connection, OptionalExtension};

/// Current catalog schema version
/// Increment this when making breaking catalog changes
pub const SCHEMA_VERSION: u32 = 1;

/// Schema definitions for the provisioning catalog
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// SQL for creating the meta table (tracks catalog version)
    pub const META_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS addonkit_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for creating the user table catalog
    pub const USER_TABLES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS addonkit_user_tables (
            table_name TEXT PRIMARY KEY,
            description TEXT NOT NULL,
            kind TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );
    "#;

    /// SQL for creating the user field catalog
    pub const USER_FIELDS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS addonkit_user_fields (
            table_name TEXT NOT NULL,
            alias TEXT NOT NULL,
            description TEXT NOT NULL,
            field_type TEXT NOT NULL,
            sub_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            default_value TEXT,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            PRIMARY KEY (table_name, alias)
        );
    "#;

    /// SQL for creating the valid values attached to user fields
    pub const VALID_VALUES_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS addonkit_valid_values (
            table_name TEXT NOT NULL,
            alias TEXT NOT NULL,
            value TEXT NOT NULL,
            description TEXT NOT NULL,
            PRIMARY KEY (table_name, alias, value),
            FOREIGN KEY (table_name, alias)
                REFERENCES addonkit_user_fields(table_name, alias) ON DELETE CASCADE
        );
    "#;

    /// Catalog tables, in creation order
    pub const CATALOG_TABLES: &'static [&'static str] = &[
        "addonkit_meta",
        "addonkit_user_tables",
        "addonkit_user_fields",
        "addonkit_valid_values",
    ];
}

/// Schema manager for the provisioning catalog
///
/// Handles catalog initialization and version checking.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Initialize the catalog schema
    ///
    /// Creates all catalog tables if they don't exist and records the
    /// catalog version.
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::META_TABLE, [])
            .map_err(|e| anyhow!("Failed to create meta table: {}", e))?;

        self.set_meta("schema_version", &SCHEMA_VERSION.to_string())?;

        self.conn
            .execute(SchemaDefinitions::USER_TABLES_TABLE, [])
            .map_err(|e| anyhow!("Failed to create addonkit_user_tables table: {}", e))?;

        self.conn
            .execute(SchemaDefinitions::USER_FIELDS_TABLE, [])
            .map_err(|e| anyhow!("Failed to create addonkit_user_fields table: {}", e))?;

        self.conn
            .execute(SchemaDefinitions::VALID_VALUES_TABLE, [])
            .map_err(|e| anyhow!("Failed to create addonkit_valid_values table: {}", e))?;

        Ok(())
    }

    /// Check the current catalog status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        let meta_exists: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='addonkit_meta'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to inspect sqlite_master: {}", e))?;

        if meta_exists == 0 {
            return Ok(SchemaStatus::NotInitialized);
        }

        let current_version = self.get_schema_version()?;

        if current_version == SCHEMA_VERSION {
            if self.verify_integrity()? {
                Ok(SchemaStatus::Current)
            } else {
                Ok(SchemaStatus::Corrupted)
            }
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    /// Bring the catalog to the current version
    ///
    /// Catalog tables only ever gain tables, so every status except
    /// `Incompatible` is fixed by re-running `initialize`.
    pub fn ensure_current(&self) -> Result<()> {
        match self.check_status()? {
            SchemaStatus::Current => Ok(()),
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => Err(anyhow!(
                "Provisioning catalog is v{} but this build supports v{}",
                database_version,
                required_version
            )),
            _ => self.initialize(),
        }
    }

    /// Get the current catalog version from the database
    fn get_schema_version(&self) -> Result<u32> {
        let version = self
            .get_meta("schema_version")?
            .unwrap_or_else(|| "0".to_string());

        version
            .parse()
            .map_err(|e| anyhow!("Invalid schema version: {}", e))
    }

    /// Verify catalog integrity by checking required tables exist
    fn verify_integrity(&self) -> Result<bool> {
        for table in SchemaDefinitions::CATALOG_TABLES {
            let exists: i32 = self
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .map_err(|e| anyhow!("Failed to inspect sqlite_master: {}", e))?;

            if exists == 0 {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Set a metadata value
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO addonkit_meta (key, value, updated_at) VALUES (?1, ?2, strftime('%s', 'now'))",
                [key, value],
            )
            .map_err(|e| anyhow!("Failed to set meta value: {}", e))?;
        Ok(())
    }

    /// Get a metadata value
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM addonkit_meta WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to get meta value: {}", e))
    }
}

/// Status of the provisioning catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Catalog is not initialized (fresh database)
    NotInitialized,

    /// Catalog is current and valid
    Current,

    /// Catalog needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version (incompatible)
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Catalog is missing tables
    Corrupted,
}
