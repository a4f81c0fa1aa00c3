//! Idempotent schema provisioning
//!
//! Host applications usually expose an API to create "user defined" tables
//! and fields. [`SchemaProvisioner`] is that capability as seen by the
//! settings store: ensure a table, ensure a field, and do nothing when the
//! target is already there. [`SqliteProvisioner`] implements it directly on
//! SQLite and records descriptions and valid values in the catalog managed by
//! [`SchemaManager`].

use std::fmt;

use rusqlite::params;
use tracing::{debug, info};

use super::connection::DatabaseConn;
use super::schema::SchemaManager;

/// Maximum identifier length accepted for table and field names
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Default size of an alphanumeric field
pub const DEFAULT_FIELD_SIZE: u32 = 50;

// =============================================================================
// Definitions
// =============================================================================

/// Kind of a user table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableKind {
    /// Plain table without a business object behind it
    #[default]
    NoObject,
    MasterData,
    MasterDataLines,
    Document,
    DocumentLines,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::NoObject => "no_object",
            TableKind::MasterData => "master_data",
            TableKind::MasterDataLines => "master_data_lines",
            TableKind::Document => "document",
            TableKind::DocumentLines => "document_lines",
        }
    }
}

/// Storage type of a user field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldType {
    /// Short text, bounded by the field size
    #[default]
    Alpha,
    /// Long text
    Memo,
    Numeric,
    Date,
    Float,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Alpha => "alpha",
            FieldType::Memo => "memo",
            FieldType::Numeric => "numeric",
            FieldType::Date => "date",
            FieldType::Float => "float",
        }
    }

    /// SQLite column type used for this field type
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Alpha | FieldType::Memo | FieldType::Date => "TEXT",
            FieldType::Numeric => "INTEGER",
            FieldType::Float => "REAL",
        }
    }
}

/// Presentation sub type of a user field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldSubType {
    #[default]
    None,
    Address,
    Phone,
    Time,
    Rate,
    Sum,
    Price,
    Quantity,
    Percentage,
    Measurement,
    Link,
    Image,
}

impl FieldSubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSubType::None => "none",
            FieldSubType::Address => "address",
            FieldSubType::Phone => "phone",
            FieldSubType::Time => "time",
            FieldSubType::Rate => "rate",
            FieldSubType::Sum => "sum",
            FieldSubType::Price => "price",
            FieldSubType::Quantity => "quantity",
            FieldSubType::Percentage => "percentage",
            FieldSubType::Measurement => "measurement",
            FieldSubType::Link => "link",
            FieldSubType::Image => "image",
        }
    }
}

/// A user table to ensure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub description: String,
    pub kind: TableKind,
}

impl TableDef {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind: TableKind::default(),
        }
    }

    pub fn kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A user field to ensure on a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub description: String,
    pub field_type: FieldType,
    pub size: u32,
    pub sub_type: FieldSubType,
    /// Valid value codes and their display labels, in display order
    pub valid_values: Vec<(String, String)>,
    pub default_value: Option<String>,
}

impl FieldDef {
    /// Alphanumeric field of the default size
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            field_type: FieldType::default(),
            size: DEFAULT_FIELD_SIZE,
            sub_type: FieldSubType::default(),
            valid_values: Vec::new(),
            default_value: None,
        }
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn sub_type(mut self, sub_type: FieldSubType) -> Self {
        self.sub_type = sub_type;
        self
    }

    pub fn valid_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.valid_values = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }
}

/// The usual `Y`/`N` valid values for flag fields
pub fn yes_no_values() -> Vec<(String, String)> {
    vec![
        ("Y".to_string(), "Yes".to_string()),
        ("N".to_string(), "No".to_string()),
    ]
}

// =============================================================================
// Errors
// =============================================================================

/// Errors reported by a schema provisioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    /// Table or field name is not a plain identifier
    InvalidIdentifier { identifier: String },
    /// The backing store failed while ensuring the target
    Storage { target: String, message: String },
    /// The definition cannot be applied as given
    Rejected { target: String, message: String },
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningError::InvalidIdentifier { identifier } => {
                write!(f, "Invalid identifier '{}'", identifier)
            }
            ProvisioningError::Storage { target, message } => {
                write!(f, "Could not provision {}: {}", target, message)
            }
            ProvisioningError::Rejected { target, message } => {
                write!(f, "Rejected definition for {}: {}", target, message)
            }
        }
    }
}

impl std::error::Error for ProvisioningError {}

/// Check that `name` can be interpolated into DDL as an identifier
pub fn validate_identifier(name: &str) -> Result<(), ProvisioningError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(ProvisioningError::InvalidIdentifier {
            identifier: name.to_string(),
        })
    }
}

fn storage_error(target: &str, e: impl fmt::Display) -> ProvisioningError {
    ProvisioningError::Storage {
        target: target.to_string(),
        message: e.to_string(),
    }
}

/// Render a string as a SQL literal for DDL, where parameters are not allowed
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

// =============================================================================
// Provisioner
// =============================================================================

/// Capability to create tables and fields idempotently
///
/// Both operations must be no-ops when the target already exists and must
/// report failures instead of pretending to succeed.
pub trait SchemaProvisioner {
    fn ensure_table(&self, db: &DatabaseConn, table: &TableDef) -> Result<(), ProvisioningError>;

    fn ensure_field(
        &self,
        db: &DatabaseConn,
        table: &str,
        field: &FieldDef,
    ) -> Result<(), ProvisioningError>;
}

/// Schema provisioner working directly on SQLite
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProvisioner;

impl SqliteProvisioner {
    pub fn new() -> Self {
        Self
    }

    fn ensure_catalog(&self, db: &DatabaseConn, target: &str) -> Result<(), ProvisioningError> {
        SchemaManager::new(&db.conn)
            .ensure_current()
            .map_err(|e| storage_error(target, e))
    }

    /// Description recorded for a user table
    pub fn table_description(
        &self,
        db: &DatabaseConn,
        table: &str,
    ) -> anyhow::Result<Option<String>> {
        db.query_optional(
            "SELECT description FROM addonkit_user_tables WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )
    }

    /// Valid values recorded for a user field, in insertion order
    pub fn field_valid_values(
        &self,
        db: &DatabaseConn,
        table: &str,
        field: &str,
    ) -> anyhow::Result<Vec<(String, String)>> {
        let mut stmt = db.conn.prepare(
            "SELECT value, description FROM addonkit_valid_values
             WHERE table_name = ?1 AND alias = ?2
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([table, field], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl SchemaProvisioner for SqliteProvisioner {
    fn ensure_table(&self, db: &DatabaseConn, table: &TableDef) -> Result<(), ProvisioningError> {
        validate_identifier(&table.name)?;
        let target = format!("table {}", table.name);
        self.ensure_catalog(db, &target)?;

        let exists = db
            .table_exists(&table.name)
            .map_err(|e| storage_error(&target, e))?;

        if !exists {
            let sql = format!(
                "CREATE TABLE \"{}\" (code TEXT PRIMARY KEY, name TEXT NOT NULL)",
                table.name
            );
            db.execute(&sql).map_err(|e| storage_error(&target, e))?;
            info!("Created user table {}", table.name);
        } else {
            debug!("User table {} already present", table.name);
        }

        db.execute_with_params(
            "INSERT OR IGNORE INTO addonkit_user_tables (table_name, description, kind) VALUES (?1, ?2, ?3)",
            params![table.name, table.description, table.kind.as_str()],
        )
        .map_err(|e| storage_error(&target, e))?;

        Ok(())
    }

    fn ensure_field(
        &self,
        db: &DatabaseConn,
        table: &str,
        field: &FieldDef,
    ) -> Result<(), ProvisioningError> {
        validate_identifier(table)?;
        validate_identifier(&field.name)?;
        let target = format!("field {}.{}", table, field.name);
        self.ensure_catalog(db, &target)?;

        let table_exists = db
            .table_exists(table)
            .map_err(|e| storage_error(&target, e))?;
        if !table_exists {
            return Err(ProvisioningError::Rejected {
                target,
                message: "table does not exist".to_string(),
            });
        }

        // Lookup by alias: an existing column means there is nothing to do.
        let field_exists = db
            .column_exists(table, &field.name)
            .map_err(|e| storage_error(&target, e))?;
        if field_exists {
            debug!("User field {}.{} already present", table, field.name);
            return Ok(());
        }

        if let Some(default) = &field.default_value {
            if !field.valid_values.is_empty()
                && !field.valid_values.iter().any(|(code, _)| code == default)
            {
                return Err(ProvisioningError::Rejected {
                    target,
                    message: format!("default value '{}' is not a valid value", default),
                });
            }
        }

        let mut ddl = format!(
            "ALTER TABLE \"{}\" ADD COLUMN \"{}\" {}",
            table,
            field.name,
            field.field_type.sql_type()
        );
        if let Some(default) = &field.default_value {
            ddl.push_str(" DEFAULT ");
            ddl.push_str(&sql_literal(default));
        }

        let tx = db
            .conn
            .unchecked_transaction()
            .map_err(|e| storage_error(&target, e))?;

        tx.execute(&ddl, []).map_err(|e| storage_error(&target, e))?;
        tx.execute(
            "INSERT OR REPLACE INTO addonkit_user_fields
                (table_name, alias, description, field_type, sub_type, size, default_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                table,
                field.name,
                field.description,
                field.field_type.as_str(),
                field.sub_type.as_str(),
                field.size,
                field.default_value,
            ],
        )
        .map_err(|e| storage_error(&target, e))?;

        for (value, description) in &field.valid_values {
            tx.execute(
                "INSERT OR REPLACE INTO addonkit_valid_values (table_name, alias, value, description)
                 VALUES (?1, ?2, ?3, ?4)",
                params![table, field.name, value, description],
            )
            .map_err(|e| storage_error(&target, e))?;
        }

        tx.commit().map_err(|e| storage_error(&target, e))?;
        info!("Created user field {}.{}", table, field.name);

        Ok(())
    }
}

// =============================================================================
// Fluent helper
// =============================================================================

/// Handle on an ensured user table, used to chain field creation
pub struct UserTable<'a> {
    provisioner: &'a dyn SchemaProvisioner,
    db: &'a DatabaseConn,
    name: String,
}

impl<'a> UserTable<'a> {
    /// Ensure `table` exists and return a handle for adding fields to it
    pub fn create(
        provisioner: &'a dyn SchemaProvisioner,
        db: &'a DatabaseConn,
        table: &TableDef,
    ) -> Result<Self, ProvisioningError> {
        provisioner.ensure_table(db, table)?;
        Ok(Self {
            provisioner,
            db,
            name: table.name.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ensure a field on this table
    pub fn create_field(&self, field: &FieldDef) -> Result<&Self, ProvisioningError> {
        self.provisioner.ensure_field(self.db, &self.name, field)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> DatabaseConn {
        DatabaseConn::open_in_memory().unwrap()
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("addon_settings").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("bad name").is_err());
        assert!(validate_identifier("x\"; DROP TABLE y; --").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn test_ensure_table_is_idempotent() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();
        let table = TableDef::new("test_table", "Test").kind(TableKind::MasterData);

        provisioner.ensure_table(&db, &table).unwrap();
        db.execute("INSERT INTO test_table (code, name) VALUES ('a', 'A')")
            .unwrap();
        provisioner.ensure_table(&db, &table).unwrap();

        assert_eq!(db.table_count("test_table").unwrap(), 1);
        assert_eq!(
            provisioner.table_description(&db, "test_table").unwrap(),
            Some("Test".to_string())
        );
    }

    #[test]
    fn test_ensure_field_with_valid_values() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();

        let table = UserTable::create(&provisioner, &db, &TableDef::new("flags", "Flags")).unwrap();
        table
            .create_field(
                &FieldDef::new("active", "Active")
                    .size(1)
                    .valid_values(yes_no_values())
                    .default_value("N"),
            )
            .unwrap()
            .create_field(&FieldDef::new("amount", "Amount").field_type(FieldType::Float))
            .unwrap();

        assert!(db.column_exists("flags", "active").unwrap());
        assert!(db.column_exists("flags", "amount").unwrap());
        assert_eq!(
            provisioner.field_valid_values(&db, "flags", "active").unwrap(),
            yes_no_values()
        );

        db.execute("INSERT INTO flags (code, name) VALUES ('x', 'X')")
            .unwrap();
        let active: String = db
            .conn
            .query_row("SELECT active FROM flags WHERE code = 'x'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(active, "N");
    }

    #[test]
    fn test_ensure_field_twice_is_noop() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();
        let table = UserTable::create(&provisioner, &db, &TableDef::new("t", "T")).unwrap();
        let field = FieldDef::new("value", "Value");

        table.create_field(&field).unwrap();
        table.create_field(&field).unwrap();

        let columns = db
            .query_rows("SELECT name FROM pragma_table_info('t')", [])
            .unwrap();
        assert_eq!(columns.len(), 3);
    }

    #[test]
    fn test_ensure_field_on_missing_table() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();
        let result = provisioner.ensure_field(&db, "missing", &FieldDef::new("value", "Value"));
        assert!(matches!(result, Err(ProvisioningError::Rejected { .. })));
    }

    #[test]
    fn test_default_must_be_valid_value() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();
        let table = UserTable::create(&provisioner, &db, &TableDef::new("t", "T")).unwrap();

        let result = table.create_field(
            &FieldDef::new("flag", "Flag")
                .valid_values(yes_no_values())
                .default_value("maybe"),
        );
        assert!(matches!(result, Err(ProvisioningError::Rejected { .. })));
        assert!(!db.column_exists("t", "flag").unwrap());
    }

    #[test]
    fn test_default_literal_is_escaped() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();
        let table = UserTable::create(&provisioner, &db, &TableDef::new("t", "T")).unwrap();
        table
            .create_field(&FieldDef::new("note", "Note").default_value("it's"))
            .unwrap();

        db.execute("INSERT INTO t (code, name) VALUES ('a', 'A')")
            .unwrap();
        let note: String = db
            .conn
            .query_row("SELECT note FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(note, "it's");
    }

    #[test]
    fn test_invalid_table_name_is_rejected_before_sql() {
        let db = setup();
        let provisioner = SqliteProvisioner::new();
        let result = provisioner.ensure_table(&db, &TableDef::new("no way", "Nope"));
        assert_eq!(
            result,
            Err(ProvisioningError::InvalidIdentifier {
                identifier: "no way".to_string()
            })
        );
    }
}
