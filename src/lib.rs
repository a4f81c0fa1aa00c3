#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! addonkit - typed settings and versioned setup for host add-ons
//!
//! addonkit keeps the settings of an add-on in one key/value table of the
//! host database and runs the add-on's setup routines exactly once per
//! version increase. It can be used both as a library and through the
//! `addonkit` command-line tool.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Settings store, setup runner, SQLite provisioner | `rusqlite`, `config` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | `addonkit` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! addonkit = { version = "0.3", default-features = false }
//!
//! # Default (CLI binary)
//! addonkit = "0.3"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: SQLite connection, provisioning catalog and the
//!   [`SchemaProvisioner`] that creates user tables and fields
//! - **[`host`]**: capabilities of the host application (notifications,
//!   current user, typed input dialog)
//! - **[`settings`]**: value conversion, key normalization and the
//!   [`SettingsStore`]
//! - **[`setup`]**: setup units, their registry and the version-gated runner
//! - **[`config`]**: configuration management
//!
//! # Quick Start
//!
//! ## Settings
//!
//! ```rust,ignore
//! use addonkit::SettingsStore;
//!
//! let store = SettingsStore::open("~/.addonkit/addonkit-settings.sqlite3")?;
//!
//! // Seed a default once; later calls leave the stored value alone
//! store.init_setting("max.retries", "Max Retries", &5)?;
//! let retries: u32 = store.get("max.retries", 3);
//!
//! // Per-user override
//! store.save_setting("report.printer", &"lp1".to_string(), Some("alice"), None)?;
//! let printer = store.get_for_subject("report.printer", "alice", String::new());
//! ```
//!
//! ## Setup Units
//!
//! ```rust,ignore
//! use addonkit::{SettingsStore, SetupRegistry, SetupRunner, SetupUnit};
//!
//! #[derive(Default)]
//! struct InvoiceSetup;
//!
//! impl SetupUnit for InvoiceSetup {
//!     fn version(&self) -> u32 {
//!         2
//!     }
//!
//!     fn run(&self, store: &SettingsStore) -> anyhow::Result<()> {
//!         store.init_setting("invoice.approval.limit", "Approval limit", &1000)?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = SetupRegistry::new().with::<InvoiceSetup>();
//! let report = SetupRunner::new(&store).run_all(&registry);
//! ```

pub mod config;
pub mod database;
pub mod host;
pub mod output;
pub mod settings;
pub mod setup;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, get_store_info, AddonkitConfig, StoreInfo};

// =============================================================================
// Database
// =============================================================================

pub use database::{
    DatabaseConn, FieldDef, FieldSubType, FieldType, ProvisioningError, SchemaProvisioner,
    SqliteProvisioner, TableDef, TableKind, UserTable,
};

// =============================================================================
// Host, settings and setup
// =============================================================================

pub use host::{Host, InputKind, InputPrompter, PromptRequest, PromptValue, Severity, TracingHost};

pub use settings::{
    ConversionError, ConverterRegistry, SettingKey, SettingRecord, SettingValue, SettingsLayout,
    SettingsStore, StoreState,
};

pub use setup::{
    SetupExecutionError, SetupOutcome, SetupRegistry, SetupReport, SetupRunner, SetupStatus,
    SetupUnit,
};

pub use output::OutputFormat;
