//! Register two setup units, run them twice and print the recorded versions
//!
//! ```text
//! cargo run --example setup_units
//! ```

use addonkit::database::{yes_no_values, FieldDef, FieldType, TableDef, TableKind, UserTable};
use addonkit::output::format_rows;
use addonkit::setup::SetupStatus;
use addonkit::{OutputFormat, SettingsStore, SetupRegistry, SetupRunner, SetupUnit};
use anyhow::Result;
use tabled::Tabled;
use tracing::Level;

/// Terminal table with an approval flag
#[derive(Default)]
struct TerminalSetup;

impl SetupUnit for TerminalSetup {
    fn version(&self) -> u32 {
        2
    }

    fn run(&self, store: &SettingsStore) -> Result<()> {
        UserTable::create(
            store.provisioner(),
            store.connection(),
            &TableDef::new("pos_terminals", "POS terminals").kind(TableKind::MasterData),
        )?
        .create_field(&FieldDef::new("location", "Location").size(100))?
        .create_field(
            &FieldDef::new("approved", "Approved")
                .valid_values(yes_no_values())
                .default_value("N"),
        )?;
        Ok(())
    }
}

/// Default limits
#[derive(Default)]
struct LimitsSetup;

impl SetupUnit for LimitsSetup {
    fn version(&self) -> u32 {
        1
    }

    fn run(&self, store: &SettingsStore) -> Result<()> {
        store.init_setting("max.retries", "Max Retries", &5)?;
        store.init_setting("terminal.timeout", "Terminal timeout (s)", &30u32)?;
        UserTable::create(
            store.provisioner(),
            store.connection(),
            &TableDef::new("pos_limits", "POS limits"),
        )?
        .create_field(&FieldDef::new("amount", "Amount").field_type(FieldType::Float))?;
        Ok(())
    }
}

#[derive(Tabled, serde::Serialize)]
struct StatusRow {
    unit: String,
    declared: u32,
    applied: u32,
}

impl From<SetupStatus> for StatusRow {
    fn from(status: SetupStatus) -> Self {
        StatusRow {
            unit: status.unit,
            declared: status.declared_version,
            applied: status.last_applied,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let store = SettingsStore::open_in_memory()?;
    let registry = SetupRegistry::new()
        .with::<TerminalSetup>()
        .with::<LimitsSetup>();
    let runner = SetupRunner::new(&store);

    let first = runner.run_all(&registry);
    println!("first pass: {} applied, {} failed", first.applied(), first.failed());

    let second = runner.run_all(&registry);
    println!("second pass: {} up-to-date", second.up_to_date());

    let rows: Vec<StatusRow> = runner
        .status(&registry)
        .into_iter()
        .map(StatusRow::from)
        .collect();
    println!("{}", format_rows(&rows, OutputFormat::Table)?);

    let retries: u32 = store.get("max.retries", 0);
    println!("max.retries = {}", retries);
    Ok(())
}
