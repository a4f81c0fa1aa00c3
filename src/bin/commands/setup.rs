use addonkit::output::format_rows;
use addonkit::setup::SETUP_VERSION_PREFIX;
use addonkit::{AddonkitConfig, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use super::open_store;

#[derive(Serialize, Tabled)]
struct SetupVersionRow {
    unit: String,
    version: u32,
    key: String,
}

pub fn run(config: &AddonkitConfig, output_format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let records = store.list(Some(SETUP_VERSION_PREFIX))?;

    if records.is_empty() && !output_format.is_json() {
        eprintln!("No setup has been applied yet");
        return Ok(());
    }

    let prefix = SETUP_VERSION_PREFIX.to_lowercase();
    let rows: Vec<SetupVersionRow> = records
        .into_iter()
        .map(|record| SetupVersionRow {
            unit: record
                .code
                .strip_prefix(prefix.as_str())
                .unwrap_or(&record.code)
                .to_string(),
            version: record
                .value
                .as_deref()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            key: record.code,
        })
        .collect();

    println!("{}", format_rows(&rows, output_format)?);
    Ok(())
}
