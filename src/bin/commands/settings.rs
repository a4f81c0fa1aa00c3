use addonkit::output::{format_json, format_rows};
use addonkit::{AddonkitConfig, OutputFormat, SettingKey, SettingRecord};
use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use super::open_store;

/// Arguments for the Get command
#[derive(Args)]
pub struct GetArgs {
    /// Setting key, e.g. mail.port
    pub key: String,

    /// Read the value stored for this subject (usually a user code)
    #[clap(short, long)]
    pub subject: Option<String>,

    /// Value printed when the setting is missing
    #[clap(short, long)]
    pub default: Option<String>,

    /// Ask for the value on the terminal when it is missing, and save it
    #[clap(long)]
    pub ask: bool,
}

/// Arguments for the Set command
#[derive(Args)]
pub struct SetArgs {
    /// Setting key
    pub key: String,

    /// New value
    #[clap(required_unless_present = "null")]
    pub value: Option<String>,

    /// Save the value for this subject (usually a user code)
    #[clap(short, long)]
    pub subject: Option<String>,

    /// Label of the setting, used when it is created
    #[clap(short, long)]
    pub name: Option<String>,

    /// Clear the value (store NULL)
    #[clap(long, conflicts_with = "value")]
    pub null: bool,
}

/// Arguments for the Init command
#[derive(Args)]
pub struct InitArgs {
    /// Setting key
    pub key: String,

    /// Label of the setting
    pub name: String,

    /// Value written when the setting has no value yet
    pub default: String,
}

/// Arguments for the List command
#[derive(Args)]
pub struct ListArgs {
    /// Only list keys starting with this prefix
    pub prefix: Option<String>,
}

#[derive(Serialize)]
struct GetResult {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    value: String,
}

#[derive(Serialize, Tabled)]
struct SettingRow {
    code: String,
    name: String,
    value: String,
}

impl From<SettingRecord> for SettingRow {
    fn from(record: SettingRecord) -> Self {
        SettingRow {
            code: record.code,
            name: record.name,
            value: record.value.unwrap_or_else(|| "NULL".to_string()),
        }
    }
}

pub fn run_get(config: &AddonkitConfig, args: GetArgs, output_format: OutputFormat) -> Result<()> {
    let GetArgs {
        key,
        subject,
        default,
        ask,
    } = args;

    let store = open_store(config)?;

    let value = if ask {
        Some(store.get_by_key(&key, default.unwrap_or_default(), subject.as_deref(), true))
    } else {
        store
            .get_setting_as_string(&key, subject.as_deref())?
            .filter(|v| !v.is_empty())
            .or(default)
    };

    let Some(value) = value else {
        bail!("Setting '{}' not found", key);
    };

    if output_format.is_json() {
        let result = GetResult {
            key,
            subject,
            value,
        };
        println!("{}", format_json(&[result], output_format)?);
    } else {
        println!("{}", value);
    }

    Ok(())
}

pub fn run_set(config: &AddonkitConfig, args: SetArgs) -> Result<()> {
    let SetArgs {
        key,
        value,
        subject,
        name,
        null,
    } = args;

    let store = open_store(config)?;
    let value = if null { None } else { value };

    store.save_setting(&key, &value, subject.as_deref(), name.as_deref())?;
    eprintln!("Saved setting {}", SettingKey::new(&key, subject.as_deref()));
    Ok(())
}

pub fn run_init(config: &AddonkitConfig, args: InitArgs) -> Result<()> {
    let InitArgs { key, name, default } = args;

    let store = open_store(config)?;
    if store.init_setting(&key, &name, &default)? {
        println!("Seeded setting {} with '{}'", key, default);
    } else {
        println!("Setting {} already has a value", key);
    }
    Ok(())
}

pub fn run_list(config: &AddonkitConfig, args: ListArgs, output_format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let records = store.list(args.prefix.as_deref())?;

    if output_format.is_json() {
        println!("{}", format_json(&records, output_format)?);
        return Ok(());
    }

    if records.is_empty() {
        eprintln!("No settings found");
        return Ok(());
    }

    let rows: Vec<SettingRow> = records.into_iter().map(SettingRow::from).collect();
    println!("{}", format_rows(&rows, output_format)?);
    Ok(())
}
