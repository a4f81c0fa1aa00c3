pub mod config;
pub mod settings;
pub mod setup;

use std::io::Write;
use std::str::FromStr;

use addonkit::settings::{SettingValue, DATE_FORMAT};
use addonkit::{
    AddonkitConfig, Host, InputKind, InputPrompter, PromptRequest, PromptValue, SettingsStore,
    Severity,
};
use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

/// Host for terminal use: warnings and errors go to stderr
pub(crate) struct ConsoleHost;

impl Host for ConsoleHost {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!("{}", message),
            Severity::Warning => eprintln!("WARNING: {}", message),
            Severity::Error => eprintln!("ERROR: {}", message),
        }
    }

    fn message_box(&self, message: &str) {
        eprintln!("ERROR: {}", message);
    }
}

/// Reads prompted values from stdin
pub(crate) struct TerminalPrompter;

impl InputPrompter for TerminalPrompter {
    fn prompt(&self, request: &PromptRequest) -> Result<PromptValue> {
        let hint = match request.kind {
            InputKind::Checkbox => " [y/N]",
            InputKind::Date => " (YYYY-MM-DD)",
            _ => "",
        };

        let mut stderr = std::io::stderr();
        writeln!(stderr, "{}", request.title)?;
        write!(stderr, "{}{}: ", request.label, hint)?;
        stderr.flush()?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| anyhow!("Failed to read input: {}", e))?;

        parse_answer(request, line.trim())
    }
}

/// Turn a typed answer into a value of the requested kind
pub(crate) fn parse_answer(request: &PromptRequest, answer: &str) -> Result<PromptValue> {
    if answer.is_empty() && request.required {
        bail!("A value for {} is required", request.label);
    }

    let value = match request.kind {
        InputKind::Text => PromptValue::Text(answer.to_string()),
        InputKind::Checkbox => PromptValue::Checkbox(!answer.is_empty() && bool::from_setting(answer)?),
        InputKind::Date => NaiveDate::parse_from_str(answer, DATE_FORMAT)
            .map(PromptValue::Date)
            .map_err(|e| anyhow!("Invalid date '{}': {}", answer, e))?,
        InputKind::Integer => answer
            .parse::<i64>()
            .map(PromptValue::Integer)
            .map_err(|e| anyhow!("Invalid integer '{}': {}", answer, e))?,
        InputKind::Decimal => Decimal::from_str(answer)
            .map(PromptValue::Decimal)
            .map_err(|e| anyhow!("Invalid decimal '{}': {}", answer, e))?,
    };

    Ok(value)
}

/// Open the configured store with terminal host and prompter
pub(crate) fn open_store(config: &AddonkitConfig) -> Result<SettingsStore> {
    Ok(SettingsStore::from_config(config)?
        .with_host(Box::new(ConsoleHost))
        .with_prompter(Box::new(TerminalPrompter)))
}
