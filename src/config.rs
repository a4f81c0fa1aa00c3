use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::database::core::validate_identifier;
use crate::settings::{SettingsLayout, DEFAULT_SETTINGS_TABLE, DEFAULT_VALUE_FIELD};

pub struct AddonkitConfig {
    /// Configuration file that was loaded
    pub config_file: String,

    /// Path to the directory holding the settings database
    pub data_dir: String,

    /// Table that stores the settings
    pub settings_table: String,

    /// Column of the settings table that stores the values
    pub settings_value_field: String,
}

const EMPTY_CONFIG: &str = r#"### addonkit configuration file

### directory for the settings database
# data_dir = "~/.addonkit"

### table and value column used by the settings store
# settings_table = "addon_settings"
# settings_value_field = "setting_value"
"#;

/// Keys read from the configuration file and `ADDONKIT_*` variables
#[derive(Debug, Default, Deserialize)]
struct AddonkitConfigFile {
    data_dir: Option<String>,
    settings_table: Option<String>,
    settings_value_field: Option<String>,
}

impl AddonkitConfigFile {
    fn resolve(self, config_file: String, default_dir: &str) -> Result<AddonkitConfig> {
        let settings_table = self
            .settings_table
            .unwrap_or_else(|| DEFAULT_SETTINGS_TABLE.to_string());
        let settings_value_field = self
            .settings_value_field
            .unwrap_or_else(|| DEFAULT_VALUE_FIELD.to_string());

        validate_identifier(&settings_table)
            .map_err(|e| anyhow!("Invalid settings_table: {}", e))?;
        validate_identifier(&settings_value_field)
            .map_err(|e| anyhow!("Invalid settings_value_field: {}", e))?;

        Ok(AddonkitConfig {
            config_file,
            data_dir: self
                .data_dir
                .map(|dir| expand_home(&dir))
                .unwrap_or_else(|| default_dir.to_string()),
            settings_table,
            settings_value_field,
        })
    }
}

fn home_dir() -> String {
    dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl Default for AddonkitConfig {
    fn default() -> Self {
        let data_dir = format!("{}/.addonkit", home_dir());
        Self {
            config_file: format!("{}/addonkit.toml", data_dir),
            data_dir,
            settings_table: DEFAULT_SETTINGS_TABLE.to_string(),
            settings_value_field: DEFAULT_VALUE_FIELD.to_string(),
        }
    }
}

impl AddonkitConfig {
    /// Load the configuration from `path`, or from `~/.addonkit/addonkit.toml`
    ///
    /// A missing file is created from a commented template. `ADDONKIT_*`
    /// environment variables override the file.
    pub fn new(path: &Option<String>) -> Result<AddonkitConfig> {
        let defaults = AddonkitConfig::default();

        let config_file = match path {
            Some(p) => p.clone(),
            None => {
                std::fs::create_dir_all(&defaults.data_dir)
                    .map_err(|e| anyhow!("Unable to create addonkit directory: {}", e))?;
                defaults.config_file.clone()
            }
        };

        if !Path::new(&config_file).exists() {
            std::fs::write(&config_file, EMPTY_CONFIG)
                .map_err(|e| anyhow!("Unable to create config file {}: {}", config_file, e))?;
        }

        // E.g., `ADDONKIT_SETTINGS_TABLE=shop_settings addonkit list`
        let file: AddonkitConfigFile = Config::builder()
            .add_source(config::File::new(&config_file, config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix("ADDONKIT"))
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?
            .try_deserialize()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        file.resolve(config_file, &defaults.data_dir)
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/addonkit-settings.sqlite3", data_dir)
    }

    /// Table layout of the settings store
    pub fn layout(&self) -> SettingsLayout {
        SettingsLayout::new(&self.settings_table, &self.settings_value_field)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Settings Table:     {}", self.settings_table),
            format!("Value Column:       {}", self.settings_value_field),
        ]
        .join("\n")
    }
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{}", home.to_string_lossy(), rest),
        _ => path.to_string(),
    }
}

// =============================================================================
// Store info (used by the config command)
// =============================================================================

/// Information about the settings database
#[derive(Debug, Serialize, Clone)]
pub struct StoreInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub table: String,
    pub value_field: String,
    pub provisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting_count: Option<u64>,
}

/// Inspect the settings database without provisioning anything
pub fn get_store_info(config: &AddonkitConfig) -> StoreInfo {
    use crate::database::{DatabaseConn, SchemaManager, SchemaStatus};

    let path = config.sqlite_path();
    let exists = Path::new(&path).exists();
    let size_bytes = if exists {
        std::fs::metadata(&path).ok().map(|m| m.len())
    } else {
        None
    };

    let mut info = StoreInfo {
        path,
        exists,
        size_bytes,
        table: config.settings_table.clone(),
        value_field: config.settings_value_field.clone(),
        provisioned: false,
        catalog_version: None,
        setting_count: None,
    };

    if !exists {
        return info;
    }

    if let Ok(db) = DatabaseConn::open_path(&info.path) {
        info.catalog_version = match SchemaManager::new(&db.conn).check_status() {
            Ok(SchemaStatus::Current) => Some(crate::database::SCHEMA_VERSION),
            Ok(SchemaStatus::NeedsMigration { from, .. }) => Some(from),
            Ok(SchemaStatus::Incompatible {
                database_version, ..
            }) => Some(database_version),
            _ => None,
        };
        info.provisioned = db
            .column_exists(&info.table, &info.value_field)
            .unwrap_or(false);
        if info.provisioned {
            info.setting_count = db.table_count(&info.table).ok();
        }
    }

    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
