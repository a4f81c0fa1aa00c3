//! Typed settings
//!
//! - `value`: conversion between Rust values and their stored string form
//! - `converter`: per-type overrides of that conversion
//! - `key`: key normalization and subject scoping
//! - `store`: the [`SettingsStore`] itself
//!
//! # Usage
//!
//! ```rust,ignore
//! use addonkit::settings::SettingsStore;
//!
//! let store = SettingsStore::open("settings.sqlite3")?;
//! store.init_setting("max.retries", "Max Retries", &5)?;
//!
//! let retries: u32 = store.get("max.retries", 3);
//! store.save_setting("report.printer", &"lp1".to_string(), Some("alice"), None)?;
//! ```

mod converter;
mod key;
mod store;
mod value;

pub use converter::ConverterRegistry;
pub use key::SettingKey;
pub use store::{
    SettingRecord, SettingsLayout, SettingsStore, StoreState, DEFAULT_SETTINGS_TABLE,
    DEFAULT_VALUE_FIELD, PROMPT_FIELD_ID,
};
pub use value::{
    ordinal_from_setting, ordinal_to_setting, ConversionError, OrdinalEnum, SettingValue,
    DATE_FORMAT, DATE_TIME_FORMAT,
};
