//! Typed settings store
//!
//! Settings live in one user table with a `code` primary key, a `name` label
//! and a single text value column. The table is provisioned lazily on first
//! use. Reads never fail: any problem is reported to the host as a warning
//! and the caller's default is returned. Writes propagate their errors.

use std::cell::RefCell;

use anyhow::{anyhow, bail, Result};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AddonkitConfig;
use crate::database::core::{
    DatabaseConn, FieldDef, FieldType, SchemaProvisioner, SqliteProvisioner, TableDef, UserTable,
};
use crate::host::{Host, InputPrompter, PromptRequest, Severity, TracingHost};

use super::converter::ConverterRegistry;
use super::key::SettingKey;
use super::value::SettingValue;

/// Default name of the settings table
pub const DEFAULT_SETTINGS_TABLE: &str = "addon_settings";

/// Default name of the value column
pub const DEFAULT_VALUE_FIELD: &str = "setting_value";

/// Identifier of the input used when asking for a missing setting
pub const PROMPT_FIELD_ID: &str = "setting";

/// Where settings are persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsLayout {
    pub table: String,
    pub table_description: String,
    pub value_field: String,
    pub value_description: String,
}

impl Default for SettingsLayout {
    fn default() -> Self {
        Self {
            table: DEFAULT_SETTINGS_TABLE.to_string(),
            table_description: "Settings".to_string(),
            value_field: DEFAULT_VALUE_FIELD.to_string(),
            value_description: "Value".to_string(),
        }
    }
}

impl SettingsLayout {
    pub fn new(table: &str, value_field: &str) -> Self {
        Self {
            table: table.to_string(),
            value_field: value_field.to_string(),
            ..Default::default()
        }
    }

    fn table_def(&self) -> TableDef {
        TableDef::new(&self.table, &self.table_description)
    }

    fn value_field_def(&self) -> FieldDef {
        FieldDef::new(&self.value_field, &self.value_description).field_type(FieldType::Memo)
    }
}

/// Provisioning state of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing has been attempted yet
    Uninitialized,
    /// Table and value column exist; never provisioned again
    Ready,
    /// Last attempt failed; the next call retries
    Failed(String),
}

/// One row of the settings table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub code: String,
    pub name: String,
    pub value: Option<String>,
}

/// Typed key/value settings backed by a user table
pub struct SettingsStore {
    db: DatabaseConn,
    layout: SettingsLayout,
    state: RefCell<StoreState>,
    provisioner: Box<dyn SchemaProvisioner>,
    converters: ConverterRegistry,
    host: Box<dyn Host>,
    prompter: Option<Box<dyn InputPrompter>>,
}

impl SettingsStore {
    /// Create a store on an open connection
    ///
    /// Nothing is provisioned until the store is first used.
    pub fn new(db: DatabaseConn) -> Self {
        Self {
            db,
            layout: SettingsLayout::default(),
            state: RefCell::new(StoreState::Uninitialized),
            provisioner: Box::new(SqliteProvisioner::new()),
            converters: ConverterRegistry::new(),
            host: Box::new(TracingHost::new()),
            prompter: None,
        }
    }

    /// Open a store on the SQLite database at `path`
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(DatabaseConn::open_path(path)?))
    }

    /// Create a store on an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConn::open_in_memory()?))
    }

    /// Open the store described by the configuration
    pub fn from_config(config: &AddonkitConfig) -> Result<Self> {
        crate::database::ensure_data_dir(&config.data_dir)?;
        Ok(Self::open(&config.sqlite_path())?.with_layout(config.layout()))
    }

    pub fn with_layout(mut self, layout: SettingsLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_provisioner(mut self, provisioner: Box<dyn SchemaProvisioner>) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    pub fn with_host(mut self, host: Box<dyn Host>) -> Self {
        self.host = host;
        self
    }

    pub fn with_prompter(mut self, prompter: Box<dyn InputPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn layout(&self) -> &SettingsLayout {
        &self.layout
    }

    pub fn state(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn provisioner(&self) -> &dyn SchemaProvisioner {
        self.provisioner.as_ref()
    }

    /// Underlying connection, for setup units that provision their own tables
    pub fn connection(&self) -> &DatabaseConn {
        &self.db
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Ensure the settings table and its value column exist
    ///
    /// Returns `true` once provisioning has succeeded; later calls return
    /// immediately. A failure is reported to the host and leaves the store
    /// ready for another attempt.
    pub fn init(&self) -> bool {
        if matches!(*self.state.borrow(), StoreState::Ready) {
            return true;
        }

        let result = UserTable::create(self.provisioner.as_ref(), &self.db, &self.layout.table_def())
            .and_then(|table| table.create_field(&self.layout.value_field_def()).map(|_| ()));

        match result {
            Ok(()) => {
                *self.state.borrow_mut() = StoreState::Ready;
                info!("Settings store ready on table {}", self.layout.table);
                self.host.notify("Settings store init [OK]", Severity::Success);
                true
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Settings store init failed: {}", reason);
                self.host.notify(
                    &format!("Settings store init [NOT OK] {}", reason),
                    Severity::Warning,
                );
                *self.state.borrow_mut() = StoreState::Failed(reason);
                false
            }
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.init() {
            return Ok(());
        }
        match self.state() {
            StoreState::Failed(reason) => Err(anyhow!("Settings store is not initialized: {}", reason)),
            _ => Err(anyhow!("Settings store is not initialized")),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a setting
    ///
    /// A row holding an empty string counts as missing. When the setting is
    /// missing and `ask_if_not_found` is set, the user is prompted, the answer
    /// is saved and returned. Every failure falls back to `default`.
    pub fn get_by_key<T: SettingValue>(
        &self,
        key: &str,
        default: T,
        subject: Option<&str>,
        ask_if_not_found: bool,
    ) -> T {
        let ready = self.ensure_ready();

        if key.trim().is_empty() {
            return default;
        }
        if let Err(e) = ready {
            self.warn(&format!("Settings store error: {}", e));
            return default;
        }

        let setting_key = SettingKey::new(key, subject);
        let stored = match self.stored_value(&setting_key) {
            Ok(stored) => stored,
            Err(e) => {
                self.warn(&format!("Settings store error: {}", e));
                return default;
            }
        };

        match stored {
            Some(raw) => match self.converters.convert::<T>(Some(raw.as_str())) {
                Ok(Some(value)) => value,
                Ok(None) => default,
                Err(e) => {
                    self.warn(&format!("Settings store error: {}", e));
                    default
                }
            },
            None if ask_if_not_found => match self.ask_for_value::<T>(key, subject) {
                Ok(value) => value,
                Err(e) => {
                    self.warn(&format!("Settings store error: {}", e));
                    default
                }
            },
            None => default,
        }
    }

    /// Read an unscoped setting
    pub fn get<T: SettingValue>(&self, key: &str, default: T) -> T {
        self.get_by_key(key, default, None, false)
    }

    /// Read a setting scoped to `subject`
    pub fn get_for_subject<T: SettingValue>(&self, key: &str, subject: &str, default: T) -> T {
        self.get_by_key(key, default, Some(subject), false)
    }

    /// Read a setting, prompting for it when missing
    pub fn get_or_ask<T: SettingValue>(&self, key: &str, default: T, subject: Option<&str>) -> T {
        self.get_by_key(key, default, subject, true)
    }

    /// Read a setting scoped to the host's current user
    ///
    /// Without a current user this reads the unscoped setting.
    pub fn get_current_user_setting<T: SettingValue>(
        &self,
        key: &str,
        default: T,
        ask_if_not_found: bool,
    ) -> T {
        let user = self.host.current_user();
        self.get_by_key(key, default, user.as_deref(), ask_if_not_found)
    }

    /// Raw stored value, `None` when the row is absent or holds `NULL`
    ///
    /// An empty string is returned as `Some("")`.
    pub fn get_setting_as_string(&self, key: &str, subject: Option<&str>) -> Result<Option<String>> {
        Ok(self.find(key, subject)?.and_then(|record| record.value))
    }

    /// The complete row for a key
    pub fn find(&self, key: &str, subject: Option<&str>) -> Result<Option<SettingRecord>> {
        self.ensure_ready()?;
        self.find_by_key(&SettingKey::new(key, subject))
    }

    /// Label of a setting, or the key itself when no label is stored
    pub fn setting_title(&self, key: &str) -> String {
        self.find(key, None)
            .ok()
            .flatten()
            .map(|record| record.name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| key.to_string())
    }

    /// All settings whose code starts with `prefix`, ordered by code
    pub fn list(&self, prefix: Option<&str>) -> Result<Vec<SettingRecord>> {
        self.ensure_ready()?;
        let prefix = prefix.map(SettingKey::normalize).unwrap_or_default();
        let sql = format!(
            "SELECT code, name, \"{}\" FROM \"{}\"
             WHERE substr(code, 1, length(?1)) = ?1
             ORDER BY code",
            self.layout.value_field, self.layout.table
        );

        let mut stmt = self
            .db
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare settings query: {}", e))?;
        let rows = stmt
            .query_map([prefix], |row| {
                Ok(SettingRecord {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    value: row.get(2)?,
                })
            })
            .map_err(|e| anyhow!("Failed to list settings: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read setting row: {}", e))
    }

    fn find_by_key(&self, key: &SettingKey) -> Result<Option<SettingRecord>> {
        let sql = format!(
            "SELECT code, name, \"{}\" FROM \"{}\" WHERE code = ?1",
            self.layout.value_field, self.layout.table
        );
        self.db.query_optional(&sql, [key.as_str()], |row| {
            Ok(SettingRecord {
                code: row.get(0)?,
                name: row.get(1)?,
                value: row.get(2)?,
            })
        })
    }

    /// Non-empty stored value for a key, on a store that is already ready
    fn stored_value(&self, key: &SettingKey) -> Result<Option<String>> {
        Ok(self
            .find_by_key(key)?
            .and_then(|record| record.value)
            .filter(|value| !value.is_empty()))
    }

    fn ask_for_value<T: SettingValue>(&self, key: &str, subject: Option<&str>) -> Result<T> {
        let prompter = self
            .prompter
            .as_ref()
            .ok_or_else(|| anyhow!("No input available to ask for setting '{}'", key))?;

        let name = self.setting_title(key);
        let mut title = format!("Insert setting {}", name);
        if let Some(subject) = subject {
            title.push_str(&format!(" for {}", subject));
        }

        let request = PromptRequest {
            title,
            field_id: PROMPT_FIELD_ID.to_string(),
            label: name,
            kind: T::INPUT_KIND,
            required: T::INPUT_KIND.required(),
        };
        let answer = prompter.prompt(&request)?;
        let raw = answer.to_setting().unwrap_or_default();
        let value = self
            .converters
            .convert::<T>(Some(raw.as_str()))?
            .ok_or_else(|| anyhow!("No value entered for setting '{}'", key))?;

        self.save_setting(key, &value, subject, None)?;
        Ok(value)
    }

    fn warn(&self, message: &str) {
        debug!("{}", message);
        self.host.notify(message, Severity::Warning);
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or update a setting
    ///
    /// `name` is only used when the row is created; it defaults to the
    /// normalized key. A value without stored form is written as `NULL`.
    pub fn save_setting<T: SettingValue>(
        &self,
        key: &str,
        value: &T,
        subject: Option<&str>,
        name: Option<&str>,
    ) -> Result<()> {
        if key.trim().is_empty() {
            bail!("Setting key must not be empty");
        }
        self.ensure_ready()?;

        let setting_key = SettingKey::new(key, subject);
        let raw = self.converters.serialize(value);
        let exists = self.find_by_key(&setting_key)?.is_some();

        if exists {
            let sql = format!(
                "UPDATE \"{}\" SET \"{}\" = ?1 WHERE code = ?2",
                self.layout.table, self.layout.value_field
            );
            self.db
                .execute_with_params(&sql, params![raw, setting_key.as_str()])
                .map_err(|e| anyhow!("Failed to update setting '{}': {}", setting_key, e))?;
        } else {
            let sql = format!(
                "INSERT INTO \"{}\" (code, name, \"{}\") VALUES (?1, ?2, ?3)",
                self.layout.table, self.layout.value_field
            );
            let name = name.unwrap_or(setting_key.as_str());
            self.db
                .execute_with_params(&sql, params![setting_key.as_str(), name, raw])
                .map_err(|e| anyhow!("Failed to insert setting '{}': {}", setting_key, e))?;
        }

        debug!("Saved setting {}", setting_key);
        Ok(())
    }

    /// Save an unscoped setting
    pub fn save<T: SettingValue>(&self, key: &str, value: &T) -> Result<()> {
        self.save_setting(key, value, None, None)
    }

    /// Seed a setting with `default` unless it already has a value
    ///
    /// A row holding an empty string is left alone. Never prompts. Returns
    /// whether the default was written.
    pub fn init_setting<T: SettingValue>(&self, key: &str, name: &str, default: &T) -> Result<bool> {
        if self.get_setting_as_string(key, None)?.is_some() {
            return Ok(false);
        }
        self.save_setting(key, default, None, Some(name))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{ProvisioningError, SqliteProvisioner};
    use crate::host::{InputKind, PromptValue};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::str::FromStr;

    crate::ordinal_setting! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum PrintMode {
            Draft = 0,
            Normal = 1,
            Duplex = 2,
        }
    }

    type Log = Rc<RefCell<Vec<(Severity, String)>>>;

    struct RecordingHost {
        log: Log,
        user: Option<String>,
    }

    impl Host for RecordingHost {
        fn notify(&self, message: &str, severity: Severity) {
            self.log.borrow_mut().push((severity, message.to_string()));
        }

        fn current_user(&self) -> Option<String> {
            self.user.clone()
        }
    }

    struct ScriptedPrompter {
        answer: Option<PromptValue>,
        requests: Rc<RefCell<Vec<PromptRequest>>>,
    }

    impl InputPrompter for ScriptedPrompter {
        fn prompt(&self, request: &PromptRequest) -> anyhow::Result<PromptValue> {
            self.requests.borrow_mut().push(request.clone());
            self.answer
                .clone()
                .ok_or_else(|| anyhow!("dialog cancelled"))
        }
    }

    /// Fails the first `failures` table provisioning attempts
    struct FlakyProvisioner {
        failures: Cell<u32>,
        calls: Rc<Cell<u32>>,
    }

    impl SchemaProvisioner for FlakyProvisioner {
        fn ensure_table(&self, db: &DatabaseConn, table: &TableDef) -> Result<(), ProvisioningError> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(ProvisioningError::Storage {
                    target: table.name.clone(),
                    message: "database is locked".to_string(),
                });
            }
            SqliteProvisioner::new().ensure_table(db, table)
        }

        fn ensure_field(
            &self,
            db: &DatabaseConn,
            table: &str,
            field: &FieldDef,
        ) -> Result<(), ProvisioningError> {
            SqliteProvisioner::new().ensure_field(db, table, field)
        }
    }

    fn recording_store() -> (SettingsStore, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let store = SettingsStore::open_in_memory()
            .unwrap()
            .with_host(Box::new(RecordingHost {
                log: log.clone(),
                user: None,
            }));
        (store, log)
    }

    fn store() -> SettingsStore {
        recording_store().0
    }

    fn row_count(store: &SettingsStore, code: &str) -> i64 {
        store
            .connection()
            .conn
            .query_row(
                "SELECT COUNT(*) FROM addon_settings WHERE code = ?1",
                [code],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn warnings(log: &Log) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|(severity, _)| *severity == Severity::Warning)
            .map(|(_, message)| message.clone())
            .collect()
    }

    #[test]
    fn test_lazy_init() {
        let (store, log) = recording_store();
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(!store.connection().table_exists("addon_settings").unwrap());

        assert_eq!(store.get("anything", 7), 7);
        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.connection().column_exists("addon_settings", "setting_value").unwrap());
        assert_eq!(
            log.borrow()[0],
            (Severity::Success, "Settings store init [OK]".to_string())
        );
    }

    #[test]
    fn test_round_trip_supported_types() {
        let store = store();

        store.save("flag", &true).unwrap();
        store.save("count", &-42i32).unwrap();
        store.save("big", &9_000_000_000i64).unwrap();
        store.save("price", &Decimal::from_str("19.990").unwrap()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        store.save("cutoff", &date).unwrap();
        store.save("greeting", &"hello, world".to_string()).unwrap();

        assert!(store.get("flag", false));
        assert_eq!(store.get("count", 0i32), -42);
        assert_eq!(store.get("big", 0i64), 9_000_000_000);
        assert_eq!(
            store.get("price", Decimal::ZERO),
            Decimal::from_str("19.990").unwrap()
        );
        assert_eq!(store.get("cutoff", NaiveDate::MIN), date);
        assert_eq!(store.get("greeting", String::new()), "hello, world");
    }

    #[test]
    fn test_unknown_key_returns_default() {
        let (store, log) = recording_store();
        assert_eq!(store.get("does.not.exist", 13u32), 13);
        assert_eq!(store.get("", 5), 5);
        assert!(warnings(&log).is_empty());
    }

    #[test]
    fn test_save_twice_updates_in_place() {
        let store = store();
        store.save("k", &1).unwrap();
        store.save("k", &2).unwrap();

        assert_eq!(row_count(&store, "k"), 1);
        assert_eq!(store.get("k", 0), 2);
    }

    #[test]
    fn test_key_normalization() {
        let store = store();
        store.save("  Foo ", &1).unwrap();

        assert_eq!(store.get("foo", 0), 1);
        assert_eq!(store.get("FOO", 0), 1);
        assert_eq!(row_count(&store, "foo"), 1);
    }

    #[test]
    fn test_subject_scoping_isolates_values() {
        let store = store();
        store.save_setting("k", &1, Some("alice"), None).unwrap();
        store.save_setting("k", &2, Some("bob"), None).unwrap();

        assert_eq!(store.get_for_subject("k", "alice", 0), 1);
        assert_eq!(store.get_for_subject("k", "bob", 0), 2);
        assert_eq!(store.get("k", 0), 0);
    }

    #[test]
    fn test_scoped_save_normalizes_like_unscoped() {
        let store = store();
        store
            .save_setting("  Report.Printer ", &"lp1".to_string(), Some("alice"), None)
            .unwrap();

        assert_eq!(row_count(&store, "report.printer[alice]"), 1);
        assert_eq!(
            store.get_for_subject("report.printer", "alice", String::new()),
            "lp1"
        );
    }

    #[test]
    fn test_current_user_setting() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let store = SettingsStore::open_in_memory()
            .unwrap()
            .with_host(Box::new(RecordingHost {
                log,
                user: Some("manager".to_string()),
            }));

        store.save_setting("layout", &3, Some("manager"), None).unwrap();
        assert_eq!(store.get_current_user_setting("layout", 0, false), 3);
        assert_eq!(store.get("layout", 0), 0);
    }

    #[test]
    fn test_enum_from_stored_ordinal() {
        let store = store();
        store.save("print.mode", &"2".to_string()).unwrap();
        assert_eq!(store.get("print.mode", PrintMode::Draft), PrintMode::Duplex);

        store.save("print.mode", &PrintMode::Normal).unwrap();
        assert_eq!(
            store.get_setting_as_string("print.mode", None).unwrap(),
            Some("1".to_string())
        );
    }

    #[test]
    fn test_init_setting_seeds_once() {
        let store = store();
        assert!(store.init_setting("max.retries", "Max Retries", &5).unwrap());

        let record = store.find("max.retries", None).unwrap().unwrap();
        assert_eq!(record.value, Some("5".to_string()));
        assert_eq!(record.name, "Max Retries");
        assert_eq!(store.get("max.retries", 0), 5);

        assert!(!store.init_setting("max.retries", "Max Retries", &9).unwrap());
        assert_eq!(store.get("max.retries", 0), 5);
    }

    #[test]
    fn test_init_setting_respects_empty_but_fills_null() {
        let store = store();
        store.save("blank", &String::new()).unwrap();
        store.save("unset", &None::<i32>).unwrap();

        assert!(!store.init_setting("blank", "Blank", &"x".to_string()).unwrap());
        assert_eq!(
            store.get_setting_as_string("blank", None).unwrap(),
            Some(String::new())
        );

        assert!(store.init_setting("unset", "Unset", &4).unwrap());
        assert_eq!(store.get("unset", 0), 4);
    }

    #[test]
    fn test_null_is_stored_as_sql_null() {
        let store = store();
        store.save("nothing", &None::<String>).unwrap();

        let record = store.find("nothing", None).unwrap().unwrap();
        assert_eq!(record.value, None);
        assert_eq!(store.get_setting_as_string("nothing", None).unwrap(), None);
        assert_eq!(store.get("nothing", "fallback".to_string()), "fallback");
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let store = store();
        store.save("empty", &String::new()).unwrap();
        assert_eq!(store.get("empty", 8), 8);
    }

    #[test]
    fn test_name_defaults_to_code() {
        let store = store();
        store.save(" Mail.Host ", &"smtp".to_string()).unwrap();
        store
            .save_setting("mail.port", &25, None, Some("Mail Port"))
            .unwrap();
        // the name is only used on insert
        store
            .save_setting("mail.port", &587, None, Some("Ignored"))
            .unwrap();

        assert_eq!(store.find("mail.host", None).unwrap().unwrap().name, "mail.host");
        assert_eq!(store.setting_title("mail.port"), "Mail Port");
        assert_eq!(store.setting_title("no.such.key"), "no.such.key");
    }

    #[test]
    fn test_ask_if_not_found_prompts_and_saves() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let store = store().with_prompter(Box::new(ScriptedPrompter {
            answer: Some(PromptValue::Checkbox(true)),
            requests: requests.clone(),
        }));
        store
            .init_setting("sync.enabled", "Enable Sync", &None::<bool>)
            .unwrap();

        let value = store.get_by_key("sync.enabled", false, Some("alice"), true);
        assert!(value);

        let request = requests.borrow()[0].clone();
        assert_eq!(request.title, "Insert setting Enable Sync for alice");
        assert_eq!(request.label, "Enable Sync");
        assert_eq!(request.field_id, PROMPT_FIELD_ID);
        assert_eq!(request.kind, InputKind::Checkbox);
        assert!(!request.required);

        // persisted for the subject, so the second read does not prompt
        assert!(store.get_by_key("sync.enabled", false, Some("alice"), true));
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn test_prompt_kind_follows_type() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let store = store().with_prompter(Box::new(ScriptedPrompter {
            answer: Some(PromptValue::Integer(30)),
            requests: requests.clone(),
        }));

        assert_eq!(store.get_or_ask("timeout", 0u32, None), 30);
        assert_eq!(requests.borrow()[0].kind, InputKind::Integer);
        assert!(requests.borrow()[0].required);
        assert_eq!(requests.borrow()[0].title, "Insert setting timeout");
        assert_eq!(store.get("timeout", 0u32), 30);
    }

    #[test]
    fn test_ask_without_prompter_returns_default() {
        let (store, log) = recording_store();
        assert_eq!(store.get_or_ask("missing", 11, None), 11);
        assert_eq!(warnings(&log).len(), 1);
        assert_eq!(store.find("missing", None).unwrap(), None);
    }

    #[test]
    fn test_cancelled_prompt_returns_default() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let store = store().with_prompter(Box::new(ScriptedPrompter {
            answer: None,
            requests,
        }));
        assert_eq!(store.get_or_ask("missing", 11, None), 11);
        assert_eq!(store.find("missing", None).unwrap(), None);
    }

    #[test]
    fn test_conversion_failure_warns_and_returns_default() {
        let (store, log) = recording_store();
        store.save("count", &"twelve".to_string()).unwrap();

        assert_eq!(store.get("count", 3), 3);
        let warnings = warnings(&log);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'twelve'"));
        assert!(warnings[0].contains("i32"));
    }

    #[test]
    fn test_init_failure_is_retried() {
        let calls = Rc::new(Cell::new(0));
        let (store, log) = recording_store();
        let store = store.with_provisioner(Box::new(FlakyProvisioner {
            failures: Cell::new(1),
            calls: calls.clone(),
        }));

        assert!(!store.init());
        assert!(matches!(store.state(), StoreState::Failed(_)));
        assert!(warnings(&log)[0].starts_with("Settings store init [NOT OK]"));

        assert!(store.init());
        assert_eq!(store.state(), StoreState::Ready);

        // ready is sticky
        assert!(store.init());
        store.save("k", &1).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_broken_store_degrades_softly() {
        let calls = Rc::new(Cell::new(0));
        let (store, log) = recording_store();
        let store = store.with_provisioner(Box::new(FlakyProvisioner {
            failures: Cell::new(u32::MAX),
            calls,
        }));

        assert_eq!(store.get("k", 42), 42);
        assert!(warnings(&log)
            .iter()
            .any(|w| w.starts_with("Settings store error")));
        assert!(store.save("k", &1).is_err());
        assert!(store.init_setting("k", "K", &1).is_err());
    }

    #[test]
    fn test_one_read_makes_one_init_attempt() {
        let calls = Rc::new(Cell::new(0));
        let (store, log) = recording_store();
        let store = store.with_provisioner(Box::new(FlakyProvisioner {
            failures: Cell::new(u32::MAX),
            calls: calls.clone(),
        }));

        assert_eq!(store.get("k", 42), 42);
        assert_eq!(calls.get(), 1);
        let warnings = warnings(&log);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Settings store init [NOT OK]"));
        assert!(warnings[1].starts_with("Settings store error"));

        // the next call tries again
        assert_eq!(store.get_or_ask("k", 42, None), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_prompted_value_goes_through_converters() {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let store = store()
            .with_converters(ConverterRegistry::new().with::<String, _, _>(
                |value| Some(value.clone()),
                |raw| Ok(raw.to_uppercase()),
            ))
            .with_prompter(Box::new(ScriptedPrompter {
                answer: Some(PromptValue::Text("abc".to_string())),
                requests: requests.clone(),
            }));

        let prompted = store.get_or_ask("terminal.code", String::new(), None);
        assert_eq!(prompted, "ABC");
        assert_eq!(store.get("terminal.code", String::new()), prompted);
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn test_invalid_layout_fails_init() {
        let (store, _log) = recording_store();
        let store = store.with_layout(SettingsLayout::new("bad table", DEFAULT_VALUE_FIELD));
        assert!(!store.init());
        assert_eq!(store.get("k", 1), 1);
        assert!(store.save("k", &2).is_err());
    }

    #[test]
    fn test_custom_layout_and_converters() {
        let store = store()
            .with_layout(SettingsLayout::new("shop_settings", "svalue"))
            .with_converters(ConverterRegistry::new().with_yes_no_flags());

        store.save("pos.enabled", &true).unwrap();
        let raw: String = store
            .connection()
            .conn
            .query_row(
                "SELECT svalue FROM shop_settings WHERE code = 'pos.enabled'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw, "Y");
        assert!(store.get("pos.enabled", false));
    }

    #[test]
    fn test_list_by_prefix() {
        let store = store();
        store.save("mail.port", &25).unwrap();
        store.save("mail.host", &"smtp".to_string()).unwrap();
        store.save("print.mode", &1).unwrap();

        let codes: Vec<String> = store
            .list(Some("MAIL."))
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(codes, vec!["mail.host".to_string(), "mail.port".to_string()]);
        assert_eq!(store.list(None).unwrap().len(), 3);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.sqlite3");
        let path = path.to_str().unwrap();

        {
            let store = SettingsStore::open(path).unwrap();
            store.save("persisted", &"yes".to_string()).unwrap();
        }

        let store = SettingsStore::open(path).unwrap();
        assert_eq!(store.get("persisted", String::new()), "yes");
    }
}
