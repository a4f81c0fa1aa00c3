//! Version-gated execution of setup units

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::host::Severity;
use crate::settings::SettingsStore;

use super::registry::{short_type_name, SetupRegistry, SetupUnit};

/// Failure of a setup unit
///
/// The recorded version is left untouched, so the unit runs again next time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupExecutionError {
    pub unit: String,
    pub from: u32,
    pub to: u32,
    pub message: String,
}

impl fmt::Display for SetupExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setup error in {}: {}", self.unit, self.message)
    }
}

impl std::error::Error for SetupExecutionError {}

/// Result of running one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SetupOutcome {
    /// The body ran and the new version was recorded
    Applied { from: u32, to: u32 },
    /// Nothing to do
    UpToDate { version: u32 },
    /// The body or the version update failed; reported to the host
    Failed { from: u32, to: u32, message: String },
}

/// Outcome of one unit inside a [`SetupReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
    pub unit: String,
    #[serde(flatten)]
    pub outcome: SetupOutcome,
}

/// Outcomes of a [`SetupRunner::run_all`] pass, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub results: Vec<UnitResult>,
}

impl SetupReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, SetupOutcome::Applied { .. }))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|o| matches!(o, SetupOutcome::UpToDate { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SetupOutcome::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&SetupOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Recorded state of a registered unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupStatus {
    pub unit: String,
    pub key: String,
    pub declared_version: u32,
    pub last_applied: u32,
}

impl SetupStatus {
    pub fn is_pending(&self) -> bool {
        self.last_applied < self.declared_version
    }
}

/// Runs setup units against a settings store
pub struct SetupRunner<'a> {
    store: &'a SettingsStore,
}

impl<'a> SetupRunner<'a> {
    pub fn new(store: &'a SettingsStore) -> Self {
        Self { store }
    }

    /// Run one unit if its declared version is ahead of the recorded one
    ///
    /// With `report_to_host` set, progress is sent to the host and a failure
    /// is shown in a message box and returned as [`SetupOutcome::Failed`].
    /// Otherwise a failure is returned as an error.
    pub fn run_one(
        &self,
        unit: &dyn SetupUnit,
        report_to_host: bool,
    ) -> Result<SetupOutcome, SetupExecutionError> {
        let type_name = short_type_name(unit.type_name()).to_string();
        let key = unit.version_key();
        let declared = unit.version();
        let last: u32 = self.store.get(&key, 0);
        let host = self.store.host();

        if last >= declared {
            debug!("Setup {} is at v.{}", type_name, last);
            if report_to_host {
                host.notify(
                    &format!("Setup for {} is up-to-date! (v.{})", type_name, last),
                    Severity::Success,
                );
            }
            return Ok(SetupOutcome::UpToDate { version: last });
        }

        info!("Running setup {} from v.{} to v.{}", type_name, last, declared);
        if report_to_host {
            host.notify(
                &format!(
                    "Running setup for {}, current version is {}, new version is {}",
                    type_name, last, declared
                ),
                Severity::Warning,
            );
        }

        let result = unit
            .run(self.store)
            .and_then(|_| self.store.save_setting(&key, &declared, None, None));

        match result {
            Ok(()) => {
                if report_to_host {
                    host.notify(
                        &format!("Setup for {} updated to v.{}", type_name, declared),
                        Severity::Success,
                    );
                }
                Ok(SetupOutcome::Applied {
                    from: last,
                    to: declared,
                })
            }
            Err(e) => {
                let error = SetupExecutionError {
                    unit: type_name,
                    from: last,
                    to: declared,
                    message: format!("{:#}", e),
                };
                warn!("{}", error);
                if !report_to_host {
                    return Err(error);
                }
                host.message_box(&error.to_string());
                Ok(SetupOutcome::Failed {
                    from: error.from,
                    to: error.to,
                    message: error.message,
                })
            }
        }
    }

    /// Run every registered unit in registration order
    ///
    /// Units are independent: a failing unit is reported and the next one
    /// still runs. An empty registry does not touch the store.
    pub fn run_all(&self, registry: &SetupRegistry) -> SetupReport {
        let units = registry.discover();
        if units.is_empty() {
            return SetupReport::default();
        }

        self.store.init();

        let results = units
            .iter()
            .map(|unit| {
                let outcome = self
                    .run_one(unit.as_ref(), true)
                    .unwrap_or_else(|e| SetupOutcome::Failed {
                        from: e.from,
                        to: e.to,
                        message: e.message,
                    });
                UnitResult {
                    unit: unit.name(),
                    outcome,
                }
            })
            .collect();

        SetupReport { results }
    }

    /// Recorded versions of the registered units, without running anything
    pub fn status(&self, registry: &SetupRegistry) -> Vec<SetupStatus> {
        registry
            .discover()
            .iter()
            .map(|unit| {
                let key = unit.version_key();
                SetupStatus {
                    unit: unit.name(),
                    last_applied: self.store.get(&key, 0),
                    declared_version: unit.version(),
                    key,
                }
            })
            .collect()
    }
}
