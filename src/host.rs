//! Host application capabilities
//!
//! The settings store and the setup runner never talk to a UI directly.
//! They call into the traits defined here:
//!
//! - [`Host`]: fire-and-forget notifications, blocking message boxes and the
//!   identity of the current user
//! - [`InputPrompter`]: a modal, typed input dialog used when a setting is
//!   missing and the caller asked to be prompted
//!
//! [`TracingHost`] is the default host and forwards everything to `tracing`.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::settings::SettingValue;

// =============================================================================
// Notifications
// =============================================================================

/// Severity of a host notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Notification channel and context of the host application
///
/// Implementations must not panic. Callers ignore whatever happens inside
/// `notify`, so a failing status bar never fails a settings operation.
pub trait Host {
    /// Show a transient status message
    fn notify(&self, message: &str, severity: Severity);

    /// Show a blocking message to the user
    fn message_box(&self, message: &str) {
        self.notify(message, Severity::Error);
    }

    /// Code of the user currently signed in to the host, if any
    fn current_user(&self) -> Option<String> {
        None
    }
}

/// Host that writes notifications to the `tracing` subscriber
#[derive(Debug, Clone, Default)]
pub struct TracingHost {
    user: Option<String>,
}

impl TracingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `user` as the current user
    pub fn with_user(user: &str) -> Self {
        Self {
            user: Some(user.to_string()),
        }
    }
}

impl Host for TracingHost {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }

    fn message_box(&self, message: &str) {
        error!("{}", message);
    }

    fn current_user(&self) -> Option<String> {
        self.user.clone()
    }
}

// =============================================================================
// Typed input
// =============================================================================

/// Kind of input control used to ask for a missing setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Checkbox,
    Date,
    Integer,
    Decimal,
}

impl InputKind {
    /// Whether a value must be entered for this kind of control
    ///
    /// A checkbox always has a value, so it is never marked required.
    pub fn required(&self) -> bool {
        !matches!(self, InputKind::Checkbox)
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Text => write!(f, "text"),
            InputKind::Checkbox => write!(f, "checkbox"),
            InputKind::Date => write!(f, "date"),
            InputKind::Integer => write!(f, "integer"),
            InputKind::Decimal => write!(f, "decimal"),
        }
    }
}

/// A request for one typed value from the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Dialog title
    pub title: String,
    /// Identifier of the input inside the dialog
    pub field_id: String,
    /// Label shown next to the input
    pub label: String,
    pub kind: InputKind,
    pub required: bool,
}

/// A value entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptValue {
    Text(String),
    Checkbox(bool),
    Date(NaiveDate),
    Integer(i64),
    Decimal(Decimal),
}

impl PromptValue {
    pub fn kind(&self) -> InputKind {
        match self {
            PromptValue::Text(_) => InputKind::Text,
            PromptValue::Checkbox(_) => InputKind::Checkbox,
            PromptValue::Date(_) => InputKind::Date,
            PromptValue::Integer(_) => InputKind::Integer,
            PromptValue::Decimal(_) => InputKind::Decimal,
        }
    }

    /// Stored form of the entered value
    pub fn to_setting(&self) -> Option<String> {
        match self {
            PromptValue::Text(v) => v.to_setting(),
            PromptValue::Checkbox(v) => v.to_setting(),
            PromptValue::Date(v) => v.to_setting(),
            PromptValue::Integer(v) => v.to_setting(),
            PromptValue::Decimal(v) => v.to_setting(),
        }
    }
}

/// Modal input dialog of the host
///
/// `prompt` blocks until the user has answered. An error means the dialog
/// was cancelled or could not be shown.
pub trait InputPrompter {
    fn prompt(&self, request: &PromptRequest) -> anyhow::Result<PromptValue>;
}
