//! Setting key normalization

use std::fmt;

/// Normalized code of a setting row
///
/// Keys are trimmed and lower-cased. A subject (usually a user code) is
/// appended as `key[subject]` so the same key can hold one value per subject.
/// The subject is kept verbatim: callers sharing a subject-scoped value must
/// pass the same subject string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingKey(String);

impl SettingKey {
    pub fn new(key: &str, subject: Option<&str>) -> Self {
        let base = Self::normalize(key);
        match subject {
            Some(subject) => SettingKey(format!("{}[{}]", base, subject)),
            None => SettingKey(base),
        }
    }

    /// Unscoped key
    pub fn unscoped(key: &str) -> Self {
        Self::new(key, None)
    }

    /// Trim and lower-case a raw key
    pub fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_scoped(&self) -> bool {
        self.0.ends_with(']') && self.0.contains('[')
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SettingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
