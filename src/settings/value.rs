//! Conversion between stored strings and typed setting values
//!
//! Every value goes to the database as text. [`SettingValue`] is the generic,
//! locale independent conversion for a type: integers and decimals always use
//! `.` as decimal point, dates are ISO-8601. Enumerations are stored by
//! ordinal through [`OrdinalEnum`], usually implemented with
//! [`ordinal_setting!`](crate::ordinal_setting).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::host::InputKind;

/// Storage format of dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format of date-times without time zone
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Failure to turn a stored value into the requested type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub source_type: &'static str,
    pub destination_type: &'static str,
    pub value: String,
    pub reason: String,
}

impl ConversionError {
    /// Conversion of the stored string `value` into `T` failed
    pub fn new<T>(value: &str, reason: impl fmt::Display) -> Self {
        Self {
            source_type: "string",
            destination_type: std::any::type_name::<T>(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot convert {} '{}' to {}: {}",
            self.source_type, self.value, self.destination_type, self.reason
        )
    }
}

impl std::error::Error for ConversionError {}

/// A type that can be stored as a setting
pub trait SettingValue: Sized + 'static {
    /// Input control used when the user has to provide this value
    const INPUT_KIND: InputKind = InputKind::Text;

    /// Stored form of the value; `None` is stored as SQL `NULL`
    fn to_setting(&self) -> Option<String>;

    /// Parse the stored form
    fn from_setting(raw: &str) -> Result<Self, ConversionError>;
}

impl SettingValue for String {
    fn to_setting(&self) -> Option<String> {
        Some(self.clone())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        Ok(raw.to_string())
    }
}

impl SettingValue for bool {
    const INPUT_KIND: InputKind = InputKind::Checkbox;

    fn to_setting(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            _ => Err(ConversionError::new::<bool>(raw, "not a boolean")),
        }
    }
}

macro_rules! integer_setting {
    ($($t:ty),+ $(,)?) => {
        $(
            impl SettingValue for $t {
                const INPUT_KIND: InputKind = InputKind::Integer;

                fn to_setting(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn from_setting(raw: &str) -> Result<Self, ConversionError> {
                    raw.trim()
                        .parse::<$t>()
                        .map_err(|e| ConversionError::new::<$t>(raw, e))
                }
            }
        )+
    };
}

integer_setting!(i16, i32, i64, u8, u16, u32, u64, usize);

impl SettingValue for f64 {
    const INPUT_KIND: InputKind = InputKind::Decimal;

    fn to_setting(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| ConversionError::new::<f64>(raw, e))
    }
}

impl SettingValue for Decimal {
    const INPUT_KIND: InputKind = InputKind::Decimal;

    fn to_setting(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        let trimmed = raw.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|e| ConversionError::new::<Decimal>(raw, e))
    }
}

impl SettingValue for NaiveDate {
    const INPUT_KIND: InputKind = InputKind::Date;

    fn to_setting(&self) -> Option<String> {
        Some(self.format(DATE_FORMAT).to_string())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        let trimmed = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
            return Ok(date);
        }
        // Values written with a time part keep day precision
        NaiveDateTime::from_setting(trimmed)
            .map(|dt| dt.date())
            .map_err(|_| ConversionError::new::<NaiveDate>(raw, "not an ISO-8601 date"))
    }
}

impl SettingValue for NaiveDateTime {
    const INPUT_KIND: InputKind = InputKind::Date;

    fn to_setting(&self) -> Option<String> {
        Some(self.format(DATE_TIME_FORMAT).to_string())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        let trimmed = raw.trim();
        for format in [DATE_TIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(dt);
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.naive_utc());
        }
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ConversionError::new::<NaiveDateTime>(raw, "not an ISO-8601 date-time"))
    }
}

impl SettingValue for DateTime<Utc> {
    const INPUT_KIND: InputKind = InputKind::Date;

    fn to_setting(&self) -> Option<String> {
        Some(self.to_rfc3339())
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ConversionError::new::<DateTime<Utc>>(raw, e))
    }
}

impl<T: SettingValue> SettingValue for Option<T> {
    const INPUT_KIND: InputKind = T::INPUT_KIND;

    fn to_setting(&self) -> Option<String> {
        self.as_ref().and_then(T::to_setting)
    }

    fn from_setting(raw: &str) -> Result<Self, ConversionError> {
        T::from_setting(raw).map(Some)
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// An enumeration stored by ordinal
pub trait OrdinalEnum: Sized {
    fn ordinal(&self) -> i64;

    fn from_ordinal(ordinal: i64) -> Option<Self>;

    fn variant_name(&self) -> &'static str;

    /// Member by name, ignoring ASCII case
    fn from_name(name: &str) -> Option<Self>;
}

/// Stored form of an ordinal enumeration
pub fn ordinal_to_setting<T: OrdinalEnum>(value: &T) -> Option<String> {
    Some(value.ordinal().to_string())
}

/// Parse an ordinal enumeration from its ordinal, falling back to its name
pub fn ordinal_from_setting<T: OrdinalEnum>(raw: &str) -> Result<T, ConversionError> {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(ordinal) => T::from_ordinal(ordinal).ok_or_else(|| {
            ConversionError::new::<T>(raw, format!("no member with ordinal {}", ordinal))
        }),
        Err(_) => T::from_name(trimmed)
            .ok_or_else(|| ConversionError::new::<T>(raw, "no member with this name")),
    }
}

/// Declare an enumeration that is stored as a setting by ordinal
///
/// ```
/// addonkit::ordinal_setting! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum SyncMode {
///         Off = 0,
///         Daily = 1,
///         Hourly = 2,
///     }
/// }
///
/// use addonkit::settings::SettingValue;
/// assert_eq!(SyncMode::from_setting("2").unwrap(), SyncMode::Hourly);
/// assert_eq!(SyncMode::Daily.to_setting(), Some("1".to_string()));
/// ```
#[macro_export]
macro_rules! ordinal_setting {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $ord:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $variant = $ord),+
        }

        impl $crate::settings::OrdinalEnum for $name {
            fn ordinal(&self) -> i64 {
                match self {
                    $($name::$variant => $ord),+
                }
            }

            fn from_ordinal(ordinal: i64) -> Option<Self> {
                $(
                    if ordinal == $ord {
                        return Some($name::$variant);
                    }
                )+
                None
            }

            fn variant_name(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($variant)) {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl $crate::settings::SettingValue for $name {
            fn to_setting(&self) -> Option<String> {
                $crate::settings::ordinal_to_setting(self)
            }

            fn from_setting(raw: &str) -> Result<Self, $crate::settings::ConversionError> {
                $crate::settings::ordinal_from_setting(raw)
            }
        }
    };
}
