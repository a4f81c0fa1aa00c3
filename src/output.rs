//! Output formatting for command results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format shared by all commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// JSON Lines format (one JSON object per line)
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    /// Check if this is a JSON variant
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Check if this is a table variant
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table | Self::Markdown)
    }

    /// Get a list of all format names for help text
    pub fn all_names() -> &'static [&'static str] {
        &[
            "table",
            "markdown",
            "json",
            "json-pretty",
            "json-line",
            "psv",
        ]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
            Self::JsonLine => write!(f, "json-line"),
            Self::Psv => write!(f, "psv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonline" | "jsonl" | "ndjson" => Ok(Self::JsonLine),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Render items in one of the JSON formats
///
/// Non-JSON formats are rendered as compact JSON.
pub fn format_json<T: Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<String> {
    use anyhow::anyhow;

    let output = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(items)
            .map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))?,
        OutputFormat::JsonLine => items
            .iter()
            .map(|item| {
                serde_json::to_string(item)
                    .map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
            .join("\n"),
        _ => serde_json::to_string(items)
            .map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))?,
    };

    Ok(output)
}

/// Render rows in the requested format
#[cfg(feature = "display")]
pub fn format_rows<T>(rows: &[T], format: OutputFormat) -> anyhow::Result<String>
where
    T: Serialize + tabled::Tabled,
{
    use tabled::settings::Style;
    use tabled::Table;

    let output = match format {
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Markdown => Table::new(rows).with(Style::markdown()).to_string(),
        OutputFormat::Psv => {
            let mut lines = vec![T::headers().join("|")];
            lines.extend(rows.iter().map(|row| row.fields().join("|")));
            lines.join("\n")
        }
        json => format_json(rows, json)?,
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_str("md").unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from_str("jsonl").unwrap(),
            OutputFormat::JsonLine
        );
        assert_eq!(OutputFormat::from_str("pipe").unwrap(), OutputFormat::Psv);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_output_format_display_round_trip() {
        for name in OutputFormat::all_names() {
            let format = OutputFormat::from_str(name).unwrap();
            assert_eq!(format.to_string(), *name);
        }
        assert!(OutputFormat::JsonPretty.is_json());
        assert!(OutputFormat::Markdown.is_table());
        assert!(!OutputFormat::Psv.is_table());
    }

    #[test]
    fn test_format_json_keeps_nulls() {
        #[derive(Serialize)]
        struct Item {
            code: &'static str,
            value: Option<String>,
        }

        let items = [
            Item {
                code: "a",
                value: None,
            },
            Item {
                code: "b",
                value: Some("1".to_string()),
            },
        ];
        assert_eq!(
            format_json(&items, OutputFormat::JsonLine).unwrap(),
            "{\"code\":\"a\",\"value\":null}\n{\"code\":\"b\",\"value\":\"1\"}"
        );
    }

    #[cfg(feature = "display")]
    #[test]
    fn test_format_rows() {
        #[derive(Serialize, tabled::Tabled)]
        struct Row {
            code: String,
            value: String,
        }

        let rows = vec![Row {
            code: "mail.port".to_string(),
            value: "25".to_string(),
        }];

        assert_eq!(
            format_rows(&rows, OutputFormat::Psv).unwrap(),
            "code|value\nmail.port|25"
        );
        assert_eq!(
            format_rows(&rows, OutputFormat::Json).unwrap(),
            r#"[{"code":"mail.port","value":"25"}]"#
        );
        assert_eq!(
            format_rows(&rows, OutputFormat::JsonLine).unwrap(),
            r#"{"code":"mail.port","value":"25"}"#
        );
        let markdown = format_rows(&rows, OutputFormat::Markdown).unwrap();
        assert!(markdown.starts_with('|'));
        assert!(markdown.contains("mail.port"));
    }
}
