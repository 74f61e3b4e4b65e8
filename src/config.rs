use crate::error::ConfigurationError;
use crate::record::FieldType;
use chrono::FixedOffset;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};

/// Opaque option map handed over by the host.
pub type ConfigMap = HashMap<String, serde_json::Value>;

pub const DIRECTORY_DELIM: &str = "directory.delim";
pub const PARTITION_FIELD_NAME: &str = "partition.field.name";
pub const PARTITION_FIELD_TYPES: &str = "partition.field.types";
pub const PARTITION_FIELD_DEFAULT: &str = "partition.field.default";
pub const PATH_FORMAT: &str = "path.format";
pub const PARTITION_DURATION_MS: &str = "partition.duration.ms";
pub const TIMEZONE: &str = "timezone";
pub const TIMESTAMP_EXTRACTOR: &str = "timestamp.extractor";
pub const TIMESTAMP_FIELD: &str = "timestamp.field";

pub const DEFAULT_DIRECTORY_DELIM: &str = "/";
pub const DEFAULT_TIMESTAMP_FIELD: &str = "timestamp";

/// Where time-based partitioners take the timestamp from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TimestampExtractor {
    /// The caller supplied `now_millis`.
    #[default]
    Wallclock,
    /// The timestamp carried by the record itself.
    Record,
    /// A field of the record value, see `timestamp.field`.
    RecordField,
}

/// Typed view of every option the partitioners understand. Keys that are not
/// listed here are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartitionerConfig {
    #[serde(rename = "directory.delim", default = "default_delim")]
    pub directory_delim: String,
    #[serde(
        rename = "partition.field.name",
        default,
        deserialize_with = "string_or_list"
    )]
    pub field_names: Option<Vec<String>>,
    #[serde(rename = "partition.field.types", default)]
    pub field_types: Option<BTreeMap<String, FieldType>>,
    #[serde(rename = "partition.field.default", default)]
    pub field_default: Option<String>,
    #[serde(rename = "path.format", default)]
    pub path_format: Option<String>,
    #[serde(
        rename = "partition.duration.ms",
        default,
        deserialize_with = "number_or_string"
    )]
    pub partition_duration_ms: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(rename = "timestamp.extractor", default)]
    pub timestamp_extractor: TimestampExtractor,
    #[serde(rename = "timestamp.field", default = "default_timestamp_field")]
    pub timestamp_field: String,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        PartitionerConfig {
            directory_delim: default_delim(),
            field_names: None,
            field_types: None,
            field_default: None,
            path_format: None,
            partition_duration_ms: None,
            timezone: None,
            timestamp_extractor: TimestampExtractor::default(),
            timestamp_field: default_timestamp_field(),
        }
    }
}

impl PartitionerConfig {
    /// Parses and validates the options shared by every partitioner.
    pub fn parse(options: &ConfigMap) -> Result<Self, ConfigurationError> {
        let object: serde_json::Map<String, serde_json::Value> = options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let config: PartitionerConfig = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(ConfigurationError::Malformed)?;

        if config.directory_delim.is_empty() {
            return Err(ConfigurationError::InvalidOption {
                option: DIRECTORY_DELIM,
                reason: "delimiter must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    pub fn required_field_names(&self) -> Result<&[String], ConfigurationError> {
        match &self.field_names {
            Some(names) if !names.is_empty() => Ok(names),
            Some(_) => Err(ConfigurationError::InvalidOption {
                option: PARTITION_FIELD_NAME,
                reason: "at least one field name is required".to_string(),
            }),
            None => Err(ConfigurationError::MissingOption(PARTITION_FIELD_NAME)),
        }
    }

    pub fn required_path_format(&self) -> Result<&str, ConfigurationError> {
        match self.path_format.as_deref() {
            Some(format) if !format.trim().is_empty() => Ok(format),
            Some(_) => Err(ConfigurationError::InvalidOption {
                option: PATH_FORMAT,
                reason: "path format must not be empty".to_string(),
            }),
            None => Err(ConfigurationError::MissingOption(PATH_FORMAT)),
        }
    }

    pub fn required_duration_ms(&self) -> Result<i64, ConfigurationError> {
        match self.partition_duration_ms {
            Some(ms) if ms > 0 => Ok(ms),
            Some(ms) => Err(ConfigurationError::InvalidOption {
                option: PARTITION_DURATION_MS,
                reason: format!("duration must be positive, got {}", ms),
            }),
            None => Err(ConfigurationError::MissingOption(PARTITION_DURATION_MS)),
        }
    }

    /// Accepts `UTC` (or `Z`) and fixed offsets such as `+02:00`.
    pub fn required_timezone(&self) -> Result<FixedOffset, ConfigurationError> {
        let raw = self
            .timezone
            .as_deref()
            .ok_or(ConfigurationError::MissingOption(TIMEZONE))?;
        let invalid = || ConfigurationError::InvalidOption {
            option: TIMEZONE,
            reason: format!("'{}' is neither UTC nor a fixed offset like +02:00", raw),
        };
        match raw.trim() {
            "UTC" | "utc" | "Z" => FixedOffset::east_opt(0).ok_or_else(invalid),
            offset => offset.parse::<FixedOffset>().map_err(|_| invalid()),
        }
    }
}

fn default_delim() -> String {
    DEFAULT_DIRECTORY_DELIM.to_string()
}

fn default_timestamp_field() -> String {
    DEFAULT_TIMESTAMP_FIELD.to_string()
}

/// Field lists arrive either as a JSON array or as a comma separated string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    let raw = Option::<StringOrList>::deserialize(deserializer)?;
    Ok(raw.map(|v| {
        let names = match v {
            StringOrList::One(s) => s.split(',').map(str::to_string).collect(),
            StringOrList::Many(list) => list,
        };
        names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }))
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
