use crate::config::{
    ConfigMap, PartitionerConfig, TimestampExtractor, PARTITION_DURATION_MS, PATH_FORMAT,
};
use crate::error::{ConfigurationError, EncodingError};
use crate::partitioner::{join_partitioned_path, PartitionField, Partitioner};
use crate::record::{FieldType, SinkRecord, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset};
use tracing::{debug, trace};

pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const HOURLY_PATH_FORMAT: &str = "year=%Y/month=%m/day=%d/hour=%H";
pub const DAILY_PATH_FORMAT: &str = "year=%Y/month=%m/day=%d";

#[derive(Debug, Clone)]
struct TimeSettings {
    delim: String,
    /// `path.format` with its `/` separators replaced by `delim`.
    path_format: String,
    fields: Vec<PartitionField>,
    duration_ms: i64,
    timezone: FixedOffset,
    extractor: TimestampExtractor,
    timestamp_field: String,
}

/// Buckets records by time. The timestamp is floored to a multiple of
/// `partition.duration.ms` in the configured timezone and rendered with
/// `path.format`. The `/` separators of `path.format` are rendered as the
/// configured `directory.delim`.
#[derive(Debug, Clone, Default)]
pub struct TimeBasedPartitioner {
    settings: Option<TimeSettings>,
}

impl TimeBasedPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: &ConfigMap) -> Result<Self, ConfigurationError> {
        let mut partitioner = TimeBasedPartitioner::new();
        partitioner.configure(options)?;
        Ok(partitioner)
    }

    fn settings(&self) -> Result<&TimeSettings, EncodingError> {
        self.settings.as_ref().ok_or(EncodingError::NotConfigured)
    }

    /// Picks the timestamp to partition by. `now_millis` is only consulted
    /// by the wallclock extractor.
    fn extract_timestamp(
        settings: &TimeSettings,
        record: &SinkRecord,
        now_millis: Option<i64>,
    ) -> Result<i64, EncodingError> {
        let missing = || EncodingError::MissingTimestamp(record.topic().to_string());
        match settings.extractor {
            TimestampExtractor::Wallclock => now_millis.ok_or_else(missing),
            TimestampExtractor::Record => record.timestamp().ok_or_else(missing),
            TimestampExtractor::RecordField => match record.get(&settings.timestamp_field) {
                None | Some(Value::Null) => Err(missing()),
                Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.timestamp_millis())
                    .map_err(|_| EncodingError::InvalidTimestamp(raw.clone())),
                Some(other) => other
                    .as_i64()
                    .ok_or_else(|| EncodingError::InvalidTimestamp(format!("{:?}", other))),
            },
        }
    }

    fn encode_timestamp(
        settings: &TimeSettings,
        timestamp_ms: i64,
    ) -> Result<String, EncodingError> {
        let invalid = || EncodingError::InvalidTimestamp(timestamp_ms.to_string());
        let bucket = floor_to_bucket(timestamp_ms, settings.duration_ms, &settings.timezone)
            .ok_or_else(invalid)?;
        let dt = DateTime::from_timestamp_millis(bucket)
            .ok_or_else(invalid)?
            .with_timezone(&settings.timezone);
        Ok(dt.format(&settings.path_format).to_string())
    }

    fn encode(
        &self,
        record: &SinkRecord,
        now_millis: Option<i64>,
    ) -> Result<String, EncodingError> {
        let settings = self.settings()?;
        let timestamp = Self::extract_timestamp(settings, record, now_millis)?;
        let encoded = Self::encode_timestamp(settings, timestamp)?;
        trace!(encoded = %encoded, timestamp, offset = record.offset(), "encoded partition");
        Ok(encoded)
    }
}

impl Partitioner for TimeBasedPartitioner {
    type Field = PartitionField;

    fn configure(&mut self, options: &ConfigMap) -> Result<(), ConfigurationError> {
        let config = PartitionerConfig::parse(options)?;
        let raw_format = config.required_path_format()?;
        validate_path_format(raw_format)?;
        let fields = raw_format
            .split('/')
            .filter_map(|segment| segment.split_once('='))
            .map(|(name, _)| PartitionField::new(name, Some(FieldType::String)))
            .collect();
        let path_format = raw_format
            .split('/')
            .collect::<Vec<_>>()
            .join(&config.directory_delim.replace('%', "%%"));
        let duration_ms = config.required_duration_ms()?;
        let timezone = config.required_timezone()?;

        debug!(
            path_format = %path_format,
            duration_ms,
            timezone = %timezone,
            extractor = ?config.timestamp_extractor,
            "configured time based partitioner"
        );
        self.settings = Some(TimeSettings {
            delim: config.directory_delim,
            path_format,
            fields,
            duration_ms,
            timezone,
            extractor: config.timestamp_extractor,
            timestamp_field: config.timestamp_field,
        });
        Ok(())
    }

    /// Only usable with the `Record` and `RecordField` extractors, the
    /// wallclock extractor needs [`Partitioner::encode_partition_at`].
    #[tracing::instrument(level = "trace", skip_all)]
    fn encode_partition(&self, record: &SinkRecord) -> Result<String, EncodingError> {
        self.encode(record, None)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn encode_partition_at(
        &self,
        record: &SinkRecord,
        now_millis: i64,
    ) -> Result<String, EncodingError> {
        self.encode(record, Some(now_millis))
    }

    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
        let delim = self
            .settings
            .as_ref()
            .map(|s| s.delim.as_str())
            .unwrap_or(crate::config::DEFAULT_DIRECTORY_DELIM);
        join_partitioned_path(delim, topic, encoded_partition)
    }

    /// The `name=` prefixes of the path format segments.
    fn partition_fields(&self) -> Vec<PartitionField> {
        self.settings
            .as_ref()
            .map(|s| s.fields.clone())
            .unwrap_or_default()
    }
}

/// Floors `timestamp_ms` to the start of its bucket, with bucket boundaries
/// aligned to local time of `timezone`.
/// `None` when the shifted instant leaves the `i64` range.
fn floor_to_bucket(timestamp_ms: i64, duration_ms: i64, timezone: &FixedOffset) -> Option<i64> {
    let offset_ms = i64::from(timezone.local_minus_utc()) * 1000;
    let local = timestamp_ms.checked_add(offset_ms)?;
    local
        .checked_sub(local.rem_euclid(duration_ms))?
        .checked_sub(offset_ms)
}

fn validate_path_format(path_format: &str) -> Result<(), ConfigurationError> {
    if StrftimeItems::new(path_format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigurationError::InvalidOption {
            option: PATH_FORMAT,
            reason: format!("'{}' is not a valid strftime pattern", path_format),
        });
    }
    Ok(())
}

/// Overrides `path.format` and `partition.duration.ms` before delegating.
fn preset_options(options: &ConfigMap, path_format: &str, duration_ms: i64) -> ConfigMap {
    let mut options = options.clone();
    options.insert(PATH_FORMAT.to_string(), serde_json::Value::from(path_format));
    options.insert(
        PARTITION_DURATION_MS.to_string(),
        serde_json::Value::from(duration_ms),
    );
    options
}

macro_rules! preset_partitioner {
    ($(#[$doc:meta])* $name:ident, $format:expr, $duration:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            inner: TimeBasedPartitioner,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn from_options(options: &ConfigMap) -> Result<Self, ConfigurationError> {
                let mut partitioner = Self::new();
                partitioner.configure(options)?;
                Ok(partitioner)
            }
        }

        impl Partitioner for $name {
            type Field = PartitionField;

            fn configure(&mut self, options: &ConfigMap) -> Result<(), ConfigurationError> {
                self.inner
                    .configure(&preset_options(options, $format, $duration))
            }

            fn encode_partition(&self, record: &SinkRecord) -> Result<String, EncodingError> {
                self.inner.encode_partition(record)
            }

            fn encode_partition_at(
                &self,
                record: &SinkRecord,
                now_millis: i64,
            ) -> Result<String, EncodingError> {
                self.inner.encode_partition_at(record, now_millis)
            }

            fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
                self.inner.generate_partitioned_path(topic, encoded_partition)
            }

            fn partition_fields(&self) -> Vec<PartitionField> {
                self.inner.partition_fields()
            }
        }
    };
}

preset_partitioner!(
    /// Hourly buckets: `year=YYYY/month=MM/day=DD/hour=HH`.
    HourlyPartitioner,
    HOURLY_PATH_FORMAT,
    HOUR_MS
);

preset_partitioner!(
    /// Daily buckets: `year=YYYY/month=MM/day=DD`.
    DailyPartitioner,
    DAILY_PATH_FORMAT,
    DAY_MS
);
