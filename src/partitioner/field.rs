use crate::config::{ConfigMap, PartitionerConfig, PARTITION_FIELD_NAME};
use crate::error::{ConfigurationError, EncodingError};
use crate::partitioner::{escape_path_segment, join_partitioned_path, PartitionField, Partitioner};
use crate::record::{SinkRecord, Value};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
struct FieldSettings {
    fields: Vec<PartitionField>,
    delim: String,
    default_value: Option<String>,
}

/// Partitions by the values of configured record fields, producing keys
/// like `region=us-east/tier=gold`.
#[derive(Debug, Clone, Default)]
pub struct FieldPartitioner {
    settings: Option<FieldSettings>,
}

impl FieldPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and configures a partitioner in one step.
    pub fn from_options(options: &ConfigMap) -> Result<Self, ConfigurationError> {
        let mut partitioner = FieldPartitioner::new();
        partitioner.configure(options)?;
        Ok(partitioner)
    }

    fn settings(&self) -> Result<&FieldSettings, EncodingError> {
        self.settings.as_ref().ok_or(EncodingError::NotConfigured)
    }
}

impl Partitioner for FieldPartitioner {
    type Field = PartitionField;

    fn configure(&mut self, options: &ConfigMap) -> Result<(), ConfigurationError> {
        let config = PartitionerConfig::parse(options)?;
        let names = config.required_field_names()?;
        if let Some(bad) = names
            .iter()
            .find(|n| n.contains('=') || n.contains(config.directory_delim.as_str()))
        {
            return Err(ConfigurationError::InvalidOption {
                option: PARTITION_FIELD_NAME,
                reason: format!(
                    "field name '{}' must not contain '=' or the delimiter '{}'",
                    bad, config.directory_delim
                ),
            });
        }

        let fields = names
            .iter()
            .map(|name| match &config.field_types {
                Some(types) => types
                    .get(name)
                    .map(|t| PartitionField::new(name, Some(*t)))
                    .ok_or_else(|| ConfigurationError::UnknownField(name.clone())),
                None => Ok(PartitionField::new(name, None)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            fields = ?names,
            delim = %config.directory_delim,
            "configured field partitioner"
        );
        self.settings = Some(FieldSettings {
            fields,
            delim: config.directory_delim,
            default_value: config.field_default,
        });
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    fn encode_partition(&self, record: &SinkRecord) -> Result<String, EncodingError> {
        let settings = self.settings()?;
        let mut parts = Vec::with_capacity(settings.fields.len());

        for field in &settings.fields {
            let rendered = match record.get(&field.name) {
                Some(Value::Null) | None => match &settings.default_value {
                    Some(default) => {
                        warn!(
                            field = %field.name,
                            topic = record.topic(),
                            offset = record.offset(),
                            "partition field missing, using default"
                        );
                        default.clone()
                    }
                    None => {
                        return Err(EncodingError::MissingField {
                            topic: record.topic().to_string(),
                            field: field.name.clone(),
                        })
                    }
                },
                Some(value) => render_value(field, value)?,
            };
            parts.push(format!(
                "{}={}",
                field.name,
                escape_path_segment(&rendered, &settings.delim)
            ));
        }

        let encoded = parts.join(&settings.delim);
        trace!(encoded = %encoded, offset = record.offset(), "encoded partition");
        Ok(encoded)
    }

    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
        let delim = self
            .settings
            .as_ref()
            .map(|s| s.delim.as_str())
            .unwrap_or(crate::config::DEFAULT_DIRECTORY_DELIM);
        join_partitioned_path(delim, topic, encoded_partition)
    }

    fn partition_fields(&self) -> Vec<PartitionField> {
        self.settings
            .as_ref()
            .map(|s| s.fields.clone())
            .unwrap_or_default()
    }
}

/// Locale independent rendering; only integers, booleans and strings have a
/// textual form that maps back to exactly one value.
fn render_value(field: &PartitionField, value: &Value) -> Result<String, EncodingError> {
    let found = value.field_type();
    if let Some(expected) = field.field_type {
        if expected != found {
            return Err(EncodingError::TypeMismatch {
                field: field.name.clone(),
                expected,
                found,
            });
        }
    }
    match value {
        Value::Int8(v) => Ok(v.to_string()),
        Value::Int16(v) => Ok(v.to_string()),
        Value::Int32(v) => Ok(v.to_string()),
        Value::Int64(v) => Ok(v.to_string()),
        Value::Boolean(v) => Ok(v.to_string()),
        Value::String(v) => Ok(v.clone()),
        _ => Err(EncodingError::UnencodableType {
            field: field.name.clone(),
            found,
        }),
    }
}
