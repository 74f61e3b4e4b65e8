use crate::record::FieldType;

/// Raised by `configure` when an option is missing or malformed.
/// A partitioner that failed to configure keeps its previous configuration.
#[derive(thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required option '{0}'")]
    MissingOption(&'static str),
    #[error("Invalid value for option '{option}': {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },
    #[error("Partition field '{0}' is not declared in 'partition.field.types'")]
    UnknownField(String),
    #[error("Configuration could not be parsed")]
    Malformed(#[source] serde_json::Error),
}

impl std::fmt::Debug for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Raised per record when no partition can be encoded for it.
#[derive(thiserror::Error)]
pub enum EncodingError {
    #[error("Partitioner used before configure() succeeded")]
    NotConfigured,
    #[error("Record on topic '{topic}' has no value for partition field '{field}'")]
    MissingField { topic: String, field: String },
    #[error("Partition field '{field}' has unencodable type {found}")]
    UnencodableType { field: String, found: FieldType },
    #[error("Partition field '{field}' is declared as {expected} but the record holds {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },
    #[error("No timestamp available for record on topic '{0}'")]
    MissingTimestamp(String),
    #[error("Timestamp '{0}' can not be used for partitioning")]
    InvalidTimestamp(String),
}

impl std::fmt::Debug for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum AvroError {
    #[error("Payload of {0} bytes is too short for a confluent header")]
    TruncatedHeader(usize),
    #[error("Magic byte does not match, first byte must be 0 instead of: {0}")]
    MagicByte(u8),
    #[error("Avro datum could not be decoded")]
    Decode(#[from] apache_avro::Error),
    #[error("Avro datum is not a record")]
    NotARecord,
    #[error("Avro value has no record representation: {0}")]
    UnsupportedType(String),
}

impl std::fmt::Debug for AvroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
