use crate::config::ConfigMap;
use crate::error::{ConfigurationError, EncodingError};
use crate::record::{FieldType, SinkRecord};

pub mod default;
pub mod field;
pub mod time_based;

/// A field that contributes one component to the encoded partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionField {
    pub name: String,
    /// Declared type, when the configuration declares one.
    pub field_type: Option<FieldType>,
}

impl PartitionField {
    pub fn new(name: &str, field_type: Option<FieldType>) -> Self {
        PartitionField {
            name: name.to_string(),
            field_type,
        }
    }
}

/// Maps records to partitions and decides when the writer has to roll over
/// to a new destination.
///
/// `Field` is the type describing a partition field. Implementations are
/// configured once through [`Partitioner::configure`] and are then used
/// through shared references only, which makes them safe to share across
/// threads.
pub trait Partitioner: Send + Sync {
    type Field;

    /// Validates and applies the options. A second successful call replaces
    /// the previous configuration completely, a failing call keeps it.
    fn configure(&mut self, options: &ConfigMap) -> Result<(), ConfigurationError>;

    /// Returns the encoded partition the record belongs to.
    fn encode_partition(&self, record: &SinkRecord) -> Result<String, EncodingError>;

    /// Like [`Partitioner::encode_partition`] but with the current time in
    /// milliseconds since epoch. Only time based partitioners use it.
    fn encode_partition_at(
        &self,
        record: &SinkRecord,
        _now_millis: i64,
    ) -> Result<String, EncodingError> {
        self.encode_partition(record)
    }

    /// Joins topic and encoded partition into the destination path.
    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String;

    /// Ordered copy of the fields used to build the partition.
    fn partition_fields(&self) -> Vec<Self::Field>;

    /// Whether the writer should close the destination of
    /// `current_encoded_partition` and open one for `encoded_partition`.
    fn should_rotate_partition(
        &self,
        encoded_partition: &str,
        current_encoded_partition: &str,
    ) -> bool {
        encoded_partition != current_encoded_partition
    }
}

/// Builds `escaped topic + delim + encoded partition`.
///
/// The topic never contains the delimiter after escaping, so the first
/// delimiter in the result always separates topic and partition.
pub fn join_partitioned_path(delim: &str, topic: &str, encoded_partition: &str) -> String {
    let topic = escape_path_segment(topic, delim);
    let mut path = String::with_capacity(topic.len() + delim.len() + encoded_partition.len());
    path.push_str(&topic);
    path.push_str(delim);
    path.push_str(encoded_partition);
    path
}

/// Percent encodes `%` and every character of `delim` so the result can be
/// used as a single path segment. Distinct inputs stay distinct.
pub fn escape_path_segment(segment: &str, delim: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == '%' || delim.contains(c) {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("%{:02X}", byte));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}
