use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a schema field or partition field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
    Array,
    Struct,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Null => "null",
            FieldType::Boolean => "boolean",
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Array => "array",
            FieldType::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// A typed record value. Struct fields are kept in a sorted map so that
/// equal records always compare and serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Null => FieldType::Null,
            Value::Boolean(_) => FieldType::Boolean,
            Value::Int8(_) => FieldType::Int8,
            Value::Int16(_) => FieldType::Int16,
            Value::Int32(_) => FieldType::Int32,
            Value::Int64(_) => FieldType::Int64,
            Value::Float32(_) => FieldType::Float32,
            Value::Float64(_) => FieldType::Float64,
            Value::String(_) => FieldType::String,
            Value::Bytes(_) => FieldType::Bytes,
            Value::Array(_) => FieldType::Array,
            Value::Struct(_) => FieldType::Struct,
        }
    }

    /// Integer view used by timestamp extraction.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
}

/// Ordered field declarations of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Schema { fields }
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Derives a schema from the top level of a value map, in key order.
    pub fn infer(value: &BTreeMap<String, Value>) -> Self {
        let fields = value
            .iter()
            .map(|(name, v)| SchemaField {
                name: name.clone(),
                field_type: v.field_type(),
            })
            .collect();
        Schema { fields }
    }
}

/// A record as handed to a sink by the host runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkRecord {
    topic: String,
    kafka_partition: i32,
    offset: i64,
    timestamp: Option<i64>,
    schema: Schema,
    value: BTreeMap<String, Value>,
}

impl SinkRecord {
    pub fn new(
        topic: &str,
        kafka_partition: i32,
        offset: i64,
        schema: Schema,
        value: BTreeMap<String, Value>,
    ) -> Self {
        SinkRecord {
            topic: topic.to_string(),
            kafka_partition,
            offset,
            timestamp: None,
            schema,
            value,
        }
    }

    /// Builds a record whose schema is inferred from `value`.
    pub fn from_value(topic: &str, kafka_partition: i32, value: BTreeMap<String, Value>) -> Self {
        let schema = Schema::infer(&value);
        SinkRecord::new(topic, kafka_partition, 0, schema, value)
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn kafka_partition(&self) -> i32 {
        self.kafka_partition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn value(&self) -> &BTreeMap<String, Value> {
        &self.value
    }

    /// Resolves a field by name. A name that is not a top-level key is
    /// treated as a dotted path into nested structs.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.value.get(name) {
            return Some(v);
        }
        let mut parts = name.split('.');
        let mut current = self.value.get(parts.next()?)?;
        for part in parts {
            match current {
                Value::Struct(inner) => current = inner.get(part)?,
                _ => return None,
            }
        }
        Some(current)
    }
}
