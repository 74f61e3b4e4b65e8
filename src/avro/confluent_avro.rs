use crate::error::AvroError;
use crate::record::{Schema, SchemaField, SinkRecord, Value};
use apache_avro::types::Value as AvroValue;
use apache_avro::{from_avro_datum, to_avro_datum, to_value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error};

const HEADER_LEN: usize = 5;

/// Kafka coordinates of a payload, attached to the decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub topic: String,
    pub kafka_partition: i32,
    pub offset: i64,
    pub timestamp: Option<i64>,
}

/// removes the 5 bytes from the beginning of the avro and returns the plain binary data
/// together with the u32 schema id from the confluent header
#[tracing::instrument(level = "trace", skip_all)]
pub fn unwrap_from_confluent_header(avro_data: &[u8]) -> Result<(u32, &[u8]), AvroError> {
    if avro_data.len() < HEADER_LEN {
        return Err(AvroError::TruncatedHeader(avro_data.len()));
    }
    let (confluent_header, avro_data_slice) = avro_data.split_at(HEADER_LEN);

    // Check if magic byte matches
    if confluent_header[0] != 0u8 {
        error!(
            "Magic byte does not match first bit must be 0 instead of: {}",
            confluent_header[0]
        );
        return Err(AvroError::MagicByte(confluent_header[0]));
    }

    let schema_id = u32::from_be_bytes([
        confluent_header[1],
        confluent_header[2],
        confluent_header[3],
        confluent_header[4],
    ]);

    Ok((schema_id, avro_data_slice))
}

/// adds confluent header with magic byte and four more bytes for an u32 schema id
#[tracing::instrument(level = "trace", skip_all)]
pub fn wrap_in_confluent_header(avro_data: Vec<u8>, schema_id: u32) -> Vec<u8> {
    let mut message = Vec::<u8>::with_capacity(HEADER_LEN + avro_data.len());
    message.push(0u8);
    message.extend_from_slice(&schema_id.to_be_bytes());
    message.extend(avro_data);
    message
}

/// serialize without avro header and add a confluent header with schema id
#[tracing::instrument(level = "trace", skip_all)]
pub fn serialize_to_confluent_avro(
    data: impl Serialize,
    schema_id: u32,
    schema: &apache_avro::Schema,
) -> Result<Vec<u8>, AvroError> {
    let avro_binary = to_avro_datum(schema, to_value(data)?)?;
    Ok(wrap_in_confluent_header(avro_binary, schema_id))
}

/// Decodes a confluent framed avro payload into a [`SinkRecord`].
/// The writer schema must already be resolved by the caller, e.g. from a
/// schema registry using the id in the header.
#[tracing::instrument(level = "trace", skip(payload, schema))]
pub fn decode_record(
    meta: &RecordMetadata,
    payload: &[u8],
    schema: &apache_avro::Schema,
) -> Result<SinkRecord, AvroError> {
    let (schema_id, mut body) = unwrap_from_confluent_header(payload)?;
    debug!(schema_id, "decoding avro record");

    let fields = match from_avro_datum(schema, &mut body, None)? {
        AvroValue::Record(fields) => fields,
        AvroValue::Union(_, inner) => match *inner {
            AvroValue::Record(fields) => fields,
            _ => return Err(AvroError::NotARecord),
        },
        _ => return Err(AvroError::NotARecord),
    };

    let mut schema_fields = Vec::with_capacity(fields.len());
    let mut value = BTreeMap::new();
    for (name, avro_value) in fields {
        let converted = convert_value(avro_value)?;
        schema_fields.push(SchemaField {
            name: name.clone(),
            field_type: converted.field_type(),
        });
        value.insert(name, converted);
    }

    let record = SinkRecord::new(
        &meta.topic,
        meta.kafka_partition,
        meta.offset,
        Schema::new(schema_fields),
        value,
    );
    Ok(match meta.timestamp {
        Some(ts) => record.with_timestamp(ts),
        None => record,
    })
}

/// Maps avro values onto record values. Unions collapse to their branch,
/// enums become their symbol and logical types their underlying primitive.
fn convert_value(value: AvroValue) -> Result<Value, AvroError> {
    let converted = match value {
        AvroValue::Null => Value::Null,
        AvroValue::Boolean(b) => Value::Boolean(b),
        AvroValue::Int(i) | AvroValue::Date(i) | AvroValue::TimeMillis(i) => Value::Int32(i),
        AvroValue::Long(l)
        | AvroValue::TimeMicros(l)
        | AvroValue::TimestampMillis(l)
        | AvroValue::TimestampMicros(l)
        | AvroValue::LocalTimestampMillis(l)
        | AvroValue::LocalTimestampMicros(l) => Value::Int64(l),
        AvroValue::Float(f) => Value::Float32(f),
        AvroValue::Double(d) => Value::Float64(d),
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => Value::Bytes(b),
        AvroValue::String(s) | AvroValue::Enum(_, s) => Value::String(s),
        AvroValue::Uuid(u) => Value::String(u.to_string()),
        AvroValue::Union(_, inner) => convert_value(*inner)?,
        AvroValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(convert_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AvroValue::Map(entries) => Value::Struct(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, convert_value(v)?)))
                .collect::<Result<BTreeMap<_, _>, AvroError>>()?,
        ),
        AvroValue::Record(fields) => Value::Struct(
            fields
                .into_iter()
                .map(|(k, v)| Ok((k, convert_value(v)?)))
                .collect::<Result<BTreeMap<_, _>, AvroError>>()?,
        ),
        other => return Err(AvroError::UnsupportedType(format!("{:?}", other))),
    };
    Ok(converted)
}
