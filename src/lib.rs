pub mod avro;
pub mod config;
pub mod error;
pub mod partitioner;
pub mod record;
pub mod rotation;
pub mod telemetry;

pub use config::{ConfigMap, PartitionerConfig, TimestampExtractor};
pub use error::{AvroError, ConfigurationError, EncodingError};
pub use partitioner::default::DefaultPartitioner;
pub use partitioner::field::FieldPartitioner;
pub use partitioner::time_based::{DailyPartitioner, HourlyPartitioner, TimeBasedPartitioner};
pub use partitioner::{PartitionField, Partitioner};
pub use record::{FieldType, Schema, SchemaField, SinkRecord, Value};
pub use rotation::{Rotation, RotationTracker};
