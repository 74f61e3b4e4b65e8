use crate::config::{ConfigMap, PartitionerConfig, DEFAULT_DIRECTORY_DELIM};
use crate::error::{ConfigurationError, EncodingError};
use crate::partitioner::{join_partitioned_path, PartitionField, Partitioner};
use crate::record::SinkRecord;
use tracing::debug;

/// Keeps the partitioning of the source topic: `partition=<kafka partition>`.
#[derive(Debug, Clone)]
pub struct DefaultPartitioner {
    delim: String,
}

impl Default for DefaultPartitioner {
    fn default() -> Self {
        DefaultPartitioner {
            delim: DEFAULT_DIRECTORY_DELIM.to_string(),
        }
    }
}

impl DefaultPartitioner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Partitioner for DefaultPartitioner {
    type Field = PartitionField;

    fn configure(&mut self, options: &ConfigMap) -> Result<(), ConfigurationError> {
        let config = PartitionerConfig::parse(options)?;
        self.delim = config.directory_delim;
        debug!(delim = %self.delim, "configured default partitioner");
        Ok(())
    }

    fn encode_partition(&self, record: &SinkRecord) -> Result<String, EncodingError> {
        Ok(format!("partition={}", record.kafka_partition()))
    }

    fn generate_partitioned_path(&self, topic: &str, encoded_partition: &str) -> String {
        join_partitioned_path(&self.delim, topic, encoded_partition)
    }

    fn partition_fields(&self) -> Vec<PartitionField> {
        Vec::new()
    }
}
