use serde_json::json;
use std::collections::BTreeMap;
use storage_partitioner::{ConfigMap, SinkRecord, Value};

pub fn options(pairs: &[(&str, serde_json::Value)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn region_options() -> ConfigMap {
    options(&[("partition.field.name", json!(["region"]))])
}

pub fn record_with(topic: &str, pairs: &[(&str, Value)]) -> SinkRecord {
    let value: BTreeMap<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    SinkRecord::from_value(topic, 0, value)
}

pub fn region_record(region: &str) -> SinkRecord {
    record_with("orders", &[("region", Value::from(region))])
}
