use fake::{faker, Fake};
use futures::future::try_join_all;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use storage_partitioner::avro::confluent_avro::{
    decode_record, serialize_to_confluent_avro, RecordMetadata,
};
use storage_partitioner::domain::test::{get_test_order, Order, REGIONS};
use storage_partitioner::telemetry::init_test_tracing;
use storage_partitioner::{
    DailyPartitioner, DefaultPartitioner, EncodingError, FieldPartitioner, HourlyPartitioner,
    PartitionField, Partitioner, Rotation, RotationTracker, Value,
};
use tracing::info;

use crate::fixtures::records::{options, record_with, region_options, region_record};

mod fixtures;

#[test]
fn encodes_region_field() {
    init_test_tracing();
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    let encoded = partitioner
        .encode_partition(&region_record("us-east"))
        .unwrap();
    assert_eq!(encoded, "region=us-east");
}

#[test]
fn generates_topic_path() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    assert_eq!(
        partitioner.generate_partitioned_path("orders", "region=us-east"),
        "orders/region=us-east"
    );
}

#[test]
fn missing_region_is_an_encoding_error() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    let record = record_with("orders", &[("country", Value::from("de"))]);
    assert!(matches!(
        partitioner.encode_partition(&record),
        Err(EncodingError::MissingField { .. })
    ));
}

#[test]
fn rotation_follows_key_changes() {
    let partitioner = DefaultPartitioner::new();
    let keys = ["a", "a", "b", "b", "a"];

    // pairwise default policy, each key against its predecessor
    let flags: Vec<bool> = keys
        .windows(2)
        .map(|w| partitioner.should_rotate_partition(w[1], w[0]))
        .collect();
    assert_eq!(flags, vec![false, true, false, true]);

    // the first record opens a destination, which is tracked outside the partitioner
    let mut tracker = RotationTracker::new(&partitioner);
    let opened: Vec<bool> = keys
        .iter()
        .map(|k| tracker.observe(k).opens_destination())
        .collect();
    assert_eq!(opened, vec![true, false, true, false, true]);
}

#[test]
fn default_rotation_policy_is_string_inequality() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    for _ in 0..100 {
        let a: String = faker::lorem::en::Word().fake();
        let b: String = faker::lorem::en::Word().fake();
        assert!(!partitioner.should_rotate_partition(&a, &a));
        assert_eq!(partitioner.should_rotate_partition(&a, &b), a != b);
    }
}

#[test]
fn encoding_is_deterministic() {
    let partitioner = FieldPartitioner::from_options(&options(&[(
        "partition.field.name",
        json!(["region", "customer"]),
    )]))
    .unwrap();
    for offset in 0..50 {
        let record = get_test_order().to_sink_record("orders", 0, offset);
        let first = partitioner.encode_partition(&record).unwrap();
        let second = partitioner.encode_partition(&record.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            partitioner.encode_partition_at(&record, offset).unwrap(),
            first
        );
    }
}

#[test]
fn partitioned_paths_are_injective() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    let topics = ["orders", "orders/eu", "orders%2Feu", "a", "a/b"];
    let encodings = ["region=x", "b/region=x", "", "region=%2F", "/"];

    let mut seen = HashSet::new();
    for topic in topics {
        for encoded in encodings {
            let path = partitioner.generate_partitioned_path(topic, encoded);
            assert!(
                seen.insert(path.clone()),
                "collision for ({}, {}) -> {}",
                topic,
                encoded,
                path
            );
        }
    }
}

#[test]
fn distinct_values_never_share_a_path() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    let regions = ["eu", "eu/west", "eu%2Fwest", "eu=west", "eu%"];
    let paths: HashSet<String> = regions
        .iter()
        .map(|r| {
            let encoded = partitioner.encode_partition(&region_record(r)).unwrap();
            partitioner.generate_partitioned_path("orders", &encoded)
        })
        .collect();
    assert_eq!(paths.len(), regions.len());
}

#[test]
fn returned_field_list_is_a_copy() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    let record = region_record("us-west");
    let before = partitioner.encode_partition(&record).unwrap();

    let mut fields = partitioner.partition_fields();
    fields.clear();
    fields.push(PartitionField::new("customer", None));

    assert_eq!(partitioner.encode_partition(&record).unwrap(), before);
    assert_eq!(
        partitioner.partition_fields(),
        vec![PartitionField::new("region", None)]
    );
}

#[test]
fn partitioners_work_behind_trait_objects() {
    let tz = options(&[
        ("timezone", json!("UTC")),
        ("partition.field.name", json!("region")),
    ]);
    let partitioners: Vec<Box<dyn Partitioner<Field = PartitionField>>> = vec![
        Box::new(DefaultPartitioner::new()),
        Box::new(FieldPartitioner::from_options(&tz).unwrap()),
        Box::new(HourlyPartitioner::from_options(&tz).unwrap()),
        Box::new(DailyPartitioner::from_options(&tz).unwrap()),
    ];

    let record = region_record("eu-central");
    let now = 1_705_329_000_000;
    let encoded: Vec<String> = partitioners
        .iter()
        .map(|p| p.encode_partition_at(&record, now).unwrap())
        .collect();
    assert_eq!(
        encoded,
        vec![
            "partition=0",
            "region=eu-central",
            "year=2024/month=01/day=15/hour=14",
            "year=2024/month=01/day=15",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_partitioner_across_tasks() {
    init_test_tracing();
    let partitioner = Arc::new(FieldPartitioner::from_options(&region_options()).unwrap());
    let orders: Vec<Order> = (0..64).map(|_| get_test_order()).collect();

    let expected: Vec<String> = orders
        .iter()
        .map(|o| format!("region={}", o.region))
        .collect();

    let tasks = orders.into_iter().enumerate().map(|(offset, order)| {
        let partitioner = Arc::clone(&partitioner);
        tokio::spawn(async move {
            let record = order.to_sink_record("orders", 0, offset as i64);
            partitioner.encode_partition(&record)
        })
    });

    let results = try_join_all(tasks).await.unwrap();
    let encoded: Vec<String> = results.into_iter().map(|r| r.unwrap()).collect();
    info!("encoded {} records concurrently", encoded.len());
    assert_eq!(encoded, expected);
}

#[test]
fn avro_payloads_are_partitioned_by_record_time() -> anyhow::Result<()> {
    init_test_tracing();
    let partitioner = HourlyPartitioner::from_options(&options(&[
        ("timezone", json!("UTC")),
        ("timestamp.extractor", json!("RecordField")),
        ("timestamp.field", json!("created_at")),
    ]))?;
    let schema = <Order as apache_avro::AvroSchema>::get_schema();

    let mut order = get_test_order();
    // 2024-01-15 14:30:00 UTC
    order.created_at = 1_705_329_000_000;
    let payload = serialize_to_confluent_avro(&order, 1, &schema)?;
    let meta = RecordMetadata {
        topic: "orders".to_string(),
        kafka_partition: 0,
        offset: 0,
        timestamp: None,
    };
    let record = decode_record(&meta, &payload, &schema)?;

    let encoded = partitioner.encode_partition(&record)?;
    assert_eq!(
        partitioner.generate_partitioned_path(record.topic(), &encoded),
        "orders/year=2024/month=01/day=15/hour=14"
    );
    Ok(())
}

#[test]
fn writer_loop_keeps_keys_contiguous() {
    let partitioner = FieldPartitioner::from_options(&region_options()).unwrap();
    let mut tracker = RotationTracker::new(&partitioner);

    let sequence = [REGIONS[0], REGIONS[0], REGIONS[1], REGIONS[1], REGIONS[1], REGIONS[0]];
    let mut destinations: Vec<(String, usize)> = Vec::new();
    for region in sequence {
        let encoded = partitioner.encode_partition(&region_record(region)).unwrap();
        match tracker.observe(&encoded) {
            Rotation::Open | Rotation::Rotate { .. } => destinations.push((encoded, 1)),
            Rotation::Continue => {
                if let Some(last) = destinations.last_mut() {
                    last.1 += 1;
                }
            }
        }
    }

    assert_eq!(
        destinations,
        vec![
            ("region=us-east".to_string(), 2),
            ("region=us-west".to_string(), 3),
            ("region=us-east".to_string(), 1),
        ]
    );
}
