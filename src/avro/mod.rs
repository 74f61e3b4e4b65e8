pub mod confluent_avro;
