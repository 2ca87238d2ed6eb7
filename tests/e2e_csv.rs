//! End-to-end load tests: CSV file → transform → publisher, with an
//! in-memory sink standing in for the broker.

use serde_json::{json, Value};
use std::io::Write;
use tempfile::NamedTempFile;
use txn_loader::{load_transactions, run, LoadConfig};
use txn_loader_kafka_producer::{MemorySink, Publisher};

fn csv_file(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{contents}").unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn config_for(file: &NamedTempFile) -> LoadConfig {
    LoadConfig {
        source: file.path().to_path_buf(),
        ..Default::default()
    }
}

fn decoded(sink: &MemorySink) -> Vec<Value> {
    sink.delivered()
        .iter()
        .map(|m| serde_json::from_slice(&m.payload).unwrap())
        .collect()
}

#[tokio::test]
async fn test_three_row_scenario() {
    let file = csv_file("amount,merchant,lat\n12.50,ShopA,40.1\nbad,ShopB,\n,ShopC,41.0\n");
    let sink = MemorySink::new();
    let handle = sink.clone();

    let summary = load_transactions(
        &config_for(&file),
        Publisher::new(sink, "transactions_topic"),
    )
    .await
    .unwrap();

    assert_eq!(summary.sent(), 3);
    assert_eq!(
        decoded(&handle),
        vec![
            json!({"amount": 12.5, "merchant": "ShopA", "lat": 40.1}),
            json!({"amount": null, "merchant": "ShopB", "lat": null}),
            json!({"amount": null, "merchant": "ShopC", "lat": 41.0}),
        ]
    );
    assert!(handle
        .delivered()
        .iter()
        .all(|m| m.topic == "transactions_topic" && m.key.is_none()));
}

#[tokio::test]
async fn test_wire_format_keeps_column_order_and_unicode() {
    let file = csv_file(
        "trans_num,merchant,amount,population_city,target\nt1, Café Zürich ,4.97,3495,0\n",
    );
    let sink = MemorySink::new();
    let handle = sink.clone();

    load_transactions(&config_for(&file), Publisher::new(sink, "t"))
        .await
        .unwrap();

    let raw = String::from_utf8(handle.delivered()[0].payload.clone()).unwrap();
    assert_eq!(
        raw,
        r#"{"trans_num":"t1","merchant":"Café Zürich","amount":4.97,"population_city":3495,"target":0}"#
    );
}

#[tokio::test]
async fn test_flush_cadence_over_csv() {
    let mut contents = String::from("amount,merchant\n");
    for i in 0..251 {
        contents.push_str(&format!("{i}.5,shop{i}\n"));
    }
    let file = csv_file(&contents);
    let sink = MemorySink::new();
    let handle = sink.clone();

    let summary = load_transactions(&config_for(&file), Publisher::new(sink, "t"))
        .await
        .unwrap();

    assert_eq!(summary.sent(), 251);
    assert_eq!(summary.publish.progress_flushes, 1);
    // one progress flush plus the final flush on close
    assert_eq!(handle.flush_count(), 2);
    assert_eq!(handle.delivered().len(), 251);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_record_cap_on_five_rows() {
    let file = csv_file("amount\n1\n2\n3\n4\n5\n");
    let sink = MemorySink::new();
    let handle = sink.clone();
    let config = LoadConfig {
        max_records: Some(2),
        ..config_for(&file)
    };

    let summary = load_transactions(&config, Publisher::new(sink, "t"))
        .await
        .unwrap();

    assert_eq!(summary.sent(), 2);
    assert_eq!(decoded(&handle), vec![json!({"amount": 1.0}), json!({"amount": 2.0})]);
}

#[tokio::test]
async fn test_empty_file_sends_nothing() {
    let file = csv_file("");
    let sink = MemorySink::new();
    let handle = sink.clone();

    let summary = load_transactions(&config_for(&file), Publisher::new(sink, "t"))
        .await
        .unwrap();

    assert_eq!(summary.sent(), 0);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_missing_source_fails_before_connecting() {
    // The broker address is unroutable: reaching it would take the full
    // retry budget, so a fast error proves the file check runs first.
    let mut config = LoadConfig {
        source: "/nonexistent/train.csv".into(),
        ..Default::default()
    };
    config.producer.brokers = "10.255.255.1:9092".to_string();

    let err = run(&config).await.unwrap_err();
    assert_eq!(err.to_string(), "/nonexistent/train.csv is not a readable file");
}
