// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs;

use tempfile::tempdir;

use ledgerscope::export::ExportFormat;
use ledgerscope::filter::KeyFilter;
use ledgerscope::transport::MemoryLedger;
use ledgerscope::ConnectionConfig;
use ledgerscope_cli::commands::{export, get, root, scan, stats};
use ledgerscope_cli::{exit_code, EXIT_FAILURE, EXIT_INTEGRITY};

fn sample_ledger() -> MemoryLedger {
    let ledger = MemoryLedger::new("defaultdb");
    ledger.set("block:1", r#"{"height":1}"#);
    ledger.set("block:2", r#"{"height":2}"#);
    ledger.set("tx:1hash", "deadbeef");
    ledger.set("tx:2hash", "cafebabe");
    ledger.set("other", "v3");
    ledger
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[test]
fn test_root_prints_reporting_format() {
    let ledger = sample_ledger();
    let mut buf = Vec::new();
    root::run(&ledger, &ConnectionConfig::default(), &mut buf).unwrap();

    let printed: serde_json::Value = serde_json::from_str(&output(buf)).unwrap();
    assert_eq!(printed["transactionId"], 5);
    assert_eq!(printed["merkleRoot"], ledger.head_root().digest_hex());
}

#[test]
fn test_get_and_missing_key() {
    let ledger = sample_ledger();
    let config = ConnectionConfig::default();

    let mut buf = Vec::new();
    get::run(&ledger, &config, "other", &mut buf).unwrap();
    let text = output(buf);
    assert!(text.contains("other"));
    assert!(text.contains("v3"));

    let mut buf = Vec::new();
    get::run(&ledger, &config, "nope", &mut buf).unwrap();
    assert!(output(buf).contains("not found"));
}

#[test]
fn test_scan_multiple_prefixes_with_limit() {
    let ledger = sample_ledger();
    let config = ConnectionConfig::default();

    let mut buf = Vec::new();
    let prefixes = vec!["block:".to_string(), "tx:".to_string()];
    scan::run(&ledger, &config, &prefixes, None, None, &mut buf).unwrap();
    let text = output(buf);
    assert!(text.contains("block:2") && text.contains("tx:2hash"));
    assert!(!text.contains("other"));
    assert!(text.contains("4 entries"));

    let mut buf = Vec::new();
    scan::run(&ledger, &config, &prefixes, None, Some(3), &mut buf).unwrap();
    let text = output(buf);
    assert!(text.contains("3 entries"));
    assert!(!text.contains("tx:2hash"));
}

#[test]
fn test_scan_with_suffix() {
    let ledger = sample_ledger();
    let mut buf = Vec::new();
    scan::run(&ledger, &ConnectionConfig::default(), &[], Some("hash"), None, &mut buf).unwrap();
    let text = output(buf);
    assert!(text.contains("tx:1hash") && text.contains("tx:2hash"));
    assert!(text.contains("2 entries"));
}

#[test]
fn test_export_to_file() {
    let ledger = sample_ledger();
    let dir = tempdir().unwrap();
    let path = dir.path().join("blocks.json");

    let summary = export::run(
        &ledger,
        &ConnectionConfig::default(),
        KeyFilter::prefix("block:"),
        ExportFormat::Json,
        Some(path.as_path()),
        &mut Vec::<u8>::new(),
    )
    .unwrap();
    assert_eq!(summary.exported, 2);

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!([
            {"key": "block:1", "value": {"height": 1}},
            {"key": "block:2", "value": {"height": 2}}
        ])
    );
}

#[test]
fn test_export_ndjson_to_writer() {
    let ledger = sample_ledger();
    let mut buf = Vec::new();
    export::run(
        &ledger,
        &ConnectionConfig::default(),
        KeyFilter::suffix("hash"),
        ExportFormat::Ndjson,
        None,
        &mut buf,
    )
    .unwrap();
    let text = output(buf);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"tx:1hash\""));
}

#[test]
fn test_stats() {
    let ledger = sample_ledger();
    let mut buf = Vec::new();
    let stats = stats::run(&ledger, &ConnectionConfig::default(), &mut buf).unwrap();
    assert_eq!(stats.count, 5);
    assert!(output(buf).contains("Most common key prefixes"));
}

#[test]
fn test_integrity_violation_exit_code() {
    let ledger = sample_ledger();
    ledger.tamper(b"block:2", "forged");

    let err = export::run(
        &ledger,
        &ConnectionConfig::default(),
        KeyFilter::All,
        ExportFormat::Json,
        None,
        &mut Vec::<u8>::new(),
    )
    .unwrap_err();
    assert_eq!(exit_code(&err), EXIT_INTEGRITY);

    let err = stats::run(&ledger, &ConnectionConfig::default(), &mut Vec::<u8>::new()).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_INTEGRITY);
}

#[test]
fn test_connection_failure_exit_code() {
    let ledger = sample_ledger();
    let config = ConnectionConfig {
        database: "missing".into(),
        ..Default::default()
    };
    let err = root::run(&ledger, &config, &mut Vec::<u8>::new()).unwrap_err();
    assert_eq!(exit_code(&err), EXIT_FAILURE);
}
